use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generate a zero-padded, uniformly distributed 6-digit verification code
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Codes are stored as SHA-256 hex so a leaked row does not reveal them
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeStatus {
    Active,
    Consumed,
    Expired,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("code has already been used")]
    Consumed,
    #[error("code has expired")]
    Expired,
    #[error("too many failed attempts")]
    Locked,
    #[error("code does not match")]
    Mismatch,
}

/// Single-use code state: active until consumed, expired, or locked out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

impl OneTimeCode {
    /// Issue a fresh code; the plain value is returned once for delivery
    pub fn issue(ttl: Duration) -> (Self, String) {
        let code = generate_code();
        let state = Self {
            code_hash: hash_code(&code),
            expires_at: Utc::now() + ttl,
            consumed_at: None,
            attempts: 0,
        };
        (state, code)
    }

    pub fn status(&self, now: DateTime<Utc>, max_attempts: u32) -> CodeStatus {
        if self.consumed_at.is_some() {
            CodeStatus::Consumed
        } else if self.attempts >= max_attempts {
            CodeStatus::Locked
        } else if now >= self.expires_at {
            CodeStatus::Expired
        } else {
            CodeStatus::Active
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        constant_time_eq(hash_code(code).as_bytes(), self.code_hash.as_bytes())
    }

    /// Fail unless the code is still active
    pub fn ensure_active(&self, now: DateTime<Utc>, max_attempts: u32) -> Result<(), CodeError> {
        match self.status(now, max_attempts) {
            CodeStatus::Active => Ok(()),
            CodeStatus::Consumed => Err(CodeError::Consumed),
            CodeStatus::Expired => Err(CodeError::Expired),
            CodeStatus::Locked => Err(CodeError::Locked),
        }
    }

    /// Check the presented code; a mismatch counts against the attempt budget
    pub fn check(&mut self, code: &str, now: DateTime<Utc>, max_attempts: u32) -> Result<(), CodeError> {
        self.ensure_active(now, max_attempts)?;
        if !self.matches(code) {
            self.attempts += 1;
            return Err(CodeError::Mismatch);
        }
        Ok(())
    }

    pub fn consume(&mut self, now: DateTime<Utc>, max_attempts: u32) -> Result<(), CodeError> {
        self.ensure_active(now, max_attempts)?;
        self.consumed_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_codes_vary() {
        let codes: std::collections::HashSet<String> = (0..20).map(|_| generate_code()).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        assert_eq!(hash_code(" 012345 "), hash_code("012345"));
        assert_ne!(hash_code("012345"), hash_code("012346"));
    }

    #[test]
    fn consumed_code_cannot_be_consumed_again() {
        let (mut code, _) = OneTimeCode::issue(Duration::minutes(10));
        let now = Utc::now();
        assert_eq!(code.consume(now, 5), Ok(()));
        assert_eq!(code.consume(now, 5), Err(CodeError::Consumed));
        assert_eq!(code.status(now, 5), CodeStatus::Consumed);
    }

    #[test]
    fn expired_code_is_rejected() {
        let (mut code, plain) = OneTimeCode::issue(Duration::minutes(10));
        let later = Utc::now() + Duration::minutes(11);
        assert_eq!(code.check(&plain, later, 5), Err(CodeError::Expired));
        assert_eq!(code.consume(later, 5), Err(CodeError::Expired));
    }

    #[test]
    fn repeated_mismatches_lock_the_code() {
        let (mut code, plain) = OneTimeCode::issue(Duration::minutes(10));
        let wrong = if plain == "000000" { "111111" } else { "000000" };
        let now = Utc::now();
        for _ in 0..3 {
            assert_eq!(code.check(wrong, now, 3), Err(CodeError::Mismatch));
        }
        assert_eq!(code.check(&plain, now, 3), Err(CodeError::Locked));
    }

    #[test]
    fn correct_code_passes_check() {
        let (mut code, plain) = OneTimeCode::issue(Duration::minutes(10));
        assert_eq!(code.check(&plain, Utc::now(), 5), Ok(()));
        assert_eq!(code.attempts, 0);
    }
}
