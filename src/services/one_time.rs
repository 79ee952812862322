use chrono::Utc;

use crate::auth::code::{CodeError, OneTimeCode};
use crate::database::models::invite::Invite;
use crate::database::models::verification::VerificationCode;
use crate::database::models::Entity;
use crate::database::Repository;
use crate::error::ApiError;

/// Records that carry single-use code state
pub trait CodeHolder: Entity {
    fn code(&self) -> &OneTimeCode;
    fn code_mut(&mut self) -> &mut OneTimeCode;
}

impl CodeHolder for Invite {
    fn code(&self) -> &OneTimeCode {
        &self.code
    }

    fn code_mut(&mut self) -> &mut OneTimeCode {
        &mut self.code
    }
}

impl CodeHolder for VerificationCode {
    fn code(&self) -> &OneTimeCode {
        &self.code
    }

    fn code_mut(&mut self) -> &mut OneTimeCode {
        &mut self.code
    }
}

/// Check a presented code without consuming it. A wrong code is charged
/// against the attempt budget and persisted.
pub async fn check_code<T: CodeHolder>(
    repo: &Repository<T>,
    record: &T,
    code: &str,
    max_attempts: u32,
) -> Result<(), ApiError> {
    let mut after = record.clone();
    match after.code_mut().check(code, Utc::now(), max_attempts) {
        Ok(()) => Ok(()),
        Err(CodeError::Mismatch) => {
            // A lost race here only loses one attempt increment
            if !repo.update_if_unchanged(record, &after).await? {
                tracing::debug!("Attempt counter for {} {} changed concurrently", T::LABEL, record.id());
            }
            Err(CodeError::Mismatch.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Verify and consume `code` in one compare-and-swap write. Of two concurrent
/// redemptions at most one succeeds; the other sees the code as used.
pub async fn redeem_code<T: CodeHolder>(
    repo: &Repository<T>,
    record: T,
    code: &str,
    max_attempts: u32,
) -> Result<T, ApiError> {
    check_code(repo, &record, code, max_attempts).await?;
    consume(repo, record, max_attempts).await
}

/// Consume without a code (magic links carry their own proof)
pub async fn consume<T: CodeHolder>(repo: &Repository<T>, record: T, max_attempts: u32) -> Result<T, ApiError> {
    let mut after = record.clone();
    after.code_mut().consume(Utc::now(), max_attempts)?;
    if !repo.update_if_unchanged(&record, &after).await? {
        return Err(CodeError::Consumed.into());
    }
    Ok(after)
}
