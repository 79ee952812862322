use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::user::{Role, User};

const ISSUER: &str = "churchflow";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token generation failed: {0}")]
    Signing(String),
}

/// Claims types name the audience they are issued for, so a token minted
/// for one purpose never verifies as another.
pub trait TokenClaims: Serialize + DeserializeOwned {
    const AUDIENCE: &'static str;
}

/// Login session carried by the `auth-token` cookie or a Bearer header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims for SessionClaims {
    const AUDIENCE: &'static str = "session";
}

impl SessionClaims {
    pub fn new(user: &User, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            organization_id: user.organization_id,
            aud: Self::AUDIENCE.to_string(),
            iss: ISSUER.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Invitation link; `jti` must match the invite's current token id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicLinkClaims {
    pub sub: Uuid,
    pub email: String,
    pub jti: Uuid,
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims for MagicLinkClaims {
    const AUDIENCE: &'static str = "magic-link";
}

impl MagicLinkClaims {
    pub fn new(invite_id: Uuid, email: &str, jti: Uuid, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: invite_id,
            email: email.to_string(),
            jti,
            aud: Self::AUDIENCE.to_string(),
            iss: ISSUER.to_string(),
            exp: expires_at.timestamp(),
            iat: Utc::now().timestamp(),
        }
    }
}

/// HS256 signer/verifier shared through application state
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign<C: TokenClaims>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, expiry, issuer and audience, then return the payload
    pub fn verify<C: TokenClaims>(&self, token: &str) -> Result<C, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[C::AUDIENCE]);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        decode::<C>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    pub fn issue_session(&self, user: &User, ttl: Duration) -> Result<String, TokenError> {
        self.sign(&SessionClaims::new(user, ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp_offset: Duration) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: Uuid::new_v4(),
            email: "pastor@ecwa.org".into(),
            role: Role::Admin,
            organization_id: Some(Uuid::new_v4()),
            aud: SessionClaims::AUDIENCE.into(),
            iss: ISSUER.into(),
            exp: (now + exp_offset).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn sign_then_verify_returns_payload() {
        let signer = TokenSigner::new("test-secret");
        let original = claims(Duration::hours(1));
        let token = signer.sign(&original).unwrap();

        let decoded: SessionClaims = signer.verify(&token).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.sign(&claims(Duration::hours(1))).unwrap();

        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let idx = sig_start + 5;
        bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(matches!(
            signer.verify::<SessionClaims>(&tampered),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.sign(&claims(Duration::hours(1))).unwrap();
        let forged_body = signer
            .sign(&SessionClaims { role: Role::SuperAdmin, ..claims(Duration::hours(1)) })
            .unwrap();

        // Splice the forged body onto the original signature
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_body.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(signer.verify::<SessionClaims>(&spliced).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let signer = TokenSigner::new("test-secret");
        let token = signer.sign(&claims(-Duration::hours(1))).unwrap();

        assert!(matches!(
            signer.verify::<SessionClaims>(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenSigner::new("one").sign(&claims(Duration::hours(1))).unwrap();
        assert!(TokenSigner::new("two").verify::<SessionClaims>(&token).is_err());
    }

    #[test]
    fn audiences_do_not_cross() {
        let signer = TokenSigner::new("test-secret");
        let link = MagicLinkClaims::new(
            Uuid::new_v4(),
            "new@ecwa.org",
            Uuid::new_v4(),
            Utc::now() + Duration::hours(2),
        );
        let token = signer.sign(&link).unwrap();

        assert!(signer.verify::<SessionClaims>(&token).is_err());
        let decoded: MagicLinkClaims = signer.verify(&token).unwrap();
        assert_eq!(decoded.jti, link.jti);
    }
}
