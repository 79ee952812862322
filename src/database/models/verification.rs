use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Entity;
use crate::auth::code::OneTimeCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePurpose {
    EmailVerification,
    PasswordReset,
}

impl CodePurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            CodePurpose::EmailVerification => "email_verification",
            CodePurpose::PasswordReset => "password_reset",
        }
    }
}

/// Emailed code proving control of an address; one live code per user and purpose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub purpose: CodePurpose,
    pub code: OneTimeCode,
    pub created_at: DateTime<Utc>,
}

impl Entity for VerificationCode {
    const KIND: &'static str = "verification_codes";
    const LABEL: &'static str = "Verification code";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        None
    }

    fn unique_key(&self) -> Option<String> {
        Some(Self::key(self.purpose, &self.email))
    }
}

impl VerificationCode {
    pub fn key(purpose: CodePurpose, email: &str) -> String {
        format!("{}:{}", purpose.as_str(), email.to_lowercase())
    }

    pub fn new(user_id: Uuid, email: &str, purpose: CodePurpose, ttl: Duration) -> (Self, String) {
        let (code, plain) = OneTimeCode::issue(ttl);
        let record = Self {
            id: Uuid::new_v4(),
            user_id,
            email: email.to_lowercase(),
            purpose,
            code,
            created_at: Utc::now(),
        };
        (record, plain)
    }
}
