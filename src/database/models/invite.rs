use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;
use super::Entity;
use crate::auth::code::{CodeStatus, OneTimeCode};

/// Pending invitation for someone to join an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    /// Normalized (lowercased) address
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub invited_by: Uuid,
    pub code: OneTimeCode,
    /// `jti` of the current magic-link token; rotated on resend
    pub token_id: Uuid,
    pub accepted_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Invite {
    const KIND: &'static str = "invites";
    const LABEL: &'static str = "Invitation";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        self.organization_id
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateInvite {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub organization_id: Option<Uuid>,
}

impl Invite {
    /// Create an invite together with the plain code to deliver
    pub fn new(
        email: String,
        name: Option<String>,
        role: Role,
        organization_id: Option<Uuid>,
        invited_by: Uuid,
        ttl: Duration,
    ) -> (Self, String) {
        let (code, plain) = OneTimeCode::issue(ttl);
        let now = Utc::now();
        let invite = Self {
            id: Uuid::new_v4(),
            email,
            name,
            role,
            organization_id,
            invited_by,
            code,
            token_id: Uuid::new_v4(),
            accepted_user_id: None,
            created_at: now,
            updated_at: now,
        };
        (invite, plain)
    }

    /// Replace the code and magic-link id, restarting the expiry window
    pub fn reissue(&mut self, ttl: Duration) -> String {
        let (code, plain) = OneTimeCode::issue(ttl);
        self.code = code;
        self.token_id = Uuid::new_v4();
        self.updated_at = Utc::now();
        plain
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.code.expires_at
    }

    pub fn summary(&self, now: DateTime<Utc>, max_attempts: u32) -> InviteSummary {
        InviteSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            organization_id: self.organization_id,
            invited_by: self.invited_by,
            status: self.code.status(now, max_attempts),
            expires_at: self.code.expires_at,
            consumed_at: self.code.consumed_at,
            accepted_user_id: self.accepted_user_id,
            created_at: self.created_at,
        }
    }
}

/// API view of an invite; the code hash stays server side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteSummary {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub invited_by: Uuid,
    pub status: CodeStatus,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub accepted_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reissue_rotates_code_and_token() {
        let (mut invite, first) = Invite::new(
            "new@ecwa.org".into(),
            None,
            Role::Member,
            None,
            Uuid::new_v4(),
            Duration::hours(72),
        );
        let token_id = invite.token_id;
        let hash = invite.code.code_hash.clone();

        let second = invite.reissue(Duration::hours(72));
        assert_ne!(invite.token_id, token_id);
        assert!(invite.code.matches(&second));
        if first != second {
            assert_ne!(invite.code.code_hash, hash);
        }
    }

    #[test]
    fn summary_omits_code_hash() {
        let (invite, _) = Invite::new(
            "new@ecwa.org".into(),
            Some("Ada".into()),
            Role::FinancialSecretary,
            None,
            Uuid::new_v4(),
            Duration::hours(1),
        );
        let json = serde_json::to_value(invite.summary(Utc::now(), 5)).unwrap();
        assert!(json.get("code").is_none());
        assert_eq!(json["status"], "active");
    }
}
