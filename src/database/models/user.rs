use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{optional_phone, optional_text, Entity};
use crate::error::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    FinancialSecretary,
    Member,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::FinancialSecretary => 1,
            Role::Member => 0,
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Whether a user holding `self` may hand `other` to someone else
    pub fn can_grant(self, other: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin => other.rank() <= self.rank(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::FinancialSecretary => "financial_secretary",
            Role::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// bcrypt hash; absent until a magic-link user completes their profile
    pub password_hash: Option<String>,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email_verified: bool,
    pub profile_completed: bool,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const KIND: &'static str = "users";
    const LABEL: &'static str = "User";
    const CONFLICT_MESSAGE: &'static str = "A user with this email already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn organization_id(&self) -> Option<Uuid> {
        self.organization_id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.to_lowercase())
    }
}

/// Fields needed to create a user; the email must already be normalized
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email_verified: bool,
}

impl User {
    pub fn new(input: NewUser) -> Self {
        let now = Utc::now();
        let profile_completed = input.password_hash.is_some() && !input.name.trim().is_empty();
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            organization_id: input.organization_id,
            phone: input.phone,
            address: input.address,
            email_verified: input.email_verified,
            profile_completed,
            status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn refresh_profile_completed(&mut self) {
        self.profile_completed = self.password_hash.is_some() && !self.name.trim().is_empty();
    }
}

/// Public projection of a user; never exposes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub email_verified: bool,
    pub profile_completed: bool,
    pub has_password: bool,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            organization_id: user.organization_id,
            phone: user.phone.clone(),
            address: user.address.clone(),
            email_verified: user.email_verified,
            profile_completed: user.profile_completed,
            has_password: user.password_hash.is_some(),
            status: user.status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Administrative edit of another user
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub organization_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<UserStatus>,
}

/// Self-service profile edit
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Only accepted when the account has no password yet
    pub password: Option<String>,
}

impl User {
    /// Apply the contact fields shared by admin and self-service edits
    pub fn apply_contact(
        &mut self,
        name: Option<String>,
        phone: Option<String>,
        address: Option<String>,
    ) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = name {
            if let Some(name) = errors.require_text("name", Some(name)) {
                self.name = name;
            }
        }
        if phone.is_some() {
            self.phone = optional_phone(&mut errors, "phone", phone);
        }
        if address.is_some() {
            self.address = optional_text(address);
        }
        errors.into_result()?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(password_hash: Option<&str>) -> User {
        User::new(NewUser {
            name: "Grace Audu".into(),
            email: "grace@ecwa.org".into(),
            password_hash: password_hash.map(str::to_string),
            role: Role::Member,
            organization_id: None,
            phone: None,
            address: None,
            email_verified: false,
        })
    }

    #[test]
    fn role_grants() {
        assert!(Role::SuperAdmin.can_grant(Role::SuperAdmin));
        assert!(Role::Admin.can_grant(Role::FinancialSecretary));
        assert!(Role::Admin.can_grant(Role::Admin));
        assert!(!Role::Admin.can_grant(Role::SuperAdmin));
        assert!(!Role::FinancialSecretary.can_grant(Role::Member));
    }

    #[test]
    fn profile_completion_tracks_password() {
        assert!(user(Some("$2b$04$hash")).profile_completed);
        let mut pending = user(None);
        assert!(!pending.profile_completed);
        pending.password_hash = Some("$2b$04$hash".into());
        pending.refresh_profile_completed();
        assert!(pending.profile_completed);
    }

    #[test]
    fn profile_projection_hides_hash() {
        let profile = UserProfile::from(&user(Some("$2b$04$hash")));
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["has_password"], true);
        assert_eq!(json["role"], "member");
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut u = user(None);
        let err = u.apply_contact(Some("   ".into()), None, None).unwrap_err();
        assert!(err.contains("name"));
        assert_eq!(u.name, "Grace Audu");
    }
}
