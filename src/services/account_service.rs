use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::code::CodeStatus;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::config::BootstrapAdmin;
use crate::database::models::organization::Organization;
use crate::database::models::user::{NewUser, ProfileUpdate, Role, User, UserProfile};
use crate::database::models::verification::{CodePurpose, VerificationCode};
use crate::database::models::{optional_phone, optional_text, validate_email_format};
use crate::database::Repository;
use crate::error::{ApiError, FieldErrors};
use crate::services::mailer::{password_reset_email, verification_email};
use crate::services::one_time::redeem_code;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization_id: Option<Uuid>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailCodeRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// A freshly issued session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupResponse {
    pub user: UserProfile,
    pub verification_required: bool,
}

pub(crate) fn required_email(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    let email = errors.require_text("email", value)?;
    match validate_email_format(&email) {
        Ok(email) => Some(email),
        Err(msg) => {
            errors.add("email", msg);
            None
        }
    }
}

pub struct AccountService<'a> {
    state: &'a AppState,
    users: Repository<User>,
    codes: Repository<VerificationCode>,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            users: state.repo(),
            codes: state.repo(),
        }
    }

    fn code_ttl(&self) -> Duration {
        Duration::minutes(self.state.config.onboarding.code_expiry_minutes as i64)
    }

    fn max_attempts(&self) -> u32 {
        self.state.config.onboarding.code_max_attempts
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.users.select_unique(&email.to_lowercase()).await?)
    }

    pub fn issue_session(&self, user: &User) -> Result<Session, ApiError> {
        let hours = self.state.config.security.jwt_expiry_hours as i64;
        let token = self.state.tokens.issue_session(user, Duration::hours(hours))?;
        Ok(Session {
            token,
            expires_in: hours * 3600,
            user: UserProfile::from(user),
        })
    }

    /// Public self-registration as a `member`
    pub async fn signup(&self, input: SignupRequest) -> Result<SignupResponse, ApiError> {
        if !self.state.config.security.allow_signup {
            return Err(ApiError::forbidden("Self-registration is disabled; ask an administrator for an invitation"));
        }

        let mut errors = FieldErrors::new();
        let name = errors.require_text("name", input.name);
        let email = required_email(&mut errors, input.email);
        let password = errors.require("password", input.password);
        if let Some(password) = &password {
            if let Err(e) = validate_password(password) {
                errors.add("password", e.to_string());
            }
        }
        let phone = optional_phone(&mut errors, "phone", input.phone);
        if let Some(organization_id) = input.organization_id {
            if self.state.repo::<Organization>().select_one(organization_id).await?.is_none() {
                errors.add("organization_id", "Organization does not exist");
            }
        }

        let (Some(name), Some(email), Some(password), true) = (name, email, password, errors.is_empty()) else {
            return Err(errors.into());
        };

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict("A user with this email already exists"));
        }

        let verification_required = self.state.config.security.require_email_verification;
        let password_hash = hash_password(&password, self.state.config.security.bcrypt_cost).await?;
        let user = User::new(NewUser {
            name,
            email,
            password_hash: Some(password_hash),
            role: Role::Member,
            organization_id: input.organization_id,
            phone,
            address: optional_text(input.address),
            email_verified: !verification_required,
        });
        self.users.create(&user).await?;
        tracing::info!("New signup: {}", user.email);

        if verification_required {
            self.send_code(&user, CodePurpose::EmailVerification).await?;
        }

        Ok(SignupResponse {
            user: UserProfile::from(&user),
            verification_required,
        })
    }

    pub async fn login(&self, input: LoginRequest) -> Result<Session, ApiError> {
        let mut errors = FieldErrors::new();
        let email = errors.require_text("email", input.email);
        let password = errors.require("password", input.password);
        let (Some(email), Some(password), true) = (email, password, errors.is_empty()) else {
            return Err(errors.into());
        };

        let invalid = || ApiError::unauthorized("Invalid email or password");
        let Some(user) = self.find_by_email(email.trim()).await? else {
            tracing::warn!("Login failed for unknown email {}", email.trim());
            return Err(invalid());
        };
        let Some(hash) = user.password_hash.as_deref() else {
            tracing::warn!("Login failed for {}: no password set", user.email);
            return Err(invalid());
        };
        if !verify_password(&password, hash).await? {
            tracing::warn!("Login failed for {}: wrong password", user.email);
            return Err(invalid());
        }
        if !user.is_active() {
            tracing::warn!("Login refused for disabled account {}", user.email);
            return Err(ApiError::forbidden("Account is disabled"));
        }
        if self.state.config.security.require_email_verification && !user.email_verified {
            return Err(ApiError::forbidden("Email address has not been verified"));
        }

        // Status and credentials are re-checked against the stored copy so a
        // concurrent disable or password change is neither lost nor bypassed
        let verified_hash = user.password_hash.clone();
        let user = self
            .users
            .modify(user.id, |fresh: &mut User| -> Result<(), ApiError> {
                if fresh.password_hash != verified_hash {
                    return Err(invalid());
                }
                if !fresh.is_active() {
                    return Err(ApiError::forbidden("Account is disabled"));
                }
                fresh.last_login_at = Some(Utc::now());
                Ok(())
            })
            .await?;
        tracing::info!("User {} logged in", user.email);
        self.issue_session(&user)
    }

    /// Issue (or replace) the user's code for `purpose` and email it.
    /// Delivery failures are logged, not returned.
    ///
    /// A replacement inherits the failed-attempt count of a still-live code,
    /// and nothing is reissued while a locked code has not yet expired, so
    /// requesting new codes never resets the guess budget.
    pub async fn send_code(&self, user: &User, purpose: CodePurpose) -> Result<(), ApiError> {
        let (mut record, plain) = VerificationCode::new(user.id, &user.email, purpose, self.code_ttl());
        match self.codes.select_unique(&VerificationCode::key(purpose, &user.email)).await? {
            Some(existing) => {
                let now = Utc::now();
                match existing.code.status(now, self.max_attempts()) {
                    CodeStatus::Locked if now < existing.code.expires_at => {
                        tracing::warn!("Not reissuing locked {} code for {}", purpose.as_str(), user.email);
                        return Ok(());
                    }
                    CodeStatus::Active => record.code.attempts = existing.code.attempts,
                    _ => {}
                }
                record.id = existing.id;
                if !self.codes.update_if_unchanged(&existing, &record).await? {
                    tracing::debug!("{} code for {} was replaced concurrently", purpose.as_str(), user.email);
                    return Ok(());
                }
            }
            None => self.codes.create(&record).await?,
        }

        let mail = &self.state.config.mail;
        let minutes = self.state.config.onboarding.code_expiry_minutes;
        let email = match purpose {
            CodePurpose::EmailVerification => verification_email(mail, &user.email, &user.name, &plain, minutes),
            CodePurpose::PasswordReset => password_reset_email(mail, &user.email, &user.name, &plain, minutes),
        };
        if let Err(e) = self.state.mailer.send(email).await {
            tracing::warn!("Failed to send {} email to {}: {}", purpose.as_str(), user.email, e);
        }
        Ok(())
    }

    async fn redeem(&self, email: &str, code: &str, purpose: CodePurpose) -> Result<VerificationCode, ApiError> {
        let record = self
            .codes
            .select_unique(&VerificationCode::key(purpose, email))
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid code"))?;
        redeem_code(&self.codes, record, code, self.max_attempts()).await
    }

    pub async fn verify_email(&self, input: EmailCodeRequest) -> Result<UserProfile, ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let code = errors.require_text("code", input.code);
        let (Some(email), Some(code), true) = (email, code, errors.is_empty()) else {
            return Err(errors.into());
        };

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid code"))?;
        if user.email_verified {
            return Ok(UserProfile::from(&user));
        }

        let record = self.redeem(&email, &code, CodePurpose::EmailVerification).await?;
        if record.user_id != user.id {
            return Err(ApiError::bad_request("Invalid code"));
        }

        let user = self
            .users
            .modify(user.id, |fresh: &mut User| -> Result<(), ApiError> {
                fresh.email_verified = true;
                fresh.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        tracing::info!("Email verified for {}", user.email);
        Ok(UserProfile::from(&user))
    }

    /// Always succeeds so callers cannot probe for registered addresses
    pub async fn resend_verification(&self, input: EmailRequest) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let (Some(email), true) = (email, errors.is_empty()) else {
            return Err(errors.into());
        };

        if let Some(user) = self.find_by_email(&email).await? {
            if !user.email_verified {
                self.send_code(&user, CodePurpose::EmailVerification).await?;
            }
        }
        Ok(())
    }

    /// Always succeeds so callers cannot probe for registered addresses
    pub async fn forgot_password(&self, input: EmailRequest) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let (Some(email), true) = (email, errors.is_empty()) else {
            return Err(errors.into());
        };

        match self.find_by_email(&email).await? {
            Some(user) if user.is_active() => {
                self.send_code(&user, CodePurpose::PasswordReset).await?;
                tracing::info!("Password reset requested for {}", user.email);
            }
            _ => tracing::info!("Password reset requested for unknown or disabled address"),
        }
        Ok(())
    }

    pub async fn reset_password(&self, input: ResetPasswordRequest) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let code = errors.require_text("code", input.code);
        let password = errors.require("password", input.password);
        if let Some(password) = &password {
            if let Err(e) = validate_password(password) {
                errors.add("password", e.to_string());
            }
        }
        let (Some(email), Some(code), Some(password), true) = (email, code, password, errors.is_empty()) else {
            return Err(errors.into());
        };

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid code"))?;
        let record = self.redeem(&email, &code, CodePurpose::PasswordReset).await?;
        if record.user_id != user.id {
            return Err(ApiError::bad_request("Invalid code"));
        }

        let password_hash = hash_password(&password, self.state.config.security.bcrypt_cost).await?;
        let user = self
            .users
            .modify(user.id, |fresh: &mut User| -> Result<(), ApiError> {
                fresh.password_hash = Some(password_hash.clone());
                // Receiving the code proves control of the mailbox
                fresh.email_verified = true;
                fresh.refresh_profile_completed();
                fresh.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        tracing::info!("Password reset for {}", user.email);
        Ok(())
    }

    pub async fn change_password(&self, user: User, input: ChangePasswordRequest) -> Result<UserProfile, ApiError> {
        let mut errors = FieldErrors::new();
        let current = errors.require("current_password", input.current_password);
        let new_password = errors.require("new_password", input.new_password);
        if let Some(new_password) = &new_password {
            if let Err(e) = validate_password(new_password) {
                errors.add("new_password", e.to_string());
            }
        }
        let (Some(current), Some(new_password), true) = (current, new_password, errors.is_empty()) else {
            return Err(errors.into());
        };

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(ApiError::bad_request("No password is set; complete your profile instead"));
        };
        if !verify_password(&current, hash).await? {
            tracing::warn!("Password change for {} rejected: wrong current password", user.email);
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }

        let verified_hash = user.password_hash.clone();
        let password_hash = hash_password(&new_password, self.state.config.security.bcrypt_cost).await?;
        let user = self
            .users
            .modify(user.id, |fresh: &mut User| -> Result<(), ApiError> {
                if fresh.password_hash != verified_hash {
                    return Err(ApiError::conflict("Password was changed by another request"));
                }
                fresh.password_hash = Some(password_hash.clone());
                fresh.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        tracing::info!("Password changed for {}", user.email);
        Ok(UserProfile::from(&user))
    }

    /// Self-service profile edit; also sets the first password for accounts
    /// created through a magic link
    pub async fn complete_profile(&self, user: User, input: ProfileUpdate) -> Result<UserProfile, ApiError> {
        let already_set = || ApiError::bad_request("Password is already set; use the change password endpoint");
        // Contact fields are validated before paying for a bcrypt hash
        user.clone()
            .apply_contact(input.name.clone(), input.phone.clone(), input.address.clone())?;

        let password_hash = match input.password.as_deref() {
            Some(_) if user.password_hash.is_some() => return Err(already_set()),
            Some(password) => Some(hash_password(password, self.state.config.security.bcrypt_cost).await?),
            None => None,
        };

        let user = self
            .users
            .modify(user.id, |fresh: &mut User| -> Result<(), ApiError> {
                fresh.apply_contact(input.name.clone(), input.phone.clone(), input.address.clone())?;
                if let Some(hash) = &password_hash {
                    if fresh.password_hash.is_some() {
                        return Err(already_set());
                    }
                    fresh.password_hash = Some(hash.clone());
                }
                fresh.refresh_profile_completed();
                Ok(())
            })
            .await?;
        Ok(UserProfile::from(&user))
    }

    /// Create the configured super admin unless the address is already taken
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<bool, ApiError> {
        let email = validate_email_format(&admin.email).map_err(ApiError::bad_request)?;
        if self.find_by_email(&email).await?.is_some() {
            tracing::debug!("Bootstrap admin {} already exists", email);
            return Ok(false);
        }

        let password_hash = hash_password(&admin.password, self.state.config.security.bcrypt_cost).await?;
        let user = User::new(NewUser {
            name: admin.name.clone(),
            email,
            password_hash: Some(password_hash),
            role: Role::SuperAdmin,
            organization_id: None,
            phone: None,
            address: None,
            email_verified: true,
        });
        match self.users.create(&user).await {
            Ok(()) => {
                tracing::info!("Bootstrapped super admin {}", user.email);
                Ok(true)
            }
            // Another instance won the race
            Err(crate::database::DatabaseError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
