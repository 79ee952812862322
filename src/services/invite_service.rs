use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password};
use crate::auth::{CodeError, MagicLinkClaims};
use crate::database::models::invite::{CreateInvite, Invite, InviteSummary};
use crate::database::models::organization::Organization;
use crate::database::models::user::{NewUser, Role, User};
use crate::database::models::{optional_phone, optional_text, ADMIN_ROLES};
use crate::database::{Repository, StoreQuery};
use crate::error::{ApiError, FieldErrors};
use crate::middleware::AuthUser;
use crate::services::account_service::{required_email, AccountService, Session};
use crate::services::mailer::invitation_email;
use crate::services::one_time::{check_code, consume, redeem_code};
use crate::services::organization_service::OrganizationService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct VerifyInviteRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcceptInviteRequest {
    pub email: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InviteListQuery {
    pub status: Option<String>,
    pub organization_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Result of creating or resending an invite. The code itself is only ever
/// delivered by email.
#[derive(Debug, Clone, Serialize)]
pub struct InviteDelivery {
    pub invite: InviteSummary,
    pub email_sent: bool,
}

pub struct InviteService<'a> {
    state: &'a AppState,
    invites: Repository<Invite>,
    users: Repository<User>,
}

impl<'a> InviteService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            invites: state.repo(),
            users: state.repo(),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::hours(self.state.config.onboarding.invite_expiry_hours as i64)
    }

    fn max_attempts(&self) -> u32 {
        self.state.config.onboarding.code_max_attempts
    }

    fn summary(&self, invite: &Invite) -> InviteSummary {
        invite.summary(Utc::now(), self.max_attempts())
    }

    fn magic_link(&self, invite: &Invite) -> Result<String, ApiError> {
        let claims = MagicLinkClaims::new(invite.id, &invite.email, invite.token_id, invite.expires_at());
        let token = self.state.tokens.sign(&claims)?;
        Ok(format!(
            "{}/auth/magic-link?token={}",
            self.state.config.server.app_url.trim_end_matches('/'),
            token
        ))
    }

    /// Render and send the invitation. Failures are logged and reported as `false`.
    async fn deliver(&self, invite: &Invite, code: &str) -> Result<bool, ApiError> {
        let link = self.magic_link(invite)?;
        let organization = match invite.organization_id {
            Some(id) => self
                .state
                .repo::<Organization>()
                .select_one(id)
                .await?
                .map(|o| o.name),
            None => None,
        };
        let email = invitation_email(
            &self.state.config.mail,
            &invite.email,
            invite.name.as_deref(),
            organization.as_deref(),
            code,
            &link,
            invite.expires_at(),
        );
        match self.state.mailer.send(email).await {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("Invitation email to {} failed: {}", invite.email, e);
                Ok(false)
            }
        }
    }

    async fn invites_for(&self, email: &str) -> Result<Vec<Invite>, ApiError> {
        Ok(self
            .invites
            .select_any(&StoreQuery::new().filter("email", email.to_lowercase()))
            .await?)
    }

    /// Most recent invite addressed to `email`
    async fn latest_for(&self, email: &str) -> Result<Invite, ApiError> {
        self.invites_for(email)
            .await?
            .into_iter()
            .max_by_key(|i| i.created_at)
            .ok_or_else(|| ApiError::not_found("Invitation not found"))
    }

    pub async fn create(&self, auth: &AuthUser, input: CreateInvite) -> Result<InviteDelivery, ApiError> {
        auth.require(ADMIN_ROLES)?;

        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let (Some(email), true) = (email, errors.is_empty()) else {
            return Err(errors.into());
        };

        let role = input.role.unwrap_or(Role::Member);
        if !auth.role().can_grant(role) {
            return Err(ApiError::forbidden(format!("You cannot invite a user as {}", role.as_str())));
        }

        let organization_id = input.organization_id.or(auth.organization_id());
        match organization_id {
            Some(id) => {
                OrganizationService::new(self.state).ensure_writable(auth, id).await?;
            }
            None if auth.role() != Role::SuperAdmin => {
                let mut errors = FieldErrors::new();
                errors.add("organization_id", "This field is required");
                return Err(errors.into());
            }
            None => {}
        }

        if self.users.select_unique(&email).await?.is_some() {
            return Err(ApiError::conflict("A user with this email already exists"));
        }
        let now = Utc::now();
        let max = self.max_attempts();
        if self
            .invites_for(&email)
            .await?
            .iter()
            .any(|i| i.code.ensure_active(now, max).is_ok())
        {
            return Err(ApiError::conflict("An invitation is already pending for this email"));
        }

        let (invite, code) = Invite::new(
            email,
            optional_text(input.name),
            role,
            organization_id,
            auth.id(),
            self.ttl(),
        );
        self.invites.create(&invite).await?;
        tracing::info!(
            "Invitation {} sent to {} as {} by {}",
            invite.id,
            invite.email,
            role.as_str(),
            auth.user.email
        );

        let email_sent = self.deliver(&invite, &code).await?;
        Ok(InviteDelivery {
            invite: self.summary(&invite),
            email_sent,
        })
    }

    pub async fn list(&self, auth: &AuthUser, query: InviteListQuery) -> Result<Vec<InviteSummary>, ApiError> {
        auth.require(ADMIN_ROLES)?;
        let scope = OrganizationService::new(self.state).scope_for(&auth.user).await?;
        let ids = match query.organization_id {
            Some(id) => Some(scope.narrow(id)?),
            None => scope.ids(),
        };

        let invites = self.invites.select_any(&StoreQuery::new().scoped(ids)).await?;
        let summaries = invites
            .iter()
            .map(|i| self.summary(i))
            .filter(|s| match &query.status {
                Some(status) => serde_json::to_value(s.status).map_or(false, |v| v == status.as_str()),
                None => true,
            })
            .skip(query.offset.unwrap_or(0).max(0) as usize)
            .take(query.limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .collect();
        Ok(summaries)
    }

    async fn get_scoped(&self, auth: &AuthUser, id: Uuid) -> Result<Invite, ApiError> {
        auth.require(ADMIN_ROLES)?;
        let invite = self.invites.select_404(id).await?;
        let scope = OrganizationService::new(self.state).scope_for(&auth.user).await?;
        if !scope.contains(invite.organization_id) {
            return Err(ApiError::not_found("Invitation not found"));
        }
        Ok(invite)
    }

    pub async fn get(&self, auth: &AuthUser, id: Uuid) -> Result<InviteSummary, ApiError> {
        let invite = self.get_scoped(auth, id).await?;
        Ok(self.summary(&invite))
    }

    /// New code, new link, fresh expiry. The previous code and link stop working.
    pub async fn resend(&self, auth: &AuthUser, id: Uuid) -> Result<InviteDelivery, ApiError> {
        let before = self.get_scoped(auth, id).await?;
        if before.code.consumed_at.is_some() {
            return Err(ApiError::conflict("Invitation has already been accepted"));
        }

        let mut invite = before.clone();
        let code = invite.reissue(self.ttl());
        if !self.invites.update_if_unchanged(&before, &invite).await? {
            return Err(ApiError::conflict("Invitation changed while resending; try again"));
        }
        tracing::info!("Invitation {} reissued by {}", invite.id, auth.user.email);

        let email_sent = self.deliver(&invite, &code).await?;
        Ok(InviteDelivery {
            invite: self.summary(&invite),
            email_sent,
        })
    }

    pub async fn revoke(&self, auth: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let invite = self.get_scoped(auth, id).await?;
        if invite.code.consumed_at.is_some() {
            return Err(ApiError::conflict("Invitation has already been accepted"));
        }
        self.invites.delete(id).await?;
        tracing::info!("Invitation {} revoked by {}", id, auth.user.email);
        Ok(())
    }

    /// Check an emailed code without using it up
    pub async fn verify(&self, input: VerifyInviteRequest) -> Result<InviteSummary, ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let code = errors.require_text("code", input.code);
        let (Some(email), Some(code), true) = (email, code, errors.is_empty()) else {
            return Err(errors.into());
        };

        let invite = self.latest_for(&email).await?;
        check_code(&self.invites, &invite, &code, self.max_attempts()).await?;
        Ok(self.summary(&invite))
    }

    /// Redeem the code and create the account with the invited role
    pub async fn accept(&self, input: AcceptInviteRequest) -> Result<Session, ApiError> {
        let mut errors = FieldErrors::new();
        let email = required_email(&mut errors, input.email);
        let code = errors.require_text("code", input.code);
        let password = errors.require("password", input.password);
        if let Some(password) = &password {
            if let Err(e) = validate_password(password) {
                errors.add("password", e.to_string());
            }
        }
        let phone = optional_phone(&mut errors, "phone", input.phone);
        let (Some(email), Some(code), Some(password), true) = (email, code, password, errors.is_empty()) else {
            return Err(errors.into());
        };

        let invite = self.latest_for(&email).await?;
        if invite.code.consumed_at.is_some() {
            return Err(CodeError::Consumed.into());
        }
        let name = optional_text(input.name)
            .or_else(|| invite.name.clone())
            .ok_or_else(|| {
                let mut errors = FieldErrors::new();
                errors.add("name", "This field is required");
                ApiError::from(errors)
            })?;

        if self.users.select_unique(&email).await?.is_some() {
            return Err(ApiError::conflict("A user with this email already exists"));
        }

        let password_hash = hash_password(&password, self.state.config.security.bcrypt_cost).await?;
        let invite = redeem_code(&self.invites, invite, &code, self.max_attempts()).await?;

        let user = User::new(NewUser {
            name,
            email,
            password_hash: Some(password_hash),
            role: invite.role,
            organization_id: invite.organization_id,
            phone,
            address: optional_text(input.address),
            email_verified: true,
        });
        self.finish(invite, &user).await?;
        AccountService::new(self.state).issue_session(&user)
    }

    /// Sign in through an emailed link; the account has no password until the
    /// profile is completed
    pub async fn accept_magic_link(&self, token: &str) -> Result<Session, ApiError> {
        let claims: MagicLinkClaims = self.state.tokens.verify(token).map_err(|e| {
            tracing::warn!("Rejected magic link: {}", e);
            ApiError::from(e)
        })?;

        let invite = self
            .invites
            .select_one(claims.sub)
            .await?
            .ok_or_else(|| ApiError::gone("This invitation is no longer valid"))?;
        if invite.token_id != claims.jti || invite.email != claims.email {
            return Err(ApiError::gone("This link has been replaced by a newer invitation"));
        }
        if invite.code.consumed_at.is_some() {
            return Err(CodeError::Consumed.into());
        }
        if self.users.select_unique(&invite.email).await?.is_some() {
            return Err(ApiError::conflict("A user with this email already exists"));
        }

        let invite = consume(&self.invites, invite, self.max_attempts()).await?;
        let user = User::new(NewUser {
            name: invite.name.clone().unwrap_or_default(),
            email: invite.email.clone(),
            password_hash: None,
            role: invite.role,
            organization_id: invite.organization_id,
            phone: None,
            address: None,
            email_verified: true,
        });
        self.finish(invite, &user).await?;
        AccountService::new(self.state).issue_session(&user)
    }

    /// Create the account for a just-consumed invite. When the account cannot
    /// be created the consumption is rolled back so the invite stays usable.
    async fn finish(&self, invite: Invite, user: &User) -> Result<(), ApiError> {
        if let Err(e) = self.users.create(user).await {
            let mut restored = invite.clone();
            restored.code.consumed_at = None;
            match self.invites.update_if_unchanged(&invite, &restored).await {
                Ok(true) => tracing::warn!("Invitation {} released after failed account creation: {}", invite.id, e),
                Ok(false) => tracing::warn!("Invitation {} changed before it could be released", invite.id),
                Err(release) => tracing::error!("Failed to release invitation {}: {}", invite.id, release),
            }
            return Err(e.into());
        }

        let user_id = user.id;
        let invite = self
            .invites
            .modify(invite.id, |invite: &mut Invite| -> Result<(), ApiError> {
                invite.accepted_user_id = Some(user_id);
                invite.updated_at = Utc::now();
                Ok(())
            })
            .await?;
        tracing::info!("Invitation {} accepted by {} ({})", invite.id, user.email, user.role.as_str());
        Ok(())
    }
}
