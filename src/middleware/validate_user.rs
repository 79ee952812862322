use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::SessionClaims;
use crate::database::models::user::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

/// The signed-in user, loaded fresh from the store on every request
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub claims: SessionClaims,
}

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn organization_id(&self) -> Option<Uuid> {
        self.user.organization_id
    }

    /// 403 unless the user holds one of `roles`
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            tracing::warn!(
                "User {} ({}) denied: requires one of {:?}",
                self.user.email,
                self.user.role.as_str(),
                roles
            );
            Err(ApiError::forbidden("You do not have permission to perform this action"))
        }
    }
}

/// Middleware that validates the user named by the session claims.
/// Runs after `jwt_auth_middleware`.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = request
        .extensions()
        .get::<SessionClaims>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.repo::<User>().select_one(claims.sub).await?.ok_or_else(|| {
        tracing::warn!("User validation failed: user {} no longer exists", claims.sub);
        ApiError::unauthorized("Session is no longer valid")
    })?;

    if !user.email.eq_ignore_ascii_case(&claims.email) {
        tracing::warn!(
            "User validation failed: token email '{}' does not match '{}'",
            claims.email,
            user.email
        );
        return Err(ApiError::unauthorized("Session is no longer valid"));
    }

    if !user.is_active() {
        tracing::warn!("User validation failed: {} is disabled", user.email);
        return Err(ApiError::forbidden("Account is disabled"));
    }

    tracing::debug!("Authenticated {} ({})", user.email, user.role.as_str());
    request.extensions_mut().insert(AuthUser { user, claims });

    Ok(next.run(request).await)
}
