use axum::{extract::State, Extension};

use crate::auth::session_cookie;
use crate::database::models::user::{ProfileUpdate, UserProfile};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::{ChangePasswordRequest, Session};
use crate::services::AccountService;
use crate::state::AppState;

/// GET /api/auth/me
pub async fn me_get(Extension(auth): Extension<AuthUser>) -> ApiResult<UserProfile> {
    Ok(ApiResponse::success(UserProfile::from(&auth.user)))
}

/// PUT /api/auth/profile - name, phone, address; `password` only while none is set
pub async fn profile_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let profile = AccountService::new(&state).complete_profile(auth.user, body).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/auth/password - `{ "current_password", "new_password" }`
pub async fn password_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<UserProfile> {
    let profile = AccountService::new(&state).change_password(auth.user, body).await?;
    Ok(ApiResponse::success(profile))
}

/// POST /api/auth/refresh - new session token reflecting the current role and organization
pub async fn refresh_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Session> {
    let session = AccountService::new(&state).issue_session(&auth.user)?;
    tracing::debug!("Session refreshed for {}", auth.user.email);
    let cookie = session_cookie(&session.token, state.config.security.cookie_secure);
    Ok(ApiResponse::success(session).with_cookie(cookie))
}
