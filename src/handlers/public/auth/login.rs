use axum::extract::State;
use serde_json::{json, Value};

use crate::auth::{clear_session_cookie, session_cookie};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::account_service::{LoginRequest, Session};
use crate::services::AccountService;
use crate::state::AppState;

/// POST /auth/login - email + password for a session token
///
/// The token is set as the `auth-token` cookie and also returned in the body
/// for clients that prefer a Bearer header.
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Session> {
    let session = AccountService::new(&state).login(body).await?;
    let cookie = session_cookie(&session.token, state.config.security.cookie_secure);
    Ok(ApiResponse::success(session).with_cookie(cookie))
}

/// POST /auth/logout - clear the session cookie
pub async fn logout_post(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "logged_out": true }))
        .with_cookie(clear_session_cookie(state.config.security.cookie_secure)))
}
