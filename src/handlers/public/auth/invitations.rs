use axum::extract::{Query, State};
use serde::Deserialize;

use crate::auth::session_cookie;
use crate::database::models::invite::InviteSummary;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::account_service::Session;
use crate::services::invite_service::{AcceptInviteRequest, VerifyInviteRequest};
use crate::services::InviteService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MagicLinkQuery {
    pub token: Option<String>,
}

/// POST /auth/invitations/verify - check an invitation code without using it
pub async fn invitation_verify(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyInviteRequest>,
) -> ApiResult<InviteSummary> {
    let invite = InviteService::new(&state).verify(body).await?;
    Ok(ApiResponse::success(invite))
}

/// POST /auth/invitations/accept - redeem the code, create the account and sign in
pub async fn invitation_accept(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<AcceptInviteRequest>,
) -> ApiResult<Session> {
    let session = InviteService::new(&state).accept(body).await?;
    let cookie = session_cookie(&session.token, state.config.security.cookie_secure);
    Ok(ApiResponse::created(session).with_cookie(cookie))
}

/// GET /auth/magic-link?token= - sign in from an invitation email
pub async fn magic_link(
    State(state): State<AppState>,
    Query(query): Query<MagicLinkQuery>,
) -> ApiResult<Session> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing token"))?;
    let session = InviteService::new(&state).accept_magic_link(token.trim()).await?;
    let cookie = session_cookie(&session.token, state.config.security.cookie_secure);
    Ok(ApiResponse::success(session).with_cookie(cookie))
}
