use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::invite::{CreateInvite, InviteSummary};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::invite_service::{InviteDelivery, InviteListQuery};
use crate::services::InviteService;
use crate::state::AppState;

/// GET /api/invitations[?status=&organization_id=&limit=&offset=]
pub async fn invitations_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<InviteListQuery>,
) -> ApiResult<Vec<InviteSummary>> {
    let invites = InviteService::new(&state).list(&auth, query).await?;
    Ok(ApiResponse::success(invites))
}

/// POST /api/invitations - `{ "email", "name", "role", "organization_id" }`
pub async fn invitation_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateInvite>,
) -> ApiResult<InviteDelivery> {
    let delivery = InviteService::new(&state).create(&auth, body).await?;
    Ok(ApiResponse::created(delivery))
}

pub async fn invitation_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<InviteSummary> {
    let invite = InviteService::new(&state).get(&auth, id).await?;
    Ok(ApiResponse::success(invite))
}

/// DELETE /api/invitations/:id - revoke
pub async fn invitation_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    InviteService::new(&state).revoke(&auth, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "revoked": true })))
}

/// POST /api/invitations/:id/resend - new code, new link, fresh expiry
pub async fn invitation_resend(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<InviteDelivery> {
    let delivery = InviteService::new(&state).resend(&auth, id).await?;
    Ok(ApiResponse::success(delivery))
}
