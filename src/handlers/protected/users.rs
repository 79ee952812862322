use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::user::{UpdateUser, UserProfile};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::UserListQuery;
use crate::services::UserService;
use crate::state::AppState;

pub async fn users_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Vec<UserProfile>> {
    let users = UserService::new(&state).list(&auth, query).await?;
    Ok(ApiResponse::success(users))
}

pub async fn user_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserProfile> {
    let user = UserService::new(&state).get(&auth, id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:id - role, status, organization and contact fields
pub async fn user_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateUser>,
) -> ApiResult<UserProfile> {
    let user = UserService::new(&state).update(&auth, id, body).await?;
    Ok(ApiResponse::success(user))
}

pub async fn user_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    UserService::new(&state).delete(&auth, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
