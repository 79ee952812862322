use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::organization::{
    CreateOrganization, Organization, OrganizationType, UpdateOrganization,
};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::OrganizationService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationQuery {
    #[serde(rename = "type")]
    pub org_type: Option<OrganizationType>,
    pub parent_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/organizations[?type=&parent_id=&limit=&offset=]
pub async fn organizations_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<OrganizationQuery>,
) -> ApiResult<Vec<Organization>> {
    let organizations = OrganizationService::new(&state)
        .list(&auth, query.org_type, query.parent_id, query.limit, query.offset)
        .await?;
    Ok(ApiResponse::success(organizations))
}

pub async fn organization_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Organization> {
    let organization = OrganizationService::new(&state).get(&auth, id).await?;
    Ok(ApiResponse::success(organization))
}

/// GET /api/organizations/:id/children
pub async fn organization_children(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Organization>> {
    let children = OrganizationService::new(&state).children(&auth, id).await?;
    Ok(ApiResponse::success(children))
}

/// POST /api/organizations - the parent must be the type directly above
pub async fn organization_create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<CreateOrganization>,
) -> ApiResult<Organization> {
    let organization = OrganizationService::new(&state).create(&auth, body).await?;
    Ok(ApiResponse::created(organization))
}

pub async fn organization_update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<UpdateOrganization>,
) -> ApiResult<Organization> {
    let organization = OrganizationService::new(&state).update(&auth, id, body).await?;
    Ok(ApiResponse::success(organization))
}

pub async fn organization_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    OrganizationService::new(&state).delete(&auth, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
