// handlers/protected/resource.rs - Generic CRUD for organization-owned records
//
// One set of handlers serves agencies, executives, income, expenditures,
// bank accounts and salaries. Routes instantiate them per type:
//
//     get(resource::list::<Agency>).post(resource::create::<Agency>)
//
// Visibility follows the caller's organization scope: records outside it
// read as 404 and cannot be created (403).

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::review::{ReviewDecision, ReviewStatus, Reviewable};
use crate::database::models::salary::Salary;
use crate::database::models::{NewRecord, Resource, ADMIN_ROLES};
use crate::database::StoreQuery;
use crate::error::{ApiError, FieldErrors};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::OrganizationService;
use crate::state::AppState;

fn parse_number(params: &HashMap<String, String>, key: &str) -> Result<Option<i64>, ApiError> {
    match params.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Invalid {} parameter: {}", key, raw))),
    }
}

/// Build the store query for a list request: scope, declared filters, paging
async fn list_query<T: Resource>(
    state: &AppState,
    auth: &AuthUser,
    params: &HashMap<String, String>,
) -> Result<StoreQuery, ApiError> {
    let scope = OrganizationService::new(state).scope_for(&auth.user).await?;
    let ids = match params.get("organization_id") {
        Some(raw) => {
            let id = Uuid::parse_str(raw)
                .map_err(|_| ApiError::bad_request(format!("Invalid organization_id: {}", raw)))?;
            Some(scope.narrow(id)?)
        }
        None => scope.ids(),
    };

    let mut query = StoreQuery::new().scoped(ids).page(
        parse_number(params, "limit")?,
        parse_number(params, "offset")?,
    );
    for field in T::FILTERS {
        if let Some(value) = params.get(*field) {
            query = query.filter(*field, value.clone());
        }
    }
    Ok(query)
}

/// Load a record visible to `auth`
async fn visible<T: Resource>(state: &AppState, auth: &AuthUser, id: Uuid) -> Result<T, ApiError> {
    let scope = OrganizationService::new(state).scope_for(&auth.user).await?;
    match state.repo::<T>().select_one(id).await? {
        Some(record) if scope.contains(record.organization_id()) => Ok(record),
        _ => Err(ApiError::not_found(format!("{} not found", T::LABEL))),
    }
}

pub async fn list<T: Resource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<T>> {
    auth.require(T::READ_ROLES)?;
    let query = list_query::<T>(&state, &auth, &params).await?;
    let records = state.repo::<T>().select_any(&query).await?;
    Ok(ApiResponse::success(records))
}

pub async fn get<T: Resource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<T> {
    auth.require(T::READ_ROLES)?;
    let record = visible::<T>(&state, &auth, id).await?;
    Ok(ApiResponse::success(record))
}

/// POST - the record lands in `organization_id` when given, else the caller's organization
pub async fn create<T: Resource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(body): ApiJson<T::Create>,
) -> ApiResult<T> {
    auth.require(T::WRITE_ROLES)?;

    let Some(organization_id) = T::requested_organization(&body).or(auth.organization_id()) else {
        let mut errors = FieldErrors::new();
        errors.add("organization_id", "Organization is required");
        return Err(errors.into());
    };
    OrganizationService::new(&state)
        .ensure_writable(&auth, organization_id)
        .await?;

    let record = T::build(
        body,
        NewRecord {
            organization_id,
            created_by: auth.id(),
            now: Utc::now(),
        },
    )?;
    state.repo::<T>().create(&record).await?;
    tracing::info!("{} {} created by {}", T::LABEL, record.id(), auth.user.email);
    Ok(ApiResponse::created(record))
}

pub async fn update<T: Resource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(body): ApiJson<T::Update>,
) -> ApiResult<T> {
    auth.require(T::WRITE_ROLES)?;
    let before = visible::<T>(&state, &auth, id).await?;
    before.ensure_mutable().map_err(ApiError::conflict)?;

    let mut after = before.clone();
    after.apply(body, Utc::now())?;
    // A concurrent review or payment must not be overwritten by a stale edit
    if !state.repo::<T>().update_if_unchanged(&before, &after).await? {
        return Err(ApiError::conflict(format!("{} was modified concurrently", T::LABEL)));
    }
    Ok(ApiResponse::success(after))
}

pub async fn delete<T: Resource>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    auth.require(T::WRITE_ROLES)?;
    let record = visible::<T>(&state, &auth, id).await?;
    record.ensure_mutable().map_err(ApiError::conflict)?;

    state.repo::<T>().delete(id).await?;
    tracing::info!("{} {} deleted by {}", T::LABEL, id, auth.user.email);
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}

async fn decide<T: Resource + Reviewable>(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    status: ReviewStatus,
    decision: ReviewDecision,
) -> Result<T, ApiError> {
    auth.require(ADMIN_ROLES)?;
    let before = visible::<T>(state, auth, id).await?;

    let now = Utc::now();
    let mut after = before.clone();
    after
        .review_mut()
        .decide(status, auth.id(), decision.note, now)
        .map_err(|current| ApiError::conflict(format!("{} is already {}", T::LABEL, current.as_str())))?;
    after.touch(now);

    // Two reviewers racing: exactly one decision lands
    if !state.repo::<T>().update_if_unchanged(&before, &after).await? {
        return Err(ApiError::conflict(format!("{} has already been reviewed", T::LABEL)));
    }
    tracing::info!("{} {} {} by {}", T::LABEL, id, status.as_str(), auth.user.email);
    Ok(after)
}

/// POST /:id/approve - optional body `{ "note": "..." }`
pub async fn approve<T: Resource + Reviewable>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<ApiJson<ReviewDecision>>,
) -> ApiResult<T> {
    let decision = body.map(|ApiJson(d)| d).unwrap_or_default();
    let record = decide::<T>(&state, &auth, id, ReviewStatus::Approved, decision).await?;
    Ok(ApiResponse::success(record))
}

/// POST /:id/reject - optional body `{ "note": "..." }`
pub async fn reject<T: Resource + Reviewable>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<ApiJson<ReviewDecision>>,
) -> ApiResult<T> {
    let decision = body.map(|ApiJson(d)| d).unwrap_or_default();
    let record = decide::<T>(&state, &auth, id, ReviewStatus::Rejected, decision).await?;
    Ok(ApiResponse::success(record))
}

/// POST /api/salaries/:id/pay
pub async fn pay(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Salary> {
    auth.require(ADMIN_ROLES)?;
    let before = visible::<Salary>(&state, &auth, id).await?;

    let mut after = before.clone();
    after.mark_paid(auth.id(), Utc::now()).map_err(ApiError::conflict)?;
    if !state.repo::<Salary>().update_if_unchanged(&before, &after).await? {
        return Err(ApiError::conflict("Salary has already been paid"));
    }
    tracing::info!("Salary {} for {} paid by {}", id, after.employee_name, auth.user.email);
    Ok(ApiResponse::success(after))
}
