use axum::{
    extract::{Query, State},
    Extension,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::finance_service::{self, FinanceSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub organization_id: Option<Uuid>,
}

/// GET /api/finance/summary[?organization_id=]
pub async fn summary_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<FinanceSummary> {
    let summary = finance_service::summary(&state, &auth, query.organization_id).await?;
    Ok(ApiResponse::success(summary))
}
