use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::account_service::{EmailRequest, ResetPasswordRequest};
use crate::services::AccountService;
use crate::state::AppState;

/// POST /auth/forgot-password - `{ "email" }`
pub async fn forgot_password_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailRequest>,
) -> ApiResult<Value> {
    AccountService::new(&state).forgot_password(body).await?;
    Ok(ApiResponse::success(json!({
        "message": "If the address is registered, a reset code has been sent"
    })))
}

/// POST /auth/reset-password - `{ "email", "code", "password" }`
pub async fn reset_password_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Value> {
    AccountService::new(&state).reset_password(body).await?;
    Ok(ApiResponse::success(json!({ "password_reset": true })))
}
