use axum::extract::State;
use serde_json::{json, Value};

use crate::database::models::user::UserProfile;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::account_service::{EmailCodeRequest, EmailRequest};
use crate::services::AccountService;
use crate::state::AppState;

/// POST /auth/verify-email - `{ "email", "code" }`
pub async fn verify_email_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailCodeRequest>,
) -> ApiResult<UserProfile> {
    let profile = AccountService::new(&state).verify_email(body).await?;
    Ok(ApiResponse::success(profile))
}

/// POST /auth/resend-verification - `{ "email" }`; answers the same whether or not the address exists
pub async fn resend_verification_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<EmailRequest>,
) -> ApiResult<Value> {
    AccountService::new(&state).resend_verification(body).await?;
    Ok(ApiResponse::success(json!({
        "message": "If the address is registered and unverified, a new code has been sent"
    })))
}
