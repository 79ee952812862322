use axum::extract::State;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::account_service::{SignupRequest, SignupResponse};
use crate::services::AccountService;
use crate::state::AppState;

/// POST /auth/signup - register a `member` account
///
/// ```json
/// { "name": "Grace Audu", "email": "grace@ecwa.org", "password": "********",
///   "organization_id": "uuid (optional)", "phone": "optional", "address": "optional" }
/// ```
///
/// 201 with the profile; 409 when the email is taken; 403 when sign-up is disabled.
pub async fn signup_post(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> ApiResult<SignupResponse> {
    let response = AccountService::new(&state).signup(body).await?;
    Ok(ApiResponse::created(response))
}
