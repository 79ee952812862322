use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "ChurchFlow API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Administration backend for ECWA church councils",
            "endpoints": {
                "health": "/health (public)",
                "auth": "/auth/{signup,login,logout,verify-email,resend-verification,forgot-password,reset-password} (public)",
                "invitations": "/auth/invitations/{verify,accept}, /auth/magic-link?token= (public)",
                "account": "/api/auth/{me,profile,password,refresh} (protected)",
                "organizations": "/api/organizations[/:id[/children]] (protected)",
                "records": "/api/{agencies,executives,income,expenditures,bank-accounts,salaries}[/:id] (protected)",
                "finance": "/api/finance/summary (protected)",
                "admin": "/api/users[/:id], /api/invitations[/:id[/resend]] (protected)",
            }
        }
    }))
}

/// GET /health - liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "store": backend,
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed on {} store: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "SERVICE_UNAVAILABLE",
                    "message": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": backend,
                    }
                })),
            )
        }
    }
}
