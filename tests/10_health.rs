mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::TestApp;

#[tokio::test]
async fn health_reports_store() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/health", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["status"], "ok");
    assert_eq!(res.body["data"]["store"], "memory");
    Ok(())
}

#[tokio::test]
async fn root_describes_service() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "ChurchFlow API");
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_session() -> Result<()> {
    let app = TestApp::new();
    let res = app.request(Method::GET, "/api/auth/me", None, None).await?;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.error_code(), "UNAUTHORIZED");

    let res = app.get("/api/organizations", "not-a-token").await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
