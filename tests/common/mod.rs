#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use churchflow_api::config::AppConfig;
use churchflow_api::database::models::organization::{CreateOrganization, Organization, OrganizationType};
use churchflow_api::database::models::user::{NewUser, Role, User};
use churchflow_api::database::{MemoryStore, Repository, Store};
use churchflow_api::services::mailer::MemoryMailer;
use churchflow_api::{app, AppState};

pub const PASSWORD: &str = "correct-horse-battery";

/// Test configuration: development preset with the cheapest bcrypt cost
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = 4;
    config
}

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `auth-token` value from a Set-Cookie header, if any
    pub fn cookie_token(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("auth-token="))
            .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
    }

    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(test_config(), MemoryMailer::new())
    }

    pub fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = test_config();
        configure(&mut config);
        Self::build(config, MemoryMailer::new())
    }

    pub fn with_mailer(mailer: MemoryMailer) -> Self {
        Self::build(test_config(), mailer)
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        let mailer = Arc::new(MemoryMailer::new());
        let state = AppState::new(test_config(), store, mailer.clone());
        Self { state, mailer }
    }

    fn build(config: AppConfig, mailer: MemoryMailer) -> Self {
        let mailer = Arc::new(mailer);
        let state = AppState::new(config, Arc::new(MemoryStore::new()), mailer.clone());
        Self { state, mailer }
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body from {}", uri))?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<TestResponse> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<TestResponse> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn seed_org(&self, name: &str, org_type: OrganizationType, parent: Option<&Organization>) -> Result<Organization> {
        let org = Organization::build(
            CreateOrganization {
                name: Some(name.to_string()),
                org_type: Some(org_type),
                parent_id: parent.map(|p| p.id),
                ..Default::default()
            },
            parent,
        )
        .map_err(|e| anyhow::anyhow!("invalid seed organization: {:?}", e))?;
        Repository::<Organization>::new(self.state.store.clone()).create(&org).await?;
        Ok(org)
    }

    /// A verified, active user with `PASSWORD`
    pub async fn seed_user(&self, email: &str, role: Role, organization_id: Option<Uuid>) -> Result<User> {
        let hash = bcrypt::hash(PASSWORD, 4)?;
        let user = User::new(NewUser {
            name: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            password_hash: Some(hash),
            role,
            organization_id,
            phone: None,
            address: None,
            email_verified: true,
        });
        Repository::<User>::new(self.state.store.clone()).create(&user).await?;
        Ok(user)
    }

    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .post("/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await?;
        anyhow::ensure!(res.status == StatusCode::OK, "login for {} failed: {}", email, res.body);
        res.body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    /// Seed a user and sign them in
    pub async fn user_token(&self, email: &str, role: Role, organization_id: Option<Uuid>) -> Result<String> {
        self.seed_user(email, role, organization_id).await?;
        self.login(email).await
    }

    /// Six-digit code from the last email sent to `to`
    pub fn last_code(&self, to: &str) -> Result<String> {
        let email = self.mailer.last_to(to).with_context(|| format!("no email sent to {}", to))?;
        extract_code(&email.body).with_context(|| format!("no code in email: {}", email.body))
    }

    /// Magic-link token from the last invitation sent to `to`
    pub fn last_magic_token(&self, to: &str) -> Result<String> {
        let email = self.mailer.last_to(to).with_context(|| format!("no email sent to {}", to))?;
        email
            .body
            .split_whitespace()
            .find_map(|word| word.split_once("magic-link?token=").map(|(_, t)| t.to_string()))
            .context("no magic link in email")
    }
}

fn extract_code(body: &str) -> Option<String> {
    for marker in ["enter this code: ", "verification code is ", "Use code "] {
        if let Some((_, rest)) = body.split_once(marker) {
            let code: String = rest.chars().take(6).collect();
            if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
                return Some(code);
            }
        }
    }
    None
}
