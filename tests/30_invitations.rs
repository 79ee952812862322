mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use churchflow_api::database::models::invite::Invite;
use churchflow_api::database::models::organization::OrganizationType;
use churchflow_api::database::models::user::{NewUser, Role, User};
use churchflow_api::database::models::Entity;
use churchflow_api::database::{DatabaseError, MemoryStore, Repository, Store, StoreQuery, StoredRecord};
use churchflow_api::services::mailer::MemoryMailer;
use common::{TestApp, PASSWORD};
use serde_json::{json, Value};
use uuid::Uuid;

async fn admin_of_dcc(app: &TestApp) -> Result<(String, uuid::Uuid)> {
    let gcc = app.seed_org("ECWA GCC", OrganizationType::GCC, None).await?;
    let dcc = app.seed_org("Jos DCC", OrganizationType::DCC, Some(&gcc)).await?;
    let token = app.user_token("admin@ecwa.org", Role::Admin, Some(dcc.id)).await?;
    Ok((token, dcc.id))
}

fn accept_body(email: &str, code: &str) -> Value {
    json!({ "email": email, "code": code, "name": "New Treasurer", "password": PASSWORD })
}

#[tokio::test]
async fn invite_then_accept_with_code() -> Result<()> {
    let app = TestApp::new();
    let (admin, dcc) = admin_of_dcc(&app).await?;

    let res = app
        .post(
            "/api/invitations",
            Some(&admin),
            json!({ "email": "Treasurer@ecwa.org", "role": "financial_secretary" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["email_sent"], true);
    assert_eq!(res.body["data"]["invite"]["status"], "active");
    assert_eq!(res.body["data"]["invite"]["organization_id"], dcc.to_string());
    assert!(res.body["data"]["invite"].get("code").is_none());

    let code = app.last_code("treasurer@ecwa.org")?;

    let res = app
        .post("/auth/invitations/verify", None, json!({ "email": "treasurer@ecwa.org", "code": code }))
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app
        .post("/auth/invitations/accept", None, accept_body("treasurer@ecwa.org", &code))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["user"]["role"], "financial_secretary");
    assert_eq!(res.body["data"]["user"]["email_verified"], true);
    assert!(res.cookie_token().is_some());

    let token = res.body["data"]["token"].as_str().unwrap().to_string();
    let me = app.get("/api/auth/me", &token).await?;
    assert_eq!(me.body["data"]["organization_id"], dcc.to_string());
    Ok(())
}

#[tokio::test]
async fn consumed_invite_cannot_be_used_again() -> Result<()> {
    let app = TestApp::new();
    let (admin, _) = admin_of_dcc(&app).await?;
    app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org", "name": "Ada" }))
        .await?;
    let code = app.last_code("new@ecwa.org")?;
    let link = app.last_magic_token("new@ecwa.org")?;

    let first = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", &code)).await?;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", &code)).await?;
    assert_eq!(second.status, StatusCode::GONE);
    assert_eq!(second.error_code(), "GONE");

    let magic = app
        .request(Method::GET, &format!("/auth/magic-link?token={}", link), None, None)
        .await?;
    assert_eq!(magic.status, StatusCode::GONE);
    Ok(())
}

#[tokio::test]
async fn magic_link_signs_in_without_password() -> Result<()> {
    let app = TestApp::new();
    let (admin, _) = admin_of_dcc(&app).await?;
    app.post("/api/invitations", Some(&admin), json!({ "email": "linked@ecwa.org", "name": "Linked" }))
        .await?;
    let link = app.last_magic_token("linked@ecwa.org")?;

    let res = app
        .request(Method::GET, &format!("/auth/magic-link?token={}", link), None, None)
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["user"]["has_password"], false);
    assert_eq!(res.body["data"]["user"]["profile_completed"], false);
    let token = res.cookie_token().unwrap();

    // First password is set through the profile endpoint
    let res = app
        .put("/api/auth/profile", &token, json!({ "password": "my-first-password" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["profile_completed"], true);

    // Replaying the link fails
    let replay = app
        .request(Method::GET, &format!("/auth/magic-link?token={}", link), None, None)
        .await?;
    assert_eq!(replay.status, StatusCode::GONE);
    Ok(())
}

#[tokio::test]
async fn magic_link_requires_a_valid_token() -> Result<()> {
    let app = TestApp::new();
    let missing = app.request(Method::GET, "/auth/magic-link", None, None).await?;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let forged = app
        .request(Method::GET, "/auth/magic-link?token=abc.def.ghi", None, None)
        .await?;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn wrong_codes_lock_the_invite() -> Result<()> {
    let app = TestApp::with_config(|c| c.onboarding.code_max_attempts = 2);
    let (admin, _) = admin_of_dcc(&app).await?;
    app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    let code = app.last_code("new@ecwa.org")?;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..2 {
        let res = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", wrong)).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }
    let res = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", &code)).await?;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    Ok(())
}

#[tokio::test]
async fn resend_replaces_code_and_link() -> Result<()> {
    let app = TestApp::new();
    let (admin, _) = admin_of_dcc(&app).await?;
    let res = app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    let id = res.body["data"]["invite"]["id"].as_str().unwrap().to_string();
    let old_link = app.last_magic_token("new@ecwa.org")?;

    let res = app
        .post(&format!("/api/invitations/{}/resend", id), Some(&admin), json!({}))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(app.mailer.sent().len(), 2);

    let stale = app
        .request(Method::GET, &format!("/auth/magic-link?token={}", old_link), None, None)
        .await?;
    assert_eq!(stale.status, StatusCode::GONE);

    let code = app.last_code("new@ecwa.org")?;
    let res = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", &code)).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn mail_failure_is_reported_not_fatal() -> Result<()> {
    let app = TestApp::with_mailer(MemoryMailer::failing());
    let (admin, _) = admin_of_dcc(&app).await?;

    let res = app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["email_sent"], false);
    Ok(())
}

#[tokio::test]
async fn invitation_rules() -> Result<()> {
    let app = TestApp::new();
    let (admin, _) = admin_of_dcc(&app).await?;
    app.seed_user("member@ecwa.org", Role::Member, None).await?;

    // Admins cannot hand out super admin
    let res = app
        .post("/api/invitations", Some(&admin), json!({ "email": "boss@ecwa.org", "role": "super_admin" }))
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // Existing accounts cannot be invited
    let res = app.post("/api/invitations", Some(&admin), json!({ "email": "member@ecwa.org" })).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // One pending invite per address
    app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    let res = app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);

    // Members cannot invite
    let member = app.login("member@ecwa.org").await?;
    let res = app.post("/api/invitations", Some(&member), json!({ "email": "x@ecwa.org" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/invitations", &admin).await?;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn revoked_invite_is_gone() -> Result<()> {
    let app = TestApp::new();
    let (admin, _) = admin_of_dcc(&app).await?;
    let res = app.post("/api/invitations", Some(&admin), json!({ "email": "new@ecwa.org" })).await?;
    let id = res.body["data"]["invite"]["id"].as_str().unwrap().to_string();
    let code = app.last_code("new@ecwa.org")?;

    let res = app.delete(&format!("/api/invitations/{}", id), &admin).await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.post("/auth/invitations/accept", None, accept_body("new@ecwa.org", &code)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

/// Memory store where a signup for `email` lands the moment an invite for
/// it is consumed, i.e. between the accept flow's user check and its insert
struct SignupRace {
    inner: Arc<dyn Store>,
    email: String,
    armed: AtomicBool,
}

#[async_trait]
impl Store for SignupRace {
    async fn insert(&self, kind: &str, record: StoredRecord) -> Result<(), DatabaseError> {
        self.inner.insert(kind, record).await
    }

    async fn get(&self, kind: &str, id: Uuid) -> Result<Option<StoredRecord>, DatabaseError> {
        self.inner.get(kind, id).await
    }

    async fn find_unique(&self, kind: &str, key: &str) -> Result<Option<StoredRecord>, DatabaseError> {
        self.inner.find_unique(kind, key).await
    }

    async fn list(&self, kind: &str, query: &StoreQuery) -> Result<Vec<StoredRecord>, DatabaseError> {
        self.inner.list(kind, query).await
    }

    async fn replace(
        &self,
        kind: &str,
        record: StoredRecord,
        expected: Option<&Value>,
    ) -> Result<bool, DatabaseError> {
        let consuming = kind == Invite::KIND
            && !record.data["code"]["consumed_at"].is_null()
            && record.data["email"] == self.email.as_str();
        if consuming && self.armed.swap(false, Ordering::SeqCst) {
            let signup = User::new(NewUser {
                name: "Early Bird".into(),
                email: self.email.clone(),
                password_hash: None,
                role: Role::Member,
                organization_id: None,
                phone: None,
                address: None,
                email_verified: false,
            });
            Repository::<User>::new(self.inner.clone()).create(&signup).await?;
        }
        self.inner.replace(kind, record, expected).await
    }

    async fn delete(&self, kind: &str, id: Uuid) -> Result<bool, DatabaseError> {
        self.inner.delete(kind, id).await
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        self.inner.health_check().await
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[tokio::test]
async fn failed_account_creation_releases_the_invite() -> Result<()> {
    let store = Arc::new(SignupRace {
        inner: Arc::new(MemoryStore::new()),
        email: "usher@ecwa.org".into(),
        armed: AtomicBool::new(true),
    });
    let app = TestApp::with_store(store.clone());
    let (admin, _) = admin_of_dcc(&app).await?;

    app.post("/api/invitations", Some(&admin), json!({ "email": "usher@ecwa.org", "role": "member" }))
        .await?;
    let code = app.last_code("usher@ecwa.org")?;

    let res = app
        .post("/auth/invitations/accept", None, accept_body("usher@ecwa.org", &code))
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT, "{}", res.body);

    let users = Repository::<User>::new(store.inner.clone());
    let intruder = users.select_unique("usher@ecwa.org").await?.expect("racing signup stored");
    assert_eq!(intruder.name, "Early Bird");

    // The invite was not burned by the failed attempt
    let invites = Repository::<Invite>::new(store.inner.clone())
        .select_any(&StoreQuery::new().filter("email", "usher@ecwa.org"))
        .await?;
    assert_eq!(invites.len(), 1);
    assert!(invites[0].code.consumed_at.is_none());
    assert!(invites[0].accepted_user_id.is_none());

    // Once the conflicting account is gone the same code still works
    users.delete(intruder.id).await?;
    let res = app
        .post("/auth/invitations/accept", None, accept_body("usher@ecwa.org", &code))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    Ok(())
}
