mod common;

use anyhow::Result;
use axum::http::StatusCode;
use churchflow_api::database::models::organization::OrganizationType;
use churchflow_api::database::models::user::Role;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn admins_manage_agencies() -> Result<()> {
    let app = TestApp::new();
    let gcc = app.seed_org("ECWA GCC", OrganizationType::GCC, None).await?;
    let dcc = app.seed_org("Jos DCC", OrganizationType::DCC, Some(&gcc)).await?;
    let admin = app.user_token("admin@ecwa.org", Role::Admin, Some(dcc.id)).await?;
    let member = app.user_token("member@ecwa.org", Role::Member, Some(dcc.id)).await?;

    let res = app
        .post(
            "/api/agencies",
            Some(&admin),
            json!({ "name": "Women's Fellowship", "leader_name": "Mrs. Ladi", "email": "WF@ecwa.org" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    assert_eq!(res.body["data"]["organization_id"], dcc.id.to_string());
    assert_eq!(res.body["data"]["email"], "wf@ecwa.org");
    assert_eq!(res.body["data"]["status"], "active");
    let fellowship = res.body["data"]["id"].as_str().unwrap().to_string();

    let res = app
        .post("/api/agencies", Some(&admin), json!({ "name": "Youth", "status": "inactive" }))
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.post("/api/agencies", Some(&admin), json!({ "phone": "123" })).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"].get("name").is_some());
    assert!(res.body["field_errors"].get("phone").is_some());

    let res = app
        .put(&format!("/api/agencies/{}", fellowship), &admin, json!({ "leader_name": "Mrs. Kande" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["leader_name"], "Mrs. Kande");
    assert_eq!(res.body["data"]["name"], "Women's Fellowship");

    let res = app.get("/api/agencies?status=active", &member).await?;
    assert_eq!(res.status, StatusCode::OK);
    let active = res.body["data"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], fellowship.as_str());

    let res = app.delete(&format!("/api/agencies/{}", fellowship), &admin).await?;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get(&format!("/api/agencies/{}", fellowship), &member).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn admins_manage_executives() -> Result<()> {
    let app = TestApp::new();
    let gcc = app.seed_org("ECWA GCC", OrganizationType::GCC, None).await?;
    let admin = app.user_token("admin@ecwa.org", Role::Admin, Some(gcc.id)).await?;
    let member = app.user_token("member@ecwa.org", Role::Member, Some(gcc.id)).await?;

    let res = app
        .post(
            "/api/executives",
            Some(&admin),
            json!({ "name": "Rev. Musa", "position": "Chairman", "term_start": "2024-01-01" }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let chairman = res.body["data"]["id"].as_str().unwrap().to_string();

    app.post(
        "/api/executives",
        Some(&admin),
        json!({ "name": "Elder Danjuma", "position": "Secretary", "status": "inactive" }),
    )
    .await?;

    let res = app
        .put(&format!("/api/executives/{}", chairman), &admin, json!({ "term_end": "2023-06-30" }))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert!(res.body["field_errors"].get("term_end").is_some());

    let res = app
        .put(&format!("/api/executives/{}", chairman), &admin, json!({ "term_end": "2027-12-31" }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["term_end"], "2027-12-31");

    let res = app.get("/api/executives?status=active", &member).await?;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    let res = app.get("/api/executives?position=Secretary", &member).await?;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);

    let res = app.delete(&format!("/api/executives/{}", chairman), &admin).await?;
    assert_eq!(res.status, StatusCode::OK);
    let res = app.get("/api/executives", &member).await?;
    assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn members_and_treasurers_cannot_write_agencies() -> Result<()> {
    let app = TestApp::new();
    let gcc = app.seed_org("ECWA GCC", OrganizationType::GCC, None).await?;
    let admin = app.user_token("admin@ecwa.org", Role::Admin, Some(gcc.id)).await?;
    let member = app.user_token("member@ecwa.org", Role::Member, Some(gcc.id)).await?;
    let treasurer = app
        .user_token("treasurer@ecwa.org", Role::FinancialSecretary, Some(gcc.id))
        .await?;

    let res = app.post("/api/agencies", Some(&admin), json!({ "name": "Evangelism" })).await?;
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    for token in [&member, &treasurer] {
        let res = app.post("/api/agencies", Some(token), json!({ "name": "Choir" })).await?;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        let res = app.put(&format!("/api/agencies/{}", id), token, json!({ "name": "Renamed" })).await?;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        let res = app.delete(&format!("/api/agencies/{}", id), token).await?;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        let res = app
            .post("/api/executives", Some(token), json!({ "name": "X", "position": "Treasurer" }))
            .await?;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
    }

    let res = app.get(&format!("/api/agencies/{}", id), &member).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["name"], "Evangelism");
    Ok(())
}
