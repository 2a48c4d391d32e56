use axum::http::StatusCode;
use serde_json::{json, Value};
use service_marketplace::modules::admin::AdminService;
use service_marketplace::modules::auth::{Account, AccountRepository, AdminRole};
use service_marketplace::services::otp::SubjectKind;

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn user_logs_in_and_reads_profile() {
    let ctx = TestContext::new();
    let email = test_email();
    let user = ctx.seed_user(&email).await;

    let response = ctx
        .server
        .post("/auth/user/login")
        .json(&json!({ "email": email.to_uppercase(), "password": test_password() }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["account"]["id"], user.id.as_str());
    let access = body["session"]["access_token"].as_str().unwrap().to_string();

    let response = ctx.server.get("/auth/me").authorization_bearer(&access).await;
    response.assert_status(StatusCode::OK);
    let me: Value = response.json();
    assert_eq!(me["email"], email.as_str());
    assert_eq!(me["role"], "USER");

    match ctx.accounts.find_by_id(SubjectKind::User, &user.id).await.unwrap() {
        Some(Account::User(stored)) => assert!(stored.last_login_at.is_some()),
        other => panic!("expected user, got {:?}", other.map(|a| a.kind())),
    }
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let ctx = TestContext::new();
    let email = test_email();
    ctx.seed_user(&email).await;

    ctx.server
        .post("/auth/user/login")
        .json(&json!({ "email": email, "password": "WrongPassword1" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Same email under another account kind does not exist.
    ctx.server
        .post("/auth/vendor/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_kind_is_not_found() {
    let ctx = TestContext::new();

    ctx.server
        .post("/auth/driver/login")
        .json(&json!({ "email": test_email(), "password": test_password() }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approved_vendor_can_log_in() {
    let ctx = TestContext::new();
    let email = test_email();
    ctx.seed_vendor(&email, true).await;

    let response = ctx
        .server
        .post("/auth/vendor/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["account"]["kind"], "vendor");
    assert_eq!(body["account"]["role"], "VENDOR");
}

#[tokio::test]
async fn refresh_issues_new_pair() {
    let ctx = TestContext::new();
    let email = test_email();
    ctx.seed_user(&email).await;

    let login: Value = ctx
        .server
        .post("/auth/user/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .json();
    let refresh = login["session"]["refresh_token"].as_str().unwrap();
    let access = login["session"]["access_token"].as_str().unwrap();

    let response = ctx
        .server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert!(body["session"]["access_token"].as_str().is_some());

    // An access token is not accepted as a refresh token.
    ctx.server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": access }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_account_cannot_refresh() {
    let ctx = TestContext::new();
    let email = test_email();
    let admin = ctx.seed_admin(&email, AdminRole::Admin).await;
    let root = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;

    let login: Value = ctx
        .server
        .post("/auth/admin/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .json();
    let refresh = login["session"]["refresh_token"].as_str().unwrap();

    AdminService::new(&ctx.accounts)
        .set_active(&root.id, &admin.id, false)
        .await
        .unwrap();

    ctx.server
        .post("/auth/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_requires_session() {
    let ctx = TestContext::new();
    let user = ctx.seed_user(&test_email()).await;

    ctx.server
        .post("/auth/logout")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .post("/auth/logout")
        .authorization_bearer(&ctx.access_token(&Account::User(user)))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["message"], "Logged out");
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/auth/user/login")
        .json(&json!({ "email": test_email(), "password": test_password() }))
        .await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
    assert_eq!(response.header("cache-control"), "no-store");
}
