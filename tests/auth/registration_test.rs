use axum::http::StatusCode;
use serde_json::{json, Value};
use service_marketplace::modules::auth::AdminRole;
use service_marketplace::AppSettings;

use crate::common::{next_phone, test_email, test_password, TestContext, ADMIN_CODE};

async fn start(ctx: &TestContext, kind: &str, email: &str, phone: &str) -> String {
    let response = ctx
        .server
        .post(&format!("/auth/{}/register/start", kind))
        .json(&json!({ "name": "Asha Rao", "email": email, "phone": phone }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    body["verification_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn user_registration_returns_session() {
    let ctx = TestContext::new();
    let email = test_email();
    let phone = next_phone();
    let token = start(&ctx, "user", &email, &phone).await;
    let otp = ctx.mailer.last_code_for(&email).expect("code was emailed");

    let response = ctx
        .server
        .post("/auth/user/register/complete")
        .json(&json!({
            "verification_token": token,
            "email": email,
            "otp": otp,
            "name": "Asha Rao",
            "phone": phone,
            "password": test_password(),
            "password_confirm": test_password(),
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["account"]["kind"], "user");
    assert_eq!(body["account"]["email"], email.as_str());
    assert_eq!(body["session"]["token_type"], "Bearer");
    assert!(body["session"]["access_token"].as_str().is_some());

    // The verification code is single-use.
    let response = ctx
        .server
        .post("/auth/user/register/complete")
        .json(&json!({
            "verification_token": token,
            "email": email,
            "otp": otp,
            "name": "Asha Rao",
            "phone": next_phone(),
            "password": test_password(),
            "password_confirm": test_password(),
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_email_is_rejected_at_start() {
    let ctx = TestContext::new();
    let email = test_email();
    ctx.seed_user(&email).await;

    ctx.server
        .post("/auth/user/register/start")
        .json(&json!({ "name": "Asha Rao", "email": email, "phone": next_phone() }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn mismatched_passwords_are_rejected() {
    let ctx = TestContext::new();
    let email = test_email();
    let phone = next_phone();
    let token = start(&ctx, "user", &email, &phone).await;
    let otp = ctx.mailer.last_code_for(&email).unwrap();

    ctx.server
        .post("/auth/user/register/complete")
        .json(&json!({
            "verification_token": token,
            "email": email,
            "otp": otp,
            "name": "Asha Rao",
            "phone": phone,
            "password": test_password(),
            "password_confirm": "SomethingElse123",
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vendor_waits_for_approval() {
    let ctx = TestContext::new();
    let email = test_email();
    let phone = next_phone();
    let token = start(&ctx, "vendor", &email, &phone).await;
    let otp = ctx.mailer.last_code_for(&email).unwrap();

    let response = ctx
        .server
        .post("/auth/vendor/register/complete")
        .json(&json!({
            "verification_token": token,
            "email": email,
            "otp": otp,
            "name": "Rig Works",
            "phone": phone,
            "password": test_password(),
            "password_confirm": test_password(),
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert!(body.get("session").is_none());
    assert_eq!(body["account"]["is_approved"], false);
    assert!(body["message"].as_str().unwrap().contains("approval"));

    ctx.server
        .post("/auth/vendor/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_account_kind_is_not_found() {
    let ctx = TestContext::new();

    ctx.server
        .post("/auth/driver/register/start")
        .json(&json!({ "name": "Asha Rao", "email": test_email(), "phone": next_phone() }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_registration_requires_code() {
    let ctx = TestContext::new();

    ctx.server
        .post("/auth/admin/register/start")
        .json(&json!({ "registration_code": "guess", "name": "Root", "email": test_email() }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    assert!(ctx.mailer.sent().is_empty());
}

#[tokio::test]
async fn admin_registration_disabled_without_code() {
    let ctx = TestContext::with_settings(AppSettings {
        admin_registration_code: None,
        otp_rate_burst: 1000,
    });

    ctx.server
        .post("/auth/admin/register/start")
        .json(&json!({ "registration_code": ADMIN_CODE, "name": "Root", "email": test_email() }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

async fn register_admin(ctx: &TestContext, email: &str) -> Value {
    let response = ctx
        .server
        .post("/auth/admin/register/start")
        .json(&json!({ "registration_code": ADMIN_CODE, "name": "Root Admin", "email": email }))
        .await;
    response.assert_status(StatusCode::OK);
    let token = response.json::<Value>()["verification_token"]
        .as_str()
        .unwrap()
        .to_string();
    let otp = ctx.mailer.last_code_for(email).unwrap();

    let response = ctx
        .server
        .post("/auth/admin/register/complete")
        .json(&json!({
            "verification_token": token,
            "email": email,
            "otp": otp,
            "name": "Root Admin",
            "password": test_password(),
            "password_confirm": test_password(),
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn first_admin_becomes_super_admin() {
    let ctx = TestContext::new();

    let first = register_admin(&ctx, &test_email()).await;
    assert_eq!(first["account"]["role"], AdminRole::SuperAdmin.as_str());

    let second = register_admin(&ctx, &test_email()).await;
    assert_eq!(second["account"]["role"], AdminRole::Admin.as_str());
}

#[tokio::test]
async fn email_failure_is_bad_gateway() {
    let ctx = TestContext::new();
    ctx.mailer.set_failing(true);

    ctx.server
        .post("/auth/user/register/start")
        .json(&json!({ "name": "Asha Rao", "email": test_email(), "phone": next_phone() }))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    assert!(ctx.tokens.snapshot().is_empty());
}

#[tokio::test]
async fn otp_routes_are_rate_limited() {
    let ctx = TestContext::with_settings(AppSettings {
        admin_registration_code: Some(ADMIN_CODE.to_string()),
        otp_rate_burst: 1,
    });

    ctx.server
        .post("/auth/user/register/start")
        .json(&json!({ "name": "Asha Rao", "email": test_email(), "phone": next_phone() }))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/user/register/start")
        .json(&json!({ "name": "Asha Rao", "email": test_email(), "phone": next_phone() }))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Login does not issue codes and is not limited.
    ctx.server
        .post("/auth/user/login")
        .json(&json!({ "email": test_email(), "password": test_password() }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
