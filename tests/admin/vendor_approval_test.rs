use axum::http::StatusCode;
use serde_json::{json, Value};
use service_marketplace::modules::auth::{Account, AdminRole};

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn approval_lets_vendor_log_in() {
    let ctx = TestContext::new();
    let email = test_email();
    let vendor = ctx.seed_vendor(&email, false).await;
    let admin = ctx.seed_admin(&test_email(), AdminRole::Admin).await;

    ctx.server
        .post("/auth/vendor/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .post(&format!("/admin/vendors/{}/approve", vendor.id))
        .authorization_bearer(&ctx.access_token(&Account::Admin(admin.clone())))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["is_approved"], true);

    // Approving twice is harmless.
    ctx.server
        .post(&format!("/admin/vendors/{}/approve", vendor.id))
        .authorization_bearer(&ctx.access_token(&Account::Admin(admin)))
        .await
        .assert_status(StatusCode::OK);

    ctx.server
        .post("/auth/vendor/login")
        .json(&json!({ "email": email, "password": test_password() }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn approving_unknown_vendor_is_not_found() {
    let ctx = TestContext::new();
    let admin = ctx.seed_admin(&test_email(), AdminRole::Admin).await;
    let user = ctx.seed_user(&test_email()).await;

    // A user id is not a vendor id.
    ctx.server
        .post(&format!("/admin/vendors/{}/approve", user.id))
        .authorization_bearer(&ctx.access_token(&Account::Admin(admin)))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn vendors_cannot_approve_vendors() {
    let ctx = TestContext::new();
    let pending = ctx.seed_vendor(&test_email(), false).await;
    let approved = ctx.seed_vendor(&test_email(), true).await;

    ctx.server
        .post(&format!("/admin/vendors/{}/approve", pending.id))
        .authorization_bearer(&ctx.access_token(&Account::Vendor(approved)))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
