use axum::http::StatusCode;
use serde_json::{json, Value};
use service_marketplace::modules::admin::AdminService;
use service_marketplace::modules::auth::{Account, AccountRepository, AdminRole};
use service_marketplace::services::otp::SubjectKind;

use crate::common::{test_email, TestContext};

fn bearer(ctx: &TestContext, admin: &service_marketplace::modules::auth::Admin) -> String {
    ctx.access_token(&Account::Admin(admin.clone()))
}

#[tokio::test]
async fn sole_super_admin_is_protected_until_another_exists() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let s2 = ctx.seed_admin(&test_email(), AdminRole::Admin).await;

    // S1 cannot demote themself while they are the only super admin.
    ctx.server
        .patch(&format!("/admin/admins/{}/role", s1.id))
        .authorization_bearer(&bearer(&ctx, &s1))
        .json(&json!({ "role": "ADMIN" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .patch(&format!("/admin/admins/{}/role", s2.id))
        .authorization_bearer(&bearer(&ctx, &s1))
        .json(&json!({ "role": "SUPER_ADMIN" }))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>()["role"], "SUPER_ADMIN");

    // With two super admins, S2 may remove S1.
    ctx.server
        .delete(&format!("/admin/admins/{}", s1.id))
        .authorization_bearer(&bearer(&ctx, &s2))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(ctx
        .accounts
        .find_by_id(SubjectKind::Admin, &s1.id)
        .await
        .unwrap()
        .is_none());
    let supers: Vec<_> = ctx
        .accounts
        .list_admins()
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.role == AdminRole::SuperAdmin)
        .collect();
    assert_eq!(supers.len(), 1);
    assert_eq!(supers[0].id, s2.id);
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;

    ctx.server
        .delete(&format!("/admin/admins/{}", s1.id))
        .authorization_bearer(&bearer(&ctx, &s1))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plain_admins_cannot_manage_admins() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let a1 = ctx.seed_admin(&test_email(), AdminRole::Admin).await;

    ctx.server
        .get("/admin/admins")
        .authorization_bearer(&bearer(&ctx, &a1))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    ctx.server
        .delete(&format!("/admin/admins/{}", s1.id))
        .authorization_bearer(&bearer(&ctx, &a1))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .get("/admin/admins")
        .authorization_bearer(&bearer(&ctx, &s1))
        .await;
    response.assert_status(StatusCode::OK);
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn non_admin_sessions_are_forbidden() {
    let ctx = TestContext::new();
    let user = ctx.seed_user(&test_email()).await;

    ctx.server
        .get("/admin/admins")
        .authorization_bearer(&ctx.access_token(&Account::User(user)))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivation_keeps_one_active_super_admin() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let s2 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let service = AdminService::new(&ctx.accounts);

    let s2_after = service.set_active(&s1.id, &s2.id, false).await.unwrap();
    assert!(!s2_after.is_active);

    // S1 is now the last active super admin and cannot deactivate themself.
    assert!(service.set_active(&s1.id, &s1.id, false).await.is_err());

    // A deactivated admin's still-valid session no longer works.
    ctx.server
        .get("/admin/admins")
        .authorization_bearer(&bearer(&ctx, &s2))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn last_super_admin_cannot_be_demoted_by_service() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let service = AdminService::new(&ctx.accounts);

    let err = service
        .change_role(&s1.id, &s1.id, AdminRole::Admin)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    // Setting the role it already has is a no-op.
    let same = service
        .change_role(&s1.id, &s1.id, AdminRole::SuperAdmin)
        .await
        .unwrap();
    assert_eq!(same.role, AdminRole::SuperAdmin);
}

#[tokio::test]
async fn missing_admin_is_not_found() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;

    ctx.server
        .delete("/admin/admins/does-not-exist")
        .authorization_bearer(&bearer(&ctx, &s1))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

async fn race_demotions(ctx: &TestContext, pairs: [(String, String); 2]) -> usize {
    let handles = pairs.map(|(acting, target)| {
        let accounts = ctx.accounts.clone();
        tokio::spawn(async move {
            AdminService::new(&accounts)
                .change_role(&acting, &target, AdminRole::Admin)
                .await
        })
    });

    futures::future::join_all(handles)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count()
}

async fn super_admin_count(ctx: &TestContext) -> usize {
    ctx.accounts
        .list_admins()
        .await
        .unwrap()
        .iter()
        .filter(|a| a.role == AdminRole::SuperAdmin && a.is_active)
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_self_demotions_leave_one_super_admin() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let s2 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;

    let succeeded = race_demotions(
        &ctx,
        [(s1.id.clone(), s1.id.clone()), (s2.id.clone(), s2.id.clone())],
    )
    .await;

    assert_eq!(succeeded, 1);
    assert_eq!(super_admin_count(&ctx).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cross_demotions_leave_one_super_admin() {
    let ctx = TestContext::new();
    let s1 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;
    let s2 = ctx.seed_admin(&test_email(), AdminRole::SuperAdmin).await;

    let succeeded = race_demotions(
        &ctx,
        [(s1.id.clone(), s2.id.clone()), (s2.id.clone(), s1.id.clone())],
    )
    .await;

    assert_eq!(succeeded, 1);
    assert_eq!(super_admin_count(&ctx).await, 1);
}
