use chrono::{Duration, Utc};
use service_marketplace::services::otp::{
    hash_bearer, MySqlTokenStore, TokenPurpose, TokenStore, VerificationToken,
};

use super::setup_test_db;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "needs a MySQL TEST_DATABASE_URL"]
async fn concurrent_increments_each_see_their_own_count() {
    let store = MySqlTokenStore::new(setup_test_db().await);
    let now = Utc::now();
    let token = VerificationToken {
        id: uuid::Uuid::new_v4().to_string(),
        subject: None,
        email: format!("attempts-{}@example.com", uuid::Uuid::new_v4()),
        purpose: TokenPurpose::EmailVerification,
        bearer_hash: hash_bearer(&uuid::Uuid::new_v4().to_string()),
        code: "123456".to_string(),
        expires_at: now + Duration::minutes(10),
        attempts: 0,
        used: false,
        created_at: now,
    };
    store.insert_superseding(&token).await.unwrap();

    let handles = (0..5).map(|_| {
        let store = store.clone();
        let id = token.id.clone();
        tokio::spawn(async move { store.increment_attempts(&id).await })
    });

    let mut counts: Vec<i32> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().unwrap())
        .collect();
    counts.sort_unstable();

    assert_eq!(counts, vec![1, 2, 3, 4, 5]);

    store.delete(&token.id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a MySQL TEST_DATABASE_URL"]
async fn increment_skips_used_tokens() {
    let store = MySqlTokenStore::new(setup_test_db().await);
    let now = Utc::now();
    let token = VerificationToken {
        id: uuid::Uuid::new_v4().to_string(),
        subject: None,
        email: format!("used-{}@example.com", uuid::Uuid::new_v4()),
        purpose: TokenPurpose::PasswordReset,
        bearer_hash: hash_bearer(&uuid::Uuid::new_v4().to_string()),
        code: "654321".to_string(),
        expires_at: now + Duration::minutes(10),
        attempts: 0,
        used: false,
        created_at: now,
    };
    store.insert_superseding(&token).await.unwrap();
    store.mark_used(&token.id).await.unwrap();

    assert_eq!(store.increment_attempts(&token.id).await.unwrap(), None);

    store.delete(&token.id).await.unwrap();
}
