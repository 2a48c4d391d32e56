use std::sync::Arc;

use chrono::Duration;
use service_marketplace::services::otp::{
    InMemoryTokenStore, IssuedOtp, OtpEngine, OtpError, OtpLookup, OtpTarget, SubjectKind,
    SubjectRef, TokenPurpose, OTP_MAX_ATTEMPTS,
};

use crate::common::RecordingEmailSender;

fn engine() -> (OtpEngine, InMemoryTokenStore, RecordingEmailSender) {
    let store = InMemoryTokenStore::new();
    let mailer = RecordingEmailSender::default();
    let engine = OtpEngine::new(Arc::new(store.clone()), Arc::new(mailer.clone()));
    (engine, store, mailer)
}

fn wrong_code(issued: &IssuedOtp) -> &'static str {
    if issued.code == "000000" {
        "111111"
    } else {
        "000000"
    }
}

fn by_bearer(issued: &IssuedOtp, email: &str) -> OtpLookup {
    OtpLookup::Bearer {
        token: issued.bearer_token.clone(),
        email: email.to_string(),
    }
}

// =============================================================================
// ATTEMPT LIMIT
// =============================================================================

#[tokio::test]
async fn fifth_wrong_code_exhausts_and_deletes_token() {
    let (engine, store, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("a@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();
    let lookup = by_bearer(&issued, "a@x.com");

    for attempt in 1..OTP_MAX_ATTEMPTS {
        let err = engine
            .verify(&lookup, TokenPurpose::EmailVerification, wrong_code(&issued))
            .await
            .unwrap_err();
        assert!(matches!(err, OtpError::InvalidCode), "attempt {}", attempt);
        assert_eq!(store.get(&issued.token_id).unwrap().attempts, attempt);
    }

    let err = engine
        .verify(&lookup, TokenPurpose::EmailVerification, wrong_code(&issued))
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::AttemptsExhausted));
    assert!(store.get(&issued.token_id).is_none());

    let err = engine
        .verify(&lookup, TokenPurpose::EmailVerification, &issued.code)
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::NotFound));
}

#[tokio::test]
async fn correct_code_does_not_count_as_attempt() {
    let (engine, store, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("b@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();
    let lookup = by_bearer(&issued, "b@x.com");

    engine
        .verify(&lookup, TokenPurpose::EmailVerification, wrong_code(&issued))
        .await
        .unwrap_err();
    let token = engine
        .verify(&lookup, TokenPurpose::EmailVerification, &issued.code)
        .await
        .unwrap();

    assert_eq!(token.attempts, 1);
    assert!(!token.used);
    assert_eq!(store.get(&issued.token_id).unwrap().attempts, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_wrong_codes_never_lose_increments() {
    let (engine, store, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("race@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();
    let lookup = by_bearer(&issued, "race@x.com");
    let wrong = wrong_code(&issued);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = engine.clone();
            let lookup = lookup.clone();
            tokio::spawn(async move {
                engine
                    .verify(&lookup, TokenPurpose::EmailVerification, wrong)
                    .await
            })
        })
        .collect();

    let mut invalid = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(OtpError::InvalidCode) => invalid += 1,
            Err(OtpError::AttemptsExhausted) => exhausted += 1,
            Err(OtpError::NotFound) => {}
            other => panic!("unexpected outcome: {:?}", other.map(|t| t.id)),
        }
    }

    assert_eq!(invalid, OTP_MAX_ATTEMPTS - 1);
    assert!(exhausted >= 1);
    assert!(store.get(&issued.token_id).is_none());
}

// =============================================================================
// SUPERSEDING, CONSUMPTION, EXPIRY
// =============================================================================

#[tokio::test]
async fn reissue_supersedes_previous_unused_token() {
    let (engine, store, _) = engine();
    let target = || OtpTarget::Email("c@x.com".into());

    let first = engine.issue(target(), TokenPurpose::EmailVerification).await.unwrap();
    let second = engine.issue(target(), TokenPurpose::EmailVerification).await.unwrap();

    let live: Vec<_> = store
        .snapshot()
        .into_iter()
        .filter(|t| t.email == "c@x.com" && t.purpose == TokenPurpose::EmailVerification)
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, second.token_id);

    let err = engine
        .verify(&by_bearer(&first, "c@x.com"), TokenPurpose::EmailVerification, &first.code)
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::NotFound));
}

#[tokio::test]
async fn different_purposes_do_not_supersede_each_other() {
    let (engine, store, _) = engine();
    let subject = SubjectRef::new(SubjectKind::User, "user-1");

    engine
        .issue(
            OtpTarget::Subject {
                subject: subject.clone(),
                email: "d@x.com".into(),
            },
            TokenPurpose::PasswordReset,
        )
        .await
        .unwrap();
    engine
        .issue(OtpTarget::Email("d@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();

    assert_eq!(store.snapshot().len(), 2);
}

#[tokio::test]
async fn consume_is_idempotent_and_blocks_reuse() {
    let (engine, store, _) = engine();
    let subject = SubjectRef::new(SubjectKind::Vendor, "vendor-1");
    let issued = engine
        .issue(
            OtpTarget::Subject {
                subject: subject.clone(),
                email: "e@x.com".into(),
            },
            TokenPurpose::PasswordReset,
        )
        .await
        .unwrap();

    let lookup = OtpLookup::Subject(subject);
    let token = engine
        .verify(&lookup, TokenPurpose::PasswordReset, &issued.code)
        .await
        .unwrap();

    engine.consume(&token.id).await.unwrap();
    engine.consume(&token.id).await.unwrap();
    assert!(store.get(&token.id).unwrap().used);

    let err = engine
        .verify(&lookup, TokenPurpose::PasswordReset, &issued.code)
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::NotFound));
}

#[tokio::test]
async fn token_expiring_exactly_now_is_expired() {
    let (engine, _, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("f@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();
    let lookup = by_bearer(&issued, "f@x.com");

    let just_before = issued.expires_at - Duration::milliseconds(1);
    assert!(engine
        .verify_at(&lookup, TokenPurpose::EmailVerification, &issued.code, just_before)
        .await
        .is_ok());

    let err = engine
        .verify_at(&lookup, TokenPurpose::EmailVerification, &issued.code, issued.expires_at)
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::NotFound));
}

#[tokio::test]
async fn bearer_lookup_requires_matching_email() {
    let (engine, _, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("g@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();

    let err = engine
        .verify(&by_bearer(&issued, "other@x.com"), TokenPurpose::EmailVerification, &issued.code)
        .await
        .unwrap_err();
    assert!(matches!(err, OtpError::NotFound));

    // Lookup normalizes the supplied email.
    assert!(engine
        .verify(&by_bearer(&issued, "  G@X.com "), TokenPurpose::EmailVerification, &issued.code)
        .await
        .is_ok());
}

// =============================================================================
// DELIVERY
// =============================================================================

#[tokio::test]
async fn failed_delivery_rolls_back_token() {
    let (engine, store, mailer) = engine();
    mailer.set_failing(true);

    let err = engine
        .issue_and_send(
            OtpTarget::Email("h@x.com".into()),
            TokenPurpose::EmailVerification,
            Some("Hana"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OtpError::Delivery(_)));
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn delivered_email_carries_the_code() {
    let (engine, _, mailer) = engine();

    let issued = engine
        .issue_and_send(
            OtpTarget::Email("i@x.com".into()),
            TokenPurpose::EmailVerification,
            None,
        )
        .await
        .unwrap();

    assert_eq!(mailer.last_code_for("i@x.com").as_deref(), Some(issued.code.as_str()));
    assert!(!mailer.sent()[0].text_body.contains(&issued.bearer_token));
}

#[tokio::test]
async fn sweep_removes_used_tokens() {
    let (engine, store, _) = engine();
    let issued = engine
        .issue(OtpTarget::Email("j@x.com".into()), TokenPurpose::EmailVerification)
        .await
        .unwrap();
    engine.consume(&issued.token_id).await.unwrap();

    let removed = engine.sweep_expired().await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.snapshot().is_empty());
}
