use rust_decimal::Decimal;
use service_marketplace::modules::booking::{
    ActorScope, BookingError, BookingRepository, BookingStateMachine, BookingStatus, PaymentStatus,
};

use crate::common::{test_email, TestContext};

async fn parties(ctx: &TestContext) -> (String, String) {
    let user = ctx.seed_user(&test_email()).await;
    let vendor = ctx.seed_vendor(&test_email(), true).await;
    (user.id, vendor.id)
}

// =============================================================================
// VENDOR TRANSITIONS
// =============================================================================

#[tokio::test]
async fn rejected_booking_cannot_be_accepted() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Pending, Decimal::ZERO, PaymentStatus::Pending)
        .await;
    let machine = BookingStateMachine::new(&ctx.bookings);

    let rejected = machine
        .reject(&vendor_id, &booking.id, "Too far to travel")
        .await
        .unwrap();
    assert_eq!(rejected.status, BookingStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Too far to travel"));

    let err = machine.accept(&vendor_id, &booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed));
}

#[tokio::test]
async fn completing_paid_booking_credits_collected_ledger() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(
            &user_id,
            &vendor_id,
            BookingStatus::Visited,
            Decimal::from(5000),
            PaymentStatus::Success,
        )
        .await;

    let completed = BookingStateMachine::new(&ctx.bookings)
        .mark_completed(&vendor_id, &booking.id)
        .await
        .unwrap();

    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(
        ctx.vendor_ledger(&vendor_id).await,
        (Decimal::from(5000), Decimal::from(5000), Decimal::ZERO)
    );
}

#[tokio::test]
async fn completing_unpaid_booking_credits_pending_ledger() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(
            &user_id,
            &vendor_id,
            BookingStatus::Visited,
            Decimal::from(1200),
            PaymentStatus::Pending,
        )
        .await;

    BookingStateMachine::new(&ctx.bookings)
        .mark_completed(&vendor_id, &booking.id)
        .await
        .unwrap();

    assert_eq!(
        ctx.vendor_ledger(&vendor_id).await,
        (Decimal::from(1200), Decimal::ZERO, Decimal::from(1200))
    );
}

#[tokio::test]
async fn completion_twice_credits_ledger_once() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Visited, Decimal::from(700), PaymentStatus::Success)
        .await;
    let machine = BookingStateMachine::new(&ctx.bookings);

    machine.mark_completed(&vendor_id, &booking.id).await.unwrap();
    let err = machine.mark_completed(&vendor_id, &booking.id).await.unwrap_err();

    assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed));
    assert_eq!(ctx.vendor_ledger(&vendor_id).await.0, Decimal::from(700));
}

#[tokio::test]
async fn visit_requires_accepted_state() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Pending, Decimal::ZERO, PaymentStatus::Pending)
        .await;
    let machine = BookingStateMachine::new(&ctx.bookings);

    let err = machine.mark_visited(&vendor_id, &booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed));

    let scheduled = machine
        .schedule_visit(&vendor_id, &booking.id, "2030-03-01", "10:30")
        .await
        .unwrap();
    assert_eq!(scheduled.status, BookingStatus::Accepted);

    let visited = machine.mark_visited(&vendor_id, &booking.id).await.unwrap();
    assert_eq!(visited.status, BookingStatus::Visited);
    assert!(visited.visited_at.is_some());
}

#[tokio::test]
async fn invalid_reason_leaves_booking_untouched() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Pending, Decimal::ZERO, PaymentStatus::Pending)
        .await;

    let err = BookingStateMachine::new(&ctx.bookings)
        .reject(&vendor_id, &booking.id, "   no    ")
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let stored = ctx.bookings.find_by_id(&booking.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(stored.revision, booking.revision);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_have_exactly_one_winner() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Pending, Decimal::ZERO, PaymentStatus::Pending)
        .await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = ctx.bookings.clone();
            let vendor_id = vendor_id.clone();
            let booking_id = booking.id.clone();
            tokio::spawn(async move {
                BookingStateMachine::new(&repo)
                    .accept(&vendor_id, &booking_id)
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(BookingError::NotFoundOrAlreadyProcessed))))
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(refused, 7);
}

// =============================================================================
// FULL PIPELINE
// =============================================================================

#[tokio::test]
async fn booking_runs_through_payment_and_settlement() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Pending, Decimal::ZERO, PaymentStatus::Pending)
        .await;
    let machine = BookingStateMachine::new(&ctx.bookings);
    let id = booking.id.as_str();

    machine.accept(&vendor_id, id).await.unwrap();
    machine.mark_visited(&vendor_id, id).await.unwrap();
    machine
        .upload_report(&vendor_id, id, "https://files.example.com/report.pdf")
        .await
        .unwrap();

    let awaiting = machine.request_payment(id, Decimal::new(250_050, 2)).await.unwrap();
    assert_eq!(awaiting.status, BookingStatus::AwaitingPayment);
    assert_eq!(awaiting.payment_amount, Decimal::new(250_050, 2));

    // Only the booking's own user can confirm payment.
    let err = machine.confirm_payment("someone-else", id).await.unwrap_err();
    assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed));
    let paid = machine.confirm_payment(&user_id, id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Success);

    machine
        .upload_borewell_result(&vendor_id, id, "Water found at 180 ft, yield 3 inches")
        .await
        .unwrap();
    let approved = machine.admin_approve(id).await.unwrap();
    assert!(approved.approved_at.is_some());
    machine.final_settlement(id).await.unwrap();

    let settled = machine.settle(id).await.unwrap();
    assert_eq!(settled.status, BookingStatus::Completed);
    assert_eq!(
        ctx.vendor_ledger(&vendor_id).await,
        (Decimal::new(250_050, 2), Decimal::new(250_050, 2), Decimal::ZERO)
    );
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test]
async fn user_cancels_own_booking_only() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let booking = ctx
        .seed_booking(&user_id, &vendor_id, BookingStatus::Accepted, Decimal::ZERO, PaymentStatus::Pending)
        .await;
    let machine = BookingStateMachine::new(&ctx.bookings);

    let err = machine
        .cancel(ActorScope::User("intruder".into()), &booking.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed));

    let cancelled = machine
        .cancel(ActorScope::User(user_id.clone()), &booking.id, Some("Plans changed"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("Plans changed"));
}

#[tokio::test]
async fn terminal_bookings_cannot_be_cancelled() {
    let ctx = TestContext::new();
    let (user_id, vendor_id) = parties(&ctx).await;
    let machine = BookingStateMachine::new(&ctx.bookings);

    for status in [BookingStatus::Completed, BookingStatus::Rejected, BookingStatus::Cancelled] {
        let booking = ctx
            .seed_booking(&user_id, &vendor_id, status, Decimal::ZERO, PaymentStatus::Pending)
            .await;
        let err = machine
            .cancel(ActorScope::Admin, &booking.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotFoundOrAlreadyProcessed), "{}", status);
    }
}
