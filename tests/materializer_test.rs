mod common;

use common::*;
use order_sync::domain::order::MaterializeOutcome;
use order_sync::services::materializer::{EnginePolicies, GuestPolicy, materialize_order};

const DB: &str = "order_sync_test_materializer";

// ── 1. create_order_from_event ─────────────────────────────────────────────

#[tokio::test]
async fn create_order_from_event() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    let event = make_event("cs_create_1", Some("user-1"), 2500);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();
    assert!(matches!(outcome, MaterializeOutcome::Created { .. }));

    let row = get_order(&pool, "cs_create_1").await.unwrap();
    assert_eq!(row.user_id.as_deref(), Some("user-1"));
    assert_eq!(row.total_cents, 2500);
    assert_eq!(row.verification_status, "verified");
    assert_eq!(row.fulfillment_status, "processing");
    assert!(!row.requires_manual_review);
    // Registered user: email lives on the account, not the order.
    assert!(row.customer_email.is_none());

    let audit = get_audit_rows(&pool, "cs_create_1").await;
    assert_eq!(audit, vec![("created".to_string(), "test".to_string())]);
}

// ── 2. order_number_format ─────────────────────────────────────────────────

#[tokio::test]
async fn order_number_format() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    let event = make_event("cs_number_1", Some("user-1"), 1000);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let MaterializeOutcome::Created { order_number, .. } = outcome else {
        panic!("expected Created");
    };
    // ORD-YYYYMMDD-NNNNNN, suffix from the store's sequence.
    let parts: Vec<&str> = order_number.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "ORD");
    assert_eq!(parts[1].len(), 8);
    assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
}

// ── 3. replay_is_idempotent ────────────────────────────────────────────────

#[tokio::test]
async fn replay_is_idempotent() {
    let pool = setup_pool(DB).await;
    seed_product(&pool, "price_rp", "widget").await;
    let gateway =
        MockGateway::new().with_items("cs_replay_1", vec![line("price_rp", 2, 1000)]);
    let event = make_event("cs_replay_1", Some("user-1"), 2000);
    let policies = EnginePolicies::default();

    let first = materialize_order(&pool, &gateway, &event, GuestPolicy::Skip, &policies, "test", "created")
        .await
        .unwrap();
    assert!(matches!(first, MaterializeOutcome::Created { .. }));

    for _ in 0..4 {
        let replay =
            materialize_order(&pool, &gateway, &event, GuestPolicy::Skip, &policies, "test", "created")
                .await
                .unwrap();
        assert!(matches!(replay, MaterializeOutcome::AlreadyProcessed));
    }

    assert_eq!(count_orders(&pool, "cs_replay_1").await, 1);
    let row = get_order(&pool, "cs_replay_1").await.unwrap();
    let items = get_items(&pool, row.id).await;
    assert_eq!(items.len(), 1, "items inserted exactly once");
}

// ── 4. unresolvable_item_is_skipped_not_fatal ──────────────────────────────

#[tokio::test]
async fn unresolvable_item_is_skipped_not_fatal() {
    let pool = setup_pool(DB).await;
    seed_product(&pool, "price_known", "widget").await;
    let gateway = MockGateway::new().with_items(
        "cs_partial_1",
        vec![line("price_known", 1, 500), line("price_unknown", 1, 700)],
    );
    let event = make_event("cs_partial_1", Some("user-1"), 1200);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let MaterializeOutcome::Created {
        order_id,
        items_inserted,
        items_skipped,
        ..
    } = outcome
    else {
        panic!("expected Created");
    };
    assert_eq!(items_inserted, 1);
    assert_eq!(items_skipped, 1);

    let items = get_items(&pool, order_id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].0, "widget");
}

// ── 5. guest_skipped_on_webhook_policy ─────────────────────────────────────

#[tokio::test]
async fn guest_skipped_on_webhook_policy() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    // No user_id in metadata at all.
    let event = make_event("cs_guest_skip", None, 1500);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();
    assert!(matches!(outcome, MaterializeOutcome::GuestSkipped));
    assert_eq!(count_orders(&pool, "cs_guest_skip").await, 0);
}

// ── 6. guest_sentinel_also_skipped ─────────────────────────────────────────

#[tokio::test]
async fn guest_sentinel_also_skipped() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    let event = make_event_with_metadata("cs_guest_lit", 1500, &[("user_id", "guest")]);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();
    assert!(matches!(outcome, MaterializeOutcome::GuestSkipped));
    assert_eq!(count_orders(&pool, "cs_guest_lit").await, 0);
}

// ── 7. guest_created_under_create_policy ───────────────────────────────────

#[tokio::test]
async fn guest_created_under_create_policy() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    let event = make_event("cs_guest_create", None, 1500);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Create,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();
    assert!(matches!(outcome, MaterializeOutcome::Created { .. }));

    let row = get_order(&pool, "cs_guest_create").await.unwrap();
    assert!(row.user_id.is_none());
    assert_eq!(row.customer_email.as_deref(), Some("shopper@example.com"));
}

// ── 8. review_verdict_persisted ────────────────────────────────────────────

#[tokio::test]
async fn review_verdict_persisted() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    // Over both the large-order and high-points thresholds.
    let event = make_event_with_metadata(
        "cs_review_1",
        15_000,
        &[("user_id", "user-1"), ("points_used", "250")],
    );

    materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let row = get_order(&pool, "cs_review_1").await.unwrap();
    assert!(row.requires_manual_review);
    assert_eq!(row.verification_status, "needs_review");
    assert_eq!(row.fulfillment_status, "pending");
    let reason = row.review_reason.unwrap();
    assert!(reason.contains("large order value"));
    assert!(reason.contains("high points usage"));

    let audit = get_audit_rows(&pool, "cs_review_1").await;
    assert!(audit.iter().any(|(action, _)| action == "review_flagged"));
}

// ── 9. bulk_pack_bonus_accrual ─────────────────────────────────────────────

#[tokio::test]
async fn bulk_pack_bonus_accrual() {
    let pool = setup_pool(DB).await;
    seed_product(&pool, "price_bulk", "pack-bulk").await;
    let gateway =
        MockGateway::new().with_items("cs_bonus_1", vec![line("price_bulk", 3, 2000)]);
    let event = make_event("cs_bonus_1", Some("user-bonus"), 6000);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let MaterializeOutcome::Created { bonus_points, .. } = outcome else {
        panic!("expected Created");
    };
    assert_eq!(bonus_points, 150, "50 per unit × 3 units");

    let ledger = get_ledger(&pool, "user-bonus").await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].kind, "earned");
    assert_eq!(ledger[0].points_amount, 150);
    assert!(ledger[0].expires_at.is_some());

    // Stored points_earned bumped by exactly the bonus (pre-bonus was 0).
    let row = get_order(&pool, "cs_bonus_1").await.unwrap();
    assert_eq!(row.points_earned, 150);
    assert_eq!(ledger[0].order_reference.as_deref(), Some(row.order_number.as_str()));

    // Recompute ran.
    assert_eq!(get_balance(&pool, "user-bonus").await, Some(150));

    // The bonus leaves its own audit trace.
    let audit = get_audit_rows(&pool, "cs_bonus_1").await;
    assert!(audit.iter().any(|(action, _)| action == "points_awarded"));
}

// ── 10. base_accrual_uses_prediscount_amount ───────────────────────────────

#[tokio::test]
async fn base_accrual_uses_prediscount_amount() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    // Paid 4000 after discount, but earned points on the original 5000.
    let event = make_event_with_metadata(
        "cs_base_1",
        4000,
        &[
            ("user_id", "user-base"),
            ("points_earned", "50"),
            ("original_total", "5000"),
        ],
    );

    materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let ledger = get_ledger(&pool, "user-base").await;
    assert_eq!(ledger.len(), 1);
    // Store RPC grants 1 point per whole major unit of the basis amount.
    assert_eq!(ledger[0].points_amount, 50);
    assert_eq!(get_balance(&pool, "user-base").await, Some(50));
}

// ── 11. no_points_steps_without_metadata ───────────────────────────────────

#[tokio::test]
async fn no_points_steps_without_metadata() {
    let pool = setup_pool(DB).await;
    let gateway = MockGateway::new();
    let event = make_event("cs_nopoints", Some("user-np"), 3000);

    materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    assert!(get_ledger(&pool, "user-np").await.is_empty());
    assert!(get_balance(&pool, "user-np").await.is_none());
}

// ── 12. order_survives_item_gap_and_gets_points ────────────────────────────
// Both enrichments run even when the item list is partially unresolvable.

#[tokio::test]
async fn order_survives_item_gap_and_gets_points() {
    let pool = setup_pool(DB).await;
    seed_product(&pool, "price_bulk2", "pack-bulk").await;
    let gateway = MockGateway::new().with_items(
        "cs_mixed_1",
        vec![line("price_bulk2", 1, 2000), line("price_ghost", 4, 100)],
    );
    let event = make_event("cs_mixed_1", Some("user-mixed"), 2400);

    let outcome = materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let MaterializeOutcome::Created {
        items_inserted,
        items_skipped,
        bonus_points,
        ..
    } = outcome
    else {
        panic!("expected Created");
    };
    assert_eq!(items_inserted, 1);
    assert_eq!(items_skipped, 1);
    // Bonus counts only the resolved bulk item.
    assert_eq!(bonus_points, 50);
}

// ── 13. accrual_expiry_agrees_across_paths ─────────────────────────────────
// Base accrual (store RPC) and bonus accrual (engine insert) must use the
// same expiry interval.

#[tokio::test]
async fn accrual_expiry_agrees_across_paths() {
    let pool = setup_pool(DB).await;
    seed_product(&pool, "price_bulk3", "pack-bulk").await;
    let gateway =
        MockGateway::new().with_items("cs_expiry_1", vec![line("price_bulk3", 1, 4000)]);
    let event = make_event_with_metadata(
        "cs_expiry_1",
        4000,
        &[("user_id", "user-exp"), ("points_earned", "40")],
    );

    materialize_order(
        &pool,
        &gateway,
        &event,
        GuestPolicy::Skip,
        &EnginePolicies::default(),
        "test",
        "created",
    )
    .await
    .unwrap();

    let ledger = get_ledger(&pool, "user-exp").await;
    assert_eq!(ledger.len(), 2);
    let base = ledger
        .iter()
        .find(|row| row.description == "Order points")
        .unwrap();
    let bonus = ledger
        .iter()
        .find(|row| row.description == "Bulk pack bonus points")
        .unwrap();

    let gap = (base.expires_at.unwrap() - bonus.expires_at.unwrap())
        .num_seconds()
        .abs();
    assert!(gap < 60, "expiries diverged by {gap}s");
}
