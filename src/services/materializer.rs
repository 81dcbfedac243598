use {
    crate::domain::audit::NewAuditEntry,
    crate::domain::error::EngineError,
    crate::domain::event::{CheckoutEvent, CustomerRef, PassthroughEvent},
    crate::domain::gateway::PaymentGateway,
    crate::domain::order::{MaterializeOutcome, NewOrder, NewOrderItem},
    crate::domain::points::{LoyaltyPolicy, NewPointsTransaction},
    crate::domain::review::{self, ReviewPolicy},
    crate::infra::postgres::{audit_repo, event_log_repo, order_repo, points_repo, product_repo},
    sqlx::PgPool,
    uuid::Uuid,
};

/// What to do with a guest checkout (no user id, or the guest sentinel, in
/// session metadata). The live webhook path skips guests; the recovery path
/// creates guest orders with a NULL user and the customer's email. The
/// asymmetry is an explicit policy rather than two divergent code paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestPolicy {
    Skip,
    Create,
}

/// Review and loyalty thresholds, injected together. Both have `Default`
/// impls matching production policy.
#[derive(Debug, Clone, Default)]
pub struct EnginePolicies {
    pub review: ReviewPolicy,
    pub loyalty: LoyaltyPolicy,
}

impl EnginePolicies {
    /// Policy overrides from the environment. Unset or unparsable values
    /// keep the defaults.
    pub fn from_env() -> Self {
        let mut policies = Self::default();
        if let Ok(id) = std::env::var("SMALL_PACK_PRODUCT") {
            policies.review.small_pack_product = id;
        }
        if let Ok(id) = std::env::var("BULK_PACK_PRODUCT") {
            policies.loyalty.bulk_pack_product = id;
        }
        if let Some(v) = env_i64("REVIEW_LARGE_ORDER_CENTS") {
            policies.review.large_order_cents = v;
        }
        if let Some(v) = env_i64("REVIEW_HIGH_POINTS_USED") {
            policies.review.high_points_used = v;
        }
        if let Some(v) = env_i64("REVIEW_LOW_VALUE_CENTS") {
            policies.review.low_value_cents = v;
        }
        if let Some(v) = env_i64("BONUS_POINTS_PER_UNIT") {
            policies.loyalty.bonus_per_unit = v;
        }
        policies
    }
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Materialize one completed checkout into a durable order.
///
/// Only the order-header insert is must-succeed. Everything after it
/// (line items, review verdict, points) is best-effort enrichment: failures
/// are logged and the order is left standing, because the gateway expects a
/// bounded-time acknowledgment and will not re-deliver usefully once the
/// order row exists.
///
/// `action` is what the header's audit row records: `created` on the live
/// webhook path, `recovered` on the backfill path.
pub async fn materialize_order(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    event: &CheckoutEvent,
    guests: GuestPolicy,
    policies: &EnginePolicies,
    actor: &str,
    action: &str,
) -> Result<MaterializeOutcome, EngineError> {
    let user_id = match (&event.metadata.customer, guests) {
        (CustomerRef::Guest, GuestPolicy::Skip) => {
            tracing::info!(
                session_id = %event.session_id,
                "guest checkout, skipped by policy"
            );
            return Ok(MaterializeOutcome::GuestSkipped);
        }
        (CustomerRef::Guest, GuestPolicy::Create) => None,
        (CustomerRef::User(id), _) => Some(id.clone()),
    };

    let order = NewOrder::from_event(event, user_id.clone());

    // Idempotency guard: the UNIQUE constraint on external_session_id
    // decides, not a prior existence check. A conflict is the no-op signal.
    let Some(order_number) = order_repo::insert_order(pool, &order).await? else {
        tracing::info!(
            session_id = %event.session_id,
            "order already exists, duplicate delivery"
        );
        return Ok(MaterializeOutcome::AlreadyProcessed);
    };

    if let Err(e) = audit_repo::insert_audit_entry(pool, &order.audit_entry(actor, action)).await {
        tracing::warn!(error = %e, order_number, "audit write failed");
    }

    let (items, items_skipped) = insert_line_items(pool, gateway, event, order.id).await;

    let verdict = review::classify(
        order.total,
        order.points_used,
        &items,
        &policies.review,
    );
    if let Err(e) = order_repo::apply_review(pool, order.id, &verdict).await {
        tracing::warn!(error = %e, order_number, "failed to persist review verdict");
    } else if verdict.requires_manual_review {
        tracing::info!(
            order_number,
            reasons = ?verdict.reasons,
            "order flagged for manual review"
        );
        let audit = NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "order".to_string(),
            entity_id: Some(order.id),
            external_id: Some(order.external_session_id.clone()),
            event_id: event.event_id.as_ref().map(|id| id.as_str().to_string()),
            action: "review_flagged".to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({ "reasons": verdict.reasons }),
        };
        if let Err(e) = audit_repo::insert_audit_entry(pool, &audit).await {
            tracing::warn!(error = %e, order_number, "audit write failed");
        }
    }

    let bonus_points = match &user_id {
        Some(user) => {
            accrue_points(
                pool,
                event,
                order.id,
                &order_number,
                user,
                &items,
                &policies.loyalty,
                actor,
            )
            .await
        }
        // Guest orders have no ledger to accrue into.
        None => 0,
    };

    tracing::info!(
        order_id = %order.id,
        order_number,
        items = items.len(),
        items_skipped,
        needs_review = verdict.requires_manual_review,
        bonus_points,
        "order materialized"
    );

    Ok(MaterializeOutcome::Created {
        order_id: order.id,
        order_number,
        items_inserted: items.len(),
        items_skipped,
        verdict,
        bonus_points,
    })
}

/// Fetch the session's line items from the gateway and insert the ones we
/// can resolve. Per-item failures are counted individually, never fatal:
/// an order with fewer items than the gateway reported beats no order.
async fn insert_line_items(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    event: &CheckoutEvent,
    order_id: Uuid,
) -> (Vec<NewOrderItem>, usize) {
    let fetched = match gateway.list_line_items(&event.session_id).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(
                error = %e,
                session_id = %event.session_id,
                "failed to fetch line items, order left without items"
            );
            return (Vec::new(), 0);
        }
    };

    let mut inserted = Vec::new();
    let mut skipped = 0usize;

    for line in fetched {
        let product_id = match product_repo::resolve_price(pool, &line.price_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!(
                    price_id = %line.price_id,
                    session_id = %event.session_id,
                    "no product for price id, item skipped"
                );
                skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    price_id = %line.price_id,
                    "product lookup failed, item skipped"
                );
                skipped += 1;
                continue;
            }
        };

        let item = NewOrderItem {
            id: Uuid::now_v7(),
            order_id,
            product_id,
            price_id: line.price_id,
            quantity: line.quantity,
            unit_price: line.unit_amount,
            total_price: line.total_amount,
        };

        match order_repo::insert_item(pool, &item).await {
            Ok(()) => inserted.push(item),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    price_id = %item.price_id,
                    "item insert failed, continuing with remaining items"
                );
                skipped += 1;
            }
        }
    }

    (inserted, skipped)
}

/// Points step. Every individual failure is logged and swallowed; the
/// ledger tolerates partial completion, and the recompute at the end is
/// fire-and-forget. Returns the bonus actually written to the ledger.
async fn accrue_points(
    pool: &PgPool,
    event: &CheckoutEvent,
    order_id: Uuid,
    order_number: &str,
    user_id: &str,
    items: &[NewOrderItem],
    loyalty: &LoyaltyPolicy,
    actor: &str,
) -> i64 {
    let mut touched_ledger = false;

    if event.metadata.points_earned > 0 {
        // Base accrual is computed by the store from the pre-discount amount.
        let basis = event
            .metadata
            .original_total
            .unwrap_or(event.amount_total);
        match points_repo::award_points_for_order(pool, user_id, basis.cents(), order_number).await
        {
            Ok(points) => {
                touched_ledger = true;
                tracing::info!(user_id, points, order_number, "base points awarded");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id, order_number, "base points award failed");
            }
        }
    }

    let bonus = loyalty.bonus_for_items(items);
    let mut bonus_written = 0i64;
    if bonus > 0 {
        let tx = NewPointsTransaction::bonus(user_id, bonus, order_number);
        match points_repo::insert_transaction(pool, &tx).await {
            Ok(()) => {
                touched_ledger = true;
                bonus_written = bonus;
                if let Err(e) = order_repo::add_points_earned(pool, order_id, bonus).await {
                    tracing::warn!(error = %e, order_number, "points_earned bump failed");
                }
                let audit = NewAuditEntry {
                    id: Uuid::now_v7(),
                    entity_type: "order".to_string(),
                    entity_id: Some(order_id),
                    external_id: Some(event.session_id.as_str().to_string()),
                    event_id: event.event_id.as_ref().map(|id| id.as_str().to_string()),
                    action: "points_awarded".to_string(),
                    actor: actor.to_string(),
                    detail: serde_json::json!({ "user_id": user_id, "points": bonus }),
                };
                if let Err(e) = audit_repo::insert_audit_entry(pool, &audit).await {
                    tracing::warn!(error = %e, order_number, "audit write failed");
                }
                tracing::info!(user_id, bonus, order_number, "bulk pack bonus awarded");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id, order_number, "bonus ledger insert failed");
            }
        }
    }

    if touched_ledger {
        if let Err(e) = points_repo::recompute_balance(pool, user_id).await {
            tracing::warn!(error = %e, user_id, "balance recompute failed");
        }
    }

    bonus_written
}

/// Log an event type we acknowledge but do not materialize. Returns `false`
/// for a redelivery of an event id we already recorded.
pub async fn log_passthrough(
    pool: &PgPool,
    event: &PassthroughEvent,
) -> Result<bool, EngineError> {
    let is_new = event_log_repo::insert_event(
        pool,
        event.event_id.as_str(),
        event.session_id.as_deref(),
        &event.event_type,
        event.provider_ts,
        &event.raw_payload,
    )
    .await?;

    if !is_new {
        return Ok(false);
    }

    let audit = NewAuditEntry {
        id: Uuid::now_v7(),
        entity_type: "gateway_event".to_string(),
        entity_id: None,
        external_id: event.session_id.clone(),
        event_id: Some(event.event_id.as_str().to_string()),
        action: "event_received".to_string(),
        actor: event.actor.clone(),
        detail: serde_json::json!({
            "event_type": event.event_type,
            "passthrough": true,
        }),
    };
    audit_repo::insert_audit_entry(pool, &audit).await?;
    Ok(true)
}
