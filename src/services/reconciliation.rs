use {
    super::materializer::{materialize_order, EnginePolicies, GuestPolicy},
    crate::domain::error::EngineError,
    crate::domain::event::{CheckoutEvent, CheckoutMetadata},
    crate::domain::gateway::{GatewayPaymentStatus, PaymentGateway},
    crate::domain::id::SessionId,
    crate::domain::order::MaterializeOutcome,
    crate::infra::postgres::order_repo,
    serde::Serialize,
    sqlx::PgPool,
};

#[derive(Debug, Clone, Serialize)]
pub struct MissingSession {
    pub session_id: String,
    pub amount_total_cents: i64,
    pub created: i64,
}

/// The diff between the gateway's event history and our orders table.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub paid: usize,
    pub missing: Vec<MissingSession>,
}

/// List the gateway's most recent sessions and report every paid one that
/// never became an order. This is the authoritative detector for dropped or
/// fatally mishandled webhook deliveries.
pub async fn scan_missing(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    limit: u64,
) -> Result<ScanReport, EngineError> {
    let sessions = gateway.list_recent_sessions(limit).await?;
    let scanned = sessions.len();

    let mut paid = 0usize;
    let mut missing = Vec::new();
    for session in sessions {
        if session.payment_status != GatewayPaymentStatus::Paid {
            continue;
        }
        paid += 1;

        if !order_repo::order_exists(pool, session.session_id.as_str()).await? {
            missing.push(MissingSession {
                session_id: session.session_id.into_inner(),
                amount_total_cents: session.amount_total.cents(),
                created: session.created,
            });
        }
    }

    tracing::info!(scanned, paid, missing = missing.len(), "reconciliation scan");
    Ok(ScanReport {
        scanned,
        paid,
        missing,
    })
}

/// Backfill one session the webhook path missed. Fetches full detail
/// straight from the gateway and re-runs the same materializer as the live
/// path, so the two paths cannot drift, with one deliberate difference:
/// recovery creates guest orders.
pub async fn recover_session(
    pool: &PgPool,
    gateway: &dyn PaymentGateway,
    session_id: &SessionId,
    policies: &EnginePolicies,
) -> Result<MaterializeOutcome, EngineError> {
    let session = gateway.fetch_session(session_id).await?;

    if session.payment_status != GatewayPaymentStatus::Paid {
        return Err(EngineError::Validation(format!(
            "session {session_id} is not paid, refusing to recover"
        )));
    }

    let event = CheckoutEvent {
        event_id: None,
        session_id: session.session_id,
        amount_total: session.amount_total,
        amount_subtotal: session.amount_subtotal,
        currency: session.currency,
        metadata: CheckoutMetadata::from_map(&session.metadata),
        customer_email: session.customer_email,
        shipping_details: session.shipping_details,
        billing_details: session.billing_details,
        provider_ts: session.created,
    };

    materialize_order(
        pool,
        gateway,
        &event,
        GuestPolicy::Create,
        policies,
        "recovery:stripe",
        "recovered",
    )
    .await
}
