use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            error::EngineError,
            event::{CheckoutEvent, CheckoutMetadata, PassthroughEvent},
            id::{EventId, SessionId},
            money::{Currency, MoneyAmount},
            order::MaterializeOutcome,
        },
        infra::postgres::event_log_repo,
        services::materializer::{GuestPolicy, log_passthrough, materialize_order},
    },
    axum::{Json, extract::State, http::HeaderMap},
    std::collections::HashMap,
};

pub fn convert_currency(c: stripe::Currency) -> Result<Currency, EngineError> {
    match c {
        stripe::Currency::USD => Ok(Currency::Usd),
        stripe::Currency::EUR => Ok(Currency::Eur),
        stripe::Currency::GBP => Ok(Currency::Gbp),
        stripe::Currency::JPY => Ok(Currency::Jpy),
        other => Err(EngineError::Validation(format!(
            "unsupported currency: {other:?}"
        ))),
    }
}

pub fn convert_amount(amount: i64) -> Result<MoneyAmount, EngineError> {
    MoneyAmount::new(amount)
}

/// Build the ephemeral checkout event from the webhook's session object.
pub fn checkout_event_from_session(
    session: &stripe::CheckoutSession,
    event_id: EventId,
    provider_ts: i64,
) -> Result<CheckoutEvent, EngineError> {
    let session_id = SessionId::new(session.id.to_string())?;
    let amount_total = convert_amount(session.amount_total.unwrap_or(0))?;
    let amount_subtotal = convert_amount(session.amount_subtotal.unwrap_or(0))?;
    let currency = session
        .currency
        .ok_or_else(|| EngineError::Validation("session has no currency".into()))
        .and_then(convert_currency)?;

    let empty = HashMap::new();
    let metadata = CheckoutMetadata::from_map(session.metadata.as_ref().unwrap_or(&empty));

    let customer_email = session
        .customer_details
        .as_ref()
        .and_then(|d| d.email.clone())
        .or_else(|| session.customer_email.clone());

    let shipping_details = session
        .shipping_details
        .as_ref()
        .map(serde_json::to_value)
        .transpose()?;
    let billing_details = session
        .customer_details
        .as_ref()
        .and_then(|d| d.address.as_ref())
        .map(serde_json::to_value)
        .transpose()?;

    Ok(CheckoutEvent {
        event_id: Some(event_id),
        session_id,
        amount_total,
        amount_subtotal,
        currency,
        metadata,
        customer_email,
        shipping_details,
        billing_details,
        provider_ts,
    })
}

/// Webhook entrypoint: verify, route, acknowledge.
///
/// Signature verification runs over the raw body exactly as delivered,
/// re-serializing before verifying would silently break the check. Parsing
/// happens only after `construct_event` accepts the signature.
#[tracing::instrument(
    name = "webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<serde_json::Value>, ApiError> {
    let sig = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| EngineError::WebhookSignature("missing Stripe-Signature header".into()))?;

    let event = stripe::Webhook::construct_event(&body, sig, &state.stripe_webhook_secret)
        .map_err(|e| EngineError::WebhookSignature(e.to_string()))?;

    let event_id = event.id.to_string();
    let provider_ts = event.created;
    let raw_event: serde_json::Value = serde_json::from_str(&body).map_err(EngineError::from)?;
    let event_type = raw_event
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    tracing::Span::current()
        .record("event_id", tracing::field::display(&event_id))
        .record("event_type", tracing::field::display(&event_type));

    // Route by type. Completed checkouts materialize; everything else is a
    // forward-compatible no-op; the gateway's vocabulary grows on its own
    // schedule and unknown types must never error.
    let checkout = match event.data.object {
        stripe::EventObject::CheckoutSession(ref session)
            if event_type == "checkout.session.completed" =>
        {
            match checkout_event_from_session(
                session,
                EventId::new(event_id.clone())?,
                provider_ts,
            ) {
                Ok(checkout) => checkout,
                Err(EngineError::Validation(msg)) => {
                    tracing::warn!("skipping malformed session data: {msg}");
                    return Ok(Json(serde_json::json!({"received": true})));
                }
                Err(e) => return Err(e.into()),
            }
        }
        _ => {
            let passthrough = PassthroughEvent {
                session_id: None,
                event_id: EventId::new(event_id.clone())?,
                event_type: event_type.clone(),
                provider_ts,
                raw_payload: raw_event,
                actor: "webhook:stripe".into(),
            };
            let is_new = log_passthrough(&state.pool, &passthrough).await?;
            tracing::info!(is_new, "passthrough event acknowledged");
            return Ok(Json(serde_json::json!({"received": true})));
        }
    };

    // Forensic event log; session-level idempotency is what actually guards
    // the order, so a duplicate event id here is informational.
    if let Err(e) = event_log_repo::insert_event(
        &state.pool,
        &event_id,
        Some(checkout.session_id.as_str()),
        &event_type,
        provider_ts,
        &raw_event,
    )
    .await
    {
        tracing::warn!(error = %e, "event log write failed");
    }

    let outcome = materialize_order(
        &state.pool,
        &*state.gateway,
        &checkout,
        GuestPolicy::Skip,
        &state.policies,
        "webhook:stripe",
        "created",
    )
    .await?;

    match outcome {
        MaterializeOutcome::Created {
            order_id,
            ref order_number,
            ..
        } => tracing::info!(%order_id, order_number, "order created from webhook"),
        MaterializeOutcome::AlreadyProcessed => {
            tracing::info!("duplicate delivery, order already exists")
        }
        MaterializeOutcome::GuestSkipped => {
            tracing::info!("guest checkout skipped on webhook path")
        }
    }

    Ok(Json(serde_json::json!({"received": true})))
}
