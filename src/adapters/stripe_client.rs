use {
    super::stripe::{convert_amount, convert_currency},
    crate::domain::{
        error::EngineError,
        gateway::{
            FetchedLineItem, FetchedSession, GatewayPaymentStatus, PaymentGateway, SessionSummary,
        },
        id::SessionId,
    },
    std::{future::Future, pin::Pin},
};

pub struct StripeGateway {
    client: stripe::Client,
}

impl StripeGateway {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }
}

impl PaymentGateway for StripeGateway {
    fn fetch_session(
        &self,
        id: &SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedSession, EngineError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move { self.fetch_session_inner(&id).await })
    }

    fn list_line_items(
        &self,
        id: &SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FetchedLineItem>, EngineError>> + Send + '_>> {
        let id = id.clone();
        Box::pin(async move { self.list_line_items_inner(&id).await })
    }

    fn list_recent_sessions(
        &self,
        limit: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SessionSummary>, EngineError>> + Send + '_>> {
        Box::pin(async move { self.list_recent_sessions_inner(limit).await })
    }
}

fn convert_payment_status(status: stripe::CheckoutSessionPaymentStatus) -> GatewayPaymentStatus {
    match status {
        stripe::CheckoutSessionPaymentStatus::Paid => GatewayPaymentStatus::Paid,
        stripe::CheckoutSessionPaymentStatus::Unpaid => GatewayPaymentStatus::Unpaid,
        stripe::CheckoutSessionPaymentStatus::NoPaymentRequired => {
            GatewayPaymentStatus::NoPaymentRequired
        }
    }
}

impl StripeGateway {
    fn parse_session_id(raw: &SessionId) -> Result<stripe::CheckoutSessionId, EngineError> {
        raw.as_str()
            .parse::<stripe::CheckoutSessionId>()
            .map_err(|e| EngineError::Gateway(format!("invalid CheckoutSession id: {e}")))
    }

    async fn fetch_session_inner(&self, id: &SessionId) -> Result<FetchedSession, EngineError> {
        let session_id = Self::parse_session_id(id)?;
        let session = stripe::CheckoutSession::retrieve(&self.client, &session_id, &[])
            .await
            .map_err(|e| EngineError::Gateway(format!("Stripe API: {e}")))?;

        let amount_total = convert_amount(session.amount_total.unwrap_or(0))?;
        let amount_subtotal = convert_amount(session.amount_subtotal.unwrap_or(0))?;
        let currency = session
            .currency
            .ok_or_else(|| EngineError::Gateway("session has no currency".into()))
            .and_then(convert_currency)?;

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

        Ok(FetchedSession {
            session_id: id.clone(),
            payment_status: convert_payment_status(session.payment_status),
            amount_total,
            amount_subtotal,
            currency,
            metadata: session.metadata.unwrap_or_default(),
            customer_email,
            shipping_details,
            billing_details,
            created: session.created,
        })
    }

    async fn list_line_items_inner(
        &self,
        id: &SessionId,
    ) -> Result<Vec<FetchedLineItem>, EngineError> {
        let session_id = Self::parse_session_id(id)?;
        let session =
            stripe::CheckoutSession::retrieve(&self.client, &session_id, &["line_items"])
                .await
                .map_err(|e| EngineError::Gateway(format!("Stripe API: {e}")))?;

        let mut items = Vec::new();
        let Some(line_items) = session.line_items else {
            return Ok(items);
        };

        for line in line_items.data {
            let Some(price) = line.price.as_ref() else {
                tracing::warn!(session_id = %id, "line item without price, skipped");
                continue;
            };
            let quantity = line.quantity.unwrap_or(1) as i64;
            let total_amount = convert_amount(line.amount_total)?;
            let unit_amount = match price.unit_amount {
                Some(unit) => convert_amount(unit)?,
                None => convert_amount(line.amount_total / quantity.max(1))?,
            };

            items.push(FetchedLineItem {
                price_id: price.id.to_string(),
                quantity,
                unit_amount,
                total_amount,
            });
        }

        Ok(items)
    }

    async fn list_recent_sessions_inner(
        &self,
        limit: u64,
    ) -> Result<Vec<SessionSummary>, EngineError> {
        let mut params = stripe::ListCheckoutSessions::new();
        params.limit = Some(limit);

        let sessions = stripe::CheckoutSession::list(&self.client, &params)
            .await
            .map_err(|e| EngineError::Gateway(format!("Stripe API: {e}")))?;

        let mut summaries = Vec::new();
        for session in sessions.data {
            let session_id = SessionId::new(session.id.to_string())?;
            summaries.push(SessionSummary {
                session_id,
                payment_status: convert_payment_status(session.payment_status),
                amount_total: convert_amount(session.amount_total.unwrap_or(0))?,
                created: session.created,
            });
        }

        Ok(summaries)
    }
}
