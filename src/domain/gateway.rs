use {
    super::error::EngineError,
    super::id::SessionId,
    super::money::{Currency, MoneyAmount},
    std::collections::HashMap,
    std::{future::Future, pin::Pin},
};

/// The gateway's view of whether a session was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

/// Full session detail fetched directly from the gateway. The recovery path
/// builds a `CheckoutEvent` from this; webhook payloads may omit parts of it.
#[derive(Debug, Clone)]
pub struct FetchedSession {
    pub session_id: SessionId,
    pub payment_status: GatewayPaymentStatus,
    pub amount_total: MoneyAmount,
    pub amount_subtotal: MoneyAmount,
    pub currency: Currency,
    pub metadata: HashMap<String, String>,
    pub customer_email: Option<String>,
    pub shipping_details: Option<serde_json::Value>,
    pub billing_details: Option<serde_json::Value>,
    pub created: i64,
}

/// One line item as the gateway reports it. `price_id` still needs resolving
/// to an internal product before it can become an order item.
#[derive(Debug, Clone)]
pub struct FetchedLineItem {
    pub price_id: String,
    pub quantity: i64,
    pub unit_amount: MoneyAmount,
    pub total_amount: MoneyAmount,
}

/// Slim session listing entry for the reconciliation scan.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub payment_status: GatewayPaymentStatus,
    pub amount_total: MoneyAmount,
    pub created: i64,
}

/// Everything the engine needs from the payment gateway. Injected so tests
/// and the recovery tooling can run without live gateway credentials.
pub trait PaymentGateway: Send + Sync {
    fn fetch_session(
        &self,
        id: &SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<FetchedSession, EngineError>> + Send + '_>>;

    fn list_line_items(
        &self,
        id: &SessionId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FetchedLineItem>, EngineError>> + Send + '_>>;

    fn list_recent_sessions(
        &self,
        limit: u64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SessionSummary>, EngineError>> + Send + '_>>;
}
