use {
    super::id::{EventId, SessionId},
    super::money::{Currency, MoneyAmount},
    std::collections::HashMap,
};

/// Metadata value the storefront writes for guest checkouts.
pub const GUEST_SENTINEL: &str = "guest";

/// Who placed the order, as recorded in session metadata at checkout time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerRef {
    User(String),
    Guest,
}

impl CustomerRef {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::User(id) => Some(id),
            Self::Guest => None,
        }
    }
}

/// Checkout metadata, parsed leniently: the storefront writes these keys as
/// strings, and a missing or non-numeric value always degrades to a default
/// rather than failing the event.
#[derive(Debug, Clone)]
pub struct CheckoutMetadata {
    pub customer: CustomerRef,
    pub points_used: i64,
    pub points_earned: i64,
    pub discount_type: Option<String>,
    /// Pre-discount total in minor units, used for base points accrual.
    pub original_total: Option<MoneyAmount>,
    pub final_total: Option<MoneyAmount>,
}

impl CheckoutMetadata {
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let customer = match map.get("user_id").map(String::as_str) {
            None | Some("") | Some(GUEST_SENTINEL) => CustomerRef::Guest,
            Some(id) => CustomerRef::User(id.to_string()),
        };

        Self {
            customer,
            points_used: parse_points(map.get("points_used")),
            points_earned: parse_points(map.get("points_earned")),
            discount_type: map.get("discount_type").cloned(),
            original_total: parse_amount(map.get("original_total")),
            final_total: parse_amount(map.get("final_total")),
        }
    }
}

fn parse_points(raw: Option<&String>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|&v| v >= 0)
        .unwrap_or(0)
}

fn parse_amount(raw: Option<&String>) -> Option<MoneyAmount> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|v| MoneyAmount::new(v).ok())
}

/// A completed-checkout notification, either delivered by webhook or
/// reconstructed from a direct gateway query on the recovery path.
/// Ephemeral; only its derived effects are persisted.
#[derive(Debug, Clone)]
pub struct CheckoutEvent {
    /// Absent on the recovery path, which has no delivering event.
    pub event_id: Option<EventId>,
    pub session_id: SessionId,
    pub amount_total: MoneyAmount,
    pub amount_subtotal: MoneyAmount,
    pub currency: Currency,
    pub metadata: CheckoutMetadata,
    pub customer_email: Option<String>,
    pub shipping_details: Option<serde_json::Value>,
    pub billing_details: Option<serde_json::Value>,
    pub provider_ts: i64,
}

impl CheckoutEvent {
    pub fn discount(&self) -> MoneyAmount {
        self.amount_subtotal
            .checked_sub(self.amount_total)
            .unwrap_or(MoneyAmount::ZERO)
    }
}

/// Event types the router acknowledges without materializing anything:
/// payment_intent notifications (reserved for future use) and whatever new
/// vocabulary the gateway grows. Logged for forensics, then dropped.
#[derive(Debug, Clone)]
pub struct PassthroughEvent {
    pub session_id: Option<String>,
    pub event_id: EventId,
    pub event_type: String,
    pub provider_ts: i64,
    pub raw_payload: serde_json::Value,
    pub actor: String,
}
