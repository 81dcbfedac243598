use {
    super::audit::NewAuditEntry,
    super::error::EngineError,
    super::event::CheckoutEvent,
    super::money::{Currency, MoneyAmount},
    super::review::ReviewVerdict,
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    NeedsReview,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NeedsReview => "needs_review",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for VerificationStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "verified" => Ok(Self::Verified),
            "needs_review" => Ok(Self::NeedsReview),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "unknown verification status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentStatus {
    Processing,
    Pending,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for FulfillmentStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "processing" => Ok(Self::Processing),
            "pending" => Ok(Self::Pending),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "unknown fulfillment status: {other}"
            ))),
        }
    }
}

/// Order header for INSERT. The order number and timestamps come from the
/// store; `order_status` is always `completed`: this engine only ever sees
/// checkouts the gateway already settled.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub external_session_id: String,
    pub total: MoneyAmount,
    pub subtotal: MoneyAmount,
    pub discount: MoneyAmount,
    pub currency: Currency,
    pub points_used: i64,
    pub points_earned: i64,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    pub customer_email: Option<String>,
}

impl NewOrder {
    pub fn from_event(event: &CheckoutEvent, user_id: Option<String>) -> Self {
        // Customer email is persisted for guest orders only; registered
        // users are reachable through their account.
        let customer_email = if user_id.is_none() {
            event.customer_email.clone()
        } else {
            None
        };

        Self {
            id: Uuid::now_v7(),
            user_id,
            external_session_id: event.session_id.as_str().to_string(),
            total: event.amount_total,
            subtotal: event.amount_subtotal,
            discount: event.discount(),
            currency: event.currency,
            points_used: event.metadata.points_used,
            points_earned: event.metadata.points_earned,
            shipping_address: event.shipping_details.clone(),
            billing_address: event.billing_details.clone(),
            customer_email,
        }
    }

    pub fn audit_entry(&self, actor: &str, action: &str) -> NewAuditEntry {
        NewAuditEntry {
            id: Uuid::now_v7(),
            entity_type: "order".to_string(),
            entity_id: Some(self.id),
            external_id: Some(self.external_session_id.clone()),
            event_id: None,
            action: action.to_string(),
            actor: actor.to_string(),
            detail: serde_json::json!({
                "total_cents": self.total.cents(),
                "currency": self.currency.as_str(),
                "user_id": self.user_id,
                "points_used": self.points_used,
            }),
        }
    }
}

/// One resolved line item, ready for INSERT. Items whose price id has no
/// matching product never reach this type; they are skipped upstream.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub price_id: String,
    pub quantity: i64,
    pub unit_price: MoneyAmount,
    pub total_price: MoneyAmount,
}

/// What the materializer reports back to its caller.
#[derive(Debug)]
pub enum MaterializeOutcome {
    Created {
        order_id: Uuid,
        order_number: String,
        items_inserted: usize,
        items_skipped: usize,
        verdict: ReviewVerdict,
        bonus_points: i64,
    },
    /// An order for this session already exists, from a duplicate delivery or a
    /// recovery run racing the live webhook. Treated as success.
    AlreadyProcessed,
    /// Guest checkout on a path whose policy skips guests.
    GuestSkipped,
}
