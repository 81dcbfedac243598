use {
    super::money::MoneyAmount,
    super::order::{FulfillmentStatus, NewOrderItem, VerificationStatus},
};

/// Thresholds for the manual-review rules. Policy, not code: callers pass
/// this in so the rules are adjustable and testable without touching logic.
#[derive(Debug, Clone)]
pub struct ReviewPolicy {
    /// Flag when the order total is strictly above this (minor units).
    pub large_order_cents: i64,
    /// Flag when points spent on the order are strictly above this.
    pub high_points_used: i64,
    /// Together with a small-pack item: flag when the total is strictly
    /// below this (minor units); the shipping tier has no tracking.
    pub low_value_cents: i64,
    /// Product id of the small-pack SKU that ships untracked.
    pub small_pack_product: String,
}

impl Default for ReviewPolicy {
    fn default() -> Self {
        Self {
            large_order_cents: 10_000,
            high_points_used: 100,
            low_value_cents: 599,
            small_pack_product: "pack-small".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReviewVerdict {
    pub requires_manual_review: bool,
    pub reasons: Vec<String>,
    pub verification_status: VerificationStatus,
    pub fulfillment_status: FulfillmentStatus,
}

impl ReviewVerdict {
    /// The free-text `review_reason` column: all triggered rules, joined.
    pub fn reason_text(&self) -> Option<String> {
        if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join("; "))
        }
    }
}

/// Decide whether an order needs a human before fulfillment. Pure: every
/// rule is evaluated independently and each match appends its own reason.
pub fn classify(
    total: MoneyAmount,
    points_used: i64,
    items: &[NewOrderItem],
    policy: &ReviewPolicy,
) -> ReviewVerdict {
    let mut reasons = Vec::new();

    let has_small_pack = items
        .iter()
        .any(|item| item.product_id == policy.small_pack_product);
    if has_small_pack && total.cents() < policy.low_value_cents {
        reasons.push(
            "low-value order with non-trackable shipping tier, needs shipping verification"
                .to_string(),
        );
    }

    if total.cents() > policy.large_order_cents {
        reasons.push("large order value, verify customer intent".to_string());
    }

    if points_used > policy.high_points_used {
        reasons.push("high points usage, verify account legitimacy".to_string());
    }

    let requires_manual_review = !reasons.is_empty();
    ReviewVerdict {
        requires_manual_review,
        verification_status: if requires_manual_review {
            VerificationStatus::NeedsReview
        } else {
            VerificationStatus::Verified
        },
        fulfillment_status: if requires_manual_review {
            FulfillmentStatus::Pending
        } else {
            FulfillmentStatus::Processing
        },
        reasons,
    }
}
