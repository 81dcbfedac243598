use {chrono::{DateTime, Duration, Utc}, uuid::Uuid};

/// Accruals expire 730 days after they are written. Must stay in step with
/// the store's award RPC, which applies the same interval.
pub fn accrual_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(730)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Earned,
    Spent,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
        }
    }
}

/// Append-only ledger row. Never mutated after insert; the running balance
/// is derived by the store's recompute RPC, not kept here.
#[derive(Debug, Clone)]
pub struct NewPointsTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub points_amount: i64,
    pub description: String,
    pub order_reference: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewPointsTransaction {
    pub fn bonus(user_id: &str, points: i64, order_number: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            kind: TransactionKind::Earned,
            points_amount: points,
            description: "Bulk pack bonus points".to_string(),
            order_reference: Some(order_number.to_string()),
            expires_at: Some(accrual_expiry(Utc::now())),
        }
    }
}

/// Bonus accrual policy for qualifying bulk items.
#[derive(Debug, Clone)]
pub struct LoyaltyPolicy {
    /// Product id of the bulk-pack SKU that earns bonus points.
    pub bulk_pack_product: String,
    /// Bonus points per unit of the qualifying product.
    pub bonus_per_unit: i64,
}

impl Default for LoyaltyPolicy {
    fn default() -> Self {
        Self {
            bulk_pack_product: "pack-bulk".to_string(),
            bonus_per_unit: 50,
        }
    }
}

impl LoyaltyPolicy {
    /// Bonus for an order: 50 × total quantity of the qualifying product
    /// across all line items (with the default policy).
    pub fn bonus_for_items(&self, items: &[crate::domain::order::NewOrderItem]) -> i64 {
        let qualifying: i64 = items
            .iter()
            .filter(|item| item.product_id == self.bulk_pack_product)
            .map(|item| item.quantity)
            .sum();
        qualifying * self.bonus_per_unit
    }
}
