use {
    crate::domain::error::EngineError,
    crate::domain::order::{NewOrder, NewOrderItem},
    crate::domain::review::ReviewVerdict,
    sqlx::PgPool,
    uuid::Uuid,
};

/// Insert the order header. The UNIQUE constraint on `external_session_id`
/// is the idempotency guard: a conflict means the session was already
/// materialized (duplicate webhook delivery, or recovery racing the live
/// path) and comes back as `None`, never as an error.
pub async fn insert_order(
    pool: &PgPool,
    order: &NewOrder,
) -> Result<Option<String>, EngineError> {
    let order_number: Option<String> = sqlx::query_scalar(
        r#"
        INSERT INTO orders
            (id, user_id, external_session_id,
             total_cents, subtotal_cents, discount_cents, currency,
             points_used, points_earned,
             shipping_address, billing_address, customer_email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (external_session_id) DO NOTHING
        RETURNING order_number
        "#,
    )
    .bind(order.id)
    .bind(order.user_id.as_deref())
    .bind(&order.external_session_id)
    .bind(order.total.cents())
    .bind(order.subtotal.cents())
    .bind(order.discount.cents())
    .bind(order.currency.as_str())
    .bind(order.points_used)
    .bind(order.points_earned)
    .bind(order.shipping_address.as_ref())
    .bind(order.billing_address.as_ref())
    .bind(order.customer_email.as_deref())
    .fetch_optional(pool)
    .await?;

    Ok(order_number)
}

pub async fn order_exists(pool: &PgPool, session_id: &str) -> Result<bool, EngineError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE external_session_id = $1)")
            .bind(session_id)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

pub async fn insert_item(pool: &PgPool, item: &NewOrderItem) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO order_items
            (id, order_id, product_id, price_id, quantity,
             unit_price_cents, total_price_cents)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(&item.product_id)
    .bind(&item.price_id)
    .bind(item.quantity)
    .bind(item.unit_price.cents())
    .bind(item.total_price.cents())
    .execute(pool)
    .await?;
    Ok(())
}

/// Persist the review verdict onto an existing order.
pub async fn apply_review(
    pool: &PgPool,
    order_id: Uuid,
    verdict: &ReviewVerdict,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        UPDATE orders
        SET verification_status = $1,
            fulfillment_status = $2,
            requires_manual_review = $3,
            review_reason = $4,
            updated_at = now()
        WHERE id = $5
        "#,
    )
    .bind(verdict.verification_status.as_str())
    .bind(verdict.fulfillment_status.as_str())
    .bind(verdict.requires_manual_review)
    .bind(verdict.reason_text())
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Atomic increment of the order's stored `points_earned`. An increment in
/// SQL rather than read-modify-write in Rust, so concurrent accrual cannot
/// lose an update.
pub async fn add_points_earned(
    pool: &PgPool,
    order_id: Uuid,
    points: i64,
) -> Result<(), EngineError> {
    sqlx::query(
        "UPDATE orders SET points_earned = points_earned + $1, updated_at = now() WHERE id = $2",
    )
    .bind(points)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(())
}
