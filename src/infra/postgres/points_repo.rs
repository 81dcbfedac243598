use {
    crate::domain::error::EngineError,
    crate::domain::points::NewPointsTransaction,
    sqlx::PgPool,
};

/// Base accrual RPC on the store: awards points for the pre-discount order
/// amount. Returns the number of points the store granted.
pub async fn award_points_for_order(
    pool: &PgPool,
    user_id: &str,
    amount_cents: i64,
    order_reference: &str,
) -> Result<i64, EngineError> {
    let points: i64 = sqlx::query_scalar("SELECT award_points_for_order($1, $2, $3)")
        .bind(user_id)
        .bind(amount_cents)
        .bind(order_reference)
        .fetch_one(pool)
        .await?;
    Ok(points)
}

/// Direct ledger insert, used for the bulk-pack bonus.
pub async fn insert_transaction(
    pool: &PgPool,
    tx: &NewPointsTransaction,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO points_transactions
            (id, user_id, kind, points_amount, description, order_reference, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(tx.id)
    .bind(&tx.user_id)
    .bind(tx.kind.as_str())
    .bind(tx.points_amount)
    .bind(&tx.description)
    .bind(tx.order_reference.as_deref())
    .bind(tx.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Recompute RPC on the store: derives the user's balance from the ledger.
pub async fn recompute_balance(pool: &PgPool, user_id: &str) -> Result<i64, EngineError> {
    let balance: i64 = sqlx::query_scalar("SELECT recompute_user_points_balance($1)")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(balance)
}
