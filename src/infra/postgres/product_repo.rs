use {crate::domain::error::EngineError, sqlx::PgPool};

/// Map a gateway price id to an internal product id. `None` means the price
/// is unknown here; callers skip the item rather than failing the order.
pub async fn resolve_price(
    pool: &PgPool,
    price_id: &str,
) -> Result<Option<String>, EngineError> {
    let product_id: Option<String> =
        sqlx::query_scalar("SELECT product_id FROM products WHERE price_id = $1")
            .bind(price_id)
            .fetch_optional(pool)
            .await?;
    Ok(product_id)
}
