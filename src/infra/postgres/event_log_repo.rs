use {crate::domain::error::EngineError, sqlx::PgPool};

/// Record a verified webhook delivery. Returns `false` when this event id
/// was already seen; redelivery of passthrough types dedups here.
pub async fn insert_event(
    pool: &PgPool,
    event_id: &str,
    session_id: Option<&str>,
    event_type: &str,
    provider_ts: i64,
    payload: &serde_json::Value,
) -> Result<bool, EngineError> {
    let inserted: Option<bool> = sqlx::query_scalar(
        r#"
        INSERT INTO gateway_events (event_id, session_id, event_type, provider_ts, payload)
        VALUES ($1, COALESCE($2, ''), $3, $4, $5)
        ON CONFLICT (event_id) DO NOTHING
        RETURNING true
        "#,
    )
    .bind(event_id)
    .bind(session_id)
    .bind(event_type)
    .bind(provider_ts)
    .bind(payload)
    .fetch_optional(pool)
    .await?;

    Ok(inserted.is_some())
}
