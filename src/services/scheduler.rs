use {
    super::reconciliation::scan_missing,
    crate::domain::gateway::PaymentGateway,
    sqlx::PgPool,
    std::{sync::Arc, time::Duration},
    tokio::sync::watch,
};

/// Periodically diff the gateway's recent sessions against stored orders and
/// log what's missing. Detection only; backfill stays an operator action
/// through the reconcile binary.
pub async fn run_scan_loop(
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    interval: Duration,
    lookback: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "reconciliation loop started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("reconciliation loop shutting down");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        match scan_missing(&pool, &*gateway, lookback).await {
            Ok(report) if report.missing.is_empty() => {}
            Ok(report) => {
                for missing in &report.missing {
                    tracing::warn!(
                        session_id = %missing.session_id,
                        amount_total_cents = missing.amount_total_cents,
                        "paid session has no order, needs recovery"
                    );
                }
            }
            Err(e) => tracing::error!(error = %e, "reconciliation scan failed"),
        }
    }
}
