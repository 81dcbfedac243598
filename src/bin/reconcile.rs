//! Operator tooling for the repair path.
//!
//! `reconcile scan [limit]`: diff recent gateway sessions against stored
//! orders and print the paid-but-missing ones as JSON.
//!
//! `reconcile recover <cs_...>`: backfill one missing session through the
//! same materializer the webhook uses. Safe to re-run: an already-recovered
//! session is a no-op.

use {
    order_sync::{
        adapters::stripe_client::StripeGateway,
        domain::id::SessionId,
        domain::order::MaterializeOutcome,
        services::materializer::EnginePolicies,
        services::reconciliation::{recover_session, scan_missing},
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, process::ExitCode, time::Duration},
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let usage = "usage: reconcile scan [limit] | reconcile recover <cs_...>";

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");
    let gateway = StripeGateway::new(&stripe_secret_key);

    match args.first().map(String::as_str) {
        Some("scan") => {
            let limit = args
                .get(1)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(50);
            match scan_missing(&pool, &gateway, limit).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("scan failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Some("recover") => {
            let Some(raw_id) = args.get(1) else {
                eprintln!("{usage}");
                return ExitCode::FAILURE;
            };
            let session_id = match SessionId::new(raw_id.clone()) {
                Ok(id) => id,
                Err(e) => {
                    eprintln!("{e}");
                    return ExitCode::FAILURE;
                }
            };

            match recover_session(&pool, &gateway, &session_id, &EnginePolicies::from_env()).await {
                Ok(MaterializeOutcome::Created {
                    order_id,
                    order_number,
                    items_inserted,
                    items_skipped,
                    verdict,
                    bonus_points,
                }) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "recovered": true,
                            "order_id": order_id,
                            "order_number": order_number,
                            "items_inserted": items_inserted,
                            "items_skipped": items_skipped,
                            "requires_manual_review": verdict.requires_manual_review,
                            "bonus_points": bonus_points,
                        }))
                        .unwrap()
                    );
                    ExitCode::SUCCESS
                }
                Ok(MaterializeOutcome::AlreadyProcessed) => {
                    println!("{}", serde_json::json!({"recovered": false, "reason": "order already exists"}));
                    ExitCode::SUCCESS
                }
                Ok(MaterializeOutcome::GuestSkipped) => {
                    // Recovery creates guest orders, so this cannot happen;
                    // surfaced anyway rather than silently swallowed.
                    eprintln!("unexpected guest skip on recovery path");
                    ExitCode::FAILURE
                }
                Err(e) => {
                    eprintln!("recovery failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("{usage}");
            ExitCode::FAILURE
        }
    }
}
