use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    order_sync::{
        AppState,
        adapters::stripe_client::StripeGateway,
        services::{materializer::EnginePolicies, scheduler::run_scan_loop},
    },
    sqlx::postgres::PgPoolOptions,
    std::{env, sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let stripe_webhook_secret =
        env::var("STRIPE_WEBHOOK_SECRET").expect("STRIPE_WEBHOOK_SECRET must be set");
    let stripe_secret_key = env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&database_url)
        .await
        .expect("failed to connect to database");

    let gateway = Arc::new(StripeGateway::new(&stripe_secret_key));

    let state = AppState {
        pool: pool.clone(),
        stripe_webhook_secret: stripe_webhook_secret.into(),
        gateway: gateway.clone(),
        policies: EnginePolicies::from_env(),
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Optional scheduled reconciliation: detect paid sessions that never
    // became orders. Off unless an interval is configured.
    let scan_handle = match env::var("RECONCILE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&secs| secs > 0)
    {
        Some(secs) => Some(tokio::spawn(run_scan_loop(
            pool.clone(),
            gateway,
            Duration::from_secs(secs),
            50,
            shutdown_rx,
        ))),
        None => None,
    };

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/webhook",
            post(order_sync::adapters::stripe::webhook_handler),
        )
        .layer(DefaultBodyLimit::max(256 * 1024))
        // Bound the webhook response time: the gateway times out and retries
        // on its own schedule, so never hold its delivery open.
        .layer(TimeoutLayer::new(Duration::from_secs(15)))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scan_handle {
        let _ = handle.await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
