pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

use {
    crate::domain::gateway::PaymentGateway, crate::services::materializer::EnginePolicies,
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub stripe_webhook_secret: Arc<str>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub policies: EnginePolicies,
}
