pub mod materializer;
pub mod reconciliation;
pub mod scheduler;
