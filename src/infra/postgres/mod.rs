pub mod audit_repo;
pub mod event_log_repo;
pub mod order_repo;
pub mod points_repo;
pub mod product_repo;
