pub mod audit;
pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod money;
pub mod order;
pub mod points;
pub mod review;
