//! Database models and queries.

pub mod api_configurations;
pub mod api_logs;
pub mod health;
pub mod models;
pub mod payment_records;
pub mod profiles;
pub mod roles;
