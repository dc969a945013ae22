//! HTTP surface: the dashboard API and the Asaas proxy.

pub mod admin;
pub mod api_config;
pub mod auth;
pub mod coordinator;
pub mod error;
pub mod middleware;
pub mod payments;
pub mod profile;
pub mod proxy;
pub mod routes;
pub mod status;

pub use routes::*;
