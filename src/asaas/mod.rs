//! Asaas billing API client.

pub mod client;
pub mod errors;
pub mod json;
pub mod middleware;
pub mod models;

pub use client::{AsaasClient, AsaasRequest, RawResponse};
pub use errors::AsaasApiError;
pub use models::{AsaasEnvironment, Customer, Payment, PaymentPage, RequestType};
