//! Axum HTTP API server.
//!
//! This crate provides:
//! - Job submission with URL normalization and dedup
//! - Job status and history endpoints
//! - HMAC-authenticated worker callbacks
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use security::{WebhookVerifier, SIGNATURE_HEADER};
pub use services::{IntakeService, SubmitOutcome, WebhookService};
pub use state::AppState;
