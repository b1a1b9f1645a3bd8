//! Business logic services.

pub mod intake;
pub mod webhook;

pub use intake::{IntakeService, SubmitOutcome};
pub use webhook::WebhookService;
