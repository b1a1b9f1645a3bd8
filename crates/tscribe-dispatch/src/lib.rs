//! Client for the external transcription workflow trigger.
//!
//! After a job is committed, the API asks a repository-dispatch endpoint to
//! start the worker that will eventually call back with results. Delivery is
//! best-effort: callers log failures and move on.

pub mod client;
pub mod error;
pub mod types;

pub use client::{DispatchClient, DispatchConfig, Dispatcher, NoopDispatcher};
pub use error::{DispatchError, DispatchResult};
pub use types::{ClientPayload, DispatchRequest, EVENT_TYPE};
