//! Request handlers.

pub mod health;
pub mod jobs;
pub mod webhook;

pub use health::*;
pub use jobs::*;
pub use webhook::*;
