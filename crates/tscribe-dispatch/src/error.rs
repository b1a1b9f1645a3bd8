//! Dispatch error types.

use thiserror::Error;

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Dispatch is not configured (missing repository or token)")]
    NotConfigured,

    #[error("Dispatch endpoint returned {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Timeout(_) | DispatchError::Network(_) => true,
            DispatchError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            DispatchError::NotConfigured => false,
        }
    }
}
