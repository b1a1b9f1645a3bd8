//! Repository-dispatch HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::types::DispatchRequest;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_USER_AGENT: &str = concat!("tscribe/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";

/// Upper bound on `DISPATCH_MAX_RETRIES`.
const MAX_RETRIES_CAP: u32 = 10;

/// Something that can start the worker for a job.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult<()>;
}

/// Configuration for the dispatch client.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// API base URL, without trailing slash
    pub api_base: String,
    /// `owner/name` of the repository hosting the worker workflow
    pub repo: Option<String>,
    /// Bearer token
    pub token: Option<String>,
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Extra attempts for retryable failures
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            repo: None,
            token: None,
            timeout: Duration::from_secs(10),
            max_retries: 0,
            retry_base_delay: Duration::from_millis(500),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: std::env::var("DISPATCH_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            repo: non_empty_env("DISPATCH_REPO"),
            token: non_empty_env("DISPATCH_TOKEN"),
            timeout: Duration::from_secs(
                std::env::var("DISPATCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            max_retries: std::env::var("DISPATCH_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(0)
                .min(MAX_RETRIES_CAP),
            ..defaults
        }
    }

    /// True when both repository and token are set.
    pub fn is_configured(&self) -> bool {
        self.repo.is_some() && self.token.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Client for the repository-dispatch endpoint.
pub struct DispatchClient {
    http: Client,
    endpoint: String,
    token: String,
    config: DispatchConfig,
}

impl DispatchClient {
    /// Create a new client. Fails with `NotConfigured` if repo or token is missing.
    pub fn new(config: DispatchConfig) -> DispatchResult<Self> {
        let (repo, token) = match (&config.repo, &config.token) {
            (Some(repo), Some(token)) => (repo.clone(), token.clone()),
            _ => return Err(DispatchError::NotConfigured),
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(DispatchError::Network)?;

        let endpoint = format!("{}/repos/{}/dispatches", config.api_base, repo);

        Ok(Self {
            http,
            endpoint,
            token,
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(&self, request: &DispatchRequest) -> DispatchResult<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::RequestFailed { status, body });
        }

        Ok(())
    }

    fn classify(&self, e: reqwest::Error) -> DispatchError {
        if e.is_timeout() {
            DispatchError::Timeout(self.config.timeout.as_secs())
        } else {
            DispatchError::Network(e)
        }
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> DispatchResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = DispatchResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        "Dispatch failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Dispatcher for DispatchClient {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult<()> {
        debug!(
            job_id = %request.client_payload.job_id,
            endpoint = %self.endpoint,
            "Sending dispatch"
        );

        self.with_retry(|| self.send_once(request)).await?;

        info!(job_id = %request.client_payload.job_id, "Dispatch accepted");
        Ok(())
    }
}

/// Delay before retry number `attempt + 1`: the base delay doubled per attempt.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Dispatcher used when no repository/token is configured. Logs and succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

#[async_trait]
impl Dispatcher for NoopDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> DispatchResult<()> {
        info!(
            job_id = %request.client_payload.job_id,
            "Dispatch not configured, skipping worker trigger"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.api_base, "https://api.github.com");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 0);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_client_requires_repo_and_token() {
        let config = DispatchConfig {
            repo: Some("acme/worker".into()),
            ..Default::default()
        };
        assert!(matches!(
            DispatchClient::new(config),
            Err(DispatchError::NotConfigured)
        ));
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(4));
        assert!(backoff_delay(base, 40) >= backoff_delay(base, 31));
        assert!(backoff_delay(Duration::MAX, 5) == Duration::MAX);
    }

    #[test]
    fn test_endpoint() {
        let client = DispatchClient::new(DispatchConfig {
            repo: Some("acme/worker".into()),
            token: Some("t".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.github.com/repos/acme/worker/dispatches"
        );
    }
}
