//! API configuration.

use std::path::PathBuf;

use tscribe_dispatch::DispatchConfig;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// The single browser origin allowed by CORS
    pub allowed_origin: String,
    /// Rate limit requests per second, per client IP
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Shared secret for worker callback signatures
    pub webhook_secret: String,
    /// Externally reachable base URL of this service
    pub public_base_url: String,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Worker trigger settings
    pub dispatch: DispatchConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origin: "http://localhost:5173".to_string(),
            rate_limit_rps: 10,
            max_body_size: 1024 * 1024, // 1MB
            environment: "development".to_string(),
            webhook_secret: String::new(),
            public_base_url: "http://localhost:8000".to_string(),
            database_path: PathBuf::from("data/tscribe.db"),
            metrics_enabled: true,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            allowed_origin: std::env::var("ALLOWED_ORIGIN")
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.allowed_origin),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            webhook_secret: std::env::var("WEBHOOK_SECRET").unwrap_or_default(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            dispatch: DispatchConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Callback URL handed to the worker.
    pub fn webhook_url(&self) -> String {
        format!("{}/api/webhook", self.public_base_url)
    }
}
