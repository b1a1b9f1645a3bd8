//! Application state.

use std::sync::Arc;

use tracing::{info, warn};

use tscribe_dispatch::{DispatchClient, Dispatcher, NoopDispatcher};
use tscribe_store::{Database, JobStore, SqliteJobStore};

use crate::config::ApiConfig;
use crate::security::WebhookVerifier;
use crate::services::{IntakeService, WebhookService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub intake: IntakeService,
    pub webhooks: WebhookService,
}

impl AppState {
    /// Open the database and build the dispatcher from configuration.
    pub fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open(&config.database_path)?;
        let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(db));

        let dispatcher: Arc<dyn Dispatcher> = if config.dispatch.is_configured() {
            let client = DispatchClient::new(config.dispatch.clone())?;
            info!(endpoint = %client.endpoint(), "Worker dispatch enabled");
            Arc::new(client)
        } else {
            warn!("DISPATCH_REPO/DISPATCH_TOKEN not set, jobs will not be dispatched");
            Arc::new(NoopDispatcher)
        };

        if config.webhook_secret.is_empty() {
            warn!("WEBHOOK_SECRET not set, all webhooks will be rejected");
        }

        Ok(Self::from_parts(config, store, dispatcher))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let intake = IntakeService::new(Arc::clone(&store), dispatcher, config.webhook_url());
        let webhooks = WebhookService::new(
            Arc::clone(&store),
            WebhookVerifier::new(&config.webhook_secret),
        );

        Self {
            config,
            store,
            intake,
            webhooks,
        }
    }
}
