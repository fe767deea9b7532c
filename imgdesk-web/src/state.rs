//! Application state shared by every handler

use crate::{WebConfig, WebResult};
use imgdesk_applications::{ImageConsole, MemorySessionStore, SessionStore};
use imgdesk_upstream::{UpstreamApi, UpstreamClient};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<WebConfig>,
    /// Proxy operations bound to the upstream client
    pub console: ImageConsole,
    /// Per-browser sessions
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Validate the configuration and connect the console to the configured upstream
    pub fn new(config: WebConfig) -> WebResult<Self> {
        config.validate()?;
        let client = UpstreamClient::new(config.upstream_config())?;

        info!(
            api_server = %client.base_url(),
            timeout_secs = config.upstream_timeout_secs,
            "Upstream client configured"
        );

        Ok(Self::with_parts(
            config,
            Arc::new(client),
            Arc::new(MemorySessionStore::new()),
        ))
    }

    /// Assemble state from explicit parts
    pub fn with_parts(
        config: WebConfig,
        upstream: Arc<dyn UpstreamApi>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            console: ImageConsole::new(upstream),
            sessions,
        }
    }

    /// Drop sessions idle for longer than the configured timeout
    pub async fn purge_idle_sessions(&self) {
        match self.sessions.purge_idle(self.config.session_idle()).await {
            Ok(0) => debug!("No idle sessions to purge"),
            Ok(purged) => info!(purged, "Purged idle sessions"),
            Err(e) => warn!(error = %e, "Failed to purge idle sessions"),
        }
    }
}
