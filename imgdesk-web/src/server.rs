//! imgdesk Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// How often idle sessions are purged
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

/// Main imgdesk web server
pub struct ImgdeskServer {
    config: WebConfig,
    state: AppState,
}

impl ImgdeskServer {
    /// Create a new server; fails on invalid configuration
    pub fn new(config: WebConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone())?;

        Ok(Self { config, state })
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> WebResult<()> {
        info!(api_server = %self.config.api_server, "Starting imgdesk web console");
        crate::handlers::install_panic_hook();

        let purge_state = self.state.clone();
        let purge_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                purge_state.purge_idle_sessions().await;
            }
        });

        let app = create_app(self.state);
        let result = serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        purge_task.abort();

        if let Err(e) = result {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        info!("Server shut down");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Builder for ImgdeskServer
pub struct ImgdeskServerBuilder {
    config: WebConfig,
}

impl ImgdeskServerBuilder {
    /// Start from the given configuration
    pub fn new(config: WebConfig) -> Self {
        Self { config }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the upstream API base URL
    pub fn api_server<S: Into<String>>(mut self, api_server: S) -> Self {
        self.config.api_server = api_server.into();
        self
    }

    /// Set the per-call upstream timeout
    pub fn upstream_timeout(mut self, seconds: u64) -> Self {
        self.config.upstream_timeout_secs = seconds;
        self
    }

    /// Build the server
    pub fn build(self) -> WebResult<ImgdeskServer> {
        ImgdeskServer::new(self.config)
    }
}

impl Default for ImgdeskServerBuilder {
    fn default() -> Self {
        Self::new(WebConfig::default())
    }
}
