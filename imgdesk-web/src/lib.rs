//! imgdesk Web Console
//!
//! Browser-facing surface of imgdesk: HTML forms and pages that proxy to the upstream image
//! API through [`imgdesk_applications::ImageConsole`].

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod templates;

// Re-export main types
pub use error::{WebError, WebResult};
pub use server::{ImgdeskServer, ImgdeskServerBuilder};
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use imgdesk_core::FileConfig;
use imgdesk_upstream::client::{DEFAULT_TIMEOUT_SECS, DEFAULT_UPLOAD_FIELD};
use imgdesk_upstream::UpstreamConfig;
use std::time::Duration;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Largest request body accepted, uploads included
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::console_routes())
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::session_layer,
        ))
        // Probes never open a session
        .merge(routes::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Configuration for the web console
#[derive(Debug, Clone, PartialEq)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Base URL of the upstream image API
    pub api_server: String,
    /// Per-call upstream timeout in seconds
    pub upstream_timeout_secs: u64,
    /// Sessions unused for this long are dropped
    pub session_idle_minutes: u64,
    /// Multipart part name carrying the uploaded file
    pub upload_field: String,
    /// Fields offered on the upload and edit forms
    pub image_fields: Vec<String>,
    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_server: String::new(),
            upstream_timeout_secs: DEFAULT_TIMEOUT_SECS,
            session_idle_minutes: 720,
            upload_field: DEFAULT_UPLOAD_FIELD.to_string(),
            image_fields: vec!["title".to_string(), "description".to_string()],
            secure_cookie: false,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override settings with environment variables that are set
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("IMGDESK_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("IMGDESK_PORT").and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(api_server) = lookup("API_SERVER") {
            self.api_server = api_server;
        }
        if let Some(timeout) = lookup("IMGDESK_UPSTREAM_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.upstream_timeout_secs = timeout;
        }
        if let Some(idle) = lookup("IMGDESK_SESSION_IDLE_MINUTES").and_then(|v| v.parse().ok()) {
            self.session_idle_minutes = idle;
        }
        if let Some(field) = lookup("IMGDESK_UPLOAD_FIELD") {
            self.upload_field = field;
        }
        if let Some(fields) = lookup("IMGDESK_IMAGE_FIELDS") {
            self.image_fields = split_list(&fields);
        }
        if let Some(secure) = lookup("IMGDESK_SECURE_COOKIE").and_then(|v| v.parse().ok()) {
            self.secure_cookie = secure;
        }
    }

    /// Override settings with the values present in a configuration file
    pub fn apply_file(&mut self, file: &FileConfig) {
        if let Some(host) = &file.host {
            self.host = host.clone();
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(api_server) = &file.api_server {
            self.api_server = api_server.clone();
        }
        if let Some(timeout) = file.upstream_timeout_secs {
            self.upstream_timeout_secs = timeout;
        }
        if let Some(idle) = file.session_idle_minutes {
            self.session_idle_minutes = idle;
        }
        if let Some(field) = &file.upload_field {
            self.upload_field = field.clone();
        }
        if let Some(fields) = &file.image_fields {
            self.image_fields = fields.clone();
        }
        if let Some(secure) = file.secure_cookie {
            self.secure_cookie = secure;
        }
    }

    /// Reject settings the console cannot run with
    pub fn validate(&self) -> WebResult<()> {
        if self.api_server.trim().is_empty() {
            return Err(WebError::Config(
                "upstream API server is not set (API_SERVER or --api-server)".to_string(),
            ));
        }
        let url = url::Url::parse(&self.api_server).map_err(|e| {
            WebError::Config(format!("invalid API server URL '{}': {}", self.api_server, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(WebError::Config(format!(
                "API server URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.upstream_timeout_secs == 0 {
            return Err(WebError::Config(
                "upstream timeout must be at least one second".to_string(),
            ));
        }
        if self.upload_field.trim().is_empty() {
            return Err(WebError::Config("upload field name is empty".to_string()));
        }
        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the upstream client
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new(self.api_server.clone())
            .with_timeout(self.upstream_timeout_secs)
            .with_upload_field(self.upload_field.clone())
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> WebConfig {
        WebConfig {
            api_server: "http://api.example.test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = WebConfig::default();
        assert_eq!(config.address(), "127.0.0.1:8080");
        assert_eq!(config.upstream_timeout_secs, 10);
        assert_eq!(config.upload_field, "image");
        assert_eq!(config.session_idle(), Duration::from_secs(720 * 60));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("API_SERVER", "http://upstream:9000"),
            ("IMGDESK_PORT", "3000"),
            ("IMGDESK_UPSTREAM_TIMEOUT", "4"),
            ("IMGDESK_IMAGE_FIELDS", "title, tags ,,"),
            ("IMGDESK_SECURE_COOKIE", "true"),
            ("IMGDESK_SESSION_IDLE_MINUTES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = WebConfig::default();
        config.apply_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_server, "http://upstream:9000");
        assert_eq!(config.port, 3000);
        assert_eq!(config.upstream_timeout_secs, 4);
        assert_eq!(config.image_fields, vec!["title", "tags"]);
        assert!(config.secure_cookie);
        assert_eq!(config.session_idle_minutes, 720);
    }

    #[test]
    fn test_apply_file_only_touches_set_values() {
        let file = FileConfig {
            api_server: Some("https://images.example.test".to_string()),
            upload_field: Some("file".to_string()),
            ..Default::default()
        };
        let mut config = WebConfig::default();
        config.apply_file(&file);

        assert_eq!(config.api_server, "https://images.example.test");
        assert_eq!(config.upload_field, "file");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(WebConfig::default().validate().is_err());

        let bad_url = WebConfig {
            api_server: "not a url".to_string(),
            ..valid()
        };
        assert!(matches!(bad_url.validate(), Err(WebError::Config(_))));

        let ftp = WebConfig {
            api_server: "ftp://files.example.test".to_string(),
            ..valid()
        };
        assert!(ftp.validate().is_err());

        let zero_timeout = WebConfig {
            upstream_timeout_secs: 0,
            ..valid()
        };
        assert!(zero_timeout.validate().is_err());

        let no_field = WebConfig {
            upload_field: " ".to_string(),
            ..valid()
        };
        assert!(no_field.validate().is_err());
    }

    #[tokio::test]
    async fn test_session_cookie_only_on_console_routes() {
        use axum::{body::Body, http::header::SET_COOKIE, http::Request};
        use tower::ServiceExt;

        let app = create_app(AppState::new(valid()).unwrap());

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), 200);
        assert!(health.headers().get(SET_COOKIE).is_none());

        let login = app
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(login.status(), 200);
        let cookie = login.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("imgdesk_session="));
        assert!(cookie.contains("HttpOnly"));
    }
}
