//! Optional TOML configuration file

use crate::error::{ImgdeskError, ImgdeskResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings read from a configuration file; unset values fall back to env and defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Base URL of the upstream image API
    pub api_server: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub session_idle_minutes: Option<u64>,
    /// Multipart part name carrying the uploaded file
    pub upload_field: Option<String>,
    /// Image fields offered on the create and edit forms
    pub image_fields: Option<Vec<String>>,
    pub secure_cookie: Option<bool>,
    pub logging: Option<LoggingConfig>,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ImgdeskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImgdeskError::config_with_source(
                format!("Failed to read config file {}", path.display()),
                Box::new(e),
            )
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> ImgdeskResult<Self> {
        toml::from_str(content).map_err(|e| {
            ImgdeskError::config_with_source("Failed to parse config", Box::new(e))
        })
    }
}
