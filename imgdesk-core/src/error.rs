//! Crate-wide error type for faults outside the upstream failure taxonomy
//!
//! Classified upstream failures live in [`crate::outcome`]; this module covers the rest
//! (configuration, IO and internal invariants).

use thiserror::Error;

pub type ImgdeskResult<T> = Result<T, ImgdeskError>;

/// Main error type for the imgdesk system
#[derive(Error, Debug)]
pub enum ImgdeskError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ImgdeskError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with its underlying cause
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Short machine-readable code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            ImgdeskError::Config { .. } => "CONFIG_ERROR",
            ImgdeskError::Io(_) => "IO_ERROR",
            ImgdeskError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
