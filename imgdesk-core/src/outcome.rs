//! Classified outcome of a proxy operation
//!
//! Every upstream failure is folded into one of these variants at the client boundary, so
//! callers see the full failure surface in the type of each operation.

use thiserror::Error;

/// Result of a proxy operation
pub type OperationResult<T> = Result<T, OperationFailure>;

/// Why a proxy operation did not produce its payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    /// No credential in the session; the upstream was not contacted
    #[error("authentication required")]
    AuthRequired,

    /// The upstream rejected the submitted credentials
    #[error("authentication failed")]
    AuthFailed { messages: Vec<String> },

    /// The upstream rejected the submitted input
    #[error("validation failed")]
    ValidationFailed { messages: Vec<String> },

    /// The requested resource does not exist upstream
    #[error("resource not found")]
    NotFound,

    /// Network error, timeout, protocol violation or unclassified upstream status
    #[error("upstream unreachable: {reason}")]
    UpstreamUnreachable { reason: String },
}

impl OperationFailure {
    pub fn unreachable<S: Into<String>>(reason: S) -> Self {
        Self::UpstreamUnreachable {
            reason: reason.into(),
        }
    }

    /// Messages meant for the user, in upstream order
    pub fn messages(&self) -> &[String] {
        match self {
            Self::AuthFailed { messages } | Self::ValidationFailed { messages } => messages,
            _ => &[],
        }
    }

    /// Short label used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthFailed { .. } => "auth_failed",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::NotFound => "not_found",
            Self::UpstreamUnreachable { .. } => "upstream_unreachable",
        }
    }
}
