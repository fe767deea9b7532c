//! Client for the upstream image API
//!
//! This crate owns the one network boundary of the console: a configured HTTP client bound
//! to the upstream base URL, decoding of the upstream's JSON envelope, and translation of
//! upstream failures into [`imgdesk_core::OperationFailure`].

use async_trait::async_trait;
use imgdesk_core::{CredentialPayload, FormFields, OperationFailure, UploadedFile};
use serde_json::Value;
use std::fmt;

pub mod client;
pub mod envelope;
pub mod translate;

pub use client::{UpstreamClient, UpstreamConfig};
pub use envelope::{UpstreamEnvelope, EnvelopeError};
pub use translate::{failure_status, http_status, messages, translate};

/// Payload of a success envelope, or the classified failure
pub type RawResult = Result<Value, OperationFailure>;

/// HTTP verbs the upstream API understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl UpstreamMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamMethod::Get => "GET",
            UpstreamMethod::Post => "POST",
            UpstreamMethod::Put => "PUT",
            UpstreamMethod::Delete => "DELETE",
        }
    }

    /// Whether parameters travel in the request body rather than the query string
    pub fn sends_body(&self) -> bool {
        matches!(self, UpstreamMethod::Post | UpstreamMethod::Put)
    }

    /// Whether a successful answer must carry a response envelope
    ///
    /// Updates and deletes may answer with an empty body or `204 No Content`.
    pub fn requires_envelope(&self) -> bool {
        matches!(self, UpstreamMethod::Get | UpstreamMethod::Post)
    }
}

impl fmt::Display for UpstreamMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call against the upstream API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub method: UpstreamMethod,
    /// Path relative to the base URL, starting with `/`
    pub path: String,
    pub params: FormFields,
    pub file: Option<UploadedFile>,
}

impl UpstreamRequest {
    pub fn new<P: Into<String>>(method: UpstreamMethod, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            params: FormFields::new(),
            file: None,
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(UpstreamMethod::Get, path)
    }

    pub fn post<P: Into<String>>(path: P) -> Self {
        Self::new(UpstreamMethod::Post, path)
    }

    pub fn put<P: Into<String>>(path: P) -> Self {
        Self::new(UpstreamMethod::Put, path)
    }

    pub fn delete<P: Into<String>>(path: P) -> Self {
        Self::new(UpstreamMethod::Delete, path)
    }

    pub fn with_params(mut self, params: FormFields) -> Self {
        self.params = params;
        self
    }

    pub fn with_file(mut self, file: Option<UploadedFile>) -> Self {
        self.file = file;
        self
    }
}

/// Trait for upstream API clients
///
/// Each call performs exactly one round trip and never retries.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    async fn call(&self, credentials: &CredentialPayload, request: UpstreamRequest) -> RawResult;
}

/// Errors raised while building a client
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Invalid upstream base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Failed to create HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
