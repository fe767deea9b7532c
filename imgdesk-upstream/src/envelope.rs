//! Decoding of the upstream JSON envelope
//!
//! Success bodies look like `{"response": <payload>}`, failures like
//! `{"error": {"messages": ["..."]}}`. Exactly one of the two keys must be present.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const RESPONSE_KEY: &str = "response";
const ERROR_KEY: &str = "error";

/// A decoded upstream body
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEnvelope {
    Success(Value),
    Failure(Vec<String>),
}

/// Why a body is not a valid envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("body is not JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("body is not a JSON object")]
    NotAnObject,

    #[error("body has both 'response' and 'error'")]
    Ambiguous,

    #[error("body has neither 'response' nor 'error'")]
    Missing,

    #[error("'error' is not of the form {{\"messages\": [string]}}: {0}")]
    MalformedError(serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    messages: Vec<String>,
}

/// Decode raw bytes as an envelope
pub fn decode(bytes: &[u8]) -> Result<UpstreamEnvelope, EnvelopeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(mut map) = value else {
        return Err(EnvelopeError::NotAnObject);
    };

    match (map.remove(RESPONSE_KEY), map.remove(ERROR_KEY)) {
        (Some(payload), None) => Ok(UpstreamEnvelope::Success(payload)),
        (None, Some(error)) => {
            let body: ErrorBody =
                serde_json::from_value(error).map_err(EnvelopeError::MalformedError)?;
            Ok(UpstreamEnvelope::Failure(body.messages))
        }
        (Some(_), Some(_)) => Err(EnvelopeError::Ambiguous),
        (None, None) => Err(EnvelopeError::Missing),
    }
}

/// Messages from a failure body; empty when the body carries none
pub fn error_messages(bytes: &[u8]) -> Vec<String> {
    match decode(bytes) {
        Ok(UpstreamEnvelope::Failure(messages)) => messages,
        _ => Vec::new(),
    }
}
