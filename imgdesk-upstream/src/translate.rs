//! Translation of raw upstream results into typed operation results
//!
//! Pure functions only: decoding a payload into the operation's type, and mapping a result
//! to the local HTTP status and the messages shown to the user.

use crate::RawResult;
use imgdesk_core::{OperationFailure, OperationResult};
use serde::de::DeserializeOwned;

/// Decode the payload of a raw result into the operation's payload type
///
/// A payload that does not fit `T` is a protocol violation, not a user error.
pub fn translate<T: DeserializeOwned>(raw: RawResult) -> OperationResult<T> {
    let payload = raw?;
    serde_json::from_value(payload).map_err(|e| {
        OperationFailure::unreachable(format!("unexpected response payload: {}", e))
    })
}

/// Local HTTP status for a failure
pub fn failure_status(failure: &OperationFailure) -> u16 {
    match failure {
        OperationFailure::AuthRequired => 303,
        OperationFailure::AuthFailed { .. } => 401,
        OperationFailure::ValidationFailed { .. } => 400,
        OperationFailure::NotFound => 404,
        OperationFailure::UpstreamUnreachable { .. } => 504,
    }
}

/// Local HTTP status for an operation result
pub fn http_status<T>(result: &OperationResult<T>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(failure) => failure_status(failure),
    }
}

/// User-visible messages for an operation result
pub fn messages<T>(result: &OperationResult<T>) -> Vec<String> {
    match result {
        Ok(_) => Vec::new(),
        Err(failure) => failure.messages().to_vec(),
    }
}
