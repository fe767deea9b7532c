//! Error types for the web console and their HTML rendering

use crate::templates::{ErrorTemplate, NotFoundTemplate};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use imgdesk_core::{ImgdeskError, OperationFailure};
use imgdesk_upstream::{failure_status, UpstreamError};
use tracing::{error, warn};

/// Error types for the web console
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error(transparent)]
    Operation(#[from] OperationFailure),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Core(#[from] ImgdeskError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Invalid or missing CSRF token")]
    Csrf,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Message shown for every fault the user cannot act on
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Operation(failure) => failure_response(failure),
            WebError::Csrf => {
                warn!("Rejected form with invalid CSRF token");
                error_page(
                    StatusCode::FORBIDDEN,
                    "This form has expired. Reload the page and try again.",
                    Vec::new(),
                )
            }
            WebError::BadRequest(message) => {
                error_page(StatusCode::BAD_REQUEST, &message, Vec::new())
            }
            other => {
                error!(error = ?other, "Request failed");
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_ERROR_MESSAGE,
                    Vec::new(),
                )
            }
        }
    }
}

fn failure_response(failure: OperationFailure) -> Response {
    let status =
        StatusCode::from_u16(failure_status(&failure)).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match failure {
        OperationFailure::AuthRequired => Redirect::to("/login").into_response(),
        OperationFailure::NotFound => not_found_page(),
        OperationFailure::UpstreamUnreachable { reason } => {
            warn!(reason = %reason, "Upstream unreachable");
            error_page(
                status,
                "The image service is not responding. Please try again later.",
                Vec::new(),
            )
        }
        OperationFailure::AuthFailed { messages } => {
            error_page(status, "Sign-in was rejected.", messages)
        }
        OperationFailure::ValidationFailed { messages } => {
            error_page(status, "The request was rejected.", messages)
        }
    }
}

/// Render the generic error page; falls back to plain text when rendering itself fails
pub fn error_page(status: StatusCode, message: &str, errors: Vec<String>) -> Response {
    let template = ErrorTemplate::new(status.as_u16(), message.to_string(), errors);
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render error page");
            (status, message.to_string()).into_response()
        }
    }
}

pub fn not_found_page() -> Response {
    match NotFoundTemplate::new().render() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render not found page");
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}
