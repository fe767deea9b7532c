//! Fallback and panic handlers

use crate::error::{error_page, not_found_page, GENERIC_ERROR_MESSAGE};
use axum::{http::StatusCode, response::Response};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;
use tracing::error;

thread_local! {
    /// Location and backtrace of the last panic raised on this thread
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

pub async fn not_found() -> Response {
    not_found_page()
}

/// Record where a panic happened so [`handle_panic`] can log it
///
/// The payload alone does not say where a handler failed. The previous hook still runs.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string());
            let report = format!("at {}\n{}", location, Backtrace::force_capture());
            LAST_PANIC.with(|last| *last.borrow_mut() = Some(report));
            previous(info);
        }));
    });
}

fn take_panic_report() -> Option<String> {
    LAST_PANIC.with(|last| last.borrow_mut().take())
}

/// Turn a handler panic into the generic error page
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    let report = take_panic_report().unwrap_or_else(|| "no panic report recorded".to_string());
    error!(panic = %detail, report = %report, "Handler panicked");

    error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        GENERIC_ERROR_MESSAGE,
        Vec::new(),
    )
}
