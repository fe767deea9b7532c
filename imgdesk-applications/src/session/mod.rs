//! Session Store - per-browser session state keyed by an opaque identifier
//!
//! Stores are injected into request handlers; nothing reads a session implicitly.

mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;
use imgdesk_core::{ImgdeskResult, Session};
use std::time::Duration;

/// Generate a new random session identifier
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether `id` looks like an identifier this crate generated
pub fn is_valid_session_id(id: &str) -> bool {
    uuid::Uuid::parse_str(id).is_ok()
}

/// Storage for sessions
///
/// Each session is visible only under its own identifier.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, marking it as recently used
    async fn load(&self, id: &str) -> ImgdeskResult<Option<Session>>;

    /// Insert or replace a session
    async fn save(&self, id: &str, session: Session) -> ImgdeskResult<()>;

    /// Forget a session
    async fn remove(&self, id: &str) -> ImgdeskResult<()>;

    /// Drop sessions unused for longer than `max_idle`; returns how many were dropped
    async fn purge_idle(&self, max_idle: Duration) -> ImgdeskResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_distinct() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert!(is_valid_session_id(&a));
        assert_ne!(a, b);
        assert!(!is_valid_session_id("../etc/passwd"));
    }
}
