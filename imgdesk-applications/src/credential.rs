//! Credential Context
//!
//! Derives the authentication payload for upstream calls from the session.

use imgdesk_core::{CredentialPayload, Session};

/// Payload attached to every upstream call made on behalf of `session`
pub fn build(session: &Session) -> CredentialPayload {
    CredentialPayload {
        api_key: session.api_key.clone(),
    }
}

/// Whether the session must authenticate before calling the upstream
pub fn requires_auth(session: &Session) -> bool {
    session.api_key.is_none()
}
