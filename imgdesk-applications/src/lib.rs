//! imgdesk Applications - the session-authenticated proxy layer
//!
//! This crate sits between the web surface and the upstream client:
//!
//! - **Credential Context** (`credential`): derives the upstream credential from a session
//! - **Session Store** (`session`): per-browser session state keyed by an opaque id
//! - **Proxy Operations** (`operations`): authenticate, logout and the image CRUD verbs
//!
//! Sessions are passed in and out of operations explicitly; nothing here reads ambient state.

pub mod credential;
pub mod operations;
pub mod session;

pub use operations::{image_path, ImageConsole};
pub use session::{generate_session_id, is_valid_session_id, MemorySessionStore, SessionStore};
