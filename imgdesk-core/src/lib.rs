//! imgdesk Core - shared data model and ambient plumbing
//!
//! Defines the session and credential types, the classified operation outcome, the
//! crate-wide error type, configuration file loading and logging setup.

pub mod config;
pub mod error;
pub mod logging;
pub mod outcome;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use outcome::*;
pub use types::*;

// Re-export commonly used external types
pub use tracing;
