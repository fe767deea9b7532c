//! HTTP request handlers for the web console
//!
//! This module contains all the HTTP request handlers organized by functionality.

pub mod auth;
pub mod errors;
pub mod health;
pub mod images;

pub use auth::*;
pub use errors::*;
pub use health::*;
pub use images::*;
