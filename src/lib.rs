//! Skittles
//!
//! Client library for the Foursquare v2 REST API

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// Re-export common types
pub use config::{configure, options, reset, Configuration};
pub use models::Payload;
pub use services::{client, Client, HttpMethod, RequestDescriptor, Transport, NO_PARAMS};
pub use utils::error::{ApiError, ApiErrorKind, DecodeError, Error, Result, TransportError};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version information
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}
