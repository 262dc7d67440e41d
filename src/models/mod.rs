//! Data models module
//!
//! Defines the response envelope and the decoded payload tree

pub mod envelope;
pub mod payload;

pub use envelope::{decode, Envelope, Meta};
pub use payload::Payload;
