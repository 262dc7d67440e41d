//! Configuration management module
//!
//! Responsible for the connection options, their defaults, and the shared
//! default instance

pub mod settings;

pub use settings::{configure, options, reset, snapshot, Configuration, OptionKey, Options};
