//! Builders
//!
//! Fluent builder for server configuration.

pub mod config;

pub use config::{server_config, ServerConfigurationBuilder};
