//! OAuth2 Types
//!
//! Value types for tokens, token endpoint responses and server configuration.

pub mod config;
pub mod response;
pub mod token;

pub use config::*;
pub use response::*;
pub use token::*;
