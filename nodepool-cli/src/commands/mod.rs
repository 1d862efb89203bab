//! CLI command implementations.

pub mod config;
pub mod logo;
pub mod version;
