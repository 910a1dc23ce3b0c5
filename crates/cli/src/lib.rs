//! CLI tool for running ring nodes.
//!
//! Provides commands for:
//! - Creating a new ring (first node)
//! - Joining an existing ring via a known member

pub mod commands;
pub mod config;

pub use commands::Command;
pub use config::CliConfig;
