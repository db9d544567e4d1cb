//! CLI, configuration and the JSON event store.
//!
//! This crate provides the `eventbridge` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;
pub mod store;

pub use cli::Cli;
pub use config::AppConfig;
pub use error::{CliError, CliResult};
pub use store::JsonFileStore;
