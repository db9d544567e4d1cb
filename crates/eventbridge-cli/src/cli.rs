//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// eventbridge - keep local events in sync with external calendars
#[derive(Debug, Parser)]
#[command(name = "eventbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "EVENTBRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Path to the JSON event store
    #[arg(long, env = "EVENTBRIDGE_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull then push one calendar
    Sync {
        /// Configured calendar id
        calendar: String,
    },

    /// Import remote records of one calendar
    Pull { calendar: String },

    /// Export local events of one calendar
    Push { calendar: String },

    /// Sync every configured calendar
    SyncAll,

    /// Sync every calendar periodically until interrupted
    Watch {
        /// Seconds between runs (overrides [scheduler] interval_secs)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// List configured calendars
    Calendars,

    /// Contact operations
    Contact {
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Single-event operations
    Event {
        #[command(subcommand)]
        action: EventAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Single-event actions.
#[derive(Debug, Subcommand)]
pub enum EventAction {
    /// Push a stored event to its calendar again
    Resync {
        /// Local event id
        id: String,
    },

    /// Delete a stored event, then remove it remotely
    Delete { id: String },
}

/// Contact actions.
#[derive(Debug, Subcommand)]
pub enum ContactAction {
    /// Import a calendar's remote contacts into the store, keyed by phone
    Import { calendar: String },

    /// Store a new contact, then create it in the calendar's CRM
    Add {
        /// Configured calendar id
        calendar: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
