//! eventbridge CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use eventbridge_cli::cli::{Cli, Command, ConfigAction, ContactAction, EventAction};
use eventbridge_cli::commands;
use eventbridge_cli::config::AppConfig;
use eventbridge_cli::error::CliResult;
use eventbridge_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = match cli.command {
        Command::Watch { .. } => TracingConfig::for_watch(cli.debug, cli.json),
        _ => TracingConfig::from_flags(cli.debug, cli.json),
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<bool> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let store_path = cli.store.as_deref();

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Command::Calendars => commands::config::calendars(&config),
        Command::Sync { calendar } => {
            let service = commands::build_service(&config, store_path)?;
            commands::sync::sync(&service, &calendar).await
        }
        Command::Pull { calendar } => {
            let service = commands::build_service(&config, store_path)?;
            commands::sync::pull(&service, &calendar).await
        }
        Command::Push { calendar } => {
            let service = commands::build_service(&config, store_path)?;
            commands::sync::push(&service, &calendar).await
        }
        Command::SyncAll => {
            let service = commands::build_service(&config, store_path)?;
            commands::sync::sync_all(&service).await
        }
        Command::Watch { interval } => {
            let service = commands::build_service(&config, store_path)?;
            let scheduler = config.scheduler.to_config(interval);
            commands::sync::watch(Arc::new(service), scheduler).await
        }
        Command::Contact { action } => {
            let service = commands::build_service(&config, store_path)?;
            match action {
                ContactAction::Import { calendar } => {
                    commands::contact::import(&service, &calendar).await
                }
                ContactAction::Add {
                    calendar,
                    first_name,
                    last_name,
                    email,
                    phone,
                } => {
                    let fields = commands::contact::NewContact {
                        first_name,
                        last_name,
                        email,
                        phone,
                    };
                    commands::contact::add(&service, &calendar, fields).await
                }
            }
        }
        Command::Event { action } => {
            let service = commands::build_service(&config, store_path)?;
            match action {
                EventAction::Resync { id } => commands::event::resync(&service, &id).await,
                EventAction::Delete { id } => commands::event::delete(&service, &id).await,
            }
        }
    }
}
