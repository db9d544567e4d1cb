//! Configuration commands.

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use crate::secret;

/// Dumps the configuration as TOML, with secret references left unresolved.
pub fn dump(config: &AppConfig, path: &Path) -> CliResult<bool> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(true)
}

/// Resolves and validates every calendar.
pub fn validate(config: &AppConfig) -> CliResult<bool> {
    let links = config.validate()?;
    for link in &links {
        println!("{} ({}): ok", link.id, link.provider);
    }
    println!("Configuration is valid.");
    Ok(true)
}

/// Shows the configuration file path.
pub fn path(path: &Path) -> CliResult<bool> {
    println!("config: {}", path.display());
    Ok(true)
}

/// Lists configured calendars without resolving secrets.
pub fn calendars(config: &AppConfig) -> CliResult<bool> {
    if config.calendars.is_empty() {
        println!("No calendars configured.");
        return Ok(true);
    }
    for link in &config.calendars {
        let token = if link.access_token.is_empty() {
            "missing"
        } else if secret::is_reference(&link.access_token) {
            "reference"
        } else {
            "inline"
        };
        println!(
            "{}\t{}\tcalendar={}\tpull={}\tpush={}\ttoken={}",
            link.id,
            link.provider,
            link.remote_calendar_id,
            link.pull_enabled,
            link.push_enabled,
            token
        );
    }
    Ok(true)
}
