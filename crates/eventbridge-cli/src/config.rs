//! CLI configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/eventbridge/config.toml`:
//!
//! ```toml
//! [store]
//! path = "/var/lib/eventbridge/store.json"
//!
//! [http]
//! timeout_secs = 10
//! detail_delay_ms = 100
//!
//! [scheduler]
//! interval_secs = 900
//!
//! [[calendars]]
//! id = "sales"
//! provider = "crm-meetings"
//! remote_calendar_id = "default"
//! access_token = "env::CRM_TOKEN"
//! ```
//!
//! `access_token` and `session_cookie` accept `pass::` and `env::` secret
//! references, resolved when links are built.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use eventbridge_core::CalendarLink;
use eventbridge_providers::HttpSettings;
use eventbridge_sync::SchedulerConfig;

use crate::error::{CliError, CliResult};
use crate::secret;

/// Top-level `config.toml` contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub http: HttpConfig,
    pub scheduler: SchedulerSettings,
    /// Configured external calendars.
    pub calendars: Vec<CalendarLink>,
}

/// Local event store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// JSON store file; defaults to the data directory.
    pub path: Option<PathBuf>,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Pause between per-record detail fetches.
    pub detail_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            detail_delay_ms: 100,
        }
    }
}

impl HttpConfig {
    pub fn to_settings(&self) -> HttpSettings {
        HttpSettings::default()
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_detail_delay(Duration::from_millis(self.detail_delay_ms))
    }
}

/// Settings for `watch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { interval_secs: 900 }
    }
}

impl SchedulerSettings {
    /// Scheduler config, with `interval` overriding the configured one.
    pub fn to_config(&self, interval: Option<u64>) -> SchedulerConfig {
        let secs = interval.unwrap_or(self.interval_secs).max(1);
        SchedulerConfig::new(Duration::from_secs(secs))
    }
}

impl AppConfig {
    /// Loads from `path`, or from the default location when `None`.
    ///
    /// A missing file at the default location yields the default config; an
    /// explicitly given path must exist.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eventbridge")
    }

    /// The store file: `override_path`, then `[store] path`, then the data dir.
    pub fn store_path(&self, override_path: Option<&Path>) -> PathBuf {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.store.path.clone())
            .unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("eventbridge")
                    .join("store.json")
            })
    }

    /// Links with secret references resolved.
    pub fn resolved_links(&self) -> CliResult<Vec<CalendarLink>> {
        self.calendars.iter().map(resolve_link).collect()
    }

    /// Resolves every link and checks it is usable.
    pub fn validate(&self) -> CliResult<Vec<CalendarLink>> {
        let mut seen = HashSet::new();
        for link in &self.calendars {
            if link.id.trim().is_empty() {
                return Err(CliError::config("calendar with an empty id"));
            }
            if !seen.insert(link.id.as_str()) {
                return Err(CliError::config(format!(
                    "calendar id `{}` is configured twice",
                    link.id
                )));
            }
        }

        let links = self.resolved_links()?;
        for link in &links {
            link.validate()
                .map_err(|e| CliError::config(e.to_string()))?;
        }
        Ok(links)
    }
}

fn resolve_link(link: &CalendarLink) -> CliResult<CalendarLink> {
    let secret_error = |source| CliError::Secret {
        calendar: link.id.clone(),
        source,
    };

    let mut resolved = link.clone();
    resolved.access_token = secret::resolve(&link.access_token).map_err(secret_error)?;
    if let Some(cookie) = &link.session_cookie {
        resolved.session_cookie = Some(secret::resolve(cookie).map_err(secret_error)?);
    }
    Ok(resolved)
}
