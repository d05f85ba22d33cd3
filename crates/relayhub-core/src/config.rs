//! Configuration resolution for the `RelayHub` agent receiver.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (`--config` or ~/.config/relayhub/receiver.json)
//! 3. Environment variables (`RELAYHUB_*`)
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// What happens to tasks of relays that were removed from the site.
///
/// Only `Indefinite` exists today: task history is append-only and is never
/// garbage-collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskRetention {
    #[default]
    Indefinite,
}

/// Complete agent receiver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Address the HTTP surface listens on.
    pub listen_addr: SocketAddr,
    /// `SQLite` database holding relays, tasks and certificate metadata.
    pub database_path: Option<PathBuf>,
    /// Directory with rendered relay configuration snapshots.
    pub config_root: PathBuf,
    /// Unix socket of the monitoring core that receives relay data.
    pub raw_data_socket: PathBuf,
    /// Remote (non-primary) sites must not register relays.
    pub is_remote_site: bool,
    /// REST base URL of the site that owns the authoritative relay list.
    pub site_url: String,
    /// Directory holding `ca.pem` and `ca-key.pem`.
    pub ca_dir: Option<PathBuf>,
    pub task_retention: TaskRetention,
    pub log_json: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8005)),
            database_path: None,
            config_root: PathBuf::from("var/relayhub/relay_config"),
            raw_data_socket: PathBuf::from("tmp/run/raw-data"),
            is_remote_site: false,
            site_url: "http://localhost/site/api/1.0".to_string(),
            ca_dir: None,
            task_retention: TaskRetention::Indefinite,
            log_json: false,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// An explicitly given `config_file` must exist; the global default file is
/// optional.
pub fn load_config(config_file: Option<&Path>) -> Result<ReceiverConfig> {
    let mut config = match config_file {
        Some(path) => load_config_file(path)?,
        None => match global_config_path() {
            Some(path) if path.exists() => load_config_file(&path)?,
            _ => ReceiverConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Directory under which `RelayHub` keeps its per-user state.
fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("relayhub"))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("receiver.json"))
}

/// Get the default database path for the receiver.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("receiver.db"))
}

/// Get the default CA directory for the receiver.
pub fn ca_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("ca"))
}

fn load_config_file(path: &Path) -> Result<ReceiverConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(
    config: &mut ReceiverConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("RELAYHUB_LISTEN_ADDR") {
        config.listen_addr = val
            .parse()
            .map_err(|e| Error::Config(format!("RELAYHUB_LISTEN_ADDR={val}: {e}")))?;
    }
    if let Some(val) = lookup("RELAYHUB_DATABASE_PATH") {
        config.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("RELAYHUB_CONFIG_ROOT") {
        config.config_root = PathBuf::from(val);
    }
    if let Some(val) = lookup("RELAYHUB_RAW_DATA_SOCKET") {
        config.raw_data_socket = PathBuf::from(val);
    }
    if let Some(val) = lookup("RELAYHUB_IS_REMOTE_SITE") {
        config.is_remote_site = matches!(val.as_str(), "1" | "true" | "yes");
    }
    if let Some(val) = lookup("RELAYHUB_SITE_URL") {
        config.site_url = val;
    }
    if let Some(val) = lookup("RELAYHUB_CA_DIR") {
        config.ca_dir = Some(PathBuf::from(val));
    }
    Ok(())
}
