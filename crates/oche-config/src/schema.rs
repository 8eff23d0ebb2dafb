//! Raw configuration schema (as parsed from TOML)

use oche_util::Cents;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Training defaults
    #[serde(default)]
    pub training: RawTrainingConfig,

    /// Team directory
    #[serde(default)]
    pub players: Vec<RawPlayer>,

    /// Game mode catalog. When omitted the built-in modes are used.
    #[serde(default)]
    pub game_modes: Option<Vec<RawGameMode>>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/oche/oched.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the database
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawTrainingConfig {
    /// Cost charged to each attendee who played, e.g. "5.00"
    pub default_cost_per_attendee: Option<Cents>,

    /// What to do when generating matches for a session that has some
    pub match_generation: Option<RawMatchGeneration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawMatchGeneration {
    RejectExisting,
    Append,
}

/// Directory entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPlayer {
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
}

/// Catalog entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawGameMode {
    pub name: String,
    pub description: Option<String>,

    /// Free-form rules table
    #[serde(default)]
    pub rules: Option<serde_json::Value>,

    /// Inactive modes are kept but not offered
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}
