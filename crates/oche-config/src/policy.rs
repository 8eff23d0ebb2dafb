//! Validated configuration structures

use crate::schema::{RawConfig, RawGameMode, RawMatchGeneration, RawPlayer, RawServiceConfig};
use oche_util::{default_data_dir, default_socket_path, Cents};
use serde_json::json;
use std::path::PathBuf;

/// Cost charged per attendee when neither the request nor the config sets one
pub const DEFAULT_COST_PER_ATTENDEE: Cents = Cents::from_units(5);

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub service: ServiceConfig,
    pub training: TrainingSettings,
    pub players: Vec<PlayerSeed>,
    pub game_modes: Vec<GameModeSeed>,
}

impl TrainingConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let game_modes = match raw.game_modes {
            Some(modes) => modes.into_iter().map(GameModeSeed::from_raw).collect(),
            None => default_game_modes(),
        };

        Self {
            service: ServiceConfig::from_raw(raw.service),
            training: TrainingSettings {
                default_cost_per_attendee: raw
                    .training
                    .default_cost_per_attendee
                    .unwrap_or(DEFAULT_COST_PER_ATTENDEE),
                match_generation: raw
                    .training
                    .match_generation
                    .map(MatchGenerationPolicy::from)
                    .unwrap_or_default(),
            },
            players: raw.players.into_iter().map(PlayerSeed::from_raw).collect(),
            game_modes,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            training: TrainingSettings::default(),
            players: Vec::new(),
            game_modes: default_game_modes(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            data_dir: default_data_dir(),
        }
    }
}

/// Knobs the training engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingSettings {
    pub default_cost_per_attendee: Cents,
    pub match_generation: MatchGenerationPolicy,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            default_cost_per_attendee: DEFAULT_COST_PER_ATTENDEE,
            match_generation: MatchGenerationPolicy::default(),
        }
    }
}

/// Behavior of round-robin generation for a session that already has matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchGenerationPolicy {
    /// Refuse with a conflict
    #[default]
    RejectExisting,
    /// Add another full round robin next to the existing matches
    Append,
}

impl From<RawMatchGeneration> for MatchGenerationPolicy {
    fn from(raw: RawMatchGeneration) -> Self {
        match raw {
            RawMatchGeneration::RejectExisting => MatchGenerationPolicy::RejectExisting,
            RawMatchGeneration::Append => MatchGenerationPolicy::Append,
        }
    }
}

/// Player to upsert into the directory at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSeed {
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
}

impl PlayerSeed {
    fn from_raw(raw: RawPlayer) -> Self {
        Self {
            name: raw.name.trim().to_string(),
            email: raw.email.trim().to_string(),
            nickname: raw
                .nickname
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        }
    }
}

/// Game mode to upsert into the catalog at startup
#[derive(Debug, Clone, PartialEq)]
pub struct GameModeSeed {
    pub name: String,
    pub description: Option<String>,
    pub rules: serde_json::Value,
    pub is_active: bool,
}

impl GameModeSeed {
    fn from_raw(raw: RawGameMode) -> Self {
        Self {
            name: raw.name.trim().to_string(),
            description: raw.description,
            rules: raw.rules.unwrap_or_else(|| json!({})),
            is_active: raw.active,
        }
    }
}

/// The built-in catalog
pub fn default_game_modes() -> Vec<GameModeSeed> {
    vec![
        GameModeSeed {
            name: "501 Double Out".into(),
            description: Some("Classic 501 game, must finish on a double".into()),
            rules: json!({ "starting_score": 501, "finish": "double", "legs": 3 }),
            is_active: true,
        },
        GameModeSeed {
            name: "Cricket".into(),
            description: Some("Standard cricket game with numbers 20-15 and bull".into()),
            rules: json!({ "numbers": [20, 19, 18, 17, 16, 15, 25], "type": "standard" }),
            is_active: true,
        },
        GameModeSeed {
            name: "Around the Clock".into(),
            description: Some("Hit numbers 1-20 in sequence, then bull".into()),
            rules: json!({ "sequence": true, "numbers": 20, "bull": true }),
            is_active: true,
        },
    ]
}
