//! Fixtures shared by the engine tests

use chrono::{DateTime, Local};
use oche_api::{GameMode, Player};
use oche_config::{default_game_modes, PlayerSeed, TrainingSettings};
use oche_store::SqliteStore;
use std::sync::Arc;

use crate::TrainingEngine;

/// Engine over an in-memory store with the given players and the built-in
/// game modes. Players come back in roster order (by name).
pub(crate) fn engine_with_players(names: &[&str]) -> (TrainingEngine, Vec<Player>, GameMode) {
    engine_with_settings(names, TrainingSettings::default())
}

pub(crate) fn engine_with_settings(
    names: &[&str],
    settings: TrainingSettings,
) -> (TrainingEngine, Vec<Player>, GameMode) {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = TrainingEngine::new(store, settings);

    let seeds: Vec<PlayerSeed> = names
        .iter()
        .map(|name| PlayerSeed {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            nickname: None,
        })
        .collect();
    engine
        .seed_directory(&seeds, &default_game_modes())
        .unwrap();
    engine.drain_events();

    let players = engine.list_players().unwrap();
    let mode = engine.list_game_modes().unwrap().remove(0);
    (engine, players, mode)
}

pub(crate) fn scheduled() -> DateTime<Local> {
    oche_util::now() + chrono::Duration::days(1)
}
