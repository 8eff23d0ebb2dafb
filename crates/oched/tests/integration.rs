//! Integration tests for oched
//!
//! These tests drive a training evening end to end through the engine,
//! store and config crates the daemon wires together.

use oche_api::{MatchStatus, Participant, SessionStatus, Winner};
use oche_config::{parse_config, MatchGenerationPolicy};
use oche_core::{CoreEvent, MatchUpdate, NewSession, SessionUpdate, TrainingEngine};
use oche_store::{SqliteStore, Store};
use oche_util::{Cents, ErrorKind};
use std::sync::Arc;

const CONFIG: &str = r#"
config_version = 1

[training]
default_cost_per_attendee = "5.00"

[[players]]
name = "Alice"
email = "alice@example.com"

[[players]]
name = "Bob"
email = "bob@example.com"
nickname = "The Hammer"

[[players]]
name = "Carol"
email = "carol@example.com"
"#;

fn seeded_engine(store: Arc<dyn Store>) -> TrainingEngine {
    let config = parse_config(CONFIG).unwrap();
    let mut engine = TrainingEngine::new(store, config.training.clone());
    engine
        .seed_directory(&config.players, &config.game_modes)
        .unwrap();
    engine.drain_events();
    engine
}

fn tomorrow() -> chrono::DateTime<chrono::Local> {
    oche_util::now() + chrono::Duration::days(1)
}

#[test]
fn test_config_parsing() {
    let config = parse_config(CONFIG).unwrap();
    assert_eq!(config.players.len(), 3);
    assert_eq!(config.training.default_cost_per_attendee, Cents::from_units(5));
    assert_eq!(config.training.match_generation, MatchGenerationPolicy::RejectExisting);
    // No [[game_modes]] table means the built-in catalog
    assert_eq!(config.game_modes.len(), 3);
}

#[test]
fn test_training_evening() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = seeded_engine(store);
    let mode = engine.list_game_modes().unwrap().remove(0);

    let session = engine
        .create_session(NewSession::new("Tuesday practice", tomorrow()).with_cost(Cents::new(500)))
        .unwrap();
    assert_eq!(session.status, SessionStatus::Planned);

    let detail = engine.get_session(&session.id).unwrap();
    assert_eq!(detail.attendee_count(), 3);
    assert!(detail.attendees.iter().all(|a| a.attended && !a.is_guest()));

    let matches = engine.generate_matches(&session.id, &mode.id).unwrap();
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.status == MatchStatus::Pending));

    engine.start_session(&session.id).unwrap();

    // First pairing is the first two roster entries
    let first = &matches[0];
    let done = engine
        .update_match(
            &first.id,
            &MatchUpdate {
                player1_score: Some(3),
                player2_score: Some(1),
                status: Some("completed".into()),
                winner: None,
            },
        )
        .unwrap();
    assert_eq!(done.winner, Some(Winner::Player1));
    assert!(done.completed_at.is_some());

    let report = engine.compute_costs(&session.id).unwrap();
    assert_eq!(report.player_costs.len(), 3);
    let charged: Vec<Cents> = report.player_costs.iter().map(|c| c.total_cost).collect();
    assert_eq!(charged, vec![Cents::new(500), Cents::new(500), Cents::ZERO]);
    assert_eq!(report.total_collected, Cents::new(1000));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total_collected"], "10.00");

    let finished = engine.finish_session(&session.id).unwrap();
    assert_eq!(finished.status, SessionStatus::Completed);

    let events = engine.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CoreEvent::SessionStatusChanged { to: SessionStatus::Completed, .. }
    )));
}

#[test]
fn test_guest_joins_and_pays() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = seeded_engine(store);
    let mode = engine.list_game_modes().unwrap().remove(0);

    let session = engine
        .create_session(NewSession::new("Open night", tomorrow()))
        .unwrap();
    assert_eq!(session.cost_per_attendee, Cents::from_units(5));

    engine.start_session(&session.id).unwrap();
    let guest = engine.add_guest(&session.id, Some("  Dave ")).unwrap();
    assert_eq!(guest.participant, Participant::Guest { name: "Dave".into() });

    let alice = engine.list_players().unwrap().remove(0);
    let m = engine
        .create_match(
            &session.id,
            &mode.id,
            &oche_api::ParticipantSlot::player(alice.id),
            &oche_api::ParticipantSlot::guest("Dave"),
        )
        .unwrap();
    engine
        .update_match(
            &m.id,
            &MatchUpdate {
                status: Some("playing".into()),
                ..Default::default()
            },
        )
        .unwrap();

    let report = engine.compute_costs(&session.id).unwrap();
    let guest_cost = report
        .player_costs
        .iter()
        .find(|c| c.attendee_id == guest.id)
        .unwrap();
    assert_eq!(guest_cost.total_cost, Cents::from_units(5));
    assert_eq!(guest_cost.matches_played, 1);
    assert!(guest_cost.player_name.is_none());
    assert_eq!(report.total_collected, Cents::from_units(10));
}

#[test]
fn test_error_kinds() {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
    let mut engine = seeded_engine(store);
    let mode = engine.list_game_modes().unwrap().remove(0);

    let session = engine
        .create_session(NewSession::new("Errors", tomorrow()))
        .unwrap();

    // Planned sessions cannot be finished
    let err = engine.finish_session(&session.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Unknown status strings are rejected as input
    let err = engine
        .update_session(&session.id, SessionUpdate::status("paused"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Generating twice conflicts under the default policy
    engine.generate_matches(&session.id, &mode.id).unwrap();
    let err = engine.generate_matches(&session.id, &mode.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // Active sessions cannot be deleted
    engine.start_session(&session.id).unwrap();
    let err = engine.delete_session(&session.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = engine.get_session(&oche_util::SessionId::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join(oche_util::DATABASE_FILENAME);

    let session_id = {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let mut engine = seeded_engine(store);
        let session = engine
            .create_session(NewSession::new("Persisted", tomorrow()))
            .unwrap();
        engine.cancel_session(&session.id).unwrap();
        session.id
    };

    // Reseeding on restart must not duplicate the directory
    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    let mut engine = seeded_engine(store);
    assert_eq!(engine.list_players().unwrap().len(), 3);

    let detail = engine.get_session(&session_id).unwrap();
    assert_eq!(detail.session.status, SessionStatus::Cancelled);
    assert_eq!(detail.attendee_count(), 3);

    engine.delete_session(&session_id).unwrap();
    assert!(engine.list_sessions().unwrap().is_empty());
}
