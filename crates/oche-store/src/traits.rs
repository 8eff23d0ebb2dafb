//! Store trait definitions

use chrono::{DateTime, Local};
use oche_api::{Attendee, GameMode, Match, Player, TrainingSession};
use oche_util::{AttendeeId, GameModeId, MatchId, PlayerId, SessionId};

use crate::{AuditEvent, StoreResult};

/// What a cascade delete removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub matches_removed: usize,
    pub attendees_removed: usize,
}

/// Main store trait
///
/// Every multi-row write is atomic: it either lands completely or leaves
/// no trace.
pub trait Store: Send + Sync {
    // Directory

    fn list_players(&self) -> StoreResult<Vec<Player>>;

    fn get_player(&self, id: &PlayerId) -> StoreResult<Option<Player>>;

    fn get_player_by_email(&self, email: &str) -> StoreResult<Option<Player>>;

    fn insert_player(&self, player: &Player) -> StoreResult<()>;

    /// Insert or refresh a player keyed by email; returns the stored row
    fn upsert_player(
        &self,
        name: &str,
        email: &str,
        nickname: Option<&str>,
    ) -> StoreResult<Player>;

    // Game modes

    fn list_game_modes(&self, active_only: bool) -> StoreResult<Vec<GameMode>>;

    fn get_game_mode(&self, id: &GameModeId) -> StoreResult<Option<GameMode>>;

    /// Insert or refresh a game mode keyed by name; returns the stored row
    fn upsert_game_mode(
        &self,
        name: &str,
        description: Option<&str>,
        rules: &serde_json::Value,
        is_active: bool,
    ) -> StoreResult<GameMode>;

    // Sessions

    /// Insert a session together with its initial roster
    fn create_session_with_roster(
        &self,
        session: &TrainingSession,
        roster: &[Attendee],
    ) -> StoreResult<()>;

    /// Get a session unless it was deleted
    fn get_session(&self, id: &SessionId) -> StoreResult<Option<TrainingSession>>;

    /// All live sessions, latest scheduled first
    fn list_sessions(&self) -> StoreResult<Vec<TrainingSession>>;

    /// Overwrite the mutable fields of a session
    fn update_session(&self, session: &TrainingSession) -> StoreResult<()>;

    /// Remove matches, then roster, then mark the session deleted
    fn delete_session_cascade(
        &self,
        id: &SessionId,
        deleted_at: DateTime<Local>,
    ) -> StoreResult<CascadeSummary>;

    // Roster

    fn insert_attendee(&self, attendee: &Attendee) -> StoreResult<()>;

    fn get_attendee(&self, id: &AttendeeId) -> StoreResult<Option<Attendee>>;

    /// Roster in insertion order
    fn list_attendees(&self, session_id: &SessionId) -> StoreResult<Vec<Attendee>>;

    fn set_attended(&self, id: &AttendeeId, attended: bool) -> StoreResult<()>;

    fn delete_attendee(&self, id: &AttendeeId) -> StoreResult<()>;

    // Matches

    /// Insert a batch of matches for one session.
    ///
    /// With `reject_existing`, fails with `StoreError::Conflict` when the
    /// session already has matches; the check and the inserts share one
    /// transaction.
    fn insert_matches(
        &self,
        session_id: &SessionId,
        matches: &[Match],
        reject_existing: bool,
    ) -> StoreResult<()>;

    fn get_match(&self, id: &MatchId) -> StoreResult<Option<Match>>;

    /// Matches of a session in creation order
    fn list_matches(&self, session_id: &SessionId) -> StoreResult<Vec<Match>>;

    fn update_match(&self, m: &Match) -> StoreResult<()>;

    fn delete_match(&self, id: &MatchId) -> StoreResult<()>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}
