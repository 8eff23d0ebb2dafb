//! Audit event types

use chrono::{DateTime, Local};
use oche_api::{MatchStatus, SessionStatus};
use oche_util::{AttendeeId, GameModeId, MatchId, SessionId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Configuration loaded and directory seeded
    ConfigLoaded {
        player_count: usize,
        game_mode_count: usize,
    },

    SessionCreated {
        session_id: SessionId,
        name: String,
        roster_size: usize,
    },

    /// Status change, `forced` when the transition table was bypassed
    SessionStatusChanged {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        forced: bool,
    },

    SessionDeleted {
        session_id: SessionId,
        matches_removed: usize,
        attendees_removed: usize,
    },

    GuestAdded {
        session_id: SessionId,
        attendee_id: AttendeeId,
        guest_name: String,
    },

    AttendeeRemoved {
        session_id: SessionId,
        attendee_id: AttendeeId,
    },

    AttendanceChanged {
        session_id: SessionId,
        attendee_id: AttendeeId,
        attended: bool,
    },

    MatchesGenerated {
        session_id: SessionId,
        game_mode_id: GameModeId,
        count: usize,
    },

    MatchCreated {
        session_id: SessionId,
        match_id: MatchId,
    },

    MatchUpdated {
        match_id: MatchId,
        status: MatchStatus,
        player1_score: i32,
        player2_score: i32,
    },

    MatchDeleted {
        session_id: SessionId,
        match_id: MatchId,
    },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: oche_util::now(),
            event,
        }
    }
}
