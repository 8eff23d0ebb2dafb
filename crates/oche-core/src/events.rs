//! Core events emitted by the engine

use oche_api::{MatchStatus, SessionStatus};
use oche_util::{AttendeeId, MatchId, SessionId};

/// Events emitted by the training engine after a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    SessionCreated {
        session_id: SessionId,
        name: String,
        roster_size: usize,
    },

    SessionStatusChanged {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        forced: bool,
    },

    SessionDeleted {
        session_id: SessionId,
    },

    /// Guest added, attendee removed, or attendance toggled
    RosterChanged {
        session_id: SessionId,
        attendee_id: AttendeeId,
    },

    MatchesGenerated {
        session_id: SessionId,
        count: usize,
    },

    /// Match created or updated
    MatchChanged {
        session_id: SessionId,
        match_id: MatchId,
        status: MatchStatus,
    },

    MatchDeleted {
        session_id: SessionId,
        match_id: MatchId,
    },
}

impl CoreEvent {
    /// Session the event belongs to
    pub fn session_id(&self) -> SessionId {
        match self {
            CoreEvent::SessionCreated { session_id, .. }
            | CoreEvent::SessionStatusChanged { session_id, .. }
            | CoreEvent::SessionDeleted { session_id }
            | CoreEvent::RosterChanged { session_id, .. }
            | CoreEvent::MatchesGenerated { session_id, .. }
            | CoreEvent::MatchChanged { session_id, .. }
            | CoreEvent::MatchDeleted { session_id, .. } => *session_id,
        }
    }
}
