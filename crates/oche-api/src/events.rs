//! Event types for oched -> client streaming

use chrono::{DateTime, Local};
use oche_util::{AttendeeId, MatchId, SessionId};
use serde::{Deserialize, Serialize};

use crate::{MatchStatus, SessionStatus, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: oche_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A session was created with its seeded roster
    SessionCreated {
        session_id: SessionId,
        name: String,
        roster_size: usize,
    },

    /// A session moved to a new status
    SessionStatusChanged {
        session_id: SessionId,
        from: SessionStatus,
        to: SessionStatus,
        forced: bool,
    },

    /// A session and everything it owned was removed
    SessionDeleted { session_id: SessionId },

    /// A roster entry was added, removed, or changed attendance
    RosterChanged {
        session_id: SessionId,
        attendee_id: AttendeeId,
    },

    /// A full round robin was generated
    MatchesGenerated {
        session_id: SessionId,
        count: usize,
    },

    /// A match was created or updated
    MatchChanged {
        session_id: SessionId,
        match_id: MatchId,
        status: MatchStatus,
    },

    /// A match was deleted
    MatchDeleted {
        session_id: SessionId,
        match_id: MatchId,
    },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::SessionStatusChanged {
            session_id: SessionId::new(),
            from: SessionStatus::Planned,
            to: SessionStatus::Active,
            forced: false,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"session_status_changed\""));
        assert!(json.contains("\"to\":\"active\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(
            parsed.payload,
            EventPayload::SessionStatusChanged { to: SessionStatus::Active, .. }
        ));
    }
}
