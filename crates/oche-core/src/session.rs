//! Session status machine and session inputs

use chrono::{DateTime, Local};
use oche_api::SessionStatus;
use oche_util::{Cents, OcheError, PlayerId, Result, MAX_COST_PER_ATTENDEE};

/// Every legal status edge. Anything else is an invalid state change.
pub const SESSION_TRANSITIONS: [(SessionStatus, SessionStatus); 4] = [
    (SessionStatus::Planned, SessionStatus::Active),
    (SessionStatus::Active, SessionStatus::Completed),
    (SessionStatus::Planned, SessionStatus::Cancelled),
    (SessionStatus::Active, SessionStatus::Cancelled),
];

pub fn is_allowed_transition(from: SessionStatus, to: SessionStatus) -> bool {
    SESSION_TRANSITIONS.contains(&(from, to))
}

/// Validate a status change against the transition table
pub fn check_transition(from: SessionStatus, to: SessionStatus) -> Result<()> {
    if is_allowed_transition(from, to) {
        return Ok(());
    }

    let hint = match to {
        SessionStatus::Active => "only planned sessions can be started",
        SessionStatus::Completed => "only active sessions can be finished",
        SessionStatus::Cancelled => "only planned or active sessions can be cancelled",
        SessionStatus::Planned => "a session cannot return to planned",
    };
    Err(OcheError::invalid_state(format!(
        "cannot move session from {} to {}: {}",
        from, to, hint
    )))
}

/// Input for creating a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub name: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Local>,
    /// Falls back to the configured default
    pub cost_per_attendee: Option<Cents>,
    pub created_by: Option<PlayerId>,
}

impl NewSession {
    pub fn new(name: impl Into<String>, scheduled_at: DateTime<Local>) -> Self {
        Self {
            name: name.into(),
            description: None,
            scheduled_at,
            cost_per_attendee: None,
            created_by: None,
        }
    }

    pub fn with_cost(mut self, cost: Cents) -> Self {
        self.cost_per_attendee = Some(cost);
        self
    }
}

/// Partial update of a session. `status` stays a raw string until the
/// engine validates it.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub scheduled_at: Option<DateTime<Local>>,
    pub cost_per_attendee: Option<Cents>,
    pub status: Option<String>,
}

impl SessionUpdate {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(OcheError::invalid_input("session name is required"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_cost(cost: Cents) -> Result<Cents> {
    if cost.is_negative() {
        return Err(OcheError::invalid_input(format!(
            "cost per attendee must not be negative (got {})",
            cost
        )));
    }
    if cost > MAX_COST_PER_ATTENDEE {
        return Err(OcheError::invalid_input(format!(
            "cost per attendee must not exceed {} (got {})",
            MAX_COST_PER_ATTENDEE, cost
        )));
    }
    Ok(cost)
}
