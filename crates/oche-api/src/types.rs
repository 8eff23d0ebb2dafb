//! Shared domain types for the oche API

use chrono::{DateTime, Local};
use oche_util::{AttendeeId, Cents, GameModeId, MatchId, OcheError, PlayerId, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a training session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        SessionStatus::Planned,
        SessionStatus::Active,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Planned => "planned",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    /// Guests may join while the session has not ended
    pub fn accepts_guests(&self) -> bool {
        matches!(self, SessionStatus::Planned | SessionStatus::Active)
    }

    /// Sessions that ran (or are running) keep their history
    pub fn is_deletable(&self) -> bool {
        !matches!(self, SessionStatus::Active | SessionStatus::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = OcheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OcheError::invalid_input(format!("invalid status: {s}")))
    }
}

/// Lifecycle status of a single match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Playing,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 4] = [
        MatchStatus::Pending,
        MatchStatus::Playing,
        MatchStatus::Completed,
        MatchStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Playing => "playing",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Matches that were started count towards the attendee's cost
    pub fn counts_as_played(&self) -> bool {
        matches!(self, MatchStatus::Playing | MatchStatus::Completed)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = OcheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OcheError::invalid_input(format!("invalid status: {s}")))
    }
}

/// Outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Player1,
    Player2,
    Draw,
}

impl Winner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Player1 => "player1",
            Winner::Player2 => "player2",
            Winner::Draw => "draw",
        }
    }

    /// Derive the winner from the two scores
    pub fn from_scores(player1_score: i32, player2_score: i32) -> Self {
        match player1_score.cmp(&player2_score) {
            std::cmp::Ordering::Greater => Winner::Player1,
            std::cmp::Ordering::Less => Winner::Player2,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Winner {
    type Err = OcheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player1" => Ok(Winner::Player1),
            "player2" => Ok(Winner::Player2),
            "draw" => Ok(Winner::Draw),
            other => Err(OcheError::invalid_input(format!("invalid winner: {other}"))),
        }
    }
}

/// Identity of whoever occupies a roster entry or a match slot.
///
/// Either a known player from the directory or a named guest, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participant {
    Player { player_id: PlayerId },
    Guest { name: String },
}

impl Participant {
    pub fn player(player_id: PlayerId) -> Self {
        Participant::Player { player_id }
    }

    /// Guest with a non-blank display name
    pub fn guest(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Participant::Guest {
                name: trimmed.to_string(),
            })
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Participant::Guest { .. })
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        match self {
            Participant::Player { player_id } => Some(*player_id),
            Participant::Guest { .. } => None,
        }
    }

    pub fn guest_name(&self) -> Option<&str> {
        match self {
            Participant::Player { .. } => None,
            Participant::Guest { name } => Some(name),
        }
    }

    /// Rebuild from the two nullable columns used by storage and the wire
    /// form. Returns `None` when neither or both are set.
    pub fn from_parts(player_id: Option<PlayerId>, guest_name: Option<String>) -> Option<Self> {
        let guest_name = guest_name.filter(|n| !n.trim().is_empty());
        match (player_id, guest_name) {
            (Some(player_id), None) => Some(Participant::player(player_id)),
            (None, Some(name)) => Participant::guest(name),
            _ => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Participant::Player { player_id } => write!(f, "player {}", player_id),
            Participant::Guest { name } => write!(f, "guest '{}'", name),
        }
    }
}

/// Loosely-typed participant as supplied by a client when creating a
/// match by hand. Resolved into a [`Participant`] by the core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSlot {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub guest_name: Option<String>,
}

impl ParticipantSlot {
    pub fn player(player_id: PlayerId) -> Self {
        Self {
            player_id: Some(player_id),
            guest_name: None,
        }
    }

    pub fn guest(name: impl Into<String>) -> Self {
        Self {
            player_id: None,
            guest_name: Some(name.into()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// A known player from the team directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: String,
    pub nickname: Option<String>,
    pub created_at: DateTime<Local>,
}

/// A rule set matches are played under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMode {
    pub id: GameModeId,
    pub name: String,
    pub description: Option<String>,
    /// Free-form rules document
    pub rules: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Local>,
}

/// A scheduled practice event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: SessionId,
    pub name: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Local>,
    pub cost_per_attendee: Cents,
    pub status: SessionStatus,
    pub created_by: Option<PlayerId>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// A roster entry: a regular player or a named guest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub session_id: SessionId,
    pub participant: Participant,
    pub attended: bool,
    pub created_at: DateTime<Local>,
}

impl Attendee {
    pub fn is_guest(&self) -> bool {
        self.participant.is_guest()
    }
}

/// One head-to-head pairing within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub session_id: SessionId,
    pub game_mode_id: GameModeId,
    pub player1: Participant,
    pub player2: Participant,
    pub player1_score: i32,
    pub player2_score: i32,
    pub status: MatchStatus,
    pub winner: Option<Winner>,
    pub completed_at: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
}

impl Match {
    /// Whether the participant occupies either slot
    pub fn involves(&self, participant: &Participant) -> bool {
        &self.player1 == participant || &self.player2 == participant
    }
}

/// A session with its roster and matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: TrainingSession,
    pub attendees: Vec<Attendee>,
    pub matches: Vec<Match>,
}

impl SessionDetail {
    pub fn attendee_count(&self) -> usize {
        self.attendees.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Amount owed by one attending roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCost {
    pub attendee_id: AttendeeId,
    pub participant: Participant,
    /// Directory name for regular players
    pub player_name: Option<String>,
    pub total_cost: Cents,
    pub matches_played: u32,
}

/// Cost breakdown of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostReport {
    pub session_id: SessionId,
    pub player_costs: Vec<PlayerCost>,
    pub total_collected: Cents,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Team member - can run training sessions
    Member,
    /// Local admin - can also override session status
    Admin,
}

impl ClientRole {
    pub fn can_force_status(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }

    pub fn can_manage_directory(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
}
