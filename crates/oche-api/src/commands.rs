//! Command types for the oche protocol

use chrono::{DateTime, Local};
use oche_util::{AttendeeId, Cents, ClientId, ErrorKind, GameModeId, MatchId, PlayerId, SessionId};
use serde::{Deserialize, Serialize};

use crate::{
    Attendee, CostReport, GameMode, HealthStatus, Match, ParticipantSlot, Player, SessionDetail,
    TrainingSession, API_VERSION,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&oche_util::OcheError> for ErrorInfo {
    fn from(err: &oche_util::OcheError) -> Self {
        ErrorInfo::new(ErrorCode::from(err.kind()), err.to_string())
    }
}

impl From<oche_util::OcheError> for ErrorInfo {
    fn from(err: oche_util::OcheError) -> Self {
        ErrorInfo::from(&err)
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    InvalidState,
    InvalidInput,
    Conflict,
    PermissionDenied,
    RateLimited,
    StoreError,
    InternalError,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCode::NotFound,
            ErrorKind::InvalidState => ErrorCode::InvalidState,
            ErrorKind::InvalidInput => ErrorCode::InvalidInput,
            ErrorKind::Conflict => ErrorCode::Conflict,
            ErrorKind::Store => ErrorCode::StoreError,
            ErrorKind::Internal => ErrorCode::InternalError,
        }
    }
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    // Directory

    /// List known players
    ListPlayers,

    /// Add a player to the directory (admin only)
    RegisterPlayer {
        name: String,
        email: String,
        #[serde(default)]
        nickname: Option<String>,
    },

    /// List active game modes
    ListGameModes,

    // Sessions

    /// List all sessions, newest first
    ListSessions,

    /// Get a session with roster and matches
    GetSession { session_id: SessionId },

    /// Create a session and enroll every known player
    CreateSession {
        name: String,
        #[serde(default)]
        description: Option<String>,
        scheduled_at: DateTime<Local>,
        #[serde(default)]
        cost_per_attendee: Option<Cents>,
        #[serde(default)]
        created_by: Option<PlayerId>,
    },

    /// Partial update; status changes follow the transition table
    UpdateSession {
        session_id: SessionId,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        scheduled_at: Option<DateTime<Local>>,
        #[serde(default)]
        cost_per_attendee: Option<Cents>,
        #[serde(default)]
        status: Option<String>,
    },

    /// Set any status without ordering checks (admin only)
    ForceSessionStatus { session_id: SessionId, status: String },

    StartSession { session_id: SessionId },

    FinishSession { session_id: SessionId },

    CancelSession { session_id: SessionId },

    DeleteSession { session_id: SessionId },

    // Roster

    AddGuest {
        session_id: SessionId,
        #[serde(default)]
        guest_name: Option<String>,
    },

    RemoveAttendee { attendee_id: AttendeeId },

    SetAttendance { attendee_id: AttendeeId, attended: bool },

    // Matches

    GenerateMatches {
        session_id: SessionId,
        game_mode_id: GameModeId,
    },

    ListMatches { session_id: SessionId },

    CreateMatch {
        session_id: SessionId,
        game_mode_id: GameModeId,
        #[serde(default)]
        player1: ParticipantSlot,
        #[serde(default)]
        player2: ParticipantSlot,
    },

    UpdateMatch {
        match_id: MatchId,
        #[serde(default)]
        player1_score: Option<i32>,
        #[serde(default)]
        player2_score: Option<i32>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        winner: Option<String>,
    },

    DeleteMatch { match_id: MatchId },

    // Costs

    GetCosts { session_id: SessionId },

    // Service

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ResponsePayload {
    Players(Vec<Player>),
    Player(Player),
    GameModes(Vec<GameMode>),
    Sessions(Vec<TrainingSession>),
    Session(Box<SessionDetail>),
    SessionUpdated(TrainingSession),
    SessionDeleted { session_id: SessionId },
    Attendee(Attendee),
    AttendeeRemoved { attendee_id: AttendeeId },
    Matches(Vec<Match>),
    Match(Match),
    MatchDeleted { match_id: MatchId },
    Costs(CostReport),
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: crate::ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: crate::ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
