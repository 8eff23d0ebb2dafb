//! Training engine: directory access and the session lifecycle

use oche_api::{
    Attendee, GameMode, Participant, Player, SessionDetail, SessionStatus, TrainingSession,
};
use oche_config::{GameModeSeed, PlayerSeed, TrainingSettings};
use oche_store::{AuditEvent, AuditEventType, Store};
use oche_util::{AttendeeId, OcheError, PlayerId, Result, SessionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::session::{check_transition, validate_cost, validate_name};
use crate::{CoreEvent, NewSession, SessionUpdate};

/// The training engine.
///
/// Every operation is a synchronous read-modify-write against the store.
/// Callers serialize access (the engine takes `&mut self` for anything that
/// mutates) and collect the resulting events with [`drain_events`].
///
/// [`drain_events`]: TrainingEngine::drain_events
pub struct TrainingEngine {
    pub(crate) store: Arc<dyn Store>,
    settings: TrainingSettings,
    pending_events: Vec<CoreEvent>,
}

impl TrainingEngine {
    pub fn new(store: Arc<dyn Store>, settings: TrainingSettings) -> Self {
        info!(
            default_cost = %settings.default_cost_per_attendee,
            match_generation = ?settings.match_generation,
            "Training engine initialized"
        );

        Self {
            store,
            settings,
            pending_events: Vec::new(),
        }
    }

    pub fn settings(&self) -> &TrainingSettings {
        &self.settings
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    pub(crate) fn emit(&mut self, event: CoreEvent) {
        self.pending_events.push(event);
    }

    pub(crate) fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }

    // Directory

    /// Upsert configured players and game modes
    pub fn seed_directory(
        &mut self,
        players: &[PlayerSeed],
        game_modes: &[GameModeSeed],
    ) -> Result<()> {
        for seed in players {
            let player =
                self.store
                    .upsert_player(&seed.name, &seed.email, seed.nickname.as_deref())?;
            debug!(player_id = %player.id, email = %player.email, "Player seeded");
        }

        for seed in game_modes {
            let mode = self.store.upsert_game_mode(
                &seed.name,
                seed.description.as_deref(),
                &seed.rules,
                seed.is_active,
            )?;
            debug!(game_mode_id = %mode.id, name = %mode.name, "Game mode seeded");
        }

        info!(
            players = players.len(),
            game_modes = game_modes.len(),
            "Directory seeded"
        );
        self.audit(AuditEventType::ConfigLoaded {
            player_count: players.len(),
            game_mode_count: game_modes.len(),
        });
        Ok(())
    }

    pub fn list_players(&self) -> Result<Vec<Player>> {
        Ok(self.store.list_players()?)
    }

    /// Add a player to the directory. Future sessions enroll them.
    pub fn register_player(
        &mut self,
        name: &str,
        email: &str,
        nickname: Option<&str>,
    ) -> Result<Player> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(OcheError::invalid_input("player name is required"));
        }
        if !email.contains('@') {
            return Err(OcheError::invalid_input(format!(
                "'{}' is not an email address",
                email
            )));
        }
        if self.store.get_player_by_email(email)?.is_some() {
            return Err(OcheError::conflict(format!(
                "a player with email {} already exists",
                email
            )));
        }

        let player = Player {
            id: PlayerId::new(),
            name: name.to_string(),
            email: email.to_string(),
            nickname: nickname
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            created_at: oche_util::now(),
        };
        self.store.insert_player(&player)?;

        info!(player_id = %player.id, name = %player.name, "Player registered");
        Ok(player)
    }

    /// Active game modes
    pub fn list_game_modes(&self) -> Result<Vec<GameMode>> {
        Ok(self.store.list_game_modes(true)?)
    }

    pub(crate) fn require_game_mode(&self, id: &oche_util::GameModeId) -> Result<GameMode> {
        self.store
            .get_game_mode(id)?
            .ok_or_else(|| OcheError::not_found("Game mode"))
    }

    // Sessions

    pub(crate) fn require_session(&self, id: &SessionId) -> Result<TrainingSession> {
        self.store
            .get_session(id)?
            .ok_or_else(|| OcheError::not_found("Training session"))
    }

    /// Create a planned session and enroll every known player
    pub fn create_session(&mut self, new: NewSession) -> Result<TrainingSession> {
        let name = validate_name(&new.name)?;
        let cost = validate_cost(
            new.cost_per_attendee
                .unwrap_or(self.settings.default_cost_per_attendee),
        )?;
        if let Some(creator) = &new.created_by
            && self.store.get_player(creator)?.is_none()
        {
            return Err(OcheError::not_found("Player"));
        }

        let players = self.store.list_players()?;
        let now = oche_util::now();
        let session = TrainingSession {
            id: SessionId::new(),
            name,
            description: new.description,
            scheduled_at: new.scheduled_at,
            cost_per_attendee: cost,
            status: SessionStatus::Planned,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        let roster: Vec<Attendee> = players
            .iter()
            .map(|player| Attendee {
                id: AttendeeId::new(),
                session_id: session.id,
                participant: Participant::player(player.id),
                attended: true,
                created_at: now,
            })
            .collect();

        self.store.create_session_with_roster(&session, &roster)?;

        info!(
            session_id = %session.id,
            name = %session.name,
            roster_size = roster.len(),
            cost = %session.cost_per_attendee,
            "Session created"
        );
        self.audit(AuditEventType::SessionCreated {
            session_id: session.id,
            name: session.name.clone(),
            roster_size: roster.len(),
        });
        self.emit(CoreEvent::SessionCreated {
            session_id: session.id,
            name: session.name.clone(),
            roster_size: roster.len(),
        });

        Ok(session)
    }

    /// Session with roster and matches
    pub fn get_session(&self, id: &SessionId) -> Result<SessionDetail> {
        let session = self.require_session(id)?;
        let attendees = self.store.list_attendees(id)?;
        let matches = self.store.list_matches(id)?;
        Ok(SessionDetail {
            session,
            attendees,
            matches,
        })
    }

    pub fn list_sessions(&self) -> Result<Vec<TrainingSession>> {
        Ok(self.store.list_sessions()?)
    }

    /// Partial update. A status change must follow the transition table;
    /// repeating the current status is a no-op.
    pub fn update_session(
        &mut self,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<TrainingSession> {
        let mut session = self.require_session(id)?;

        let status = update
            .status
            .as_deref()
            .map(str::parse::<SessionStatus>)
            .transpose()?;
        let name = update.name.as_deref().map(validate_name).transpose()?;
        let cost = update.cost_per_attendee.map(validate_cost).transpose()?;

        let from = session.status;
        let status_change = status.filter(|to| *to != from);
        if let Some(to) = status_change {
            check_transition(from, to)?;
        }

        if let Some(name) = name {
            session.name = name;
        }
        if let Some(description) = update.description {
            session.description = Some(description);
        }
        if let Some(scheduled_at) = update.scheduled_at {
            session.scheduled_at = scheduled_at;
        }
        if let Some(cost) = cost {
            session.cost_per_attendee = cost;
        }
        if let Some(to) = status_change {
            session.status = to;
        }
        session.updated_at = oche_util::now();

        self.store.update_session(&session)?;
        debug!(session_id = %session.id, "Session updated");

        if let Some(to) = status_change {
            self.record_status_change(&session, from, to, false);
        }
        Ok(session)
    }

    /// Set any status without consulting the transition table
    pub fn force_session_status(
        &mut self,
        id: &SessionId,
        status: &str,
    ) -> Result<TrainingSession> {
        let to: SessionStatus = status.parse()?;
        let mut session = self.require_session(id)?;
        let from = session.status;
        if from == to {
            return Ok(session);
        }

        session.status = to;
        session.updated_at = oche_util::now();
        self.store.update_session(&session)?;

        warn!(session_id = %session.id, %from, %to, "Session status forced");
        self.record_status_change(&session, from, to, true);
        Ok(session)
    }

    /// planned -> active
    pub fn start_session(&mut self, id: &SessionId) -> Result<TrainingSession> {
        self.transition_session(id, SessionStatus::Active)
    }

    /// active -> completed
    pub fn finish_session(&mut self, id: &SessionId) -> Result<TrainingSession> {
        self.transition_session(id, SessionStatus::Completed)
    }

    /// planned | active -> cancelled
    pub fn cancel_session(&mut self, id: &SessionId) -> Result<TrainingSession> {
        self.transition_session(id, SessionStatus::Cancelled)
    }

    fn transition_session(
        &mut self,
        id: &SessionId,
        to: SessionStatus,
    ) -> Result<TrainingSession> {
        let mut session = self.require_session(id)?;
        let from = session.status;
        check_transition(from, to)?;

        session.status = to;
        session.updated_at = oche_util::now();
        self.store.update_session(&session)?;

        self.record_status_change(&session, from, to, false);
        Ok(session)
    }

    fn record_status_change(
        &mut self,
        session: &TrainingSession,
        from: SessionStatus,
        to: SessionStatus,
        forced: bool,
    ) {
        info!(session_id = %session.id, %from, %to, forced, "Session status changed");
        self.audit(AuditEventType::SessionStatusChanged {
            session_id: session.id,
            from,
            to,
            forced,
        });
        self.emit(CoreEvent::SessionStatusChanged {
            session_id: session.id,
            from,
            to,
            forced,
        });
    }

    /// Remove a session that never ran, with its matches and roster
    pub fn delete_session(&mut self, id: &SessionId) -> Result<()> {
        let session = self.require_session(id)?;
        if !session.status.is_deletable() {
            return Err(OcheError::conflict(format!(
                "cannot delete a session that is {}",
                session.status
            )));
        }

        let summary = self
            .store
            .delete_session_cascade(id, oche_util::now())?;

        info!(
            session_id = %id,
            matches_removed = summary.matches_removed,
            attendees_removed = summary.attendees_removed,
            "Session deleted"
        );
        self.audit(AuditEventType::SessionDeleted {
            session_id: *id,
            matches_removed: summary.matches_removed,
            attendees_removed: summary.attendees_removed,
        });
        self.emit(CoreEvent::SessionDeleted { session_id: *id });
        Ok(())
    }
}
