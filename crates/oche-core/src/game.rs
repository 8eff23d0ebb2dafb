//! Match lifecycle: manual creation, scoring, deletion

use chrono::{DateTime, Local};
use oche_api::{Match, MatchStatus, Participant, ParticipantSlot, SessionStatus, Winner};
use oche_store::AuditEventType;
use oche_util::{GameModeId, MatchId, OcheError, Result, SessionId};
use tracing::info;

use crate::{CoreEvent, TrainingEngine};

/// Partial update of a match. Enumerated fields stay raw strings until
/// they are validated.
#[derive(Debug, Clone, Default)]
pub struct MatchUpdate {
    pub player1_score: Option<i32>,
    pub player2_score: Option<i32>,
    pub status: Option<String>,
    pub winner: Option<String>,
}

/// Apply an update in place.
///
/// Nothing is modified unless every supplied field is valid. When the
/// resulting status is `completed`, the completion time is stamped once and
/// the winner is derived from the scores unless one was supplied.
pub fn apply_match_update(m: &mut Match, update: &MatchUpdate, now: DateTime<Local>) -> Result<()> {
    let status = update
        .status
        .as_deref()
        .map(str::parse::<MatchStatus>)
        .transpose()?;
    let winner = update
        .winner
        .as_deref()
        .map(str::parse::<Winner>)
        .transpose()?;
    for score in [update.player1_score, update.player2_score].into_iter().flatten() {
        if score < 0 {
            return Err(OcheError::invalid_input(format!(
                "scores cannot be negative (got {})",
                score
            )));
        }
    }

    if let Some(score) = update.player1_score {
        m.player1_score = score;
    }
    if let Some(score) = update.player2_score {
        m.player2_score = score;
    }
    if let Some(status) = status {
        m.status = status;
    }
    if winner.is_some() {
        m.winner = winner;
    }

    if m.status == MatchStatus::Completed {
        if m.completed_at.is_none() {
            m.completed_at = Some(now);
        }
        if winner.is_none() {
            m.winner = Some(Winner::from_scores(m.player1_score, m.player2_score));
        }
    }

    Ok(())
}

/// Resolve a client slot. `None` when the slot is empty.
fn resolve_slot(slot: &ParticipantSlot) -> Result<Option<Participant>> {
    let guest = slot.guest_name.as_deref().and_then(Participant::guest);
    match (slot.player_id, guest) {
        (Some(_), Some(_)) => Err(OcheError::invalid_input(
            "a participant is either a player or a guest, not both",
        )),
        (Some(player_id), None) => Ok(Some(Participant::player(player_id))),
        (None, guest) => Ok(guest),
    }
}

impl TrainingEngine {
    fn require_match(&self, id: &MatchId) -> Result<Match> {
        self.store
            .get_match(id)?
            .ok_or_else(|| OcheError::not_found("Match"))
    }

    pub fn get_match(&self, id: &MatchId) -> Result<Match> {
        self.require_match(id)
    }

    /// Matches of a session in creation order
    pub fn list_matches(&self, session_id: &SessionId) -> Result<Vec<Match>> {
        self.require_session(session_id)?;
        Ok(self.store.list_matches(session_id)?)
    }

    /// Create a single pending match in an active session
    pub fn create_match(
        &mut self,
        session_id: &SessionId,
        game_mode_id: &GameModeId,
        player1: &ParticipantSlot,
        player2: &ParticipantSlot,
    ) -> Result<Match> {
        let session = self.require_session(session_id)?;
        if session.status != SessionStatus::Active {
            return Err(OcheError::invalid_state(format!(
                "matches can only be created in active sessions (session is {})",
                session.status
            )));
        }
        self.require_game_mode(game_mode_id)?;

        for (label, slot) in [("Player 1", player1), ("Player 2", player2)] {
            if let Some(player_id) = &slot.player_id
                && self.store.get_player(player_id)?.is_none()
            {
                return Err(OcheError::not_found(label));
            }
        }

        let (player1, player2) = match (resolve_slot(player1)?, resolve_slot(player2)?) {
            (Some(p1), Some(p2)) => (p1, p2),
            _ => {
                return Err(OcheError::invalid_input(
                    "exactly two players are required for each match",
                ));
            }
        };

        let m = Match {
            id: MatchId::new(),
            session_id: *session_id,
            game_mode_id: *game_mode_id,
            player1,
            player2,
            player1_score: 0,
            player2_score: 0,
            status: MatchStatus::Pending,
            winner: None,
            completed_at: None,
            created_at: oche_util::now(),
        };
        self.store
            .insert_matches(session_id, std::slice::from_ref(&m), false)?;

        info!(
            session_id = %session_id,
            match_id = %m.id,
            player1 = %m.player1,
            player2 = %m.player2,
            "Match created"
        );
        self.audit(AuditEventType::MatchCreated {
            session_id: *session_id,
            match_id: m.id,
        });
        self.emit(CoreEvent::MatchChanged {
            session_id: *session_id,
            match_id: m.id,
            status: m.status,
        });

        Ok(m)
    }

    /// Record scores, status, or winner
    pub fn update_match(&mut self, id: &MatchId, update: &MatchUpdate) -> Result<Match> {
        let mut m = self.require_match(id)?;
        apply_match_update(&mut m, update, oche_util::now())?;
        self.store.update_match(&m)?;

        info!(
            match_id = %m.id,
            status = %m.status,
            score = %format!("{}-{}", m.player1_score, m.player2_score),
            winner = ?m.winner,
            "Match updated"
        );
        self.audit(AuditEventType::MatchUpdated {
            match_id: m.id,
            status: m.status,
            player1_score: m.player1_score,
            player2_score: m.player2_score,
        });
        self.emit(CoreEvent::MatchChanged {
            session_id: m.session_id,
            match_id: m.id,
            status: m.status,
        });

        Ok(m)
    }

    /// Delete a match that has not started
    pub fn delete_match(&mut self, id: &MatchId) -> Result<()> {
        let m = self.require_match(id)?;
        if m.status.counts_as_played() {
            return Err(OcheError::conflict(format!(
                "cannot delete a match that is {}",
                m.status
            )));
        }

        self.store.delete_match(id)?;

        info!(session_id = %m.session_id, match_id = %id, "Match deleted");
        self.audit(AuditEventType::MatchDeleted {
            session_id: m.session_id,
            match_id: *id,
        });
        self.emit(CoreEvent::MatchDeleted {
            session_id: m.session_id,
            match_id: *id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine_with_players, scheduled};
    use crate::NewSession;
    use oche_util::{ErrorKind, PlayerId};

    fn pending(p1: Participant, p2: Participant) -> Match {
        Match {
            id: MatchId::new(),
            session_id: SessionId::new(),
            game_mode_id: GameModeId::new(),
            player1: p1,
            player2: p2,
            player1_score: 0,
            player2_score: 0,
            status: MatchStatus::Pending,
            winner: None,
            completed_at: None,
            created_at: oche_util::now(),
        }
    }

    fn guests() -> Match {
        pending(
            Participant::guest("A").unwrap(),
            Participant::guest("B").unwrap(),
        )
    }

    fn completing(p1: i32, p2: i32) -> MatchUpdate {
        MatchUpdate {
            player1_score: Some(p1),
            player2_score: Some(p2),
            status: Some("completed".into()),
            winner: None,
        }
    }

    #[test]
    fn completion_derives_winner() {
        let now = oche_util::now();

        let mut m = guests();
        apply_match_update(&mut m, &completing(10, 5), now).unwrap();
        assert_eq!(m.winner, Some(Winner::Player1));
        assert_eq!(m.completed_at, Some(now));

        let mut m = guests();
        apply_match_update(&mut m, &completing(5, 5), now).unwrap();
        assert_eq!(m.winner, Some(Winner::Draw));

        let mut m = guests();
        apply_match_update(&mut m, &completing(1, 3), now).unwrap();
        assert_eq!(m.winner, Some(Winner::Player2));
    }

    #[test]
    fn explicit_winner_wins_over_scores() {
        let mut m = guests();
        let update = MatchUpdate {
            winner: Some("player2".into()),
            ..completing(10, 5)
        };
        apply_match_update(&mut m, &update, oche_util::now()).unwrap();
        assert_eq!(m.winner, Some(Winner::Player2));
    }

    #[test]
    fn completion_time_is_never_overwritten() {
        let first = oche_util::now();
        let later = first + chrono::Duration::minutes(5);

        let mut m = guests();
        apply_match_update(&mut m, &completing(3, 1), first).unwrap();

        // Score correction on a completed match re-derives the winner
        let fix = MatchUpdate {
            player2_score: Some(4),
            ..Default::default()
        };
        apply_match_update(&mut m, &fix, later).unwrap();
        assert_eq!(m.completed_at, Some(first));
        assert_eq!(m.winner, Some(Winner::Player2));
    }

    #[test]
    fn partial_update_without_completion() {
        let mut m = guests();
        let update = MatchUpdate {
            player1_score: Some(2),
            status: Some("playing".into()),
            ..Default::default()
        };
        apply_match_update(&mut m, &update, oche_util::now()).unwrap();
        assert_eq!(m.player1_score, 2);
        assert_eq!(m.player2_score, 0);
        assert_eq!(m.status, MatchStatus::Playing);
        assert!(m.winner.is_none());
        assert!(m.completed_at.is_none());
    }

    #[test]
    fn invalid_values_leave_match_untouched() {
        let original = guests();

        for update in [
            MatchUpdate {
                player1_score: Some(7),
                status: Some("finished".into()),
                ..Default::default()
            },
            MatchUpdate {
                player1_score: Some(7),
                winner: Some("nobody".into()),
                ..Default::default()
            },
            MatchUpdate {
                player1_score: Some(-1),
                ..Default::default()
            },
        ] {
            let mut m = original.clone();
            let err = apply_match_update(&mut m, &update, oche_util::now()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
            assert_eq!(m, original);
        }
    }

    #[test]
    fn resolve_slots() {
        let id = PlayerId::new();
        assert_eq!(
            resolve_slot(&ParticipantSlot::player(id)).unwrap(),
            Some(Participant::player(id))
        );
        assert_eq!(
            resolve_slot(&ParticipantSlot::guest("Zoe")).unwrap(),
            Participant::guest("Zoe")
        );
        assert_eq!(resolve_slot(&ParticipantSlot::empty()).unwrap(), None);
        assert_eq!(resolve_slot(&ParticipantSlot::guest(" ")).unwrap(), None);

        let both = ParticipantSlot {
            player_id: Some(id),
            guest_name: Some("Zoe".into()),
        };
        assert_eq!(resolve_slot(&both).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn create_match_in_active_session() {
        let (mut engine, players, mode) = engine_with_players(&["Alice", "Bob"]);
        let id = engine
            .create_session(NewSession::new("s", scheduled()))
            .unwrap()
            .id;

        let p1 = ParticipantSlot::player(players[0].id);
        let p2 = ParticipantSlot::guest("Zoe");
        assert_eq!(
            engine
                .create_match(&id, &mode.id, &p1, &p2)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidState
        );

        engine.start_session(&id).unwrap();
        let m = engine.create_match(&id, &mode.id, &p1, &p2).unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
        assert_eq!(m.player1, Participant::player(players[0].id));
        assert_eq!(m.player2.guest_name(), Some("Zoe"));
        assert_eq!(engine.list_matches(&id).unwrap(), vec![m]);
    }

    #[test]
    fn create_match_validates_references_and_slots() {
        let (mut engine, players, mode) = engine_with_players(&["Alice"]);
        let id = engine
            .create_session(NewSession::new("s", scheduled()))
            .unwrap()
            .id;
        engine.start_session(&id).unwrap();
        let alice = ParticipantSlot::player(players[0].id);

        let err = engine
            .create_match(&id, &GameModeId::new(), &alice, &ParticipantSlot::guest("Z"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = engine
            .create_match(&id, &mode.id, &alice, &ParticipantSlot::player(PlayerId::new()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Player 2 not found");

        let err = engine
            .create_match(&id, &mode.id, &alice, &ParticipantSlot::empty())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = engine
            .create_match(&SessionId::new(), &mode.id, &alice, &alice)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert!(engine.list_matches(&id).unwrap().is_empty());
    }

    #[test]
    fn update_match_persists() {
        let (mut engine, _, mode) = engine_with_players(&["Alice", "Bob"]);
        let id = engine
            .create_session(NewSession::new("s", scheduled()))
            .unwrap()
            .id;
        let m = engine.generate_matches(&id, &mode.id).unwrap().remove(0);
        engine.drain_events();

        let updated = engine.update_match(&m.id, &completing(3, 1)).unwrap();
        assert_eq!(updated.winner, Some(Winner::Player1));
        assert_eq!(engine.get_match(&m.id).unwrap(), updated);
        assert!(matches!(
            engine.drain_events().as_slice(),
            [CoreEvent::MatchChanged { status: MatchStatus::Completed, .. }]
        ));

        assert_eq!(
            engine
                .update_match(&MatchId::new(), &MatchUpdate::default())
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn delete_only_unstarted_matches() {
        let (mut engine, _, mode) = engine_with_players(&["Alice", "Bob", "Carol"]);
        let id = engine
            .create_session(NewSession::new("s", scheduled()))
            .unwrap()
            .id;
        let matches = engine.generate_matches(&id, &mode.id).unwrap();

        let playing = MatchUpdate {
            status: Some("playing".into()),
            ..Default::default()
        };
        engine.update_match(&matches[0].id, &playing).unwrap();
        engine.update_match(&matches[1].id, &completing(2, 2)).unwrap();

        assert_eq!(
            engine.delete_match(&matches[0].id).unwrap_err().kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            engine.delete_match(&matches[1].id).unwrap_err().kind(),
            ErrorKind::Conflict
        );
        engine.delete_match(&matches[2].id).unwrap();

        assert_eq!(engine.list_matches(&id).unwrap().len(), 2);
        assert_eq!(
            engine.delete_match(&matches[2].id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
