//! Round-robin match generation

use oche_api::{Match, MatchStatus};
use oche_config::MatchGenerationPolicy;
use oche_store::AuditEventType;
use oche_util::{GameModeId, MatchId, OcheError, Result, SessionId};
use tracing::info;

use crate::{CoreEvent, TrainingEngine};

/// Every unordered pair `(items[i], items[j])` with `i < j`, in order.
///
/// `n` items yield `n * (n - 1) / 2` pairs.
pub fn round_robin_pairs<T: Clone>(items: &[T]) -> Vec<(T, T)> {
    let mut pairs = Vec::with_capacity(pair_count(items.len()));
    for (i, first) in items.iter().enumerate() {
        for second in &items[i + 1..] {
            pairs.push((first.clone(), second.clone()));
        }
    }
    pairs
}

pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

impl TrainingEngine {
    /// Create one pending match for every pair of attending roster entries
    pub fn generate_matches(
        &mut self,
        session_id: &SessionId,
        game_mode_id: &GameModeId,
    ) -> Result<Vec<Match>> {
        let session = self.require_session(session_id)?;
        if session.status != oche_api::SessionStatus::Planned {
            return Err(OcheError::invalid_state(format!(
                "matches can only be generated for planned sessions (session is {})",
                session.status
            )));
        }
        self.require_game_mode(game_mode_id)?;

        let attending: Vec<_> = self
            .store
            .list_attendees(session_id)?
            .into_iter()
            .filter(|a| a.attended)
            .map(|a| a.participant)
            .collect();
        if attending.len() < 2 {
            return Err(OcheError::invalid_input(format!(
                "need at least 2 attending players to generate matches (have {})",
                attending.len()
            )));
        }

        let now = oche_util::now();
        let matches: Vec<Match> = round_robin_pairs(&attending)
            .into_iter()
            .map(|(player1, player2)| Match {
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
                created_at: now,
            })
            .collect();

        let reject_existing =
            self.settings().match_generation == MatchGenerationPolicy::RejectExisting;
        self.store
            .insert_matches(session_id, &matches, reject_existing)?;

        info!(
            session_id = %session_id,
            attendees = attending.len(),
            count = matches.len(),
            "Round robin generated"
        );
        self.audit(AuditEventType::MatchesGenerated {
            session_id: *session_id,
            game_mode_id: *game_mode_id,
            count: matches.len(),
        });
        self.emit(CoreEvent::MatchesGenerated {
            session_id: *session_id,
            count: matches.len(),
        });

        Ok(matches)
    }
}
