//! Cost allocation

use oche_api::{Attendee, CostReport, Match, PlayerCost, TrainingSession};
use oche_util::{Cents, OcheError, PlayerId, Result, SessionId};
use std::collections::HashMap;

use crate::TrainingEngine;

/// Charge the session rate to every attending roster entry that played at
/// least one started or finished match. Absent entries are left out.
///
/// Fails with `Internal` if the total does not fit in an `i64` of cents.
pub fn allocate_costs<F>(
    session: &TrainingSession,
    attendees: &[Attendee],
    matches: &[Match],
    player_name: F,
) -> Result<CostReport>
where
    F: Fn(&PlayerId) -> Option<String>,
{
    let player_costs: Vec<PlayerCost> = attendees
        .iter()
        .filter(|a| a.attended)
        .map(|attendee| {
            let played = matches
                .iter()
                .filter(|m| m.status.counts_as_played() && m.involves(&attendee.participant))
                .count();
            let total_cost = if played == 0 {
                Cents::ZERO
            } else {
                session.cost_per_attendee
            };

            PlayerCost {
                attendee_id: attendee.id,
                participant: attendee.participant.clone(),
                player_name: attendee.participant.player_id().and_then(|id| player_name(&id)),
                total_cost,
                matches_played: u32::try_from(played).unwrap_or(u32::MAX),
            }
        })
        .collect();

    let total_collected = player_costs
        .iter()
        .try_fold(Cents::ZERO, |acc, c| acc.checked_add(c.total_cost))
        .ok_or_else(|| {
            OcheError::internal(format!(
                "total cost of session {} overflows",
                session.id
            ))
        })?;

    Ok(CostReport {
        session_id: session.id,
        total_collected,
        player_costs,
    })
}

impl TrainingEngine {
    pub fn compute_costs(&self, session_id: &SessionId) -> Result<CostReport> {
        let session = self.require_session(session_id)?;
        let attendees = self.store.list_attendees(session_id)?;
        let matches = self.store.list_matches(session_id)?;
        let names: HashMap<PlayerId, String> = self
            .store
            .list_players()?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        allocate_costs(&session, &attendees, &matches, |id| names.get(id).cloned())
    }
}
