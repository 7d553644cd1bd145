//! Round builder: turns an ordered entrant list into a round of matches.

use log::debug;

use super::{
    advancement::RoundName,
    errors::{BracketError, BracketResult},
    models::{Match, MatchSpec, MatchStatus, ParticipantId, Round, Slot, TournamentId},
};
use crate::db::BracketStore;

/// A round planned from entrants but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundPlan {
    pub sequence: u32,
    pub name: RoundName,
    pub matches: Vec<MatchSpec>,
}

impl RoundPlan {
    pub fn bye_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_bye()).count()
    }
}

/// Round builder
pub struct RoundBuilder;

impl RoundBuilder {
    /// Pair entrants `(2i, 2i+1)` into matches, in input order
    ///
    /// A pairing with exactly one empty side becomes a completed bye won by
    /// the occupied side, which is moved into slot A. A full pairing becomes a
    /// scheduled match with no scores.
    ///
    /// # Errors
    ///
    /// * `OddEntrantCount` - entrant list has odd length
    /// * `InsufficientParticipants` - fewer than two entrants
    /// * `EmptyPairing` - both sides of a pairing are empty
    pub fn plan(sequence: u32, entrants: &[Slot]) -> BracketResult<RoundPlan> {
        if entrants.len() % 2 != 0 {
            return Err(BracketError::OddEntrantCount {
                count: entrants.len(),
            });
        }
        if entrants.len() < 2 {
            return Err(BracketError::InsufficientParticipants {
                found: entrants.iter().filter(|e| !e.is_empty()).count(),
            });
        }

        let matches = entrants
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| Self::pairing(i as u32, pair[0], pair[1]))
            .collect::<BracketResult<Vec<_>>>()?;

        Ok(RoundPlan {
            sequence,
            name: RoundName::for_round(sequence, matches.len()),
            matches,
        })
    }

    /// Plan the round fed by a previous round's winners
    pub fn plan_from_winners(sequence: u32, winners: &[ParticipantId]) -> BracketResult<RoundPlan> {
        let entrants: Vec<Slot> = winners.iter().copied().map(Slot::Occupied).collect();
        Self::plan(sequence, &entrants)
    }

    fn pairing(position: u32, a: Slot, b: Slot) -> BracketResult<MatchSpec> {
        let spec = match (a, b) {
            (Slot::Occupied(_), Slot::Occupied(_)) => MatchSpec {
                position,
                slot_a: a,
                slot_b: b,
                status: MatchStatus::Scheduled,
                winner: None,
            },
            (Slot::Occupied(id), Slot::Empty) | (Slot::Empty, Slot::Occupied(id)) => MatchSpec {
                position,
                slot_a: Slot::Occupied(id),
                slot_b: Slot::Empty,
                status: MatchStatus::Completed,
                winner: Some(id),
            },
            (Slot::Empty, Slot::Empty) => return Err(BracketError::EmptyPairing { position }),
        };
        Ok(spec)
    }

    /// Persist a planned round and its matches in one store write
    pub async fn persist(
        store: &dyn BracketStore,
        tournament_id: TournamentId,
        plan: &RoundPlan,
    ) -> BracketResult<(Round, Vec<Match>)> {
        let (round, matches) = store
            .create_round_with_matches(
                tournament_id,
                plan.sequence,
                &plan.name.to_string(),
                &plan.matches,
            )
            .await?;

        debug!(
            "Tournament {}: created round {} '{}' with {} matches ({} byes)",
            tournament_id,
            round.sequence,
            round.name,
            matches.len(),
            plan.bye_count()
        );

        Ok((round, matches))
    }
}
