//! Read-side bracket projection with a synthesized preview round.
//!
//! Every read path goes through [`BracketProjector::project`], so the
//! prediction of the next round has exactly one implementation.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    advancement::{Advancement, AdvancementResolver, RoundName},
    builder::RoundBuilder,
    errors::{BracketError, BracketResult},
    models::{
        Match, MatchId, MatchSpec, MatchStatus, ParticipantId, Round, RoundId, Slot, TournamentId,
    },
};

/// Overall bracket progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketStatus {
    NotStarted,
    InProgress,
    Finished,
}

/// Display view of one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    /// `None` for preview matches
    pub id: Option<MatchId>,
    pub position: u32,
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub status: MatchStatus,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub winner: Option<ParticipantId>,
    pub bye: bool,
}

impl From<&Match> for MatchView {
    fn from(m: &Match) -> Self {
        Self {
            id: Some(m.id),
            position: m.position,
            slot_a: m.slot_a,
            slot_b: m.slot_b,
            status: m.status,
            score_a: m.score_a,
            score_b: m.score_b,
            winner: m.winner,
            bye: m.is_bye(),
        }
    }
}

impl From<&MatchSpec> for MatchView {
    fn from(spec: &MatchSpec) -> Self {
        Self {
            id: None,
            position: spec.position,
            slot_a: spec.slot_a,
            slot_b: spec.slot_b,
            status: spec.status,
            score_a: None,
            score_b: None,
            winner: spec.winner,
            bye: spec.is_bye(),
        }
    }
}

/// Display view of one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    /// `None` for the preview round
    pub id: Option<RoundId>,
    pub sequence: u32,
    pub name: String,
    /// Predicted round that has not been created yet
    pub preview: bool,
    pub matches: Vec<MatchView>,
}

/// Display-ready bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub status: BracketStatus,
    pub champion: Option<ParticipantId>,
    /// Ascending by sequence; a preview round, if any, is last
    pub rounds: Vec<RoundView>,
}

impl BracketView {
    /// The synthesized round, if one was predicted
    pub fn preview(&self) -> Option<&RoundView> {
        self.rounds.last().filter(|r| r.preview)
    }

    /// Rounds that exist in the store
    pub fn persisted_rounds(&self) -> impl Iterator<Item = &RoundView> {
        self.rounds.iter().filter(|r| !r.preview)
    }

    /// Rounds for "latest first" displays
    pub fn latest_first(&self) -> impl Iterator<Item = &RoundView> {
        self.rounds.iter().rev()
    }
}

/// Bracket projector
pub struct BracketProjector;

impl BracketProjector {
    /// Build the display bracket from persisted rounds and their matches
    ///
    /// A preview round is appended only when every match of the last round is
    /// completed (or a bye) and more than one participant remains.
    pub fn project(
        tournament_id: TournamentId,
        rounds: &[(Round, Vec<Match>)],
    ) -> BracketResult<BracketView> {
        let mut ordered: Vec<&(Round, Vec<Match>)> = rounds.iter().collect();
        ordered.sort_by_key(|(round, _)| round.sequence);

        let mut views: Vec<RoundView> = ordered
            .iter()
            .map(|(round, matches)| Self::round_view(round, matches))
            .collect();

        let Some((last, last_matches)) = ordered.last() else {
            return Ok(BracketView {
                tournament_id,
                status: BracketStatus::NotStarted,
                champion: None,
                rounds: views,
            });
        };

        let (status, champion) = match AdvancementResolver::resolve(last, last_matches) {
            Ok(Advancement::Finished { champion }) => (BracketStatus::Finished, Some(champion)),
            Ok(Advancement::NextRound {
                sequence, winners, ..
            }) => {
                let plan = RoundBuilder::plan_from_winners(sequence, &winners)?;
                debug!(
                    "Tournament {}: previewing round {} with {} matches",
                    tournament_id,
                    sequence,
                    plan.matches.len()
                );
                views.push(RoundView {
                    id: None,
                    sequence: plan.sequence,
                    name: plan.name.to_string(),
                    preview: true,
                    matches: plan.matches.iter().map(MatchView::from).collect(),
                });
                (BracketStatus::InProgress, None)
            }
            Err(BracketError::RoundIncomplete { .. }) => (BracketStatus::InProgress, None),
            Err(e) => return Err(e),
        };

        Ok(BracketView {
            tournament_id,
            status,
            champion,
            rounds: views,
        })
    }

    fn round_view(round: &Round, matches: &[Match]) -> RoundView {
        let mut matches: Vec<MatchView> = matches.iter().map(MatchView::from).collect();
        matches.sort_by_key(|m| m.position);

        RoundView {
            id: Some(round.id),
            sequence: round.sequence,
            // derived from the match count so it cannot drift from the stored name
            name: RoundName::for_round(round.sequence, matches.len()).to_string(),
            preview: false,
            matches,
        }
    }
}
