//! Match lifecycle: `scheduled -> ongoing -> completed`.
//!
//! Byes are created already completed and never change afterwards. A normal
//! match may be completed straight from `scheduled` or from `ongoing`; every
//! rejected operation leaves the match untouched.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, MatchId, MatchStatus, ParticipantId, Slot},
};

/// Result of completing a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub match_id: MatchId,
    pub winner: ParticipantId,
    /// Participant to be marked eliminated
    pub loser: ParticipantId,
}

impl Match {
    /// `scheduled -> ongoing`
    pub fn start(&mut self) -> BracketResult<()> {
        if self.is_bye() {
            return Err(BracketError::ByeMatchImmutable(self.id));
        }
        if self.status != MatchStatus::Scheduled {
            return Err(BracketError::InvalidTransition {
                from: self.status,
                to: MatchStatus::Ongoing,
            });
        }

        self.status = MatchStatus::Ongoing;
        debug!("Match {} started", self.id);
        Ok(())
    }

    /// Record final scores; the strictly higher score wins
    ///
    /// # Errors
    ///
    /// * `ByeMatchImmutable` - the match is a bye
    /// * `InvalidTransition` - the match is already completed
    /// * `TiesNotAllowed` - `score_a == score_b`
    pub fn record_result(&mut self, score_a: i32, score_b: i32) -> BracketResult<MatchOutcome> {
        if self.is_bye() {
            return Err(BracketError::ByeMatchImmutable(self.id));
        }
        if self.status == MatchStatus::Completed {
            return Err(BracketError::InvalidTransition {
                from: self.status,
                to: MatchStatus::Completed,
            });
        }
        if score_a == score_b {
            return Err(BracketError::TiesNotAllowed { score: score_a });
        }

        let (winner, loser) = match (self.slot_a, self.slot_b) {
            (Slot::Occupied(a), Slot::Occupied(b)) => {
                if score_a > score_b {
                    (a, b)
                } else {
                    (b, a)
                }
            }
            // builder always fills slot A; an empty one means a corrupt row
            _ => {
                return Err(BracketError::EmptyPairing {
                    position: self.position,
                });
            }
        };

        self.status = MatchStatus::Completed;
        self.score_a = Some(score_a);
        self.score_b = Some(score_b);
        self.winner = Some(winner);

        debug!(
            "Match {} completed {}-{}: {} beat {}",
            self.id, score_a, score_b, winner, loser
        );

        Ok(MatchOutcome {
            match_id: self.id,
            winner,
            loser,
        })
    }
}
