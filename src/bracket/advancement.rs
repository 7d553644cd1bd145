//! Advancement: collecting a completed round's winners and naming rounds.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, ParticipantId, Round},
};

/// Display name of a round, derived from how many matches it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundName {
    Final,
    Semifinal,
    Quarterfinal,
    Numbered(u32),
}

impl RoundName {
    /// Name the round at `sequence` containing `match_count` matches
    pub fn for_round(sequence: u32, match_count: usize) -> Self {
        match match_count {
            1 => RoundName::Final,
            2 => RoundName::Semifinal,
            4 => RoundName::Quarterfinal,
            _ => RoundName::Numbered(sequence),
        }
    }
}

impl fmt::Display for RoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundName::Final => write!(f, "Final"),
            RoundName::Semifinal => write!(f, "Semifinal"),
            RoundName::Quarterfinal => write!(f, "Quarterfinal"),
            RoundName::Numbered(n) => write!(f, "Round {n}"),
        }
    }
}

/// What follows a completed round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancement {
    /// One participant left; no further round is built
    Finished { champion: ParticipantId },
    /// Winners to hand to the round builder
    NextRound {
        sequence: u32,
        name: RoundName,
        winners: Vec<ParticipantId>,
    },
}

/// Advancement resolver
pub struct AdvancementResolver;

impl AdvancementResolver {
    /// Winners of `round`, in match order
    ///
    /// # Errors
    ///
    /// * `EmptyRound` - `matches` is empty
    /// * `RoundIncomplete` - any match is not completed
    /// * `MissingWinner` - a completed, non-bye match has no winner
    pub fn winners(round: &Round, matches: &[Match]) -> BracketResult<Vec<ParticipantId>> {
        if matches.is_empty() {
            return Err(BracketError::EmptyRound(round.id));
        }

        let pending = matches.iter().filter(|m| !m.is_completed()).count();
        if pending > 0 {
            return Err(BracketError::RoundIncomplete {
                round_id: round.id,
                pending,
            });
        }

        let mut ordered: Vec<&Match> = matches.iter().collect();
        ordered.sort_by_key(|m| m.position);

        ordered
            .into_iter()
            .map(|m| m.advancing().ok_or(BracketError::MissingWinner(m.id)))
            .collect()
    }

    /// Decide whether `round` finishes the tournament or feeds another round
    pub fn resolve(round: &Round, matches: &[Match]) -> BracketResult<Advancement> {
        let winners = Self::winners(round, matches)?;

        if let [champion] = winners[..] {
            return Ok(Advancement::Finished { champion });
        }

        let sequence = round.sequence + 1;
        Ok(Advancement::NextRound {
            sequence,
            name: RoundName::for_round(sequence, winners.len() / 2),
            winners,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{MatchStatus, Slot};
    use chrono::Utc;

    fn round(sequence: u32) -> Round {
        Round {
            id: 1,
            tournament_id: 1,
            sequence,
            name: String::new(),
            created_at: Utc::now(),
        }
    }

    fn completed(position: u32, a: i64, b: Option<i64>, winner: i64) -> Match {
        Match {
            id: position as i64 + 100,
            round_id: 1,
            position,
            slot_a: Slot::Occupied(a),
            slot_b: Slot::from(b),
            status: MatchStatus::Completed,
            score_a: None,
            score_b: None,
            winner: Some(winner),
        }
    }

    #[test]
    fn test_round_names() {
        assert_eq!(RoundName::for_round(4, 1).to_string(), "Final");
        assert_eq!(RoundName::for_round(3, 2).to_string(), "Semifinal");
        assert_eq!(RoundName::for_round(2, 4).to_string(), "Quarterfinal");
        assert_eq!(RoundName::for_round(1, 8).to_string(), "Round 1");
        assert_eq!(RoundName::for_round(2, 3).to_string(), "Round 2");
    }

    #[test]
    fn test_winners_in_match_order() {
        let matches = vec![
            completed(2, 5, None, 5),
            completed(0, 1, Some(2), 2),
            completed(1, 3, None, 3),
            completed(3, 4, Some(6), 4),
        ];
        let winners = AdvancementResolver::winners(&round(1), &matches).unwrap();
        assert_eq!(winners, vec![2, 3, 5, 4]);
    }

    #[test]
    fn test_next_round_named_from_winner_count() {
        let matches = vec![
            completed(0, 1, Some(2), 1),
            completed(1, 3, Some(4), 4),
            completed(2, 5, Some(6), 5),
            completed(3, 7, Some(8), 8),
        ];
        let advancement = AdvancementResolver::resolve(&round(1), &matches).unwrap();
        assert_eq!(
            advancement,
            Advancement::NextRound {
                sequence: 2,
                name: RoundName::Semifinal,
                winners: vec![1, 4, 5, 8],
            }
        );
    }

    #[test]
    fn test_single_winner_finishes() {
        let matches = vec![completed(0, 1, Some(2), 2)];
        assert_eq!(
            AdvancementResolver::resolve(&round(3), &matches).unwrap(),
            Advancement::Finished { champion: 2 }
        );
    }

    #[test]
    fn test_incomplete_round_is_rejected() {
        let mut open = completed(1, 3, Some(4), 3);
        open.status = MatchStatus::Ongoing;
        open.winner = None;
        let matches = vec![completed(0, 1, Some(2), 1), open];

        assert!(matches!(
            AdvancementResolver::resolve(&round(1), &matches),
            Err(BracketError::RoundIncomplete {
                round_id: 1,
                pending: 1
            })
        ));
    }

    #[test]
    fn test_missing_winner_is_reported() {
        let mut corrupt = completed(0, 1, Some(2), 1);
        corrupt.winner = None;
        assert!(matches!(
            AdvancementResolver::winners(&round(1), &[corrupt]),
            Err(BracketError::MissingWinner(100))
        ));
    }

    #[test]
    fn test_empty_round_is_rejected() {
        assert!(matches!(
            AdvancementResolver::resolve(&round(1), &[]),
            Err(BracketError::EmptyRound(1))
        ));
    }
}
