//! Bracket sizing: capacity and bye count for a participant count.

use serde::{Deserialize, Serialize};

use super::errors::{BracketError, BracketResult};

/// Minimum participants needed to build a bracket
pub const MIN_PARTICIPANTS: usize = 2;

/// Shape of a single-elimination bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSize {
    /// Registered participants
    pub participants: usize,
    /// Smallest power of two >= participants
    pub capacity: usize,
    /// Empty first-round slots
    pub byes: usize,
}

impl BracketSize {
    /// Size a bracket for `participants` entrants
    ///
    /// # Errors
    ///
    /// * `InsufficientParticipants` - fewer than two participants
    /// * `TooManyParticipants` - capacity would overflow `usize`
    pub fn for_participants(participants: usize) -> BracketResult<Self> {
        if participants < MIN_PARTICIPANTS {
            return Err(BracketError::InsufficientParticipants {
                found: participants,
            });
        }

        let capacity = participants
            .checked_next_power_of_two()
            .ok_or(BracketError::TooManyParticipants(participants))?;

        Ok(Self {
            participants,
            capacity,
            byes: capacity - participants,
        })
    }

    /// Matches in the first round
    pub fn first_round_matches(&self) -> usize {
        self.capacity / 2
    }

    /// Rounds needed to reduce the bracket to one winner
    pub fn round_count(&self) -> u32 {
        self.capacity.trailing_zeros()
    }
}
