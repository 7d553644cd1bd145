//! Bracket error types.

use thiserror::Error;

use super::models::{MatchId, MatchStatus, ParticipantId, RoundId, TournamentId};

/// How a caller should treat a [`BracketError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The operator submitted something that needs correcting (e.g. tied scores)
    UserInput,
    /// The operation is not allowed in the current state
    Rejected,
    /// An engine invariant was violated; a programming error upstream
    Invariant,
    /// A referenced record does not exist
    NotFound,
    /// Storage or configuration failure
    Infrastructure,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Fewer than two eligible participants
    #[error("Insufficient participants: need at least 2, have {found}")]
    InsufficientParticipants { found: usize },

    /// Participant count does not fit in a bracket
    #[error("Too many participants for a single bracket: {0}")]
    TooManyParticipants(usize),

    /// Round builder received an odd number of entrants
    #[error("Odd entrant count: {count}")]
    OddEntrantCount { count: usize },

    /// Round builder received a pairing with no participant on either side
    #[error("Pairing {position} has no participants")]
    EmptyPairing { position: u32 },

    /// Seeding input disagrees with the computed bracket size
    #[error("Seeding mismatch: bracket sized for {expected} participants, got {found}")]
    SeedingMismatch { expected: usize, found: usize },

    /// The same participant was offered for two slots
    #[error("Participant {0} appears more than once in the seeding")]
    DuplicateParticipant(ParticipantId),

    /// Round still has unresolved matches
    #[error("Round {round_id} is incomplete: {pending} match(es) not completed")]
    RoundIncomplete { round_id: RoundId, pending: usize },

    /// Persisted round has no matches
    #[error("Round {0} has no matches")]
    EmptyRound(RoundId),

    /// A round with this sequence is already stored for the tournament
    #[error("Tournament {tournament_id} already has a round {sequence}")]
    DuplicateRound {
        tournament_id: TournamentId,
        sequence: u32,
    },

    /// Completed match without a recorded winner
    #[error("Match {0} is completed but has no winner")]
    MissingWinner(MatchId),

    /// Equal scores submitted for a knockout match
    #[error("Ties are not allowed: both sides scored {score}")]
    TiesNotAllowed { score: i32 },

    /// Attempted to change a bye match
    #[error("Match {0} is a bye and cannot be changed")]
    ByeMatchImmutable(MatchId),

    /// Attempted an illegal status transition
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: MatchStatus, to: MatchStatus },

    /// Tournament has no bracket yet
    #[error("No bracket generated for tournament {0}")]
    BracketNotGenerated(TournamentId),

    /// Tournament already has a bracket; re-seed explicitly to replace it
    #[error("Bracket already exists for tournament {0}")]
    BracketAlreadyExists(TournamentId),

    /// Match not found (or not part of the given tournament)
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Round not found
    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    /// Participant not found
    #[error("Participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BracketError {
    /// Classify the error for the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::TiesNotAllowed { .. } => ErrorKind::UserInput,
            BracketError::InsufficientParticipants { .. }
            | BracketError::TooManyParticipants(_)
            | BracketError::ByeMatchImmutable(_)
            | BracketError::InvalidTransition { .. }
            | BracketError::BracketNotGenerated(_)
            | BracketError::BracketAlreadyExists(_) => ErrorKind::Rejected,
            BracketError::OddEntrantCount { .. }
            | BracketError::EmptyPairing { .. }
            | BracketError::SeedingMismatch { .. }
            | BracketError::DuplicateParticipant(_)
            | BracketError::RoundIncomplete { .. }
            | BracketError::EmptyRound(_)
            | BracketError::DuplicateRound { .. }
            | BracketError::MissingWinner(_) => ErrorKind::Invariant,
            BracketError::MatchNotFound(_)
            | BracketError::RoundNotFound(_)
            | BracketError::ParticipantNotFound(_) => ErrorKind::NotFound,
            BracketError::Configuration(_) | BracketError::Database(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Whether this error signals broken call order or corrupt data
    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::Invariant
    }

    /// Get a client-safe error message
    ///
    /// Database and invariant errors are collapsed so that internal state is
    /// not exposed to whoever submitted the request.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Infrastructure => "Internal server error".to_string(),
            ErrorKind::Invariant => "Bracket is in an inconsistent state".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_is_user_input() {
        let err = BracketError::TiesNotAllowed { score: 2 };
        assert_eq!(err.kind(), ErrorKind::UserInput);
        assert_eq!(err.client_message(), "Ties are not allowed: both sides scored 2");
    }

    #[test]
    fn test_invariant_errors_are_sanitized() {
        let err = BracketError::RoundIncomplete {
            round_id: 7,
            pending: 1,
        };
        assert!(err.is_invariant_violation());
        assert_eq!(err.client_message(), "Bracket is in an inconsistent state");
    }

    #[test]
    fn test_database_errors_are_sanitized() {
        let err = BracketError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = BracketError::InvalidTransition {
            from: MatchStatus::Completed,
            to: MatchStatus::Ongoing,
        };
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert_eq!(err.to_string(), "Invalid transition from completed to ongoing");
    }
}
