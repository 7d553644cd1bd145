//! Bracket data models: participants, rounds, matches and slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Tournament ID type
pub type TournamentId = i64;

/// Participant ID type
pub type ParticipantId = i64;

/// Round ID type
pub type RoundId = i64;

/// Match ID type
pub type MatchId = i64;

/// Participant eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    /// Still in the tournament
    Active,
    /// Lost a match
    Eliminated,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Active => "active",
            ParticipantStatus::Eliminated => "eliminated",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ParticipantStatus::Active),
            "eliminated" => Ok(ParticipantStatus::Eliminated),
            other => Err(format!("unknown participant status: {other}")),
        }
    }
}

/// A registered participant (team or player)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant ID
    pub id: ParticipantId,
    /// Tournament the participant is registered for
    pub tournament_id: TournamentId,
    /// Display name
    pub name: String,
    /// Eligibility flag
    pub status: ParticipantStatus,
}

impl Participant {
    /// Create a new, active participant
    pub fn new(id: ParticipantId, tournament_id: TournamentId, name: impl Into<String>) -> Self {
        Self {
            id,
            tournament_id,
            name: name.into(),
            status: ParticipantStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }
}

/// One side of a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "participant")]
pub enum Slot {
    Occupied(ParticipantId),
    Empty,
}

impl Slot {
    pub fn participant(&self) -> Option<ParticipantId> {
        match self {
            Slot::Occupied(id) => Some(*id),
            Slot::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }
}

impl From<Option<ParticipantId>> for Slot {
    fn from(value: Option<ParticipantId>) -> Self {
        value.map_or(Slot::Empty, Slot::Occupied)
    }
}

impl From<ParticipantId> for Slot {
    fn from(value: ParticipantId) -> Self {
        Slot::Occupied(value)
    }
}

/// Match lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Ongoing,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "ongoing" => Ok(MatchStatus::Ongoing),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(format!("unknown match status: {other}")),
        }
    }
}

/// A persisted elimination round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Round ID
    pub id: RoundId,
    /// Owning tournament
    pub tournament_id: TournamentId,
    /// Sequence number (1-indexed)
    pub sequence: u32,
    /// Display name at creation time
    pub name: String,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

/// A persisted match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Match ID
    pub id: MatchId,
    /// Owning round
    pub round_id: RoundId,
    /// Position within the round (0-indexed)
    pub position: u32,
    pub slot_a: Slot,
    /// Empty for a bye
    pub slot_b: Slot,
    pub status: MatchStatus,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub winner: Option<ParticipantId>,
}

impl Match {
    /// A bye has an occupant in slot A and nobody in slot B
    pub fn is_bye(&self) -> bool {
        self.slot_b.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Participant advancing from this match, if decided
    ///
    /// A bye's sole occupant counts as its winner.
    pub fn advancing(&self) -> Option<ParticipantId> {
        if !self.is_completed() {
            return None;
        }
        match self.winner {
            Some(winner) => Some(winner),
            None if self.is_bye() => self.slot_a.participant(),
            None => None,
        }
    }

    /// Snapshot of the mutable fields, for persistence
    pub fn update(&self) -> MatchUpdate {
        MatchUpdate {
            status: self.status,
            score_a: self.score_a,
            score_b: self.score_b,
            winner: self.winner,
        }
    }
}

/// A match planned by the round builder but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub position: u32,
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub status: MatchStatus,
    pub winner: Option<ParticipantId>,
}

impl MatchSpec {
    pub fn is_bye(&self) -> bool {
        self.slot_b.is_empty()
    }

    /// Materialize into a match with the given identity
    pub fn into_match(self, id: MatchId, round_id: RoundId) -> Match {
        Match {
            id,
            round_id,
            position: self.position,
            slot_a: self.slot_a,
            slot_b: self.slot_b,
            status: self.status,
            score_a: None,
            score_b: None,
            winner: self.winner,
        }
    }
}

/// Mutable fields of a match written back by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub status: MatchStatus,
    pub score_a: Option<i32>,
    pub score_b: Option<i32>,
    pub winner: Option<ParticipantId>,
}
