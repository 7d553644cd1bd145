//! # Bracket Engine
//!
//! Single-elimination tournament brackets: seeding, byes, match results and
//! round-by-round advancement until a champion remains.
//!
//! The engine is split into pure steps that can be used on their own and a
//! [`BracketManager`] that drives them against pluggable persistence:
//!
//! - **Sizer**: capacity (next power of two) and bye count
//! - **Seeding**: places participants into first-round slots, spreading byes
//! - **Round builder**: pairs slots into matches; byes complete immediately
//! - **Match state machine**: `scheduled -> ongoing -> completed`, no ties
//! - **Advancement**: collects winners and builds the next round
//! - **Projector**: display view with a preview of the next round
//!
//! ## Core Modules
//!
//! - [`bracket`]: Bracket logic, models and the manager
//! - [`db`]: Store and registry traits, PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```
//! use bracket_engine::{BracketSize, RoundBuilder, SeedingAssigner, SeedingPolicy};
//!
//! let size = BracketSize::for_participants(5).unwrap();
//! assert_eq!((size.capacity, size.byes), (8, 3));
//!
//! let slots = SeedingAssigner::new(SeedingPolicy::registration_order())
//!     .assign(&[1, 2, 3, 4, 5], &size)
//!     .unwrap();
//! let round = RoundBuilder::plan(1, &slots).unwrap();
//! assert_eq!(round.matches.len(), 4);
//! assert_eq!(round.bye_count(), 3);
//! ```

/// Bracket logic, models and orchestration.
pub mod bracket;
pub use bracket::{
    AdvanceOutcome, BracketConfig, BracketError, BracketManager, BracketProjector, BracketResult,
    BracketSize, BracketStatus, BracketView, Match, MatchStatus, Participant, Round,
    RoundBuilder, SeedingAssigner, SeedingPolicy, Slot,
};

/// Persistence collaborators.
pub mod db;
pub use db::{BracketStore, InMemoryStore, ParticipantRegistry};
