//! Single-elimination bracket engine.
//!
//! This module provides:
//! - Bracket sizing (capacity and byes for any participant count)
//! - Seeding participants into first-round slots
//! - Building rounds of matches, with byes completed on creation
//! - The match lifecycle and winner determination
//! - Advancing winners round by round until a champion remains
//! - A read-side projection that previews the next round
//!
//! ## Example
//!
//! ```no_run
//! use bracket_engine::bracket::{BracketConfig, BracketManager};
//! use bracket_engine::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect(&Default::default()).await?;
//!     let manager = BracketManager::new(
//!         Arc::new(db.bracket_store()),
//!         Arc::new(db.participant_registry()),
//!         BracketConfig::from_env()?,
//!     );
//!
//!     let round = manager.generate_bracket(42).await?;
//!     println!("Created {} for tournament 42", round.name);
//!
//!     let bracket = manager.load_bracket(42).await?;
//!     for round in bracket.latest_first() {
//!         println!("{} ({} matches)", round.name, round.matches.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod builder;
pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod projector;
pub mod seeding;
pub mod sizer;
pub mod state_machine;

pub use advancement::{Advancement, AdvancementResolver, RoundName};
pub use builder::{RoundBuilder, RoundPlan};
pub use config::BracketConfig;
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use manager::{AdvanceOutcome, BracketManager};
pub use models::{
    Match, MatchId, MatchSpec, MatchStatus, MatchUpdate, Participant, ParticipantId,
    ParticipantStatus, Round, RoundId, Slot, TournamentId,
};
pub use projector::{BracketProjector, BracketStatus, BracketView, MatchView, RoundView};
pub use seeding::{FixedSeed, RandomSeeding, RegistrationOrder, SeedOrder, SeedingAssigner, SeedingPolicy};
pub use sizer::{BracketSize, MIN_PARTICIPANTS};
pub use state_machine::MatchOutcome;
