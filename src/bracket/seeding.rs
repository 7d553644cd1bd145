//! Seeding: ordering participants into first-round slots.
//!
//! Participants are first arranged by a [`SeedingPolicy`] and then laid out
//! pairwise. Byes are spread across the first-round pairings so that no
//! pairing is left without a participant; the empty slot is always slot B.

use enum_dispatch::enum_dispatch;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::HashSet;

use super::{
    errors::{BracketError, BracketResult},
    models::{ParticipantId, Slot},
    sizer::BracketSize,
};

/// Orders participants before they are slotted
#[enum_dispatch]
pub trait SeedOrder {
    fn arrange(&mut self, participants: &mut [ParticipantId]);
}

/// Uniform shuffle from ambient entropy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomSeeding;

impl SeedOrder for RandomSeeding {
    fn arrange(&mut self, participants: &mut [ParticipantId]) {
        participants.shuffle(&mut rand::rng());
    }
}

/// Reproducible shuffle from an explicit seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSeed {
    pub seed: u64,
}

impl SeedOrder for FixedSeed {
    fn arrange(&mut self, participants: &mut [ParticipantId]) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        participants.shuffle(&mut rng);
    }
}

/// Keep registry order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationOrder;

impl SeedOrder for RegistrationOrder {
    fn arrange(&mut self, _participants: &mut [ParticipantId]) {}
}

/// Seeding policy
#[enum_dispatch(SeedOrder)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedingPolicy {
    RandomSeeding(RandomSeeding),
    FixedSeed(FixedSeed),
    RegistrationOrder(RegistrationOrder),
}

impl SeedingPolicy {
    pub fn random() -> Self {
        RandomSeeding.into()
    }

    pub fn fixed(seed: u64) -> Self {
        FixedSeed { seed }.into()
    }

    pub fn registration_order() -> Self {
        RegistrationOrder.into()
    }

    pub fn name(&self) -> &'static str {
        match self {
            SeedingPolicy::RandomSeeding(_) => "random",
            SeedingPolicy::FixedSeed(_) => "fixed",
            SeedingPolicy::RegistrationOrder(_) => "ordered",
        }
    }
}

impl Default for SeedingPolicy {
    fn default() -> Self {
        Self::random()
    }
}

/// Assigns participants to first-round slots
#[derive(Debug, Clone, Default)]
pub struct SeedingAssigner {
    policy: SeedingPolicy,
}

impl SeedingAssigner {
    pub fn new(policy: SeedingPolicy) -> Self {
        Self { policy }
    }

    /// Lay out `participants` into `size.capacity` slots
    ///
    /// # Arguments
    ///
    /// * `participants` - Eligible participant IDs, in registry order
    /// * `size` - Bracket size computed for exactly these participants
    ///
    /// # Returns
    ///
    /// * `Vec<Slot>` - `capacity` slots, `byes` of them empty, read pairwise
    ///
    /// # Errors
    ///
    /// * `SeedingMismatch` - `participants` does not match `size`
    /// * `DuplicateParticipant` - a participant is listed twice
    pub fn assign(
        &mut self,
        participants: &[ParticipantId],
        size: &BracketSize,
    ) -> BracketResult<Vec<Slot>> {
        if participants.len() != size.participants || size.byes >= size.participants {
            return Err(BracketError::SeedingMismatch {
                expected: size.participants,
                found: participants.len(),
            });
        }

        let mut seen = HashSet::with_capacity(participants.len());
        if let Some(dup) = participants.iter().find(|id| !seen.insert(**id)) {
            return Err(BracketError::DuplicateParticipant(*dup));
        }

        let mut ordered = participants.to_vec();
        self.policy.arrange(&mut ordered);

        let pairings = size.first_round_matches();
        let mut entrants = ordered.into_iter();
        let mut slots = Vec::with_capacity(size.capacity);

        for (pairing, bye) in bye_pairings(pairings, size.byes).into_iter().enumerate() {
            let a = entrants.next().ok_or(BracketError::EmptyPairing {
                position: pairing as u32,
            })?;
            slots.push(Slot::Occupied(a));
            slots.push(if bye {
                Slot::Empty
            } else {
                Slot::from(entrants.next())
            });
        }

        Ok(slots)
    }
}

/// Which of `pairings` first-round pairings receive a bye
///
/// Spreads `byes` evenly over the pairings; exactly `byes` entries are true
/// as long as `byes <= pairings`.
pub fn bye_pairings(pairings: usize, byes: usize) -> Vec<bool> {
    if pairings == 0 {
        return Vec::new();
    }
    (0..pairings)
        .map(|i| (i * byes) / pairings != ((i + 1) * byes) / pairings)
        .collect()
}
