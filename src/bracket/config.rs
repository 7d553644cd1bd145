//! Bracket engine configuration.

use std::env;

use super::{
    errors::{BracketError, BracketResult},
    seeding::SeedingPolicy,
};

/// Bracket engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketConfig {
    /// How participants are ordered before slotting (default: random)
    pub seeding: SeedingPolicy,

    /// Create the next round as soon as the current one completes
    /// (default: false, the operator advances explicitly)
    pub auto_advance: bool,
}

impl BracketConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `BRACKET_SEEDING`: `random`, `fixed` or `ordered` (default: random)
    /// - `BRACKET_SEED`: u64 seed, required when `BRACKET_SEEDING=fixed`
    /// - `BRACKET_AUTO_ADVANCE`: `true` or `false` (default: false)
    ///
    /// # Errors
    ///
    /// * `Configuration` - a variable is set to an unparseable value
    pub fn from_env() -> BracketResult<Self> {
        let seeding = match env::var("BRACKET_SEEDING").ok().as_deref() {
            None | Some("random") => SeedingPolicy::random(),
            Some("ordered") => SeedingPolicy::registration_order(),
            Some("fixed") => {
                let seed = env::var("BRACKET_SEED").map_err(|_| {
                    BracketError::Configuration(
                        "BRACKET_SEED must be set when BRACKET_SEEDING=fixed".to_string(),
                    )
                })?;
                SeedingPolicy::fixed(parse_var("BRACKET_SEED", &seed)?)
            }
            Some(other) => {
                return Err(BracketError::Configuration(format!(
                    "BRACKET_SEEDING must be one of random, fixed, ordered; got {other}"
                )));
            }
        };

        let auto_advance = match env::var("BRACKET_AUTO_ADVANCE") {
            Ok(value) => parse_var("BRACKET_AUTO_ADVANCE", &value)?,
            Err(_) => false,
        };

        Ok(Self {
            seeding,
            auto_advance,
        })
    }

    /// Reproducible seeding, e.g. for replaying a bracket
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeding = SeedingPolicy::fixed(seed);
        self
    }

    pub fn with_auto_advance(mut self, auto_advance: bool) -> Self {
        self.auto_advance = auto_advance;
        self
    }
}

pub(crate) fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> BracketResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| BracketError::Configuration(format!("{name} has invalid value: {value}")))
}
