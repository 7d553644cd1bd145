//! Persistence for the bracket engine.
//!
//! The engine only talks to [`BracketStore`] and [`ParticipantRegistry`].
//! [`Database`] owns a PostgreSQL pool and hands out the `sqlx`-backed
//! implementations; [`InMemoryStore`] keeps everything in process.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

use crate::bracket::BracketResult;

pub mod config;
pub mod memory;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::InMemoryStore;
pub use repository::{BracketStore, ParticipantRegistry, PgBracketStore, PgParticipantRegistry};

/// Schema for participants, rounds and matches
pub const SCHEMA: &str = include_str!("../../migrations/001_bracket_schema.sql");

/// Shared PostgreSQL pool for the bracket store and participant registry
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Open a pool sized and timed by `config`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bracket_engine::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let db = Database::connect(&DatabaseConfig::from_env()?).await?;
    ///     db.apply_schema().await?;
    ///     let store = db.bracket_store();
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> BracketResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round and match store sharing this pool
    pub fn bracket_store(&self) -> PgBracketStore {
        PgBracketStore::new(self.pool.clone())
    }

    /// Participant registry sharing this pool
    pub fn participant_registry(&self) -> PgParticipantRegistry {
        PgParticipantRegistry::new(self.pool.clone())
    }

    /// Create the bracket tables if they do not exist
    pub async fn apply_schema(&self) -> BracketResult<()> {
        sqlx::raw_sql(SCHEMA).execute(self.pool()).await?;
        Ok(())
    }

    pub async fn health_check(&self) -> BracketResult<()> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    /// Close the pool; clones of this handle share it
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
