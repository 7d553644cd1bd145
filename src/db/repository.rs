//! Repository traits for the bracket engine's collaborators, with PostgreSQL
//! implementations.
//!
//! Rounds are always returned ascending by sequence and matches ascending by
//! position; "latest first" displays reverse the projection instead.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use std::sync::Arc;

use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, MatchSpec, MatchUpdate, Participant,
    ParticipantId, ParticipantStatus, Round, RoundId, Slot, TournamentId,
};

/// Read/write access to participant eligibility
#[async_trait]
pub trait ParticipantRegistry: Send + Sync {
    /// Participants still eligible, in registration order
    async fn list_active_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>>;

    /// Flag a participant as eliminated
    async fn mark_eliminated(&self, participant_id: ParticipantId) -> BracketResult<()>;

    /// Make every participant of one tournament active again; returns how many changed
    async fn reset_eligibility(&self, tournament_id: TournamentId) -> BracketResult<u64>;
}

/// Persistence for rounds and matches
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Rounds of a tournament, ascending by sequence
    async fn load_rounds(&self, tournament_id: TournamentId) -> BracketResult<Vec<Round>>;

    async fn load_round(&self, round_id: RoundId) -> BracketResult<Option<Round>>;

    /// Matches of a round, ascending by position
    async fn load_matches(&self, round_id: RoundId) -> BracketResult<Vec<Match>>;

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>>;

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
    ) -> BracketResult<Round>;

    async fn create_matches(
        &self,
        round_id: RoundId,
        specs: &[MatchSpec],
    ) -> BracketResult<Vec<Match>>;

    /// Create a round together with its matches; either both are stored or neither is
    async fn create_round_with_matches(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
        specs: &[MatchSpec],
    ) -> BracketResult<(Round, Vec<Match>)>;

    async fn update_match(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()>;

    /// Delete every round and match of a tournament; returns the number of rounds removed
    async fn purge_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64>;
}

fn decode_err(message: String) -> BracketError {
    BracketError::Database(sqlx::Error::Decode(message.into()))
}

fn round_from_row(row: &PgRow) -> Round {
    Round {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        sequence: row.get::<i32, _>("sequence") as u32,
        name: row.get("name"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn match_from_row(row: &PgRow) -> BracketResult<Match> {
    let status: String = row.get("status");

    Ok(Match {
        id: row.get("id"),
        round_id: row.get("round_id"),
        position: row.get::<i32, _>("position") as u32,
        slot_a: Slot::from(row.get::<Option<i64>, _>("slot_a")),
        slot_b: Slot::from(row.get::<Option<i64>, _>("slot_b")),
        status: status.parse().map_err(decode_err)?,
        score_a: row.get("score_a"),
        score_b: row.get("score_b"),
        winner: row.get("winner_id"),
    })
}

async fn insert_round(
    conn: &mut PgConnection,
    tournament_id: TournamentId,
    sequence: u32,
    name: &str,
) -> BracketResult<Round> {
    let row = sqlx::query(
        r#"
        INSERT INTO bracket_rounds (tournament_id, sequence, name)
        VALUES ($1, $2, $3)
        RETURNING id, tournament_id, sequence, name, created_at
        "#,
    )
    .bind(tournament_id)
    .bind(sequence as i32)
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(round_from_row(&row))
}

async fn insert_matches(
    conn: &mut PgConnection,
    round_id: RoundId,
    specs: &[MatchSpec],
) -> BracketResult<Vec<Match>> {
    let mut created = Vec::with_capacity(specs.len());

    for spec in specs {
        let row = sqlx::query(
            r#"
            INSERT INTO bracket_matches (round_id, position, slot_a, slot_b, status, winner_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(round_id)
        .bind(spec.position as i32)
        .bind(spec.slot_a.participant())
        .bind(spec.slot_b.participant())
        .bind(spec.status.as_str())
        .bind(spec.winner)
        .fetch_one(&mut *conn)
        .await?;

        created.push(spec.clone().into_match(row.get("id"), round_id));
    }

    Ok(created)
}

/// PostgreSQL implementation of `ParticipantRegistry`
#[derive(Clone)]
pub struct PgParticipantRegistry {
    pool: Arc<PgPool>,
}

impl PgParticipantRegistry {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Register a participant (registry CRUD lives outside the engine; this
    /// exists for seeding and tests)
    pub async fn register(
        &self,
        tournament_id: TournamentId,
        name: &str,
    ) -> BracketResult<Participant> {
        let row = sqlx::query(
            "INSERT INTO participants (tournament_id, name) VALUES ($1, $2) RETURNING id",
        )
        .bind(tournament_id)
        .bind(name)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(Participant::new(row.get("id"), tournament_id, name))
    }

    pub async fn find(&self, participant_id: ParticipantId) -> BracketResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, tournament_id, name, status FROM participants WHERE id = $1",
        )
        .bind(participant_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| {
            let status: String = r.get("status");
            Ok(Participant {
                id: r.get("id"),
                tournament_id: r.get("tournament_id"),
                name: r.get("name"),
                status: status.parse().map_err(decode_err)?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ParticipantRegistry for PgParticipantRegistry {
    async fn list_active_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, name
            FROM participants
            WHERE tournament_id = $1 AND status = $2
            ORDER BY registered_at, id
            "#,
        )
        .bind(tournament_id)
        .bind(ParticipantStatus::Active.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                Participant::new(
                    row.get("id"),
                    row.get("tournament_id"),
                    row.get::<String, _>("name"),
                )
            })
            .collect())
    }

    async fn mark_eliminated(&self, participant_id: ParticipantId) -> BracketResult<()> {
        let result = sqlx::query("UPDATE participants SET status = $1 WHERE id = $2")
            .bind(ParticipantStatus::Eliminated.as_str())
            .bind(participant_id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::ParticipantNotFound(participant_id));
        }
        Ok(())
    }

    async fn reset_eligibility(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let result = sqlx::query(
            "UPDATE participants SET status = $1 WHERE tournament_id = $2 AND status <> $1",
        )
        .bind(ParticipantStatus::Active.as_str())
        .bind(tournament_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }
}

/// PostgreSQL implementation of `BracketStore`
#[derive(Clone)]
pub struct PgBracketStore {
    pool: Arc<PgPool>,
}

impl PgBracketStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn load_rounds(&self, tournament_id: TournamentId) -> BracketResult<Vec<Round>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, sequence, name, created_at
            FROM bracket_rounds
            WHERE tournament_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(round_from_row).collect())
    }

    async fn load_round(&self, round_id: RoundId) -> BracketResult<Option<Round>> {
        let row = sqlx::query(
            "SELECT id, tournament_id, sequence, name, created_at FROM bracket_rounds WHERE id = $1",
        )
        .bind(round_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(round_from_row))
    }

    async fn load_matches(&self, round_id: RoundId) -> BracketResult<Vec<Match>> {
        let rows = sqlx::query(
            r#"
            SELECT id, round_id, position, slot_a, slot_b, status, score_a, score_b, winner_id
            FROM bracket_matches
            WHERE round_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(round_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        let row = sqlx::query(
            r#"
            SELECT id, round_id, position, slot_a, slot_b, status, score_a, score_b, winner_id
            FROM bracket_matches
            WHERE id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
    ) -> BracketResult<Round> {
        let mut conn = self.pool.acquire().await?;
        insert_round(&mut conn, tournament_id, sequence, name).await
    }

    async fn create_matches(
        &self,
        round_id: RoundId,
        specs: &[MatchSpec],
    ) -> BracketResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;
        let created = insert_matches(&mut tx, round_id, specs).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn create_round_with_matches(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
        specs: &[MatchSpec],
    ) -> BracketResult<(Round, Vec<Match>)> {
        // Dropping the transaction on error rolls the round back
        let mut tx = self.pool.begin().await?;
        let round = insert_round(&mut tx, tournament_id, sequence, name).await?;
        let matches = insert_matches(&mut tx, round.id, specs).await?;
        tx.commit().await?;

        Ok((round, matches))
    }

    async fn update_match(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bracket_matches
            SET status = $1, score_a = $2, score_b = $3, winner_id = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.score_a)
        .bind(update.score_b)
        .bind(update.winner)
        .bind(match_id)
        .execute(self.pool.as_ref())
        .await?;

        if result.rows_affected() == 0 {
            return Err(BracketError::MatchNotFound(match_id));
        }
        Ok(())
    }

    async fn purge_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM bracket_matches
            WHERE round_id IN (SELECT id FROM bracket_rounds WHERE tournament_id = $1)
            "#,
        )
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM bracket_rounds WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
