//! Bracket manager: wires the registry and store to the bracket engine.
//!
//! Every mutating operation takes a per-tournament lock for its whole
//! read-modify-write sequence, so a tournament's bracket has a single writer
//! at a time within this process. Lock entries are dropped again once no
//! operation holds or waits on them. Deployments running several processes
//! must add an equivalent lock at the database.

use log::{error, info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    advancement::{Advancement, AdvancementResolver},
    builder::RoundBuilder,
    config::BracketConfig,
    errors::{BracketError, BracketResult, ErrorKind},
    models::{Match, MatchId, ParticipantId, Round, RoundId, TournamentId},
    projector::{BracketProjector, BracketView},
    seeding::SeedingAssigner,
    sizer::BracketSize,
    state_machine::MatchOutcome,
};
use crate::db::{BracketStore, ParticipantRegistry};

/// Result of advancing a tournament past its latest round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The next round was created
    RoundCreated(Round),
    /// The latest round produced a single winner
    TournamentFinished { champion: ParticipantId },
}

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    store: Arc<dyn BracketStore>,
    registry: Arc<dyn ParticipantRegistry>,
    config: BracketConfig,
    locks: Arc<Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl BracketManager {
    /// Create a new bracket manager
    ///
    /// # Arguments
    ///
    /// * `store` - Round and match persistence
    /// * `registry` - Participant registry
    /// * `config` - Seeding and advancement settings
    pub fn new(
        store: Arc<dyn BracketStore>,
        registry: Arc<dyn ParticipantRegistry>,
        config: BracketConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &BracketConfig {
        &self.config
    }

    async fn lock_tournament(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(tournament_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn unlock_tournament(&self, tournament_id: TournamentId, guard: OwnedMutexGuard<()>) {
        drop(guard);
        // Holders and waiters keep a clone, so a count of 1 means only the map is left
        let mut locks = self.locks.lock().await;
        if locks
            .get(&tournament_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&tournament_id);
        }
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Build round 1 from the registry's active participants
    ///
    /// # Errors
    ///
    /// * `BracketAlreadyExists` - rounds are already persisted; use [`Self::reseed`]
    /// * `InsufficientParticipants` - fewer than two active participants
    pub async fn generate_bracket(&self, tournament_id: TournamentId) -> BracketResult<Round> {
        let guard = self.lock_tournament(tournament_id).await;
        let result = self.generate_locked(tournament_id).await;
        self.unlock_tournament(tournament_id, guard).await;
        result.inspect_err(|e| report(tournament_id, "generate bracket", e))
    }

    /// Discard the bracket and build a fresh round 1
    ///
    /// Destructive: every round and match of the tournament is deleted, and
    /// the tournament's participants are made eligible again.
    pub async fn reseed(&self, tournament_id: TournamentId) -> BracketResult<Round> {
        let guard = self.lock_tournament(tournament_id).await;
        let result = self.reseed_locked(tournament_id).await;
        self.unlock_tournament(tournament_id, guard).await;
        result.inspect_err(|e| report(tournament_id, "re-seed", e))
    }

    async fn reseed_locked(&self, tournament_id: TournamentId) -> BracketResult<Round> {
        let purged = self.store.purge_bracket(tournament_id).await?;
        let reset = self.registry.reset_eligibility(tournament_id).await?;
        info!(
            "Tournament {}: purged {} rounds and reset {} participants for re-seed",
            tournament_id, purged, reset
        );
        self.generate_locked(tournament_id).await
    }

    async fn generate_locked(&self, tournament_id: TournamentId) -> BracketResult<Round> {
        if !self.store.load_rounds(tournament_id).await?.is_empty() {
            return Err(BracketError::BracketAlreadyExists(tournament_id));
        }

        let participants: Vec<ParticipantId> = self
            .registry
            .list_active_participants(tournament_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let size = BracketSize::for_participants(participants.len())?;
        let slots = SeedingAssigner::new(self.config.seeding).assign(&participants, &size)?;
        let plan = RoundBuilder::plan(1, &slots)?;
        let (round, _) = RoundBuilder::persist(self.store.as_ref(), tournament_id, &plan).await?;

        info!(
            "Tournament {}: generated bracket for {} participants (capacity {}, {} byes, {} seeding)",
            tournament_id,
            size.participants,
            size.capacity,
            size.byes,
            self.config.seeding.name()
        );

        Ok(round)
    }

    /// Move a scheduled match to ongoing
    pub async fn start_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Match> {
        let guard = self.lock_tournament(tournament_id).await;
        let result = self.start_locked(tournament_id, match_id).await;
        self.unlock_tournament(tournament_id, guard).await;
        result.inspect_err(|e| report(tournament_id, "start match", e))
    }

    async fn start_locked(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Match> {
        let mut m = self.find_match(tournament_id, match_id).await?;
        m.start()?;
        self.store.update_match(m.id, &m.update()).await?;
        Ok(m)
    }

    /// Record final scores and eliminate the loser
    ///
    /// Nothing is written when the loser is unknown to the registry, so the
    /// call can simply be repeated. With `auto_advance` set, the next round is
    /// created (or the tournament finished) once the match's round has no open
    /// matches left; a failure there is logged and does not undo the result,
    /// and [`Self::advance_round`] picks it up later.
    pub async fn record_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
    ) -> BracketResult<MatchOutcome> {
        let guard = self.lock_tournament(tournament_id).await;
        let result = self
            .record_locked(tournament_id, match_id, score_a, score_b)
            .await;
        self.unlock_tournament(tournament_id, guard).await;
        result.inspect_err(|e| report(tournament_id, "record result", e))
    }

    async fn record_locked(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
    ) -> BracketResult<MatchOutcome> {
        let mut m = self.find_match(tournament_id, match_id).await?;
        let outcome = m.record_result(score_a, score_b)?;
        // Elimination is idempotent and goes first, so a failed match write can be retried
        self.registry.mark_eliminated(outcome.loser).await?;
        self.store.update_match(m.id, &m.update()).await?;

        if self.config.auto_advance {
            if let Err(e) = self.advance_if_complete(tournament_id, m.round_id).await {
                report(tournament_id, "auto-advance", &e);
            }
        }

        Ok(outcome)
    }

    async fn advance_if_complete(
        &self,
        tournament_id: TournamentId,
        round_id: RoundId,
    ) -> BracketResult<Option<AdvanceOutcome>> {
        let siblings = self.store.load_matches(round_id).await?;
        if !siblings.iter().all(Match::is_completed) {
            return Ok(None);
        }
        self.advance_locked(tournament_id).await.map(Some)
    }

    /// Create the round after the latest one, or report the champion
    ///
    /// # Errors
    ///
    /// * `BracketNotGenerated` - no rounds exist
    /// * `RoundIncomplete` - the latest round still has open matches
    pub async fn advance_round(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<AdvanceOutcome> {
        let guard = self.lock_tournament(tournament_id).await;
        let result = self.advance_locked(tournament_id).await;
        self.unlock_tournament(tournament_id, guard).await;
        result.inspect_err(|e| report(tournament_id, "advance round", e))
    }

    async fn advance_locked(&self, tournament_id: TournamentId) -> BracketResult<AdvanceOutcome> {
        let latest = self
            .store
            .load_rounds(tournament_id)
            .await?
            .pop()
            .ok_or(BracketError::BracketNotGenerated(tournament_id))?;
        let matches = self.store.load_matches(latest.id).await?;

        match AdvancementResolver::resolve(&latest, &matches)? {
            Advancement::Finished { champion } => {
                info!(
                    "Tournament {}: finished after round {}, champion {}",
                    tournament_id, latest.sequence, champion
                );
                Ok(AdvanceOutcome::TournamentFinished { champion })
            }
            Advancement::NextRound {
                sequence, winners, ..
            } => {
                let plan = RoundBuilder::plan_from_winners(sequence, &winners)?;
                let (round, _) =
                    RoundBuilder::persist(self.store.as_ref(), tournament_id, &plan).await?;
                info!(
                    "Tournament {}: advanced {} participants to round {} '{}'",
                    tournament_id,
                    winners.len(),
                    round.sequence,
                    round.name
                );
                Ok(AdvanceOutcome::RoundCreated(round))
            }
        }
    }

    /// Display bracket, including the preview of the next round
    pub async fn load_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketView> {
        let rounds = self.store.load_rounds(tournament_id).await?;

        let mut loaded = Vec::with_capacity(rounds.len());
        for round in rounds {
            let matches = self.store.load_matches(round.id).await?;
            loaded.push((round, matches));
        }

        BracketProjector::project(tournament_id, &loaded)
            .inspect_err(|e| report(tournament_id, "load bracket", e))
    }

    /// Winner of the tournament, once the final is played
    pub async fn champion(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<ParticipantId>> {
        Ok(self.load_bracket(tournament_id).await?.champion)
    }

    async fn find_match(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> BracketResult<Match> {
        let m = self
            .store
            .load_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;
        let round = self
            .store
            .load_round(m.round_id)
            .await?
            .ok_or(BracketError::RoundNotFound(m.round_id))?;

        if round.tournament_id != tournament_id {
            return Err(BracketError::MatchNotFound(match_id));
        }
        Ok(m)
    }
}

fn report(tournament_id: TournamentId, operation: &str, err: &BracketError) {
    match err.kind() {
        ErrorKind::Invariant => error!(
            "Tournament {}: invariant violated during {}: {}",
            tournament_id, operation, err
        ),
        ErrorKind::Infrastructure => {
            error!("Tournament {}: {} failed: {}", tournament_id, operation, err)
        }
        ErrorKind::UserInput | ErrorKind::Rejected | ErrorKind::NotFound => {
            warn!("Tournament {}: {} rejected: {}", tournament_id, operation, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{
        models::{MatchStatus, ParticipantStatus},
        projector::BracketStatus,
        seeding::SeedingPolicy,
    };
    use crate::bracket::models::{MatchSpec, MatchUpdate};
    use crate::db::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store whose round writes fail while `fail_rounds` is set
    struct FlakyStore {
        inner: InMemoryStore,
        fail_rounds: AtomicBool,
    }

    impl FlakyStore {
        fn set_failing(&self, failing: bool) {
            self.fail_rounds.store(failing, Ordering::SeqCst);
        }

        fn check(&self) -> BracketResult<()> {
            if self.fail_rounds.load(Ordering::SeqCst) {
                return Err(BracketError::Database(sqlx::Error::PoolTimedOut));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BracketStore for FlakyStore {
        async fn load_rounds(&self, tournament_id: TournamentId) -> BracketResult<Vec<Round>> {
            self.inner.load_rounds(tournament_id).await
        }

        async fn load_round(&self, round_id: RoundId) -> BracketResult<Option<Round>> {
            self.inner.load_round(round_id).await
        }

        async fn load_matches(&self, round_id: RoundId) -> BracketResult<Vec<Match>> {
            self.inner.load_matches(round_id).await
        }

        async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
            self.inner.load_match(match_id).await
        }

        async fn create_round(
            &self,
            tournament_id: TournamentId,
            sequence: u32,
            name: &str,
        ) -> BracketResult<Round> {
            self.check()?;
            self.inner.create_round(tournament_id, sequence, name).await
        }

        async fn create_matches(
            &self,
            round_id: RoundId,
            specs: &[MatchSpec],
        ) -> BracketResult<Vec<Match>> {
            self.check()?;
            self.inner.create_matches(round_id, specs).await
        }

        async fn create_round_with_matches(
            &self,
            tournament_id: TournamentId,
            sequence: u32,
            name: &str,
            specs: &[MatchSpec],
        ) -> BracketResult<(Round, Vec<Match>)> {
            self.check()?;
            self.inner
                .create_round_with_matches(tournament_id, sequence, name, specs)
                .await
        }

        async fn update_match(
            &self,
            match_id: MatchId,
            update: &MatchUpdate,
        ) -> BracketResult<()> {
            self.inner.update_match(match_id, update).await
        }

        async fn purge_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
            self.inner.purge_bracket(tournament_id).await
        }
    }

    async fn setup_flaky(
        participants: usize,
        config: BracketConfig,
    ) -> (BracketManager, Arc<FlakyStore>, Arc<InMemoryStore>) {
        let registry = Arc::new(InMemoryStore::new());
        for i in 0..participants {
            registry
                .register_participant(1, format!("Team {}", i + 1))
                .await;
        }
        let store = Arc::new(FlakyStore {
            inner: InMemoryStore::new(),
            fail_rounds: AtomicBool::new(false),
        });
        let manager = BracketManager::new(store.clone(), registry.clone(), config);
        (manager, store, registry)
    }

    async fn setup(
        participants: usize,
        config: BracketConfig,
    ) -> (BracketManager, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..participants {
            store.register_participant(1, format!("Team {}", i + 1)).await;
        }
        let manager = BracketManager::new(store.clone(), store.clone(), config);
        (manager, store)
    }

    fn ordered() -> BracketConfig {
        BracketConfig {
            seeding: SeedingPolicy::registration_order(),
            auto_advance: false,
        }
    }

    async fn open_matches(store: &InMemoryStore, round: &Round) -> Vec<Match> {
        store
            .load_matches(round.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| !m.is_completed())
            .collect()
    }

    #[tokio::test]
    async fn test_generate_twice_requires_reseed() {
        let (manager, _) = setup(4, ordered()).await;
        manager.generate_bracket(1).await.unwrap();

        assert!(matches!(
            manager.generate_bracket(1).await,
            Err(BracketError::BracketAlreadyExists(1))
        ));
    }

    #[tokio::test]
    async fn test_generate_with_one_participant_fails() {
        let (manager, _) = setup(1, ordered()).await;
        assert!(matches!(
            manager.generate_bracket(1).await,
            Err(BracketError::InsufficientParticipants { found: 1 })
        ));
    }

    #[tokio::test]
    async fn test_record_result_eliminates_loser() {
        let (manager, store) = setup(2, ordered()).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let m = &open_matches(&store, &round).await[0];

        manager.start_match(1, m.id).await.unwrap();
        let outcome = manager.record_result(1, m.id, 1, 4).await.unwrap();

        assert_eq!(outcome.winner, m.slot_b.participant().unwrap());
        let loser = store.participant(outcome.loser).await.unwrap();
        assert_eq!(loser.status, ParticipantStatus::Eliminated);
        let winner = store.participant(outcome.winner).await.unwrap();
        assert_eq!(winner.status, ParticipantStatus::Active);
    }

    #[tokio::test]
    async fn test_tie_is_rejected_and_nothing_persisted() {
        let (manager, store) = setup(2, ordered()).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let m = open_matches(&store, &round).await.remove(0);

        assert!(matches!(
            manager.record_result(1, m.id, 2, 2).await,
            Err(BracketError::TiesNotAllowed { score: 2 })
        ));
        let stored = store.load_match(m.id).await.unwrap().unwrap();
        assert_eq!(stored, m);
        assert_eq!(stored.status, MatchStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_match_from_other_tournament_not_found() {
        let (manager, store) = setup(2, ordered()).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let m = &open_matches(&store, &round).await[0];

        assert!(matches!(
            manager.record_result(2, m.id, 1, 0).await,
            Err(BracketError::MatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_advance_without_bracket() {
        let (manager, _) = setup(3, ordered()).await;
        assert!(matches!(
            manager.advance_round(1).await,
            Err(BracketError::BracketNotGenerated(1))
        ));
    }

    #[tokio::test]
    async fn test_auto_advance_creates_next_round() {
        let (manager, store) = setup(4, ordered().with_auto_advance(true)).await;
        let round = manager.generate_bracket(1).await.unwrap();

        for m in open_matches(&store, &round).await {
            manager.record_result(1, m.id, 2, 1).await.unwrap();
        }

        let rounds = store.load_rounds(1).await.unwrap();
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[1].name, "Final");

        let view = manager.load_bracket(1).await.unwrap();
        assert!(view.preview().is_none());
        assert_eq!(view.status, BracketStatus::InProgress);
    }

    #[tokio::test]
    async fn test_champion_after_final() {
        let (manager, store) = setup(2, ordered()).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let m = &open_matches(&store, &round).await[0];
        manager.record_result(1, m.id, 3, 1).await.unwrap();

        assert_eq!(manager.champion(1).await.unwrap(), m.slot_a.participant());
        assert_eq!(
            manager.advance_round(1).await.unwrap(),
            AdvanceOutcome::TournamentFinished {
                champion: m.slot_a.participant().unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_round_write_leaves_no_bracket() {
        let (manager, store, _) = setup_flaky(5, ordered()).await;
        store.set_failing(true);

        assert!(matches!(
            manager.generate_bracket(1).await,
            Err(BracketError::Database(sqlx::Error::PoolTimedOut))
        ));
        assert!(store.load_rounds(1).await.unwrap().is_empty());
        let view = manager.load_bracket(1).await.unwrap();
        assert_eq!(view.status, BracketStatus::NotStarted);

        store.set_failing(false);
        let round = manager.generate_bracket(1).await.unwrap();
        assert_eq!(store.load_matches(round.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unknown_loser_writes_nothing() {
        let (manager, store) = setup(2, ordered()).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let m = open_matches(&store, &round).await.remove(0);
        let loser = m.slot_b.participant().unwrap();
        assert!(store.withdraw_participant(loser).await);

        for _ in 0..2 {
            assert!(matches!(
                manager.record_result(1, m.id, 3, 1).await,
                Err(BracketError::ParticipantNotFound(id)) if id == loser
            ));
            let stored = store.load_match(m.id).await.unwrap().unwrap();
            assert_eq!(stored.status, MatchStatus::Scheduled);
            assert_eq!(stored.winner, None);
        }
    }

    #[tokio::test]
    async fn test_failed_auto_advance_keeps_result() {
        let (manager, store, registry) = setup_flaky(4, ordered().with_auto_advance(true)).await;
        let round = manager.generate_bracket(1).await.unwrap();
        let semis = open_matches(&store.inner, &round).await;
        store.set_failing(true);

        for m in &semis {
            let outcome = manager.record_result(1, m.id, 2, 1).await.unwrap();
            let loser = registry.participant(outcome.loser).await.unwrap();
            assert_eq!(loser.status, ParticipantStatus::Eliminated);
        }
        assert_eq!(store.load_rounds(1).await.unwrap().len(), 1);
        assert!(open_matches(&store.inner, &round).await.is_empty());

        store.set_failing(false);
        match manager.advance_round(1).await.unwrap() {
            AdvanceOutcome::RoundCreated(final_round) => assert_eq!(final_round.name, "Final"),
            other => panic!("expected the final, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tournament_locks_are_released() {
        let (manager, store) = setup(8, ordered().with_auto_advance(true)).await;
        let round = manager.generate_bracket(1).await.unwrap();
        assert!(manager.generate_bracket(1).await.is_err());
        assert_eq!(manager.tracked_locks().await, 0);

        let handles: Vec<_> = open_matches(&store, &round)
            .await
            .into_iter()
            .map(|m| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.record_result(1, m.id, 1, 0).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load_rounds(1).await.unwrap().len(), 2);
        assert_eq!(manager.tracked_locks().await, 0);
    }
}
