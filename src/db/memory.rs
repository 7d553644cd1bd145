//! In-memory implementation of the bracket collaborators.
//!
//! Useful for tests and for embedding the engine without a database. One
//! `InMemoryStore` serves as both the registry and the round/match store.

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

use super::repository::{BracketStore, ParticipantRegistry};
use crate::bracket::{
    BracketError, BracketResult, Match, MatchId, MatchSpec, MatchUpdate, Participant,
    ParticipantId, ParticipantStatus, Round, RoundId, TournamentId,
};

#[derive(Debug, Default)]
struct MemoryState {
    participants: BTreeMap<ParticipantId, Participant>,
    rounds: BTreeMap<RoundId, Round>,
    matches: BTreeMap<MatchId, Match>,
    next_participant_id: ParticipantId,
    next_round_id: RoundId,
    next_match_id: MatchId,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl MemoryState {
    fn insert_round(
        &mut self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
    ) -> BracketResult<Round> {
        if self
            .rounds
            .values()
            .any(|r| r.tournament_id == tournament_id && r.sequence == sequence)
        {
            return Err(BracketError::DuplicateRound {
                tournament_id,
                sequence,
            });
        }

        let id = next_id(&mut self.next_round_id);
        let round = Round {
            id,
            tournament_id,
            sequence,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.rounds.insert(id, round.clone());
        Ok(round)
    }

    fn insert_matches(&mut self, round_id: RoundId, specs: &[MatchSpec]) -> Vec<Match> {
        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = next_id(&mut self.next_match_id);
            let m = spec.clone().into_match(id, round_id);
            self.matches.insert(id, m.clone());
            created.push(m);
        }
        created
    }
}

/// In-memory registry and bracket store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active participant; IDs start at 1
    pub async fn register_participant(
        &self,
        tournament_id: TournamentId,
        name: impl Into<String>,
    ) -> Participant {
        let mut state = self.state.write().await;
        let id = next_id(&mut state.next_participant_id);
        let participant = Participant::new(id, tournament_id, name);
        state.participants.insert(id, participant.clone());
        participant
    }

    /// Remove a participant from the registry
    pub async fn withdraw_participant(&self, participant_id: ParticipantId) -> bool {
        self.state
            .write()
            .await
            .participants
            .remove(&participant_id)
            .is_some()
    }

    pub async fn participant(&self, participant_id: ParticipantId) -> Option<Participant> {
        self.state
            .read()
            .await
            .participants
            .get(&participant_id)
            .cloned()
    }

    /// All participants of a tournament regardless of status
    pub async fn participants(&self, tournament_id: TournamentId) -> Vec<Participant> {
        self.state
            .read()
            .await
            .participants
            .values()
            .filter(|p| p.tournament_id == tournament_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ParticipantRegistry for InMemoryStore {
    async fn list_active_participants(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<Participant>> {
        Ok(self
            .participants(tournament_id)
            .await
            .into_iter()
            .filter(Participant::is_active)
            .collect())
    }

    async fn mark_eliminated(&self, participant_id: ParticipantId) -> BracketResult<()> {
        let mut state = self.state.write().await;
        let participant = state
            .participants
            .get_mut(&participant_id)
            .ok_or(BracketError::ParticipantNotFound(participant_id))?;
        participant.status = ParticipantStatus::Eliminated;
        Ok(())
    }

    async fn reset_eligibility(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let mut state = self.state.write().await;
        let mut reset = 0;
        for participant in state
            .participants
            .values_mut()
            .filter(|p| p.tournament_id == tournament_id && !p.is_active())
        {
            participant.status = ParticipantStatus::Active;
            reset += 1;
        }
        Ok(reset)
    }
}

#[async_trait]
impl BracketStore for InMemoryStore {
    async fn load_rounds(&self, tournament_id: TournamentId) -> BracketResult<Vec<Round>> {
        let state = self.state.read().await;
        let mut rounds: Vec<Round> = state
            .rounds
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.sequence);
        Ok(rounds)
    }

    async fn load_round(&self, round_id: RoundId) -> BracketResult<Option<Round>> {
        Ok(self.state.read().await.rounds.get(&round_id).cloned())
    }

    async fn load_matches(&self, round_id: RoundId) -> BracketResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.position);
        Ok(matches)
    }

    async fn load_match(&self, match_id: MatchId) -> BracketResult<Option<Match>> {
        Ok(self.state.read().await.matches.get(&match_id).cloned())
    }

    async fn create_round(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
    ) -> BracketResult<Round> {
        self.state
            .write()
            .await
            .insert_round(tournament_id, sequence, name)
    }

    async fn create_matches(
        &self,
        round_id: RoundId,
        specs: &[MatchSpec],
    ) -> BracketResult<Vec<Match>> {
        let mut state = self.state.write().await;
        if !state.rounds.contains_key(&round_id) {
            return Err(BracketError::RoundNotFound(round_id));
        }
        Ok(state.insert_matches(round_id, specs))
    }

    async fn create_round_with_matches(
        &self,
        tournament_id: TournamentId,
        sequence: u32,
        name: &str,
        specs: &[MatchSpec],
    ) -> BracketResult<(Round, Vec<Match>)> {
        let mut state = self.state.write().await;
        let round = state.insert_round(tournament_id, sequence, name)?;
        let matches = state.insert_matches(round.id, specs);
        Ok((round, matches))
    }

    async fn update_match(&self, match_id: MatchId, update: &MatchUpdate) -> BracketResult<()> {
        let mut state = self.state.write().await;
        let m = state
            .matches
            .get_mut(&match_id)
            .ok_or(BracketError::MatchNotFound(match_id))?;
        m.status = update.status;
        m.score_a = update.score_a;
        m.score_b = update.score_b;
        m.winner = update.winner;
        Ok(())
    }

    async fn purge_bracket(&self, tournament_id: TournamentId) -> BracketResult<u64> {
        let mut state = self.state.write().await;
        let purged: Vec<RoundId> = state
            .rounds
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .map(|r| r.id)
            .collect();

        state.matches.retain(|_, m| !purged.contains(&m.round_id));
        state.rounds.retain(|id, _| !purged.contains(id));
        Ok(purged.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{MatchStatus, Slot};

    fn spec(position: u32, a: i64, b: Option<i64>) -> MatchSpec {
        MatchSpec {
            position,
            slot_a: Slot::Occupied(a),
            slot_b: Slot::from(b),
            status: MatchStatus::Scheduled,
            winner: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_list_active() {
        let store = InMemoryStore::new();
        let a = store.register_participant(1, "Alpha").await;
        let b = store.register_participant(1, "Bravo").await;
        store.register_participant(2, "Other").await;

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);

        store.mark_eliminated(a.id).await.unwrap();
        let active = store.list_active_participants(1).await.unwrap();
        assert_eq!(active, vec![b]);
    }

    #[tokio::test]
    async fn test_mark_unknown_participant() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.mark_eliminated(99).await,
            Err(BracketError::ParticipantNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_reset_eligibility_scoped_to_tournament() {
        let store = InMemoryStore::new();
        let ours = store.register_participant(1, "Ours").await;
        let theirs = store.register_participant(2, "Theirs").await;
        store.mark_eliminated(ours.id).await.unwrap();
        store.mark_eliminated(theirs.id).await.unwrap();

        assert_eq!(store.reset_eligibility(1).await.unwrap(), 1);
        assert!(store.participant(ours.id).await.unwrap().is_active());
        assert!(!store.participant(theirs.id).await.unwrap().is_active());
    }

    #[tokio::test]
    async fn test_rounds_and_matches_sorted() {
        let store = InMemoryStore::new();
        let second = store.create_round(1, 2, "Final").await.unwrap();
        let first = store.create_round(1, 1, "Semifinal").await.unwrap();

        store
            .create_matches(first.id, &[spec(1, 3, Some(4)), spec(0, 1, Some(2))])
            .await
            .unwrap();

        let rounds = store.load_rounds(1).await.unwrap();
        assert_eq!(rounds, vec![first.clone(), second]);

        let positions: Vec<u32> = store
            .load_matches(first.id)
            .await
            .unwrap()
            .iter()
            .map(|m| m.position)
            .collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_update_match() {
        let store = InMemoryStore::new();
        let round = store.create_round(1, 1, "Final").await.unwrap();
        let created = store
            .create_matches(round.id, &[spec(0, 1, Some(2))])
            .await
            .unwrap();

        let update = MatchUpdate {
            status: MatchStatus::Completed,
            score_a: Some(3),
            score_b: Some(1),
            winner: Some(1),
        };
        store.update_match(created[0].id, &update).await.unwrap();

        let stored = store.load_match(created[0].id).await.unwrap().unwrap();
        assert_eq!(stored.update(), update);

        assert!(matches!(
            store.update_match(404, &update).await,
            Err(BracketError::MatchNotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_create_matches_requires_round() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.create_matches(7, &[spec(0, 1, None)]).await,
            Err(BracketError::RoundNotFound(7))
        ));
    }

    #[tokio::test]
    async fn test_create_round_with_matches() {
        let store = InMemoryStore::new();
        let (round, matches) = store
            .create_round_with_matches(1, 1, "Final", &[spec(0, 1, Some(2))])
            .await
            .unwrap();

        assert_eq!(store.load_rounds(1).await.unwrap(), vec![round.clone()]);
        assert_eq!(store.load_matches(round.id).await.unwrap(), matches);
    }

    #[tokio::test]
    async fn test_duplicate_round_stores_nothing() {
        let store = InMemoryStore::new();
        let (first, _) = store
            .create_round_with_matches(1, 1, "Semifinal", &[spec(0, 1, Some(2))])
            .await
            .unwrap();

        let result = store
            .create_round_with_matches(1, 1, "Semifinal", &[spec(0, 3, Some(4))])
            .await;
        assert!(matches!(
            result,
            Err(BracketError::DuplicateRound {
                tournament_id: 1,
                sequence: 1
            })
        ));

        assert_eq!(store.load_rounds(1).await.unwrap(), vec![first.clone()]);
        assert_eq!(store.load_matches(first.id).await.unwrap().len(), 1);
        assert_eq!(store.state.read().await.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_purge_only_touches_one_tournament() {
        let store = InMemoryStore::new();
        let ours = store.create_round(1, 1, "Final").await.unwrap();
        let theirs = store.create_round(2, 1, "Final").await.unwrap();
        store
            .create_matches(ours.id, &[spec(0, 1, Some(2))])
            .await
            .unwrap();
        store
            .create_matches(theirs.id, &[spec(0, 3, Some(4))])
            .await
            .unwrap();

        assert_eq!(store.purge_bracket(1).await.unwrap(), 1);
        assert!(store.load_rounds(1).await.unwrap().is_empty());
        assert!(store.load_matches(ours.id).await.unwrap().is_empty());
        assert_eq!(store.load_matches(theirs.id).await.unwrap().len(), 1);
    }
}
