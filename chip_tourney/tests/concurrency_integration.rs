//! Concurrency tests for the compare-and-swap write path.
//!
//! Several tasks drive one tournament at the same time; every write either
//! lands on the latest snapshot or is replayed against it.

use async_trait::async_trait;
use chip_tourney::chips::replay_balance;
use chip_tourney::db::{
    MemoryTournamentRepository, TournamentListing, TournamentRepository, Versioned,
};
use chip_tourney::game::{GameStatus, ScoreReport};
use chip_tourney::table::StaticVenueCatalog;
use chip_tourney::tournament::{
    MAX_CAS_ATTEMPTS, NewTeam, TeamMember, TournamentId, TournamentManager, TournamentRecord,
    TournamentSettings, TournamentStatus,
};
use chip_tourney::{TournamentError, TournamentResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

const DIRECTOR: i64 = 1;

/// Repository whose writes always lose the race
#[derive(Default)]
struct AlwaysStale {
    inner: MemoryTournamentRepository,
    attempts: AtomicU32,
}

#[async_trait]
impl TournamentRepository for AlwaysStale {
    async fn insert(&self, record: TournamentRecord) -> TournamentResult<TournamentId> {
        self.inner.insert(record).await
    }

    async fn load(&self, id: TournamentId) -> TournamentResult<Versioned<TournamentRecord>> {
        self.inner.load(id).await
    }

    async fn compare_and_swap(
        &self,
        _id: TournamentId,
        _expected_version: i64,
        _record: &TournamentRecord,
    ) -> TournamentResult<bool> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }

    async fn list(&self) -> TournamentResult<Vec<TournamentListing>> {
        self.inner.list().await
    }
}

async fn started(manager: &TournamentManager, teams: i64) -> TournamentId {
    let id = manager
        .create_tournament("Race Night", 1, TournamentSettings::default(), DIRECTOR)
        .await
        .unwrap();
    for n in 0..teams {
        let team = NewTeam::new(format!("Team {n}"), vec![TeamMember::new(200 + n, "P")]);
        manager.add_team(id, DIRECTOR, team).await.unwrap();
    }
    manager.start(id, DIRECTOR).await.unwrap();
    id
}

fn shared_manager(tables: usize) -> TournamentManager {
    TournamentManager::new(Arc::new(MemoryTournamentRepository::new()))
        .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(1, tables)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_results_on_separate_tables() {
    let manager = shared_manager(4);
    let id = started(&manager, 8).await;
    let games = manager.active_games(id).await.unwrap();
    assert_eq!(games.len(), 4);

    let handles: Vec<_> = games
        .into_iter()
        .map(|game| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .submit_scores(id, game.id, ScoreReport::new(1, 0), game.team_a_id)
                    .await?;
                manager.approve_scores(id, DIRECTOR, game.id).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = manager.get_tournament(id).await.unwrap();
    let completed = record
        .games
        .values()
        .filter(|g| g.status == GameStatus::Completed)
        .count();
    assert_eq!(completed, 4, "no result was lost to a concurrent write");

    let total: u32 = record.teams.values().map(|t| t.current_chips).sum();
    assert_eq!(total, 24, "chips are conserved");
    for team in record.teams.values() {
        assert_eq!(replay_balance(&record, team.id), team.current_chips as i64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_double_approval_applies_once() {
    let manager = shared_manager(1);
    let id = started(&manager, 3).await;
    let game = manager.active_games(id).await.unwrap().remove(0);
    manager
        .submit_scores(id, game.id, ScoreReport::new(1, 0), game.team_a_id)
        .await
        .unwrap();
    manager.add_director(id, DIRECTOR, 2).await.unwrap();

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.approve_scores(id, DIRECTOR, game.id).await })
    };
    let second = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.approve_scores(id, 2, game.id).await })
    };
    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(TournamentError::InvalidGameState { .. } | TournamentError::GameWorkflow { .. })
    )));

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.team(game.team_a_id).unwrap().current_chips, 4);
    assert_eq!(record.team(game.team_b_id).unwrap().current_chips, 2);
}

#[tokio::test]
async fn test_persistent_conflict_gives_up() {
    let repository = Arc::new(AlwaysStale::default());
    let manager = TournamentManager::new(repository.clone())
        .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(1, 1)));
    let id = manager
        .create_tournament("Contended", 1, TournamentSettings::default(), DIRECTOR)
        .await
        .unwrap();

    let team = NewTeam::new("Stale", vec![TeamMember::new(1, "P")]);
    let result = manager.add_team(id, DIRECTOR, team).await;
    match result {
        Err(err @ TournamentError::ConcurrentModification { .. }) => {
            assert!(err.is_retryable());
            assert!(err.to_string().contains(&MAX_CAS_ATTEMPTS.to_string()));
        }
        other => panic!("expected a concurrency failure, got {other:?}"),
    }
    assert_eq!(repository.attempts.load(Ordering::SeqCst), MAX_CAS_ATTEMPTS);

    let record = manager.get_tournament(id).await.unwrap();
    assert!(record.teams.is_empty(), "nothing was persisted");
}

#[tokio::test]
async fn test_rejected_operation_leaves_version_untouched() {
    let manager = shared_manager(1);
    let id = manager
        .create_tournament("Untouched", 1, TournamentSettings::default(), DIRECTOR)
        .await
        .unwrap();
    let before = manager.list_tournaments().await.unwrap()[0].version;

    assert!(manager.start(id, DIRECTOR).await.is_err());
    assert!(manager.pause(id, DIRECTOR).await.is_err());

    let listing = manager.list_tournaments().await.unwrap();
    assert_eq!(listing[0].version, before);
    assert_eq!(listing[0].status, TournamentStatus::Setup);
}
