//! Integration tests for the queue and table seating.
//!
//! Exercises table closure, reopening, manual and forced assignment,
//! eligibility checks and queue ordering through the async manager.

use chip_tourney::TournamentError;
use chip_tourney::db::MemoryTournamentRepository;
use chip_tourney::game::GameStatus;
use chip_tourney::table::{EligibilityPolicy, StaticVenueCatalog, Table, TableStatus};
use chip_tourney::tournament::{
    BracketOrdering, NewTeam, Team, TeamMember, TournamentId, TournamentManager, TournamentRecord,
    TournamentSettings,
};
use std::sync::Arc;

const DIRECTOR: i64 = 1;
const TABLE_ONE: i64 = 1001;
const TABLE_TWO: i64 = 1002;

/// Only admits teams to one table
struct SingleTablePolicy(i64);

impl EligibilityPolicy for SingleTablePolicy {
    fn check(&self, _record: &TournamentRecord, _team: &Team, table: &Table) -> Result<(), String> {
        if table.id == self.0 {
            Ok(())
        } else {
            Err(format!("reserved for league play, use table {}", self.0))
        }
    }
}

fn manager(tables: usize) -> TournamentManager {
    TournamentManager::new(Arc::new(MemoryTournamentRepository::new()))
        .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(1, tables)))
}

async fn started(
    manager: &TournamentManager,
    settings: TournamentSettings,
    teams: Vec<NewTeam>,
) -> TournamentId {
    let id = manager
        .create_tournament("Queue Cup", 1, settings, DIRECTOR)
        .await
        .unwrap();
    for team in teams {
        manager.add_team(id, DIRECTOR, team).await.unwrap();
    }
    manager.start(id, DIRECTOR).await.unwrap();
    id
}

fn teams(count: i64) -> Vec<NewTeam> {
    (1..=count)
        .map(|n| NewTeam::new(format!("Team {n}"), vec![TeamMember::new(n * 10, "Cue")]))
        .collect()
}

#[tokio::test]
async fn test_close_table_requeues_occupants_once() {
    let manager = manager(2);
    let id = started(&manager, TournamentSettings::default(), teams(4)).await;
    let before = manager.get_tournament(id).await.unwrap();
    let occupants = before.tables[&TABLE_ONE].occupants.clone();
    let game_id = before.active_game_at(TABLE_ONE).unwrap().id;

    let requeued = manager.close_table(id, DIRECTOR, TABLE_ONE).await.unwrap();
    assert_eq!(requeued, occupants);

    let record = manager.get_tournament(id).await.unwrap();
    let table = &record.tables[&TABLE_ONE];
    assert_eq!(table.status, TableStatus::Closed);
    assert_eq!(table.closed_by, Some(DIRECTOR));
    assert!(table.occupants.is_empty());
    assert_eq!(record.games[&game_id].status, GameStatus::Cancelled);
    assert_eq!(record.queue.order, occupants, "each occupant queued exactly once");
    assert_eq!(record.ledger.len(), before.ledger.len(), "no chip movement");
}

#[tokio::test]
async fn test_reopened_table_is_refilled() {
    let manager = manager(2);
    let id = started(&manager, TournamentSettings::default(), teams(4)).await;
    manager.close_table(id, DIRECTOR, TABLE_ONE).await.unwrap();

    manager.open_table(id, DIRECTOR, TABLE_ONE).await.unwrap();

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.tables[&TABLE_ONE].status, TableStatus::InUse);
    assert!(record.queue.is_empty());
    assert!(manager.open_table(id, DIRECTOR, TABLE_ONE).await.is_err(), "already open");
}

#[tokio::test]
async fn test_manual_assignment_respects_eligibility() {
    let manager = manager(2).with_eligibility(Arc::new(SingleTablePolicy(TABLE_ONE)));
    let settings = TournamentSettings::default().with_autopilot(false);
    let id = started(&manager, settings, teams(3)).await;
    assert_eq!(manager.get_tournament(id).await.unwrap().queue.len(), 3);

    assert_eq!(manager.assign_table(id, DIRECTOR, TABLE_ONE, 1).await.unwrap(), None);
    let game = manager.assign_table(id, DIRECTOR, TABLE_ONE, 2).await.unwrap();
    assert!(game.is_some(), "second team at a table starts a game");

    let refused = manager.assign_table(id, DIRECTOR, TABLE_TWO, 3).await;
    assert!(matches!(refused, Err(TournamentError::Validation(msg)) if msg.contains("league")));

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.queue.order, vec![3]);
    assert_eq!(record.team(3).unwrap().current_table_id, None);
}

#[tokio::test]
async fn test_full_table_rejects_assignment() {
    let manager = manager(1);
    let id = started(&manager, TournamentSettings::default(), teams(3)).await;
    let waiting = manager.get_tournament(id).await.unwrap().queue.order[0];

    let result = manager.assign_table(id, DIRECTOR, TABLE_ONE, waiting).await;
    assert!(matches!(result, Err(TournamentError::InvalidTableState { .. })));
}

#[tokio::test]
async fn test_force_winner_stays_pins_team() {
    let manager = manager(1);
    let settings = TournamentSettings::default().with_autopilot(false);
    let id = started(&manager, settings, teams(3)).await;
    let head = manager.get_tournament(id).await.unwrap().queue.order[0];
    let pinned = if head == 2 { 1 } else { 2 };

    let game = manager
        .force_winner_stays(id, DIRECTOR, TABLE_ONE, pinned)
        .await
        .unwrap();
    assert!(game.is_some());

    let record = manager.get_tournament(id).await.unwrap();
    let table = &record.tables[&TABLE_ONE];
    assert_eq!(table.current_winning_team_id, Some(pinned));
    assert_eq!(table.occupants, vec![pinned, head]);
    assert_eq!(record.queue.len(), 1);
}

#[tokio::test]
async fn test_cancelled_game_can_be_restarted() {
    let manager = manager(1);
    let settings = TournamentSettings::default().with_autopilot(false);
    let id = started(&manager, settings, teams(2)).await;
    manager.assign_table(id, DIRECTOR, TABLE_ONE, 1).await.unwrap();
    let game_id = manager
        .assign_table(id, DIRECTOR, TABLE_ONE, 2)
        .await
        .unwrap()
        .unwrap();

    let requeued = manager
        .cancel_game(id, DIRECTOR, game_id, "cue ball cracked")
        .await
        .unwrap();
    assert_eq!(requeued.len(), 2);

    manager.restart_game(id, DIRECTOR, game_id).await.unwrap();
    let record = manager.get_tournament(id).await.unwrap();
    let game = &record.games[&game_id];
    assert_eq!(game.status, GameStatus::NotStarted);
    assert!(game.notes.iter().any(|n| n.contains("cue ball cracked")));
    assert!(record.queue.is_empty());
    assert_eq!(record.tables[&TABLE_ONE].status, TableStatus::InUse);

    manager.start_game(id, game_id).await.unwrap();
    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.games[&game_id].status, GameStatus::InProgress);
}

#[tokio::test]
async fn test_seeded_ordering_interleaves_ratings() {
    let manager = manager(1);
    let settings = TournamentSettings::default()
        .with_autopilot(false)
        .with_ordering(BracketOrdering::Seeded);
    let rated: Vec<NewTeam> = [400, 300, 200, 100]
        .into_iter()
        .enumerate()
        .map(|(n, rating)| {
            NewTeam::new(format!("Seed {n}"), vec![TeamMember::new(n as i64, "P")]).with_rating(rating)
        })
        .collect();
    let id = started(&manager, settings, rated).await;

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.queue.order, vec![1, 4, 2, 3]);
    assert_eq!(record.team(4).unwrap().queue_position, Some(2));
}

#[tokio::test]
async fn test_manual_ordering_follows_seeds() {
    let manager = manager(1);
    let settings = TournamentSettings::default()
        .with_autopilot(false)
        .with_ordering(BracketOrdering::Manual);
    let seeded = vec![
        NewTeam::new("Third", vec![TeamMember::new(1, "A")]).with_seed(3),
        NewTeam::new("Unseeded", vec![TeamMember::new(2, "B")]),
        NewTeam::new("First", vec![TeamMember::new(3, "C")]).with_seed(1),
    ];
    let id = started(&manager, settings, seeded).await;

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.queue.order, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_shuffle_only_when_enabled() {
    let manager = manager(1);
    let id = started(&manager, TournamentSettings::default(), teams(4)).await;
    assert!(matches!(
        manager.shuffle_queue(id, DIRECTOR).await,
        Err(TournamentError::Validation(_))
    ));

    let settings = TournamentSettings {
        random_reorder_per_round: true,
        ..TournamentSettings::default()
    };
    let id = started(&manager, settings, teams(4)).await;
    manager.shuffle_queue(id, DIRECTOR).await.unwrap();
    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.queue.shuffled_by, Some(DIRECTOR));
    assert_eq!(record.queue.len(), 2);
}
