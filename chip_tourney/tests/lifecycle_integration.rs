//! Integration tests for the tournament lifecycle.
//!
//! Drives tournaments through the async manager against the in-memory
//! repository: registration, start, play to the last team, and payouts.

use chip_tourney::TournamentError;
use chip_tourney::db::MemoryTournamentRepository;
use chip_tourney::game::{GameStatus, ScoreReport};
use chip_tourney::table::StaticVenueCatalog;
use chip_tourney::tournament::{
    NewTeam, TeamMember, TeamStatus, TournamentId, TournamentManager, TournamentSettings,
    TournamentStatus,
};
use std::sync::Arc;

const DIRECTOR: i64 = 1;
const VENUE: i64 = 7;

fn manager(tables: usize) -> TournamentManager {
    TournamentManager::new(Arc::new(MemoryTournamentRepository::new()))
        .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(VENUE, tables)))
}

async fn tournament_with_teams(
    manager: &TournamentManager,
    settings: TournamentSettings,
    teams: usize,
) -> TournamentId {
    let id = manager
        .create_tournament("Lifecycle Open", VENUE, settings, DIRECTOR)
        .await
        .expect("create tournament");
    for n in 0..teams as i64 {
        let team = NewTeam::new(
            format!("Team {n}"),
            vec![TeamMember::new(1000 + 2 * n, "Lead"), TeamMember::new(1001 + 2 * n, "Break")],
        );
        manager.add_team(id, DIRECTOR, team).await.expect("add team");
    }
    id
}

/// Submit and approve games (first-seated team wins) until the tournament ends
async fn play_out(manager: &TournamentManager, id: TournamentId) -> usize {
    let mut played = 0;
    for _ in 0..1000 {
        let record = manager.get_tournament(id).await.unwrap();
        if record.status == TournamentStatus::Completed {
            return played;
        }
        let game = manager
            .active_games(id)
            .await
            .unwrap()
            .into_iter()
            .next()
            .expect("a running tournament always has a game in play");

        let report = ScoreReport::new(game.race_to_wins, 0);
        manager
            .submit_scores(id, game.id, report, game.team_a_id)
            .await
            .unwrap();
        manager.approve_scores(id, DIRECTOR, game.id).await.unwrap();
        played += 1;
    }
    panic!("tournament {id} did not finish");
}

#[tokio::test]
async fn test_full_tournament_runs_to_single_survivor() {
    let manager = manager(2);
    let settings = TournamentSettings::default().with_fees(2000, 500, 0);
    let id = tournament_with_teams(&manager, settings, 6).await;

    let games = manager.start(id, DIRECTOR).await.unwrap();
    assert_eq!(games.len(), 2, "two tables seat four of six teams");

    let played = play_out(&manager, id).await;
    assert!(played >= 15, "every team but one must lose 3 chips, played {played}");

    let record = manager.get_tournament(id).await.unwrap();
    let survivors: Vec<_> = record.teams.values().filter(|t| t.is_active()).collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].current_chips, 18, "all chips end with the winner");
    assert!(record.queue.is_empty());
    assert!(record.tables.values().all(|t| t.occupants.is_empty()));

    let standings = manager.standings(id).await.unwrap();
    assert_eq!(standings[0].team_id, survivors[0].id);
    assert_eq!(standings[0].status, TeamStatus::Active);

    // 6 teams pay two places (60/40) from 6 x 15.00
    let payouts = &record.payouts;
    assert_eq!(payouts.len(), 2);
    assert_eq!(payouts[0].amount, 5400);
    assert_eq!(payouts[1].amount, 3600);
    assert_eq!(payouts[0].team_id, Some(survivors[0].id));
    assert_eq!(payouts[1].team_id, Some(standings[1].team_id));
}

#[tokio::test]
async fn test_registration_closes_at_start() {
    let manager = manager(1);
    let id = tournament_with_teams(&manager, TournamentSettings::default(), 2).await;
    manager.start(id, DIRECTOR).await.unwrap();

    let late = NewTeam::new("Latecomers", vec![TeamMember::new(9000, "Late")]);
    let result = manager.add_team(id, DIRECTOR, late).await;
    assert!(matches!(
        result,
        Err(TournamentError::InvalidTournamentState { actual: TournamentStatus::InProgress, .. })
    ));
    assert!(manager.start(id, DIRECTOR).await.is_err(), "cannot start twice");
}

#[tokio::test]
async fn test_start_requires_two_teams() {
    let manager = manager(1);
    let id = tournament_with_teams(&manager, TournamentSettings::default(), 1).await;
    let result = manager.start(id, DIRECTOR).await;
    assert!(matches!(result, Err(TournamentError::Validation(_))));
}

#[tokio::test]
async fn test_pause_blocks_play_until_resumed() {
    let manager = manager(1);
    let id = tournament_with_teams(&manager, TournamentSettings::default(), 2).await;
    let games = manager.start(id, DIRECTOR).await.unwrap();
    let game = manager.get_tournament(id).await.unwrap().games[&games[0]].clone();

    manager.pause(id, DIRECTOR).await.unwrap();
    let blocked = manager
        .submit_scores(id, game.id, ScoreReport::new(1, 0), game.team_a_id)
        .await;
    assert!(blocked.is_err(), "scores cannot be submitted while paused");

    manager.resume(id, DIRECTOR).await.unwrap();
    manager
        .submit_scores(id, game.id, ScoreReport::new(1, 0), game.team_a_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_manual_completion_cancels_games_and_pays_leaders() {
    let manager = manager(2);
    let settings = TournamentSettings::default().with_fees(1000, 0, 0);
    let id = tournament_with_teams(&manager, settings, 4).await;
    let games = manager.start(id, DIRECTOR).await.unwrap();

    // One result so the standings have a clear leader
    let record = manager.get_tournament(id).await.unwrap();
    let first = record.games[&games[0]].clone();
    manager
        .submit_scores(id, first.id, ScoreReport::new(1, 0), first.team_a_id)
        .await
        .unwrap();
    manager.approve_scores(id, DIRECTOR, first.id).await.unwrap();

    manager.complete(id, DIRECTOR).await.unwrap();

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.status, TournamentStatus::Completed);
    assert!(record.games.values().all(|g| g.status != GameStatus::InProgress
        && g.status != GameStatus::NotStarted));
    assert_eq!(record.payouts[0].team_id, Some(first.team_a_id));
    assert_eq!(record.payouts.iter().map(|p| p.amount).sum::<i64>(), 4000);

    let after = manager.pause(id, DIRECTOR).await;
    assert!(after.is_err(), "completed tournaments are final");
}

#[tokio::test]
async fn test_auto_accept_completes_on_submission() {
    let manager = manager(1);
    let settings = TournamentSettings {
        auto_accept_scores: true,
        ..TournamentSettings::default()
    };
    let id = tournament_with_teams(&manager, settings, 3).await;
    let games = manager.start(id, DIRECTOR).await.unwrap();
    let game = manager.get_tournament(id).await.unwrap().games[&games[0]].clone();

    let completed = manager
        .submit_scores(id, game.id, ScoreReport::new(1, 0), game.team_b_id)
        .await
        .unwrap();
    assert!(completed);

    let record = manager.get_tournament(id).await.unwrap();
    assert_eq!(record.games[&game.id].status, GameStatus::Completed);
    assert_eq!(record.games.len(), 2, "winner stays and the waiting team is seated");
}

#[tokio::test]
async fn test_listing_reflects_status() {
    let manager = manager(1);
    let first = tournament_with_teams(&manager, TournamentSettings::default(), 2).await;
    let _second = tournament_with_teams(&manager, TournamentSettings::default(), 2).await;
    manager.start(first, DIRECTOR).await.unwrap();

    let listing = manager.list_tournaments().await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].status, TournamentStatus::InProgress);
    assert_eq!(listing[1].status, TournamentStatus::Setup);
    assert!(listing[0].version > listing[1].version);
}
