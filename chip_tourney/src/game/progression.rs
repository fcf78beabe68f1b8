//! Game progression workflow.
//!
//! NotStarted → InProgress → Completed, or → Cancelled (which may be
//! restarted). Completion fans out into the chip ledger, table release,
//! autopilot refill and the tournament completion check, all against the
//! same record so the whole pipeline commits or fails as one.

use chrono::Utc;
use rand::Rng;

use super::models::{Game, GameId, GameStatus, ScoreReport};
use crate::chips::ledger;
use crate::errors::{TournamentError, TournamentResult};
use crate::queue::manager as queue;
use crate::queue::pairing;
use crate::table::assignment;
use crate::table::models::TableId;
use crate::tournament::lifecycle;
use crate::tournament::models::{TeamId, UserId};
use crate::tournament::record::TournamentRecord;

fn require_status(game: &Game, expected: &[GameStatus]) -> TournamentResult<()> {
    if expected.contains(&game.status) {
        Ok(())
    } else {
        Err(TournamentError::InvalidGameState {
            game_id: game.id,
            expected: expected.to_vec(),
            actual: game.status,
        })
    }
}

/// Create a game for the two teams seated at a table
///
/// Records the pairing for repeat-matchup avoidance.
pub fn create_game(record: &mut TournamentRecord, table_id: TableId) -> TournamentResult<GameId> {
    let table = record.table(table_id)?;
    let [team_a_id, team_b_id] = table.occupants[..] else {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: format!("a game needs 2 teams, {} seated", table.occupants.len()),
        });
    };
    if let Some(existing) = record.active_game_at(table_id) {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: format!("game {} is already active", existing.id),
        });
    }

    let game_id = record.sequences.next_game();
    let game = Game {
        id: game_id,
        table_id,
        game_number: record.games.len() as u32 + 1,
        race_to_wins: record.settings.race_to_wins,
        status: GameStatus::NotStarted,
        team_a_id,
        team_b_id,
        team_a_score: 0,
        team_b_score: 0,
        winning_team_id: None,
        losing_team_id: None,
        forfeited_by: None,
        scores_submitted: false,
        scores_approved: false,
        submitted_by: None,
        approved_by: None,
        chips_awarded: record.settings.chips_per_game,
        winner_stays: record.settings.winner_stays,
        notes: Vec::new(),
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
    };
    record.games.insert(game_id, game);
    pairing::record_pairing(record, team_a_id, team_b_id)?;
    assignment::refresh_status(record, table_id)?;

    log::debug!(
        "Tournament {}: game {} created at table {} ({} vs {})",
        record.id,
        game_id,
        table_id,
        team_a_id,
        team_b_id
    );
    Ok(game_id)
}

/// Begin play; both teams must be at the game's table
pub fn start(record: &mut TournamentRecord, game_id: GameId) -> TournamentResult<()> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::NotStarted])?;
    let table = record.table(game.table_id)?;
    if !game.teams().iter().all(|id| table.seats(*id)) {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: format!("both teams must be seated at table {}", table.id),
        });
    }

    let game = record.game_mut(game_id)?;
    game.status = GameStatus::InProgress;
    game.started_at = Some(Utc::now());
    Ok(())
}

/// Work out winner and loser for a report against a game
fn resolve_result(game: &Game, report: &ScoreReport) -> TournamentResult<(TeamId, TeamId)> {
    if let Some(forfeiter) = report.forfeited_by {
        let winner = game.opponent_of(forfeiter).ok_or_else(|| {
            TournamentError::validation(format!(
                "team {forfeiter} is not playing in game {}",
                game.id
            ))
        })?;
        return Ok((winner, forfeiter));
    }

    let (a, b) = (report.team_a_score, report.team_b_score);
    if a == b {
        return Err(TournamentError::validation(format!(
            "game {} cannot end in a tie ({a}-{b})",
            game.id
        )));
    }
    let (winner, loser, high, low) = if a > b {
        (game.team_a_id, game.team_b_id, a, b)
    } else {
        (game.team_b_id, game.team_a_id, b, a)
    };
    if high < game.race_to_wins {
        return Err(TournamentError::validation(format!(
            "winner must reach {} racks, reported {high}",
            game.race_to_wins
        )));
    }
    if low >= game.race_to_wins {
        return Err(TournamentError::validation(format!(
            "loser cannot reach the race of {}, reported {low}",
            game.race_to_wins
        )));
    }
    Ok((winner, loser))
}

fn write_result(game: &mut Game, report: &ScoreReport, winner: TeamId, loser: TeamId) {
    game.team_a_score = report.team_a_score;
    game.team_b_score = report.team_b_score;
    game.forfeited_by = report.forfeited_by;
    game.winning_team_id = Some(winner);
    game.losing_team_id = Some(loser);
}

/// Record reported scores
///
/// # Returns
///
/// * `bool` - `true` when auto-accept completed the game immediately
pub fn submit_scores<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    game_id: GameId,
    report: ScoreReport,
    submitted_by: UserId,
    rng: &mut R,
) -> TournamentResult<bool> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::NotStarted, GameStatus::InProgress])?;
    if game.scores_submitted {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "scores already submitted, awaiting approval".to_string(),
        });
    }
    let (winner, loser) = resolve_result(game, &report)?;

    let game = record.game_mut(game_id)?;
    write_result(game, &report, winner, loser);
    game.scores_submitted = true;
    game.submitted_by = Some(submitted_by);
    if game.status == GameStatus::NotStarted {
        game.status = GameStatus::InProgress;
        game.started_at = Some(Utc::now());
    }

    if record.settings.auto_accept_scores {
        complete(record, game_id, None, rng)?;
        return Ok(true);
    }
    Ok(false)
}

/// Director approval of submitted scores; runs the completion pipeline
pub fn approve_scores<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    game_id: GameId,
    director: UserId,
    rng: &mut R,
) -> TournamentResult<()> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::InProgress])?;
    if !game.scores_submitted {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "no scores submitted".to_string(),
        });
    }
    if game.scores_approved {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "scores already approved".to_string(),
        });
    }
    complete(record, game_id, Some(director), rng)
}

/// Mark a game completed and propagate its result
fn complete<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    game_id: GameId,
    approved_by: Option<UserId>,
    rng: &mut R,
) -> TournamentResult<()> {
    let game = record.game_mut(game_id)?;
    game.status = GameStatus::Completed;
    game.scores_approved = true;
    game.approved_by = approved_by;
    game.completed_at = Some(Utc::now());
    let (table_id, winner_stays) = (game.table_id, game.winner_stays);
    let (Some(winner), Some(loser)) = (game.winning_team_id, game.losing_team_id) else {
        return Err(TournamentError::InvariantViolation(format!(
            "game {game_id} completed without a result"
        )));
    };

    ledger::apply_game_result(record, game_id)?;
    ledger::settle_status(record, loser)?;
    ledger::settle_status(record, winner)?;

    if record.team(loser)?.current_table_id == Some(table_id) {
        assignment::release_to_queue(record, loser)?;
    }
    if record.team(winner)?.current_table_id == Some(table_id) {
        if winner_stays {
            record.table_mut(table_id)?.current_winning_team_id = Some(winner);
        } else {
            assignment::release_to_queue(record, winner)?;
        }
    }
    assignment::refresh_status(record, table_id)?;

    record.games_completed += 1;
    record.current_round = record.games_completed / 10 + 1;

    log::info!(
        "Tournament {}: game {} completed, team {} beat team {}",
        record.id,
        game_id,
        winner,
        loser
    );

    if !lifecycle::check_completion(record)? {
        assignment::process_automatic_assignments(record, rng)?;
    }
    Ok(())
}

/// Director correction of a completed game's result
///
/// The prior chip movement is reversed and the corrected result applied;
/// team status is settled only after both steps.
pub fn modify_scores(
    record: &mut TournamentRecord,
    game_id: GameId,
    report: ScoreReport,
    director: UserId,
    reason: &str,
) -> TournamentResult<()> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::Completed])?;
    let (winner, loser) = resolve_result(game, &report)?;
    let previous = game.teams();

    ledger::reverse_game_transactions(record, game_id, director)?;

    let game = record.game_mut(game_id)?;
    let before = (game.team_a_score, game.team_b_score);
    write_result(game, &report, winner, loser);
    game.approved_by = Some(director);
    game.notes.push(format!(
        "scores modified by {director} from {}-{} to {}-{}: {reason}",
        before.0, before.1, report.team_a_score, report.team_b_score
    ));

    ledger::apply_game_result(record, game_id)?;
    for team_id in previous {
        ledger::settle_status(record, team_id)?;
    }

    log::warn!(
        "Tournament {}: director {} modified game {} ({})",
        record.id,
        director,
        game_id,
        reason
    );
    Ok(())
}

/// Cancel a game without touching chips; its teams go back to the queue
pub fn cancel(
    record: &mut TournamentRecord,
    game_id: GameId,
    director: UserId,
    reason: &str,
) -> TournamentResult<Vec<TeamId>> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::NotStarted, GameStatus::InProgress])?;
    let table_id = game.table_id;

    cancel_in_place(record, game_id, &format!("cancelled by {director}: {reason}"))?;

    let occupants = record.table(table_id)?.occupants.clone();
    for team_id in &occupants {
        assignment::release_to_queue(record, *team_id)?;
    }

    log::info!(
        "Tournament {}: game {} cancelled by {} ({})",
        record.id,
        game_id,
        director,
        reason
    );
    Ok(occupants)
}

/// Flip an active game to Cancelled; callers handle the seated teams
pub(crate) fn cancel_in_place(
    record: &mut TournamentRecord,
    game_id: GameId,
    note: &str,
) -> TournamentResult<()> {
    let game = record.game_mut(game_id)?;
    require_status(game, &[GameStatus::NotStarted, GameStatus::InProgress])?;
    game.status = GameStatus::Cancelled;
    game.scores_submitted = false;
    game.submitted_by = None;
    game.notes.push(note.to_string());
    let table_id = game.table_id;
    assignment::refresh_status(record, table_id)
}

/// Bring a cancelled game back to NotStarted, reseating both teams
pub fn restart(
    record: &mut TournamentRecord,
    game_id: GameId,
    director: UserId,
) -> TournamentResult<()> {
    let game = record.game(game_id)?;
    require_status(game, &[GameStatus::Cancelled])?;
    let table_id = game.table_id;
    let teams = game.teams();

    let table = record.table(table_id)?;
    if let Some(active) = record.active_game_at(table_id) {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: format!("game {} is active", active.id),
        });
    }
    if table.occupants.iter().any(|id| !teams.contains(id)) {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "table is occupied by other teams".to_string(),
        });
    }

    for team_id in teams {
        let team = record.team(team_id)?;
        if !team.is_active() {
            return Err(TournamentError::InvalidTeamState {
                team_id,
                reason: "eliminated".to_string(),
            });
        }
        match team.current_table_id {
            Some(current) if current == table_id => continue,
            Some(current) => {
                if let Some(g) = record.active_game_at(current) {
                    return Err(TournamentError::InvalidTeamState {
                        team_id,
                        reason: format!("playing game {} at table {current}", g.id),
                    });
                }
                assignment::unseat(record, team_id)?;
            }
            None if team.is_queued => queue::remove_team(record, team_id)?,
            None => {}
        }
        assignment::seat(record, table_id, team_id)?;
    }

    let game = record.game_mut(game_id)?;
    game.status = GameStatus::NotStarted;
    game.team_a_score = 0;
    game.team_b_score = 0;
    game.winning_team_id = None;
    game.losing_team_id = None;
    game.forfeited_by = None;
    game.started_at = None;
    game.notes.push(format!("restarted by {director}"));
    assignment::refresh_status(record, table_id)?;
    Ok(())
}

/// Games currently occupying tables
pub fn active_games(record: &TournamentRecord) -> Vec<&Game> {
    record.games.values().filter(|g| g.status.is_active()).collect()
}

/// Games in creation order, optionally only those involving one team
pub fn game_history(record: &TournamentRecord, team_id: Option<TeamId>) -> Vec<&Game> {
    record
        .games
        .values()
        .filter(|g| team_id.is_none_or(|id| g.involves(id)))
        .collect()
}
