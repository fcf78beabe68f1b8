//! Tournament lifecycle transitions on a record.

use chrono::{NaiveDate, Utc};
use rand::Rng;

use std::collections::HashSet;

use super::models::{
    MAX_SKILL_RATING, MIN_SKILL_RATING, NewTeam, Standing, Team, TeamId, TournamentStatus,
};
use super::record::TournamentRecord;
use crate::chips::ledger;
use crate::errors::{TournamentError, TournamentResult};
use crate::game::models::GameId;
use crate::game::progression;
use crate::money::calculator;
use crate::queue::manager as queue;
use crate::table::assignment;

/// Minimum teams needed to start
pub const MIN_TEAMS_TO_START: usize = 2;

/// Register a team while the tournament is in setup
///
/// # Errors
///
/// * `InvalidTournamentState` - Registration is closed
/// * `Validation` - Empty or duplicate name, no members, a player already
///   registered, a rating out of range, or the field is full
pub fn register_team(record: &mut TournamentRecord, request: NewTeam) -> TournamentResult<TeamId> {
    record.require_status(&[TournamentStatus::Setup])?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(TournamentError::validation("team name is required"));
    }
    if record.teams.values().any(|t| t.name.eq_ignore_ascii_case(&name)) {
        return Err(TournamentError::validation(format!(
            "team name '{name}' is taken"
        )));
    }
    if request.members.is_empty() {
        return Err(TournamentError::validation("a team needs at least one player"));
    }
    if let Some(max) = record.settings.max_teams {
        if record.teams.len() >= max {
            return Err(TournamentError::validation(format!(
                "tournament is full ({max} teams)"
            )));
        }
    }

    let mut registered: HashSet<_> = record
        .teams
        .values()
        .flat_map(|t| t.members.iter().map(|m| m.player_id))
        .collect();
    for member in &request.members {
        if !registered.insert(member.player_id) {
            return Err(TournamentError::validation(format!(
                "player {} is already registered",
                member.player_id
            )));
        }
        if let Some(rating) = member.skill_rating {
            if !(MIN_SKILL_RATING..=MAX_SKILL_RATING).contains(&rating) {
                return Err(TournamentError::validation(format!(
                    "rating {rating} of player {} is outside {MIN_SKILL_RATING}..={MAX_SKILL_RATING}",
                    member.player_id
                )));
            }
        }
    }

    let id = record.sequences.next_team();
    let team = Team::new(id, NewTeam { name, ..request });
    record.teams.insert(id, team);
    log::debug!("Tournament {}: team {id} registered", record.id);
    Ok(id)
}

/// Withdraw a team before the tournament starts
pub fn unregister_team(record: &mut TournamentRecord, team_id: TeamId) -> TournamentResult<()> {
    record.require_status(&[TournamentStatus::Setup])?;
    record
        .teams
        .remove(&team_id)
        .map(|_| ())
        .ok_or(TournamentError::TeamNotFound(team_id))
}

/// Setup → InProgress: deal chips, order the queue, seat the first games
///
/// # Returns
///
/// * `Vec<GameId>` - Games created by initial assignment (autopilot only)
pub fn start<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    today: NaiveDate,
    rng: &mut R,
) -> TournamentResult<Vec<GameId>> {
    record.require_status(&[TournamentStatus::Setup])?;
    if record.teams.len() < MIN_TEAMS_TO_START {
        return Err(TournamentError::validation(format!(
            "need at least {MIN_TEAMS_TO_START} teams to start, have {}",
            record.teams.len()
        )));
    }

    record.status = TournamentStatus::InProgress;
    record.started_at = Some(Utc::now());
    record.current_round = 1;

    ledger::initialize_all_teams(record, today)?;
    let ordering = record.settings.bracket_ordering;
    queue::initialize(record, ordering, rng);

    let games = if record.settings.autopilot {
        assignment::initial_assignments(record)?
    } else {
        Vec::new()
    };

    log::info!(
        "Tournament {} started with {} teams on {} tables",
        record.id,
        record.teams.len(),
        record.tables.len()
    );
    Ok(games)
}

pub fn pause(record: &mut TournamentRecord) -> TournamentResult<()> {
    record.require_status(&[TournamentStatus::InProgress])?;
    record.status = TournamentStatus::Paused;
    Ok(())
}

/// Restart play; any active team left without a seat or a queue spot is
/// put back at the end of the queue
pub fn resume(record: &mut TournamentRecord) -> TournamentResult<()> {
    record.require_status(&[TournamentStatus::Paused])?;
    record.status = TournamentStatus::InProgress;
    for team_id in queue::teams_to_requeue(record) {
        log::warn!(
            "Tournament {}: team {} was neither seated nor queued, re-queued on resume",
            record.id,
            team_id
        );
        queue::add_team(record, team_id)?;
    }
    Ok(())
}

/// Complete the tournament once at most one team still has chips
///
/// # Returns
///
/// * `bool` - `true` if the tournament is now completed
pub fn check_completion(record: &mut TournamentRecord) -> TournamentResult<bool> {
    let running = matches!(
        record.status,
        TournamentStatus::InProgress | TournamentStatus::Paused
    );
    if !running || record.active_team_count() > 1 {
        return Ok(false);
    }
    finish(record)?;
    Ok(true)
}

/// Director ends the tournament regardless of teams remaining
pub fn complete(record: &mut TournamentRecord) -> TournamentResult<()> {
    record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
    finish(record)
}

/// Stop all play, clear seating and the queue, and assign final payouts
fn finish(record: &mut TournamentRecord) -> TournamentResult<()> {
    let active: Vec<GameId> = progression::active_games(record)
        .iter()
        .map(|g| g.id)
        .collect();
    for game_id in active {
        progression::cancel_in_place(record, game_id, "cancelled: tournament completed")?;
    }

    let seated: Vec<_> = record
        .teams
        .values()
        .filter(|t| t.current_table_id.is_some())
        .map(|t| t.id)
        .collect();
    for team_id in seated {
        assignment::unseat(record, team_id)?;
    }
    for team_id in record.queue.order.clone() {
        queue::remove_team(record, team_id)?;
    }

    record.status = TournamentStatus::Completed;
    record.completed_at = Some(Utc::now());
    calculator::final_payouts(record)?;

    log::info!(
        "Tournament {} completed after {} games, {} payout(s) assigned",
        record.id,
        record.games_completed,
        record.payouts.iter().filter(|p| p.team_id.is_some()).count()
    );
    Ok(())
}

/// Current ranking: surviving teams first, then chips, then chips won
pub fn standings(record: &TournamentRecord) -> Vec<Standing> {
    calculator::rank_teams(record)
        .into_iter()
        .enumerate()
        .map(|(idx, team)| Standing {
            rank: idx + 1,
            team_id: team.id,
            name: team.name.clone(),
            status: team.status,
            current_chips: team.current_chips,
            total_chips_won: team.total_chips_won,
            total_chips_lost: team.total_chips_lost,
        })
        .collect()
}
