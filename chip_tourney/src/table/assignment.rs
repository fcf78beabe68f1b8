//! Table assignment state machine.
//!
//! Tables cycle Open → InUse → Open as games are created and resolved;
//! Closed is a director-controlled side state. Every function here keeps
//! a team's `current_table_id` in step with table occupancy and never
//! leaves a team both seated and queued.

use chrono::Utc;
use rand::Rng;

use super::models::{TableId, TableStatus};
use super::venue::EligibilityPolicy;
use crate::errors::{TournamentError, TournamentResult};
use crate::game::models::GameId;
use crate::game::progression;
use crate::queue::manager as queue;
use crate::tournament::models::{TeamId, UserId};
use crate::tournament::record::TournamentRecord;

/// Seat an idle team at a table
pub(crate) fn seat(
    record: &mut TournamentRecord,
    table_id: TableId,
    team_id: TeamId,
) -> TournamentResult<()> {
    let team = record.team(team_id)?;
    if !team.is_active() {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "eliminated teams cannot be seated".to_string(),
        });
    }
    if team.is_queued {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "must leave the queue before being seated".to_string(),
        });
    }
    if let Some(current) = team.current_table_id {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: format!("already seated at table {current}"),
        });
    }

    let table = record.table_mut(table_id)?;
    if table.status == TableStatus::Closed {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "cannot seat teams at a closed table".to_string(),
        });
    }
    if table.is_full() {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "table is full".to_string(),
        });
    }
    table.occupants.push(team_id);
    table.last_assigned_at = Some(Utc::now());
    record.team_mut(team_id)?.current_table_id = Some(table_id);
    Ok(())
}

/// Take a team off whatever table it occupies
///
/// # Returns
///
/// * `Option<TableId>` - The table it left, if it was seated
pub(crate) fn unseat(
    record: &mut TournamentRecord,
    team_id: TeamId,
) -> TournamentResult<Option<TableId>> {
    let Some(table_id) = record.team(team_id)?.current_table_id else {
        return Ok(None);
    };
    let table = record.table_mut(table_id)?;
    table.occupants.retain(|id| *id != team_id);
    if table.current_winning_team_id == Some(team_id) {
        table.current_winning_team_id = None;
    }
    record.team_mut(team_id)?.current_table_id = None;
    refresh_status(record, table_id)?;
    Ok(Some(table_id))
}

/// Unseat a team and, if it is still in the tournament, queue it
pub(crate) fn release_to_queue(
    record: &mut TournamentRecord,
    team_id: TeamId,
) -> TournamentResult<()> {
    unseat(record, team_id)?;
    if record.team(team_id)?.is_idle() {
        queue::add_team(record, team_id)?;
    }
    Ok(())
}

/// Derive Open / InUse from the games at the table; Closed is left alone
pub(crate) fn refresh_status(record: &mut TournamentRecord, table_id: TableId) -> TournamentResult<()> {
    let busy = record.active_game_at(table_id).is_some();
    let table = record.table_mut(table_id)?;
    if table.status != TableStatus::Closed {
        table.status = if busy {
            TableStatus::InUse
        } else {
            TableStatus::Open
        };
    }
    Ok(())
}

/// Pop a team off the queue and seat it
fn seat_from_queue(
    record: &mut TournamentRecord,
    table_id: TableId,
    team_id: TeamId,
) -> TournamentResult<()> {
    queue::remove_team(record, team_id)?;
    seat(record, table_id, team_id)
}

fn assignable_tables(record: &TournamentRecord) -> Vec<TableId> {
    record
        .tables
        .values()
        .filter(|t| t.is_assignable() && record.active_game_at(t.id).is_none())
        .map(|t| t.id)
        .collect()
}

/// Another open table holds a single team with no game to play
fn waiting_elsewhere(record: &TournamentRecord, table_id: TableId) -> bool {
    record.tables.values().any(|t| {
        t.id != table_id
            && t.is_assignable()
            && t.occupants.len() == 1
            && record.active_game_at(t.id).is_none()
    })
}

/// Fill every empty open table with the queue head, two at a time
///
/// # Returns
///
/// * `Vec<GameId>` - Games created, one per filled table
pub fn initial_assignments(record: &mut TournamentRecord) -> TournamentResult<Vec<GameId>> {
    let mut games = Vec::new();
    for table_id in assignable_tables(record) {
        if !record.table(table_id)?.occupants.is_empty() {
            continue;
        }
        if record.queue.len() < 2 {
            break;
        }
        let first = record.queue.order[0];
        let second = record.queue.order[1];
        seat_from_queue(record, table_id, first)?;
        seat_from_queue(record, table_id, second)?;
        games.push(progression::create_game(record, table_id)?);
    }

    log::info!(
        "Tournament {}: initial assignments created {} game(s)",
        record.id,
        games.len()
    );
    Ok(games)
}

/// Refill open tables after play moves on (autopilot only)
///
/// A lone pinned anchor (a winner that stays, or a team a director forced
/// to hold the table) gets its next opponent from the queue. Any other
/// partially seated table is cleared back to the queue and then
/// drawn fresh. The queue is reshuffled afterwards when the tournament
/// reorders between rounds.
pub fn process_automatic_assignments<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    rng: &mut R,
) -> TournamentResult<Vec<GameId>> {
    if !record.settings.autopilot {
        return Ok(Vec::new());
    }

    let mut games = Vec::new();
    for table_id in assignable_tables(record) {
        let table = record.table(table_id)?;
        if table.is_full() {
            // Two teams seated without a game, e.g. after a restart was abandoned
            games.push(progression::create_game(record, table_id)?);
            continue;
        }

        let lone = (table.occupants.len() == 1).then(|| table.occupants[0]);
        let pinned_anchor = table.current_winning_team_id;
        if let Some(anchor) = lone {
            if pinned_anchor == Some(anchor) {
                match queue::next_team_for_table(record, table_id)? {
                    Some(opponent) => {
                        seat_from_queue(record, table_id, opponent)?;
                        games.push(progression::create_game(record, table_id)?);
                    }
                    // Queue is dry: give up the seat so another lone team can play it
                    None if waiting_elsewhere(record, table_id) => {
                        release_to_queue(record, anchor)?;
                    }
                    None => {}
                }
                continue;
            }
            release_to_queue(record, anchor)?;
        }

        if record.queue.len() < 2 {
            continue;
        }
        let first = record.queue.order[0];
        seat_from_queue(record, table_id, first)?;
        let Some(second) = queue::next_team_for_table(record, table_id)? else {
            release_to_queue(record, first)?;
            continue;
        };
        seat_from_queue(record, table_id, second)?;
        games.push(progression::create_game(record, table_id)?);
    }

    if record.settings.random_reorder_per_round && !games.is_empty() {
        queue::shuffle_order(record, None, rng);
    }

    if !games.is_empty() {
        log::debug!(
            "Tournament {}: autopilot created {} game(s)",
            record.id,
            games.len()
        );
    }
    Ok(games)
}

/// Director override: move a team onto a specific table
///
/// # Returns
///
/// * `Option<GameId>` - A new game when the table now seats two teams
///
/// # Errors
///
/// Fails if the table is closed or full, the team is mid-game elsewhere,
/// or the eligibility policy rejects the seating
pub fn manual_assignment(
    record: &mut TournamentRecord,
    table_id: TableId,
    team_id: TeamId,
    eligibility: &dyn EligibilityPolicy,
) -> TournamentResult<Option<GameId>> {
    let table = record.table(table_id)?;
    if table.status == TableStatus::Closed || table.is_full() {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "no free seat".to_string(),
        });
    }
    let team = record.team(team_id)?;
    if team.current_table_id == Some(table_id) {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: format!("already seated at table {table_id}"),
        });
    }
    if !team.is_active() {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "eliminated teams cannot be seated".to_string(),
        });
    }
    if let Err(reason) = eligibility.check(record, team, table) {
        return Err(TournamentError::validation(format!(
            "team {team_id} is not eligible for table {table_id}: {reason}"
        )));
    }

    if let Some(current) = team.current_table_id {
        if let Some(game) = record.active_game_at(current).filter(|g| g.involves(team_id)) {
            return Err(TournamentError::InvalidTeamState {
                team_id,
                reason: format!("playing game {} at table {current}", game.id),
            });
        }
        unseat(record, team_id)?;
    }
    if record.team(team_id)?.is_queued {
        queue::remove_team(record, team_id)?;
    }
    seat(record, table_id, team_id)?;

    let game = if record.table(table_id)?.is_full() {
        Some(progression::create_game(record, table_id)?)
    } else {
        None
    };

    log::info!(
        "Tournament {}: team {} manually assigned to table {}",
        record.id,
        team_id,
        table_id
    );
    Ok(game)
}

/// Take a table out of rotation, returning every occupant to the queue
///
/// An active game at the table is cancelled without touching the ledger.
pub fn close_table(
    record: &mut TournamentRecord,
    table_id: TableId,
    closed_by: UserId,
) -> TournamentResult<Vec<TeamId>> {
    let table = record.table(table_id)?;
    if table.status == TableStatus::Closed {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "already closed".to_string(),
        });
    }

    if let Some(game_id) = record.active_game_at(table_id).map(|g| g.id) {
        progression::cancel_in_place(record, game_id, "table closed")?;
    }

    let occupants = record.table(table_id)?.occupants.clone();
    for team_id in &occupants {
        release_to_queue(record, *team_id)?;
    }

    let table = record.table_mut(table_id)?;
    table.status = TableStatus::Closed;
    table.current_winning_team_id = None;
    table.closed_by = Some(closed_by);
    table.closed_at = Some(Utc::now());

    log::info!(
        "Tournament {}: table {} closed by {}, {} team(s) requeued",
        record.id,
        table_id,
        closed_by,
        occupants.len()
    );
    Ok(occupants)
}

/// Return a closed table to rotation
pub fn open_table(record: &mut TournamentRecord, table_id: TableId) -> TournamentResult<()> {
    let table = record.table_mut(table_id)?;
    if table.status != TableStatus::Closed {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "only closed tables can be opened".to_string(),
        });
    }
    table.status = TableStatus::Open;
    table.closed_by = None;
    table.closed_at = None;
    Ok(())
}

/// Director override: pin a team at a table and draw its next opponent
///
/// Other occupants go back to the queue.
pub fn force_winner_stays(
    record: &mut TournamentRecord,
    table_id: TableId,
    team_id: TeamId,
) -> TournamentResult<Option<GameId>> {
    let table = record.table(table_id)?;
    if table.status == TableStatus::Closed {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: "table is closed".to_string(),
        });
    }
    if let Some(game) = record.active_game_at(table_id) {
        return Err(TournamentError::InvalidTableState {
            table_id,
            status: table.status,
            reason: format!("game {} is still active", game.id),
        });
    }
    let team = record.team(team_id)?;
    if !team.is_active() {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "eliminated teams cannot hold a table".to_string(),
        });
    }
    if let Some(current) = team.current_table_id.filter(|t| *t != table_id) {
        if let Some(game) = record.active_game_at(current).filter(|g| g.involves(team_id)) {
            return Err(TournamentError::InvalidTeamState {
                team_id,
                reason: format!("playing game {} at table {current}", game.id),
            });
        }
    }

    let others: Vec<TeamId> = table
        .occupants
        .iter()
        .copied()
        .filter(|id| *id != team_id)
        .collect();
    for other in others {
        release_to_queue(record, other)?;
    }

    if record.team(team_id)?.current_table_id != Some(table_id) {
        unseat(record, team_id)?;
        if record.team(team_id)?.is_queued {
            queue::remove_team(record, team_id)?;
        }
        seat(record, table_id, team_id)?;
    }
    record.table_mut(table_id)?.current_winning_team_id = Some(team_id);

    let game = match queue::next_team_for_table(record, table_id)? {
        Some(opponent) => {
            seat_from_queue(record, table_id, opponent)?;
            Some(progression::create_game(record, table_id)?)
        }
        None => None,
    };

    log::info!(
        "Tournament {}: team {} pinned at table {}",
        record.id,
        team_id,
        table_id
    );
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::models::Table;
    use crate::table::venue::AllowAll;
    use crate::tournament::models::{NewTeam, Team, TeamMember, TournamentSettings, TournamentStatus};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn record(teams: usize, tables: usize) -> TournamentRecord {
        let tables = (1..=tables as i64)
            .map(|id| Table::new(id, 1, format!("Table {id}"), true))
            .collect();
        let mut record =
            TournamentRecord::new(1, "Assign", 1, TournamentSettings::default(), tables, 100);
        for _ in 0..teams {
            let id = record.sequences.next_team();
            let mut team = Team::new(
                id,
                NewTeam::new(format!("Team {id}"), vec![TeamMember::new(id, "P")]),
            );
            team.current_chips = 3;
            team.initial_chips = 3;
            record.teams.insert(id, team);
            queue::add_team(&mut record, id).unwrap();
        }
        record.status = TournamentStatus::InProgress;
        record
    }

    #[test]
    fn test_initial_assignments_pair_queue_head() {
        let mut record = record(5, 2);
        let games = initial_assignments(&mut record).unwrap();

        assert_eq!(games.len(), 2);
        assert_eq!(record.table(1).unwrap().occupants, vec![1, 2]);
        assert_eq!(record.table(2).unwrap().occupants, vec![3, 4]);
        assert_eq!(record.table(1).unwrap().status, TableStatus::InUse);
        assert_eq!(record.queue.order, vec![5]);
        assert_eq!(record.team(5).unwrap().queue_position, Some(1));
        assert!(!record.team(1).unwrap().is_queued);
    }

    #[test]
    fn test_close_table_requeues_each_occupant_once() {
        let mut record = record(4, 1);
        initial_assignments(&mut record).unwrap();
        let ledger_before = record.ledger.len();

        close_table(&mut record, 1, 100).unwrap();

        let table = record.table(1).unwrap();
        assert_eq!(table.status, TableStatus::Closed);
        assert!(table.occupants.is_empty());
        assert_eq!(record.queue.order, vec![3, 4, 1, 2]);
        assert_eq!(record.ledger.len(), ledger_before, "closing must not touch chips");
        assert!(record.active_game_at(1).is_none());
    }

    #[test]
    fn test_closed_table_rejects_seating_until_opened() {
        let mut record = record(2, 1);
        close_table(&mut record, 1, 100).unwrap();
        assert!(manual_assignment(&mut record, 1, 1, &AllowAll).is_err());

        open_table(&mut record, 1).unwrap();
        assert_eq!(manual_assignment(&mut record, 1, 1, &AllowAll).unwrap(), None);
        assert!(manual_assignment(&mut record, 1, 2, &AllowAll).unwrap().is_some());
    }

    #[test]
    fn test_manual_assignment_refuses_team_mid_game() {
        let mut record = record(3, 2);
        initial_assignments(&mut record).unwrap();
        let err = manual_assignment(&mut record, 2, 1, &AllowAll).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidTeamState { team_id: 1, .. }));
    }

    #[test]
    fn test_force_winner_stays_requeues_others() {
        let mut record = record(3, 1);
        seat_from_queue(&mut record, 1, 1).unwrap();
        seat_from_queue(&mut record, 1, 2).unwrap();

        let game = force_winner_stays(&mut record, 1, 1).unwrap();

        assert!(game.is_some());
        let table = record.table(1).unwrap();
        assert_eq!(table.current_winning_team_id, Some(1));
        assert_eq!(table.occupants, vec![1, 3]);
        assert_eq!(record.queue.order, vec![2]);
    }

    #[test]
    fn test_automatic_assignment_clears_unpinned_lone_team() {
        let mut record = record(3, 1);
        seat_from_queue(&mut record, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let games = process_automatic_assignments(&mut record, &mut rng).unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(record.table(1).unwrap().occupants, vec![2, 3]);
        assert_eq!(record.queue.order, vec![1]);
    }

    #[test]
    fn test_stranded_winners_are_merged() {
        let mut record = record(2, 2);
        seat_from_queue(&mut record, 1, 1).unwrap();
        seat_from_queue(&mut record, 2, 2).unwrap();
        record.table_mut(1).unwrap().current_winning_team_id = Some(1);
        record.table_mut(2).unwrap().current_winning_team_id = Some(2);
        let mut rng = StdRng::seed_from_u64(3);

        let games = process_automatic_assignments(&mut record, &mut rng).unwrap();

        assert_eq!(games.len(), 1);
        assert!(record.table(1).unwrap().occupants.is_empty());
        assert_eq!(record.table(2).unwrap().occupants, vec![2, 1]);
        assert!(record.queue.is_empty());
    }

    #[test]
    fn test_forced_pin_survives_autopilot_without_winner_stays() {
        let mut record = record(3, 2);
        record.settings.winner_stays = false;
        seat_from_queue(&mut record, 2, 2).unwrap();
        seat_from_queue(&mut record, 2, 3).unwrap();
        progression::create_game(&mut record, 2).unwrap();

        assert_eq!(force_winner_stays(&mut record, 1, 1).unwrap(), None);
        let mut rng = StdRng::seed_from_u64(3);
        let games = process_automatic_assignments(&mut record, &mut rng).unwrap();

        assert!(games.is_empty());
        let table = record.table(1).unwrap();
        assert_eq!(table.occupants, vec![1]);
        assert_eq!(table.current_winning_team_id, Some(1));
        assert!(record.queue.is_empty());
        assert!(!record.team(1).unwrap().is_queued);
    }

    #[test]
    fn test_automatic_assignment_noop_without_autopilot() {
        let mut record = record(4, 2);
        record.settings.autopilot = false;
        let mut rng = StdRng::seed_from_u64(3);
        assert!(process_automatic_assignments(&mut record, &mut rng).unwrap().is_empty());
    }
}
