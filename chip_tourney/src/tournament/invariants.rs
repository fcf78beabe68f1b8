//! Consistency checks run on every record before it is stored.

use std::collections::HashMap;

use super::models::TeamStatus;
use super::record::TournamentRecord;
use crate::chips::ledger;
use crate::errors::{TournamentError, TournamentResult};
use crate::table::models::{TABLE_CAPACITY, TableId, TableStatus};

fn violation(msg: String) -> TournamentError {
    TournamentError::InvariantViolation(msg)
}

/// Verify every cross-component invariant of a record
///
/// # Errors
///
/// Returns `TournamentError::InvariantViolation` naming the first broken rule
pub fn verify(record: &TournamentRecord) -> TournamentResult<()> {
    verify_chips(record)?;
    verify_queue(record)?;
    verify_seating(record)?;
    verify_games(record)
}

fn verify_chips(record: &TournamentRecord) -> TournamentResult<()> {
    for team in record.teams.values() {
        let replayed = ledger::replay_balance(record, team.id);
        if replayed != team.current_chips as i64 {
            return Err(violation(format!(
                "team {} holds {} chips but its ledger sums to {replayed}",
                team.id, team.current_chips
            )));
        }
        if record.has_started() && (team.current_chips == 0) != (team.status == TeamStatus::Eliminated)
        {
            return Err(violation(format!(
                "team {} has {} chips with status {:?}",
                team.id, team.current_chips, team.status
            )));
        }
    }
    Ok(())
}

fn verify_queue(record: &TournamentRecord) -> TournamentResult<()> {
    let mut seen = HashMap::new();
    for (idx, team_id) in record.queue.order.iter().enumerate() {
        if seen.insert(*team_id, idx).is_some() {
            return Err(violation(format!("team {team_id} queued twice")));
        }
        let team = record.team(*team_id)?;
        if !team.is_queued || team.queue_position != Some(idx + 1) {
            return Err(violation(format!(
                "team {team_id} at queue slot {} has position {:?}",
                idx + 1,
                team.queue_position
            )));
        }
        if team.status == TeamStatus::Eliminated {
            return Err(violation(format!("eliminated team {team_id} is queued")));
        }
    }
    for team in record.teams.values() {
        if team.is_queued && !seen.contains_key(&team.id) {
            return Err(violation(format!(
                "team {} flagged queued but missing from queue",
                team.id
            )));
        }
        if team.is_queued && team.current_table_id.is_some() {
            return Err(violation(format!("team {} is queued and seated", team.id)));
        }
    }
    Ok(())
}

fn verify_seating(record: &TournamentRecord) -> TournamentResult<()> {
    let mut seated_at: HashMap<_, TableId> = HashMap::new();
    for table in record.tables.values() {
        if table.occupants.len() > TABLE_CAPACITY {
            return Err(violation(format!(
                "table {} seats {} teams",
                table.id,
                table.occupants.len()
            )));
        }
        for team_id in &table.occupants {
            if let Some(other) = seated_at.insert(*team_id, table.id) {
                return Err(violation(format!(
                    "team {team_id} seated at tables {other} and {}",
                    table.id
                )));
            }
        }
    }
    for team in record.teams.values() {
        if team.current_table_id != seated_at.get(&team.id).copied() {
            return Err(violation(format!(
                "team {} points at table {:?} but occupies {:?}",
                team.id,
                team.current_table_id,
                seated_at.get(&team.id)
            )));
        }
        if team.status == TeamStatus::Eliminated && team.current_table_id.is_some() {
            return Err(violation(format!("eliminated team {} is seated", team.id)));
        }
    }
    Ok(())
}

fn verify_games(record: &TournamentRecord) -> TournamentResult<()> {
    for table in record.tables.values() {
        let active: Vec<_> = record
            .games
            .values()
            .filter(|g| g.table_id == table.id && g.status.is_active())
            .collect();
        if active.len() > 1 {
            return Err(violation(format!(
                "table {} hosts {} active games",
                table.id,
                active.len()
            )));
        }
        let expected = match (table.status, active.first()) {
            (TableStatus::Closed, None) => TableStatus::Closed,
            (TableStatus::Closed, Some(game)) => {
                return Err(violation(format!(
                    "closed table {} hosts active game {}",
                    table.id, game.id
                )));
            }
            (_, Some(_)) => TableStatus::InUse,
            (_, None) => TableStatus::Open,
        };
        if table.status != expected {
            return Err(violation(format!(
                "table {} is {} but should be {}",
                table.id, table.status, expected
            )));
        }
        if let Some(game) = active.first() {
            if !game.teams().iter().all(|id| table.seats(*id)) {
                return Err(violation(format!(
                    "active game {} teams are not seated at table {}",
                    game.id, table.id
                )));
            }
        }
    }
    Ok(())
}
