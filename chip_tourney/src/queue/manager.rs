//! Queue operations over a tournament record.
//!
//! The queue snapshot in the record is the single ordered resource; the
//! `is_queued` / `queue_position` fields on each team mirror it and are
//! rewritten on every mutation.

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;

use super::pairing;
use crate::errors::{TournamentError, TournamentResult};
use crate::table::models::TableId;
use crate::tournament::models::{BracketOrdering, Team, TeamId, UserId};
use crate::tournament::record::TournamentRecord;

/// Seed used for teams without a manual seed
const UNSEEDED: u32 = 999;

/// Rating proxy for teams without a combined rating
const CHIP_RATING_FACTOR: i64 = 100;

/// Build the queue from every active, unseated team
///
/// Any previous queue contents are discarded.
///
/// # Returns
///
/// * `Vec<TeamId>` - The new queue order, head first
pub fn initialize<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    ordering: BracketOrdering,
    rng: &mut R,
) -> Vec<TeamId> {
    let candidates: Vec<&Team> = record
        .teams
        .values()
        .filter(|t| t.is_active() && t.current_table_id.is_none())
        .collect();

    let order = match ordering {
        BracketOrdering::Random => {
            let mut ids: Vec<TeamId> = candidates.iter().map(|t| t.id).collect();
            ids.shuffle(rng);
            ids
        }
        BracketOrdering::Seeded => order_by_rating(&candidates),
        BracketOrdering::Manual => order_by_manual_seed(&candidates),
    };

    for team in record.teams.values_mut() {
        team.is_queued = false;
        team.queue_position = None;
    }
    record.queue.order = order.clone();
    renumber(record);

    log::debug!(
        "Tournament {}: queue initialized ({:?}) with {} teams",
        record.id,
        ordering,
        order.len()
    );

    order
}

/// Highest rated first, then alternate top and bottom of the remainder
fn order_by_rating(teams: &[&Team]) -> Vec<TeamId> {
    let mut sorted: Vec<&Team> = teams.to_vec();
    sorted.sort_by_key(|t| {
        let rating = t
            .combined_rating
            .map(i64::from)
            .unwrap_or(t.current_chips as i64 * CHIP_RATING_FACTOR);
        (std::cmp::Reverse(rating), t.id)
    });

    let mut order = Vec::with_capacity(sorted.len());
    let (mut lo, mut hi) = (0usize, sorted.len());
    while lo < hi {
        order.push(sorted[lo].id);
        lo += 1;
        if lo < hi {
            hi -= 1;
            order.push(sorted[hi].id);
        }
    }
    order
}

fn order_by_manual_seed(teams: &[&Team]) -> Vec<TeamId> {
    let mut sorted: Vec<&Team> = teams.to_vec();
    // Stable: equal seeds keep registration order
    sorted.sort_by_key(|t| t.seed.unwrap_or(UNSEEDED));
    sorted.iter().map(|t| t.id).collect()
}

/// Rewrite queue positions so they run 1..=n in snapshot order
fn renumber(record: &mut TournamentRecord) {
    let order = record.queue.order.clone();
    for (idx, team_id) in order.iter().enumerate() {
        if let Some(team) = record.teams.get_mut(team_id) {
            team.is_queued = true;
            team.queue_position = Some(idx + 1);
        }
    }
}

/// Append a team to the back of the queue
///
/// # Returns
///
/// * `usize` - The team's 1-based position
///
/// # Errors
///
/// Fails if the team is eliminated, already queued or seated at a table
pub fn add_team(record: &mut TournamentRecord, team_id: TeamId) -> TournamentResult<usize> {
    let team = record.team(team_id)?;
    if !team.is_active() {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "eliminated teams cannot be queued".to_string(),
        });
    }
    if team.is_queued || record.queue.contains(team_id) {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "already queued".to_string(),
        });
    }
    if let Some(table_id) = team.current_table_id {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: format!("seated at table {table_id}"),
        });
    }

    record.queue.order.push(team_id);
    renumber(record);
    Ok(record.queue.order.len())
}

/// Remove a team from the queue, closing the gap it leaves
pub fn remove_team(record: &mut TournamentRecord, team_id: TeamId) -> TournamentResult<()> {
    let idx = record
        .queue
        .order
        .iter()
        .position(|id| *id == team_id)
        .ok_or_else(|| TournamentError::InvalidTeamState {
            team_id,
            reason: "not queued".to_string(),
        })?;

    record.queue.order.remove(idx);
    let team = record.team_mut(team_id)?;
    team.is_queued = false;
    team.queue_position = None;
    renumber(record);
    Ok(())
}

/// Pick the next team to seat at a table without removing it
///
/// With autopilot and repeat avoidance on, the queued team that has played
/// the table's anchor the fewest times wins; ties go to the earlier queue
/// position. Otherwise the queue head is returned.
pub fn next_team_for_table(
    record: &TournamentRecord,
    table_id: TableId,
) -> TournamentResult<Option<TeamId>> {
    let table = record.table(table_id)?;
    let anchor = table
        .current_winning_team_id
        .filter(|id| table.seats(*id))
        .or_else(|| table.occupants.first().copied());

    let settings = &record.settings;
    match anchor {
        Some(anchor) if settings.autopilot && settings.avoid_repeat_matchups => Ok(
            pairing::least_played_opponent(&record.pairings, anchor, &record.queue.order),
        ),
        _ => Ok(record.queue.order.first().copied()),
    }
}

/// Re-randomize the queue on director request
///
/// # Errors
///
/// Fails unless the tournament allows reordering between rounds
pub fn shuffle<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    shuffled_by: UserId,
    rng: &mut R,
) -> TournamentResult<()> {
    if !record.settings.random_reorder_per_round {
        return Err(TournamentError::validation(
            "queue shuffling is disabled for this tournament",
        ));
    }
    shuffle_order(record, Some(shuffled_by), rng);
    Ok(())
}

pub(crate) fn shuffle_order<R: Rng + ?Sized>(
    record: &mut TournamentRecord,
    shuffled_by: Option<UserId>,
    rng: &mut R,
) {
    record.queue.order.shuffle(rng);
    record.queue.last_shuffled = Some(Utc::now());
    record.queue.shuffled_by = shuffled_by;
    renumber(record);
}

/// Active teams that are neither seated nor queued
pub fn teams_to_requeue(record: &TournamentRecord) -> Vec<TeamId> {
    record
        .teams
        .values()
        .filter(|t| t.is_idle())
        .map(|t| t.id)
        .collect()
}
