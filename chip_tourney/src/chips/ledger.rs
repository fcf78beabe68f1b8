//! Chip ledger operations.
//!
//! The transaction log is the source of truth. Every change to a team's
//! chip counters goes through `credit` or `debit`, which append exactly one
//! transaction, so replaying the log always reproduces `current_chips`.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::models::{ChipStats, ChipTransaction, ChipTransactionType};
use crate::errors::{TournamentError, TournamentResult};
use crate::game::models::GameId;
use crate::game::progression;
use crate::queue::manager as queue;
use crate::table::assignment;
use crate::tournament::models::{
    PlayerId, TeamId, TeamStatus, TournamentSettings, UserId,
};
use crate::tournament::record::TournamentRecord;

/// Optional references attached to a ledger entry
#[derive(Debug, Clone, Default)]
struct EntryRefs {
    game_id: Option<GameId>,
    player_id: Option<PlayerId>,
    created_by: Option<UserId>,
}

/// Starting chips for a combined rating
///
/// The first configured band containing the rating wins; teams without a
/// rating, or outside every band, get the tournament default.
pub fn calculate_initial_chips(settings: &TournamentSettings, combined_rating: Option<i32>) -> u32 {
    combined_rating
        .and_then(|rating| settings.chip_bands.iter().find(|b| b.contains(rating)))
        .map(|band| band.chips)
        .unwrap_or(settings.default_chips_per_team)
}

/// Deal starting chips to every registered team
///
/// Each team gets its band (or default) chips plus one birthday chip per
/// roster member whose birthday is `today` and who has not had one in this
/// tournament yet.
pub fn initialize_all_teams(record: &mut TournamentRecord, today: NaiveDate) -> TournamentResult<()> {
    let team_ids: Vec<TeamId> = record.teams.keys().copied().collect();
    for team_id in team_ids {
        let team = record.team(team_id)?;
        let initial = calculate_initial_chips(&record.settings, team.combined_rating);
        let rating_label = team
            .combined_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "default".to_string());

        credit(
            record,
            team_id,
            initial,
            ChipTransactionType::Initial,
            format!("Initial chips for combined rating {rating_label}"),
            EntryRefs::default(),
        )?;
        record.team_mut(team_id)?.initial_chips = initial;

        let birthday_members: Vec<(usize, PlayerId, String)> = record
            .team(team_id)?
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                !m.received_birthday_chip && m.birthday.is_some_and(|b| b.falls_on(today))
            })
            .map(|(idx, m)| (idx, m.player_id, m.display_name.clone()))
            .collect();

        for (idx, player_id, name) in birthday_members {
            credit(
                record,
                team_id,
                1,
                ChipTransactionType::Birthday,
                format!("Birthday chip for {name}"),
                EntryRefs {
                    player_id: Some(player_id),
                    ..EntryRefs::default()
                },
            )?;
            record.team_mut(team_id)?.members[idx].received_birthday_chip = true;
        }
    }
    Ok(())
}

fn push_entry(
    record: &mut TournamentRecord,
    team_id: TeamId,
    amount: i64,
    transaction_type: ChipTransactionType,
    description: String,
    refs: EntryRefs,
) -> Uuid {
    let id = Uuid::new_v4();
    record.ledger.push(ChipTransaction {
        id,
        team_id,
        player_id: refs.player_id,
        game_id: refs.game_id,
        amount,
        transaction_type,
        description,
        created_by: refs.created_by,
        reversed_by: None,
        created_at: Utc::now(),
    });
    id
}

/// Add chips to a team and log the entry
fn credit(
    record: &mut TournamentRecord,
    team_id: TeamId,
    amount: u32,
    transaction_type: ChipTransactionType,
    description: String,
    refs: EntryRefs,
) -> TournamentResult<Uuid> {
    let team = record.team_mut(team_id)?;
    team.current_chips = team.current_chips.checked_add(amount).ok_or_else(|| {
        TournamentError::InvariantViolation(format!("chip overflow for team {team_id}"))
    })?;
    if transaction_type == ChipTransactionType::GameWin {
        team.total_chips_won += amount;
    }
    Ok(push_entry(
        record,
        team_id,
        amount as i64,
        transaction_type,
        description,
        refs,
    ))
}

/// Remove up to `amount` chips, clamped at zero, and log the entry
///
/// # Returns
///
/// * `(Uuid, u32)` - The entry id and the chips actually removed
fn debit(
    record: &mut TournamentRecord,
    team_id: TeamId,
    amount: u32,
    transaction_type: ChipTransactionType,
    description: String,
    refs: EntryRefs,
) -> TournamentResult<(Uuid, u32)> {
    let team = record.team_mut(team_id)?;
    let applied = amount.min(team.current_chips);
    team.current_chips -= applied;
    if transaction_type == ChipTransactionType::GameLoss {
        team.total_chips_lost += applied;
    }
    let id = push_entry(
        record,
        team_id,
        -(applied as i64),
        transaction_type,
        description,
        refs,
    );
    Ok((id, applied))
}

/// Move the game's chips from loser to winner
///
/// The loss is clamped to the loser's balance. Status changes are left to
/// `settle_status`.
pub fn apply_game_result(record: &mut TournamentRecord, game_id: GameId) -> TournamentResult<()> {
    let game = record.game(game_id)?;
    let (Some(winner), Some(loser)) = (game.winning_team_id, game.losing_team_id) else {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "no result to apply".to_string(),
        });
    };
    let award = game.chips_awarded;
    let game_number = game.game_number;

    if record
        .ledger
        .iter()
        .any(|t| t.game_id == Some(game_id) && t.transaction_type.is_game_result() && t.reversed_by.is_none())
    {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "chips for this game were already applied".to_string(),
        });
    }

    let refs = EntryRefs {
        game_id: Some(game_id),
        ..EntryRefs::default()
    };
    credit(
        record,
        winner,
        award,
        ChipTransactionType::GameWin,
        format!("Won game {game_number}"),
        refs.clone(),
    )?;
    let (_, lost) = debit(
        record,
        loser,
        award,
        ChipTransactionType::GameLoss,
        format!("Lost game {game_number}"),
        refs,
    )?;

    log::debug!(
        "Tournament {}: game {} moved {} chip(s) to team {}, team {} lost {}",
        record.id,
        game_id,
        award,
        winner,
        loser,
        lost
    );
    Ok(())
}

/// Director chip correction
///
/// Positive amounts credit, negative amounts debit (clamped at zero).
pub fn manual_adjustment(
    record: &mut TournamentRecord,
    team_id: TeamId,
    amount: i64,
    director: UserId,
    reason: &str,
) -> TournamentResult<ChipTransaction> {
    if amount == 0 {
        return Err(TournamentError::validation("adjustment amount cannot be zero"));
    }
    let magnitude = u32::try_from(amount.unsigned_abs())
        .map_err(|_| TournamentError::validation("adjustment amount is too large"))?;
    let current = record.team(team_id)?.current_chips;
    if amount < 0 && current == 0 {
        return Err(TournamentError::InvalidTeamState {
            team_id,
            reason: "has no chips to remove".to_string(),
        });
    }

    let refs = EntryRefs {
        created_by: Some(director),
        ..EntryRefs::default()
    };
    let description = format!("Manual adjustment: {reason}");
    let id = if amount > 0 {
        credit(
            record,
            team_id,
            magnitude,
            ChipTransactionType::ManualAdjustment,
            description,
            refs,
        )?
    } else {
        debit(
            record,
            team_id,
            magnitude,
            ChipTransactionType::ManualAdjustment,
            description,
            refs,
        )?
        .0
    };
    record.team_mut(team_id)?.manual_chip_override = true;
    settle_status(record, team_id)?;

    log::warn!(
        "Tournament {}: director {} adjusted team {} by {} ({})",
        record.id,
        director,
        team_id,
        amount,
        reason
    );

    record
        .ledger
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .ok_or_else(|| TournamentError::InvariantViolation("adjustment entry missing".to_string()))
}

/// Negate every live game transaction of a game
///
/// # Returns
///
/// * `usize` - Number of transactions reversed
///
/// # Errors
///
/// Fails when nothing is left to reverse, or when taking back a win would
/// leave the winner below zero
pub fn reverse_game_transactions(
    record: &mut TournamentRecord,
    game_id: GameId,
    reversed_by: UserId,
) -> TournamentResult<usize> {
    let game_number = record.game(game_id)?.game_number;
    let live: Vec<(Uuid, TeamId, i64)> = record
        .ledger
        .iter()
        .filter(|t| {
            t.game_id == Some(game_id) && t.transaction_type.is_game_result() && t.reversed_by.is_none()
        })
        .map(|t| (t.id, t.team_id, t.amount))
        .collect();
    if live.is_empty() {
        return Err(TournamentError::GameWorkflow {
            game_id,
            reason: "no chip transactions left to reverse".to_string(),
        });
    }

    let reversed = live.len();
    for (original, team_id, amount) in live {
        let refs = EntryRefs {
            game_id: Some(game_id),
            created_by: Some(reversed_by),
            ..EntryRefs::default()
        };
        let description = format!("Reversal of game {game_number}");
        let magnitude = amount.unsigned_abs() as u32;

        let reversal = if amount >= 0 {
            let team = record.team(team_id)?;
            if team.current_chips < magnitude {
                return Err(TournamentError::InvalidTeamState {
                    team_id,
                    reason: format!(
                        "reversing game {game_number} needs {magnitude} chip(s), team has {}",
                        team.current_chips
                    ),
                });
            }
            let (id, _) = debit(
                record,
                team_id,
                magnitude,
                ChipTransactionType::Adjustment,
                description,
                refs,
            )?;
            let team = record.team_mut(team_id)?;
            team.total_chips_won = team.total_chips_won.saturating_sub(magnitude);
            id
        } else {
            let id = credit(
                record,
                team_id,
                magnitude,
                ChipTransactionType::Adjustment,
                description,
                refs,
            )?;
            let team = record.team_mut(team_id)?;
            team.total_chips_lost = team.total_chips_lost.saturating_sub(magnitude);
            id
        };

        if let Some(entry) = record.ledger.iter_mut().find(|t| t.id == original) {
            entry.reversed_by = Some(reversal);
        }
    }

    log::info!(
        "Tournament {}: reversed {} chip entries for game {}",
        record.id,
        reversed,
        game_id
    );
    Ok(reversed)
}

/// Bring a team's status in line with its balance
///
/// Zero chips eliminates the team: it leaves the queue and its table, and
/// any game it is playing is cancelled with the opponent requeued. A team
/// brought back above zero is reinstated at the back of the queue.
pub fn settle_status(record: &mut TournamentRecord, team_id: TeamId) -> TournamentResult<()> {
    if !record.has_started() {
        return Ok(());
    }
    let team = record.team(team_id)?;
    match (team.status, team.current_chips) {
        (TeamStatus::Active, 0) => eliminate(record, team_id),
        (TeamStatus::Eliminated, chips) if chips > 0 => {
            let team = record.team_mut(team_id)?;
            team.status = TeamStatus::Active;
            team.eliminated_at = None;
            queue::add_team(record, team_id)?;
            log::info!("Tournament {}: team {} reinstated", record.id, team_id);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn eliminate(record: &mut TournamentRecord, team_id: TeamId) -> TournamentResult<()> {
    if record.team(team_id)?.is_queued {
        queue::remove_team(record, team_id)?;
    }

    if let Some(table_id) = record.team(team_id)?.current_table_id {
        let interrupted = record
            .active_game_at(table_id)
            .filter(|g| g.involves(team_id))
            .map(|g| g.id);
        if let Some(game_id) = interrupted {
            progression::cancel_in_place(record, game_id, "cancelled: team eliminated")?;
        }
        assignment::unseat(record, team_id)?;
        if interrupted.is_some() {
            let others = record.table(table_id)?.occupants.clone();
            for other in others {
                assignment::release_to_queue(record, other)?;
            }
        }
    }

    let team = record.team_mut(team_id)?;
    team.status = TeamStatus::Eliminated;
    team.eliminated_at = Some(Utc::now());
    log::info!("Tournament {}: team {} eliminated", record.id, team_id);
    Ok(())
}

/// Ledger entries for one team, oldest first
pub fn team_history(record: &TournamentRecord, team_id: TeamId) -> Vec<&ChipTransaction> {
    record.ledger.iter().filter(|t| t.team_id == team_id).collect()
}

/// Balance obtained by replaying the team's ledger entries
pub fn replay_balance(record: &TournamentRecord, team_id: TeamId) -> i64 {
    record
        .ledger
        .iter()
        .filter(|t| t.team_id == team_id)
        .map(|t| t.amount)
        .sum()
}

pub fn tournament_chip_stats(record: &TournamentRecord) -> ChipStats {
    let active: Vec<u32> = record
        .teams
        .values()
        .filter(|t| t.is_active())
        .map(|t| t.current_chips)
        .collect();
    let total: u64 = record.teams.values().map(|t| t.current_chips as u64).sum();

    ChipStats {
        total_chips_in_play: total,
        teams_with_chips: record.teams.values().filter(|t| t.current_chips > 0).count(),
        eliminated_teams: record.teams.len() - active.len(),
        average_chips_per_active_team: if active.is_empty() {
            0.0
        } else {
            active.iter().map(|c| *c as f64).sum::<f64>() / active.len() as f64
        },
        transactions: record.ledger.len(),
    }
}
