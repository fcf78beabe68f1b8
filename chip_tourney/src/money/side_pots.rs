//! Optional side competitions with their own entry fee and winner.

use chrono::Utc;

use super::models::{
    MAX_SIDE_POTS, NewSidePot, SidePot, SidePotEntrant, SidePotEntry, SidePotId,
};
use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{MAX_FEE_CENTS, UserId};
use crate::tournament::record::TournamentRecord;

/// Open a new side pot
///
/// # Errors
///
/// * `SidePotLimit` - The tournament already runs [`MAX_SIDE_POTS`] pots
/// * `Validation` - Empty name, or an entry fee outside 0..=[`MAX_FEE_CENTS`]
pub fn create_side_pot(
    record: &mut TournamentRecord,
    request: NewSidePot,
    created_by: UserId,
) -> TournamentResult<SidePotId> {
    if record.side_pots.len() >= MAX_SIDE_POTS {
        return Err(TournamentError::SidePotLimit { max: MAX_SIDE_POTS });
    }
    if request.name.trim().is_empty() {
        return Err(TournamentError::validation("side pot name is required"));
    }
    if request.entry_fee < 0 || request.entry_fee > MAX_FEE_CENTS {
        return Err(TournamentError::validation(format!(
            "side pot entry fee must be between 0 and {MAX_FEE_CENTS} cents"
        )));
    }

    let id = record.sequences.next_side_pot();
    record.side_pots.push(SidePot {
        id,
        name: request.name,
        description: request.description,
        entry_fee: request.entry_fee,
        entry_type: request.entry_type,
        entries: Vec::new(),
        total_pot: 0,
        is_complete: false,
        winner: None,
        completed_by: None,
        paid_out: false,
        paid_at: None,
        created_by,
    });
    log::info!("Side pot {id} opened in tournament {}", record.id);
    Ok(id)
}

fn ensure_entrant_exists(record: &TournamentRecord, entrant: SidePotEntrant) -> TournamentResult<()> {
    match entrant {
        SidePotEntrant::Team(team_id) => record.team(team_id).map(|_| ()),
        SidePotEntrant::Player(player_id) => {
            let registered = record
                .teams
                .values()
                .any(|t| t.members.iter().any(|m| m.player_id == player_id));
            if registered {
                Ok(())
            } else {
                Err(TournamentError::validation(format!(
                    "player {player_id} is not registered in this tournament"
                )))
            }
        }
    }
}

/// Buy an entrant into a side pot at the pot's entry fee
pub fn enter_side_pot(
    record: &mut TournamentRecord,
    side_pot_id: SidePotId,
    entrant: SidePotEntrant,
) -> TournamentResult<()> {
    ensure_entrant_exists(record, entrant)?;

    let pot = record.side_pot_mut(side_pot_id)?;
    if pot.is_complete {
        return Err(TournamentError::Payment(format!(
            "side pot {side_pot_id} is closed"
        )));
    }
    if entrant.entry_type() != pot.entry_type {
        return Err(TournamentError::validation(format!(
            "side pot {side_pot_id} takes {:?} entries",
            pot.entry_type
        )));
    }
    if pot.entries.iter().any(|e| e.entrant == entrant) {
        return Err(TournamentError::validation(format!(
            "{entrant:?} already entered side pot {side_pot_id}"
        )));
    }

    pot.entries.push(SidePotEntry {
        entrant,
        amount: pot.entry_fee,
        entered_at: Utc::now(),
    });
    pot.total_pot += pot.entry_fee;
    Ok(())
}

/// Close a side pot and name its winner
pub fn complete_side_pot(
    record: &mut TournamentRecord,
    side_pot_id: SidePotId,
    winner: SidePotEntrant,
    completed_by: UserId,
) -> TournamentResult<()> {
    let pot = record.side_pot_mut(side_pot_id)?;
    if pot.is_complete {
        return Err(TournamentError::Payment(format!(
            "side pot {side_pot_id} is already complete"
        )));
    }
    if !pot.entries.iter().any(|e| e.entrant == winner) {
        return Err(TournamentError::validation(format!(
            "{winner:?} did not enter side pot {side_pot_id}"
        )));
    }
    pot.is_complete = true;
    pot.winner = Some(winner);
    pot.completed_by = Some(completed_by);
    Ok(())
}

pub fn mark_side_pot_paid(record: &mut TournamentRecord, side_pot_id: SidePotId) -> TournamentResult<()> {
    let pot = record.side_pot_mut(side_pot_id)?;
    if !pot.is_complete {
        return Err(TournamentError::Payment(format!(
            "side pot {side_pot_id} has no winner yet"
        )));
    }
    if pot.paid_out {
        return Err(TournamentError::Payment(format!(
            "side pot {side_pot_id} was already paid out"
        )));
    }
    pot.paid_out = true;
    pot.paid_at = Some(Utc::now());
    Ok(())
}
