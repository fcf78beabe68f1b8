//! Director overrides as a closed set of commands.
//!
//! Every action a director can take on a running tournament is one variant
//! of [`DirectorAction`]; the manager authorizes the caller once and then
//! dispatches through [`DirectorCommand::apply`].

use enum_dispatch::enum_dispatch;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::lifecycle;
use super::models::{TeamId, TournamentStatus, UserId};
use super::record::TournamentRecord;
use crate::chips::ledger;
use crate::chips::models::ChipTransaction;
use crate::errors::TournamentResult;
use crate::game::models::{GameId, ScoreReport};
use crate::game::progression;
use crate::money::calculator;
use crate::money::models::PayoutId;
use crate::table::assignment;
use crate::table::models::TableId;
use crate::table::venue::EligibilityPolicy;

/// What a command needs besides the record
pub struct DirectorContext<'a> {
    pub director: UserId,
    pub eligibility: &'a dyn EligibilityPolicy,
    pub rng: &'a mut dyn RngCore,
}

/// Result of a director action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActionOutcome {
    ScoresApproved { game_id: GameId },
    ScoresModified { game_id: GameId },
    TableAssigned {
        table_id: TableId,
        team_id: TeamId,
        game_id: Option<GameId>,
    },
    PayoutAdjusted { payout_id: PayoutId, amount: i64 },
    ChipsAdjusted { transaction: ChipTransaction },
}

#[enum_dispatch]
pub trait DirectorCommand {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome>;
}

#[enum_dispatch(DirectorCommand)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirectorAction {
    ApproveScores(ApproveScores),
    ModifyScores(ModifyScores),
    AssignTable(AssignTable),
    ManualPayout(ManualPayout),
    ChipAdjustment(ChipAdjustment),
}

impl DirectorAction {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DirectorAction::ApproveScores(_) => "approve_scores",
            DirectorAction::ModifyScores(_) => "modify_scores",
            DirectorAction::AssignTable(_) => "assign_table",
            DirectorAction::ManualPayout(_) => "manual_payout",
            DirectorAction::ChipAdjustment(_) => "chip_adjustment",
        }
    }
}

/// Chip corrections can eliminate or reinstate teams: finish the tournament
/// or refill tables accordingly.
fn after_correction(record: &mut TournamentRecord, rng: &mut dyn RngCore) -> TournamentResult<()> {
    if lifecycle::check_completion(record)? {
        return Ok(());
    }
    if record.status == TournamentStatus::InProgress {
        assignment::process_automatic_assignments(record, rng)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveScores {
    pub game_id: GameId,
}

impl DirectorCommand for ApproveScores {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome> {
        record.require_status(&[TournamentStatus::InProgress])?;
        progression::approve_scores(record, self.game_id, ctx.director, &mut *ctx.rng)?;
        Ok(ActionOutcome::ScoresApproved {
            game_id: self.game_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyScores {
    pub game_id: GameId,
    pub report: ScoreReport,
    pub reason: String,
}

impl DirectorCommand for ModifyScores {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome> {
        record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
        progression::modify_scores(
            record,
            self.game_id,
            self.report,
            ctx.director,
            &self.reason,
        )?;
        after_correction(record, &mut *ctx.rng)?;
        Ok(ActionOutcome::ScoresModified {
            game_id: self.game_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTable {
    pub table_id: TableId,
    pub team_id: TeamId,
}

impl DirectorCommand for AssignTable {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome> {
        record.require_status(&[TournamentStatus::InProgress])?;
        let game_id =
            assignment::manual_assignment(record, self.table_id, self.team_id, ctx.eligibility)?;
        Ok(ActionOutcome::TableAssigned {
            table_id: self.table_id,
            team_id: self.team_id,
            game_id,
        })
    }
}

/// Override the amount or recipient of an unpaid payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPayout {
    pub payout_id: PayoutId,
    pub team_id: Option<TeamId>,
    pub amount: i64,
}

impl DirectorCommand for ManualPayout {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        _ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome> {
        calculator::manual_payout(record, self.payout_id, self.team_id, self.amount)?;
        Ok(ActionOutcome::PayoutAdjusted {
            payout_id: self.payout_id,
            amount: self.amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipAdjustment {
    pub team_id: TeamId,
    pub amount: i64,
    pub reason: String,
}

impl DirectorCommand for ChipAdjustment {
    fn apply(
        &self,
        record: &mut TournamentRecord,
        ctx: &mut DirectorContext<'_>,
    ) -> TournamentResult<ActionOutcome> {
        record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
        let transaction =
            ledger::manual_adjustment(record, self.team_id, self.amount, ctx.director, &self.reason)?;
        after_correction(record, &mut *ctx.rng)?;
        Ok(ActionOutcome::ChipsAdjusted { transaction })
    }
}
