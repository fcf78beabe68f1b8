//! Chip transaction models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::game::models::GameId;
use crate::tournament::models::{PlayerId, TeamId, UserId};

/// Chip transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipTransactionType {
    /// Starting stack
    Initial,
    /// One chip per roster member on their birthday
    Birthday,
    GameWin,
    GameLoss,
    /// Director correction
    ManualAdjustment,
    /// Reversal of an earlier game transaction
    Adjustment,
}

impl ChipTransactionType {
    pub fn is_game_result(&self) -> bool {
        matches!(self, ChipTransactionType::GameWin | ChipTransactionType::GameLoss)
    }
}

impl fmt::Display for ChipTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChipTransactionType::Initial => write!(f, "initial"),
            ChipTransactionType::Birthday => write!(f, "birthday"),
            ChipTransactionType::GameWin => write!(f, "game_win"),
            ChipTransactionType::GameLoss => write!(f, "game_loss"),
            ChipTransactionType::ManualAdjustment => write!(f, "manual_adjustment"),
            ChipTransactionType::Adjustment => write!(f, "adjustment"),
        }
    }
}

/// Append-only chip ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipTransaction {
    pub id: Uuid,
    pub team_id: TeamId,
    pub player_id: Option<PlayerId>,
    pub game_id: Option<GameId>,
    /// Signed chip delta
    pub amount: i64,
    pub transaction_type: ChipTransactionType,
    pub description: String,
    pub created_by: Option<UserId>,
    /// Set on game transactions once an `Adjustment` has negated them
    pub reversed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate chip figures for a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipStats {
    pub total_chips_in_play: u64,
    pub teams_with_chips: usize,
    pub eliminated_teams: usize,
    pub average_chips_per_active_team: f64,
    pub transactions: usize,
}
