//! Money, payout and side-pot models. All amounts are in cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tournament::models::{PlayerId, TeamId, UserId};

/// Payout ID type
pub type PayoutId = i64;

/// Payout split ID type
pub type SplitId = i64;

/// Side pot ID type
pub type SidePotId = i64;

/// Maximum side pots per tournament
pub const MAX_SIDE_POTS: usize = 10;

/// Pool breakdown derived from fees and registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyBreakdown {
    pub entrants: usize,
    pub total_entry_fees: i64,
    pub total_admin_fees: i64,
    pub added_money: i64,
    pub total_payout: i64,
}

/// One place in a payout structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutPlace {
    /// 1-based finishing position
    pub position: usize,
    pub percentage: f64,
    pub amount: i64,
    pub description: String,
}

/// A payout record, assigned to a team at completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub id: PayoutId,
    pub position: usize,
    pub percentage: f64,
    pub amount: i64,
    /// Amount computed at completion, before any split or manual override
    pub original_amount: i64,
    pub description: String,
    pub team_id: Option<TeamId>,
    pub is_split: bool,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<UserId>,
}

/// Who receives a share of a split payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitRecipient {
    Team(TeamId),
    Player(PlayerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitShare {
    pub recipient: SplitRecipient,
    pub amount: i64,
}

/// Director request to divide a payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayoutSplit {
    pub payout_id: PayoutId,
    pub name: String,
    pub description: Option<String>,
    pub shares: Vec<SplitShare>,
}

/// Stored division of a single payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSplit {
    pub id: SplitId,
    pub payout_id: PayoutId,
    pub name: String,
    pub description: Option<String>,
    pub shares: Vec<SplitShare>,
    pub total_amount: i64,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Who may enter a side pot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SidePotEntryType {
    Team,
    Individual,
}

/// A side-pot entrant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SidePotEntrant {
    Team(TeamId),
    Player(PlayerId),
}

impl SidePotEntrant {
    pub fn entry_type(&self) -> SidePotEntryType {
        match self {
            SidePotEntrant::Team(_) => SidePotEntryType::Team,
            SidePotEntrant::Player(_) => SidePotEntryType::Individual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePotEntry {
    pub entrant: SidePotEntrant,
    pub amount: i64,
    pub entered_at: DateTime<Utc>,
}

/// Request to open a side pot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSidePot {
    pub name: String,
    pub description: Option<String>,
    pub entry_fee: i64,
    pub entry_type: SidePotEntryType,
}

/// Opt-in sub-pot with its own entry fee and winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePot {
    pub id: SidePotId,
    pub name: String,
    pub description: Option<String>,
    pub entry_fee: i64,
    pub entry_type: SidePotEntryType,
    pub entries: Vec<SidePotEntry>,
    pub total_pot: i64,
    pub is_complete: bool,
    pub winner: Option<SidePotEntrant>,
    pub completed_by: Option<UserId>,
    pub paid_out: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
}

/// Everything money-related about a tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoneySummary {
    pub breakdown: MoneyBreakdown,
    pub projected_payouts: Vec<PayoutPlace>,
    pub payouts: Vec<Payout>,
    pub splits: Vec<PayoutSplit>,
    pub side_pots: Vec<SidePot>,
    pub total_side_pot_money: i64,
}
