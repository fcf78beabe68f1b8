//! Prize money: pool breakdown, payout structures, splits and side pots.
//!
//! All amounts are integer cents.
//!
//! ## Example
//!
//! ```
//! use chip_tourney::money::{automatic_payouts, tournament_money};
//! use chip_tourney::tournament::{PayoutMode, TournamentSettings};
//!
//! let settings = TournamentSettings::default().with_fees(2000, 500, 10000);
//! let money = tournament_money(&settings, 16);
//! assert_eq!(money.total_payout, 34000);
//!
//! let places = automatic_payouts(money.entrants, money.total_payout, PayoutMode::default());
//! assert_eq!(places.len(), 3);
//! assert_eq!(places.iter().map(|p| p.amount).sum::<i64>(), 34000);
//! ```

pub mod calculator;
pub mod models;
pub mod side_pots;

pub use calculator::{
    automatic_payouts, create_payout_split, field_percentages, final_payouts, manual_payout,
    mark_payout_paid, money_summary, payout_structure, place_percentages, rank_teams,
    tournament_money,
};
pub use models::{
    MAX_SIDE_POTS, MoneyBreakdown, MoneySummary, NewPayoutSplit, NewSidePot, Payout, PayoutId,
    PayoutPlace, PayoutSplit, SidePot, SidePotEntrant, SidePotEntry, SidePotEntryType,
    SidePotId, SplitId, SplitRecipient, SplitShare,
};
pub use side_pots::{complete_side_pot, create_side_pot, enter_side_pot, mark_side_pot_paid};
