//! Chip economy: starting stacks, game results and director corrections.
//!
//! ## Example
//!
//! ```
//! use chip_tourney::chips::calculate_initial_chips;
//! use chip_tourney::tournament::{ChipBand, TournamentSettings};
//!
//! let settings = TournamentSettings::default()
//!     .with_chip_bands(vec![ChipBand::new(200, 399, 8)]);
//! assert_eq!(calculate_initial_chips(&settings, Some(250)), 8);
//! assert_eq!(calculate_initial_chips(&settings, None), settings.default_chips_per_team);
//! ```

pub mod ledger;
pub mod models;

pub use ledger::{
    apply_game_result, calculate_initial_chips, initialize_all_teams, manual_adjustment,
    replay_balance, reverse_game_transactions, settle_status, team_history,
    tournament_chip_stats,
};
pub use models::{ChipStats, ChipTransaction, ChipTransactionType};
