//! # Chip Tourney
//!
//! An orchestration engine for chip-elimination pool tournaments.
//!
//! Teams start with a stack of chips, play races at physical tables, and pass
//! chips from loser to winner after every game. A team that runs out of chips
//! is eliminated; the last team holding chips wins and the prize pool is paid
//! out by finishing order.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Lifecycle, director overrides and the async [`TournamentManager`]
//! - [`chips`]: Append-only chip ledger, starting stacks and elimination
//! - [`queue`]: Waiting teams and pairing history
//! - [`table`]: Venue tables, seating and autopilot assignment
//! - [`game`]: Score submission, approval and the completion pipeline
//! - [`money`]: Prize pool, payout structures, splits and side pots
//! - [`db`]: Versioned tournament storage (in-memory and PostgreSQL)
//! - [`auth`]: Director authorization
//!
//! ## Example
//!
//! ```
//! use chip_tourney::money::tournament_money;
//! use chip_tourney::TournamentSettings;
//!
//! let settings = TournamentSettings::default().with_fees(2000, 500, 10000);
//! assert_eq!(tournament_money(&settings, 16).total_admin_fees, 8000);
//! ```

pub mod auth;
pub mod chips;
pub mod db;
pub mod errors;
pub mod game;
pub mod money;
pub mod queue;
pub mod table;
pub mod tournament;

pub use errors::{ErrorCategory, TournamentError, TournamentResult};
pub use tournament::{
    DirectorAction, TournamentManager, TournamentRecord, TournamentSettings, TournamentStatus,
};
