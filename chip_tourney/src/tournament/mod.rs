//! Tournament orchestration.
//!
//! This module ties the chip ledger, queue, tables, games and money together:
//! - Tournament creation, team registration and the setup → play → completed lifecycle
//! - The per-tournament record and its cross-component invariants
//! - Director overrides as a closed set of actions
//! - The async [`TournamentManager`] that persists every change with compare-and-swap
//!
//! ## Example
//!
//! ```no_run
//! use chip_tourney::db::MemoryTournamentRepository;
//! use chip_tourney::table::StaticVenueCatalog;
//! use chip_tourney::tournament::{NewTeam, TeamMember, TournamentManager, TournamentSettings};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(Arc::new(MemoryTournamentRepository::new()))
//!         .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(1, 4)));
//!
//!     let director = 1;
//!     let id = manager
//!         .create_tournament("Thursday 8-Ball", 1, TournamentSettings::default(), director)
//!         .await?;
//!     manager
//!         .add_team(id, director, NewTeam::new("Rail Birds", vec![TeamMember::new(10, "Ann")]))
//!         .await?;
//!     manager
//!         .add_team(id, director, NewTeam::new("Side Pockets", vec![TeamMember::new(11, "Bo")]))
//!         .await?;
//!
//!     let games = manager.start(id, director).await?;
//!     println!("Tournament {id} started with {} game(s)", games.len());
//!     Ok(())
//! }
//! ```

pub mod director;
pub mod invariants;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod record;

pub use director::{
    ActionOutcome, ApproveScores, AssignTable, ChipAdjustment, DirectorAction, DirectorCommand,
    DirectorContext, ManualPayout, ModifyScores,
};
pub use manager::{MAX_CAS_ATTEMPTS, TournamentManager};
pub use models::{
    Birthday, BracketOrdering, ChipBand, MAX_FEE_CENTS, NewTeam, PayoutMode, PayoutPlaces,
    PlayerId, Standing, Team, TeamId, TeamMember, TeamStatus, TournamentId, TournamentSettings,
    TournamentStatus, UserId,
};
pub use record::TournamentRecord;
