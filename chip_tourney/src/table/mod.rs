//! Physical tables and team seating.
//!
//! Tables come from the venue catalog when a tournament is created. Seating
//! is driven by autopilot after every game, or by director overrides.
//!
//! ## Example
//!
//! ```no_run
//! use chip_tourney::table::{StaticVenueCatalog, VenueCatalog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = StaticVenueCatalog::new().with_tables(1, 4);
//!     let tables = catalog.tables_for_venue(1).await;
//!     assert_eq!(tables.len(), 4);
//! }
//! ```

pub mod assignment;
pub mod models;
pub mod venue;

pub use assignment::{
    close_table, force_winner_stays, initial_assignments, manual_assignment, open_table,
    process_automatic_assignments,
};
pub use models::{TABLE_CAPACITY, Table, TableId, TableStatus, VenueId};
pub use venue::{AllowAll, EligibilityPolicy, StaticVenueCatalog, VenueCatalog, VenueTable};
