//! Team queue and pairing history.
//!
//! Teams wait here between games. The queue is ordered once at tournament
//! start (random, seeded or manual) and then fed by game completions,
//! table closures and director overrides.

pub mod manager;
pub mod models;
pub mod pairing;

pub use manager::{
    add_team, initialize, next_team_for_table, remove_team, shuffle, teams_to_requeue,
};
pub use models::{PairingHistory, QueueSnapshot, TeamPairing};
pub use pairing::record_pairing;
