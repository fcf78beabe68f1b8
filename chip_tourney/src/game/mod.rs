//! Games between two teams at one table.
//!
//! Scores are submitted by players, approved by a director (or accepted
//! automatically) and then pushed through the completion pipeline.

pub mod models;
pub mod progression;

pub use models::{Game, GameId, GameStatus, ScoreReport};
pub use progression::{
    active_games, approve_scores, cancel, create_game, game_history, modify_scores, restart,
    start, submit_scores,
};
