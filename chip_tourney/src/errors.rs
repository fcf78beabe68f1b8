//! Error taxonomy shared by every engine component.

use thiserror::Error;

use crate::game::models::{GameId, GameStatus};
use crate::money::models::{PayoutId, SidePotId};
use crate::table::models::{TableId, TableStatus};
use crate::tournament::models::{TeamId, TournamentId, TournamentStatus, UserId};

/// Broad error class, used by callers to decide how to present a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    State,
    Authorization,
    Financial,
    Concurrency,
    Storage,
    Internal,
}

/// Tournament engine errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Malformed or out-of-range input
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Table not found: {0}")]
    TableNotFound(TableId),

    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Payout not found: {0}")]
    PayoutNotFound(PayoutId),

    #[error("Side pot not found: {0}")]
    SidePotNotFound(SidePotId),

    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidTournamentState {
        expected: Vec<TournamentStatus>,
        actual: TournamentStatus,
    },

    #[error("Game {game_id} not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidGameState {
        game_id: GameId,
        expected: Vec<GameStatus>,
        actual: GameStatus,
    },

    /// The game is in the right status but a workflow flag blocks the action
    #[error("Game {game_id}: {reason}")]
    GameWorkflow { game_id: GameId, reason: String },

    #[error("Team {team_id}: {reason}")]
    InvalidTeamState { team_id: TeamId, reason: String },

    #[error("Table {table_id} ({status}): {reason}")]
    InvalidTableState {
        table_id: TableId,
        status: TableStatus,
        reason: String,
    },

    #[error("User {user_id} is not a director of tournament {tournament_id}")]
    NotDirector {
        tournament_id: TournamentId,
        user_id: UserId,
    },

    #[error("Payment error: {0}")]
    Payment(String),

    #[error("Split total {actual} does not match payout amount {expected}")]
    InvalidSplit { expected: i64, actual: i64 },

    #[error("Side pot limit reached: at most {max} per tournament")]
    SidePotLimit { max: usize },

    #[error("Tournament {tournament_id} was modified concurrently; gave up after {attempts} attempts")]
    ConcurrentModification {
        tournament_id: TournamentId,
        attempts: u32,
    },

    /// A mutation produced a state that breaks an engine invariant; it is never persisted
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Shorthand for validation failures
    pub fn validation(msg: impl Into<String>) -> Self {
        TournamentError::Validation(msg.into())
    }

    pub fn category(&self) -> ErrorCategory {
        use TournamentError::*;
        match self {
            Validation(_) => ErrorCategory::Validation,
            TournamentNotFound(_) | TeamNotFound(_) | TableNotFound(_) | GameNotFound(_)
            | PayoutNotFound(_) | SidePotNotFound(_) => ErrorCategory::NotFound,
            InvalidTournamentState { .. }
            | InvalidGameState { .. }
            | GameWorkflow { .. }
            | InvalidTeamState { .. }
            | InvalidTableState { .. } => ErrorCategory::State,
            NotDirector { .. } => ErrorCategory::Authorization,
            Payment(_) | InvalidSplit { .. } | SidePotLimit { .. } => ErrorCategory::Financial,
            ConcurrentModification { .. } => ErrorCategory::Concurrency,
            Database(_) | Serialization(_) => ErrorCategory::Storage,
            InvariantViolation(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the operation may succeed if simply re-run against fresh state
    pub fn is_retryable(&self) -> bool {
        matches!(self, TournamentError::ConcurrentModification { .. })
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Serialization(_) => {
                "Internal storage error".to_string()
            }
            TournamentError::InvariantViolation(_) => "Internal consistency error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament engine operations
pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_errors_carry_context() {
        let err = TournamentError::InvalidTournamentState {
            expected: vec![TournamentStatus::Setup],
            actual: TournamentStatus::InProgress,
        };
        let msg = err.to_string();
        assert!(msg.contains("Setup"), "message should name required state: {msg}");
        assert!(msg.contains("InProgress"), "message should name current state: {msg}");
        assert_eq!(err.category(), ErrorCategory::State);
    }

    #[test]
    fn test_authorization_is_not_retryable() {
        let err = TournamentError::NotDirector {
            tournament_id: 1,
            user_id: 9,
        };
        assert_eq!(err.category(), ErrorCategory::Authorization);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = TournamentError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal storage error");

        let err = TournamentError::TeamNotFound(4);
        assert_eq!(err.client_message(), "Team not found: 4");
    }
}
