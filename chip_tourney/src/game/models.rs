//! Game data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::table::models::TableId;
use crate::tournament::models::{TeamId, UserId};

/// Game ID type
pub type GameId = i64;

/// Game lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    NotStarted,
    InProgress,
    Completed,
    /// Terminal, but may be restarted
    Cancelled,
}

impl GameStatus {
    /// Occupies its table
    pub fn is_active(&self) -> bool {
        matches!(self, GameStatus::NotStarted | GameStatus::InProgress)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::NotStarted => write!(f, "not started"),
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::Completed => write!(f, "completed"),
            GameStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Scores reported for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub team_a_score: u32,
    pub team_b_score: u32,
    /// Team that forfeited; the other side wins regardless of score
    pub forfeited_by: Option<TeamId>,
}

impl ScoreReport {
    pub fn new(team_a_score: u32, team_b_score: u32) -> Self {
        Self {
            team_a_score,
            team_b_score,
            forfeited_by: None,
        }
    }

    pub fn forfeit(team_id: TeamId) -> Self {
        Self {
            team_a_score: 0,
            team_b_score: 0,
            forfeited_by: Some(team_id),
        }
    }
}

/// A single race between two teams at one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub table_id: TableId,
    /// Sequential within the tournament
    pub game_number: u32,
    pub race_to_wins: u32,
    pub status: GameStatus,
    pub team_a_id: TeamId,
    pub team_b_id: TeamId,
    pub team_a_score: u32,
    pub team_b_score: u32,
    pub winning_team_id: Option<TeamId>,
    pub losing_team_id: Option<TeamId>,
    pub forfeited_by: Option<TeamId>,
    pub scores_submitted: bool,
    pub scores_approved: bool,
    pub submitted_by: Option<UserId>,
    pub approved_by: Option<UserId>,
    pub chips_awarded: u32,
    pub winner_stays: bool,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Game {
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team_a_id == team_id || self.team_b_id == team_id
    }

    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        if self.team_a_id == team_id {
            Some(self.team_b_id)
        } else if self.team_b_id == team_id {
            Some(self.team_a_id)
        } else {
            None
        }
    }

    pub fn teams(&self) -> [TeamId; 2] {
        [self.team_a_id, self.team_b_id]
    }
}
