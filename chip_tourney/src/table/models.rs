//! Physical table models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tournament::models::{TeamId, UserId};

/// Table ID type (taken from the venue catalog)
pub type TableId = i64;

/// Venue ID type
pub type VenueId = i64;

/// Teams per table
pub const TABLE_CAPACITY: usize = 2;

/// Table availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableStatus {
    /// Free or partially seated, no game running
    Open,
    /// Hosting an active game
    InUse,
    /// Taken out of rotation by a director
    Closed,
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableStatus::Open => write!(f, "open"),
            TableStatus::InUse => write!(f, "in use"),
            TableStatus::Closed => write!(f, "closed"),
        }
    }
}

/// A physical table inside a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub venue_id: VenueId,
    pub label: String,
    /// Catalog activity flag; inactive tables are skipped by automatic assignment
    pub is_active: bool,
    pub status: TableStatus,
    /// Seated teams in arrival order
    pub occupants: Vec<TeamId>,
    /// Anchor kept between games when the winner stays
    pub current_winning_team_id: Option<TeamId>,
    pub closed_by: Option<UserId>,
    pub closed_at: Option<DateTime<Utc>>,
    pub last_assigned_at: Option<DateTime<Utc>>,
}

impl Table {
    pub fn new(id: TableId, venue_id: VenueId, label: impl Into<String>, is_active: bool) -> Self {
        Self {
            id,
            venue_id,
            label: label.into(),
            is_active,
            status: TableStatus::Open,
            occupants: Vec::with_capacity(TABLE_CAPACITY),
            current_winning_team_id: None,
            closed_by: None,
            closed_at: None,
            last_assigned_at: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= TABLE_CAPACITY
    }

    pub fn has_seat(&self) -> bool {
        !self.is_full()
    }

    /// Available for automatic seating
    pub fn is_assignable(&self) -> bool {
        self.is_active && self.status == TableStatus::Open
    }

    pub fn seats(&self, team_id: TeamId) -> bool {
        self.occupants.contains(&team_id)
    }
}
