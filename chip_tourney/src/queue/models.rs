//! Queue snapshot and pairing history models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tournament::models::{TeamId, UserId};

/// Ordered waiting line of teams
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Head first
    pub order: Vec<TeamId>,
    pub last_shuffled: Option<DateTime<Utc>>,
    pub shuffled_by: Option<UserId>,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, team_id: TeamId) -> bool {
        self.order.contains(&team_id)
    }
}

/// Games played between an unordered pair of teams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPairing {
    pub low_team_id: TeamId,
    pub high_team_id: TeamId,
    pub games_played: u32,
    pub last_played_at: DateTime<Utc>,
}

/// History of pairings, keyed by the sorted team ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingHistory {
    pairs: BTreeMap<String, TeamPairing>,
}

impl PairingHistory {
    pub fn key(a: TeamId, b: TeamId) -> String {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        format!("{low}-{high}")
    }

    pub fn games_between(&self, a: TeamId, b: TeamId) -> u32 {
        self.pairs
            .get(&Self::key(a, b))
            .map(|p| p.games_played)
            .unwrap_or(0)
    }

    pub fn record(&mut self, a: TeamId, b: TeamId) -> &TeamPairing {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let now = Utc::now();
        let entry = self
            .pairs
            .entry(Self::key(a, b))
            .and_modify(|p| {
                p.games_played += 1;
                p.last_played_at = now;
            })
            .or_insert(TeamPairing {
                low_team_id: low,
                high_team_id: high,
                games_played: 1,
                last_played_at: now,
            });
        entry
    }

    pub fn iter(&self) -> impl Iterator<Item = &TeamPairing> {
        self.pairs.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
