//! Venue catalog and seating eligibility seams.

use async_trait::async_trait;
use std::collections::HashMap;

use super::models::{Table, TableId, VenueId};
use crate::tournament::models::Team;
use crate::tournament::record::TournamentRecord;

/// Catalog entry for a physical table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueTable {
    pub id: TableId,
    pub label: String,
    pub is_active: bool,
}

/// Static table list per venue
#[async_trait]
pub trait VenueCatalog: Send + Sync {
    /// Tables registered at a venue; empty when the venue is unknown
    async fn tables_for_venue(&self, venue_id: VenueId) -> Vec<VenueTable>;
}

/// In-memory catalog, suitable for tests and single-venue deployments
#[derive(Debug, Clone, Default)]
pub struct StaticVenueCatalog {
    venues: HashMap<VenueId, Vec<VenueTable>>,
}

impl StaticVenueCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `count` active tables labelled "Table 1".."Table N"
    pub fn with_tables(mut self, venue_id: VenueId, count: usize) -> Self {
        let tables = (1..=count)
            .map(|n| VenueTable {
                id: venue_id * 1000 + n as TableId,
                label: format!("Table {n}"),
                is_active: true,
            })
            .collect();
        self.venues.insert(venue_id, tables);
        self
    }

    pub fn insert(&mut self, venue_id: VenueId, table: VenueTable) {
        self.venues.entry(venue_id).or_default().push(table);
    }
}

#[async_trait]
impl VenueCatalog for StaticVenueCatalog {
    async fn tables_for_venue(&self, venue_id: VenueId) -> Vec<VenueTable> {
        self.venues.get(&venue_id).cloned().unwrap_or_default()
    }
}

/// Materialize catalog entries as tournament tables
pub fn tables_from_catalog(venue_id: VenueId, entries: Vec<VenueTable>) -> Vec<Table> {
    entries
        .into_iter()
        .map(|e| Table::new(e.id, venue_id, e.label, e.is_active))
        .collect()
}

/// External check run before a team is seated by a director
pub trait EligibilityPolicy: Send + Sync {
    /// `Err(reason)` when the team may not play at the table
    fn check(&self, record: &TournamentRecord, team: &Team, table: &Table) -> Result<(), String>;
}

/// Policy that admits every team
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EligibilityPolicy for AllowAll {
    fn check(&self, _record: &TournamentRecord, _team: &Team, _table: &Table) -> Result<(), String> {
        Ok(())
    }
}
