//! Tournament storage behind a versioned repository trait.
//!
//! A tournament is persisted as one snapshot with a version counter. Writers
//! never overwrite blindly: they hand back the version they read and the
//! store only accepts the write if nobody got there first.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::{TournamentId, TournamentStatus};
use crate::tournament::record::TournamentRecord;

/// A stored value together with the version it was read at
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub version: i64,
    pub record: T,
}

/// One line in a tournament listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TournamentListing {
    pub id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    pub version: i64,
}

impl From<&Versioned<TournamentRecord>> for TournamentListing {
    fn from(row: &Versioned<TournamentRecord>) -> Self {
        Self {
            id: row.record.id,
            name: row.record.name.clone(),
            status: row.record.status,
            version: row.version,
        }
    }
}

/// Trait for tournament snapshot storage
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Store a new tournament, assigning its id
    async fn insert(&self, record: TournamentRecord) -> TournamentResult<TournamentId>;

    /// Load the latest snapshot
    async fn load(&self, id: TournamentId) -> TournamentResult<Versioned<TournamentRecord>>;

    /// Replace the snapshot if it is still at `expected_version`
    ///
    /// # Returns
    ///
    /// * `bool` - `false` when another writer bumped the version first
    async fn compare_and_swap(
        &self,
        id: TournamentId,
        expected_version: i64,
        record: &TournamentRecord,
    ) -> TournamentResult<bool>;

    /// All tournaments, oldest first
    async fn list(&self) -> TournamentResult<Vec<TournamentListing>>;
}

#[derive(Default)]
struct MemoryState {
    last_id: TournamentId,
    rows: HashMap<TournamentId, Versioned<TournamentRecord>>,
}

/// In-process repository for tests and single-node runs
#[derive(Default)]
pub struct MemoryTournamentRepository {
    state: RwLock<MemoryState>,
}

impl MemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for MemoryTournamentRepository {
    async fn insert(&self, mut record: TournamentRecord) -> TournamentResult<TournamentId> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = state.last_id;
        record.id = id;
        state.rows.insert(id, Versioned { version: 0, record });
        Ok(id)
    }

    async fn load(&self, id: TournamentId) -> TournamentResult<Versioned<TournamentRecord>> {
        self.state
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    async fn compare_and_swap(
        &self,
        id: TournamentId,
        expected_version: i64,
        record: &TournamentRecord,
    ) -> TournamentResult<bool> {
        let mut state = self.state.write().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(TournamentError::TournamentNotFound(id))?;
        if row.version != expected_version {
            return Ok(false);
        }
        row.version += 1;
        row.record = record.clone();
        Ok(true)
    }

    async fn list(&self) -> TournamentResult<Vec<TournamentListing>> {
        let state = self.state.read().await;
        let mut listing: Vec<TournamentListing> =
            state.rows.values().map(TournamentListing::from).collect();
        listing.sort_by_key(|l| l.id);
        Ok(listing)
    }
}

/// PostgreSQL implementation storing the snapshot as JSONB
pub struct PgTournamentRepository {
    pool: PgPool,
}

impl PgTournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_state(state: serde_json::Value) -> TournamentResult<TournamentRecord> {
    Ok(serde_json::from_value(state)?)
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn insert(&self, mut record: TournamentRecord) -> TournamentResult<TournamentId> {
        let row = sqlx::query("SELECT nextval(pg_get_serial_sequence('tournaments', 'id')) AS id")
            .fetch_one(&self.pool)
            .await?;
        record.id = row.get("id");

        sqlx::query(
            "INSERT INTO tournaments (id, version, status, state) VALUES ($1, 0, $2, $3)",
        )
        .bind(record.id)
        .bind(record.status.to_string())
        .bind(serde_json::to_value(&record)?)
        .execute(&self.pool)
        .await?;

        Ok(record.id)
    }

    async fn load(&self, id: TournamentId) -> TournamentResult<Versioned<TournamentRecord>> {
        let row = sqlx::query("SELECT version, state FROM tournaments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))?;

        Ok(Versioned {
            version: row.get("version"),
            record: decode_state(row.get("state"))?,
        })
    }

    async fn compare_and_swap(
        &self,
        id: TournamentId,
        expected_version: i64,
        record: &TournamentRecord,
    ) -> TournamentResult<bool> {
        let result = sqlx::query(
            "UPDATE tournaments
             SET version = version + 1, status = $3, state = $4, updated_at = NOW()
             WHERE id = $1 AND version = $2",
        )
        .bind(id)
        .bind(expected_version)
        .bind(record.status.to_string())
        .bind(serde_json::to_value(record)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> TournamentResult<Vec<TournamentListing>> {
        let rows = sqlx::query("SELECT version, state FROM tournaments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| {
                let row = Versioned {
                    version: r.get("version"),
                    record: decode_state(r.get("state"))?,
                };
                Ok(TournamentListing::from(&row))
            })
            .collect()
    }
}
