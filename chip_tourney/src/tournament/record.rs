//! The per-tournament aggregate.
//!
//! Every engine operation loads one `TournamentRecord`, mutates a private
//! copy of it and stores it back with a version check, so the teams,
//! tables, games, queue and ledger in here always move together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::models::{
    Team, TeamId, TeamStatus, TournamentId, TournamentSettings, TournamentStatus, UserId,
};
use crate::chips::models::ChipTransaction;
use crate::errors::{TournamentError, TournamentResult};
use crate::game::models::{Game, GameId};
use crate::money::models::{Payout, PayoutId, PayoutSplit, SidePot, SidePotId, SplitId};
use crate::queue::models::{PairingHistory, QueueSnapshot};
use crate::table::models::{Table, TableId, VenueId};

/// Monotonic id counters scoped to one tournament
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequences {
    team: i64,
    game: i64,
    payout: i64,
    split: i64,
    side_pot: i64,
}

impl IdSequences {
    pub fn next_team(&mut self) -> TeamId {
        self.team += 1;
        self.team
    }

    pub fn next_game(&mut self) -> GameId {
        self.game += 1;
        self.game
    }

    pub fn next_payout(&mut self) -> PayoutId {
        self.payout += 1;
        self.payout
    }

    pub fn next_split(&mut self) -> SplitId {
        self.split += 1;
        self.split
    }

    pub fn next_side_pot(&mut self) -> SidePotId {
        self.side_pot += 1;
        self.side_pot
    }
}

/// Full tournament state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub id: TournamentId,
    pub name: String,
    pub venue_id: VenueId,
    pub status: TournamentStatus,
    pub settings: TournamentSettings,
    pub directors: Vec<UserId>,
    pub teams: BTreeMap<TeamId, Team>,
    pub tables: BTreeMap<TableId, Table>,
    pub games: BTreeMap<GameId, Game>,
    pub queue: QueueSnapshot,
    pub ledger: Vec<ChipTransaction>,
    pub pairings: PairingHistory,
    pub payouts: Vec<Payout>,
    pub payout_splits: Vec<PayoutSplit>,
    pub side_pots: Vec<SidePot>,
    pub sequences: IdSequences,
    pub games_completed: u32,
    pub current_round: u32,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TournamentRecord {
    /// Build a fresh record in `Setup`; the creator becomes the first director
    pub fn new(
        id: TournamentId,
        name: impl Into<String>,
        venue_id: VenueId,
        settings: TournamentSettings,
        tables: Vec<Table>,
        created_by: UserId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            venue_id,
            status: TournamentStatus::Setup,
            settings,
            directors: vec![created_by],
            teams: BTreeMap::new(),
            tables: tables.into_iter().map(|t| (t.id, t)).collect(),
            games: BTreeMap::new(),
            queue: QueueSnapshot::default(),
            ledger: Vec::new(),
            pairings: PairingHistory::default(),
            payouts: Vec::new(),
            payout_splits: Vec::new(),
            side_pots: Vec::new(),
            sequences: IdSequences::default(),
            games_completed: 0,
            current_round: 0,
            created_by,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn team(&self, team_id: TeamId) -> TournamentResult<&Team> {
        self.teams
            .get(&team_id)
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    pub fn team_mut(&mut self, team_id: TeamId) -> TournamentResult<&mut Team> {
        self.teams
            .get_mut(&team_id)
            .ok_or(TournamentError::TeamNotFound(team_id))
    }

    pub fn table(&self, table_id: TableId) -> TournamentResult<&Table> {
        self.tables
            .get(&table_id)
            .ok_or(TournamentError::TableNotFound(table_id))
    }

    pub fn table_mut(&mut self, table_id: TableId) -> TournamentResult<&mut Table> {
        self.tables
            .get_mut(&table_id)
            .ok_or(TournamentError::TableNotFound(table_id))
    }

    pub fn game(&self, game_id: GameId) -> TournamentResult<&Game> {
        self.games
            .get(&game_id)
            .ok_or(TournamentError::GameNotFound(game_id))
    }

    pub fn game_mut(&mut self, game_id: GameId) -> TournamentResult<&mut Game> {
        self.games
            .get_mut(&game_id)
            .ok_or(TournamentError::GameNotFound(game_id))
    }

    pub fn payout_mut(&mut self, payout_id: PayoutId) -> TournamentResult<&mut Payout> {
        self.payouts
            .iter_mut()
            .find(|p| p.id == payout_id)
            .ok_or(TournamentError::PayoutNotFound(payout_id))
    }

    pub fn side_pot_mut(&mut self, side_pot_id: SidePotId) -> TournamentResult<&mut SidePot> {
        self.side_pots
            .iter_mut()
            .find(|p| p.id == side_pot_id)
            .ok_or(TournamentError::SidePotNotFound(side_pot_id))
    }

    /// The NotStarted or InProgress game at a table, if any
    pub fn active_game_at(&self, table_id: TableId) -> Option<&Game> {
        self.games
            .values()
            .find(|g| g.table_id == table_id && g.status.is_active())
    }

    pub fn active_team_count(&self) -> usize {
        self.teams
            .values()
            .filter(|t| t.status == TeamStatus::Active)
            .count()
    }

    pub fn is_director(&self, user_id: UserId) -> bool {
        self.directors.contains(&user_id)
    }

    /// Reject unless the tournament is in one of `allowed`
    pub fn require_status(&self, allowed: &[TournamentStatus]) -> TournamentResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(TournamentError::InvalidTournamentState {
                expected: allowed.to_vec(),
                actual: self.status,
            })
        }
    }

    /// Whether balances are meaningful (chips have been dealt)
    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }
}
