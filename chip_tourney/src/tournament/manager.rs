//! Tournament manager: the async entry point for every tournament operation.
//!
//! Each mutating call loads the latest snapshot, applies the change to a
//! private copy, verifies the record's invariants and writes it back with a
//! compare-and-swap on the snapshot version. A lost race re-reads and
//! replays the change; nothing is stored when any step fails.

use chrono::Utc;
use std::sync::Arc;

use super::director::{
    ActionOutcome, ApproveScores, AssignTable, ChipAdjustment, DirectorAction, DirectorCommand,
    DirectorContext, ModifyScores,
};
use super::invariants;
use super::lifecycle;
use super::models::{NewTeam, Standing, TeamId, TournamentId, TournamentSettings, TournamentStatus, UserId};
use super::record::TournamentRecord;
use crate::auth::{DirectorAuthority, DirectorRoster};
use crate::chips::ledger;
use crate::chips::models::{ChipStats, ChipTransaction};
use crate::db::repository::{TournamentListing, TournamentRepository};
use crate::errors::{TournamentError, TournamentResult};
use crate::game::models::{Game, GameId, ScoreReport};
use crate::game::progression;
use crate::money::models::{
    MoneySummary, NewPayoutSplit, NewSidePot, PayoutId, SidePotEntrant, SidePotId, SplitId,
};
use crate::money::{calculator, side_pots};
use crate::queue::manager as queue;
use crate::table::assignment;
use crate::table::models::{TableId, VenueId};
use crate::table::venue::{
    AllowAll, EligibilityPolicy, StaticVenueCatalog, VenueCatalog, tables_from_catalog,
};

/// Attempts before a contended write gives up
pub const MAX_CAS_ATTEMPTS: u32 = 8;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repository: Arc<dyn TournamentRepository>,
    authority: Arc<dyn DirectorAuthority>,
    venues: Arc<dyn VenueCatalog>,
    eligibility: Arc<dyn EligibilityPolicy>,
}

impl TournamentManager {
    /// Create a manager over a repository with default collaborators
    ///
    /// Directors come from each tournament's roster, every team is eligible
    /// for every table, and the venue catalog starts empty.
    pub fn new(repository: Arc<dyn TournamentRepository>) -> Self {
        Self {
            repository,
            authority: Arc::new(DirectorRoster),
            venues: Arc::new(StaticVenueCatalog::new()),
            eligibility: Arc::new(AllowAll),
        }
    }

    pub fn with_authority(mut self, authority: Arc<dyn DirectorAuthority>) -> Self {
        self.authority = authority;
        self
    }

    pub fn with_venues(mut self, venues: Arc<dyn VenueCatalog>) -> Self {
        self.venues = venues;
        self
    }

    pub fn with_eligibility(mut self, eligibility: Arc<dyn EligibilityPolicy>) -> Self {
        self.eligibility = eligibility;
        self
    }

    fn require_director(&self, record: &TournamentRecord, user_id: UserId) -> TournamentResult<()> {
        if self.authority.is_director(record, user_id) {
            Ok(())
        } else {
            Err(TournamentError::NotDirector {
                tournament_id: record.id,
                user_id,
            })
        }
    }

    /// Load → apply → verify → compare-and-swap, retried on version conflicts
    async fn mutate<T, F>(&self, id: TournamentId, mut op: F) -> TournamentResult<T>
    where
        F: FnMut(&mut TournamentRecord) -> TournamentResult<T> + Send,
        T: Send,
    {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let current = self.repository.load(id).await?;
            let version = current.version;
            let mut record = current.record;

            let value = op(&mut record)?;
            invariants::verify(&record)?;

            if self.repository.compare_and_swap(id, version, &record).await? {
                return Ok(value);
            }
            log::debug!("Tournament {id}: version {version} is stale (attempt {attempt}), retrying");
        }

        log::warn!("Tournament {id}: giving up after {MAX_CAS_ATTEMPTS} conflicting writes");
        Err(TournamentError::ConcurrentModification {
            tournament_id: id,
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Refill tables after a change that freed seats or teams
    fn refill(record: &mut TournamentRecord) -> TournamentResult<()> {
        if record.status == TournamentStatus::InProgress {
            assignment::process_automatic_assignments(record, &mut rand::rng())?;
        }
        Ok(())
    }

    // === Lifecycle ===

    /// Create a tournament in setup; the creator becomes its first director
    ///
    /// Tables are taken from the venue catalog.
    pub async fn create_tournament(
        &self,
        name: &str,
        venue_id: VenueId,
        settings: TournamentSettings,
        created_by: UserId,
    ) -> TournamentResult<TournamentId> {
        if name.trim().is_empty() {
            return Err(TournamentError::validation("tournament name is required"));
        }
        settings.validate()?;

        let tables = tables_from_catalog(venue_id, self.venues.tables_for_venue(venue_id).await);
        if tables.is_empty() {
            return Err(TournamentError::validation(format!(
                "venue {venue_id} has no tables"
            )));
        }

        let record = TournamentRecord::new(0, name.trim(), venue_id, settings, tables, created_by);
        invariants::verify(&record)?;
        let id = self.repository.insert(record).await?;

        log::info!("Tournament {id} '{}' created by {created_by} at venue {venue_id}", name.trim());
        Ok(id)
    }

    pub async fn add_director(
        &self,
        id: TournamentId,
        by: UserId,
        user_id: UserId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            if !record.directors.contains(&user_id) {
                record.directors.push(user_id);
            }
            Ok(())
        })
        .await
    }

    pub async fn add_team(
        &self,
        id: TournamentId,
        by: UserId,
        team: NewTeam,
    ) -> TournamentResult<TeamId> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::register_team(record, team.clone())
        })
        .await
    }

    pub async fn remove_team(
        &self,
        id: TournamentId,
        by: UserId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::unregister_team(record, team_id)
        })
        .await
    }

    /// Start play
    ///
    /// # Returns
    ///
    /// * `Vec<GameId>` - Games created by the initial table assignment
    pub async fn start(&self, id: TournamentId, by: UserId) -> TournamentResult<Vec<GameId>> {
        let today = Utc::now().date_naive();
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::start(record, today, &mut rand::rng())
        })
        .await
    }

    pub async fn pause(&self, id: TournamentId, by: UserId) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::pause(record)
        })
        .await
    }

    pub async fn resume(&self, id: TournamentId, by: UserId) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::resume(record)?;
            Self::refill(record)
        })
        .await
    }

    /// End the tournament now and assign final payouts
    pub async fn complete(&self, id: TournamentId, by: UserId) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, by)?;
            lifecycle::complete(record)
        })
        .await
    }

    // === Queries ===

    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<TournamentRecord> {
        Ok(self.repository.load(id).await?.record)
    }

    pub async fn list_tournaments(&self) -> TournamentResult<Vec<TournamentListing>> {
        self.repository.list().await
    }

    pub async fn standings(&self, id: TournamentId) -> TournamentResult<Vec<Standing>> {
        let record = self.get_tournament(id).await?;
        Ok(lifecycle::standings(&record))
    }

    /// Ledger entries of one team, oldest first
    pub async fn chip_history(
        &self,
        id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<Vec<ChipTransaction>> {
        let record = self.get_tournament(id).await?;
        record.team(team_id)?;
        Ok(ledger::team_history(&record, team_id).into_iter().cloned().collect())
    }

    pub async fn chip_stats(&self, id: TournamentId) -> TournamentResult<ChipStats> {
        let record = self.get_tournament(id).await?;
        Ok(ledger::tournament_chip_stats(&record))
    }

    pub async fn money_summary(&self, id: TournamentId) -> TournamentResult<MoneySummary> {
        let record = self.get_tournament(id).await?;
        Ok(calculator::money_summary(&record))
    }

    pub async fn active_games(&self, id: TournamentId) -> TournamentResult<Vec<Game>> {
        let record = self.get_tournament(id).await?;
        Ok(progression::active_games(&record).into_iter().cloned().collect())
    }

    pub async fn game_history(
        &self,
        id: TournamentId,
        team_id: Option<TeamId>,
    ) -> TournamentResult<Vec<Game>> {
        let record = self.get_tournament(id).await?;
        Ok(progression::game_history(&record, team_id)
            .into_iter()
            .cloned()
            .collect())
    }

    // === Games ===

    pub async fn start_game(&self, id: TournamentId, game_id: GameId) -> TournamentResult<()> {
        self.mutate(id, |record| {
            record.require_status(&[TournamentStatus::InProgress])?;
            progression::start(record, game_id)
        })
        .await
    }

    /// Report a game result
    ///
    /// # Returns
    ///
    /// * `bool` - `true` when the game completed without waiting for approval
    pub async fn submit_scores(
        &self,
        id: TournamentId,
        game_id: GameId,
        report: ScoreReport,
        submitted_by: UserId,
    ) -> TournamentResult<bool> {
        self.mutate(id, |record| {
            record.require_status(&[TournamentStatus::InProgress])?;
            progression::submit_scores(record, game_id, report, submitted_by, &mut rand::rng())
        })
        .await
    }

    pub async fn approve_scores(
        &self,
        id: TournamentId,
        director: UserId,
        game_id: GameId,
    ) -> TournamentResult<()> {
        self.perform(id, director, ApproveScores { game_id }.into())
            .await
            .map(|_| ())
    }

    pub async fn modify_scores(
        &self,
        id: TournamentId,
        director: UserId,
        game_id: GameId,
        report: ScoreReport,
        reason: &str,
    ) -> TournamentResult<()> {
        let action = ModifyScores {
            game_id,
            report,
            reason: reason.to_string(),
        };
        self.perform(id, director, action.into()).await.map(|_| ())
    }

    /// Cancel an active game; its teams return to the queue
    pub async fn cancel_game(
        &self,
        id: TournamentId,
        director: UserId,
        game_id: GameId,
        reason: &str,
    ) -> TournamentResult<Vec<TeamId>> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
            progression::cancel(record, game_id, director, reason)
        })
        .await
    }

    pub async fn restart_game(
        &self,
        id: TournamentId,
        director: UserId,
        game_id: GameId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
            progression::restart(record, game_id, director)
        })
        .await
    }

    // === Tables and queue ===

    /// Seat a team at a table by hand
    pub async fn assign_table(
        &self,
        id: TournamentId,
        director: UserId,
        table_id: TableId,
        team_id: TeamId,
    ) -> TournamentResult<Option<GameId>> {
        match self
            .perform(id, director, AssignTable { table_id, team_id }.into())
            .await?
        {
            ActionOutcome::TableAssigned { game_id, .. } => Ok(game_id),
            other => Err(TournamentError::InvariantViolation(format!(
                "table assignment produced {other:?}"
            ))),
        }
    }

    /// Take a table out of play; its teams are re-queued
    pub async fn close_table(
        &self,
        id: TournamentId,
        director: UserId,
        table_id: TableId,
    ) -> TournamentResult<Vec<TeamId>> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            if record.status == TournamentStatus::Completed {
                return Err(TournamentError::InvalidTournamentState {
                    expected: vec![
                        TournamentStatus::Setup,
                        TournamentStatus::InProgress,
                        TournamentStatus::Paused,
                    ],
                    actual: record.status,
                });
            }
            let requeued = assignment::close_table(record, table_id, director)?;
            Self::refill(record)?;
            Ok(requeued)
        })
        .await
    }

    pub async fn open_table(
        &self,
        id: TournamentId,
        director: UserId,
        table_id: TableId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            assignment::open_table(record, table_id)?;
            Self::refill(record)
        })
        .await
    }

    /// Pin a team as the table's winner; everyone else there is re-queued
    pub async fn force_winner_stays(
        &self,
        id: TournamentId,
        director: UserId,
        table_id: TableId,
        team_id: TeamId,
    ) -> TournamentResult<Option<GameId>> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            record.require_status(&[TournamentStatus::InProgress])?;
            assignment::force_winner_stays(record, table_id, team_id)
        })
        .await
    }

    pub async fn shuffle_queue(&self, id: TournamentId, director: UserId) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            record.require_status(&[TournamentStatus::InProgress, TournamentStatus::Paused])?;
            queue::shuffle(record, director, &mut rand::rng())
        })
        .await
    }

    // === Director overrides ===

    /// Authorize and run a director action
    pub async fn perform(
        &self,
        id: TournamentId,
        director: UserId,
        action: DirectorAction,
    ) -> TournamentResult<ActionOutcome> {
        let outcome = self
            .mutate(id, |record| {
                self.require_director(record, director)?;
                let mut rng = rand::rng();
                let mut ctx = DirectorContext {
                    director,
                    eligibility: self.eligibility.as_ref(),
                    rng: &mut rng,
                };
                action.apply(record, &mut ctx)
            })
            .await?;

        log::info!(
            "Tournament {id}: director {director} performed {}",
            action.kind()
        );
        Ok(outcome)
    }

    /// Add or remove chips by hand
    pub async fn adjust_chips(
        &self,
        id: TournamentId,
        director: UserId,
        team_id: TeamId,
        amount: i64,
        reason: &str,
    ) -> TournamentResult<ChipTransaction> {
        let action = ChipAdjustment {
            team_id,
            amount,
            reason: reason.to_string(),
        };
        match self.perform(id, director, action.into()).await? {
            ActionOutcome::ChipsAdjusted { transaction } => Ok(transaction),
            other => Err(TournamentError::InvariantViolation(format!(
                "chip adjustment produced {other:?}"
            ))),
        }
    }

    // === Money ===

    pub async fn create_payout_split(
        &self,
        id: TournamentId,
        director: UserId,
        split: NewPayoutSplit,
    ) -> TournamentResult<SplitId> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            calculator::create_payout_split(record, split.clone(), director)
        })
        .await
    }

    pub async fn mark_payout_paid(
        &self,
        id: TournamentId,
        director: UserId,
        payout_id: PayoutId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            calculator::mark_payout_paid(record, payout_id, director)
        })
        .await
    }

    pub async fn create_side_pot(
        &self,
        id: TournamentId,
        director: UserId,
        side_pot: NewSidePot,
    ) -> TournamentResult<SidePotId> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            side_pots::create_side_pot(record, side_pot.clone(), director)
        })
        .await
    }

    pub async fn enter_side_pot(
        &self,
        id: TournamentId,
        director: UserId,
        side_pot_id: SidePotId,
        entrant: SidePotEntrant,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            side_pots::enter_side_pot(record, side_pot_id, entrant)
        })
        .await
    }

    pub async fn complete_side_pot(
        &self,
        id: TournamentId,
        director: UserId,
        side_pot_id: SidePotId,
        winner: SidePotEntrant,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            side_pots::complete_side_pot(record, side_pot_id, winner, director)
        })
        .await
    }

    pub async fn mark_side_pot_paid(
        &self,
        id: TournamentId,
        director: UserId,
        side_pot_id: SidePotId,
    ) -> TournamentResult<()> {
        self.mutate(id, |record| {
            self.require_director(record, director)?;
            side_pots::mark_side_pot_paid(record, side_pot_id)
        })
        .await
    }
}
