//! Simulated tournament driven through the engine's public API.
//!
//! Registers a field, starts play, reports random race results, approves
//! them as the director and seats teams by hand when autopilot is off.

use anyhow::{Context, bail};
use chip_tourney::db::TournamentRepository;
use chip_tourney::game::{Game, GameStatus, ScoreReport};
use chip_tourney::money::{MoneyBreakdown, Payout};
use chip_tourney::table::{StaticVenueCatalog, TableId, TableStatus, VenueId};
use chip_tourney::tournament::{
    NewTeam, Standing, TeamId, TeamMember, TournamentId, TournamentManager, TournamentRecord,
    UserId,
};
use chip_tourney::{TournamentSettings, TournamentStatus};
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::RunnerConfig;
use crate::logging;

/// User acting as tournament director
pub const DIRECTOR_ID: UserId = 1;

/// Venue hosting the simulated tables
pub const VENUE_ID: VenueId = 1;

const TEAM_NAMES: [&str; 12] = [
    "Rail Birds",
    "Side Pockets",
    "Break Masters",
    "Bank Shots",
    "Corner Pocket",
    "Cue Balls",
    "Eight Ballers",
    "Nine Lives",
    "Chalk Dust",
    "Kiss Shots",
    "Masse Crew",
    "Sharks",
];

/// One in this many results is a forfeit
const FORFEIT_ODDS: u32 = 25;

/// Outcome of a simulated tournament
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub games_played: usize,
    pub standings: Vec<Standing>,
    pub breakdown: MoneyBreakdown,
    pub payouts: Vec<Payout>,
    /// Interrupted before a winner was decided
    pub stopped: bool,
}

impl SimulationReport {
    pub fn champion(&self) -> Option<&Standing> {
        (self.status == TournamentStatus::Completed)
            .then(|| self.standings.first())
            .flatten()
    }
}

fn dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tournament {} ({}) after {} game(s)",
            self.tournament_id, self.status, self.games_played
        )?;
        if self.stopped {
            writeln!(f, "Interrupted: the tournament was paused")?;
        }
        writeln!(f)?;
        writeln!(f, "{:>4}  {:<24} {:>6} {:>5} {:>5}", "Rank", "Team", "Chips", "Won", "Lost")?;
        for s in &self.standings {
            writeln!(
                f,
                "{:>4}  {:<24} {:>6} {:>5} {:>5}",
                s.rank, s.name, s.current_chips, s.total_chips_won, s.total_chips_lost
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "Pool: {} entries, {} admin, {} added, {} paid out",
            dollars(self.breakdown.total_entry_fees),
            dollars(self.breakdown.total_admin_fees),
            dollars(self.breakdown.added_money),
            dollars(self.breakdown.total_payout)
        )?;
        for payout in &self.payouts {
            let team = payout
                .team_id
                .and_then(|id| self.standings.iter().find(|s| s.team_id == id))
                .map(|s| s.name.as_str())
                .unwrap_or("unassigned");
            writeln!(f, "  {:<12} {:>10}  {}", payout.description, dollars(payout.amount), team)?;
        }
        Ok(())
    }
}

/// Drives one tournament from registration to the last team standing
pub struct Simulation {
    manager: TournamentManager,
    config: RunnerConfig,
    stop: Arc<AtomicBool>,
}

impl Simulation {
    /// Create a simulation over a repository; the venue gets the configured tables
    pub fn new(repository: Arc<dyn TournamentRepository>, config: RunnerConfig) -> Self {
        let venues = StaticVenueCatalog::new().with_tables(VENUE_ID, config.field.tables);
        Self {
            manager: TournamentManager::new(repository).with_venues(Arc::new(venues)),
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends the run after the current game
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn manager(&self) -> &TournamentManager {
        &self.manager
    }

    /// Run the whole tournament
    ///
    /// # Errors
    ///
    /// Fails if the engine rejects an operation, play stalls, or the game
    /// cap is reached before a winner is decided
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> anyhow::Result<SimulationReport> {
        let started = Instant::now();
        let settings = self.config.tournament_settings();
        let id = self.register_field(settings, rng).await?;

        let games = self
            .manager
            .start(id, DIRECTOR_ID)
            .await
            .context("Failed to start tournament")?;
        tracing::info!("Tournament {} started with {} game(s) in play", id, games.len());

        let mut games_played = 0;
        let mut stopped = false;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                self.manager.pause(id, DIRECTOR_ID).await?;
                tracing::warn!("Tournament {} paused on request", id);
                stopped = true;
                break;
            }
            let record = self.manager.get_tournament(id).await?;
            if record.status == TournamentStatus::Completed {
                break;
            }
            if games_played >= self.config.max_games {
                bail!("No winner after {} games", games_played);
            }

            let game = match self.next_game(&record).await? {
                Some(game) => game,
                None => bail!("Play stalled: no game can be seated"),
            };
            self.play(id, &game, rng).await?;
            games_played += 1;
        }

        logging::log_performance(
            "simulation",
            started.elapsed().as_millis() as u64,
            Some(&format!("{} teams, {} games", self.config.field.teams, games_played)),
        );

        let record = self.manager.get_tournament(id).await?;
        let money = self.manager.money_summary(id).await?;
        Ok(SimulationReport {
            tournament_id: id,
            status: record.status,
            games_played,
            standings: self.manager.standings(id).await?,
            breakdown: money.breakdown,
            payouts: money.payouts,
            stopped,
        })
    }

    async fn register_field<R: Rng + ?Sized>(
        &self,
        settings: TournamentSettings,
        rng: &mut R,
    ) -> anyhow::Result<TournamentId> {
        let name = format!("Simulated Open {}", chrono::Utc::now().format("%Y-%m-%d"));
        let id = self
            .manager
            .create_tournament(&name, VENUE_ID, settings, DIRECTOR_ID)
            .await
            .context("Failed to create tournament")?;

        for n in 0..self.config.field.teams {
            let name = match n / TEAM_NAMES.len() {
                0 => TEAM_NAMES[n].to_string(),
                lap => format!("{} {}", TEAM_NAMES[n % TEAM_NAMES.len()], lap + 1),
            };
            let first = 1000 + 2 * n as i64;
            let members = vec![
                TeamMember::new(first, format!("Player {first}"))
                    .with_rating(rng.random_range(0..=400)),
                TeamMember::new(first + 1, format!("Player {}", first + 1))
                    .with_rating(rng.random_range(0..=400)),
            ];
            // Manual ordering seeds teams in registration order
            let team = NewTeam::new(name, members).with_seed(n as u32 + 1);
            self.manager
                .add_team(id, DIRECTOR_ID, team)
                .await
                .with_context(|| format!("Failed to register team {}", n + 1))?;
        }
        tracing::info!("Registered {} teams in tournament {}", self.config.field.teams, id);
        Ok(id)
    }

    /// First active game, seating waiting teams by hand if none is running
    async fn next_game(&self, record: &TournamentRecord) -> anyhow::Result<Option<Game>> {
        if let Some(game) = self.manager.active_games(record.id).await?.into_iter().next() {
            return Ok(Some(game));
        }
        self.seat_waiting_teams(record.id).await?;
        Ok(self.manager.active_games(record.id).await?.into_iter().next())
    }

    /// Director seating for tournaments without autopilot
    ///
    /// Tables already holding a team are filled first, from the queue or by
    /// merging a team sitting alone at another table.
    async fn seat_waiting_teams(&self, id: TournamentId) -> anyhow::Result<()> {
        let limit = self.config.field.teams * self.config.field.tables.max(1) + 1;
        for _ in 0..limit {
            let record = self.manager.get_tournament(id).await?;
            let Some((table_id, team_id)) = next_seating(&record) else {
                return Ok(());
            };
            self.manager
                .assign_table(id, DIRECTOR_ID, table_id, team_id)
                .await?;
            logging::log_director_action(
                id,
                DIRECTOR_ID,
                "assign_table",
                &format!("team {team_id} to table {table_id}"),
            );
        }
        Ok(())
    }

    async fn play<R: Rng + ?Sized>(
        &self,
        id: TournamentId,
        game: &Game,
        rng: &mut R,
    ) -> anyhow::Result<()> {
        if game.status == GameStatus::NotStarted {
            self.manager.start_game(id, game.id).await?;
        }

        let report = random_report(game, rng);
        let completed = self
            .manager
            .submit_scores(id, game.id, report, DIRECTOR_ID)
            .await
            .with_context(|| format!("Failed to submit scores for game {}", game.id))?;
        if !completed {
            self.manager.approve_scores(id, DIRECTOR_ID, game.id).await?;
            logging::log_director_action(
                id,
                DIRECTOR_ID,
                "approve_scores",
                &format!("game {}", game.id),
            );
        }

        let record = self.manager.get_tournament(id).await?;
        let played = record.game(game.id)?;
        if let (Some(winner), Some(loser)) = (played.winning_team_id, played.losing_team_id) {
            let score = match played.forfeited_by {
                Some(_) => "forfeit".to_string(),
                None => format!("{}-{}", played.team_a_score, played.team_b_score),
            };
            logging::log_game_result(id, game.id, winner, loser, &score);
        }
        Ok(())
    }
}

fn random_report<R: Rng + ?Sized>(game: &Game, rng: &mut R) -> ScoreReport {
    if rng.random_ratio(1, FORFEIT_ODDS) {
        let forfeiter = if rng.random_bool(0.5) {
            game.team_a_id
        } else {
            game.team_b_id
        };
        return ScoreReport::forfeit(forfeiter);
    }
    let race = game.race_to_wins;
    let loser_racks = rng.random_range(0..race);
    if rng.random_bool(0.5) {
        ScoreReport::new(race, loser_racks)
    } else {
        ScoreReport::new(loser_racks, race)
    }
}

/// Next (table, team) a director would seat, if any
fn next_seating(record: &TournamentRecord) -> Option<(TableId, TeamId)> {
    let idle_tables = record.tables.values().filter(|t| {
        t.is_active
            && t.status != TableStatus::Closed
            && t.has_seat()
            && record.active_game_at(t.id).is_none()
    });
    let (partial, empty): (Vec<_>, Vec<_>) = idle_tables.partition(|t| !t.occupants.is_empty());

    for table in &partial {
        if let Some(head) = record.queue.order.first() {
            return Some((table.id, *head));
        }
        let lone = partial
            .iter()
            .filter(|other| other.id != table.id && other.occupants.len() == 1)
            .find_map(|other| other.occupants.first());
        if let Some(team_id) = lone {
            return Some((table.id, *team_id));
        }
    }
    match (empty.first(), record.queue.order.first()) {
        (Some(table), Some(head)) => Some((table.id, *head)),
        _ => None,
    }
}
