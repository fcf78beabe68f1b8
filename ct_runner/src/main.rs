//! Chip tournament runner.
//!
//! Registers a field, plays it out to the last team holding chips and
//! prints the standings and payouts. Storage is in memory unless a
//! PostgreSQL URL is configured.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Error};
use chip_tourney::db::{Database, MemoryTournamentRepository, TournamentRepository};
use ct_runner::{RunnerConfig, RunnerOverrides, Simulation, logging};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use rand::SeedableRng;
use rand::rngs::StdRng;

const HELP: &str = "\
Run a simulated chip tournament

USAGE:
  ct_runner [OPTIONS]

OPTIONS:
  --db-url     URL         PostgreSQL connection string  [default: env DATABASE_URL, else in-memory]
  --teams      N           Teams to register             [default: env CT_TEAMS or 8]
  --tables     N           Tables at the venue           [default: env CT_TABLES or 2]
  --race-to    N           Race length of each game      [default: env CT_RACE_TO or 2]
  --chips      N           Starting chips per team       [default: env CT_CHIPS or 3]
  --autopilot  BOOL        Refill tables automatically   [default: env CT_AUTOPILOT or true]
  --seed       N           RNG seed for a reproducible run

FLAGS:
  --json                   Print the report as JSON
  -h, --help               Print help information

ENVIRONMENT:
  CT_STORAGE               memory | postgres
  DATABASE_URL             PostgreSQL connection string
  CT_ORDERING              random | seeded | manual
  CT_AUTO_ACCEPT           Complete games without director approval
  CT_ENTRY_FEE, CT_ADMIN_FEE, CT_ADDED_MONEY   Money settings in cents
  CT_MAX_GAMES             Safety cap on simulated games
  RUST_LOG                 Log filter (e.g., info,chip_tourney=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let json = pargs.contains("--json");

    let overrides = RunnerOverrides {
        database_url: pargs.opt_value_from_str("--db-url")?,
        teams: pargs.opt_value_from_str("--teams")?,
        tables: pargs.opt_value_from_str("--tables")?,
        race_to: pargs.opt_value_from_str("--race-to")?,
        chips: pargs.opt_value_from_str("--chips")?,
        autopilot: pargs.opt_value_from_str("--autopilot")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };

    logging::init();

    let config = RunnerConfig::from_env(overrides)?;
    config.validate()?;

    let database = match &config.database {
        Some(db_config) => {
            info!("Connecting to database: {}", db_config.database_url);
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            db.health_check().await?;
            info!("Database connected successfully");
            Some(db)
        }
        None => None,
    };
    let repository: Arc<dyn TournamentRepository> = match &database {
        Some(db) => Arc::new(db.tournaments()),
        None => {
            info!("Using in-memory storage");
            Arc::new(MemoryTournamentRepository::new())
        }
    };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let simulation = Simulation::new(repository, config);

    // Catching signals: finish the current game, then pause.
    let stop = simulation.stop_handle();
    set_handler(move || stop.store(true, Ordering::SeqCst))?;

    let report = simulation.run(&mut rng).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if let Some(champion) = report.champion() {
        info!("Champion: {} with {} chips", champion.name, champion.current_chips);
    }
    if let Some(db) = database {
        db.close().await;
    }
    Ok(())
}
