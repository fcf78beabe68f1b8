//! Runner configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chip_tourney::db::DatabaseConfig;
use chip_tourney::tournament::{BracketOrdering, TournamentSettings};

/// Complete runner configuration loaded from environment variables and CLI overrides
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// PostgreSQL storage; in-memory storage when absent
    pub database: Option<DatabaseConfig>,
    /// Simulated field
    pub field: FieldConfig,
    /// Money settings, in cents
    pub money: MoneyConfig,
    /// RNG seed for reproducible runs
    pub seed: Option<u64>,
    /// Safety cap on simulated games
    pub max_games: usize,
}

/// Shape of the simulated tournament
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Number of teams to register
    pub teams: usize,
    /// Number of tables at the venue
    pub tables: usize,
    /// Race length of every game
    pub race_to: u32,
    /// Starting chips per team
    pub chips: u32,
    /// Tables refill automatically after each game
    pub autopilot: bool,
    /// Initial queue ordering
    pub ordering: BracketOrdering,
    /// Scores complete games without director approval
    pub auto_accept: bool,
}

/// Entry fees and added money
#[derive(Debug, Clone)]
pub struct MoneyConfig {
    pub entry_fee: i64,
    pub admin_fee: i64,
    pub added_money: i64,
}

/// Values given on the command line; they win over the environment
#[derive(Debug, Clone, Default)]
pub struct RunnerOverrides {
    pub database_url: Option<String>,
    pub teams: Option<usize>,
    pub tables: Option<usize>,
    pub race_to: Option<u32>,
    pub chips: Option<u32>,
    pub autopilot: Option<bool>,
    pub seed: Option<u64>,
}

impl RunnerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values from CLI arguments
    ///
    /// # Returns
    ///
    /// * `Result<RunnerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be parsed
    pub fn from_env(overrides: RunnerOverrides) -> Result<Self, ConfigError> {
        // Storage: a --db-url always selects PostgreSQL; otherwise CT_STORAGE
        // decides, falling back to DATABASE_URL being present
        let storage = std::env::var("CT_STORAGE")
            .unwrap_or_default()
            .to_lowercase();
        let database_url = match overrides.database_url {
            Some(url) => Some(url),
            None => match storage.as_str() {
                "memory" => None,
                "postgres" => Some(std::env::var("DATABASE_URL").map_err(|_| {
                    ConfigError::MissingRequired {
                        var: "DATABASE_URL".to_string(),
                        hint: "Pass --db-url or set DATABASE_URL when CT_STORAGE=postgres"
                            .to_string(),
                    }
                })?),
                "" => std::env::var("DATABASE_URL").ok(),
                other => {
                    return Err(ConfigError::Invalid {
                        var: "CT_STORAGE".to_string(),
                        reason: format!("Unknown storage '{other}' (memory, postgres)"),
                    });
                }
            },
        };

        let database = database_url.map(|database_url| DatabaseConfig {
            database_url,
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", 10),
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", 1),
            connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT", 10),
            idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT", 600),
            max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME", 1800),
        });

        let ordering = match std::env::var("CT_ORDERING") {
            Ok(v) => match v.to_lowercase().as_str() {
                "random" => BracketOrdering::Random,
                "seeded" => BracketOrdering::Seeded,
                "manual" => BracketOrdering::Manual,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CT_ORDERING".to_string(),
                        reason: format!("Unknown ordering '{v}' (random, seeded, manual)"),
                    });
                }
            },
            Err(_) => BracketOrdering::Random,
        };

        let field = FieldConfig {
            teams: overrides
                .teams
                .unwrap_or_else(|| parse_env_or("CT_TEAMS", 8)),
            tables: overrides
                .tables
                .unwrap_or_else(|| parse_env_or("CT_TABLES", 2)),
            race_to: overrides
                .race_to
                .unwrap_or_else(|| parse_env_or("CT_RACE_TO", 2)),
            chips: overrides
                .chips
                .unwrap_or_else(|| parse_env_or("CT_CHIPS", 3)),
            autopilot: overrides
                .autopilot
                .unwrap_or_else(|| parse_env_or("CT_AUTOPILOT", true)),
            ordering,
            auto_accept: parse_env_or("CT_AUTO_ACCEPT", false),
        };

        let money = MoneyConfig {
            entry_fee: parse_env_or("CT_ENTRY_FEE", 2000),
            admin_fee: parse_env_or("CT_ADMIN_FEE", 500),
            added_money: parse_env_or("CT_ADDED_MONEY", 0),
        };

        let seed = match overrides.seed {
            Some(seed) => Some(seed),
            None => match std::env::var("CT_SEED") {
                Ok(v) => Some(v.parse().map_err(|_| ConfigError::Invalid {
                    var: "CT_SEED".to_string(),
                    reason: format!("'{v}' is not an unsigned integer"),
                })?),
                Err(_) => None,
            },
        };

        Ok(RunnerConfig {
            database,
            field,
            money,
            seed,
            max_games: parse_env_or("CT_MAX_GAMES", 10_000),
        })
    }

    /// Tournament settings for the simulated event
    pub fn tournament_settings(&self) -> TournamentSettings {
        TournamentSettings {
            default_chips_per_team: self.field.chips,
            auto_accept_scores: self.field.auto_accept,
            ..TournamentSettings::default()
        }
        .with_race_to(self.field.race_to)
        .with_autopilot(self.field.autopilot)
        .with_ordering(self.field.ordering)
        .with_fees(
            self.money.entry_fee,
            self.money.admin_fee,
            self.money.added_money,
        )
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field.teams < 2 {
            return Err(ConfigError::Invalid {
                var: "CT_TEAMS".to_string(),
                reason: "Must be at least 2".to_string(),
            });
        }

        if self.field.tables == 0 {
            return Err(ConfigError::Invalid {
                var: "CT_TABLES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.field.chips == 0 {
            return Err(ConfigError::Invalid {
                var: "CT_CHIPS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.max_games == 0 {
            return Err(ConfigError::Invalid {
                var: "CT_MAX_GAMES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(db) = &self.database {
            if db.min_connections > db.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        db.max_connections
                    ),
                });
            }
        }

        // Race length, fees and the rest are the engine's own rules
        self.tournament_settings()
            .validate()
            .map_err(|e| ConfigError::Invalid {
                var: "tournament settings".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const RUNNER_VARS: [&str; 9] = [
        "DATABASE_URL",
        "CT_STORAGE",
        "CT_TEAMS",
        "CT_TABLES",
        "CT_RACE_TO",
        "CT_CHIPS",
        "CT_AUTOPILOT",
        "CT_ORDERING",
        "CT_SEED",
    ];

    fn clear_env() {
        for var in RUNNER_VARS {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults_use_memory_storage() {
        clear_env();
        let config = RunnerConfig::from_env(RunnerOverrides::default()).unwrap();
        assert!(config.database.is_none());
        assert_eq!(config.field.teams, 8);
        assert_eq!(config.field.tables, 2);
        assert!(config.field.autopilot);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_overrides_win_over_env() {
        clear_env();
        unsafe {
            std::env::set_var("CT_TEAMS", "12");
            std::env::set_var("CT_TABLES", "3");
        }
        let overrides = RunnerOverrides {
            teams: Some(5),
            database_url: Some("postgres://localhost/ct".to_string()),
            ..RunnerOverrides::default()
        };
        let config = RunnerConfig::from_env(overrides).unwrap();
        assert_eq!(config.field.teams, 5);
        assert_eq!(config.field.tables, 3);
        assert_eq!(
            config.database.map(|d| d.database_url),
            Some("postgres://localhost/ct".to_string())
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_ordering_is_rejected() {
        clear_env();
        unsafe { std::env::set_var("CT_ORDERING", "alphabetical") };
        let err = RunnerConfig::from_env(RunnerOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "CT_ORDERING"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_bad_seed_is_rejected() {
        clear_env();
        unsafe { std::env::set_var("CT_SEED", "lucky") };
        assert!(RunnerConfig::from_env(RunnerOverrides::default()).is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_validation_rejects_small_field() {
        clear_env();
        let overrides = RunnerOverrides {
            teams: Some(1),
            ..RunnerOverrides::default()
        };
        let config = RunnerConfig::from_env(overrides).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CT_TEAMS"));
    }

    #[test]
    #[serial]
    fn test_validation_defers_to_engine_rules() {
        clear_env();
        let overrides = RunnerOverrides {
            race_to: Some(0),
            ..RunnerOverrides::default()
        };
        let config = RunnerConfig::from_env(overrides).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_postgres_storage_requires_url() {
        clear_env();
        unsafe { std::env::set_var("CT_STORAGE", "postgres") };
        let err = RunnerConfig::from_env(RunnerOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { ref var, .. } if var == "DATABASE_URL"));

        unsafe {
            std::env::set_var("CT_STORAGE", "memory");
            std::env::set_var("DATABASE_URL", "postgres://localhost/ignored");
        }
        let config = RunnerConfig::from_env(RunnerOverrides::default()).unwrap();
        assert!(config.database.is_none());
        clear_env();
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use --db-url".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use --db-url"));
    }
}
