//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; its records are bridged into
//! the same `tracing` subscriber as the runner's own events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var; the default keeps
/// the engine at `info` and quiets `sqlx`.
///
/// # Example
///
/// ```no_run
/// ct_runner::logging::init();
/// tracing::info!("Runner starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Audit line for a director override
///
/// # Example
///
/// ```
/// use ct_runner::logging::log_director_action;
///
/// log_director_action(1, 42, "approve_scores", "game 7");
/// ```
pub fn log_director_action(tournament_id: i64, director: i64, action: &str, detail: &str) {
    tracing::info!(
        tournament_id = tournament_id,
        director = director,
        action = action,
        "AUDIT: {}",
        detail
    );
}

/// Log a finished game
pub fn log_game_result(tournament_id: i64, game_id: i64, winner: i64, loser: i64, score: &str) {
    tracing::debug!(
        tournament_id = tournament_id,
        game_id = game_id,
        winner = winner,
        loser = loser,
        score = score,
        "Game completed"
    );
}

/// Log performance metric
///
/// # Arguments
///
/// * `operation` - Operation name
/// * `duration_ms` - Duration in milliseconds
/// * `metadata` - Additional metadata
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}
