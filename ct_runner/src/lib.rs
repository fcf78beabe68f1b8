//! Runner support: configuration, logging and the tournament simulation.

pub mod config;
pub mod logging;
pub mod simulation;

pub use config::{ConfigError, RunnerConfig, RunnerOverrides};
pub use simulation::{Simulation, SimulationReport};
