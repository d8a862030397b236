//! bday-core library.
//!
//! Estimates, by repeated random trials, how likely it is that a group of
//! `n` people drawn over `buckets` equally likely birthdays contains at
//! least `threshold` people sharing one.
//!
//! # Conventions
//!
//! - **Errors**: configuration problems are [`ConfigError`]; file and I/O
//!   paths return `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod error;
pub mod rng;
pub mod simulator;
pub mod timing;
pub mod walk;

pub use config::{ConfigOverrides, SimulationConfig, TrialStrategy};
pub use error::{ConfigError, ErrorCode};
pub use rng::{BitGenerator, Mxws32, Mxws64};
pub use simulator::{
    CollisionSimulator, ResultRecord, SweepOutcome, estimate_collision_probabilities,
};
