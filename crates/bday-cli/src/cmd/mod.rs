pub mod completions;
pub mod config;
pub mod run;
pub mod wave;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use bday_core::config::{self as core_config, ConfigOverrides, SimulationConfig, TrialStrategy};
use bday_core::{ConfigError, ErrorCode};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use crate::output::{CliError, OutputMode, render_error};

/// Exit status for rejected input.
pub const EXIT_USAGE: i32 = 2;

/// Simulation flags shared by `bday run` and `bday config`.
#[derive(Args, Debug, Clone, Default)]
pub struct SimFlags {
    /// Number of equally likely birthdays.
    #[arg(long, value_name = "N")]
    pub days: Option<u32>,

    /// Random groups drawn per group size.
    #[arg(long, value_name = "N")]
    pub trials: Option<u64>,

    /// People that must share a birthday to count as a collision.
    #[arg(short = 'k', long, value_name = "K")]
    pub threshold: Option<u32>,

    /// Smallest group size in the sweep.
    #[arg(long, value_name = "N")]
    pub min: Option<u32>,

    /// Largest group size in the sweep.
    #[arg(long, value_name = "N")]
    pub max: Option<u32>,

    /// Worker threads, each with its own generator.
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Base seed; worker i uses seed + i. Omit for OS entropy.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Draw every person in each group instead of stopping at the first collision.
    #[arg(long)]
    pub exhaustive: bool,

    /// Config file to load instead of the per-user one.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl SimFlags {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            buckets: self.days,
            trials: self.trials,
            threshold: self.threshold,
            min_group: self.min,
            max_group: self.max,
            workers: self.workers,
            seed: self.seed,
            strategy: self.exhaustive.then_some(TrialStrategy::Exhaustive),
        }
    }
}

/// Where the base configuration came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum ConfigSource {
    Explicit(PathBuf),
    User(PathBuf),
    Defaults,
}

impl ConfigSource {
    fn detect(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::Explicit(path.to_path_buf());
        }
        match core_config::user_config_path() {
            Some(path) if path.exists() => Self::User(path),
            _ => Self::Defaults,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Explicit(path) | Self::User(path) => path.display().to_string(),
            Self::Defaults => "built-in defaults".to_string(),
        }
    }
}

/// Load the base config, apply flag overrides, and validate.
///
/// Invalid input is reported in `output` mode and the process exits with
/// [`EXIT_USAGE`]; nothing has been written to stdout at that point.
pub fn effective_config(
    flags: &SimFlags,
    output: OutputMode,
) -> Result<(SimulationConfig, ConfigSource)> {
    let source = ConfigSource::detect(flags.config.as_deref());
    let base = match core_config::resolve_config(flags.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            let code = ErrorCode::ConfigParseError;
            let cli_err = CliError {
                message: format!("{err:#}"),
                suggestion: code.hint().map(str::to_owned),
                error_code: Some(code.code().to_owned()),
            };
            exit_with(output, &cli_err)
        }
    };
    debug!(source = %source.describe(), "base configuration loaded");

    let config = base.with_overrides(&flags.overrides());
    if let Err(err) = config.validate() {
        reject(output, &err);
    }
    Ok((config, source))
}

/// Report a configuration error and exit.
pub fn reject(output: OutputMode, err: &ConfigError) -> ! {
    exit_with(output, &CliError::from(err))
}

pub fn exit_with(output: OutputMode, err: &CliError) -> ! {
    let _ = render_error(output, err);
    process::exit(EXIT_USAGE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_overrides() {
        let flags = SimFlags {
            days: Some(366),
            threshold: Some(3),
            seed: Some(9),
            exhaustive: true,
            ..SimFlags::default()
        };
        let overrides = flags.overrides();
        assert_eq!(overrides.buckets, Some(366));
        assert_eq!(overrides.threshold, Some(3));
        assert_eq!(overrides.seed, Some(9));
        assert_eq!(overrides.trials, None);
        assert_eq!(overrides.strategy, Some(TrialStrategy::Exhaustive));
    }

    #[test]
    fn short_circuit_is_not_forced_without_flag() {
        let overrides = SimFlags::default().overrides();
        assert_eq!(overrides.strategy, None);
    }

    #[test]
    fn explicit_source_is_reported_verbatim() {
        let source = ConfigSource::detect(Some(Path::new("sim.toml")));
        assert_eq!(source, ConfigSource::Explicit(PathBuf::from("sim.toml")));
        assert_eq!(source.describe(), "sim.toml");
        assert_eq!(ConfigSource::Defaults.describe(), "built-in defaults");
    }
}
