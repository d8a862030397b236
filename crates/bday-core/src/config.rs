use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Most worker threads a sweep will spawn.
pub const MAX_WORKERS: usize = 1024;

/// How a single trial spends its draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialStrategy {
    /// Stop drawing the moment a bucket reaches the threshold.
    #[default]
    ShortCircuit,
    /// Always draw the whole group, then classify.
    Exhaustive,
}

/// Immutable parameters of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of equally likely buckets ("days").
    #[serde(default = "default_buckets")]
    pub buckets: u32,
    /// Independent trials per group size.
    #[serde(default = "default_trials")]
    pub trials: u64,
    /// Occupants of one bucket that count as a collision.
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// First group size of the sweep (inclusive).
    #[serde(default = "default_min_group")]
    pub min_group: u32,
    /// Last group size of the sweep (inclusive).
    #[serde(default = "default_max_group")]
    pub max_group: u32,
    /// Worker threads sharing each group size's trials.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Base seed; drawn from OS entropy when absent.
    #[serde(default, with = "seed_repr")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub strategy: TrialStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            buckets: default_buckets(),
            trials: default_trials(),
            threshold: default_threshold(),
            min_group: default_min_group(),
            max_group: default_max_group(),
            workers: default_workers(),
            seed: None,
            strategy: TrialStrategy::default(),
        }
    }
}

impl SimulationConfig {
    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking buckets, trials,
    /// threshold, group range and workers in that order.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.buckets == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        if self.threshold < 2 {
            return Err(ConfigError::ThresholdTooSmall(self.threshold));
        }
        if self.min_group > self.max_group {
            return Err(ConfigError::EmptyGroupRange {
                min: self.min_group,
                max: self.max_group,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.workers > MAX_WORKERS {
            return Err(ConfigError::TooManyWorkers {
                workers: self.workers,
                max: MAX_WORKERS,
            });
        }
        Ok(())
    }

    /// Group sizes in sweep order.
    #[must_use]
    pub const fn group_sizes(&self) -> RangeInclusive<u32> {
        self.min_group..=self.max_group
    }

    /// Number of result records a full sweep produces.
    #[must_use]
    pub fn sweep_len(&self) -> usize {
        self.group_sizes().count()
    }

    /// Return a copy with every `Some` field of `overrides` applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(buckets) = overrides.buckets {
            self.buckets = buckets;
        }
        if let Some(trials) = overrides.trials {
            self.trials = trials;
        }
        if let Some(threshold) = overrides.threshold {
            self.threshold = threshold;
        }
        if let Some(min) = overrides.min_group {
            self.min_group = min;
        }
        if let Some(max) = overrides.max_group {
            self.max_group = max;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if overrides.seed.is_some() {
            self.seed = overrides.seed;
        }
        if let Some(strategy) = overrides.strategy {
            self.strategy = strategy;
        }
        self
    }

    /// Parse a configuration from TOML text; absent keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).context("invalid simulation config")
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize simulation config")
    }
}

/// Field-by-field overrides, typically from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub buckets: Option<u32>,
    pub trials: Option<u64>,
    pub threshold: Option<u32>,
    pub min_group: Option<u32>,
    pub max_group: Option<u32>,
    pub workers: Option<usize>,
    pub seed: Option<u64>,
    pub strategy: Option<TrialStrategy>,
}

/// TOML integers are `i64`: seeds above `i64::MAX` are written as strings,
/// and either form is read back.
mod seed_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Text(String),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(seed: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match *seed {
            None => s.serialize_none(),
            Some(seed) if i64::try_from(seed).is_ok() => s.serialize_some(&seed),
            Some(seed) => s.serialize_some(&seed.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Int(seed)) => Ok(Some(seed)),
            Some(Repr::Text(text)) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid seed {text:?}"))),
        }
    }
}

const fn default_buckets() -> u32 {
    365
}

const fn default_trials() -> u64 {
    1_500_000
}

const fn default_threshold() -> u32 {
    2
}

const fn default_min_group() -> u32 {
    2
}

const fn default_max_group() -> u32 {
    100
}

const fn default_workers() -> usize {
    1
}

/// Load a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<SimulationConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<SimulationConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Location of the per-user configuration file, if the platform has one.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bday/config.toml"))
}

/// Load the per-user configuration, falling back to defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<SimulationConfig> {
    let Some(path) = user_config_path() else {
        return Ok(SimulationConfig::default());
    };
    if !path.exists() {
        return Ok(SimulationConfig::default());
    }
    load_config(&path)
}

/// Resolve the base configuration: an explicit file wins over the user file.
///
/// # Errors
///
/// Returns an error if the chosen file cannot be read or parsed.
pub fn resolve_config(explicit: Option<&Path>) -> Result<SimulationConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => load_user_config(),
    }
}
