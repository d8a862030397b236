use std::fmt;

/// A rejected [`SimulationConfig`](crate::config::SimulationConfig).
///
/// Validation runs before any trial is drawn, so a run that fails with one of
/// these has produced no records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// There must be at least one bucket to draw into.
    #[error("buckets must be > 0")]
    ZeroBuckets,

    /// Each group size needs at least one trial.
    #[error("trials must be > 0")]
    ZeroTrials,

    /// A threshold below two makes every non-empty trial a collision.
    #[error("threshold must be >= 2 (got {0})")]
    ThresholdTooSmall(u32),

    /// The group-size sweep is empty.
    #[error("group size range is empty (min {min} > max {max})")]
    EmptyGroupRange {
        /// Smallest group size requested.
        min: u32,
        /// Largest group size requested.
        max: u32,
    },

    /// At least one worker must run the trials.
    #[error("workers must be > 0")]
    ZeroWorkers,

    /// More worker threads than one sweep may spawn.
    #[error("workers must be <= {max} (got {workers})")]
    TooManyWorkers {
        /// Workers requested.
        workers: usize,
        /// Largest accepted count.
        max: usize,
    },
}

impl ConfigError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ZeroBuckets => ErrorCode::InvalidBuckets,
            Self::ZeroTrials => ErrorCode::InvalidTrials,
            Self::ThresholdTooSmall(_) => ErrorCode::InvalidThreshold,
            Self::EmptyGroupRange { .. } => ErrorCode::EmptyGroupRange,
            Self::ZeroWorkers | Self::TooManyWorkers { .. } => ErrorCode::InvalidWorkers,
        }
    }
}

/// Stable error codes surfaced by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidBuckets,
    InvalidTrials,
    InvalidThreshold,
    EmptyGroupRange,
    InvalidWorkers,
    ConfigParseError,
    InvalidWaveInput,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidBuckets => "E1001",
            Self::InvalidTrials => "E1002",
            Self::InvalidThreshold => "E1003",
            Self::EmptyGroupRange => "E1004",
            Self::InvalidWorkers => "E1005",
            Self::ConfigParseError => "E1006",
            Self::InvalidWaveInput => "E2001",
        }
    }

    /// Optional remediation hint for terminal output.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidBuckets => Some("Pass --days with a positive count (365 for birthdays)."),
            Self::InvalidTrials => Some("Pass --trials with a positive count."),
            Self::InvalidThreshold => Some("Use --threshold 2 for the classic shared-birthday case."),
            Self::EmptyGroupRange => Some("Make --min less than or equal to --max."),
            Self::InvalidWorkers => Some("Pass --workers between 1 and 1024."),
            Self::ConfigParseError => Some("Fix the syntax in the config file and retry."),
            Self::InvalidWaveInput => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::InvalidBuckets,
            ErrorCode::InvalidTrials,
            ErrorCode::InvalidThreshold,
            ErrorCode::EmptyGroupRange,
            ErrorCode::InvalidWorkers,
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidWaveInput,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn config_errors_map_to_codes() {
        assert_eq!(ConfigError::ZeroBuckets.code().code(), "E1001");
        assert_eq!(
            ConfigError::EmptyGroupRange { min: 9, max: 3 }.code(),
            ErrorCode::EmptyGroupRange
        );
    }

    #[test]
    fn messages_name_the_offending_values() {
        let err = ConfigError::EmptyGroupRange { min: 9, max: 3 };
        assert_eq!(err.to_string(), "group size range is empty (min 9 > max 3)");
        assert!(ConfigError::ThresholdTooSmall(1).to_string().contains("got 1"));

        let err = ConfigError::TooManyWorkers {
            workers: 200_000,
            max: 1024,
        };
        assert_eq!(err.to_string(), "workers must be <= 1024 (got 200000)");
        assert_eq!(err.code(), ErrorCode::InvalidWorkers);
    }
}
