//! Opt-in wall-clock timing of named operations.
//!
//! Samples are kept per thread; the sweep records one `sweep.group` sample
//! per group size from the coordinating thread, and the CLI wraps whole
//! commands. Nothing is recorded unless [`set_timing_enabled`] was called
//! with `true`.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

static TIMING_ENABLED: AtomicBool = AtomicBool::new(false);

thread_local! {
    static SAMPLES: RefCell<Vec<(String, Duration)>> = const { RefCell::new(Vec::new()) };
}

/// Aggregated timings, one row per operation name, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingReport {
    pub operations: Vec<OpTiming>,
}

/// Statistics for one named operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpTiming {
    pub name: String,
    pub count: usize,
    #[serde(serialize_with = "as_micros")]
    pub total: Duration,
    #[serde(serialize_with = "as_micros")]
    pub p50: Duration,
    #[serde(serialize_with = "as_micros")]
    pub p95: Duration,
    #[serde(serialize_with = "as_micros")]
    pub p99: Duration,
    #[serde(serialize_with = "as_micros")]
    pub max: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_micros<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_micros())
}

/// True when `BDAY_TIMING` is set to `1`, `true`, `yes` or `on`.
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("BDAY_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(&value))
}

/// Enable or disable timing collection globally.
pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_timings();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::Relaxed)
}

/// Drop every sample recorded on this thread.
pub fn clear_timings() {
    SAMPLES.with(|samples| samples.borrow_mut().clear());
}

/// Run `f`, recording its duration under `name` when timing is enabled.
pub fn timed<R>(name: &str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }
    let started = Instant::now();
    let result = f();
    record(name, started.elapsed());
    result
}

fn record(name: &str, elapsed: Duration) {
    SAMPLES.with(|samples| samples.borrow_mut().push((name.to_owned(), elapsed)));
}

/// Drain this thread's samples into a report.
#[must_use]
pub fn collect_report() -> TimingReport {
    let samples = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));

    let mut grouped: BTreeMap<String, Vec<Duration>> = BTreeMap::new();
    for (name, elapsed) in samples {
        grouped.entry(name).or_default().push(elapsed);
    }

    let operations = grouped
        .into_iter()
        .map(|(name, mut values)| {
            values.sort_unstable();
            OpTiming {
                count: values.len(),
                total: values.iter().sum(),
                p50: percentile(&values, 50),
                p95: percentile(&values, 95),
                p99: percentile(&values, 99),
                max: values.last().copied().unwrap_or_default(),
                name,
            }
        })
        .collect();

    TimingReport { operations }
}

impl TimingReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Fixed-width table for stderr.
    #[must_use]
    pub fn display_table(&self) -> String {
        if self.operations.is_empty() {
            return "No timing samples recorded.".to_string();
        }

        let mut out = format!(
            "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "operation", "count", "total", "p50", "p95", "p99", "max"
        );
        out.push_str(&"-".repeat(82));
        out.push('\n');
        for op in &self.operations {
            out.push_str(&format!(
                "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
                op.name,
                op.count,
                format_duration(op.total),
                format_duration(op.p50),
                format_duration(op.p95),
                format_duration(op.p99),
                format_duration(op.max),
            ));
        }
        out
    }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Compact human duration: `1.250s`, `3.004ms`, `87µs`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros();
    if micros >= 1_000_000 {
        format!("{}.{:03}s", micros / 1_000_000, (micros % 1_000_000) / 1_000)
    } else if micros >= 1_000 {
        format!("{}.{:03}ms", micros / 1_000, micros % 1_000)
    } else {
        format!("{micros}µs")
    }
}

fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.eq_ignore_ascii_case(t))
}
