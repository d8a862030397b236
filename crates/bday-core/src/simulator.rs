//! Monte-Carlo collision simulator.
//!
//! For each group size `n` in the configured sweep, every trial throws `n`
//! items into `buckets` uniformly chosen buckets and asks whether some
//! bucket ended up holding at least `threshold` items. The fraction of
//! trials where that happened is the estimate for `n`.
//!
//! Trials for one group size can be split across workers. Each worker owns
//! its generator and counter array outright; the only shared step is summing
//! the per-worker collision counts after they join.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{SimulationConfig, TrialStrategy};
use crate::error::ConfigError;
use crate::rng::{BitGenerator, Mxws64, entropy_seed};
use crate::timing;

/// One counter per bucket, zeroed and reused across trials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCounts {
    counts: Vec<u32>,
}

impl BucketCounts {
    #[must_use]
    pub fn new(buckets: u32) -> Self {
        Self {
            counts: vec![0; buckets as usize],
        }
    }

    /// Zero every counter.
    #[inline]
    pub fn reset(&mut self) {
        self.counts.fill(0);
    }

    /// Bump `bucket` and return its new count.
    #[inline]
    pub fn increment(&mut self, bucket: usize) -> u32 {
        let slot = &mut self.counts[bucket];
        *slot += 1;
        *slot
    }

    /// Sum of all counters; equals the number of draws since the last reset.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    /// Largest single counter.
    #[must_use]
    pub fn max(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.counts
    }
}

/// Classification of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    /// Some bucket reached the threshold.
    pub collided: bool,
    /// Draws actually made; less than the group size after a short-circuit.
    pub draws: u32,
}

/// A generator plus the private counter array it fills.
#[derive(Debug, Clone)]
pub struct Worker<G> {
    rng: G,
    counts: BucketCounts,
    max_bucket: u64,
}

impl<G: BitGenerator> Worker<G> {
    /// # Panics
    ///
    /// Panics if `buckets` is zero.
    #[must_use]
    pub fn new(rng: G, buckets: u32) -> Self {
        assert!(buckets > 0, "a worker needs at least one bucket");
        Self {
            rng,
            counts: BucketCounts::new(buckets),
            max_bucket: u64::from(buckets - 1),
        }
    }

    /// Counters as left by the most recent trial.
    #[must_use]
    pub const fn counts(&self) -> &BucketCounts {
        &self.counts
    }

    #[must_use]
    pub const fn rng(&self) -> &G {
        &self.rng
    }

    /// Run one trial of `group_size` draws.
    #[allow(clippy::cast_possible_truncation)]
    pub fn run_trial(
        &mut self,
        group_size: u32,
        threshold: u32,
        strategy: TrialStrategy,
    ) -> TrialOutcome {
        self.counts.reset();
        match strategy {
            TrialStrategy::ShortCircuit => {
                for draw in 1..=group_size {
                    let bucket = self.rng.next_at_most(self.max_bucket) as usize;
                    if self.counts.increment(bucket) >= threshold {
                        return TrialOutcome {
                            collided: true,
                            draws: draw,
                        };
                    }
                }
                TrialOutcome {
                    collided: false,
                    draws: group_size,
                }
            }
            TrialStrategy::Exhaustive => {
                let mut collided = false;
                for _ in 0..group_size {
                    let bucket = self.rng.next_at_most(self.max_bucket) as usize;
                    collided |= self.counts.increment(bucket) >= threshold;
                }
                TrialOutcome {
                    collided,
                    draws: group_size,
                }
            }
        }
    }

    /// Run `trials` trials and return how many collided.
    pub fn count_collisions(
        &mut self,
        group_size: u32,
        trials: u64,
        threshold: u32,
        strategy: TrialStrategy,
    ) -> u64 {
        let mut collisions = 0_u64;
        for _ in 0..trials {
            if self.run_trial(group_size, threshold, strategy).collided {
                collisions += 1;
            }
        }
        collisions
    }
}

/// Estimate for one group size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub group_size: u32,
    pub collisions: u64,
    pub trials: u64,
    /// `collisions / trials`, in `[0, 1]`.
    pub probability: f64,
}

impl ResultRecord {
    #[must_use]
    pub fn new(group_size: u32, collisions: u64, trials: u64) -> Self {
        let probability = if trials == 0 {
            0.0
        } else {
            collisions as f64 / trials as f64
        };
        Self {
            group_size,
            collisions,
            trials,
            probability,
        }
    }

    #[must_use]
    pub fn percent(&self) -> f64 {
        self.probability * 100.0
    }
}

/// What a sweep produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    /// Records in ascending group-size order.
    pub records: Vec<ResultRecord>,
    pub elapsed: Duration,
    /// The callback stopped the sweep before its last group size.
    pub stopped_early: bool,
}

/// Sweeps group sizes over a validated configuration.
#[derive(Debug)]
pub struct CollisionSimulator<G = Mxws64> {
    config: SimulationConfig,
    base_seed: Option<u64>,
    workers: Vec<Worker<G>>,
}

impl CollisionSimulator<Mxws64> {
    /// Build a simulator with `config.workers` generators seeded
    /// `base, base + 1, ...`, where `base` is `config.seed` or fresh entropy.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from validation.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let base_seed = config.seed.unwrap_or_else(entropy_seed);
        let workers = (0..config.workers as u64)
            .map(|index| {
                Worker::new(Mxws64::with_seed(base_seed.wrapping_add(index)), config.buckets)
            })
            .collect();
        Ok(Self {
            config,
            base_seed: Some(base_seed),
            workers,
        })
    }
}

impl<G: BitGenerator + Send> CollisionSimulator<G> {
    /// Build a simulator around caller-supplied generators, one worker each.
    ///
    /// `config.workers` and `config.seed` are ignored in favor of the
    /// generators given.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from validation; an empty `generators`
    /// yields [`ConfigError::ZeroWorkers`].
    pub fn with_generators(
        mut config: SimulationConfig,
        generators: Vec<G>,
    ) -> Result<Self, ConfigError> {
        config.workers = generators.len();
        config.seed = None;
        config.validate()?;
        let workers = generators
            .into_iter()
            .map(|rng| Worker::new(rng, config.buckets))
            .collect();
        Ok(Self {
            config,
            base_seed: None,
            workers,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seed the first worker was built from, when the simulator chose it.
    #[must_use]
    pub const fn base_seed(&self) -> Option<u64> {
        self.base_seed
    }

    #[must_use]
    pub fn workers(&self) -> &[Worker<G>] {
        &self.workers
    }

    /// Estimate the collision probability for one group size.
    pub fn estimate(&mut self, group_size: u32) -> ResultRecord {
        let SimulationConfig {
            trials,
            threshold,
            strategy,
            ..
        } = self.config;

        let collisions = match self.workers.as_mut_slice() {
            [single] => single.count_collisions(group_size, trials, threshold, strategy),
            workers => {
                let quotas = split_trials(trials, workers.len());
                thread::scope(|scope| {
                    let handles: Vec<_> = workers
                        .iter_mut()
                        .zip(quotas)
                        .map(|(worker, quota)| {
                            scope.spawn(move || {
                                worker.count_collisions(group_size, quota, threshold, strategy)
                            })
                        })
                        .collect();
                    handles
                        .into_iter()
                        .map(|handle| {
                            handle
                                .join()
                                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                        })
                        .sum::<u64>()
                })
            }
        };

        ResultRecord::new(group_size, collisions, trials)
    }

    /// Sweep every configured group size in ascending order.
    ///
    /// `on_record` sees each record as soon as it is computed; returning
    /// [`ControlFlow::Break`] ends the sweep at that group boundary.
    pub fn sweep(
        &mut self,
        mut on_record: impl FnMut(&ResultRecord) -> ControlFlow<()>,
    ) -> SweepOutcome {
        let started = Instant::now();
        info!(
            buckets = self.config.buckets,
            trials = self.config.trials,
            threshold = self.config.threshold,
            min_group = self.config.min_group,
            max_group = self.config.max_group,
            workers = self.workers.len(),
            seed = ?self.base_seed,
            strategy = ?self.config.strategy,
            "starting collision sweep"
        );

        let mut records = Vec::with_capacity(self.config.sweep_len());
        let mut stopped_early = false;
        for group_size in self.config.group_sizes() {
            let record = timing::timed("sweep.group", || self.estimate(group_size));
            debug!(
                group_size,
                collisions = record.collisions,
                probability = record.probability,
                "group size estimated"
            );
            let flow = on_record(&record);
            records.push(record);
            if flow.is_break() && group_size != self.config.max_group {
                stopped_early = true;
                break;
            }
        }

        let elapsed = started.elapsed();
        info!(
            records = records.len(),
            elapsed_ms = elapsed.as_millis(),
            stopped_early,
            "collision sweep finished"
        );
        SweepOutcome {
            records,
            elapsed,
            stopped_early,
        }
    }

    /// Sweep every group size and return the records.
    pub fn run(&mut self) -> Vec<ResultRecord> {
        self.sweep(|_| ControlFlow::Continue(())).records
    }
}

/// Split `trials` across `workers`; the first `trials % workers` get one more.
#[must_use]
pub fn split_trials(trials: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }
    let n = workers as u64;
    let (share, extra) = (trials / n, trials % n);
    (0..n).map(|i| share + u64::from(i < extra)).collect()
}

/// Validate `config` and estimate every group size in its sweep.
///
/// # Errors
///
/// Returns the [`ConfigError`] from validation; no records are produced.
pub fn estimate_collision_probabilities(
    config: &SimulationConfig,
) -> Result<Vec<ResultRecord>, ConfigError> {
    let mut simulator = CollisionSimulator::new(config.clone())?;
    Ok(simulator.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Mxws32;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            buckets: 365,
            trials: 2_000,
            threshold: 2,
            min_group: 2,
            max_group: 12,
            workers: 1,
            seed: Some(42),
            strategy: TrialStrategy::ShortCircuit,
        }
    }

    #[test]
    fn bucket_counts_reset_and_total() {
        let mut counts = BucketCounts::new(4);
        assert_eq!(counts.increment(1), 1);
        assert_eq!(counts.increment(1), 2);
        assert_eq!(counts.increment(3), 1);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.max(), 2);
        assert_eq!(counts.as_slice(), &[0, 2, 0, 1]);

        counts.reset();
        assert_eq!(counts.total(), 0);
        assert_eq!(counts.len(), 4);
        assert!(!counts.is_empty());
    }

    #[test]
    fn exhaustive_trials_conserve_draws() {
        let mut worker = Worker::new(Mxws64::with_seed(1), 365);
        for n in [0, 1, 23, 57, 400] {
            let outcome = worker.run_trial(n, 2, TrialStrategy::Exhaustive);
            assert_eq!(outcome.draws, n);
            assert_eq!(worker.counts().total(), u64::from(n));
            assert_eq!(outcome.collided, worker.counts().max() >= 2);
        }
    }

    #[test]
    fn short_circuit_stops_at_threshold() {
        let mut worker = Worker::new(Mxws64::with_seed(2), 365);
        for _ in 0..500 {
            let outcome = worker.run_trial(60, 2, TrialStrategy::ShortCircuit);
            assert_eq!(worker.counts().total(), u64::from(outcome.draws));
            if outcome.collided {
                assert_eq!(worker.counts().max(), 2);
            } else {
                assert_eq!(outcome.draws, 60);
                assert!(worker.counts().max() < 2);
            }
        }
    }

    #[test]
    fn groups_below_threshold_never_collide() {
        let cfg = SimulationConfig {
            threshold: 4,
            min_group: 0,
            max_group: 3,
            buckets: 1,
            ..small_config()
        };
        let records = estimate_collision_probabilities(&cfg).expect("valid config");
        assert_eq!(records.len(), 4);
        for record in records {
            assert_eq!(record.collisions, 0);
            assert!(record.probability == 0.0);
        }
    }

    #[test]
    fn pigeonhole_groups_always_collide() {
        let cfg = SimulationConfig {
            buckets: 3,
            threshold: 2,
            min_group: 4,
            max_group: 6,
            ..small_config()
        };
        let records = estimate_collision_probabilities(&cfg).expect("valid config");
        assert!(records.iter().all(|r| r.collisions == r.trials));
        assert!(records.iter().all(|r| r.probability == 1.0));
    }

    #[test]
    fn records_come_out_in_ascending_group_order() {
        let records = estimate_collision_probabilities(&small_config()).expect("valid config");
        let sizes: Vec<u32> = records.iter().map(|r| r.group_size).collect();
        assert_eq!(sizes, (2..=12).collect::<Vec<_>>());
        assert!(records.iter().all(|r| r.trials == 2_000));
        assert!(records.iter().all(|r| (0.0..=1.0).contains(&r.probability)));
    }

    #[test]
    fn invalid_config_produces_no_records() {
        let cfg = SimulationConfig {
            buckets: 0,
            ..small_config()
        };
        assert_eq!(
            estimate_collision_probabilities(&cfg),
            Err(ConfigError::ZeroBuckets)
        );
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = estimate_collision_probabilities(&small_config()).expect("valid");
        let b = estimate_collision_probabilities(&small_config()).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn single_worker_matches_explicit_generator() {
        let cfg = small_config();
        let mut seeded = CollisionSimulator::new(cfg.clone()).expect("valid");
        let mut explicit =
            CollisionSimulator::with_generators(cfg, vec![Mxws64::with_seed(42)]).expect("valid");
        assert_eq!(seeded.base_seed(), Some(42));
        assert_eq!(explicit.base_seed(), None);
        assert_eq!(seeded.run(), explicit.run());
    }

    #[test]
    fn multi_worker_runs_are_reproducible() {
        let cfg = SimulationConfig {
            workers: 3,
            trials: 3_001,
            ..small_config()
        };
        let a = estimate_collision_probabilities(&cfg).expect("valid");
        let b = estimate_collision_probabilities(&cfg).expect("valid");
        assert_eq!(a, b);
        assert!(a.iter().all(|r| r.trials == 3_001));
    }

    #[test]
    fn workers_get_distinct_seeds() {
        let cfg = SimulationConfig {
            workers: 4,
            ..small_config()
        };
        let sim = CollisionSimulator::new(cfg).expect("valid");
        let rngs: Vec<&Mxws64> = sim.workers().iter().map(Worker::rng).collect();
        assert_eq!(rngs.len(), 4);
        assert_eq!(*rngs[1], Mxws64::with_seed(43));
        for i in 0..rngs.len() {
            for j in i + 1..rngs.len() {
                assert_ne!(rngs[i], rngs[j]);
            }
        }
    }

    #[test]
    fn more_workers_than_trials_still_counts_every_trial() {
        let cfg = SimulationConfig {
            buckets: 2,
            trials: 3,
            min_group: 3,
            max_group: 3,
            workers: 8,
            ..small_config()
        };
        let records = estimate_collision_probabilities(&cfg).expect("valid");
        assert_eq!(records[0].collisions, 3);
        assert!(records[0].probability == 1.0);
    }

    #[test]
    fn split_trials_distributes_remainder_first() {
        assert_eq!(split_trials(10, 3), vec![4, 3, 3]);
        assert_eq!(split_trials(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_trials(9, 1), vec![9]);
        assert!(split_trials(9, 0).is_empty());
        assert_eq!(split_trials(1_500_000, 7).iter().sum::<u64>(), 1_500_000);
    }

    #[test]
    fn sweep_stops_at_group_boundary_on_break() {
        let mut sim = CollisionSimulator::new(small_config()).expect("valid");
        let mut seen = Vec::new();
        let outcome = sim.sweep(|record| {
            seen.push(record.group_size);
            if record.group_size == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, vec![2, 3, 4, 5]);
        assert_eq!(outcome.records.len(), 4);
        assert!(outcome.stopped_early);
    }

    #[test]
    fn break_on_last_group_is_not_early() {
        let mut sim = CollisionSimulator::new(small_config()).expect("valid");
        let outcome = sim.sweep(|_| ControlFlow::Break(()));
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.stopped_early);

        let cfg = SimulationConfig {
            min_group: 7,
            max_group: 7,
            ..small_config()
        };
        let mut sim = CollisionSimulator::new(cfg).expect("valid");
        let outcome = sim.sweep(|_| ControlFlow::Break(()));
        assert!(!outcome.stopped_early);
    }

    #[test]
    fn narrow_generator_drives_simulator() {
        let mut sim =
            CollisionSimulator::with_generators(small_config(), vec![Mxws32::with_seed(5)])
                .expect("valid");
        let records = sim.run();
        assert_eq!(records.len(), 11);
        assert!(records.last().expect("records").probability > records[0].probability);
    }

    #[test]
    fn empty_generator_list_is_rejected() {
        let err = CollisionSimulator::<Mxws64>::with_generators(small_config(), Vec::new())
            .expect_err("no workers");
        assert_eq!(err, ConfigError::ZeroWorkers);
    }

    #[test]
    fn record_percent_scales_probability() {
        let record = ResultRecord::new(23, 761_000, 1_500_000);
        assert!((record.percent() - 50.733_333).abs() < 1e-3);
        assert!(ResultRecord::new(2, 0, 0).probability == 0.0);
    }
}
