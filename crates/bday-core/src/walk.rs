//! Random-walk "probability wave" histogram.
//!
//! Each trial sums a fixed number of uniform float steps and drops the walk's
//! endpoint, wrapped modulo the cycle length, into a histogram. With enough
//! steps the endpoint spreads evenly around the cycle; with few steps the
//! histogram shows the wave-like shape of the summed uniforms.

use serde::Serialize;

use crate::rng::BitGenerator;

/// Errors from [`probability_wave`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaveError {
    #[error("cycle length must be > 0")]
    EmptyCycle,
    #[error("histogram has {got} slots but the cycle needs {need}")]
    HistogramTooShort { got: usize, need: usize },
}

/// Walk parameters chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WaveParams {
    /// Upper bound (exclusive) of each step.
    pub range: f64,
    /// Steps summed per trial.
    pub steps: usize,
}

impl WaveParams {
    /// Pick step count and step range for a cycle of `cycle_len` slots.
    ///
    /// The fast variant applies when requested and the cycle is longer than
    /// half of `n_cycles`: it takes `ceil(2 ln len)` long steps instead of
    /// `len` short ones.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn choose(cycle_len: usize, n_cycles: usize, fast: bool) -> Self {
        let len = cycle_len as f64;
        if fast && cycle_len > 1 && len > n_cycles as f64 / 2.0 {
            Self {
                range: len / len.log2().sqrt(),
                steps: (len.ln() * 2.0).ceil() as usize,
            }
        } else {
            let quarter = (cycle_len / 4).max(1) as f64;
            Self {
                range: len.sqrt() + quarter.ln(),
                steps: cycle_len,
            }
        }
    }
}

/// Run `trials` random walks and tally their wrapped endpoints.
///
/// Only the first `cycle_len` slots of `histogram` are touched; counts are
/// added to whatever the slots already hold.
///
/// # Errors
///
/// Returns [`WaveError`] when `cycle_len` is zero or `histogram` is shorter
/// than `cycle_len`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn probability_wave<G: BitGenerator>(
    rng: &mut G,
    cycle_len: usize,
    histogram: &mut [u64],
    n_cycles: usize,
    trials: u64,
    fast: bool,
) -> Result<WaveParams, WaveError> {
    if cycle_len == 0 {
        return Err(WaveError::EmptyCycle);
    }
    if histogram.len() < cycle_len {
        return Err(WaveError::HistogramTooShort {
            got: histogram.len(),
            need: cycle_len,
        });
    }

    let params = WaveParams::choose(cycle_len, n_cycles, fast);
    for _ in 0..trials {
        let mut walk = 0.0_f64;
        for _ in 0..params.steps {
            walk += rng.next_f64(params.range);
        }
        histogram[(walk as u64 % cycle_len as u64) as usize] += 1;
    }
    Ok(params)
}
