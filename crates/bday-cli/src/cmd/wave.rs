//! `bday wave`: histogram of random-walk endpoints around a cycle.

use std::io::{self, Write};

use anyhow::Result;
use bday_core::walk::{WaveParams, probability_wave};
use bday_core::{ErrorCode, Mxws64, rng::entropy_seed};
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::exit_with;
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, write_json};

/// Widest bar drawn in pretty output.
const BAR_WIDTH: usize = 50;

/// Arguments for `bday wave`.
#[derive(Args, Debug, Clone)]
pub struct WaveArgs {
    /// Slots in the cycle.
    #[arg(long, default_value = "16")]
    pub cycle: usize,

    /// Cycle count used to choose between short and long steps.
    #[arg(long, default_value = "16")]
    pub cycles: usize,

    /// Walks to run.
    #[arg(long, default_value = "100000")]
    pub trials: u64,

    /// Take a few long steps instead of one short step per slot.
    #[arg(long)]
    pub fast: bool,

    /// Generator seed. Omit for OS entropy.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// JSON output for `bday wave`.
#[derive(Debug, Serialize)]
struct WaveOutput<'a> {
    cycle: usize,
    trials: u64,
    seed: u64,
    params: WaveParams,
    histogram: &'a [u64],
}

/// Execute `bday wave`.
///
/// # Errors
///
/// Returns an error if writing to stdout fails. A zero-length cycle exits
/// the process with a usage error.
pub fn run_wave(args: &WaveArgs, output: OutputMode) -> Result<()> {
    let seed = args.seed.unwrap_or_else(entropy_seed);
    let mut rng = Mxws64::with_seed(seed);
    let mut histogram = vec![0_u64; args.cycle];

    let params = match probability_wave(
        &mut rng,
        args.cycle,
        &mut histogram,
        args.cycles,
        args.trials,
        args.fast,
    ) {
        Ok(params) => params,
        Err(err) => {
            let code = ErrorCode::InvalidWaveInput;
            exit_with(
                output,
                &CliError {
                    message: format!("invalid wave input: {err}"),
                    suggestion: Some("Pass --cycle with a positive slot count.".to_string()),
                    error_code: Some(code.code().to_owned()),
                },
            )
        }
    };
    info!(
        cycle = args.cycle,
        steps = params.steps,
        range = params.range,
        "probability wave complete"
    );

    let stdout = io::stdout();
    let mut w = stdout.lock();
    match output {
        OutputMode::Json => {
            let doc = WaveOutput {
                cycle: args.cycle,
                trials: args.trials,
                seed,
                params,
                histogram: &histogram,
            };
            write_json(&mut w, &doc)?;
        }
        OutputMode::Text => {
            writeln!(
                w,
                "wave cycle={} trials={} steps={} range={:.4} seed={seed}",
                args.cycle, args.trials, params.steps, params.range
            )?;
            for (slot, count) in histogram.iter().enumerate() {
                writeln!(w, "slot={slot} count={count}")?;
            }
        }
        OutputMode::Pretty => {
            pretty_section(&mut w, "Probability Wave")?;
            pretty_kv(&mut w, "Cycle", args.cycle.to_string())?;
            pretty_kv(&mut w, "Trials", args.trials.to_string())?;
            pretty_kv(&mut w, "Steps", params.steps.to_string())?;
            pretty_kv(&mut w, "Step range", format!("{:.4}", params.range))?;
            pretty_kv(&mut w, "Seed", seed.to_string())?;
            writeln!(w)?;
            write!(w, "{}", render_bars(&histogram, BAR_WIDTH))?;
        }
    }
    Ok(())
}

/// One `slot | ### count` line per slot, scaled to the fullest slot.
#[allow(clippy::cast_possible_truncation)]
fn render_bars(histogram: &[u64], width: usize) -> String {
    let peak = histogram.iter().copied().max().unwrap_or(0).max(1);
    let label_width = histogram.len().saturating_sub(1).to_string().len();
    histogram
        .iter()
        .enumerate()
        .map(|(slot, &count)| {
            let len = (u128::from(count) * width as u128 / u128::from(peak)) as usize;
            format!("{slot:>label_width$} | {} {count}\n", "#".repeat(len))
        })
        .collect()
}
