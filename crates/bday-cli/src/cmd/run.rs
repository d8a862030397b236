//! `bday run`: sweep group sizes and print one estimate per size.
//!
//! Pretty and text output stream each record as soon as its group size
//! finishes; JSON output is a single document written at the end.

use std::io::{self, Write};
use std::ops::ControlFlow;

use anyhow::Result;
use bday_core::{CollisionSimulator, ResultRecord, SimulationConfig};
use clap::Args;
use serde::Serialize;
use tracing::warn;

use super::{SimFlags, effective_config, reject};
use crate::output::{OutputMode, pretty_kv, pretty_rule, write_json};
use crate::plot;

/// Arguments for `bday run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub sim: SimFlags,

    /// Draw an ASCII chart of probability against group size.
    #[arg(long)]
    pub plot: bool,
}

/// JSON output for `bday run`.
#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    config: &'a SimulationConfig,
    seed: Option<u64>,
    elapsed_ms: u128,
    records: &'a [ResultRecord],
}

/// The per-group sentence printed in pretty mode.
fn sentence(record: &ResultRecord, threshold: u32) -> String {
    format!(
        "The chance that, in a set of {:<3} randomly chosen people, at least {threshold} people will share a birthday is {:<9.5} %",
        record.group_size,
        record.percent(),
    )
}

fn text_row(record: &ResultRecord) -> String {
    format!(
        "group_size={} collisions={} trials={} probability={:.6}",
        record.group_size, record.collisions, record.trials, record.probability
    )
}

fn emit(
    out: &mut dyn Write,
    output: OutputMode,
    record: &ResultRecord,
    threshold: u32,
) -> io::Result<()> {
    match output {
        OutputMode::Pretty => writeln!(out, "{}", sentence(record, threshold))?,
        OutputMode::Text => writeln!(out, "{}", text_row(record))?,
        OutputMode::Json => return Ok(()),
    }
    out.flush()
}

/// Execute `bday run`.
///
/// # Errors
///
/// Returns an error if writing to stdout fails. Invalid configuration
/// exits the process before any record is printed.
pub fn run_run(args: &RunArgs, output: OutputMode) -> Result<()> {
    let (config, _source) = effective_config(&args.sim, output)?;
    let mut simulator = match CollisionSimulator::new(config) {
        Ok(simulator) => simulator,
        Err(err) => reject(output, &err),
    };
    let threshold = simulator.config().threshold;

    let stdout = io::stdout();
    let mut w = stdout.lock();

    let mut write_error: Option<io::Error> = None;
    let outcome = simulator.sweep(|record| match emit(&mut w, output, record, threshold) {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            write_error = Some(err);
            ControlFlow::Break(())
        }
    });
    if let Some(err) = write_error {
        if err.kind() == io::ErrorKind::BrokenPipe {
            warn!("stdout closed, sweep stopped early");
            return Ok(());
        }
        return Err(err.into());
    }

    let elapsed_ms = outcome.elapsed.as_millis();
    let seed = simulator.base_seed();
    match output {
        OutputMode::Json => {
            let doc = RunOutput {
                config: simulator.config(),
                seed,
                elapsed_ms,
                records: &outcome.records,
            };
            write_json(&mut w, &doc)?;
        }
        OutputMode::Text => {
            writeln!(
                w,
                "summary records={} elapsed_ms={elapsed_ms} seed={}",
                outcome.records.len(),
                seed.map_or_else(|| "none".to_string(), |s| s.to_string())
            )?;
        }
        OutputMode::Pretty => {
            writeln!(w)?;
            pretty_rule(&mut w)?;
            pretty_kv(&mut w, "Elapsed", format!("{elapsed_ms} ms"))?;
            if let Some(seed) = seed {
                pretty_kv(&mut w, "Seed", seed.to_string())?;
            }
        }
    }

    if args.plot && !output.is_json() {
        writeln!(w)?;
        write!(
            w,
            "{}",
            plot::render_chart(&outcome.records, plot::PLOT_WIDTH, plot::PLOT_HEIGHT)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_matches_classic_layout() {
        let record = ResultRecord::new(23, 507_297, 1_000_000);
        assert_eq!(
            sentence(&record, 2),
            "The chance that, in a set of 23  randomly chosen people, at least 2 people will share a birthday is 50.72970  %"
        );
    }

    #[test]
    fn sentence_pads_short_percentages() {
        let record = ResultRecord::new(2, 27, 10_000);
        assert!(sentence(&record, 2).ends_with("is 0.27000   %"));
    }

    #[test]
    fn text_rows_are_key_value() {
        let record = ResultRecord::new(5, 1, 4);
        assert_eq!(
            text_row(&record),
            "group_size=5 collisions=1 trials=4 probability=0.250000"
        );
    }

    #[test]
    fn json_mode_streams_nothing() {
        let mut buf = Vec::new();
        emit(&mut buf, OutputMode::Json, &ResultRecord::new(3, 0, 1), 2).expect("emit");
        assert!(buf.is_empty());
    }

    #[test]
    fn run_output_serializes_records() {
        let config = SimulationConfig::default();
        let records = [ResultRecord::new(2, 1, 2)];
        let doc = RunOutput {
            config: &config,
            seed: Some(42),
            elapsed_ms: 7,
            records: &records,
        };
        let value = serde_json::to_value(&doc).expect("json");
        assert_eq!(value["seed"], 42);
        assert_eq!(value["config"]["buckets"], 365);
        assert_eq!(value["records"][0]["group_size"], 2);
        assert_eq!(value["records"][0]["probability"], 0.5);
    }
}
