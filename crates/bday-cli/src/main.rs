#![forbid(unsafe_code)]

mod cmd;
mod output;
mod plot;

use bday_core::timing;
use clap::{CommandFactory, Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bday: Monte-Carlo birthday collision probabilities",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format (defaults to pretty on a TTY, text when piped).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Estimate collision probabilities over a range of group sizes",
        long_about = "Draw random groups of people, assign each a birthday, and report\n\
                      how often at least --threshold of them share one, for every\n\
                      group size from --min to --max.",
        after_help = "EXAMPLES:\n    # Classic birthday problem, 2..=100 people\n    bday run\n\n\
                      # Reproducible, four threads\n    bday run --seed 42 --workers 4\n\n\
                      # Three people sharing a birthday, with a chart\n    bday run --threshold 3 --max 120 --plot\n\n\
                      # Machine-readable output\n    bday run --trials 100000 --format json"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Tally the endpoints of random walks around a cycle",
        long_about = "Sum uniform random steps and histogram where each walk ends,\n\
                      modulo the cycle length.",
        after_help = "EXAMPLES:\n    # Default 16-slot cycle\n    bday wave\n\n\
                      # Few long steps instead of many short ones\n    bday wave --cycle 64 --fast"
    )]
    Wave(cmd::wave::WaveArgs),

    #[command(
        about = "Show the effective configuration",
        long_about = "Print the configuration `bday run` would use, after the config\n\
                      file and flags are applied, and where it was loaded from.",
        after_help = "EXAMPLES:\n    # Effective defaults\n    bday config\n\n\
                      # With a project file and overrides\n    bday config --config sim.toml --days 366"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    bday completions bash > ~/.local/share/bash-completion/completions/bday"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BDAY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "bday=debug,info"
        } else if verbose {
            "bday=debug,warn"
        } else {
            "bday=info,warn"
        })
    });

    let format = env::var("BDAY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();

    let command_result = match cli.command {
        Commands::Run(ref args) => timing::timed("cmd.run", || cmd::run::run_run(args, output)),
        Commands::Wave(ref args) => {
            timing::timed("cmd.wave", || cmd::wave::run_wave(args, output))
        }
        Commands::Config(ref args) => {
            timing::timed("cmd.config", || cmd::config::run_config(args, output))
        }
        Commands::Completions(ref args) => timing::timed("cmd.completions", || {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }),
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    command_result
}
