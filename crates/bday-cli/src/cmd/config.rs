//! `bday config`: print the configuration `bday run` would use.

use std::io::{self, Write};

use anyhow::Result;
use bday_core::SimulationConfig;
use bday_core::config::user_config_path;
use clap::Args;
use serde::Serialize;

use super::{ConfigSource, SimFlags, effective_config};
use crate::output::{OutputMode, pretty_kv, pretty_section, write_json};

/// Arguments for `bday config`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub sim: SimFlags,
}

#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    source: &'a ConfigSource,
    user_config_path: Option<String>,
    config: &'a SimulationConfig,
}

/// Execute `bday config`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be rendered or written.
pub fn run_config(args: &ConfigArgs, output: OutputMode) -> Result<()> {
    let (config, source) = effective_config(&args.sim, output)?;

    let stdout = io::stdout();
    let mut w = stdout.lock();
    match output {
        OutputMode::Json => {
            let doc = ConfigOutput {
                source: &source,
                user_config_path: user_config_path().map(|p| p.display().to_string()),
                config: &config,
            };
            write_json(&mut w, &doc)?;
        }
        OutputMode::Text => {
            writeln!(w, "# source: {}", source.describe())?;
            write!(w, "{}", config.to_toml_string()?)?;
        }
        OutputMode::Pretty => {
            pretty_section(&mut w, "Effective Configuration")?;
            pretty_kv(&mut w, "Source", source.describe())?;
            if let Some(path) = user_config_path() {
                pretty_kv(&mut w, "User file", path.display().to_string())?;
            }
            writeln!(w)?;
            write!(w, "{}", config.to_toml_string()?)?;
        }
    }
    Ok(())
}
