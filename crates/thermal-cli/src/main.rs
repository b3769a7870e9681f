//! Thermal CLI - Command Line Interface
//!
//! Command-line tool for checking degree-of-interest formulas and scoring
//! recorded entity samples with them.
//!
//! Key Features:
//! - Formula validation with a parameter summary
//! - Batch scoring of JSON sample files over a time range
//! - Plain text or JSON lines output
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

mod input;
mod settings;

use clap::{Parser, Subcommand};
use input::SampleFile;
use serde::Serialize;
use settings::Settings;
use std::path::{Path, PathBuf};
use thermal_common::{Result, ThermalError, Timestamp};
use thermal_doi::{DoiEngine, DoiFormula};
use thermal_timeseries::Stepper;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Parser)]
#[command(name = "thermal")]
#[command(author = "AutomataNexus Development Team")]
#[command(version = "0.1.0")]
#[command(about = "Thermal degree-of-interest scoring", long_about = None)]
struct Cli {
    /// Log filter, e.g. "debug" or "thermal_doi=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and summarize its formula
    Check {
        #[arg(short, long, default_value = "thermal.toml")]
        config: PathBuf,
    },
    /// Score every entity of a sample file
    Score {
        #[arg(short, long, default_value = "thermal.toml")]
        config: PathBuf,
        #[arg(short, long)]
        samples: PathBuf,
        #[arg(long)]
        from: Timestamp,
        #[arg(long)]
        to: Timestamp,
        /// Output grid: a width in milliseconds or a calendar unit.
        /// Defaults to the formula step.
        #[arg(long)]
        step: Option<Stepper>,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct ScoreLine<'a> {
    entity: &'a str,
    ts: Timestamp,
    score: f64,
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let filter = match cli.log_level.as_deref() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Score {
            config,
            samples,
            from,
            to,
            step,
            json,
        } => score(&config, &samples, from, to, step, json),
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(if e.is_user_error() { 2 } else { 1 });
    }
}

// =============================================================================
// Commands
// =============================================================================

fn check(config: &Path) -> Result<()> {
    let settings = Settings::load(config)?;
    info!("Configuration {} is valid", config.display());
    print!("{}", summarize(&settings.formula));
    Ok(())
}

fn summarize(formula: &DoiFormula) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "alpha={} beta={} nsteps={} step={} fuzzy_days={}\n",
        formula.alpha, formula.beta, formula.nsteps, formula.step, formula.fuzzy_days
    ));
    out.push_str(&format!(
        "range=[{}, {}] default={} delta_method={:?} loading_percentage={}\n",
        formula.range.min,
        formula.range.max,
        formula.default_value,
        formula.delta_method,
        formula.loading_percentage
    ));
    for c in &formula.components {
        out.push_str(&format!(
            "  {:<20} {:>6.1}%  input=[{}, {}]{}\n",
            c.attribute,
            c.percentage(),
            c.input_range.min,
            c.input_range.max,
            if c.invert { " inverted" } else { "" }
        ));
    }
    out
}

fn score(
    config: &Path,
    samples: &Path,
    from: Timestamp,
    to: Timestamp,
    step: Option<Stepper>,
    json: bool,
) -> Result<()> {
    let settings = Settings::load(config)?;
    let file = SampleFile::load(samples)?;
    let step = step.unwrap_or(settings.formula.step);
    info!(
        entities = file.entities.len(),
        from,
        to,
        step = %step,
        "Scoring samples"
    );

    for input in &file.entities {
        let entity = input.build(&settings.store, &settings.events);
        let mut engine =
            match DoiEngine::with_config(settings.formula.clone(), &entity, &settings.store) {
                Ok(engine) => engine,
                Err(e) if e.is_misuse() => {
                    warn!(entity = %input.name, "Skipping entity: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

        let scores = engine.values(&entity, from, to, &step, true);
        for (ts, score) in step.grid(from, to).zip(scores) {
            let score = score.unwrap_or(settings.formula.default_value);
            if json {
                let line = ScoreLine {
                    entity: &input.name,
                    ts,
                    score,
                };
                let line = serde_json::to_string(&line)
                    .map_err(|e| ThermalError::Serialization(e.to_string()))?;
                println!("{}", line);
            } else {
                println!("{}\t{}\t{:.6}", input.name, ts, score);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use thermal_doi::DoiComponent;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_score_arguments() {
        let cli = Cli::try_parse_from([
            "thermal", "score", "--samples", "s.json", "--from", "0", "--to", "100", "--step",
            "month",
        ])
        .unwrap();
        match cli.command {
            Commands::Score {
                config, from, to, step, json, ..
            } => {
                assert_eq!(config, PathBuf::from("thermal.toml"));
                assert_eq!((from, to), (0, 100));
                assert_eq!(step, Some("month".parse().unwrap()));
                assert!(!json);
            }
            Commands::Check { .. } => panic!("expected score"),
        }
    }

    #[test]
    fn test_invalid_step_rejected() {
        let parsed = Cli::try_parse_from([
            "thermal", "score", "--samples", "s.json", "--from", "0", "--to", "1", "--step", "0",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_summary_lists_components() {
        let formula = DoiFormula::new(vec![
            DoiComponent::new("load", 0.75).with_input_range(0.0, 100.0),
            DoiComponent::new("errors", 0.25).inverted(),
        ]);
        let summary = summarize(&formula);
        assert!(summary.contains("nsteps=20"));
        assert!(summary.contains("load"));
        assert!(summary.contains("75.0%"));
        assert!(summary.contains("inverted"));
    }
}
