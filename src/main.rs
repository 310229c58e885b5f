//! Biometric Chain CLI
//!
//! Runs the analysis pipeline and audits ledger files.

use anyhow::Context;
use biometric_chain::{
    audit::ChainVerifier, config::AnalysisDelay, Config, Pipeline, ShutdownSignal, VERSION,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biochain")]
#[command(version = VERSION)]
#[command(about = "Concurrent biometric analysis with a hash-linked ledger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate readings, analyze them, and write the ledger
    Run {
        /// Number of readings to generate
        #[arg(short = 'n', long = "num")]
        num: Option<u64>,

        /// Log every reading and block
        #[arg(short, long)]
        verbose: bool,

        /// Readings kept in each analyzer window
        #[arg(long)]
        window: Option<usize>,

        /// Ledger output file
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Milliseconds between readings
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Disable simulated analyzer latency
        #[arg(long)]
        no_delay: bool,

        /// Seed for reproducible readings
        #[arg(long)]
        seed: Option<u64>,

        /// Configuration file (defaults to the per-user config)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Audit a ledger file and write the report
    Verify {
        /// Ledger file to audit
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Report output file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Also write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    init_tracing(verbose);

    let result = match cli.command {
        Commands::Run {
            num,
            verbose: _,
            window,
            ledger,
            tick_ms,
            no_delay,
            seed,
            config,
        } => {
            let overrides = RunOverrides {
                num,
                window,
                ledger,
                tick_ms,
                no_delay,
                seed,
            };
            cmd_run(config, overrides)
        }
        Commands::Verify { ledger, report } => cmd_verify(ledger, report),
        Commands::Config { write } => cmd_config(write),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line values that take precedence over the config file.
struct RunOverrides {
    num: Option<u64>,
    window: Option<usize>,
    ledger: Option<PathBuf>,
    tick_ms: Option<u64>,
    no_delay: bool,
    seed: Option<u64>,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(num) = self.num {
            config.cycles = num;
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }
        if let Some(ledger) = self.ledger {
            config.ledger_path = ledger;
        }
        if let Some(ms) = self.tick_ms {
            config.tick_interval = Duration::from_millis(ms);
        }
        if self.no_delay {
            config.analysis_delay = AnalysisDelay::disabled();
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

/// Load `path`, or the per-user config file. A missing file yields defaults;
/// an unreadable or malformed one is an error.
fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(&path)
            .with_context(|| format!("could not load configuration from {path:?}")),
        None => Config::load().with_context(|| {
            format!("could not load configuration from {:?}", Config::config_path())
        }),
    }
}

fn cmd_run(config_path: Option<PathBuf>, overrides: RunOverrides) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Biometric Chain v{VERSION}");
    println!();
    println!("Starting pipeline...");
    println!("  Readings: {}", config.cycles);
    println!("  Window size: {}", config.window_size);
    println!("  Tick interval: {}ms", config.tick_interval.as_millis());
    println!("  Ledger: {:?}", config.ledger_path);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let pipeline = Pipeline::new(config).context("invalid configuration")?;
    ctrlc_handler(pipeline.shutdown_signal())?;

    let run_log = pipeline.run_log();
    let outcome = pipeline.run();

    println!();
    println!("{}", run_log.summary());
    println!();

    let summary = outcome.context("pipeline failed")?;
    if summary.interrupted {
        println!(
            "Interrupted after {} readings; ledger holds every completed cycle.",
            summary.readings
        );
    }
    println!("Blocks written: {}", summary.blocks);
    println!("Alerts: {}", summary.alerts);
    println!("Last hash: {}", summary.last_hash);
    println!("Ledger saved to {:?}", summary.ledger_path);
    Ok(())
}

fn cmd_verify(ledger: Option<PathBuf>, report: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(None)?;
    let ledger_path = ledger.unwrap_or(config.ledger_path);
    let report_path = report.unwrap_or(config.report_path);

    let report = ChainVerifier::new(&ledger_path)
        .audit()
        .with_context(|| format!("could not audit {ledger_path:?}"))?;

    print!("{}", report.render());
    report
        .write_report(&report_path)
        .with_context(|| format!("could not write report to {report_path:?}"))?;
    println!();
    println!("Report written to {report_path:?}");
    Ok(())
}

fn cmd_config(write: bool) -> anyhow::Result<()> {
    let config = load_config(None)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write {
        config.save().context("could not save configuration")?;
        println!();
        println!("Saved to {:?}", Config::config_path());
    }
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(shutdown: ShutdownSignal) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        shutdown.raise();
    })
    .context("error setting Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"cycles":"#).unwrap();

        assert!(load_config(Some(path)).is_err());
    }

    #[test]
    fn test_absent_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.cycles, Config::default().cycles);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        RunOverrides {
            num: Some(4),
            window: Some(2),
            ledger: Some(PathBuf::from("chain.json")),
            tick_ms: Some(0),
            no_delay: true,
            seed: Some(1),
        }
        .apply(&mut config);

        assert_eq!(config.cycles, 4);
        assert_eq!(config.window_size, 2);
        assert_eq!(config.ledger_path, PathBuf::from("chain.json"));
        assert!(config.tick_interval.is_zero());
        assert!(config.analysis_delay.is_disabled());
        assert_eq!(config.seed, Some(1));
    }
}
