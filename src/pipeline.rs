//! Pipeline wiring.
//!
//! ```text
//! Generator ──┬─▶ Analyzer(frequency) ─┐
//!             ├─▶ Analyzer(pressure)  ─┼─▶ CycleBarrier ─▶ queue ─▶ Verifier ─▶ ledger file
//!             └─▶ Analyzer(oxygen)    ─┘
//! ```
//!
//! Every component runs on its own thread. Readings travel over one channel
//! per analyzer; results share a single unbounded queue to the verifier.

use crate::config::Config;
use crate::core::{CycleBarrier, WindowAnalyzer};
use crate::error::PipelineError;
use crate::ledger::{LedgerBuilder, LedgerStore};
use crate::runlog::{create_shared_log_with_persistence, SharedRunLog};
use crate::signal::{SignalGenerator, SignalKind};
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Cooperative stop request shared by every stage.
///
/// Only the generator polls it: once raised no new readings are produced,
/// the analyzer channels close, and in-flight cycles drain through the
/// barrier and into the ledger.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    raised: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub readings: u64,
    pub blocks: u64,
    pub alerts: u64,
    pub last_hash: String,
    pub ledger_path: PathBuf,
    pub interrupted: bool,
}

/// A configured, not yet started pipeline.
pub struct Pipeline {
    config: Config,
    shutdown: ShutdownSignal,
    run_log: SharedRunLog,
}

impl Pipeline {
    /// Validate `config` and prepare a run.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let run_log = create_shared_log_with_persistence(config.run_log_path.clone());
        Ok(Self {
            config,
            shutdown: ShutdownSignal::new(),
            run_log,
        })
    }

    /// Handle for requesting a cooperative stop.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    pub fn run_log(&self) -> SharedRunLog {
        Arc::clone(&self.run_log)
    }

    /// Run every stage to completion.
    pub fn run(&self) -> Result<PipelineSummary, PipelineError> {
        let parties = SignalKind::ALL.len();
        let barrier = Arc::new(CycleBarrier::new(parties));
        let (queue_tx, queue_rx) = unbounded();

        // Build all analyzers before spawning anything so construction errors
        // surface without leaving threads behind.
        let mut inputs = Vec::with_capacity(parties);
        let mut analyzers = Vec::with_capacity(parties);
        for kind in SignalKind::ALL {
            let (tx, rx) = unbounded();
            inputs.push(tx);
            analyzers.push(
                WindowAnalyzer::new(
                    kind.as_str(),
                    self.config.window_size,
                    rx,
                    queue_tx.clone(),
                    Arc::clone(&barrier),
                    self.run_log(),
                )?
                .with_delay(self.config.analysis_delay),
            );
        }
        // Only analyzers hold queue senders from here on.
        drop(queue_tx);

        let store = LedgerStore::new(self.config.ledger_path.clone());
        if store.path().exists() {
            tracing::warn!(ledger = ?store.path(), "replacing existing ledger");
        }
        let builder = LedgerBuilder::new(store, self.run_log())
            .with_strict_timestamps(self.config.strict_timestamps);

        tracing::info!(
            run_id = %self.run_log.run_id(),
            cycles = self.config.cycles,
            window = self.config.window_size,
            "pipeline starting"
        );

        let expected = barrier.parties();
        let verifier = spawn_named("verifier", move || builder.run(queue_rx, expected))?;

        let mut analyzer_handles = Vec::with_capacity(parties);
        for analyzer in analyzers {
            let name = format!("analyzer-{}", analyzer.kind());
            analyzer_handles.push(spawn_named(&name, move || analyzer.run())?);
        }

        let mut generator = match self.config.seed {
            Some(seed) => SignalGenerator::with_seed(self.config.tick_interval, seed),
            None => SignalGenerator::new(self.config.tick_interval),
        };
        let cycles = self.config.cycles;
        let shutdown = self.shutdown.clone();
        let run_log = self.run_log();
        let generator = spawn_named("generator", move || {
            // `inputs` moves in and is dropped on return, closing every channel.
            generator.run(cycles, &inputs, &shutdown, &run_log)
        })?;

        let mut errors = Vec::new();
        let readings = join_stage("generator", generator, &mut errors);
        for handle in analyzer_handles {
            join_stage("analyzer", handle, &mut errors);
        }
        let outcome = join_stage("verifier", verifier, &mut errors);

        if let Err(e) = self.run_log.save() {
            tracing::warn!(error = %e, "could not save run log");
        }

        if let Some(root_cause) = pick_root_cause(errors) {
            return Err(root_cause);
        }

        // Both stages succeeded if no error was recorded.
        let (Some(readings), Some(outcome)) = (readings, outcome) else {
            return Err(PipelineError::ThreadPanicked("pipeline".to_string()));
        };

        if outcome.blocks != readings {
            return Err(PipelineError::CycleShortfall {
                expected: readings,
                completed: outcome.blocks,
            });
        }

        let summary = PipelineSummary {
            readings,
            blocks: outcome.blocks,
            alerts: outcome.alerts,
            last_hash: outcome.last_hash,
            ledger_path: self.config.ledger_path.clone(),
            interrupted: self.shutdown.is_raised() && readings < cycles,
        };
        tracing::info!(
            blocks = summary.blocks,
            alerts = summary.alerts,
            interrupted = summary.interrupted,
            "pipeline finished"
        );
        Ok(summary)
    }
}

fn spawn_named<T, F>(name: &str, f: F) -> Result<JoinHandle<Result<T, PipelineError>>, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(PipelineError::from)
}

fn join_stage<T>(
    name: &str,
    handle: JoinHandle<Result<T, PipelineError>>,
    errors: &mut Vec<PipelineError>,
) -> Option<T> {
    match handle.join() {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            errors.push(e);
            None
        }
        Err(_) => {
            errors.push(PipelineError::ThreadPanicked(name.to_string()));
            None
        }
    }
}

/// Prefer the error that started a cascade over the ones it caused.
fn pick_root_cause(errors: Vec<PipelineError>) -> Option<PipelineError> {
    let mut secondary = None;
    for error in errors {
        if !error.is_secondary() {
            return Some(error);
        }
        secondary.get_or_insert(error);
    }
    secondary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_signal_is_shared() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_raised());
        signal.raise();
        assert!(clone.is_raised());
    }

    #[test]
    fn test_root_cause_preferred() {
        let errors = vec![
            PipelineError::BarrierBroken,
            PipelineError::Io("disk full".to_string()),
            PipelineError::ChannelClosed {
                stage: "generator",
                cycle: 2,
            },
        ];
        assert!(matches!(pick_root_cause(errors), Some(PipelineError::Io(_))));

        let only_secondary = vec![PipelineError::BarrierBroken];
        assert!(matches!(
            pick_root_cause(only_secondary),
            Some(PipelineError::BarrierBroken)
        ));
        assert!(pick_root_cause(Vec::new()).is_none());
    }

    #[test]
    fn test_invalid_config_fails_before_start() {
        let config = Config {
            window_size: 0,
            ..Config::default()
        };
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
    }
}
