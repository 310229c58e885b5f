//! Per-signal window analyzer.
//!
//! One analyzer is bound to one signal kind and one input channel. Per cycle it:
//! 1. blocks until a reading arrives,
//! 2. appends it to its window (evicting the oldest past the bound),
//! 3. computes mean and sample standard deviation for its kind,
//! 4. simulates processing latency,
//! 5. crosses the cycle barrier, then publishes to the aggregation queue.

use crate::config::AnalysisDelay;
use crate::core::barrier::CycleBarrier;
use crate::core::stats::summarize;
use crate::core::window::SlidingWindow;
use crate::error::PipelineError;
use crate::runlog::SharedRunLog;
use crate::signal::types::{AnalysisResult, Reading, SignalKind};
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Analyzer bound to one signal kind.
pub struct WindowAnalyzer {
    kind: SignalKind,
    window: SlidingWindow,
    input: Receiver<Reading>,
    output: Sender<AnalysisResult>,
    barrier: Arc<CycleBarrier>,
    delay: AnalysisDelay,
    rng: StdRng,
    run_log: SharedRunLog,
}

impl WindowAnalyzer {
    /// Build an analyzer for the named signal.
    ///
    /// An unknown name is rejected here, before any cycle runs.
    pub fn new(
        signal: &str,
        window_size: usize,
        input: Receiver<Reading>,
        output: Sender<AnalysisResult>,
        barrier: Arc<CycleBarrier>,
        run_log: SharedRunLog,
    ) -> Result<Self, PipelineError> {
        let kind: SignalKind = signal.parse()?;
        Ok(Self {
            kind,
            window: SlidingWindow::new(window_size),
            input,
            output,
            barrier,
            delay: AnalysisDelay::disabled(),
            rng: StdRng::from_entropy(),
            run_log,
        })
    }

    /// Set the simulated processing latency.
    pub fn with_delay(mut self, delay: AnalysisDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// Fold one reading into the window and compute this cycle's result.
    pub fn process(&mut self, reading: Reading) -> AnalysisResult {
        let timestamp = reading.timestamp.clone();
        self.window.push(reading);
        summarize(self.kind, timestamp, &self.window)
    }

    /// Run cycles until the input channel closes.
    ///
    /// Returns the number of cycles published. On failure, including a panic,
    /// the barrier is aborted so sibling analyzers are released instead of
    /// waiting forever.
    pub fn run(mut self) -> Result<u64, PipelineError> {
        tracing::info!(signal = %self.kind, window = self.window.capacity(), "analyzer started");

        let mut guard = AbortOnExit::new(Arc::clone(&self.barrier));
        let outcome = self.run_cycles();
        match &outcome {
            Ok(cycles) => {
                guard.disarm();
                tracing::info!(signal = %self.kind, cycles, "analyzer finished");
            }
            Err(e) => {
                if !e.is_secondary() {
                    tracing::error!(signal = %self.kind, error = %e, "analyzer failed");
                }
            }
        }
        outcome
    }

    fn run_cycles(&mut self) -> Result<u64, PipelineError> {
        let mut published = 0;

        // A closed input means the generator is done; every analyzer sees the
        // same readings, so this always happens at a cycle boundary.
        while let Ok(reading) = self.input.recv() {
            let result = self.process(reading);
            tracing::debug!(
                signal = %self.kind,
                window = self.window.len(),
                result = ?result,
                "window analyzed"
            );

            self.simulate_latency();

            let crossing = self
                .barrier
                .arrive_and_wait()
                .map_err(|_| PipelineError::BarrierBroken)?;

            self.output
                .send(result)
                .map_err(|_| PipelineError::ChannelClosed {
                    stage: "analyzer",
                    cycle: crossing.cycle,
                })?;
            published += 1;
            self.run_log.record_result();
        }

        Ok(published)
    }

    fn simulate_latency(&mut self) {
        if self.delay.is_disabled() {
            return;
        }
        let millis = self.rng.gen_range(self.delay.min_ms..=self.delay.max_ms);
        thread::sleep(Duration::from_millis(millis));
    }
}

/// Aborts the barrier when dropped unless disarmed, also while unwinding.
struct AbortOnExit {
    barrier: Arc<CycleBarrier>,
    armed: bool,
}

impl AbortOnExit {
    fn new(barrier: Arc<CycleBarrier>) -> Self {
        Self {
            barrier,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnExit {
    fn drop(&mut self) {
        if self.armed {
            self.barrier.abort();
        }
    }
}
