//! Synthetic reading generator.
//!
//! Produces one [`Reading`] per tick and writes it to every analyzer channel
//! before advancing. Values are uniform over fixed ranges and independent of
//! history; this is load, not physiology.

use crate::error::PipelineError;
use crate::pipeline::ShutdownSignal;
use crate::runlog::SharedRunLog;
use crate::signal::types::Reading;
use chrono::Local;
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::thread;
use std::time::Duration;

/// Inclusive value ranges for generated readings.
#[derive(Debug, Clone)]
pub struct ValueRanges {
    pub frequency: RangeInclusive<u32>,
    pub systolic: RangeInclusive<u32>,
    pub diastolic: RangeInclusive<u32>,
    pub oxygen: RangeInclusive<u32>,
}

impl Default for ValueRanges {
    fn default() -> Self {
        Self {
            frequency: 40..=220,
            systolic: 110..=220,
            diastolic: 40..=110,
            oxygen: 89..=100,
        }
    }
}

/// Generates readings and fans them out to the analyzer channels.
pub struct SignalGenerator {
    ranges: ValueRanges,
    tick_interval: Duration,
    rng: StdRng,
}

impl SignalGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            ranges: ValueRanges::default(),
            tick_interval,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator with a fixed seed, for reproducible runs.
    pub fn with_seed(tick_interval: Duration, seed: u64) -> Self {
        Self {
            ranges: ValueRanges::default(),
            tick_interval,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn ranges(&self) -> &ValueRanges {
        &self.ranges
    }

    /// Draw the next reading, stamped with the current local time.
    pub fn next_reading(&mut self) -> Reading {
        Reading {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            frequency: self.rng.gen_range(self.ranges.frequency.clone()),
            pressure: [
                self.rng.gen_range(self.ranges.systolic.clone()),
                self.rng.gen_range(self.ranges.diastolic.clone()),
            ],
            oxygen: self.rng.gen_range(self.ranges.oxygen.clone()),
        }
    }

    /// Produce up to `count` readings, one per tick.
    ///
    /// Each reading reaches every output before the next one is drawn. A closed
    /// output is fatal: downstream cycle counts depend on exact delivery.
    /// Raising `shutdown` stops production at the next tick boundary; the
    /// number of readings actually delivered is returned.
    pub fn run(
        &mut self,
        count: u64,
        outputs: &[Sender<Reading>],
        shutdown: &ShutdownSignal,
        run_log: &SharedRunLog,
    ) -> Result<u64, PipelineError> {
        tracing::info!(count, outputs = outputs.len(), "generator started");

        let mut produced = 0;
        while produced < count {
            if shutdown.is_raised() {
                tracing::warn!(produced, "shutdown requested, generator stopping");
                break;
            }

            let reading = self.next_reading();
            for output in outputs {
                output
                    .send(reading.clone())
                    .map_err(|_| PipelineError::ChannelClosed {
                        stage: "generator",
                        cycle: produced,
                    })?;
            }
            produced += 1;
            run_log.record_reading();

            tracing::debug!(
                cycle = produced,
                timestamp = %reading.timestamp,
                frequency = reading.frequency,
                systolic = reading.systolic(),
                diastolic = reading.diastolic(),
                oxygen = reading.oxygen,
                "reading generated"
            );

            if produced < count && !self.tick_interval.is_zero() {
                thread::sleep(self.tick_interval);
            }
        }

        tracing::info!(produced, "generator finished");
        Ok(produced)
    }
}
