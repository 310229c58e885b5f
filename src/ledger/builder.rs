//! Verifier: turns completed cycles into chained blocks.
//!
//! The verifier drains exactly one cycle's worth of results from the
//! aggregation queue, groups them by signal kind, evaluates the alert rules,
//! seals a block chained to the previous one, and rewrites the ledger file
//! before touching the next cycle.

use crate::error::PipelineError;
use crate::ledger::block::{Block, BlockBody, SignalStats, GENESIS_PREV_HASH};
use crate::ledger::store::LedgerStore;
use crate::runlog::SharedRunLog;
use crate::signal::types::{AnalysisResult, SignalKind};
use crossbeam_channel::Receiver;

/// Scalar means of one cycle, the inputs to the alert rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleMeans {
    pub frequency: f64,
    pub systolic: f64,
    pub diastolic: f64,
    pub oxygen: f64,
}

/// Rule-based alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Alert when the mean heart rate is strictly above this
    pub frequency_above: f64,
    /// Alert when the mean systolic pressure is strictly above this
    pub systolic_above: f64,
    /// Alert when the mean diastolic pressure is strictly below this
    pub diastolic_below: f64,
    /// Alert when mean oxygen is at or below this
    pub oxygen_at_or_below: f64,
    /// Alert when mean oxygen is at or above this.
    ///
    /// This flags a saturation of exactly 100%, which is a healthy value. The
    /// threshold is kept as recorded in the reference rules.
    pub oxygen_at_or_above: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            frequency_above: 200.0,
            systolic_above: 200.0,
            diastolic_below: 50.0,
            oxygen_at_or_below: 90.0,
            oxygen_at_or_above: 100.0,
        }
    }
}

impl AlertThresholds {
    pub fn is_alert(&self, means: &CycleMeans) -> bool {
        means.frequency > self.frequency_above
            || means.systolic > self.systolic_above
            || means.diastolic < self.diastolic_below
            || means.oxygen <= self.oxygen_at_or_below
            || means.oxygen >= self.oxygen_at_or_above
    }
}

/// A full cycle grouped by signal kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedCycle {
    pub timestamp: String,
    pub body: BlockBody,
    pub means: CycleMeans,
}

/// Group one cycle's results by declared kind.
///
/// Arrival order within the cycle is irrelevant. With `strict_timestamps`,
/// every result must stem from the same reading.
pub fn assemble_cycle(
    results: Vec<AnalysisResult>,
    strict_timestamps: bool,
) -> Result<CompletedCycle, PipelineError> {
    let received = results.len();
    let timestamp = match results.first() {
        Some(first) => first.timestamp().to_string(),
        None => {
            return Err(PipelineError::CountMismatch {
                expected: SignalKind::ALL.len(),
                received: 0,
            })
        }
    };

    let mut frequency = None;
    let mut pressure = None;
    let mut oxygen = None;

    for result in results {
        if strict_timestamps && result.timestamp() != timestamp {
            return Err(PipelineError::TimestampMismatch {
                expected: timestamp,
                found: result.timestamp().to_string(),
            });
        }

        let kind = result.kind();
        let slot_taken = match result {
            AnalysisResult::Frequency { mean, stddev, .. } => {
                frequency.replace((mean, stddev)).is_some()
            }
            AnalysisResult::Pressure { mean, stddev, .. } => {
                pressure.replace((mean, stddev)).is_some()
            }
            AnalysisResult::Oxygen { mean, stddev, .. } => oxygen.replace((mean, stddev)).is_some(),
        };
        if slot_taken {
            return Err(PipelineError::DuplicateSignal(kind));
        }
    }

    match (frequency, pressure, oxygen) {
        (Some(frequency), Some(pressure), Some(oxygen)) => Ok(CompletedCycle {
            timestamp,
            body: BlockBody {
                frequency: SignalStats::scalar(frequency.0, frequency.1),
                pressure: SignalStats::pair(pressure.0, pressure.1),
                oxygen: SignalStats::scalar(oxygen.0, oxygen.1),
            },
            means: CycleMeans {
                frequency: frequency.0,
                systolic: pressure.0[0],
                diastolic: pressure.0[1],
                oxygen: oxygen.0,
            },
        }),
        _ => Err(PipelineError::CountMismatch {
            expected: SignalKind::ALL.len(),
            received,
        }),
    }
}

/// Take exactly `parties` results from the queue.
///
/// Returns `Ok(None)` when the queue closed on a cycle boundary and
/// [`PipelineError::CountMismatch`] when it closed mid-cycle. Never blocks
/// once every producer is gone.
pub fn collect_cycle(
    queue: &Receiver<AnalysisResult>,
    parties: usize,
) -> Result<Option<Vec<AnalysisResult>>, PipelineError> {
    let mut results = Vec::with_capacity(parties);
    while results.len() < parties {
        match queue.recv() {
            Ok(result) => results.push(result),
            Err(_) if results.is_empty() => return Ok(None),
            Err(_) => {
                return Err(PipelineError::CountMismatch {
                    expected: parties,
                    received: results.len(),
                })
            }
        }
    }
    Ok(Some(results))
}

/// Summary of a finished verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierOutcome {
    pub blocks: u64,
    pub alerts: u64,
    pub last_hash: String,
}

/// Owns the in-memory ledger and its file.
pub struct LedgerBuilder {
    store: LedgerStore,
    blocks: Vec<Block>,
    thresholds: AlertThresholds,
    strict_timestamps: bool,
    run_log: SharedRunLog,
}

impl LedgerBuilder {
    /// Start an empty ledger that will be written to `store`.
    pub fn new(store: LedgerStore, run_log: SharedRunLog) -> Self {
        Self {
            store,
            blocks: Vec::new(),
            thresholds: AlertThresholds::default(),
            strict_timestamps: true,
            run_log,
        }
    }

    pub fn with_strict_timestamps(mut self, strict: bool) -> Self {
        self.strict_timestamps = strict;
        self
    }

    pub fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Hash the next block will chain to.
    pub fn last_hash(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREV_HASH)
    }

    /// Seal one cycle into a block and flush the whole ledger.
    pub fn append_cycle(&mut self, results: Vec<AnalysisResult>) -> Result<&Block, PipelineError> {
        let cycle = assemble_cycle(results, self.strict_timestamps)?;
        let alert = self.thresholds.is_alert(&cycle.means);
        let block = Block::seal(
            cycle.timestamp,
            cycle.body,
            alert,
            self.last_hash().to_string(),
        )?;

        self.blocks.push(block);
        self.store.write_all(&self.blocks)?;
        self.run_log.record_block(alert);

        let block = &self.blocks[self.blocks.len() - 1];
        tracing::debug!(
            index = self.blocks.len() - 1,
            timestamp = %block.timestamp,
            alert,
            hash = %block.hash,
            "block sealed"
        );
        if alert {
            tracing::warn!(timestamp = %block.timestamp, means = ?cycle.means, "alert raised");
        }
        Ok(block)
    }

    /// Drain the queue cycle by cycle until every analyzer has hung up.
    pub fn run(
        mut self,
        queue: Receiver<AnalysisResult>,
        parties: usize,
    ) -> Result<VerifierOutcome, PipelineError> {
        tracing::info!(ledger = ?self.store.path(), parties, "verifier started");

        let mut alerts = 0;
        while let Some(results) = collect_cycle(&queue, parties)? {
            if self.append_cycle(results)?.alert {
                alerts += 1;
            }
        }

        let outcome = VerifierOutcome {
            blocks: self.blocks.len() as u64,
            alerts,
            last_hash: self.last_hash().to_string(),
        };
        tracing::info!(blocks = outcome.blocks, alerts, "verifier finished");
        Ok(outcome)
    }
}
