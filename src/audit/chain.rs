//! Offline chain audit.
//!
//! Re-reads a ledger, recomputes every hash, and checks the `prev_hash`
//! linkage. The first mismatch invalidates that block and every block after
//! it; only the verified prefix contributes to alert counts and statistics.
//! Entries are checked as raw JSON, so an edit that breaks the block schema
//! is reported as an invalid block rather than an unreadable ledger. The
//! audit shares nothing with the live pipeline and never modifies the ledger.

use crate::core::stats::{mean, sample_std_dev};
use crate::error::PipelineError;
use crate::ledger::block::{compute_hash, Block, StatValue, GENESIS_PREV_HASH};
use crate::ledger::store::LedgerStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Aggregate of one statistic channel across verified blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    /// Mean of the per-block means
    pub mean_of_means: f64,
    /// Sample standard deviation of the per-block means
    pub stddev_of_means: f64,
    /// Mean of the per-block standard deviations
    pub mean_of_stddevs: f64,
}

impl ChannelSummary {
    fn from_samples(means: &[f64], stddevs: &[f64]) -> Self {
        Self {
            mean_of_means: mean(means),
            stddev_of_means: sample_std_dev(means),
            mean_of_stddevs: mean(stddevs),
        }
    }
}

/// Per-channel summaries; pressure is split into its two components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummaries {
    pub frequency: ChannelSummary,
    pub systolic: ChannelSummary,
    pub diastolic: ChannelSummary,
    pub oxygen: ChannelSummary,
}

/// Result of auditing a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub total_blocks: usize,
    pub valid_blocks: usize,
    pub invalid_blocks: usize,
    /// Alerts among verified blocks
    pub alert_count: usize,
    /// Index of the first block that failed verification
    pub first_invalid_index: Option<usize>,
    pub summaries: SignalSummaries,
}

impl AuditReport {
    pub fn is_intact(&self) -> bool {
        self.invalid_blocks == 0
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.first_invalid_index {
            None => out.push_str("All blocks are correctly chained.\n"),
            Some(index) => out.push_str(&format!(
                "Corrupted data detected: {} invalid blocks starting at index {} (invalid blocks are ignored)\n",
                self.invalid_blocks, index
            )),
        }
        out.push_str(&format!("Blocks read: {}\n", self.total_blocks));
        out.push_str(&format!("Verified blocks: {}\n", self.valid_blocks));
        out.push_str(&format!("Alerts: {}\n", self.alert_count));
        out.push('\n');
        out.push_str("Signal            mean     stddev of means   mean stddev\n");

        let rows = [
            ("frequency", &self.summaries.frequency),
            ("systolic", &self.summaries.systolic),
            ("diastolic", &self.summaries.diastolic),
            ("oxygen", &self.summaries.oxygen),
        ];
        for (name, summary) in rows {
            out.push_str(&format!(
                "{:<12} {:>10.2} {:>19.2} {:>13.2}\n",
                name, summary.mean_of_means, summary.stddev_of_means, summary.mean_of_stddevs
            ));
        }
        out
    }

    /// Write the rendered report to `path`.
    pub fn write_report(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

#[derive(Default)]
struct ChannelSamples {
    means: Vec<f64>,
    stddevs: Vec<f64>,
}

impl ChannelSamples {
    fn push(&mut self, mean: &StatValue, stddev: &StatValue, index: usize) {
        if let (Some(m), Some(s)) = (mean.component(index), stddev.component(index)) {
            self.means.push(m);
            self.stddevs.push(s);
        }
    }

    fn summary(&self) -> ChannelSummary {
        ChannelSummary::from_samples(&self.means, &self.stddevs)
    }
}

/// The typed block behind `entry`, if it links to `expected_prev`, hashes to
/// its stored hash, and still matches the block schema.
fn verified_block(entry: &Value, expected_prev: &str) -> Option<Block> {
    let prev_hash = entry.get("prev_hash")?.as_str()?;
    let timestamp = entry.get("timestamp")?.as_str()?;
    let stored_hash = entry.get("hash")?.as_str()?;
    let body = entry.get("body")?;

    if prev_hash != expected_prev {
        return None;
    }
    if compute_hash(prev_hash, body, timestamp).ok()? != stored_hash {
        return None;
    }
    serde_json::from_value(entry.clone()).ok()
}

/// Audit an in-memory ledger.
pub fn verify_chain(blocks: &[Block]) -> AuditReport {
    let entries: Vec<Value> = blocks
        .iter()
        .map(|block| serde_json::to_value(block).unwrap_or(Value::Null))
        .collect();
    verify_entries(&entries)
}

/// Audit ledger entries exactly as they were read from disk.
pub fn verify_entries(entries: &[Value]) -> AuditReport {
    let mut expected_prev = GENESIS_PREV_HASH.to_string();
    let mut first_invalid_index = None;
    let mut valid_blocks = 0;
    let mut alert_count = 0;

    let mut frequency = ChannelSamples::default();
    let mut systolic = ChannelSamples::default();
    let mut diastolic = ChannelSamples::default();
    let mut oxygen = ChannelSamples::default();

    for (index, entry) in entries.iter().enumerate() {
        let Some(block) = verified_block(entry, &expected_prev) else {
            let timestamp = entry.get("timestamp").and_then(Value::as_str).unwrap_or("?");
            tracing::warn!(index, timestamp, "chain broken");
            first_invalid_index = Some(index);
            break;
        };

        valid_blocks += 1;
        if block.alert {
            alert_count += 1;
        }

        let body = &block.body;
        frequency.push(&body.frequency.mean, &body.frequency.stddev, 0);
        systolic.push(&body.pressure.mean, &body.pressure.stddev, 0);
        diastolic.push(&body.pressure.mean, &body.pressure.stddev, 1);
        oxygen.push(&body.oxygen.mean, &body.oxygen.stddev, 0);

        expected_prev = block.hash;
    }

    AuditReport {
        total_blocks: entries.len(),
        valid_blocks,
        invalid_blocks: entries.len() - valid_blocks,
        alert_count,
        first_invalid_index,
        summaries: SignalSummaries {
            frequency: frequency.summary(),
            systolic: systolic.summary(),
            diastolic: diastolic.summary(),
            oxygen: oxygen.summary(),
        },
    }
}

/// Read-only auditor over a ledger file.
pub struct ChainVerifier {
    store: LedgerStore,
}

impl ChainVerifier {
    pub fn new(ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            store: LedgerStore::new(ledger_path),
        }
    }

    /// Load the ledger and audit it.
    ///
    /// Only a missing file or one that is not a JSON array is an error.
    pub fn audit(&self) -> Result<AuditReport, PipelineError> {
        let entries = self.store.load_raw()?;
        let report = verify_entries(&entries);
        tracing::info!(
            ledger = ?self.store.path(),
            total = report.total_blocks,
            invalid = report.invalid_blocks,
            alerts = report.alert_count,
            "chain audited"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::{BlockBody, SignalStats};

    fn chain(oxygen_means: &[f64]) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        for (i, &oxygen) in oxygen_means.iter().enumerate() {
            let prev = blocks
                .last()
                .map(|b| b.hash.clone())
                .unwrap_or_else(|| GENESIS_PREV_HASH.to_string());
            blocks.push(
                Block::seal(
                    format!("2025-08-05T12:00:{i:02}"),
                    BlockBody {
                        frequency: SignalStats::scalar(70.0 + i as f64, 1.0),
                        pressure: SignalStats::pair([120.0, 80.0], [2.0, 3.0]),
                        oxygen: SignalStats::scalar(oxygen, 0.5),
                    },
                    oxygen <= 90.0,
                    prev,
                )
                .unwrap(),
            );
        }
        blocks
    }

    #[test]
    fn test_intact_chain() {
        let report = verify_chain(&chain(&[95.0, 89.0, 97.0, 96.0]));

        assert!(report.is_intact());
        assert_eq!(report.total_blocks, 4);
        assert_eq!(report.valid_blocks, 4);
        assert_eq!(report.alert_count, 1);
        assert_eq!(report.first_invalid_index, None);
        assert!((report.summaries.frequency.mean_of_means - 71.5).abs() < 1e-9);
        assert!((report.summaries.oxygen.mean_of_means - 94.25).abs() < 1e-9);
        assert!((report.summaries.diastolic.mean_of_stddevs - 3.0).abs() < 1e-9);
        assert_eq!(report.summaries.systolic.stddev_of_means, 0.0);
    }

    #[test]
    fn test_tampered_body_invalidates_suffix() {
        let mut blocks = chain(&[95.0, 89.0, 97.0, 96.0, 94.0]);
        blocks[2].body.frequency = SignalStats::scalar(172.0, 1.0);

        let report = verify_chain(&blocks);
        assert!(!report.is_intact());
        assert_eq!(report.first_invalid_index, Some(2));
        assert_eq!(report.valid_blocks, 2);
        assert_eq!(report.invalid_blocks, 3);
        assert_eq!(report.alert_count, 1);
        // Only blocks 0 and 1 count: frequencies 70 and 71.
        assert!((report.summaries.frequency.mean_of_means - 70.5).abs() < 1e-9);
    }

    #[test]
    fn test_broken_link_detected() {
        let mut blocks = chain(&[95.0, 96.0, 97.0]);
        blocks[1].prev_hash = GENESIS_PREV_HASH.to_string();

        let report = verify_chain(&blocks);
        assert_eq!(report.first_invalid_index, Some(1));
        assert_eq!(report.invalid_blocks, 2);
    }

    #[test]
    fn test_schema_break_counts_as_invalid_block() {
        let blocks = chain(&[95.0, 89.0, 97.0, 96.0]);
        let mut entries: Vec<Value> = blocks
            .iter()
            .map(|b| serde_json::to_value(b).unwrap())
            .collect();
        let oxygen = entries[2]["body"]["oxygen"].as_object_mut().unwrap();
        let mean = oxygen.remove("mean").unwrap();
        oxygen.insert("meam".to_string(), mean);

        let report = verify_entries(&entries);
        assert_eq!(report.first_invalid_index, Some(2));
        assert_eq!(report.valid_blocks, 2);
        assert_eq!(report.invalid_blocks, 2);
        assert_eq!(report.alert_count, 1);

        entries[1] = Value::String("not a block".to_string());
        assert_eq!(verify_entries(&entries).first_invalid_index, Some(1));
    }

    #[test]
    fn test_empty_ledger() {
        let report = verify_chain(&[]);
        assert!(report.is_intact());
        assert_eq!(report.total_blocks, 0);
        assert_eq!(report.summaries, SignalSummaries::default());
    }

    #[test]
    fn test_render_mentions_corruption() {
        let mut blocks = chain(&[95.0, 96.0]);
        blocks[0].timestamp = "2025-08-05T12:00:59".to_string();

        let text = verify_chain(&blocks).render();
        assert!(text.contains("Corrupted data detected: 2 invalid blocks starting at index 0"));
        assert!(text.contains("Blocks read: 2"));

        let intact = verify_chain(&chain(&[95.0])).render();
        assert!(intact.starts_with("All blocks are correctly chained."));
        assert!(intact.contains("oxygen"));
    }
}
