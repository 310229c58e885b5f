//! Run log for the pipeline.
//!
//! Counts what each stage did during a run so the operator can see at a glance
//! whether the ledger accounts for every generated reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Counters for a single pipeline run.
#[derive(Debug)]
pub struct RunLog {
    /// Identifier of this run
    run_id: Uuid,
    /// Readings delivered by the generator
    readings_generated: AtomicU64,
    /// Results pushed to the aggregation queue by all analyzers
    results_published: AtomicU64,
    /// Blocks sealed and flushed by the verifier
    blocks_written: AtomicU64,
    /// Blocks flagged as alerts
    alerts_raised: AtomicU64,
    /// Run start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            readings_generated: AtomicU64::new(0),
            results_published: AtomicU64::new(0),
            blocks_written: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a run log that [`save`](Self::save) writes to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);
        log
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn record_reading(&self) {
        self.readings_generated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_result(&self) {
        self.results_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sealed block and whether it raised an alert.
    pub fn record_block(&self, alert: bool) {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
        if alert {
            self.alerts_raised.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        RunStats {
            run_id: self.run_id,
            readings_generated: self.readings_generated.load(Ordering::Relaxed),
            results_published: self.results_published.load(Ordering::Relaxed),
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            started_at: self.started_at,
            duration_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Run Statistics ({}):\n\
             - Readings generated: {}\n\
             - Results published: {}\n\
             - Blocks written: {}\n\
             - Alerts raised: {}\n\
             - Run duration: {} seconds",
            stats.run_id,
            stats.readings_generated,
            stats.results_published,
            stats.blocks_written,
            stats.alerts_raised,
            stats.duration_secs
        )
    }

    /// Save stats to disk, if a path was configured.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let json =
                serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub readings_generated: u64,
    pub results_published: u64,
    pub blocks_written: u64,
    pub alerts_raised: u64,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}

/// Create a new shared run log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRunLog {
    Arc::new(RunLog::with_persistence(path))
}
