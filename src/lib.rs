//! Biometric Chain - concurrent analysis of vital signs with a tamper-evident ledger.
//!
//! A generator emits one synthetic reading per tick (heart rate, blood
//! pressure, oxygen saturation). Three analyzers keep sliding windows over
//! their signal and publish mean and standard deviation for every reading. A
//! verifier groups each cycle's results into a block, flags out-of-range
//! means, and appends the block to a SHA-256 hash chain on disk. An offline
//! audit recomputes the chain and reports any tampering.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Biometric Chain                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                    ┌─────────────┐                               │
//! │               ┌───▶│  Frequency  │──┐                            │
//! │ ┌───────────┐ │    └─────────────┘  │  ┌─────────┐  ┌──────────┐ │
//! │ │ Generator │─┼───▶│  Pressure   │──┼─▶│ Barrier │─▶│ Verifier │ │
//! │ └───────────┘ │    └─────────────┘  │  └─────────┘  └──────────┘ │
//! │               └───▶│   Oxygen    │──┘                    │       │
//! │                    └─────────────┘                       ▼       │
//! │  ┌─────────────┐                                  ┌───────────┐  │
//! │  │   Run Log   │                                  │  Ledger   │  │
//! │  └─────────────┘                                  │   file    │  │
//! │                                                   └─────┬─────┘  │
//! │                                                         ▼        │
//! │                                                  ┌────────────┐  │
//! │                                                  │ Chain audit│  │
//! │                                                  └────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use biometric_chain::{audit::ChainVerifier, Config, Pipeline};
//!
//! let config = Config {
//!     cycles: 10,
//!     ..Config::default()
//! };
//! let pipeline = Pipeline::new(config.clone()).expect("invalid config");
//! let summary = pipeline.run().expect("pipeline failed");
//! println!("{} blocks, {} alerts", summary.blocks, summary.alerts);
//!
//! let report = ChainVerifier::new(&config.ledger_path).audit().expect("audit failed");
//! assert!(report.is_intact());
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod pipeline;
pub mod runlog;
pub mod signal;

// Re-export key types at crate root for convenience
pub use audit::{verify_chain, AuditReport, ChainVerifier};
pub use config::{AnalysisDelay, Config, ConfigError};
pub use core::{CycleBarrier, SlidingWindow, WindowAnalyzer};
pub use error::PipelineError;
pub use ledger::{Block, BlockBody, LedgerBuilder, LedgerStore};
pub use pipeline::{Pipeline, PipelineSummary, ShutdownSignal};
pub use runlog::{RunLog, RunStats, SharedRunLog};
pub use signal::{AnalysisResult, Reading, SignalGenerator, SignalKind};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
