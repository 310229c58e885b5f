//! Error taxonomy for the biometric pipeline.
//!
//! Errors fall into three groups:
//! - configuration errors, raised before any worker starts,
//! - delivery errors (closed channels, undersupplied cycles), fatal to the run,
//! - integrity errors, which only the offline chain audit reports.
//!
//! Nothing here is retried. A short cycle changes the block bodies and with them
//! every later hash, so the run stops instead.

use crate::config::ConfigError;
use crate::signal::SignalKind;

/// Errors raised by the live pipeline and the ledger.
#[derive(Debug)]
pub enum PipelineError {
    /// Invalid configuration detected at setup.
    Config(String),
    /// A signal name that does not map to any analyzer.
    UnknownSignal(String),
    /// A channel closed while a stage still had data to move.
    ChannelClosed { stage: &'static str, cycle: u64 },
    /// The aggregation queue ran dry in the middle of a cycle.
    CountMismatch { expected: usize, received: usize },
    /// Results of one cycle carry different reading timestamps.
    TimestampMismatch { expected: String, found: String },
    /// Two results of the same signal kind landed in one cycle.
    DuplicateSignal(SignalKind),
    /// The cycle barrier was aborted by a failing analyzer.
    BarrierBroken,
    /// The verifier sealed fewer blocks than readings were generated.
    CycleShortfall { expected: u64, completed: u64 },
    /// Filesystem failure while reading or writing the ledger.
    Io(String),
    /// JSON encoding or decoding failure.
    Serialize(String),
    /// A worker thread panicked.
    ThreadPanicked(String),
}

impl PipelineError {
    /// Whether this error is a consequence of another stage failing first.
    ///
    /// Used to report the root cause when several workers fail together.
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            PipelineError::BarrierBroken | PipelineError::ChannelClosed { .. }
        )
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "Configuration error: {e}"),
            PipelineError::UnknownSignal(name) => write!(f, "Unknown signal type: '{name}'"),
            PipelineError::ChannelClosed { stage, cycle } => {
                write!(f, "Channel closed in {stage} at cycle {cycle}")
            }
            PipelineError::CountMismatch { expected, received } => write!(
                f,
                "Cycle incomplete: expected {expected} results, received {received}"
            ),
            PipelineError::TimestampMismatch { expected, found } => write!(
                f,
                "Cycle timestamps disagree: expected {expected}, found {found}"
            ),
            PipelineError::DuplicateSignal(kind) => {
                write!(f, "Duplicate {kind} result within one cycle")
            }
            PipelineError::BarrierBroken => write!(f, "Cycle barrier was aborted"),
            PipelineError::CycleShortfall {
                expected,
                completed,
            } => write!(
                f,
                "Ledger is short: {completed} blocks sealed for {expected} readings"
            ),
            PipelineError::Io(e) => write!(f, "IO error: {e}"),
            PipelineError::Serialize(e) => write!(f, "Serialize error: {e}"),
            PipelineError::ThreadPanicked(name) => write!(f, "Worker thread '{name}' panicked"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Serialize(e.to_string())
    }
}
