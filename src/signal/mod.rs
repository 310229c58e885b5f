//! Signal sources for the pipeline.
//!
//! This module holds the reading/result types and the synthetic generator
//! that feeds every analyzer channel.

pub mod generator;
pub mod types;

// Re-export commonly used types
pub use generator::{SignalGenerator, ValueRanges};
pub use types::{AnalysisResult, Reading, SignalKind};
