//! Core analysis for the biometric pipeline.
//!
//! This module contains:
//! - The bounded sliding window each analyzer owns
//! - Mean / sample standard deviation over window projections
//! - The reusable cycle barrier shared by the analyzer cohort
//! - The analyzer worker tying these together

pub mod analyzer;
pub mod barrier;
pub mod stats;
pub mod window;

// Re-export commonly used types
pub use analyzer::WindowAnalyzer;
pub use barrier::{BarrierCrossing, BarrierError, CycleBarrier};
pub use stats::{analyze_window, mean, sample_std_dev, summarize};
pub use window::{SlidingWindow, DEFAULT_WINDOW_SIZE};
