//! Window statistics.
//!
//! Computes the per-kind mean and sample standard deviation of a window.
//! Frequency and oxygen reduce to scalars; pressure is reduced independently
//! over its systolic and diastolic components.

use crate::core::window::SlidingWindow;
use crate::signal::types::{AnalysisResult, SignalKind};
use statrs::statistics::Statistics;

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Sample (n-1) standard deviation.
///
/// Fewer than two samples yield 0 rather than an error or NaN.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Compute the result for `kind` over the current window contents.
///
/// Returns `None` for an empty window, which has no newest timestamp.
pub fn analyze_window(kind: SignalKind, window: &SlidingWindow) -> Option<AnalysisResult> {
    let timestamp = window.latest()?.timestamp.clone();
    Some(summarize(kind, timestamp, window))
}

/// Build the result for `kind`, stamped with `timestamp`.
pub fn summarize(kind: SignalKind, timestamp: String, window: &SlidingWindow) -> AnalysisResult {
    match kind {
        SignalKind::Frequency => {
            let values = window.project(|r| r.frequency);
            AnalysisResult::Frequency {
                timestamp,
                mean: mean(&values),
                stddev: sample_std_dev(&values),
            }
        }
        SignalKind::Pressure => {
            let systolic = window.project(|r| r.systolic());
            let diastolic = window.project(|r| r.diastolic());
            AnalysisResult::Pressure {
                timestamp,
                mean: [mean(&systolic), mean(&diastolic)],
                stddev: [sample_std_dev(&systolic), sample_std_dev(&diastolic)],
            }
        }
        SignalKind::Oxygen => {
            let values = window.project(|r| r.oxygen);
            AnalysisResult::Oxygen {
                timestamp,
                mean: mean(&values),
                stddev: sample_std_dev(&values),
            }
        }
    }
}
