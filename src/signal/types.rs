//! Reading and result types exchanged between pipeline stages.
//!
//! A [`Reading`] is produced once per tick and broadcast unchanged to every
//! analyzer. Each analyzer answers with one [`AnalysisResult`] per cycle.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One synthetic biometric sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// ISO-8601 timestamp, second precision
    pub timestamp: String,
    /// Heart rate in beats per minute
    pub frequency: u32,
    /// Blood pressure as `[systolic, diastolic]`
    pub pressure: [u32; 2],
    /// Blood oxygen saturation in percent
    pub oxygen: u32,
}

impl Reading {
    pub fn systolic(&self) -> u32 {
        self.pressure[0]
    }

    pub fn diastolic(&self) -> u32 {
        self.pressure[1]
    }
}

/// The signal an analyzer is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Frequency,
    Pressure,
    Oxygen,
}

impl SignalKind {
    /// Every signal kind, in ledger body order.
    pub const ALL: [SignalKind; 3] = [
        SignalKind::Frequency,
        SignalKind::Pressure,
        SignalKind::Oxygen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Frequency => "frequency",
            SignalKind::Pressure => "pressure",
            SignalKind::Oxygen => "oxygen",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frequency" => Ok(SignalKind::Frequency),
            "pressure" => Ok(SignalKind::Pressure),
            "oxygen" => Ok(SignalKind::Oxygen),
            _ => Err(PipelineError::UnknownSignal(s.to_string())),
        }
    }
}

/// Per-cycle statistics produced by one analyzer.
///
/// Pressure carries `[systolic, diastolic]` pairs; the other kinds carry scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnalysisResult {
    Frequency {
        timestamp: String,
        mean: f64,
        stddev: f64,
    },
    Pressure {
        timestamp: String,
        mean: [f64; 2],
        stddev: [f64; 2],
    },
    Oxygen {
        timestamp: String,
        mean: f64,
        stddev: f64,
    },
}

impl AnalysisResult {
    pub fn kind(&self) -> SignalKind {
        match self {
            AnalysisResult::Frequency { .. } => SignalKind::Frequency,
            AnalysisResult::Pressure { .. } => SignalKind::Pressure,
            AnalysisResult::Oxygen { .. } => SignalKind::Oxygen,
        }
    }

    /// Timestamp of the newest reading in the window that produced this result.
    pub fn timestamp(&self) -> &str {
        match self {
            AnalysisResult::Frequency { timestamp, .. }
            | AnalysisResult::Pressure { timestamp, .. }
            | AnalysisResult::Oxygen { timestamp, .. } => timestamp,
        }
    }
}
