//! Hash-sealed ledger blocks.
//!
//! `hash = SHA-256(prev_hash ‖ canonical_json(body) ‖ timestamp)`, hex encoded.
//! Canonical JSON has object keys sorted at every level and uses `", "` and
//! `": "` as separators, the layout of Python's `json.dumps(sort_keys=True)`,
//! so hashes agree with ledgers written by the reference tooling. Floats use
//! the shortest round-trip form.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::io;

/// `prev_hash` of the first block in every ledger.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// A statistic that is a scalar for most signals and a pair for pressure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Scalar(f64),
    Pair([f64; 2]),
}

impl StatValue {
    /// Component `index` of the value. Scalars answer every index.
    pub fn component(&self, index: usize) -> Option<f64> {
        match self {
            StatValue::Scalar(v) => Some(*v),
            StatValue::Pair(pair) => pair.get(index).copied(),
        }
    }
}

/// Mean and standard deviation of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub mean: StatValue,
    pub stddev: StatValue,
}

impl SignalStats {
    pub fn scalar(mean: f64, stddev: f64) -> Self {
        Self {
            mean: StatValue::Scalar(mean),
            stddev: StatValue::Scalar(stddev),
        }
    }

    pub fn pair(mean: [f64; 2], stddev: [f64; 2]) -> Self {
        Self {
            mean: StatValue::Pair(mean),
            stddev: StatValue::Pair(stddev),
        }
    }
}

/// Statistics of one cycle, one entry per signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub frequency: SignalStats,
    pub pressure: SignalStats,
    pub oxygen: SignalStats,
}

/// One append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: String,
    pub body: BlockBody,
    pub alert: bool,
    pub prev_hash: String,
    pub hash: String,
}

impl Block {
    /// Build a block and compute its hash.
    pub fn seal(
        timestamp: String,
        body: BlockBody,
        alert: bool,
        prev_hash: String,
    ) -> Result<Self, PipelineError> {
        let hash = compute_hash(&prev_hash, &body, &timestamp)?;
        Ok(Self {
            timestamp,
            body,
            alert,
            prev_hash,
            hash,
        })
    }

    /// Recompute the hash from this block's own fields.
    pub fn recompute_hash(&self) -> Result<String, PipelineError> {
        compute_hash(&self.prev_hash, &self.body, &self.timestamp)
    }
}

/// Hash a block's contents.
///
/// `body` is usually a [`BlockBody`]; the audit passes the raw JSON value read
/// from disk so that schema-breaking edits still hash instead of failing.
pub fn compute_hash<B>(prev_hash: &str, body: &B, timestamp: &str) -> Result<String, PipelineError>
where
    B: Serialize + ?Sized,
{
    let body_json = canonical_json(body)?;

    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(body_json.as_bytes());
    hasher.update(timestamp.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// JSON with object keys sorted recursively and Python-style separators.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, PipelineError> {
    let value = sort_keys(serde_json::to_value(value)?);

    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(out).map_err(|e| PipelineError::Serialize(e.to_string()))
}

/// Writes `", "` between elements and `": "` after keys, nothing else.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key, sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
