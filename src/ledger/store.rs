//! Durable storage for the ledger.
//!
//! The whole ledger is the unit of durability: every append rewrites the file
//! as a single JSON array. Writes go to a sibling temp file that is renamed
//! over the target, so readers never observe a half-written array.

use crate::error::PipelineError;
use crate::ledger::block::Block;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Single-writer ledger file.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the ledger file with `blocks`.
    pub fn write_all(&self, blocks: &[Block]) -> Result<(), PipelineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(blocks)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Read every block from the ledger file.
    pub fn load(&self) -> Result<Vec<Block>, PipelineError> {
        let blocks: Vec<Block> = serde_json::from_str(&self.read()?)?;
        Ok(blocks)
    }

    /// Read the ledger as untyped JSON entries.
    ///
    /// Fails only when the file is missing or not a JSON array; individual
    /// entries may have any shape.
    pub fn load_raw(&self) -> Result<Vec<Value>, PipelineError> {
        let entries: Vec<Value> = serde_json::from_str(&self.read()?)?;
        Ok(entries)
    }

    fn read(&self) -> Result<String, PipelineError> {
        std::fs::read_to_string(&self.path)
            .map_err(|e| PipelineError::Io(format!("Failed to read ledger {:?}: {e}", self.path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::{BlockBody, SignalStats, GENESIS_PREV_HASH};

    fn block(timestamp: &str, prev_hash: &str) -> Block {
        Block::seal(
            timestamp.to_string(),
            BlockBody {
                frequency: SignalStats::scalar(80.0, 0.0),
                pressure: SignalStats::pair([120.0, 80.0], [0.0, 0.0]),
                oxygen: SignalStats::scalar(97.0, 0.0),
            },
            false,
            prev_hash.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("ledger").join("blockchain.json"));

        let first = block("2025-08-05T12:00:00", GENESIS_PREV_HASH);
        let second = block("2025-08-05T12:00:01", &first.hash);
        store.write_all(&[first.clone()]).unwrap();
        store.write_all(&[first.clone(), second.clone()]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![first, second]);
        assert!(!dir
            .path()
            .join("ledger")
            .join("blockchain.json.tmp")
            .exists());
    }

    #[test]
    fn test_file_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("blockchain.json"));
        store
            .write_all(&[block("2025-08-05T12:00:00", GENESIS_PREV_HASH)])
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["prev_hash"], GENESIS_PREV_HASH);
        assert!(array[0]["body"]["pressure"]["mean"].is_array());
    }

    #[test]
    fn test_raw_load_accepts_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("blockchain.json"));
        std::fs::write(store.path(), r#"[{"timestamp": "t"}, 42]"#).unwrap();

        assert_eq!(store.load_raw().unwrap().len(), 2);
        assert!(matches!(store.load(), Err(PipelineError::Serialize(_))));

        std::fs::write(store.path(), "[{").unwrap();
        assert!(matches!(store.load_raw(), Err(PipelineError::Serialize(_))));
    }

    #[test]
    fn test_missing_ledger_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load(), Err(PipelineError::Io(_))));
    }
}
