//! Tamper-evident ledger.
//!
//! Blocks are sealed with SHA-256 over the previous hash, the canonical JSON
//! body, and the cycle timestamp, then appended to a single JSON array file.

pub mod block;
pub mod builder;
pub mod store;

// Re-export commonly used types
pub use block::{
    canonical_json, compute_hash, Block, BlockBody, SignalStats, StatValue, GENESIS_PREV_HASH,
};
pub use builder::{
    assemble_cycle, collect_cycle, AlertThresholds, CompletedCycle, CycleMeans, LedgerBuilder,
    VerifierOutcome,
};
pub use store::LedgerStore;
