//! Offline integrity audit of a ledger file.

pub mod chain;

// Re-export commonly used types
pub use chain::{
    verify_chain, verify_entries, AuditReport, ChainVerifier, ChannelSummary, SignalSummaries,
};
