//! Demonstration of a short Biometric Chain run.
//!
//! This example shows how to:
//! 1. Configure a fast, reproducible pipeline run
//! 2. Run generator, analyzers, and verifier to completion
//! 3. Audit the resulting ledger
//! 4. Tamper with one block and audit again
//!
//! Run with: cargo run --example pipeline_demo

use biometric_chain::{
    audit::ChainVerifier,
    config::AnalysisDelay,
    ledger::{LedgerStore, StatValue},
    Config, Pipeline,
};
use std::time::Duration;

fn main() {
    println!("Biometric Chain - Pipeline Demo");
    println!("===============================");
    println!();

    let data_dir = std::env::temp_dir().join("biometric-chain-demo");
    let config = Config {
        cycles: 12,
        window_size: 5,
        tick_interval: Duration::from_millis(50),
        analysis_delay: AnalysisDelay {
            min_ms: 0,
            max_ms: 20,
        },
        ledger_path: data_dir.join("blockchain.json"),
        report_path: data_dir.join("report.txt"),
        run_log_path: data_dir.join("run_log.json"),
        seed: Some(7),
        ..Config::default()
    };

    let pipeline = match Pipeline::new(config.clone()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return;
        }
    };

    println!("Running {} cycles...", config.cycles);
    let summary = match pipeline.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Pipeline failed: {e}");
            return;
        }
    };
    println!("  Blocks: {}", summary.blocks);
    println!("  Alerts: {}", summary.alerts);
    println!("  Last hash: {}", summary.last_hash);
    println!();

    let verifier = ChainVerifier::new(&config.ledger_path);
    match verifier.audit() {
        Ok(report) => print!("{}", report.render()),
        Err(e) => {
            eprintln!("Audit failed: {e}");
            return;
        }
    }
    println!();

    // Rewrite one block's heart-rate mean without resealing it.
    println!("Tampering with block 5...");
    let store = LedgerStore::new(&config.ledger_path);
    let mut blocks = match store.load() {
        Ok(blocks) => blocks,
        Err(e) => {
            eprintln!("Could not reload ledger: {e}");
            return;
        }
    };
    if let Some(block) = blocks.get_mut(5) {
        block.body.frequency.mean = StatValue::Scalar(250.0);
    }
    if let Err(e) = store.write_all(&blocks) {
        eprintln!("Could not write ledger: {e}");
        return;
    }

    match verifier.audit() {
        Ok(report) => print!("{}", report.render()),
        Err(e) => eprintln!("Audit failed: {e}"),
    }
}
