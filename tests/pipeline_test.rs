//! End-to-end tests for the analysis pipeline

use biometric_chain::{
    audit::ChainVerifier,
    config::AnalysisDelay,
    core::{summarize, SlidingWindow},
    ledger::{LedgerStore, SignalStats, GENESIS_PREV_HASH},
    AnalysisResult, Config, Pipeline, SignalGenerator, SignalKind,
};
use std::path::Path;
use std::thread;
use std::time::Duration;

fn fast_config(dir: &Path, cycles: u64, window_size: usize, seed: u64) -> Config {
    Config {
        cycles,
        window_size,
        tick_interval: Duration::ZERO,
        analysis_delay: AnalysisDelay::disabled(),
        ledger_path: dir.join("blockchain.json"),
        report_path: dir.join("report.txt"),
        run_log_path: dir.join("run_log.json"),
        strict_timestamps: true,
        seed: Some(seed),
    }
}

fn as_stats(result: AnalysisResult) -> SignalStats {
    match result {
        AnalysisResult::Frequency { mean, stddev, .. }
        | AnalysisResult::Oxygen { mean, stddev, .. } => SignalStats::scalar(mean, stddev),
        AnalysisResult::Pressure { mean, stddev, .. } => SignalStats::pair(mean, stddev),
    }
}

fn assert_stats_close(actual: &SignalStats, expected: &SignalStats) {
    for index in 0..2 {
        let pairs = [
            (actual.mean.component(index), expected.mean.component(index)),
            (
                actual.stddev.component(index),
                expected.stddev.component(index),
            ),
        ];
        for (a, e) in pairs {
            let (a, e) = (a.unwrap(), e.unwrap());
            assert!((a - e).abs() < 1e-9, "expected {e}, got {a}");
        }
    }
}

#[test]
fn test_one_block_per_reading() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path(), 8, 3, 42);

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.readings, 8);
    assert_eq!(summary.blocks, 8);
    assert!(!summary.interrupted);

    let blocks = LedgerStore::new(&config.ledger_path).load().unwrap();
    assert_eq!(blocks.len(), 8);
    assert_eq!(blocks[0].prev_hash, GENESIS_PREV_HASH);
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].prev_hash, pair[0].hash);
    }
    for block in &blocks {
        assert_eq!(block.recompute_hash().unwrap(), block.hash);
    }
    assert_eq!(summary.last_hash, blocks[7].hash);
    assert_eq!(
        summary.alerts,
        blocks.iter().filter(|b| b.alert).count() as u64
    );

    let stats = pipeline.run_log().stats();
    assert_eq!(stats.readings_generated, 8);
    assert_eq!(stats.results_published, 24);
    assert_eq!(stats.blocks_written, 8);
    assert!(config.run_log_path.exists());
}

#[test]
fn test_blocks_match_windowed_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path(), 10, 4, 7);
    Pipeline::new(config.clone()).unwrap().run().unwrap();
    let blocks = LedgerStore::new(&config.ledger_path).load().unwrap();

    // Replay the same seeded readings through a window of the same size.
    let mut generator = SignalGenerator::with_seed(Duration::ZERO, 7);
    let mut window = SlidingWindow::new(4);
    for block in &blocks {
        window.push(generator.next_reading());
        let ts = block.timestamp.clone();

        let frequency = as_stats(summarize(SignalKind::Frequency, ts.clone(), &window));
        let pressure = as_stats(summarize(SignalKind::Pressure, ts.clone(), &window));
        let oxygen = as_stats(summarize(SignalKind::Oxygen, ts, &window));

        assert_stats_close(&block.body.frequency, &frequency);
        assert_stats_close(&block.body.pressure, &pressure);
        assert_stats_close(&block.body.oxygen, &oxygen);
    }
    assert_eq!(window.len(), 4);
}

#[test]
fn test_first_block_has_zero_spread() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path(), 1, 30, 3);
    Pipeline::new(config.clone()).unwrap().run().unwrap();

    let blocks = LedgerStore::new(&config.ledger_path).load().unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].body.frequency.stddev.component(0), Some(0.0));
    assert_eq!(blocks[0].body.pressure.stddev.component(1), Some(0.0));
}

#[test]
fn test_audit_after_run_is_intact() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path(), 6, 30, 11);
    let summary = Pipeline::new(config.clone()).unwrap().run().unwrap();

    let report = ChainVerifier::new(&config.ledger_path).audit().unwrap();
    assert!(report.is_intact());
    assert_eq!(report.total_blocks, 6);
    assert_eq!(report.alert_count as u64, summary.alerts);

    let mean_hr = report.summaries.frequency.mean_of_means;
    assert!((40.0..=220.0).contains(&mean_hr));
}

#[test]
fn test_shutdown_before_start_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = fast_config(dir.path(), 5, 30, 1);

    let pipeline = Pipeline::new(config.clone()).unwrap();
    pipeline.shutdown_signal().raise();
    let summary = pipeline.run().unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.readings, 0);
    assert_eq!(summary.blocks, 0);
    assert!(!config.ledger_path.exists());
}

#[test]
fn test_shutdown_mid_run_keeps_complete_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(dir.path(), 1_000, 30, 5);
    config.tick_interval = Duration::from_millis(10);

    let pipeline = Pipeline::new(config.clone()).unwrap();
    let shutdown = pipeline.shutdown_signal();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        shutdown.raise();
    });

    let summary = pipeline.run().unwrap();
    stopper.join().unwrap();

    assert!(summary.interrupted);
    assert!(summary.readings < 1_000);
    assert_eq!(summary.blocks, summary.readings);

    if summary.blocks > 0 {
        let report = ChainVerifier::new(&config.ledger_path).audit().unwrap();
        assert!(report.is_intact());
        assert_eq!(report.total_blocks as u64, summary.blocks);
    }
}

#[test]
fn test_analysis_delay_does_not_reorder_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fast_config(dir.path(), 5, 30, 9);
    config.analysis_delay = AnalysisDelay {
        min_ms: 0,
        max_ms: 15,
    };

    let summary = Pipeline::new(config.clone()).unwrap().run().unwrap();
    assert_eq!(summary.blocks, 5);

    let report = ChainVerifier::new(&config.ledger_path).audit().unwrap();
    assert!(report.is_intact());
}
