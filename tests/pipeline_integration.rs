//! Pipeline Integration Tests
//!
//! Drives the whole chain the way the binary does: simulated recorder lines
//! are ingested into a sled store, read back newest-first and run through the
//! bench cycle. Also checks the end-to-end properties the dashboard relies
//! on (zero-phase alignment, early pulse termination, idle bench handling).

use std::f64::consts::PI;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use damper_bench::acquisition::{format_line, record_stream};
use damper_bench::config::{self, BenchConfig};
use damper_bench::pipeline::{analyze_bench_cycle, analyze_channel, BenchAnalyzer};
use damper_bench::processing::{collect_intervals, detect_intervals, threshold_mask, LowpassFilter, ProcessingError};
use damper_bench::simulation::{BenchSimulator, SimulationConfig};
use damper_bench::storage::{FrameCursor, FrameSource, FrameStore};
use damper_bench::types::{BenchSnapshot, Channel, Interval, SignPolicy};

fn bench_config() -> BenchConfig {
    let mut cfg = BenchConfig::default();
    cfg.acquisition.frame_size = 1024;
    cfg.acquisition.frames_per_analysis = 20;
    cfg
}

fn recorder_output(cfg: &BenchConfig, frames: usize) -> String {
    let mut sim = BenchSimulator::new(SimulationConfig {
        frame_size: cfg.acquisition.frame_size,
        sampling_rate_hz: cfg.acquisition.sampling_rate_hz,
        ..SimulationConfig::default()
    });
    let mut out = String::from("recorder: acquisition started\n");
    for frame in sim.take_frames(frames) {
        out.push_str(&format_line(&frame));
        out.push('\n');
    }
    out
}

#[tokio::test]
async fn test_recorded_frames_flow_into_bench_snapshot() {
    let cfg = bench_config();
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::open(dir.path().join("bench.db")).unwrap();
    let table = cfg.acquisition.table.as_str();

    let input = recorder_output(&cfg, 25);
    let stats = record_stream(
        input.as_bytes(),
        &store,
        table,
        NaiveDate::from_ymd_opt(2025, 2, 7).unwrap(),
        Some(cfg.acquisition.frame_size),
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.frames_stored, 25);
    assert_eq!(stats.lines_skipped, 1);
    assert_eq!(stats.parse_errors, 0);

    let analyzer = BenchAnalyzer::new(&cfg).unwrap();
    let snapshot = analyzer.poll(&store).unwrap();

    assert_eq!(snapshot.frames_used, 20);
    assert_eq!(snapshot.newest_sequence, Some(25));
    assert_eq!(snapshot.rotation.pulse_count, 6);
    assert!((snapshot.rotation.rpm - 1500.0).abs() < 1e-6, "rpm {}", snapshot.rotation.rpm);
    assert!(snapshot.force.main_amplitude > 3600.0 && snapshot.force.main_amplitude < 4400.0);
    assert!(snapshot.displacement.main_amplitude > 2160.0 && snapshot.displacement.main_amplitude < 2640.0);

    // the snapshot serializes for the --json output
    let json = serde_json::to_string(&snapshot).unwrap();
    let back: BenchSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.rotation.pulse_count, snapshot.rotation.pulse_count);
}

#[test]
fn test_empty_store_gives_zeroed_snapshot() {
    let cfg = bench_config();
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::open(dir.path().join("bench.db")).unwrap();

    let frames = store.fetch_recent_frames(&cfg.acquisition.table, 20).unwrap();
    assert!(frames.is_empty());
    let snapshot = analyze_bench_cycle(&frames, &cfg).unwrap();
    assert_eq!(snapshot, BenchSnapshot::default());
}

#[test]
fn test_incremental_reads_only_see_new_frames() {
    let cfg = bench_config();
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::open(dir.path().join("bench.db")).unwrap();
    let table = cfg.acquisition.table.as_str();
    let mut sim = BenchSimulator::new(SimulationConfig {
        frame_size: 64,
        ..SimulationConfig::default()
    });
    let mut cursor = FrameCursor::new();

    for frame in sim.take_frames(3) {
        store.append_frame(table, &frame).unwrap();
    }
    assert_eq!(store.fetch_new_frames(table, 10, &mut cursor).unwrap().len(), 3);

    for frame in sim.take_frames(2) {
        store.append_frame(table, &frame).unwrap();
    }
    let fresh = store.fetch_new_frames(table, 10, &mut cursor).unwrap();
    let seqs: Vec<u64> = fresh.iter().map(|f| f.sequence_number).collect();
    assert_eq!(seqs, vec![5, 4]);
}

#[tokio::test]
async fn test_cleared_recording_is_picked_up_again() {
    let cfg = bench_config();
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::open(dir.path().join("bench.db")).unwrap();
    let table = cfg.acquisition.table.as_str();
    let mut cursor = FrameCursor::new();

    let record = |input: String| {
        let store = store.clone();
        let frame_size = cfg.acquisition.frame_size;
        async move {
            let date = NaiveDate::from_ymd_opt(2025, 2, 7).unwrap();
            record_stream(input.as_bytes(), &store, table, date, Some(frame_size), CancellationToken::new())
                .await
                .unwrap()
        }
    };

    record(recorder_output(&cfg, 30)).await;
    assert_eq!(store.fetch_new_frames(table, 1, &mut cursor).unwrap().len(), 1);
    assert_eq!(cursor.last_seen(), Some(30));

    // `record --clear` with a fresh recorder whose counter restarts at 1
    store.clear_table(table).unwrap();
    let stats = record(recorder_output(&cfg, 5)).await;
    assert_eq!(stats.frames_stored, 5);

    let fresh = store.fetch_new_frames(table, 20, &mut cursor).unwrap();
    let seqs: Vec<u64> = fresh.iter().map(|f| f.sequence_number).collect();
    assert_eq!(seqs, vec![5, 4, 3, 2, 1]);
    assert_eq!(cursor.last_seen(), Some(5));
}

#[test]
fn test_filtered_peak_stays_aligned_with_raw_peak() {
    // single smooth bump on the force channel, stored newest-first
    let fs = 10_000.0;
    let n = 4000;
    let raw: Vec<i32> = (0..n)
        .map(|i| {
            let x = (i as f64 - 2000.0) / 150.0;
            (5000.0 * (-x * x).exp() + 300.0 * (2.0 * PI * 3000.0 * i as f64 / fs).sin()) as i32
        })
        .collect();

    let mut sim = BenchSimulator::new(SimulationConfig {
        frame_size: 1000,
        ..SimulationConfig::default()
    });
    let mut frames = sim.take_frames(4);
    for (k, frame) in frames.iter_mut().enumerate() {
        frame.channels[0] = raw[k * 1000..(k + 1) * 1000].to_vec();
    }
    frames.reverse();

    let filter = LowpassFilter::design(100.0, fs, 5).unwrap();
    let result = analyze_channel(&frames, Channel::FORCE, &filter, None, SignPolicy::Asymmetric);

    let argmax = |s: &[f64]| {
        s.iter()
            .enumerate()
            .fold((0, f64::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
            .0
    };
    let peak = argmax(&result.filtered_series);
    assert!(peak.abs_diff(2000) <= 2, "filtered peak at {peak}");
}

#[test]
fn test_interval_detection_scenarios() {
    // early termination: the scan stops after the requested pulses
    let mask = threshold_mask(&[0, 9, 9, 0, 9, 0, 9, 9, 9, 0, 9, 0], 5);
    let found: Vec<Interval> = detect_intervals(&mask, 2).collect();
    assert_eq!(found, vec![Interval::new(1, 3), Interval::new(4, 5)]);

    // tail policy: an open run at the end counts while below the limit
    let mask = threshold_mask(&[0, 9, 0, 9, 9], 5);
    let found: Vec<Interval> = detect_intervals(&mask, 5).collect();
    assert_eq!(found, vec![Interval::new(1, 2), Interval::new(3, 5)]);

    // too few pulses for a strict request
    let mask = threshold_mask(&[0, 9, 0, 0, 9, 0], 5);
    assert_eq!(
        collect_intervals(&mask, 3),
        Err(ProcessingError::InsufficientPulses { needed: 3, found: 2 })
    );
}

#[test]
fn test_idle_bench_reports_no_rotation() {
    let cfg = bench_config();
    let mut sim = BenchSimulator::new(SimulationConfig {
        frame_size: cfg.acquisition.frame_size,
        rpm: 0.0,
        ..SimulationConfig::default()
    });
    let mut frames = sim.take_frames(5);
    frames.reverse();

    let snapshot = analyze_bench_cycle(&frames, &cfg).unwrap();
    assert_eq!(snapshot.rotation.pulse_count, 0);
    assert!(snapshot.rotation.rpm.abs() < f64::EPSILON);
    assert!(snapshot.rotation.end_indices.is_empty());
}

#[test]
fn test_global_config_roundtrip() {
    if !config::is_initialized() {
        config::init(bench_config());
    }
    let cfg = config::get();
    assert!(cfg.validate().is_ok());
    assert!(BenchAnalyzer::new(cfg).is_ok());
}
