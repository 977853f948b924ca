use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::json;

use pod_pipeline_rs::session::{SessionClusterer, SessionConfig};
use pod_pipeline_rs::types::SensorRecord;
use pod_pipeline_rs::{Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a decoded Pod record log through the reconstruction pipeline", long_about = None)]
struct Args {
    /// Path to a JSON array of decoded records; omit to synthesize a demo run
    #[arg(long)]
    log: Option<PathBuf>,

    /// Low-pass cutoff for inertial channels (Hz)
    #[arg(long, default_value = "5.0")]
    cutoff_hz: f64,

    /// Sampling rate of the record stream (Hz)
    #[arg(long, default_value = "10.0")]
    sampling_hz: f64,

    /// GPS displacement bound per interval (meters)
    #[arg(long, default_value = "1.0")]
    max_jump_m: f64,

    /// Force the virtual-clock interval (ms); omit to estimate it
    #[arg(long)]
    interval_ms: Option<i64>,

    /// Session split threshold (minutes)
    #[arg(long, default_value = "10")]
    split_minutes: i64,

    /// Minimum session duration (minutes)
    #[arg(long, default_value = "5")]
    min_session_minutes: i64,

    /// Disable the sanity-check stage (A/B testing)
    #[arg(long, default_value_t = false)]
    no_sanity_check: bool,

    /// Disable gap repair (A/B testing)
    #[arg(long, default_value_t = false)]
    no_gap_repair: bool,

    /// Disable the Kalman + RTS smoother (A/B testing)
    #[arg(long, default_value_t = false)]
    no_kalman: bool,

    /// Disable the zero-phase inertial filter (A/B testing)
    #[arg(long, default_value_t = false)]
    no_zero_phase: bool,

    /// Disable outlier rejection (A/B testing)
    #[arg(long, default_value_t = false)]
    no_outlier_rejection: bool,

    /// Print every cleaned record instead of the summary only
    #[arg(long, default_value_t = false)]
    dump_records: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let records = match &args.log {
        Some(path) => load_records(path)?,
        None => synthesize_demo_run(),
    };
    info!("loaded {} records", records.len());

    let config = PipelineConfig {
        enable_sanity_check: !args.no_sanity_check,
        enable_gap_repair: !args.no_gap_repair,
        enable_kalman_rts: !args.no_kalman,
        enable_zero_phase_filter: !args.no_zero_phase,
        enable_outlier_rejection: !args.no_outlier_rejection,
        filter_cutoff_hz: args.cutoff_hz,
        filter_sampling_hz: args.sampling_hz,
        max_gps_jump_m: args.max_jump_m,
        nominal_interval_ms: args.interval_ms,
    };
    let pipeline = Pipeline::new(config).context("invalid pipeline configuration")?;

    let output = pipeline.run(records);

    let clusterer = SessionClusterer::new(SessionConfig {
        split_threshold_ms: args.split_minutes * 60_000,
        min_duration_ms: args.min_session_minutes * 60_000,
    });
    let sessions = clusterer.cluster(output.records.clone());

    let summary = json!({
        "records_out": output.records.len(),
        "stream_start": output.records.first().map(|r| r.timestamp().to_rfc3339()),
        "stream_end": output.records.last().map(|r| r.timestamp().to_rfc3339()),
        "health_score": output.health_score,
        "original_count": output.original_count,
        "repaired_count": output.repaired_count,
        "outlier_corrections": output.outlier_corrections,
        "events": output.events.len(),
        "sessions": sessions
            .iter()
            .map(|s| json!({
                "start": s.start_time().to_rfc3339(),
                "end": s.end_time().to_rfc3339(),
                "duration_secs": s.duration_secs(),
                "records": s.records.len(),
            }))
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if args.dump_records {
        println!("{}", serde_json::to_string_pretty(&output.records)?);
    }
    Ok(())
}

fn load_records(path: &PathBuf) -> Result<Vec<SensorRecord>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let records: Vec<SensorRecord> =
        serde_json::from_reader(BufReader::new(file)).context("parsing record log")?;
    Ok(records)
}

/// Ten minutes of plausible running data at 10 Hz with a dropout, a
/// duplicate transmission and one GPS teleport, so every stage has
/// something to do.
fn synthesize_demo_run() -> Vec<SensorRecord> {
    let start_ms: i64 = 1_700_000_000_000;
    let mut records = Vec::new();

    for i in 0..6_000i64 {
        // ~40 lost transmissions two minutes in
        if (1_200..1_240).contains(&i) {
            continue;
        }
        let wobble = if i % 2 == 0 { -2.5 } else { 2.5 };
        let mut record = SensorRecord {
            sequence_id: 50_000 + i * 100,
            timestamp_ms: start_ms + i * 100,
            latitude: 48.1351 + i as f64 * 2.5e-6,
            longitude: 11.5820 + i as f64 * 1.0e-6,
            speed: 10.0 + (i as f64 / 50.0).sin(),
            accel_x: 9.0 + wobble,
            accel_y: 0.4,
            accel_z: 2.0 - wobble * 0.3,
            gyro_x: 0.15,
            gyro_y: -0.05,
            gyro_z: 0.3 * (i as f64 / 25.0).cos(),
            filtered_accel_x: 1.1 + wobble * 0.2,
            filtered_accel_y: 0.1,
            filtered_accel_z: 0.4,
        };
        // one teleport spike halfway through
        if i == 3_000 {
            record.latitude += 0.002;
        }
        // duplicated transmission of one sequence id
        if i == 2_500 {
            records.push(record.clone());
        }
        records.push(record);
    }
    records
}
