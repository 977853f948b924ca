use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One decoded telemetry record from the Pod.
///
/// `sequence_id` is the hardware tick counter (monotonic per transmission,
/// not wall clock); `timestamp_ms` is epoch milliseconds and is rewritten
/// during gap repair to restore fixed-interval spacing. A latitude/longitude
/// of (0, 0) is the no-fix sentinel, never a real position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub sequence_id: i64,
    pub timestamp_ms: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// GPS speed in km/h, always >= 0.
    pub speed: f64,
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    pub filtered_accel_x: f64,
    pub filtered_accel_y: f64,
    pub filtered_accel_z: f64,
}

impl SensorRecord {
    pub fn accel(&self) -> Vector3<f64> {
        Vector3::new(self.accel_x, self.accel_y, self.accel_z)
    }

    pub fn gyro(&self) -> Vector3<f64> {
        Vector3::new(self.gyro_x, self.gyro_y, self.gyro_z)
    }

    /// False for the (0, 0) null-island sentinel.
    pub fn has_gps_fix(&self) -> bool {
        self.latitude.abs() >= 0.001 || self.longitude.abs() >= 0.001
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp_ms)
            .single()
            .unwrap_or_default()
    }

    /// Build a synthetic record between two real neighbors at `ratio`
    /// (0 = `a`, 1 = `b`), interpolating every sensor channel, the GPS fix
    /// and the speed. `sequence_id` and `timestamp_ms` are copied from `a`;
    /// the gap repairer assigns both from its running virtual clock.
    pub fn lerp(a: &SensorRecord, b: &SensorRecord, ratio: f64) -> SensorRecord {
        let mix = |from: f64, to: f64| from + (to - from) * ratio;
        SensorRecord {
            sequence_id: a.sequence_id,
            timestamp_ms: a.timestamp_ms,
            latitude: mix(a.latitude, b.latitude),
            longitude: mix(a.longitude, b.longitude),
            speed: mix(a.speed, b.speed),
            accel_x: mix(a.accel_x, b.accel_x),
            accel_y: mix(a.accel_y, b.accel_y),
            accel_z: mix(a.accel_z, b.accel_z),
            gyro_x: mix(a.gyro_x, b.gyro_x),
            gyro_y: mix(a.gyro_y, b.gyro_y),
            gyro_z: mix(a.gyro_z, b.gyro_z),
            filtered_accel_x: mix(a.filtered_accel_x, b.filtered_accel_x),
            filtered_accel_y: mix(a.filtered_accel_y, b.filtered_accel_y),
            filtered_accel_z: mix(a.filtered_accel_z, b.filtered_accel_z),
        }
    }
}

/// Output of the gap-repair stage: the restored record timeline plus the
/// counters that make up the data-trust score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterResult {
    pub records: Vec<SensorRecord>,
    /// 0-100, fraction of output records that are original (non-synthetic).
    pub health_score: f64,
    /// Record count after sanity filtering, before repair.
    pub original_count: usize,
    /// Synthetic records generated during repair.
    pub repaired_count: usize,
}

impl FilterResult {
    pub fn empty() -> Self {
        FilterResult {
            records: Vec::new(),
            health_score: 0.0,
            original_count: 0,
            repaired_count: 0,
        }
    }
}

/// A maximal run of records with no internal gap above the session-split
/// threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionBlock {
    pub start_ms: i64,
    pub end_ms: i64,
    pub records: Vec<SensorRecord>,
}

impl SessionBlock {
    pub fn start_time(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.start_ms)
            .single()
            .unwrap_or_default()
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.end_ms)
            .single()
            .unwrap_or_default()
    }

    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.end_ms - self.start_ms)
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_ms - self.start_ms) as f64 / 1000.0
    }
}
