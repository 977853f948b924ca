use log::debug;

use crate::types::SensorRecord;

/// Absolute per-axis accelerometer ceiling (~20G). Real shocks stay below
/// this; values above it are decode garbage or sensor overflow.
pub const MAX_ACCEL_MS2: f64 = 200.0;

/// Absolute per-axis gyro ceiling (~2300 deg/s, above the 2000 dps sensor
/// range).
pub const MAX_GYRO_RADS: f64 = 40.0;

/// Speed ceiling in km/h, above elite sprint speed with margin.
pub const MAX_SPEED_KMH: f64 = 80.0;

const NULL_ISLAND_EPS: f64 = 0.001;

/// Stateless sanity predicate for a single record.
///
/// Corrupted values are deleted, never repaired: a fabricated reading would
/// skew the statistical filters more than the honest gap it leaves behind,
/// and the gap repairer can heal that gap.
pub fn is_plausible(record: &SensorRecord) -> bool {
    let floats = [
        record.latitude,
        record.longitude,
        record.speed,
        record.accel_x,
        record.accel_y,
        record.accel_z,
        record.gyro_x,
        record.gyro_y,
        record.gyro_z,
        record.filtered_accel_x,
        record.filtered_accel_y,
        record.filtered_accel_z,
    ];
    if floats.iter().any(|v| !v.is_finite()) {
        return false;
    }

    if record.latitude.abs() < NULL_ISLAND_EPS && record.longitude.abs() < NULL_ISLAND_EPS {
        return false;
    }

    if record.accel_x.abs() > MAX_ACCEL_MS2
        || record.accel_y.abs() > MAX_ACCEL_MS2
        || record.accel_z.abs() > MAX_ACCEL_MS2
    {
        return false;
    }

    if record.gyro_x.abs() > MAX_GYRO_RADS
        || record.gyro_y.abs() > MAX_GYRO_RADS
        || record.gyro_z.abs() > MAX_GYRO_RADS
    {
        return false;
    }

    if record.speed > MAX_SPEED_KMH {
        return false;
    }

    // All six raw IMU axes exactly zero means a stuck or zero-filled frame.
    if record.accel_x == 0.0
        && record.accel_y == 0.0
        && record.accel_z == 0.0
        && record.gyro_x == 0.0
        && record.gyro_y == 0.0
        && record.gyro_z == 0.0
    {
        return false;
    }

    true
}

/// Drop every implausible record from the batch.
pub fn sanity_filter(mut records: Vec<SensorRecord>) -> Vec<SensorRecord> {
    let before = records.len();
    records.retain(is_plausible);
    if records.len() < before {
        debug!("sanity filter dropped {} of {} records", before - records.len(), before);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_record() -> SensorRecord {
        SensorRecord {
            sequence_id: 1,
            timestamp_ms: 1_700_000_000_000,
            latitude: 52.52,
            longitude: 13.405,
            speed: 15.0,
            accel_x: 1.2,
            accel_y: -0.8,
            accel_z: 9.7,
            gyro_x: 0.1,
            gyro_y: -0.2,
            gyro_z: 0.05,
            filtered_accel_x: 0.3,
            filtered_accel_y: -0.1,
            filtered_accel_z: 0.0,
        }
    }

    #[test]
    fn test_accepts_plausible_record() {
        assert!(is_plausible(&valid_record()));
    }

    #[test]
    fn test_rejects_non_finite_fields() {
        for broken in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut r = valid_record();
            r.accel_y = broken;
            assert!(!is_plausible(&r));

            let mut r = valid_record();
            r.speed = broken;
            assert!(!is_plausible(&r));

            let mut r = valid_record();
            r.latitude = broken;
            assert!(!is_plausible(&r));
        }
    }

    #[test]
    fn test_rejects_null_island() {
        let mut r = valid_record();
        r.latitude = 0.0;
        r.longitude = 0.0;
        assert!(!is_plausible(&r));

        // only one coordinate near zero is a legitimate fix
        let mut r = valid_record();
        r.latitude = 0.0;
        r.longitude = 13.405;
        assert!(is_plausible(&r));
    }

    #[test]
    fn test_accel_boundary() {
        let mut r = valid_record();
        r.accel_z = MAX_ACCEL_MS2;
        assert!(is_plausible(&r));
        r.accel_z = MAX_ACCEL_MS2 + 0.01;
        assert!(!is_plausible(&r));
        r.accel_z = -(MAX_ACCEL_MS2 + 0.01);
        assert!(!is_plausible(&r));
    }

    #[test]
    fn test_gyro_boundary() {
        let mut r = valid_record();
        r.gyro_x = MAX_GYRO_RADS;
        assert!(is_plausible(&r));
        r.gyro_x = MAX_GYRO_RADS + 0.01;
        assert!(!is_plausible(&r));
    }

    #[test]
    fn test_speed_boundary() {
        let mut r = valid_record();
        r.speed = MAX_SPEED_KMH;
        assert!(is_plausible(&r));
        r.speed = MAX_SPEED_KMH + 0.1;
        assert!(!is_plausible(&r));
    }

    #[test]
    fn test_rejects_all_zero_imu() {
        let mut r = valid_record();
        r.accel_x = 0.0;
        r.accel_y = 0.0;
        r.accel_z = 0.0;
        r.gyro_x = 0.0;
        r.gyro_y = 0.0;
        r.gyro_z = 0.0;
        assert!(!is_plausible(&r));

        // a single live axis is enough to keep the record
        r.accel_z = 9.81;
        assert!(is_plausible(&r));
    }

    #[test]
    fn test_sanity_filter_drops_only_bad_records() {
        let good = valid_record();
        let mut bad = valid_record();
        bad.gyro_z = f64::NAN;

        let out = sanity_filter(vec![good.clone(), bad, good.clone()]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(is_plausible));
    }
}
