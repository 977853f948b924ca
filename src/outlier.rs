use log::debug;

use crate::geo::{haversine_distance, kmh_to_ms};
use crate::types::SensorRecord;

/// Only pairs at (roughly) nominal cadence are checked; across longer
/// intervals a large displacement is legitimate travel. Kept at 150 ms from
/// the reference tuning; it does not scale with the sampling rate.
const ELIGIBLE_INTERVAL_MS: i64 = 150;

/// Stage 4: final defense against GPS jumps that survive the Kalman gate,
/// typically right after a motion-latch cold start.
///
/// Walks the smoothed sequence once; when a per-interval displacement
/// exceeds the jump bound and the pair's reported speeds cannot explain it,
/// the position is pulled back toward the previous (already corrected)
/// point so the displacement matches the speed-implied expectation.
pub struct OutlierRejector {
    max_jump_m: f64,
}

impl OutlierRejector {
    pub fn new(max_jump_m: f64) -> Self {
        OutlierRejector { max_jump_m }
    }

    pub fn reject(&self, records: Vec<SensorRecord>) -> (Vec<SensorRecord>, usize) {
        let mut out = records;
        let mut corrections = 0usize;

        for i in 1..out.len() {
            let interval_ms = out[i].timestamp_ms - out[i - 1].timestamp_ms;
            if interval_ms > ELIGIBLE_INTERVAL_MS {
                continue;
            }

            let (prev_lat, prev_lon) = (out[i - 1].latitude, out[i - 1].longitude);
            let observed =
                haversine_distance(prev_lat, prev_lon, out[i].latitude, out[i].longitude);
            if observed <= self.max_jump_m {
                continue;
            }

            let avg_speed_ms = kmh_to_ms((out[i - 1].speed + out[i].speed) / 2.0);
            let expected = avg_speed_ms * interval_ms as f64 / 1000.0;
            if expected < observed {
                let scale = expected / observed;
                out[i].latitude = prev_lat + (out[i].latitude - prev_lat) * scale;
                out[i].longitude = prev_lon + (out[i].longitude - prev_lon) * scale;
                corrections += 1;
            }
        }

        if corrections > 0 {
            debug!("outlier rejection corrected {corrections} positions");
        }
        (out, corrections)
    }
}
