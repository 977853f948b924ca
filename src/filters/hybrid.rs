use log::{debug, info};

use crate::filters::adaptive_kalman::AdaptiveKalman;
use crate::filters::motion::{kalman_params, MotionDetector, MotionMode};
use crate::types::SensorRecord;

/// Consecutive motion-qualifying samples required before tracking starts
/// (~2 s at 10 Hz).
const REQUIRED_SUSTAINED_FRAMES: usize = 20;

/// Stages 1-2: adaptive Kalman forward pass plus RTS backward pass over the
/// gap-repaired timeline.
///
/// Latitude and longitude are tracked by two independent scalar filters
/// whose `(q, r)` pair follows the motion mode. Tracking does not begin
/// until the motion latch sees sustained movement; the provisional buffer
/// is replayed through the filters once the latch opens, so the output
/// starts at the first genuinely-moving sample. Instantiate fresh per run.
pub struct HybridSmoother {
    lat_filter: AdaptiveKalman,
    lon_filter: AdaptiveKalman,
    detector: MotionDetector,
    latch_buffer: Vec<SensorRecord>,
    tracked: Vec<SensorRecord>,
    latched: bool,
    required_sustained_frames: usize,
}

impl HybridSmoother {
    pub fn new() -> Self {
        HybridSmoother {
            lat_filter: AdaptiveKalman::new(),
            lon_filter: AdaptiveKalman::new(),
            detector: MotionDetector::new(),
            latch_buffer: Vec::new(),
            tracked: Vec::new(),
            latched: false,
            required_sustained_frames: REQUIRED_SUSTAINED_FRAMES,
        }
    }

    #[cfg(test)]
    fn with_required_frames(mut self, frames: usize) -> Self {
        self.required_sustained_frames = frames;
        self
    }

    /// Run the full forward + backward pass. The output may be shorter than
    /// the input: pre-latch samples and no-fix records before initialization
    /// never reach the filters.
    pub fn smooth(mut self, records: &[SensorRecord]) -> Vec<SensorRecord> {
        for record in records {
            let mode = self
                .detector
                .update(record.accel().norm(), record.speed);

            if !self.latched {
                self.feed_latch(record, mode);
            } else {
                self.track(record, mode);
            }
        }

        if !self.latched {
            debug!(
                "motion latch never opened ({} provisional samples at end of input)",
                self.latch_buffer.len()
            );
            return Vec::new();
        }

        self.reconstruct()
    }

    /// Accumulate motion evidence before tracking starts. A sample that
    /// fails the motion test (or carries no fix) voids the run so far.
    fn feed_latch(&mut self, record: &SensorRecord, mode: MotionMode) {
        if mode != MotionMode::Moving || !record.has_gps_fix() {
            self.latch_buffer.clear();
            return;
        }
        self.latch_buffer.push(record.clone());

        if self.latch_buffer.len() >= self.required_sustained_frames {
            let first = &self.latch_buffer[0];
            self.lat_filter.reset(first.latitude);
            self.lon_filter.reset(first.longitude);
            info!(
                "motion latch opened at sequence id {} after {} sustained frames",
                first.sequence_id,
                self.latch_buffer.len()
            );

            // Replay the provisional buffer through the freshly-seeded
            // filters; all buffered samples qualified as moving.
            let buffered = std::mem::take(&mut self.latch_buffer);
            for sample in &buffered {
                self.track(sample, MotionMode::Moving);
            }
            self.latched = true;
        }
    }

    fn track(&mut self, record: &SensorRecord, mode: MotionMode) {
        let (q, r) = kalman_params(mode);
        self.lat_filter.step(record.latitude, q, r);
        self.lon_filter.step(record.longitude, q, r);
        self.tracked.push(record.clone());
    }

    /// Zip the forward-pass metadata with the RTS-smoothed coordinates.
    fn reconstruct(self) -> Vec<SensorRecord> {
        let lat_smoothed = self.lat_filter.rts_smooth();
        let lon_smoothed = self.lon_filter.rts_smooth();

        let mut out = Vec::with_capacity(self.tracked.len());
        let mut prev_pos: Option<(u64, u64)> = None;
        for (i, record) in self.tracked.into_iter().enumerate() {
            let mut cleaned = record;
            cleaned.latitude = lat_smoothed[i];
            cleaned.longitude = lon_smoothed[i];

            // Bit-identical consecutive positions are a static fix; any
            // reported speed there is phantom.
            let pos_bits = (cleaned.latitude.to_bits(), cleaned.longitude.to_bits());
            if prev_pos == Some(pos_bits) {
                cleaned.speed = 0.0;
            }
            prev_pos = Some(pos_bits);
            out.push(cleaned);
        }
        out
    }
}

impl Default for HybridSmoother {
    fn default() -> Self {
        HybridSmoother::new()
    }
}
