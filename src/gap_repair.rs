use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::types::{FilterResult, SensorRecord};

/// Fallback hardware step size when too few deltas are usable.
const DEFAULT_STEP_SIZE: i64 = 100;

/// At most this many consecutive deltas feed the step-size estimate.
const STEP_SAMPLE_LIMIT: usize = 50;

/// Deltas at or above this are session boundaries, not cadence samples.
const NON_REPRESENTATIVE_DELTA: i64 = 5000;

/// Gaps of this many steps or more are deliberate pauses; the clock
/// re-anchors instead of filling.
const MAX_REPAIR_STEPS: i64 = 500;

const IQR_FENCE: f64 = 1.5;

/// The Pod records on a fixed grid of standard intervals.
const STANDARD_INTERVALS_MS: [i64; 10] = [100, 200, 300, 400, 500, 600, 700, 800, 900, 1000];

/// Snap a raw observed interval to the nearest standard recording interval.
pub fn snap_to_standard_interval(raw_ms: i64) -> i64 {
    let mut closest = 1000;
    let mut min_diff = i64::MAX;
    for t in STANDARD_INTERVALS_MS {
        let d = (raw_ms - t).abs();
        if d < min_diff {
            min_diff = d;
            closest = t;
        }
    }
    closest
}

/// How duplicate sequence ids are resolved. Keeping the last occurrence
/// assumes later retransmissions carry the more settled reading; this is a
/// heuristic, so it stays a policy rather than an invariant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupPolicy {
    #[default]
    KeepLast,
    KeepFirst,
}

/// Stage 0: restore a monotonic, fixed-interval record timeline.
///
/// Sorts and deduplicates by hardware sequence id, estimates the nominal id
/// step, interpolates synthetic records across repairable gaps and scores
/// the result by the fraction of output that is original data.
pub struct GapRepairer {
    nominal_interval_ms: Option<i64>,
    dedup_policy: DedupPolicy,
}

impl GapRepairer {
    /// `nominal_interval_ms`: virtual-clock tick between adjacent records.
    /// `None` estimates it from observed timestamp deltas snapped to the
    /// standard recording grid.
    pub fn new(nominal_interval_ms: Option<i64>) -> Self {
        GapRepairer {
            nominal_interval_ms,
            dedup_policy: DedupPolicy::default(),
        }
    }

    pub fn with_dedup_policy(mut self, policy: DedupPolicy) -> Self {
        self.dedup_policy = policy;
        self
    }

    pub fn repair(&self, records: Vec<SensorRecord>) -> FilterResult {
        if records.is_empty() {
            return FilterResult::empty();
        }
        let original_count = records.len();

        let records = self.sort_and_dedup(records);
        let step_size = estimate_step_size(&records);
        let interval = self
            .nominal_interval_ms
            .unwrap_or_else(|| estimate_wall_interval(&records));
        debug!("gap repair: step size {step_size}, interval {interval} ms");

        let mut out: Vec<SensorRecord> = Vec::with_capacity(records.len());
        let mut repaired = 0usize;

        let mut clock = records[0].timestamp_ms;
        out.push(records[0].clone());

        for pair in records.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            let id_delta = cur.sequence_id - prev.sequence_id;
            let steps = (id_delta as f64 / step_size as f64).round() as i64;

            if steps >= MAX_REPAIR_STEPS {
                // Deliberate pause: re-anchor to the hardware clock. The max
                // keeps output timestamps non-decreasing if that clock
                // regressed across the gap.
                clock = cur.timestamp_ms.max(clock + interval);
                let mut next = cur.clone();
                next.timestamp_ms = clock;
                out.push(next);
            } else if steps > 1 {
                for s in 1..steps {
                    let ratio = s as f64 / steps as f64;
                    let mut synth = SensorRecord::lerp(prev, cur, ratio);
                    synth.sequence_id = prev.sequence_id + s * step_size;
                    clock += interval;
                    synth.timestamp_ms = clock;
                    out.push(synth);
                    repaired += 1;
                }
                clock += interval;
                let mut next = cur.clone();
                next.timestamp_ms = clock;
                out.push(next);
            } else {
                // Normal cadence: one interval regardless of wall-clock
                // jitter between the two transmissions.
                clock += interval;
                let mut next = cur.clone();
                next.timestamp_ms = clock;
                out.push(next);
            }
        }

        let health = health_score(out.len(), repaired);
        if repaired > 0 {
            info!(
                "gap repair synthesized {repaired} records ({} total, health {health:.1})",
                out.len()
            );
        }
        FilterResult {
            records: out,
            health_score: health,
            original_count,
            repaired_count: repaired,
        }
    }

    fn sort_and_dedup(&self, mut records: Vec<SensorRecord>) -> Vec<SensorRecord> {
        // Stable sort keeps transmission order inside a duplicate run, which
        // is what the keep-first/keep-last policies select on.
        records.sort_by_key(|r| r.sequence_id);

        let mut deduped: Vec<SensorRecord> = Vec::with_capacity(records.len());
        for record in records {
            match deduped.last_mut() {
                Some(last) if last.sequence_id == record.sequence_id => {
                    if self.dedup_policy == DedupPolicy::KeepLast {
                        *last = record;
                    }
                }
                _ => deduped.push(record),
            }
        }
        deduped
    }
}

impl Default for GapRepairer {
    fn default() -> Self {
        GapRepairer::new(Some(100))
    }
}

/// `100 * (total - repaired) / total`; an empty timeline divides to 100 by
/// definition (the repair entry point reports 0 for empty input before this
/// is consulted).
pub fn health_score(total: usize, repaired: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * (total - repaired.min(total)) as f64 / total as f64
}

/// Median of IQR-inlier sequence-id deltas, sampled over the first
/// `STEP_SAMPLE_LIMIT` consecutive positive deltas below the
/// session-boundary cap.
fn estimate_step_size(records: &[SensorRecord]) -> i64 {
    let mut deltas: Vec<i64> = Vec::with_capacity(STEP_SAMPLE_LIMIT);
    for pair in records.windows(2) {
        let d = pair[1].sequence_id - pair[0].sequence_id;
        if d > 0 && d < NON_REPRESENTATIVE_DELTA {
            deltas.push(d);
            if deltas.len() >= STEP_SAMPLE_LIMIT {
                break;
            }
        }
    }
    if deltas.len() < 3 {
        return DEFAULT_STEP_SIZE;
    }

    deltas.sort_unstable();
    let q1 = deltas[deltas.len() / 4] as f64;
    let q3 = deltas[(deltas.len() * 3) / 4] as f64;
    let iqr = q3 - q1;
    let lo = q1 - IQR_FENCE * iqr;
    let hi = q3 + IQR_FENCE * iqr;

    let inliers: Vec<i64> = deltas
        .iter()
        .copied()
        .filter(|&d| (d as f64) >= lo && (d as f64) <= hi)
        .collect();

    if inliers.is_empty() {
        deltas[deltas.len() / 2]
    } else {
        inliers[inliers.len() / 2]
    }
}

/// Median positive timestamp delta snapped to the standard recording grid.
fn estimate_wall_interval(records: &[SensorRecord]) -> i64 {
    let mut deltas: Vec<i64> = records
        .windows(2)
        .map(|p| p[1].timestamp_ms - p[0].timestamp_ms)
        .filter(|&d| d > 0)
        .take(STEP_SAMPLE_LIMIT)
        .collect();
    if deltas.is_empty() {
        return 100;
    }
    deltas.sort_unstable();
    snap_to_standard_interval(deltas[deltas.len() / 2])
}
