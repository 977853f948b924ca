use std::f64::consts::PI;

use crate::types::SensorRecord;

/// Signals shorter than this pass through untouched; there is not enough
/// support for the edge padding.
const MIN_SIGNAL_LEN: usize = 6;

/// Samples reflected at each boundary before filtering.
const EDGE_PAD: usize = 3;

/// Stage 3: 2nd-order Butterworth low-pass applied forward-backward.
///
/// The forward pass delays the signal, the backward pass delays it the same
/// amount in reverse, so the net phase shift is zero; the price is that the
/// filter only works on complete batches. Coefficients come from the
/// bilinear transform and are fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct ZeroPhaseFilter {
    b: [f64; 3],
    a: [f64; 2],
}

impl ZeroPhaseFilter {
    pub fn new(cutoff_hz: f64, sampling_hz: f64) -> Self {
        let omega = (PI * cutoff_hz / sampling_hz).tan();
        let sqrt2 = std::f64::consts::SQRT_2;
        let norm = 1.0 + sqrt2 * omega + omega * omega;

        let b0 = omega * omega / norm;
        ZeroPhaseFilter {
            b: [b0, 2.0 * b0, b0],
            a: [
                2.0 * (omega * omega - 1.0) / norm,
                (1.0 - sqrt2 * omega + omega * omega) / norm,
            ],
        }
    }

    /// Filter one channel. Returns the input unchanged when it is too short
    /// to pad or when the filtered result contains any non-finite value.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        if signal.len() < MIN_SIGNAL_LEN {
            return signal.to_vec();
        }

        let padded = reflect_pad(signal, EDGE_PAD);

        let forward = self.run(&padded);
        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let backward = self.run(&reversed);
        let restored: Vec<f64> = backward.into_iter().rev().collect();

        let out = restored[EDGE_PAD..restored.len() - EDGE_PAD].to_vec();
        if out.iter().any(|v| !v.is_finite()) {
            return signal.to_vec();
        }
        out
    }

    /// Single causal pass, direct form I, delay line seeded at the first
    /// sample so a DC signal starts in steady state.
    fn run(&self, input: &[f64]) -> Vec<f64> {
        let first = input[0];
        let (mut x1, mut x2) = (first, first);
        let (mut y1, mut y2) = (first, first);

        let mut out = Vec::with_capacity(input.len());
        for &x in input {
            let y = self.b[0] * x + self.b[1] * x1 + self.b[2] * x2
                - self.a[0] * y1
                - self.a[1] * y2;
            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            out.push(y);
        }
        out
    }
}

/// Mirror up to `pad` samples around each endpoint (`2 * edge - neighbor`),
/// suppressing the filter transient at the sequence boundary.
fn reflect_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let pad = pad.min(signal.len() - 1);
    let mut padded = Vec::with_capacity(signal.len() + 2 * pad);

    let first = signal[0];
    for i in (1..=pad).rev() {
        padded.push(2.0 * first - signal[i]);
    }
    padded.extend_from_slice(signal);
    let last = signal[signal.len() - 1];
    for i in 1..=pad {
        padded.push(2.0 * last - signal[signal.len() - 1 - i]);
    }
    padded
}

/// Run the zero-phase filter over the six raw inertial channels of a record
/// batch. The gravity-filtered channels are a separately-supplied signal
/// and are left alone.
pub fn smooth_inertial_channels(records: &mut [SensorRecord], filter: &ZeroPhaseFilter) {
    let channels: [(fn(&SensorRecord) -> f64, fn(&mut SensorRecord, f64)); 6] = [
        (|r| r.accel_x, |r, v| r.accel_x = v),
        (|r| r.accel_y, |r, v| r.accel_y = v),
        (|r| r.accel_z, |r, v| r.accel_z = v),
        (|r| r.gyro_x, |r, v| r.gyro_x = v),
        (|r| r.gyro_y, |r, v| r.gyro_y = v),
        (|r| r.gyro_z, |r, v| r.gyro_z = v),
    ];

    for (read, write) in channels {
        let signal: Vec<f64> = records.iter().map(read).collect();
        let filtered = filter.apply(&signal);
        for (record, value) in records.iter_mut().zip(filtered) {
            write(record, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ZeroPhaseFilter {
        // well inside Nyquist so the response is a genuine low-pass
        ZeroPhaseFilter::new(2.0, 10.0)
    }

    #[test]
    fn test_dc_signal_is_preserved() {
        let signal = vec![9.81; 50];
        let out = filter().apply(&signal);
        assert_eq!(out.len(), signal.len());
        for v in out {
            assert!((v - 9.81).abs() < 1e-9, "got {v}");
        }
    }

    #[test]
    fn test_short_signal_passes_through() {
        for len in 0..MIN_SIGNAL_LEN {
            let signal: Vec<f64> = (0..len).map(|i| i as f64).collect();
            assert_eq!(filter().apply(&signal), signal);
        }
    }

    #[test]
    fn test_attenuates_high_frequency() {
        // Nyquist-rate alternation rides on a constant offset; a 2 Hz
        // low-pass at 10 Hz sampling should strip most of the wiggle
        let signal: Vec<f64> = (0..100)
            .map(|i| 5.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let out = filter().apply(&signal);

        let wiggle = |s: &[f64]| {
            s.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (s.len() - 1) as f64
        };
        assert!(wiggle(&out) < 0.2 * wiggle(&signal));
    }

    #[test]
    fn test_zero_phase_no_lag_on_slow_ramp() {
        // a slow ramp should come back essentially unshifted; a causal IIR
        // alone would lag behind
        let signal: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let out = filter().apply(&signal);
        for (o, s) in out.iter().zip(&signal).skip(5).take(90) {
            assert!((o - s).abs() < 0.05, "lag at sample: {o} vs {s}");
        }
    }

    #[test]
    fn test_non_finite_input_returns_original() {
        let mut signal = vec![1.0; 20];
        signal[10] = f64::NAN;
        let out = filter().apply(&signal);
        assert_eq!(out.len(), 20);
        assert!(out[10].is_nan());
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn test_default_pipeline_coefficients_stay_finite() {
        // the pipeline default is cutoff at the Nyquist edge (5 Hz @ 10 Hz),
        // where the filter degenerates to pass-through; it must stay finite
        let f = ZeroPhaseFilter::new(5.0, 10.0);
        let signal: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).sin()).collect();
        let out = f.apply(&signal);
        assert_eq!(out.len(), signal.len());
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_smooth_inertial_channels_leaves_filtered_accel_alone() {
        let mut records: Vec<SensorRecord> = (0..20)
            .map(|i| SensorRecord {
                sequence_id: i,
                timestamp_ms: i * 100,
                latitude: 52.52,
                longitude: 13.405,
                speed: 5.0,
                accel_x: if i % 2 == 0 { 8.0 } else { 12.0 },
                accel_y: 0.5,
                accel_z: 9.81,
                gyro_x: 0.0,
                gyro_y: 0.1,
                gyro_z: if i % 2 == 0 { -0.5 } else { 0.5 },
                filtered_accel_x: 3.0,
                filtered_accel_y: -1.0,
                filtered_accel_z: 0.25,
            })
            .collect();

        smooth_inertial_channels(&mut records, &filter());

        // raw alternating channels got pulled toward their mean
        let mid = &records[10];
        assert!((mid.accel_x - 10.0).abs() < 1.0);
        assert!((mid.gyro_z - 0.0).abs() < 0.3);
        // supplied gravity-compensated channels are untouched
        assert!(records
            .iter()
            .all(|r| r.filtered_accel_x == 3.0 && r.filtered_accel_y == -1.0));
        // GPS fields are never filtered
        assert!(records.iter().all(|r| r.latitude == 52.52));
    }
}
