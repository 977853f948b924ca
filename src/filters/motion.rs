use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Accel-magnitude variance window (10 samples, ~1 s at 10 Hz).
const VARIANCE_WINDOW: usize = 10;

/// Smoothed-speed window (5 samples, ~0.5 s at 10 Hz).
const SPEED_WINDOW: usize = 5;

/// Inertial variance above this indicates body movement.
const VARIANCE_THRESHOLD: f64 = 2.5;

/// Smoothed speed above this (km/h) indicates locomotion.
const SPEED_THRESHOLD_KMH: f64 = 3.0;

/// Physics ceiling applied to reported speeds before averaging (km/h).
const SPEED_CEILING_KMH: f64 = 45.0;

/// Motion regime of the tracked subject. Closed set: the filter parameters
/// are a pure function of the mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    Stationary,
    Moving,
}

/// Process/measurement noise pair `(q, r)` for a mode. Stationary heavily
/// distrusts GPS (the subject is not going anywhere); moving trusts it.
pub fn kalman_params(mode: MotionMode) -> (f64, f64) {
    match mode {
        MotionMode::Stationary => (0.0001, 50.0),
        MotionMode::Moving => (1.0, 3.0),
    }
}

/// Windowed moving/stationary classifier with hysteresis.
///
/// Entering the moving state needs both evidence channels (inertial variance
/// and smoothed speed); once latched moving, either alone sustains it, so
/// the mode does not flicker at the threshold boundary.
#[derive(Clone, Debug)]
pub struct MotionDetector {
    accel_magnitudes: VecDeque<f64>,
    speeds: VecDeque<f64>,
    mode: MotionMode,
}

impl MotionDetector {
    pub fn new() -> Self {
        MotionDetector {
            accel_magnitudes: VecDeque::with_capacity(VARIANCE_WINDOW),
            speeds: VecDeque::with_capacity(SPEED_WINDOW),
            mode: MotionMode::Stationary,
        }
    }

    pub fn mode(&self) -> MotionMode {
        self.mode
    }

    /// Feed one sample; returns the updated mode.
    pub fn update(&mut self, accel_magnitude: f64, speed_kmh: f64) -> MotionMode {
        push_bounded(&mut self.accel_magnitudes, accel_magnitude, VARIANCE_WINDOW);
        push_bounded(
            &mut self.speeds,
            speed_kmh.clamp(0.0, SPEED_CEILING_KMH),
            SPEED_WINDOW,
        );

        let variance_high = variance(&self.accel_magnitudes) > VARIANCE_THRESHOLD;
        let speed_high = mean(&self.speeds) > SPEED_THRESHOLD_KMH;

        self.mode = match self.mode {
            MotionMode::Stationary if variance_high && speed_high => MotionMode::Moving,
            MotionMode::Moving if variance_high || speed_high => MotionMode::Moving,
            MotionMode::Moving => MotionMode::Stationary,
            other => other,
        };
        self.mode
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        MotionDetector::new()
    }
}

fn push_bounded(window: &mut VecDeque<f64>, value: f64, cap: usize) {
    window.push_back(value);
    while window.len() > cap {
        window.pop_front();
    }
}

fn mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

fn variance(window: &VecDeque<f64>) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let m = mean(window);
    window.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / window.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_per_mode() {
        assert_eq!(kalman_params(MotionMode::Stationary), (0.0001, 50.0));
        assert_eq!(kalman_params(MotionMode::Moving), (1.0, 3.0));
    }

    #[test]
    fn test_starts_stationary() {
        let detector = MotionDetector::new();
        assert_eq!(detector.mode(), MotionMode::Stationary);
    }

    #[test]
    fn test_needs_both_conditions_to_start_moving() {
        // high variance but no speed: still stationary
        let mut detector = MotionDetector::new();
        for i in 0..20 {
            let magnitude = if i % 2 == 0 { 8.0 } else { 12.0 };
            detector.update(magnitude, 0.0);
        }
        assert_eq!(detector.mode(), MotionMode::Stationary);

        // speed but flat inertials: still stationary (e.g. GPS drift)
        let mut detector = MotionDetector::new();
        for _ in 0..20 {
            detector.update(9.81, 10.0);
        }
        assert_eq!(detector.mode(), MotionMode::Stationary);

        // both together latch moving
        let mut detector = MotionDetector::new();
        for i in 0..20 {
            let magnitude = if i % 2 == 0 { 8.0 } else { 12.0 };
            detector.update(magnitude, 10.0);
        }
        assert_eq!(detector.mode(), MotionMode::Moving);
    }

    #[test]
    fn test_hysteresis_sustains_on_one_condition() {
        let mut detector = MotionDetector::new();
        for i in 0..20 {
            let magnitude = if i % 2 == 0 { 8.0 } else { 12.0 };
            detector.update(magnitude, 10.0);
        }
        assert_eq!(detector.mode(), MotionMode::Moving);

        // speed drops out but the body keeps shaking: stays moving
        for i in 0..20 {
            let magnitude = if i % 2 == 0 { 8.0 } else { 12.0 };
            detector.update(magnitude, 0.0);
        }
        assert_eq!(detector.mode(), MotionMode::Moving);

        // everything calms down: back to stationary
        for _ in 0..20 {
            detector.update(9.81, 0.0);
        }
        assert_eq!(detector.mode(), MotionMode::Stationary);
    }

    #[test]
    fn test_speed_ceiling_caps_glitches() {
        // a 400 km/h GPS glitch is clamped to the 45 km/h ceiling before
        // averaging, so the smoothed speed cannot explode
        let mut detector = MotionDetector::new();
        detector.update(9.81, 400.0);
        assert!(mean(&detector.speeds) <= SPEED_CEILING_KMH);
    }

    #[test]
    fn test_variance_window_is_bounded() {
        let mut detector = MotionDetector::new();
        for i in 0..100 {
            detector.update(i as f64, 0.0);
        }
        assert_eq!(detector.accel_magnitudes.len(), VARIANCE_WINDOW);
        assert_eq!(detector.speeds.len(), SPEED_WINDOW);
    }
}
