/// Normalized innovation threshold (~3 sigma); larger innovations are GPS
/// teleports and fall back to the prediction.
const INNOVATION_GATE: f64 = 9.0;

/// Hard cap on the per-step shift in degrees, against spikes that survive
/// the gate.
const MAX_SHIFT_DEG: f64 = 0.0001;

/// Floor for smoother-gain denominators.
const EPS: f64 = 1e-12;

const INITIAL_COVARIANCE: f64 = 1.0;

/// One forward-pass step retained for the backward smoother.
#[derive(Clone, Copy, Debug)]
pub struct KalmanStep {
    pub x: f64,
    pub p: f64,
    pub q: f64,
}

/// Scalar adaptive Kalman filter over a single coordinate axis.
///
/// The caller supplies `(q, r)` per step, so the same filter tracks both the
/// stationary and the moving regime. Every step is appended to an owned
/// history buffer for the Rauch-Tung-Striebel backward pass; `reset` clears
/// it, which is how the motion latch re-initializes tracking.
#[derive(Clone, Debug)]
pub struct AdaptiveKalman {
    x: f64,
    p: f64,
    history: Vec<KalmanStep>,
}

impl AdaptiveKalman {
    pub fn new() -> Self {
        AdaptiveKalman {
            x: 0.0,
            p: INITIAL_COVARIANCE,
            history: Vec::new(),
        }
    }

    /// Snap the state to `x0` and drop all history.
    pub fn reset(&mut self, x0: f64) {
        self.x = x0;
        self.p = INITIAL_COVARIANCE;
        self.history.clear();
    }

    pub fn estimate(&self) -> f64 {
        self.x
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Predict with process noise `q`, gate the innovation, update with
    /// measurement noise `r`. Returns the filtered estimate.
    pub fn step(&mut self, measurement: f64, q: f64, r: f64) -> f64 {
        self.p += q;

        let innovation = measurement - self.x;
        let normalized = innovation * innovation / (self.p + r);
        let accepted = if normalized > INNOVATION_GATE {
            // teleport spike: hold the prediction instead
            self.x
        } else {
            measurement
        };

        let shift = (accepted - self.x).clamp(-MAX_SHIFT_DEG, MAX_SHIFT_DEG);
        let gain = self.p / (self.p + r);
        self.x += gain * shift;
        self.p *= 1.0 - gain;

        self.history.push(KalmanStep {
            x: self.x,
            p: self.p,
            q,
        });
        self.x
    }

    /// Backward RTS pass over the stored forward history. Removes the
    /// forward filter's phase lag; the forward state is left untouched.
    pub fn rts_smooth(&self) -> Vec<f64> {
        let n = self.history.len();
        if n == 0 {
            return Vec::new();
        }
        let mut smoothed = vec![0.0; n];
        smoothed[n - 1] = self.history[n - 1].x;
        for k in (0..n - 1).rev() {
            let step = self.history[k];
            let denom = step.p + step.q;
            let c = if denom > EPS { step.p / denom } else { 0.0 };
            smoothed[k] = step.x + c * (smoothed[k + 1] - step.x);
        }
        smoothed
    }
}

impl Default for AdaptiveKalman {
    fn default() -> Self {
        AdaptiveKalman::new()
    }
}
