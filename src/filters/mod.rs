pub mod adaptive_kalman;
pub mod hybrid;
pub mod motion;
pub mod zero_phase;
