use thiserror::Error;

/// Configuration errors surface here and fail fast; data-quality problems
/// never do — every stage degrades to a valid (possibly empty) result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Filter cutoff must be a positive finite frequency, got {0} Hz")]
    InvalidCutoff(f64),

    #[error("Sampling rate must be a positive finite frequency, got {0} Hz")]
    InvalidSamplingRate(f64),

    #[error("Cutoff {cutoff} Hz is above the Nyquist limit for {sampling} Hz sampling")]
    CutoffAboveNyquist { cutoff: f64, sampling: f64 },

    #[error("GPS jump bound must be positive, got {0} m")]
    InvalidJumpBound(f64),

    #[error("Nominal sample interval must be positive, got {0} ms")]
    InvalidInterval(i64),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
