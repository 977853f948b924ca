//! Signal-reconstruction pipeline for Pod wearable telemetry.
//!
//! Takes the noisy, gap-ridden record stream a Pod session download decodes
//! to and rebuilds a physically consistent, evenly-sampled trajectory:
//! sanity filtering, sequence-counter gap repair, adaptive Kalman smoothing
//! with an RTS backward pass, zero-phase inertial filtering and residual
//! GPS outlier rejection, plus time-gap session clustering of the result.

pub mod error;
pub mod filters;
pub mod gap_repair;
pub mod geo;
pub mod outlier;
pub mod pipeline;
pub mod session;
pub mod types;
pub mod validator;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineConfig, PipelineEvent, PipelineOutput};
pub use session::{SessionClusterer, SessionConfig};
pub use types::{FilterResult, SensorRecord, SessionBlock};
