use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::filters::hybrid::HybridSmoother;
use crate::filters::zero_phase::{smooth_inertial_channels, ZeroPhaseFilter};
use crate::gap_repair::GapRepairer;
use crate::outlier::OutlierRejector;
use crate::types::SensorRecord;
use crate::validator::sanity_filter;

/// Pipeline configuration. Each stage can be disabled independently; a
/// stage downstream of a disabled one consumes whatever the prior enabled
/// stage produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub enable_sanity_check: bool,
    pub enable_gap_repair: bool,
    pub enable_kalman_rts: bool,
    pub enable_zero_phase_filter: bool,
    pub enable_outlier_rejection: bool,
    /// Low-pass cutoff for the inertial channels (Hz).
    pub filter_cutoff_hz: f64,
    /// Sampling rate of the record stream (Hz).
    pub filter_sampling_hz: f64,
    /// Per-interval GPS displacement bound (meters per nominal interval).
    pub max_gps_jump_m: f64,
    /// Virtual-clock tick for gap repair; `None` estimates it from the
    /// observed cadence snapped to the Pod's standard recording grid.
    pub nominal_interval_ms: Option<i64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            enable_sanity_check: true,
            enable_gap_repair: true,
            enable_kalman_rts: true,
            enable_zero_phase_filter: true,
            enable_outlier_rejection: true,
            filter_cutoff_hz: 5.0,
            filter_sampling_hz: 10.0,
            max_gps_jump_m: 1.0,
            nominal_interval_ms: Some(100),
        }
    }
}

impl PipelineConfig {
    /// Configuration mistakes are programming errors and fail fast here;
    /// nothing else in the pipeline ever raises.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.filter_cutoff_hz.is_finite() || self.filter_cutoff_hz <= 0.0 {
            return Err(PipelineError::InvalidCutoff(self.filter_cutoff_hz));
        }
        if !self.filter_sampling_hz.is_finite() || self.filter_sampling_hz <= 0.0 {
            return Err(PipelineError::InvalidSamplingRate(self.filter_sampling_hz));
        }
        if self.filter_cutoff_hz > self.filter_sampling_hz / 2.0 {
            return Err(PipelineError::CutoffAboveNyquist {
                cutoff: self.filter_cutoff_hz,
                sampling: self.filter_sampling_hz,
            });
        }
        if !self.max_gps_jump_m.is_finite() || self.max_gps_jump_m <= 0.0 {
            return Err(PipelineError::InvalidJumpBound(self.max_gps_jump_m));
        }
        if let Some(interval) = self.nominal_interval_ms {
            if interval <= 0 {
                return Err(PipelineError::InvalidInterval(interval));
            }
        }
        Ok(())
    }
}

/// Noteworthy things that happened during a run. Informational only; the
/// record flow never depends on these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum PipelineEvent {
    StageSkipped { stage: String },
    RecordsRejected { count: usize },
    GapsRepaired { synthesized: usize, health_score: f64 },
    LatchDiscarded { count: usize },
    OutliersCorrected { count: usize },
}

/// Final record stream plus the diagnostics persisted alongside it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub records: Vec<SensorRecord>,
    pub health_score: f64,
    pub original_count: usize,
    pub repaired_count: usize,
    pub outlier_corrections: usize,
    pub events: Vec<PipelineEvent>,
}

/// Composes the five stages in order: sanity check, gap repair, hybrid
/// Kalman + RTS, zero-phase inertial filtering, outlier rejection.
///
/// A run is a pure batch computation over an owned record sequence; all
/// stage state lives inside the run, so concurrent runs on different
/// sequences are independent. Worst case the output is an empty sequence
/// with health score 0 — data quality never raises an error.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Pipeline { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, records: Vec<SensorRecord>) -> PipelineOutput {
        let cfg = &self.config;
        let mut events = Vec::new();
        let input_count = records.len();

        // Stage -1: sanity check
        let records = if cfg.enable_sanity_check {
            let before = records.len();
            let kept = sanity_filter(records);
            if kept.len() < before {
                events.push(PipelineEvent::RecordsRejected {
                    count: before - kept.len(),
                });
            }
            kept
        } else {
            events.push(skipped("sanity_check"));
            records
        };

        // Stage 0: gap repair
        let (records, health_score, original_count, repaired_count) = if cfg.enable_gap_repair {
            let result = GapRepairer::new(cfg.nominal_interval_ms).repair(records);
            if result.repaired_count > 0 {
                events.push(PipelineEvent::GapsRepaired {
                    synthesized: result.repaired_count,
                    health_score: result.health_score,
                });
            }
            (
                result.records,
                result.health_score,
                result.original_count,
                result.repaired_count,
            )
        } else {
            events.push(skipped("gap_repair"));
            let count = records.len();
            let health = if count == 0 { 0.0 } else { 100.0 };
            (records, health, count, 0)
        };

        // Stages 1-2: adaptive Kalman forward pass + RTS backward pass
        let mut records = if cfg.enable_kalman_rts {
            let before = records.len();
            let smoothed = HybridSmoother::new().smooth(&records);
            if smoothed.len() < before {
                events.push(PipelineEvent::LatchDiscarded {
                    count: before - smoothed.len(),
                });
            }
            smoothed
        } else {
            events.push(skipped("kalman_rts"));
            records
        };

        // Stage 3: zero-phase low-pass on the raw inertial channels
        if cfg.enable_zero_phase_filter {
            let filter = ZeroPhaseFilter::new(cfg.filter_cutoff_hz, cfg.filter_sampling_hz);
            smooth_inertial_channels(&mut records, &filter);
        } else {
            events.push(skipped("zero_phase_filter"));
        }

        // Stage 4: residual GPS outlier rejection
        let (records, outlier_corrections) = if cfg.enable_outlier_rejection {
            let (corrected, count) = OutlierRejector::new(cfg.max_gps_jump_m).reject(records);
            if count > 0 {
                events.push(PipelineEvent::OutliersCorrected { count });
            }
            (corrected, count)
        } else {
            events.push(skipped("outlier_rejection"));
            (records, 0)
        };

        info!(
            "pipeline: {} in, {} out, health {:.1}, {} synthesized, {} corrected",
            input_count,
            records.len(),
            health_score,
            repaired_count,
            outlier_corrections
        );

        PipelineOutput {
            records,
            health_score,
            original_count,
            repaired_count,
            outlier_corrections,
            events,
        }
    }
}

fn skipped(stage: &str) -> PipelineEvent {
    PipelineEvent::StageSkipped {
        stage: stage.to_string(),
    }
}
