use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::{SensorRecord, SessionBlock};

/// Session-splitting thresholds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// A gap strictly greater than this closes the current block.
    pub split_threshold_ms: i64,
    /// Blocks spanning less than this are discarded as noise.
    pub min_duration_ms: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            split_threshold_ms: 10 * 60 * 1000,
            min_duration_ms: 5 * 60 * 1000,
        }
    }
}

/// Groups a repaired record stream into logical workout sessions.
///
/// Stateless over a sorted sequence: records are sorted by timestamp and
/// accumulated until the gap to the previous record exceeds the split
/// threshold (strictly; a gap of exactly the threshold does not split).
pub struct SessionClusterer {
    config: SessionConfig,
}

impl SessionClusterer {
    pub fn new(config: SessionConfig) -> Self {
        SessionClusterer { config }
    }

    pub fn cluster(&self, mut records: Vec<SensorRecord>) -> Vec<SessionBlock> {
        if records.is_empty() {
            return Vec::new();
        }
        records.sort_by_key(|r| r.timestamp_ms);

        let mut blocks = Vec::new();
        let mut current: Vec<SensorRecord> = Vec::new();

        for record in records {
            if let Some(last) = current.last() {
                if record.timestamp_ms - last.timestamp_ms > self.config.split_threshold_ms {
                    self.close_block(&mut blocks, std::mem::take(&mut current));
                }
            }
            current.push(record);
        }
        self.close_block(&mut blocks, current);

        debug!("clustered into {} session block(s)", blocks.len());
        blocks
    }

    fn close_block(&self, blocks: &mut Vec<SessionBlock>, records: Vec<SensorRecord>) {
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return;
        };
        let (start_ms, end_ms) = (first.timestamp_ms, last.timestamp_ms);
        if end_ms - start_ms < self.config.min_duration_ms {
            debug!(
                "dropping {} ms block below the session duration floor",
                end_ms - start_ms
            );
            return;
        }
        blocks.push(SessionBlock {
            start_ms,
            end_ms,
            records,
        });
    }
}

impl Default for SessionClusterer {
    fn default() -> Self {
        SessionClusterer::new(SessionConfig::default())
    }
}
