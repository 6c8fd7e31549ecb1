//! Statistics estimates over a key range

use serde::{Deserialize, Serialize};

use crate::keys::KeyRange;

/// Estimate for one stretch of the requested range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsBin {
    /// False for a stretch no guidepost covers
    pub present: bool,
    pub estimated_rows: u64,
    pub estimated_bytes: u64,
    pub estimated_timestamp: i64,
    pub range: KeyRange,
}

impl StatisticsBin {
    pub fn present(range: KeyRange, rows: u64, bytes: u64, timestamp: i64) -> Self {
        Self {
            present: true,
            estimated_rows: rows,
            estimated_bytes: bytes,
            estimated_timestamp: timestamp,
            range,
        }
    }

    /// A stretch without statistics; all estimates are zero
    pub fn gap(range: KeyRange) -> Self {
        Self {
            present: false,
            estimated_rows: 0,
            estimated_bytes: 0,
            estimated_timestamp: 0,
            range,
        }
    }
}

/// Totals and ordered bins for a requested key range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total_bytes: u64,
    pub total_rows: u64,
    pub min_timestamp: i64,
    pub max_timestamp: i64,
    pub bins: Vec<StatisticsBin>,
}

impl StatisticsSummary {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bins backed by guideposts
    pub fn present_bins(&self) -> impl Iterator<Item = &StatisticsBin> {
        self.bins.iter().filter(|b| b.present)
    }

    /// True if some part of the range has no statistics
    pub fn has_gap(&self) -> bool {
        self.bins.iter().any(|b| !b.present)
    }
}
