//! Planner metrics
//!
//! Counters are monotonic and read through a point-in-time snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Registry of planner counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// OFFSET clauses compiled to a row skip
    row_skips_compiled: AtomicU64,
    /// OFFSET clauses compiled to a keyset anchor
    keyset_anchors_compiled: AtomicU64,
    /// OFFSET clauses rejected
    offsets_rejected: AtomicU64,
    /// Successful statistics loads
    stats_loads: AtomicU64,
    /// Loads that fell back to previous statistics
    stats_fallbacks: AtomicU64,
    /// Statistics source handles opened
    source_handles_opened: AtomicU64,
    /// Guideposts handed out by decoders
    guideposts_decoded: AtomicU64,
    /// Decoders that stopped early
    decode_truncations: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_row_skips(&self) {
        self.row_skips_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_keyset_anchors(&self) {
        self.keyset_anchors_compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_offsets_rejected(&self) {
        self.offsets_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_loads(&self) {
        self.stats_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stats_fallbacks(&self) {
        self.stats_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_source_handles(&self) {
        self.source_handles_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_guideposts_decoded(&self, count: u64) {
        self.guideposts_decoded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_decode_truncations(&self) {
        self.decode_truncations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            row_skips_compiled: self.row_skips_compiled.load(Ordering::Relaxed),
            keyset_anchors_compiled: self.keyset_anchors_compiled.load(Ordering::Relaxed),
            offsets_rejected: self.offsets_rejected.load(Ordering::Relaxed),
            stats_loads: self.stats_loads.load(Ordering::Relaxed),
            stats_fallbacks: self.stats_fallbacks.load(Ordering::Relaxed),
            source_handles_opened: self.source_handles_opened.load(Ordering::Relaxed),
            guideposts_decoded: self.guideposts_decoded.load(Ordering::Relaxed),
            decode_truncations: self.decode_truncations.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot as a single JSON object
    pub fn to_json(&self) -> String {
        // A struct of integers always serializes
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub row_skips_compiled: u64,
    pub keyset_anchors_compiled: u64,
    pub offsets_rejected: u64,
    pub stats_loads: u64,
    pub stats_fallbacks: u64,
    pub source_handles_opened: u64,
    pub guideposts_decoded: u64,
    pub decode_truncations: u64,
}

impl MetricsSnapshot {
    /// Offsets compiled successfully, either kind
    pub fn offsets_compiled(&self) -> u64 {
        self.row_skips_compiled + self.keyset_anchors_compiled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();

        registry.increment_row_skips();
        registry.increment_keyset_anchors();
        registry.increment_keyset_anchors();
        registry.increment_offsets_rejected();
        registry.increment_stats_loads();
        registry.increment_stats_fallbacks();
        registry.increment_source_handles();
        registry.add_guideposts_decoded(7);
        registry.increment_decode_truncations();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.row_skips_compiled, 1);
        assert_eq!(snapshot.keyset_anchors_compiled, 2);
        assert_eq!(snapshot.offsets_compiled(), 3);
        assert_eq!(snapshot.offsets_rejected, 1);
        assert_eq!(snapshot.stats_loads, 1);
        assert_eq!(snapshot.stats_fallbacks, 1);
        assert_eq!(snapshot.source_handles_opened, 1);
        assert_eq!(snapshot.guideposts_decoded, 7);
        assert_eq!(snapshot.decode_truncations, 1);
    }

    #[test]
    fn test_to_json_is_valid() {
        let registry = MetricsRegistry::new();
        registry.increment_stats_loads();

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["stats_loads"], 1);
        assert_eq!(parsed["offsets_rejected"], 0);
    }
}
