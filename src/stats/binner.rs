//! Binning guideposts against a requested key range
//!
//! Walks the decoded guideposts once and emits one present bin per
//! guidepost from the first one at or after the range's lower bound up to
//! the first one past its upper bound. If the walk ends before the range
//! does, a trailing gap bin covers the remainder.

use std::sync::Arc;

use crate::keys::KeyRange;
use crate::observability::MetricsRegistry;

use super::guideposts::GuidePostsInfo;
use super::summary::{StatisticsBin, StatisticsSummary};

/// Per-range statistics for one table and column family
pub trait ClientStatistics {
    /// False when no guideposts were collected
    fn has_statistics(&self) -> bool;

    fn statistics_bins(&self, range: &KeyRange) -> StatisticsSummary;
}

/// Bins one guidepost snapshot
#[derive(Debug, Clone, Copy)]
pub struct StatisticsBinner<'a> {
    info: &'a GuidePostsInfo,
    metrics: Option<&'a MetricsRegistry>,
}

impl<'a> StatisticsBinner<'a> {
    pub fn new(info: &'a GuidePostsInfo) -> Self {
        Self { info, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: &'a MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn bin(&self, range: &KeyRange) -> StatisticsSummary {
        let mut summary = StatisticsSummary::default();
        if self.info.count() == 0 {
            return summary;
        }

        let mut last_bin_end = range.lower().to_vec();
        let mut found_first = range.lower_unbound();
        let mut timestamps: Option<(i64, i64)> = None;

        let mut decoder = self.info.decoder();
        for guidepost in decoder.by_ref() {
            let ts = guidepost.timestamp;
            timestamps = Some(match timestamps {
                None => (ts, ts),
                Some((min, max)) => (min.min(ts), max.max(ts)),
            });

            if !found_first && range.lower() <= guidepost.key.as_slice() {
                found_first = true;
            }

            if found_first {
                summary.total_rows = summary.total_rows.saturating_add(guidepost.row_count);
                summary.total_bytes = summary.total_bytes.saturating_add(guidepost.byte_count);

                // The first bin inherits the range's lower bound
                let start_inclusive = summary.bins.is_empty() && range.is_lower_inclusive();
                let start = std::mem::replace(&mut last_bin_end, guidepost.key.clone());
                summary.bins.push(StatisticsBin::present(
                    KeyRange::new(start, start_inclusive, guidepost.key.clone(), true),
                    guidepost.row_count,
                    guidepost.byte_count,
                    ts,
                ));
            }

            // A guidepost past the upper bound still covers part of the range
            if !range.upper_unbound() && range.upper() < guidepost.key.as_slice() {
                break;
            }
        }

        if !last_bin_end.is_empty()
            && (range.upper_unbound() || range.upper() > last_bin_end.as_slice())
        {
            let start_inclusive = summary.bins.is_empty() && range.is_lower_inclusive();
            summary.bins.push(StatisticsBin::gap(KeyRange::new(
                last_bin_end,
                start_inclusive,
                range.upper(),
                range.is_upper_inclusive(),
            )));
        }

        if let Some((min, max)) = timestamps {
            summary.min_timestamp = min;
            summary.max_timestamp = max;
        }

        if let Some(metrics) = self.metrics {
            metrics.add_guideposts_decoded(decoder.decoded() as u64);
            if decoder.truncation().is_some() {
                metrics.increment_decode_truncations();
            }
        }

        summary
    }
}

/// [`ClientStatistics`] over a shared guidepost snapshot
#[derive(Debug, Clone)]
pub struct GuidePostStatistics {
    info: Arc<GuidePostsInfo>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl GuidePostStatistics {
    pub fn new(info: Arc<GuidePostsInfo>) -> Self {
        Self { info, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn info(&self) -> &Arc<GuidePostsInfo> {
        &self.info
    }
}

impl ClientStatistics for GuidePostStatistics {
    fn has_statistics(&self) -> bool {
        !self.info.is_sentinel()
    }

    fn statistics_bins(&self, range: &KeyRange) -> StatisticsSummary {
        let binner = StatisticsBinner::new(&self.info);
        match &self.metrics {
            Some(metrics) => binner.with_metrics(metrics).bin(range),
            None => binner.bin(range),
        }
    }
}
