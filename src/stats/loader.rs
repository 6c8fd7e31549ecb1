//! Loading guideposts for a table
//!
//! Missing statistics never fail planning: every failure falls back to the
//! previously known snapshot (the sentinel on first load).

use std::sync::Arc;

use crate::observability::{Event, Logger, MetricsRegistry};
use crate::table::TableMetadata;

use super::binner::GuidePostStatistics;
use super::errors::StatsResult;
use super::guideposts::{GuidePostsInfo, GuidePostsKey};
use super::source::StatsSource;

/// Loads guidepost snapshots from a source, falling back on failure
#[derive(Debug)]
pub struct StatsLoader<S> {
    source: S,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<S: StatsSource> StatsLoader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Statistics have no refresh cycle; every request reloads
    pub fn needs_load(&self) -> bool {
        true
    }

    /// Reads the snapshot for `key` without any fallback
    pub fn try_load(&self, key: &GuidePostsKey) -> StatsResult<Arc<GuidePostsInfo>> {
        self.source.read_guideposts(key)
    }

    /// Loads `key`, falling back to the sentinel
    pub fn load(&self, key: &GuidePostsKey) -> Arc<GuidePostsInfo> {
        self.load_or(key, GuidePostsInfo::none())
    }

    /// Loads `key`, returning `previous` if the source cannot supply it
    pub fn load_or(&self, key: &GuidePostsKey, previous: Arc<GuidePostsInfo>) -> Arc<GuidePostsInfo> {
        let key_str = key.to_string();
        match self.try_load(key) {
            Ok(info) => {
                if let Some(metrics) = &self.metrics {
                    metrics.increment_stats_loads();
                }
                let size = info.estimated_size().to_string();
                let count = info.count().to_string();
                Logger::trace(
                    Event::StatsLoaded,
                    &[
                        ("key", key_str.as_str()),
                        ("source", self.source.name()),
                        ("guideposts", count.as_str()),
                        ("size_bytes", size.as_str()),
                    ],
                );
                info
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.increment_stats_fallbacks();
                }
                let reason = err.to_string();
                let fields = [
                    ("key", key_str.as_str()),
                    ("source", self.source.name()),
                    ("error", reason.as_str()),
                ];
                // A fresh install has no statistics yet
                if err.is_missing() {
                    Logger::trace(Event::StatsSourceMissing, &fields);
                } else {
                    Logger::warn(Event::StatsUnavailable, &fields);
                }
                previous
            }
        }
    }
}

/// A column referenced by the WHERE clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereColumn {
    /// Column family; `None` for primary-key columns
    pub family: Option<String>,
    pub name: String,
}

impl WhereColumn {
    pub fn key(name: impl Into<String>) -> Self {
        Self {
            family: None,
            name: name.into(),
        }
    }

    pub fn value(family: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            family: Some(family.into()),
            name: name.into(),
        }
    }
}

/// Column family whose guideposts describe a scan filtered on `where_columns`.
///
/// With declared families and family-qualified WHERE columns, the table's
/// empty-value family wins if any WHERE column uses it, otherwise the first
/// WHERE column's family. Everything else uses the empty-value family.
pub fn guideposts_column_family<'a>(table: &'a TableMetadata, where_columns: &'a [WhereColumn]) -> &'a str {
    let default_family = table.empty_column_family();
    let any_family = where_columns.iter().any(|c| c.family.is_some());

    if table.column_families().is_empty() || !any_family {
        return default_family;
    }
    if where_columns
        .iter()
        .any(|c| c.family.as_deref() == Some(default_family))
    {
        return default_family;
    }
    where_columns
        .first()
        .and_then(|c| c.family.as_deref())
        .unwrap_or(default_family)
}

/// Statistics key for a scan of `table` filtered on `where_columns`
pub fn guideposts_key(table: &TableMetadata, where_columns: &[WhereColumn]) -> GuidePostsKey {
    GuidePostsKey::new(
        table.physical_name.clone(),
        guideposts_column_family(table, where_columns),
    )
}

/// Builds [`GuidePostStatistics`] for tables
#[derive(Debug)]
pub struct StatisticsFactory<S> {
    loader: StatsLoader<S>,
    enabled: bool,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<S: StatsSource> StatisticsFactory<S> {
    pub fn new(loader: StatsLoader<S>) -> Self {
        Self {
            loader,
            enabled: true,
            metrics: None,
        }
    }

    /// Disabled factories hand out the sentinel without touching the source
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn loader(&self) -> &StatsLoader<S> {
        &self.loader
    }

    pub fn statistics(&self, table: &TableMetadata, where_columns: &[WhereColumn]) -> GuidePostStatistics {
        let info = if self.enabled && self.loader.needs_load() {
            self.loader.load(&guideposts_key(table, where_columns))
        } else {
            GuidePostsInfo::none()
        };

        let statistics = GuidePostStatistics::new(info);
        match &self.metrics {
            Some(metrics) => statistics.with_metrics(Arc::clone(metrics)),
            None => statistics,
        }
    }
}
