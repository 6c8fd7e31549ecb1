//! Statistics sources
//!
//! - [`MemoryStatsSource`]: one long-lived shared handle
//! - [`DirectoryStatsSource`]: one file per (table, family), opened per read
//!
//! Directory layout:
//!
//! ```text
//! <root>/<physical table>/<column family>.json
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::observability::{Event, Logger, MetricsRegistry};

use super::errors::{StatsError, StatsResult};
use super::guideposts::{GuidePostsInfo, GuidePostsKey};

/// Supplies guidepost snapshots by key
pub trait StatsSource: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    fn read_guideposts(&self, key: &GuidePostsKey) -> StatsResult<Arc<GuidePostsInfo>>;
}

/// In-memory source shared by every reader
#[derive(Debug, Default)]
pub struct MemoryStatsSource {
    tables: RwLock<HashMap<GuidePostsKey, Arc<GuidePostsInfo>>>,
}

impl MemoryStatsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores (or replaces) the snapshot for `key`
    pub fn insert(&self, key: GuidePostsKey, info: GuidePostsInfo) -> StatsResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StatsError::SourceUnavailable("memory source lock poisoned".into()))?;
        tables.insert(key, Arc::new(info));
        Ok(())
    }

    pub fn remove(&self, key: &GuidePostsKey) -> StatsResult<bool> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StatsError::SourceUnavailable("memory source lock poisoned".into()))?;
        Ok(tables.remove(key).is_some())
    }
}

impl StatsSource for MemoryStatsSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn read_guideposts(&self, key: &GuidePostsKey) -> StatsResult<Arc<GuidePostsInfo>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StatsError::SourceUnavailable("memory source lock poisoned".into()))?;
        tables
            .get(key)
            .cloned()
            .ok_or_else(|| StatsError::TableNotFound(key.to_string()))
    }
}

/// On-disk statistics file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFile {
    #[serde(with = "crate::keys::base64_bytes")]
    pub encoded_keys: Vec<u8>,
    pub max_key_length: usize,
    pub count: usize,
    pub row_counts: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub timestamps: Vec<i64>,
    /// CRC32 over every other field, see [`StatsFile::compute_checksum`]
    pub checksum: u32,
}

impl StatsFile {
    pub fn from_info(info: &GuidePostsInfo) -> Self {
        let mut file = Self {
            encoded_keys: info.encoded_keys().to_vec(),
            max_key_length: info.max_key_length(),
            count: info.count(),
            row_counts: info.row_counts().to_vec(),
            byte_counts: info.byte_counts().to_vec(),
            timestamps: info.timestamps().to_vec(),
            checksum: 0,
        };
        file.checksum = file.compute_checksum();
        file
    }

    /// CRC32 of the keys, lengths and all three per-guidepost arrays.
    ///
    /// Integers are hashed as little-endian 64-bit values.
    pub fn compute_checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(self.encoded_keys.len() as u64).to_le_bytes());
        hasher.update(&self.encoded_keys);
        hasher.update(&(self.max_key_length as u64).to_le_bytes());
        hasher.update(&(self.count as u64).to_le_bytes());
        for array in [&self.row_counts, &self.byte_counts] {
            hasher.update(&(array.len() as u64).to_le_bytes());
            for value in array.iter() {
                hasher.update(&value.to_le_bytes());
            }
        }
        hasher.update(&(self.timestamps.len() as u64).to_le_bytes());
        for value in &self.timestamps {
            hasher.update(&value.to_le_bytes());
        }
        hasher.finalize()
    }

    /// Verifies the checksum and rebuilds the snapshot
    pub fn into_info(self, key: &GuidePostsKey) -> StatsResult<GuidePostsInfo> {
        let actual = self.compute_checksum();
        if actual != self.checksum {
            return Err(StatsError::Corrupt {
                key: key.to_string(),
                reason: format!(
                    "checksum mismatch: expected {:08x}, got {:08x}",
                    self.checksum, actual
                ),
            });
        }
        Ok(GuidePostsInfo::new(
            self.encoded_keys,
            self.max_key_length,
            self.count,
            self.row_counts,
            self.byte_counts,
            self.timestamps,
        )?)
    }
}

/// Directory of statistics files; every read opens a fresh handle
#[derive(Debug)]
pub struct DirectoryStatsSource {
    root: PathBuf,
    opened: AtomicU64,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl DirectoryStatsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of file handles opened so far
    pub fn handles_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Path of the statistics file for `key`
    pub fn path_for(&self, key: &GuidePostsKey) -> StatsResult<PathBuf> {
        for component in [&key.physical_name, &key.column_family] {
            let valid = !component.is_empty()
                && component != "."
                && component != ".."
                && !component.contains(['/', '\\']);
            if !valid {
                return Err(StatsError::InvalidKey(key.to_string()));
            }
        }
        Ok(self
            .root
            .join(&key.physical_name)
            .join(format!("{}.json", key.column_family)))
    }

    /// Writes the snapshot for `key`, replacing any previous file
    pub fn write(&self, key: &GuidePostsKey, info: &GuidePostsInfo) -> StatsResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&StatsFile::from_info(info)).map_err(|e| {
            StatsError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

impl StatsSource for DirectoryStatsSource {
    fn name(&self) -> &str {
        "directory"
    }

    fn read_guideposts(&self, key: &GuidePostsKey) -> StatsResult<Arc<GuidePostsInfo>> {
        if !self.root.is_dir() {
            return Err(StatsError::SourceUnavailable(self.root.display().to_string()));
        }
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Err(StatsError::TableNotFound(key.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.increment_source_handles();
        }
        let path_str = path.display().to_string();
        Logger::trace(Event::StatsSourceOpened, &[("path", path_str.as_str())]);

        let file: StatsFile = serde_json::from_str(&content).map_err(|e| StatsError::Corrupt {
            key: key.to_string(),
            reason: format!("Invalid JSON: {}", e),
        })?;

        Ok(Arc::new(file.into_info(key)?))
    }
}
