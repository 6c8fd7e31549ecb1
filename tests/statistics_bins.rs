//! Statistics Binning Tests
//!
//! Guidepost statistics from storage to per-range estimates:
//! - Guideposts over encoded row keys bin against scan ranges
//! - Gaps past the last guidepost are reported as unknown
//! - Truncated snapshots still produce the bins they can
//! - Missing or unreadable statistics fall back to "no statistics"
//! - Column family selection follows the WHERE clause

use std::fs;
use std::sync::Arc;

use aeroplan::config::PlannerConfig;
use aeroplan::keys::{encode_i32_ordered, KeyRange, KeyValue, RowKeyEncoder};
use aeroplan::observability::MetricsRegistry;
use aeroplan::stats::{
    guideposts_column_family, ClientStatistics, DirectoryStatsSource, GuidePostStatistics,
    GuidePostsInfo, GuidePostsKey, MemoryStatsSource, PrefixEncoder, StatisticsFactory,
    StatsFile, StatsLoader, StatsSource, WhereColumn,
};
use aeroplan::table::{ColumnDef, KeyType, PrimaryKeyLayout, TableMetadata};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn orders() -> TableMetadata {
    TableMetadata::new("ORDERS")
        .with_pk(ColumnDef::pk(1, "id", KeyType::Integer))
        .with_value_column(ColumnDef::value(2, "A", "amount", KeyType::Integer))
        .with_value_column(ColumnDef::value(3, "B", "note", KeyType::Varchar))
}

fn key(id: i32) -> Vec<u8> {
    encode_i32_ordered(id).to_vec()
}

/// Guideposts at ids 10, 20, 30; 5 rows and 50 bytes each
fn tens() -> GuidePostsInfo {
    let mut builder = GuidePostsInfo::builder();
    for (id, ts) in [(10, 100), (20, 300), (30, 200)] {
        builder.add_guidepost(&key(id), 5, 50, ts).unwrap();
    }
    builder.build()
}

fn bin(info: GuidePostsInfo, range: &KeyRange) -> aeroplan::stats::StatisticsSummary {
    GuidePostStatistics::new(Arc::new(info)).statistics_bins(range)
}

// =============================================================================
// Binning
// =============================================================================

/// A range ending between guideposts includes the guidepost past its end.
#[test]
fn test_range_ending_between_guideposts() {
    let summary = bin(tens(), &KeyRange::new(key(0), true, key(25), false));

    assert_eq!(summary.bins.len(), 3);
    assert!(summary.bins.iter().all(|b| b.present));
    assert_eq!(summary.total_rows, 15);
    assert_eq!(summary.total_bytes, 150);
    assert_eq!(summary.min_timestamp, 100);
    assert_eq!(summary.max_timestamp, 300);

    let first = &summary.bins[0].range;
    assert_eq!(first.lower(), key(0).as_slice());
    assert!(first.is_lower_inclusive());
    assert_eq!(first.upper(), key(10).as_slice());
    assert!(first.is_upper_inclusive());

    let last = &summary.bins[2].range;
    assert_eq!(last.lower(), key(20).as_slice());
    assert!(!last.is_lower_inclusive());
    assert_eq!(last.upper(), key(30).as_slice());
}

/// A range entirely past the last guidepost is one unknown bin.
#[test]
fn test_range_beyond_guideposts() {
    let range = KeyRange::new(key(40), true, key(50), false);
    let summary = bin(tens(), &range);

    assert_eq!(summary.bins.len(), 1);
    let gap = &summary.bins[0];
    assert!(!gap.present);
    assert_eq!(gap.estimated_rows, 0);
    assert_eq!(gap.range, range);
    assert_eq!(summary.total_rows, 0);
}

/// An unbounded scan covers every guidepost plus a trailing gap.
#[test]
fn test_unbounded_range() {
    let summary = bin(tens(), &KeyRange::everything());

    assert_eq!(summary.present_bins().count(), 3);
    assert!(summary.has_gap());
    let gap = summary.bins.last().unwrap();
    assert_eq!(gap.range.lower(), key(30).as_slice());
    assert!(gap.range.upper_unbound());
    assert_eq!(summary.total_rows, 15);
}

/// A snapshot with no guideposts yields no bins.
#[test]
fn test_empty_snapshot() {
    let summary = bin(GuidePostsInfo::NO_GUIDEPOSTS, &KeyRange::everything());
    assert!(summary.is_empty());
    assert_eq!(summary.total_rows, 0);
    assert_eq!(summary.min_timestamp, 0);
}

/// Bins line up with the keys a point-lookup layout produces.
#[test]
fn test_bins_over_encoded_composite_keys() {
    let table = TableMetadata::new("T")
        .with_pk(ColumnDef::pk(1, "region", KeyType::Varchar))
        .with_pk(ColumnDef::pk(2, "id", KeyType::Integer));
    let layout = PrimaryKeyLayout::derive(&table, None).unwrap();
    let encoder = RowKeyEncoder::new(&layout);

    let mut builder = GuidePostsInfo::builder();
    for (region, id) in [("east", 100), ("east", 900), ("west", 50)] {
        let k = encoder
            .encode(&[KeyValue::Text(region.into()), KeyValue::Int(id)])
            .unwrap();
        builder.add_guidepost(&k, 10, 1000, 1).unwrap();
    }
    let info = builder.build();

    let east = encoder.encode_prefix(&[KeyValue::Text("east".into())]).unwrap();
    let summary = bin(info, &KeyRange::prefix(east));

    // Both "east" guideposts plus the first "west" one bounding the range
    assert_eq!(summary.present_bins().count(), 3);
    assert!(!summary.has_gap());
    assert_eq!(summary.total_rows, 30);
}

/// A short key stream yields the guideposts before the break, then a gap.
#[test]
fn test_truncated_snapshot() {
    let mut encoder = PrefixEncoder::new();
    encoder.encode(&key(10));
    encoder.encode(&key(20));
    let max_key_length = encoder.max_key_length();
    let info = GuidePostsInfo::new(
        encoder.finish(),
        max_key_length,
        3,
        vec![5, 5, 5],
        vec![50, 50, 50],
        vec![1, 2, 3],
    )
    .unwrap();

    let mut decoder = info.decoder();
    assert_eq!(decoder.by_ref().count(), 2);
    assert!(decoder.truncation().is_some());

    let metrics = Arc::new(MetricsRegistry::new());
    let summary = GuidePostStatistics::new(Arc::new(info))
        .with_metrics(Arc::clone(&metrics))
        .statistics_bins(&KeyRange::new(key(0), true, key(40), false));

    assert_eq!(summary.present_bins().count(), 2);
    assert!(summary.has_gap());
    assert_eq!(summary.total_rows, 10);
    assert_eq!(summary.max_timestamp, 2);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.guideposts_decoded, 2);
    assert_eq!(snapshot.decode_truncations, 1);
}

// =============================================================================
// Column Family Selection
// =============================================================================

/// The empty-value family wins over other families in the WHERE clause.
#[test]
fn test_column_family_selection() {
    let table = orders();

    assert_eq!(guideposts_column_family(&table, &[]), "0");
    assert_eq!(guideposts_column_family(&table, &[WhereColumn::key("id")]), "0");
    assert_eq!(
        guideposts_column_family(&table, &[WhereColumn::value("B", "note")]),
        "B"
    );
    assert_eq!(
        guideposts_column_family(
            &table,
            &[WhereColumn::value("B", "note"), WhereColumn::value("A", "amount")]
        ),
        "B"
    );

    let with_default = orders().with_default_family("A");
    assert_eq!(
        guideposts_column_family(
            &with_default,
            &[WhereColumn::value("B", "note"), WhereColumn::value("A", "amount")]
        ),
        "A"
    );
}

/// Tables without declared families always use the empty-value family.
#[test]
fn test_column_family_without_declared_families() {
    let table = TableMetadata::new("PLAIN").with_pk(ColumnDef::pk(1, "id", KeyType::Integer));
    assert_eq!(
        guideposts_column_family(&table, &[WhereColumn::value("X", "y")]),
        "0"
    );
}

// =============================================================================
// Loading and Fallback
// =============================================================================

/// Statistics written to a directory are read back per column family.
#[test]
fn test_directory_source_round_trip() {
    let dir = TempDir::new().unwrap();
    let source = DirectoryStatsSource::new(dir.path());
    source.write(&GuidePostsKey::new("ORDERS", "B"), &tens()).unwrap();

    let metrics = Arc::new(MetricsRegistry::new());
    let factory = StatisticsFactory::new(
        StatsLoader::new(source).with_metrics(Arc::clone(&metrics)),
    );

    let stats = factory.statistics(&orders(), &[WhereColumn::value("B", "note")]);
    assert!(stats.has_statistics());
    assert_eq!(stats.info().count(), 3);
    assert_eq!(factory.loader().source().handles_opened(), 1);

    // Family "0" was never written
    let fallback = factory.statistics(&orders(), &[WhereColumn::key("id")]);
    assert!(!fallback.has_statistics());
    assert!(fallback.statistics_bins(&KeyRange::everything()).is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.stats_loads, 1);
    assert_eq!(snapshot.stats_fallbacks, 1);
}

/// A missing statistics directory is "no statistics", not an error.
#[test]
fn test_missing_directory_falls_back() {
    let dir = TempDir::new().unwrap();
    let source = DirectoryStatsSource::new(dir.path().join("absent"));
    let key = GuidePostsKey::new("ORDERS", "0");

    assert!(source.read_guideposts(&key).unwrap_err().is_missing());

    let loader = StatsLoader::new(source);
    assert!(loader.load(&key).is_sentinel());
    assert_eq!(loader.source().handles_opened(), 0);
}

/// A corrupt file keeps the previous snapshot.
#[test]
fn test_corrupt_file_keeps_previous() {
    let dir = TempDir::new().unwrap();
    let source = DirectoryStatsSource::new(dir.path());
    let key = GuidePostsKey::new("ORDERS", "0");
    let path = source.path_for(&key).unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();

    let err = source.read_guideposts(&key).unwrap_err();
    assert!(!err.is_missing());

    let previous = Arc::new(tens());
    let loaded = StatsLoader::new(source).load_or(&key, Arc::clone(&previous));
    assert!(Arc::ptr_eq(&loaded, &previous));
}

/// A damaged maximum key length never reaches the decoder.
#[test]
fn test_bad_max_key_length_falls_back() {
    let dir = TempDir::new().unwrap();
    let source = DirectoryStatsSource::new(dir.path());
    let key = GuidePostsKey::new("ORDERS", "0");
    let path = source.path_for(&key).unwrap();
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let mut stale = StatsFile::from_info(&tens());
    stale.max_key_length = usize::MAX;
    let mut resealed = stale.clone();
    resealed.checksum = resealed.compute_checksum();

    let loader = StatsLoader::new(source);
    for file in [stale, resealed] {
        fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

        let info = loader.load(&key);
        assert!(info.is_sentinel());

        let summary = GuidePostStatistics::new(info).statistics_bins(&KeyRange::everything());
        assert!(summary.is_empty());
    }
}

/// Row and byte totals saturate instead of overflowing.
#[test]
fn test_huge_counts_saturate() {
    let mut builder = GuidePostsInfo::builder();
    builder.add_guidepost(&key(10), u64::MAX, u64::MAX, 1).unwrap();
    builder.add_guidepost(&key(20), 1, 1, 2).unwrap();
    let info = builder.build();
    assert_eq!(info.total_rows(), u64::MAX);

    let summary = bin(info, &KeyRange::everything());
    assert_eq!(summary.total_rows, u64::MAX);
    assert_eq!(summary.total_bytes, u64::MAX);
}

/// The memory source hands every reader the same snapshot.
#[test]
fn test_memory_source_shared_snapshot() {
    let source = MemoryStatsSource::new();
    source.insert(GuidePostsKey::new("ORDERS", "0"), tens()).unwrap();
    let factory = StatisticsFactory::new(StatsLoader::new(source));

    let a = factory.statistics(&orders(), &[]);
    let b = factory.statistics(&orders(), &[WhereColumn::key("id")]);
    assert!(Arc::ptr_eq(a.info(), b.info()));
}

// =============================================================================
// Configuration
// =============================================================================

/// A config file wires up the directory source.
#[test]
fn test_config_driven_factory() {
    let dir = TempDir::new().unwrap();
    let stats_dir = dir.path().join("stats");
    DirectoryStatsSource::new(&stats_dir)
        .write(&GuidePostsKey::new("ORDERS", "0"), &tens())
        .unwrap();

    let config_path = dir.path().join("planner.json");
    let config_json = serde_json::json!({
        "stats": { "directory": stats_dir },
        "logging": { "min_severity": "ERROR" }
    });
    fs::write(&config_path, config_json.to_string()).unwrap();

    let config = PlannerConfig::load(&config_path).unwrap();
    let factory = config.statistics_factory().unwrap();
    let summary = factory
        .statistics(&orders(), &[])
        .statistics_bins(&KeyRange::new(key(0), true, key(25), false));
    assert_eq!(summary.total_rows, 15);
}

/// A disabled config hands out no statistics without reading anything.
#[test]
fn test_config_disabled_stats() {
    let dir = TempDir::new().unwrap();
    let config = PlannerConfig::from_json(&format!(
        r#"{{"stats": {{"enabled": false, "directory": {}}}}}"#,
        serde_json::to_string(dir.path()).unwrap()
    ))
    .unwrap();

    let factory = config.statistics_factory().unwrap();
    assert!(!factory.statistics(&orders(), &[]).has_statistics());
    assert_eq!(factory.loader().source().handles_opened(), 0);

    assert!(PlannerConfig::default().statistics_factory().is_none());
}
