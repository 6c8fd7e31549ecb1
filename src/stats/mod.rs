//! Guidepost statistics
//!
//! Guideposts are decoded from a front-coded snapshot and binned against a
//! requested key range to estimate rows, bytes and data age per stretch of
//! the range.

mod binner;
mod codec;
mod decoder;
mod errors;
mod guideposts;
mod loader;
mod source;
mod summary;

pub use binner::{ClientStatistics, GuidePostStatistics, StatisticsBinner};
pub use codec::{read_varint, write_varint, PrefixDecoder, PrefixEncoder};
pub use decoder::{Guidepost, GuidepostDecoder};
pub use errors::{DecodeError, GuidePostsError, StatsError, StatsResult};
pub use guideposts::{GuidePostsInfo, GuidePostsInfoBuilder, GuidePostsKey};
pub use loader::{guideposts_column_family, guideposts_key, StatisticsFactory, StatsLoader, WhereColumn};
pub use source::{DirectoryStatsSource, MemoryStatsSource, StatsFile, StatsSource};
pub use summary::{StatisticsBin, StatisticsSummary};
