//! aeroplan - keyset offsets and guidepost statistics for a SQL planner
//! over an ordered key-value store
//!
//! - `offset`: compiles OFFSET clauses to row skips or keyset anchors
//! - `stats`: decodes guideposts and bins them against key ranges
//! - `table` / `keys`: physical row-key layout and encoding

pub mod config;
pub mod keys;
pub mod observability;
pub mod offset;
pub mod stats;
pub mod table;
