//! Scan ranges produced by the key-range optimizer

use super::range::KeyRange;

/// Ordered, non-overlapping key ranges a scan will visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRanges {
    ranges: Vec<KeyRange>,
}

impl ScanRanges {
    /// Full table scan
    pub fn everything() -> Self {
        Self {
            ranges: vec![KeyRange::everything()],
        }
    }

    /// Scan that can match nothing
    pub fn nothing() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn single(range: KeyRange) -> Self {
        if range.is_empty() {
            return Self::nothing();
        }
        Self {
            ranges: vec![range],
        }
    }

    /// Lookup of exactly one key
    pub fn point(key: impl Into<Vec<u8>>) -> Self {
        Self::single(KeyRange::point(key))
    }

    /// Builds from ranges; empty ranges are dropped and the rest sorted by lower bound
    pub fn from_ranges(ranges: impl IntoIterator<Item = KeyRange>) -> Self {
        let mut ranges: Vec<KeyRange> = ranges.into_iter().filter(|r| !r.is_empty()).collect();
        ranges.sort_by(|a, b| a.lower().cmp(b.lower()));
        Self { ranges }
    }

    pub fn ranges(&self) -> &[KeyRange] {
        &self.ranges
    }

    pub fn is_everything(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0] == KeyRange::everything()
    }

    pub fn is_nothing(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Returns true if every range pins a single key
    pub fn is_point_lookup(&self) -> bool {
        !self.ranges.is_empty() && self.ranges.iter().all(KeyRange::is_point)
    }

    /// The key of a lookup that pins exactly one key, if that is what this is
    pub fn point_key(&self) -> Option<&[u8]> {
        match self.ranges.as_slice() {
            [range] if range.is_point() => Some(range.lower()),
            _ => None,
        }
    }

    /// Smallest single range spanning all ranges
    pub fn scan_range(&self) -> Option<KeyRange> {
        let first = self.ranges.first()?;
        let last = self.ranges.last()?;
        Some(KeyRange::new(
            first.lower(),
            first.is_lower_inclusive(),
            last.upper(),
            last.is_upper_inclusive(),
        ))
    }
}
