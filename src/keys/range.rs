//! Byte-ordered key ranges
//!
//! Keys compare as unsigned bytes, lexicographically. An empty key on
//! either side means that side is unbound; unbound sides are always
//! exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for an unbound range side
pub const UNBOUND: &[u8] = &[];

/// A contiguous range of row keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    #[serde(with = "super::base64_bytes")]
    lower: Vec<u8>,
    lower_inclusive: bool,
    #[serde(with = "super::base64_bytes")]
    upper: Vec<u8>,
    upper_inclusive: bool,
}

impl KeyRange {
    /// Creates a range; unbound sides are normalised to exclusive.
    pub fn new(
        lower: impl Into<Vec<u8>>,
        lower_inclusive: bool,
        upper: impl Into<Vec<u8>>,
        upper_inclusive: bool,
    ) -> Self {
        let lower = lower.into();
        let upper = upper.into();
        Self {
            lower_inclusive: lower_inclusive && !lower.is_empty(),
            upper_inclusive: upper_inclusive && !upper.is_empty(),
            lower,
            upper,
        }
    }

    /// The range covering every key
    pub fn everything() -> Self {
        Self::new(UNBOUND, false, UNBOUND, false)
    }

    /// `[key, key]`
    pub fn point(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        Self::new(key.clone(), true, key, true)
    }

    /// `[prefix, next(prefix))`: every key starting with `prefix`
    pub fn prefix(prefix: impl Into<Vec<u8>>) -> Self {
        let prefix = prefix.into();
        let upper = next_key(&prefix).unwrap_or_default();
        Self::new(prefix, true, upper, false)
    }

    pub fn lower(&self) -> &[u8] {
        &self.lower
    }

    pub fn upper(&self) -> &[u8] {
        &self.upper
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    pub fn lower_unbound(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn upper_unbound(&self) -> bool {
        self.upper.is_empty()
    }

    /// Returns true if exactly one key can match
    pub fn is_point(&self) -> bool {
        !self.lower.is_empty()
            && self.lower == self.upper
            && self.lower_inclusive
            && self.upper_inclusive
    }

    /// Returns true if no key can match
    pub fn is_empty(&self) -> bool {
        if self.lower_unbound() || self.upper_unbound() {
            return false;
        }
        match self.lower.cmp(&self.upper) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => !(self.lower_inclusive && self.upper_inclusive),
            std::cmp::Ordering::Less => false,
        }
    }

    /// Returns true if `key` lies within the range
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_lower = self.lower_unbound()
            || key > self.lower.as_slice()
            || (self.lower_inclusive && key == self.lower.as_slice());
        let below_upper = self.upper_unbound()
            || key < self.upper.as_slice()
            || (self.upper_inclusive && key == self.upper.as_slice());
        above_lower && below_upper
    }
}

/// Smallest key greater than every key prefixed by `key`.
///
/// Returns `None` when no such key exists (empty or all `0xFF`).
pub fn next_key(key: &[u8]) -> Option<Vec<u8>> {
    let mut next = key.to_vec();
    while let Some(last) = next.pop() {
        if last < u8::MAX {
            next.push(last + 1);
            return Some(next);
        }
    }
    None
}

fn write_bound(f: &mut fmt::Formatter<'_>, key: &[u8]) -> fmt::Result {
    if key.is_empty() {
        return write!(f, "*");
    }
    for b in key {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.lower_inclusive { '[' } else { '(' })?;
        write_bound(f, &self.lower)?;
        write!(f, " - ")?;
        write_bound(f, &self.upper)?;
        write!(f, "{}", if self.upper_inclusive { ']' } else { ')' })
    }
}
