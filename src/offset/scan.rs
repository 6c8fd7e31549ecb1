//! Applying a compiled offset to an ordered scan

use std::collections::BTreeMap;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use super::compiler::OffsetSpec;

/// Whether a keyset scan returns the anchor row itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Start at the anchor
    #[default]
    Inclusive,
    /// Start after the anchor
    Exclusive,
}

/// Rows an ordered scan over `rows` produces under `offset`, in key order.
pub fn scan_rows<'a, V>(
    rows: &'a BTreeMap<Vec<u8>, V>,
    offset: &OffsetSpec,
    resume: ResumeMode,
    limit: Option<usize>,
) -> Vec<(&'a [u8], &'a V)> {
    let limit = limit.unwrap_or(usize::MAX);

    match offset {
        OffsetSpec::None => rows
            .iter()
            .take(limit)
            .map(|(k, v)| (k.as_slice(), v))
            .collect(),
        OffsetSpec::RowSkip(count) => rows
            .iter()
            .skip(*count as usize)
            .take(limit)
            .map(|(k, v)| (k.as_slice(), v))
            .collect(),
        OffsetSpec::KeysetAnchor(anchor) => {
            let lower = match resume {
                ResumeMode::Inclusive => Bound::Included(anchor.as_slice()),
                ResumeMode::Exclusive => Bound::Excluded(anchor.as_slice()),
            };
            rows.range::<[u8], _>((lower, Bound::Unbounded))
                .take(limit)
                .map(|(k, v)| (k.as_slice(), v))
                .collect()
        }
    }
}
