//! Observable planner events
//!
//! Events are explicit and typed; the logger only accepts these.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Offset compilation
    /// OFFSET clause compiled to a row skip or keyset anchor
    OffsetCompiled,
    /// OFFSET clause rejected
    OffsetRejected,
    /// Optimizer output had an unexpected shape
    OffsetUnexpectedShape,

    // Statistics
    /// Guideposts loaded from a statistics source
    StatsLoaded,
    /// Statistics source or table missing; previous statistics kept
    StatsSourceMissing,
    /// Statistics could not be read; previous statistics kept
    StatsUnavailable,
    /// A statistics source handle was opened
    StatsSourceOpened,
    /// Guidepost stream ended before all guideposts were decoded
    GuidepostDecodeTruncated,

    // Configuration
    /// Planner configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::OffsetCompiled => "OFFSET_COMPILED",
            Event::OffsetRejected => "OFFSET_REJECTED",
            Event::OffsetUnexpectedShape => "OFFSET_UNEXPECTED_SHAPE",

            Event::StatsLoaded => "STATS_LOADED",
            Event::StatsSourceMissing => "STATS_SOURCE_MISSING",
            Event::StatsUnavailable => "STATS_UNAVAILABLE",
            Event::StatsSourceOpened => "STATS_SOURCE_OPENED",
            Event::GuidepostDecodeTruncated => "GUIDEPOST_DECODE_TRUNCATED",

            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if the event means planning continued on degraded input
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Event::StatsSourceMissing | Event::StatsUnavailable | Event::GuidepostDecodeTruncated
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
