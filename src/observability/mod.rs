//! Observability for the planner
//!
//! - Structured logging (JSON lines)
//! - Typed planner events
//! - Monotonic counters
//!
//! Observability is read-only: nothing here changes a planning result.
//!
//! # Usage
//!
//! ```ignore
//! use aeroplan::observability::{Event, Logger, MetricsRegistry};
//!
//! Logger::info(Event::OffsetCompiled, &[("table", "T"), ("kind", "KEYSET_ANCHOR")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_keyset_anchors();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

#[cfg(test)]
pub(crate) use logger::capture_log;
