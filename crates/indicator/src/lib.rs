//! Lexibar indicator: the state-coalescing update serializer.
//!
//! Producers push [`lexibar_core::StateSnapshot`]s at whatever rate state
//! changes; the [`Indicator`] guarantees at most one rendering pass in
//! flight per target, drops stale intermediates in favor of the latest
//! snapshot, and commits the derived visual to the host surface with the
//! tooltip rate-limited.

#![forbid(unsafe_code)]

pub mod apply;
pub mod coalescer;
pub mod limiter;

pub use coalescer::{Indicator, IndicatorOptions, DEFAULT_TITLE_MIN_INTERVAL};
pub use limiter::RateLimited;
