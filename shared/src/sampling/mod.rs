//! Sample containers for hardware-counter data
//!
//! [`OverflowSamples`] count events per program counter, [`PeriodicSamples`]
//! hold one counter's time series and [`PeriodicSamplesGroup`] lines several
//! series up on a common sampling rate.

mod group;
mod overflow;
mod periodic;

pub use group::PeriodicSamplesGroup;
pub use overflow::OverflowSamples;
pub use periodic::{PeriodicSamples, SampleKind};

/// Nanoseconds per millisecond, the granularity of default sampling rates.
pub const NANOSECONDS_PER_MILLISECOND: u64 = 1_000_000;
