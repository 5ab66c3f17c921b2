//! Time-related utilities

use crate::types::Time;
use std::time::Duration;

/// Nanoseconds between two times, as a [`Duration`]. Zero if `end`
/// precedes `begin`.
pub fn elapsed(begin: Time, end: Time) -> Duration {
    Duration::from_nanos(end.value().saturating_sub(begin.value()))
}
