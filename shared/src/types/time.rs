//! Timestamps

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(u64);

impl Time {
    /// Earliest representable time.
    pub const THE_BEGINNING: Time = Time(u64::MIN);

    /// Latest representable time. Open mappings end here.
    pub const THE_END: Time = Time(u64::MAX);

    pub const fn new(nanoseconds: u64) -> Self {
        Self(nanoseconds)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// Read the system clock.
    pub fn now() -> Result<Self> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::system(format!("system clock before UNIX epoch: {}", e)))?;
        Ok(Self(elapsed.as_nanos() as u64))
    }

    pub fn increment(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn decrement(self) -> Self {
        Self(self.0.wrapping_sub(1))
    }

    /// Render as local calendar time, e.g. `2024/03/01 13:45:02`.
    pub fn to_local_string(self) -> Result<String> {
        let secs = i64::try_from(self.0 / 1_000_000_000)
            .map_err(|_| Error::system(format!("time {} out of calendar range", self.0)))?;
        let nanos = (self.0 % 1_000_000_000) as u32;
        let utc = DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| Error::system(format!("time {} out of calendar range", self.0)))?;
        Ok(utc
            .with_timezone(&Local)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string())
    }
}

impl From<u64> for Time {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Time> for u64 {
    fn from(time: Time) -> Self {
        time.0
    }
}

impl Add<u64> for Time {
    type Output = Time;

    fn add(self, rhs: u64) -> Time {
        Time(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Time {
    type Output = Time;

    fn sub(self, rhs: u64) -> Time {
        Time(self.0.wrapping_sub(rhs))
    }
}

impl Sub<Time> for Time {
    type Output = u64;

    fn sub(self, rhs: Time) -> u64 {
        self.0.wrapping_sub(rhs.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_local_string() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "{}ns", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_after_2020() {
        let now = Time::now().unwrap();
        assert!(now.value() > 1_600_000_000 * 1_000_000_000);
    }

    #[test]
    fn test_sentinels() {
        assert!(Time::THE_BEGINNING < Time::THE_END);
        assert_eq!(Time::THE_END.increment(), Time::THE_BEGINNING);
    }

    #[test]
    fn test_difference() {
        assert_eq!(Time::new(30) - Time::new(10), 20);
        assert_eq!(Time::new(10) + 5, Time::new(15));
    }

    #[test]
    fn test_local_string_shape() {
        let s = Time::new(0).to_local_string().unwrap();
        // YYYY/MM/DD HH:MM:SS
        assert_eq!(s.len(), 19);
        assert_eq!(&s[4..5], "/");
    }
}
