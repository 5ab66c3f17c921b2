use super::NANOSECONDS_PER_MILLISECOND;
use crate::types::{Time, TimeInterval};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a counter's values are meant to be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleKind {
    /// Monotonic event count.
    #[default]
    Count,
    Percentage,
    Rate,
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleKind::Count => "count",
            SampleKind::Percentage => "percentage",
            SampleKind::Rate => "rate",
        })
    }
}

/// Time series of one counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicSamples {
    name: String,
    kind: SampleKind,
    samples: BTreeMap<Time, u64>,
}

impl PeriodicSamples {
    pub fn new(name: impl Into<String>, kind: SampleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            samples: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Record a sample, replacing any earlier sample at the same time.
    pub fn add(&mut self, time: Time, value: u64) {
        self.samples.insert(time, value);
    }

    pub fn get(&self, time: Time) -> Option<u64> {
        self.samples.get(&time).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, u64)> + '_ {
        self.samples.iter().map(|(&t, &v)| (t, v))
    }

    /// Smallest interval enclosing every sample time.
    pub fn interval(&self) -> TimeInterval {
        match (
            self.samples.keys().next(),
            self.samples.keys().next_back(),
        ) {
            (Some(&first), Some(&last)) => TimeInterval::new(first, last),
            _ => TimeInterval::empty(),
        }
    }

    /// Mean time between consecutive samples, in nanoseconds. Zero with
    /// fewer than two samples.
    pub fn rate(&self) -> u64 {
        if self.samples.len() < 2 {
            return 0;
        }
        let interval = self.interval();
        (interval.end() - interval.begin()) / (self.samples.len() as u64 - 1)
    }

    /// Average rate rounded to the nearest millisecond, never below one.
    pub fn default_rate(&self) -> u64 {
        rounded_to_millisecond(self.rate())
    }

    /// Value at `time`, linearly interpolated between the nearest samples
    /// on either side. Outside the sampled interval the nearest edge sample
    /// is used.
    pub fn value_at(&self, time: Time) -> Option<u64> {
        let before = self.samples.range(..=time).next_back();
        let after = self.samples.range(time..).next();
        match (before, after) {
            (Some((&t0, &v0)), Some((&t1, &v1))) => Some(interpolate(t0, v0, t1, v1, time)),
            (Some((_, &v)), None) | (None, Some((_, &v))) => Some(v),
            (None, None) => None,
        }
    }

    /// Resample on a regular grid starting at the first sample. `None` uses
    /// [`default_rate`](Self::default_rate).
    pub fn resample(&self, rate: Option<u64>) -> PeriodicSamples {
        let rate = rate.unwrap_or_else(|| self.default_rate()).max(1);
        self.resample_over(&self.interval(), rate)
    }

    pub(crate) fn resample_over(&self, interval: &TimeInterval, rate: u64) -> PeriodicSamples {
        let mut resampled = PeriodicSamples::new(self.name.clone(), self.kind);
        if interval.is_empty() {
            return resampled;
        }

        let mut time = interval.begin();
        loop {
            if let Some(value) = self.value_at(time) {
                resampled.add(time, value);
            }
            match time.value().checked_add(rate) {
                Some(next) if next <= interval.end().value() => time = Time::new(next),
                _ => break,
            }
        }
        resampled
    }
}

pub(crate) fn rounded_to_millisecond(nanoseconds: u64) -> u64 {
    let half = NANOSECONDS_PER_MILLISECOND / 2;
    let rounded = nanoseconds.saturating_add(half) / NANOSECONDS_PER_MILLISECOND
        * NANOSECONDS_PER_MILLISECOND;
    rounded.max(NANOSECONDS_PER_MILLISECOND)
}

fn interpolate(t0: Time, v0: u64, t1: Time, v1: u64, time: Time) -> u64 {
    if t0 == t1 {
        return v0;
    }
    let span = (t1 - t0) as f64;
    let offset = (time - t0) as f64;
    let value = v0 as f64 + (v1 as f64 - v0 as f64) * offset / span;
    value.round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(u64, u64)]) -> PeriodicSamples {
        let mut samples = PeriodicSamples::new("PAPI_TOT_CYC", SampleKind::Count);
        for &(t, v) in points {
            samples.add(Time::new(t), v);
        }
        samples
    }

    #[test]
    fn test_rate_uses_sample_gaps() {
        let s = series(&[(0, 1), (10, 2), (20, 3), (30, 4)]);
        assert_eq!(s.rate(), 10);
        assert_eq!(series(&[(5, 1)]).rate(), 0);
        assert_eq!(
            s.interval(),
            TimeInterval::new(Time::new(0), Time::new(30))
        );
    }

    #[test]
    fn test_resample_at_native_rate_is_identity() {
        let s = series(&[(0, 100), (10, 250), (20, 300), (30, 420)]);
        assert_eq!(s.resample(Some(10)), s);
    }

    #[test]
    fn test_resample_coarser() {
        let s = series(&[(0, 100), (10, 250), (20, 300), (30, 420)]);
        let r = s.resample(Some(20));
        assert_eq!(
            r.iter().collect::<Vec<_>>(),
            vec![(Time::new(0), 100), (Time::new(20), 300)]
        );
    }

    #[test]
    fn test_resample_interpolates() {
        let s = series(&[(0, 0), (10, 100)]);
        let r = s.resample(Some(5));
        assert_eq!(r.get(Time::new(5)), Some(50));
    }

    #[test]
    fn test_default_rate_rounds_to_milliseconds() {
        let s = series(&[(0, 0), (1_600_000, 1), (3_200_000, 2)]);
        assert_eq!(s.default_rate(), 2_000_000);
        assert_eq!(series(&[(0, 0), (10, 1)]).default_rate(), 1_000_000);
    }
}
