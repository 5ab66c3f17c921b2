use super::periodic::rounded_to_millisecond;
use super::PeriodicSamples;
use crate::types::TimeInterval;
use serde::{Deserialize, Serialize};

/// Several counters' series, resampled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicSamplesGroup {
    series: Vec<PeriodicSamples>,
}

impl PeriodicSamplesGroup {
    pub fn new(series: Vec<PeriodicSamples>) -> Self {
        Self { series }
    }

    pub fn push(&mut self, samples: PeriodicSamples) {
        self.series.push(samples);
    }

    pub fn series(&self) -> &[PeriodicSamples] {
        &self.series
    }

    /// Total number of samples across every series.
    pub fn size(&self) -> usize {
        self.series.iter().map(PeriodicSamples::len).sum()
    }

    /// Union of every series' interval.
    pub fn interval(&self) -> TimeInterval {
        self.series
            .iter()
            .fold(TimeInterval::empty(), |acc, s| acc | s.interval())
    }

    /// Mean of the per-series rates, ignoring series too short to have one.
    pub fn rate(&self) -> u64 {
        let rates: Vec<u64> = self
            .series
            .iter()
            .map(PeriodicSamples::rate)
            .filter(|&r| r > 0)
            .collect();
        if rates.is_empty() {
            return 0;
        }
        rates.iter().sum::<u64>() / rates.len() as u64
    }

    /// Resample every series on one grid spanning the whole group.
    pub fn resample(&self, rate: Option<u64>) -> PeriodicSamplesGroup {
        let rate = rate
            .unwrap_or_else(|| rounded_to_millisecond(self.rate()))
            .max(1);
        let interval = self.interval();
        Self {
            series: self
                .series
                .iter()
                .map(|s| s.resample_over(&interval, rate))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::SampleKind;
    use crate::types::Time;

    #[test]
    fn test_common_grid() {
        let mut a = PeriodicSamples::new("a", SampleKind::Count);
        a.add(Time::new(0), 0);
        a.add(Time::new(20), 20);
        let mut b = PeriodicSamples::new("b", SampleKind::Percentage);
        b.add(Time::new(10), 50);
        b.add(Time::new(30), 70);

        let group = PeriodicSamplesGroup::new(vec![a, b]);
        assert_eq!(group.size(), 4);
        assert_eq!(group.rate(), 20);
        assert_eq!(
            group.interval(),
            TimeInterval::new(Time::new(0), Time::new(30))
        );

        let r = group.resample(Some(10));
        assert_eq!(r.series()[0].len(), 4);
        assert_eq!(r.series()[0].get(Time::new(10)), Some(10));
        assert_eq!(r.series()[1].get(Time::new(0)), Some(50));
        assert_eq!(r.series()[1].get(Time::new(20)), Some(60));
    }
}
