use crate::types::{Address, AddressRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-address event counts for one hardware counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowSamples {
    name: String,
    counts: BTreeMap<Address, u64>,
}

impl OverflowSamples {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: BTreeMap::new(),
        }
    }

    /// Counter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, address: Address, value: u64) {
        *self.counts.entry(address).or_insert(0) += value;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Sum of counts over every address.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Smallest range enclosing every sampled address; empty when no
    /// samples exist.
    pub fn range(&self) -> AddressRange {
        match (self.counts.keys().next(), self.counts.keys().next_back()) {
            (Some(&first), Some(&last)) => AddressRange::new(first, last),
            _ => AddressRange::empty(),
        }
    }

    /// Visit samples inside `range` in address order.
    pub fn visit<F>(&self, range: &AddressRange, mut visitor: F)
    where
        F: FnMut(Address, u64) -> bool,
    {
        if range.is_empty() {
            return;
        }
        for (&address, &count) in self.counts.range(range.begin()..=range.end()) {
            if !visitor(address, count) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_visit() {
        let mut samples = OverflowSamples::new("inst_executed");
        assert!(samples.range().is_empty());

        samples.add(Address::new(0x30), 2);
        samples.add(Address::new(0x10), 1);
        samples.add(Address::new(0x20), 5);
        samples.add(Address::new(0x20), 1);
        assert_eq!(
            samples.range(),
            AddressRange::new(Address::new(0x10), Address::new(0x30))
        );
        assert_eq!(samples.total(), 9);

        let mut seen = Vec::new();
        samples.visit(
            &AddressRange::new(Address::new(0x11), Address::new(0x30)),
            |a, c| {
                seen.push((a.value(), c));
                true
            },
        );
        assert_eq!(seen, vec![(0x20, 6), (0x30, 2)]);
    }
}
