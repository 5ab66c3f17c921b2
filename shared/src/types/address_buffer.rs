//! Observed-address counts

use super::{Address, AddressSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of times each program counter was observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBuffer {
    addresses: BTreeMap<Address, u64>,
}

impl AddressBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more observation of `address`.
    pub fn update_address_counts(&mut self, address: Address) {
        *self.addresses.entry(address).or_insert(0) += 1;
    }

    pub fn add(&mut self, address: Address, count: u64) {
        *self.addresses.entry(address).or_insert(0) += count;
    }

    /// Fold another buffer's counts into this one.
    pub fn merge(&mut self, other: &AddressBuffer) {
        for (&address, &count) in &other.addresses {
            self.add(address, count);
        }
    }

    pub fn count(&self, address: Address) -> u64 {
        self.addresses.get(&address).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.addresses.values().sum()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Address, u64)> + '_ {
        self.addresses.iter().map(|(&a, &c)| (a, c))
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    pub fn to_address_set(&self) -> AddressSet {
        AddressSet::from_addresses(self.addresses.keys().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_total() {
        let mut buffer = AddressBuffer::new();
        buffer.update_address_counts(Address::new(0x10));
        buffer.update_address_counts(Address::new(0x10));
        buffer.update_address_counts(Address::new(0x20));
        assert_eq!(buffer.count(Address::new(0x10)), 2);
        assert_eq!(buffer.total(), 3);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_merge() {
        let mut a = AddressBuffer::new();
        a.add(Address::new(1), 4);
        let mut b = AddressBuffer::new();
        b.add(Address::new(1), 1);
        b.add(Address::new(2), 2);
        a.merge(&b);
        assert_eq!(a.count(Address::new(1)), 5);
        assert_eq!(a.total(), 7);
        assert!(a.to_address_set().contains(Address::new(2)));
    }
}
