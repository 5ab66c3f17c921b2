//! Memory addresses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A location within a process address space.
///
/// Stepping past either endpoint wraps around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u64);

impl Address {
    pub const MIN: Address = Address(u64::MIN);
    pub const MAX: Address = Address(u64::MAX);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// The next address, wrapping from `MAX` to `MIN`.
    pub fn increment(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// The previous address, wrapping from `MIN` to `MAX`.
    pub fn decrement(self) -> Self {
        Self(self.0.wrapping_sub(1))
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl Add<u64> for Address {
    type Output = Address;

    fn add(self, rhs: u64) -> Address {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address {
    type Output = Address;

    fn sub(self, rhs: u64) -> Address {
        Address(self.0.wrapping_sub(rhs))
    }
}

/// Distance between two addresses.
impl Sub<Address> for Address {
    type Output = u64;

    fn sub(self, rhs: Address) -> u64 {
        self.0.wrapping_sub(rhs.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}
