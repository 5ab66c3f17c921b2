//! Closed intervals over addresses and times

use super::{Address, Time};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr};

/// Values that can bound an [`Interval`].
pub trait Bound: Copy + Ord + fmt::Display {
    fn to_raw(self) -> u64;
    fn from_raw(raw: u64) -> Self;
}

impl Bound for Address {
    fn to_raw(self) -> u64 {
        self.value()
    }

    fn from_raw(raw: u64) -> Self {
        Address::new(raw)
    }
}

impl Bound for Time {
    fn to_raw(self) -> u64 {
        self.value()
    }

    fn from_raw(raw: u64) -> Self {
        Time::new(raw)
    }
}

/// A closed `[begin, end]` interval. Empty iff `end < begin`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Interval<T> {
    begin: T,
    end: T,
}

pub type AddressRange = Interval<Address>;
pub type TimeInterval = Interval<Time>;

impl<T: Bound> Interval<T> {
    pub fn new(begin: T, end: T) -> Self {
        Self { begin, end }
    }

    /// The single-point interval `[value, value]`.
    pub fn point(value: T) -> Self {
        Self {
            begin: value,
            end: value,
        }
    }

    /// The canonical empty interval.
    pub fn empty() -> Self {
        Self {
            begin: T::from_raw(u64::MAX),
            end: T::from_raw(u64::MIN),
        }
    }

    /// The interval covering every representable value.
    pub fn full() -> Self {
        Self {
            begin: T::from_raw(u64::MIN),
            end: T::from_raw(u64::MAX),
        }
    }

    pub fn begin(&self) -> T {
        self.begin
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.begin
    }

    /// Number of values in the interval, saturating at `u64::MAX` for the
    /// full range.
    pub fn width(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.end.to_raw() - self.begin.to_raw()).saturating_add(1)
        }
    }

    pub fn contains(&self, value: T) -> bool {
        !self.is_empty() && self.begin <= value && value <= self.end
    }

    pub fn contains_interval(&self, other: &Self) -> bool {
        if other.is_empty() {
            return true;
        }
        self.contains(other.begin) && self.contains(other.end)
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !(*self & *other).is_empty()
    }

    /// Half-open wire form `(begin, end + 1)`.
    pub fn to_half_open(&self) -> (u64, u64) {
        (self.begin.to_raw(), self.end.to_raw().wrapping_add(1))
    }

    /// Inverse of [`Interval::to_half_open`].
    pub fn from_half_open(begin: u64, end: u64) -> Self {
        Self {
            begin: T::from_raw(begin),
            end: T::from_raw(end.wrapping_sub(1)),
        }
    }
}

/// Smallest interval containing both operands.
impl<T: Bound> BitOr for Interval<T> {
    type Output = Interval<T>;

    fn bitor(self, rhs: Self) -> Self {
        if self.is_empty() {
            return rhs;
        }
        if rhs.is_empty() {
            return self;
        }
        Interval::new(self.begin.min(rhs.begin), self.end.max(rhs.end))
    }
}

impl<T: Bound> BitAnd for Interval<T> {
    type Output = Interval<T>;

    fn bitand(self, rhs: Self) -> Self {
        if self.is_empty() || rhs.is_empty() {
            return Interval::empty();
        }
        let result = Interval::new(self.begin.max(rhs.begin), self.end.min(rhs.end));
        if result.is_empty() {
            Interval::empty()
        } else {
            result
        }
    }
}

impl<T: Bound> PartialEq for Interval<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => true,
            (false, false) => self.begin == other.begin && self.end == other.end,
            _ => false,
        }
    }
}

impl<T: Bound> Eq for Interval<T> {}

impl<T: Bound> Hash for Interval<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.is_empty() {
            0u8.hash(state);
        } else {
            1u8.hash(state);
            self.begin.to_raw().hash(state);
            self.end.to_raw().hash(state);
        }
    }
}

/// Lexicographic on `(begin, end)`; every empty interval sorts first.
impl<T: Bound> Ord for Interval<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .begin
                .cmp(&other.begin)
                .then_with(|| self.end.cmp(&other.end)),
        }
    }
}

impl<T: Bound> PartialOrd for Interval<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Bound> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}, {}]", self.begin, self.end)
        }
    }
}

/// Key wrapper under which overlapping intervals compare equal.
///
/// An ordered map keyed by disjoint intervals can then be queried with
/// `ByOverlap(Interval::point(x))` to find the interval containing `x`.
#[derive(Debug, Clone, Copy)]
pub struct ByOverlap<T>(pub Interval<T>);

impl<T: Bound> Ord for ByOverlap<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0.end < other.0.begin {
            Ordering::Less
        } else if other.0.end < self.0.begin {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl<T: Bound> PartialOrd for ByOverlap<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Bound> PartialEq for ByOverlap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Bound> Eq for ByOverlap<T> {}
