//! Non-contiguous address sets stored as partitioned bitmaps
//!
//! The set is kept as a sequence of [`AddressBitmap`]s. Whenever addresses
//! are added the representation is re-partitioned: a bitmap is split at its
//! widest run of absent addresses whenever that run costs more bits than the
//! wire header of a second bitmap would.
//!
//! Complement is taken over the whole address space. A complemented set keeps
//! the bitmaps of the addresses it lacks and a flag, so every operation only
//! ever materializes bits for addresses some operand named explicitly.

use super::{Address, AddressBitmap, AddressRange, MAX_BITMAP_WIDTH};
use crate::error::{Error, Result};
use crate::protocol::wire::BitmapRecord;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::VecDeque;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not, Sub};

/// Wire cost, in bits, of starting a new bitmap: a half-open range of two
/// `u64` plus at least one data byte.
pub const PARTITIONING_THRESHOLD: u64 = 8 * (2 * std::mem::size_of::<u64>() as u64 + 1);

/// A set of addresses.
///
/// Equality is extensional: two sets are equal iff they hold the same
/// addresses, regardless of how their bitmaps are laid out.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Vec<BitmapRecord>")]
pub struct AddressSet {
    bitmaps: Vec<AddressBitmap>,
    complemented: bool,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ranges wider than [`MAX_BITMAP_WIDTH`] are refused.
    pub fn from_ranges(ranges: impl IntoIterator<Item = AddressRange>) -> Result<Self> {
        let ranges = checked(ranges)?;
        Ok(Self::from_parts(normalize(ranges), false))
    }

    pub fn from_addresses(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self::from_parts(
            normalize(addresses.into_iter().map(AddressRange::point).collect()),
            false,
        )
    }

    fn from_parts(stored: Vec<AddressRange>, complemented: bool) -> Self {
        Self {
            bitmaps: partition(stored),
            complemented,
        }
    }

    /// Stored bitmaps. For a complemented set these hold the addresses the
    /// set lacks.
    pub fn bitmaps(&self) -> &[AddressBitmap] {
        &self.bitmaps
    }

    pub fn is_complemented(&self) -> bool {
        self.complemented
    }

    pub fn is_empty(&self) -> bool {
        self.ranges().is_empty()
    }

    /// Number of addresses in the set, saturating at `u64::MAX`.
    pub fn len(&self) -> u64 {
        let stored: u64 = self.bitmaps.iter().map(AddressBitmap::count).sum();
        match (self.complemented, stored) {
            (false, n) => n,
            (true, 0) => u64::MAX,
            (true, n) => u64::MAX - (n - 1),
        }
    }

    pub fn contains(&self, address: Address) -> bool {
        let stored = self
            .bitmaps
            .iter()
            .any(|b| b.range().contains(address) && b.get(address).unwrap_or(false));
        stored != self.complemented
    }

    fn stored_ranges(&self) -> Vec<AddressRange> {
        normalize(self.bitmaps.iter().flat_map(|b| b.ranges(true)).collect())
    }

    /// Maximal contiguous ranges of addresses in the set, in address order.
    pub fn ranges(&self) -> Vec<AddressRange> {
        let stored = self.stored_ranges();
        if self.complemented {
            difference(&[AddressRange::full()], &stored)
        } else {
            stored
        }
    }

    /// Visit each maximal contiguous range; the visitor returns `false` to
    /// stop.
    pub fn visit_ranges<F>(&self, mut visitor: F)
    where
        F: FnMut(&AddressRange) -> bool,
    {
        for range in self.ranges() {
            if !visitor(&range) {
                break;
            }
        }
    }

    pub fn insert(&mut self, address: Address) {
        self.add(vec![AddressRange::point(address)]);
    }

    pub fn insert_range(&mut self, range: AddressRange) -> Result<()> {
        self.insert_ranges(std::iter::once(range))
    }

    /// Add a set of ranges and re-partition. Ranges wider than
    /// [`MAX_BITMAP_WIDTH`] are refused and leave the set untouched.
    pub fn insert_ranges(&mut self, ranges: impl IntoIterator<Item = AddressRange>) -> Result<()> {
        let ranges = checked(ranges)?;
        self.add(ranges);
        Ok(())
    }

    fn add(&mut self, ranges: Vec<AddressRange>) {
        let stored = if self.complemented {
            difference(&self.stored_ranges(), &normalize(ranges))
        } else {
            let mut all = self.stored_ranges();
            all.extend(ranges);
            normalize(all)
        };
        self.bitmaps = partition(stored);
    }

    /// Remove every address of `range`, under the same width limit as
    /// [`AddressSet::insert_ranges`].
    pub fn remove_range(&mut self, range: AddressRange) -> Result<()> {
        let ranges = checked([range])?;
        let stored = if self.complemented {
            let mut all = self.stored_ranges();
            all.extend(ranges);
            normalize(all)
        } else {
            difference(&self.stored_ranges(), &normalize(ranges))
        };
        self.bitmaps = partition(stored);
        Ok(())
    }

    /// Every address not in the set. Complementing twice yields the original
    /// set.
    pub fn complement(&self) -> Self {
        Self {
            bitmaps: self.bitmaps.clone(),
            complemented: !self.complemented,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        let (a, b) = (self.stored_ranges(), other.stored_ranges());
        match (self.complemented, other.complemented) {
            (false, false) => Self::from_parts(merge(a, b), false),
            (false, true) => Self::from_parts(difference(&b, &a), true),
            (true, false) => Self::from_parts(difference(&a, &b), true),
            (true, true) => Self::from_parts(intersection(&a, &b), true),
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let (a, b) = (self.stored_ranges(), other.stored_ranges());
        match (self.complemented, other.complemented) {
            (false, false) => Self::from_parts(intersection(&a, &b), false),
            (false, true) => Self::from_parts(difference(&a, &b), false),
            (true, false) => Self::from_parts(difference(&b, &a), false),
            (true, true) => Self::from_parts(merge(a, b), true),
        }
    }

    pub fn difference(&self, other: &Self) -> Self {
        self.intersection(&other.complement())
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let (a, b) = (self.stored_ranges(), other.stored_ranges());
        let stored = merge(difference(&a, &b), difference(&b, &a));
        Self::from_parts(stored, self.complemented != other.complemented)
    }

    /// Complemented sets span unbounded ranges and have no wire form.
    pub fn to_wire(&self) -> Result<Vec<BitmapRecord>> {
        if self.complemented {
            return Err(Error::invalid_argument(
                "complemented address set cannot be encoded",
            ));
        }
        Ok(self.bitmaps.iter().map(AddressBitmap::to_wire).collect())
    }

    /// Rebuild from wire bitmaps, keeping their layout.
    pub fn from_wire(records: &[BitmapRecord]) -> Result<Self> {
        let bitmaps = records
            .iter()
            .map(AddressBitmap::from_wire)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            bitmaps,
            complemented: false,
        })
    }
}

impl PartialEq for AddressSet {
    fn eq(&self, other: &Self) -> bool {
        self.ranges() == other.ranges()
    }
}

impl Eq for AddressSet {}

impl TryFrom<Vec<BitmapRecord>> for AddressSet {
    type Error = Error;

    fn try_from(records: Vec<BitmapRecord>) -> Result<Self> {
        Self::from_wire(&records)
    }
}

impl Serialize for AddressSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl FromIterator<Address> for AddressSet {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::from_addresses(iter)
    }
}

impl Not for &AddressSet {
    type Output = AddressSet;

    fn not(self) -> AddressSet {
        self.complement()
    }
}

impl BitOr for &AddressSet {
    type Output = AddressSet;

    fn bitor(self, rhs: Self) -> AddressSet {
        self.union(rhs)
    }
}

impl BitAnd for &AddressSet {
    type Output = AddressSet;

    fn bitand(self, rhs: Self) -> AddressSet {
        self.intersection(rhs)
    }
}

impl BitXor for &AddressSet {
    type Output = AddressSet;

    fn bitxor(self, rhs: Self) -> AddressSet {
        self.symmetric_difference(rhs)
    }
}

impl Sub for &AddressSet {
    type Output = AddressSet;

    fn sub(self, rhs: Self) -> AddressSet {
        self.difference(rhs)
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, range) in self.ranges().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", range)?;
        }
        write!(f, "}}")
    }
}

// ---------------------------------------------------------------------------
// Range-list algebra. Every list is sorted, disjoint and non-adjacent.
// ---------------------------------------------------------------------------

fn checked(ranges: impl IntoIterator<Item = AddressRange>) -> Result<Vec<AddressRange>> {
    ranges
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(|r| {
            if r.width() > MAX_BITMAP_WIDTH {
                Err(Error::invalid_argument(format!(
                    "address range {} exceeds {} addresses",
                    r, MAX_BITMAP_WIDTH
                )))
            } else {
                Ok(r)
            }
        })
        .collect()
}

fn merge(mut a: Vec<AddressRange>, b: Vec<AddressRange>) -> Vec<AddressRange> {
    a.extend(b);
    normalize(a)
}

fn normalize(mut ranges: Vec<AddressRange>) -> Vec<AddressRange> {
    ranges.retain(|r| !r.is_empty());
    ranges.sort();

    let mut merged: Vec<AddressRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.end() == Address::MAX || range.begin() <= last.end().increment() => {
                *last = *last | range;
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn intersection(a: &[AddressRange], b: &[AddressRange]) -> Vec<AddressRange> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let overlap = a[i] & b[j];
        if !overlap.is_empty() {
            result.push(overlap);
        }
        if a[i].end() < b[j].end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

fn difference(a: &[AddressRange], b: &[AddressRange]) -> Vec<AddressRange> {
    let mut result = Vec::new();
    for &range in a {
        let mut remaining = Some(range);
        for &cut in b {
            let Some(current) = remaining else { break };
            if cut.end() < current.begin() {
                continue;
            }
            if current.end() < cut.begin() {
                break;
            }
            if current.begin() < cut.begin() {
                result.push(AddressRange::new(current.begin(), cut.begin().decrement()));
            }
            remaining = if cut.end() < current.end() {
                Some(AddressRange::new(cut.end().increment(), current.end()))
            } else {
                None
            };
        }
        if let Some(current) = remaining {
            result.push(current);
        }
    }
    normalize(result)
}

/// Split a normalized range list into bitmaps.
///
/// A work queue is seeded with the whole list. Each popped list becomes a
/// single bitmap unless the widest run of absent addresses between two of its
/// ranges exceeds [`PARTITIONING_THRESHOLD`], in which case it is split there
/// and both halves are queued. Lists spanning more than [`MAX_BITMAP_WIDTH`]
/// are split regardless, at the widest gap or else at the width limit.
fn partition(ranges: Vec<AddressRange>) -> Vec<AddressBitmap> {
    let mut bitmaps = Vec::new();
    let mut queue = VecDeque::from([ranges]);

    while let Some(mut subset) = queue.pop_front() {
        let (Some(first), Some(last)) = (subset.first().copied(), subset.last().copied()) else {
            continue;
        };

        let mut widest: Option<(usize, u64)> = None;
        for i in 1..subset.len() {
            let gap = (subset[i].begin() - subset[i - 1].end()) - 1;
            if widest.map_or(true, |(_, w)| gap > w) {
                widest = Some((i, gap));
            }
        }

        let oversized = (last.end() - first.begin()) >= MAX_BITMAP_WIDTH;
        match widest {
            Some((at, gap)) if gap > PARTITIONING_THRESHOLD || oversized => {
                let right = subset.split_off(at);
                queue.push_back(subset);
                queue.push_back(right);
            }
            None if oversized => {
                let cut = first.begin() + MAX_BITMAP_WIDTH;
                queue.push_back(vec![AddressRange::new(first.begin(), cut.decrement())]);
                queue.push_back(vec![AddressRange::new(cut, first.end())]);
            }
            _ => {
                let mut bitmap = AddressBitmap::covering(AddressRange::new(first.begin(), last.end()));
                for range in &subset {
                    bitmap.fill(*range);
                }
                bitmaps.push(bitmap);
            }
        }
    }

    bitmaps.sort_by_key(|b| b.range().begin());
    bitmaps
}
