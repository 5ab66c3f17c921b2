//! One-bit-per-address bitmaps

use super::{Address, AddressRange};
use crate::error::{Error, Result};
use crate::protocol::wire::{BitmapRecord, RangeRecord};

/// A bit for every address within a closed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBitmap {
    range: AddressRange,
    bits: Vec<u8>,
}

/// Widest range a single bitmap may cover: 512 MiB of bits.
pub const MAX_BITMAP_WIDTH: u64 = 1 << 32;

fn byte_len(width: u64) -> usize {
    (width.div_ceil(8) as usize).max(1)
}

impl AddressBitmap {
    /// A bitmap covering `range` with every bit clear.
    pub fn new(range: AddressRange) -> Result<Self> {
        if range.is_empty() {
            return Err(Error::invalid_argument("address bitmap over an empty range"));
        }
        if range.width() > MAX_BITMAP_WIDTH {
            return Err(Error::invalid_argument(format!(
                "address bitmap over {} exceeds {} addresses",
                range, MAX_BITMAP_WIDTH
            )));
        }
        Ok(Self::covering(range))
    }

    /// Callers guarantee `range` is non-empty and no wider than
    /// [`MAX_BITMAP_WIDTH`].
    pub(crate) fn covering(range: AddressRange) -> Self {
        Self {
            range,
            bits: vec![0u8; byte_len(range.width())],
        }
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    fn offset(&self, address: Address) -> Result<u64> {
        if !self.range.contains(address) {
            return Err(Error::invalid_argument(format!(
                "address {} outside bitmap range {}",
                address, self.range
            )));
        }
        Ok(address - self.range.begin())
    }

    fn bit(&self, offset: u64) -> bool {
        self.bits[(offset / 8) as usize] & (1 << (offset % 8)) != 0
    }

    pub fn get(&self, address: Address) -> Result<bool> {
        let offset = self.offset(address)?;
        Ok(self.bit(offset))
    }

    pub fn set(&mut self, address: Address, value: bool) -> Result<()> {
        let offset = self.offset(address)?;
        let byte = &mut self.bits[(offset / 8) as usize];
        if value {
            *byte |= 1 << (offset % 8);
        } else {
            *byte &= !(1 << (offset % 8));
        }
        Ok(())
    }

    /// Set every bit of `range`, which must lie within the bitmap.
    pub(crate) fn fill(&mut self, range: AddressRange) {
        let first = range.begin() - self.range.begin();
        for offset in first..first + range.width() {
            self.bits[(offset / 8) as usize] |= 1 << (offset % 8);
        }
    }

    /// Number of set bits.
    pub fn count(&self) -> u64 {
        self.bits.iter().map(|b| b.count_ones() as u64).sum()
    }

    /// Maximal contiguous runs of addresses whose bit equals `value`.
    pub fn ranges(&self, value: bool) -> Vec<AddressRange> {
        let mut runs = Vec::new();
        let width = self.range.width();
        let mut start: Option<u64> = None;

        for i in 0..width {
            let bit = self.bit(i);
            match (bit == value, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push(AddressRange::new(
                        self.range.begin() + s,
                        self.range.begin() + (i - 1),
                    ));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(AddressRange::new(self.range.begin() + s, self.range.end()));
        }
        runs
    }

    pub fn to_wire(&self) -> BitmapRecord {
        BitmapRecord {
            range: RangeRecord::from(self.range),
            data: self.bits.clone(),
        }
    }

    /// Validates the record before allocating anything, so the claimed
    /// range never decides how much memory is reserved.
    pub fn from_wire(record: &BitmapRecord) -> Result<Self> {
        let range = AddressRange::from(record.range);
        if record.range.begin == record.range.end || range.is_empty() {
            return Err(Error::malformed(format!(
                "address bitmap over empty half-open range [{:#x}, {:#x})",
                record.range.begin, record.range.end
            )));
        }
        if range.width() > MAX_BITMAP_WIDTH {
            return Err(Error::malformed(format!(
                "address bitmap over {} exceeds {} addresses",
                range, MAX_BITMAP_WIDTH
            )));
        }
        let expected = byte_len(range.width());
        if record.data.len() != expected {
            return Err(Error::malformed(format!(
                "address bitmap over {} carries {} bytes, expected {}",
                range,
                record.data.len(),
                expected
            )));
        }
        let mut bits = record.data.clone();
        // Bits past the end of the range are padding.
        let used = range.width() % 8;
        if used != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << used) - 1;
            }
        }
        Ok(Self { range, bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(b: u64, e: u64) -> AddressRange {
        AddressRange::new(Address::new(b), Address::new(e))
    }

    #[test]
    fn test_set_get_and_bounds() {
        let mut bitmap = AddressBitmap::new(range(100, 109)).unwrap();
        bitmap.set(Address::new(103), true).unwrap();
        assert!(bitmap.get(Address::new(103)).unwrap());
        assert!(!bitmap.get(Address::new(104)).unwrap());
        assert!(matches!(
            bitmap.set(Address::new(110), true),
            Err(Error::InvalidArgument(_))
        ));
        assert!(bitmap.get(Address::new(99)).is_err());
    }

    #[test]
    fn test_ranges_partition_the_bitmap() {
        let mut bitmap = AddressBitmap::new(range(0, 19)).unwrap();
        for a in [0u64, 1, 2, 7, 8, 15, 19] {
            bitmap.set(Address::new(a), true).unwrap();
        }
        let ones = bitmap.ranges(true);
        let zeros = bitmap.ranges(false);
        assert_eq!(
            ones,
            vec![range(0, 2), range(7, 8), range(15, 15), range(19, 19)]
        );
        assert_eq!(zeros, vec![range(3, 6), range(9, 14), range(16, 18)]);

        let mut all: Vec<_> = ones.iter().chain(zeros.iter()).copied().collect();
        all.sort();
        let total: u64 = all.iter().map(|r| r.width()).sum();
        assert_eq!(total, 20);
        for pair in all.windows(2) {
            assert_eq!(pair[0].end().increment(), pair[1].begin());
        }
    }

    #[test]
    fn test_ranges_of_uniform_bitmap() {
        let bitmap = AddressBitmap::new(range(5, 12)).unwrap();
        assert_eq!(bitmap.ranges(false), vec![range(5, 12)]);
        assert!(bitmap.ranges(true).is_empty());
    }

    #[test]
    fn test_wire_packing() {
        let mut bitmap = AddressBitmap::new(range(0x1000, 0x1009)).unwrap();
        bitmap.set(Address::new(0x1000), true).unwrap();
        bitmap.set(Address::new(0x1009), true).unwrap();
        let wire = bitmap.to_wire();
        assert_eq!(wire.range.begin, 0x1000);
        assert_eq!(wire.range.end, 0x100a);
        assert_eq!(wire.data, vec![0b0000_0001, 0b0000_0010]);
        assert_eq!(AddressBitmap::from_wire(&wire).unwrap(), bitmap);
    }

    #[test]
    fn test_single_bit_uses_one_byte() {
        let bitmap = AddressBitmap::new(range(7, 7)).unwrap();
        assert_eq!(bitmap.to_wire().data.len(), 1);
    }

    #[test]
    fn test_wrong_data_length_is_malformed() {
        let mut wire = AddressBitmap::new(range(0, 15)).unwrap().to_wire();
        wire.data.push(0);
        assert!(matches!(
            AddressBitmap::from_wire(&wire),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_half_open_range_is_malformed() {
        for (begin, end) in [(0u64, 0u64), (0x40, 0x40), (0x50, 0x10)] {
            let wire = BitmapRecord {
                range: RangeRecord { begin, end },
                data: vec![0xff],
            };
            assert!(matches!(
                AddressBitmap::from_wire(&wire),
                Err(Error::Malformed(_))
            ));
        }
    }

    #[test]
    fn test_oversized_wire_range_is_rejected_without_allocating() {
        // Claims the upper half of the address space with a single data byte.
        let wire = BitmapRecord {
            range: RangeRecord {
                begin: 1 << 63,
                end: 0,
            },
            data: vec![0],
        };
        assert!(matches!(
            AddressBitmap::from_wire(&wire),
            Err(Error::Malformed(_))
        ));

        let wire = BitmapRecord {
            range: RangeRecord { begin: 0, end: 1 << 20 },
            data: vec![0; 3],
        };
        assert!(matches!(
            AddressBitmap::from_wire(&wire),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_new_refuses_ranges_wider_than_the_cap() {
        assert!(matches!(
            AddressBitmap::new(AddressRange::full()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(AddressBitmap::new(range(0, MAX_BITMAP_WIDTH)).is_err());
    }

    #[test]
    fn test_padding_bits_are_cleared() {
        let wire = BitmapRecord {
            range: RangeRecord { begin: 0, end: 3 },
            data: vec![0xff],
        };
        let bitmap = AddressBitmap::from_wire(&wire).unwrap();
        assert_eq!(bitmap.count(), 3);
        assert_eq!(bitmap.to_wire().data, vec![0b0000_0111]);
    }
}
