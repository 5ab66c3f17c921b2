//! File names with content checksums

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const CRC64_POLYNOMIAL: u64 = 0x42F0_E1EB_A9EA_3693;

const CRC64_TABLE: [u64; 256] = crc64_table();

const fn crc64_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u64) << 56;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & (1 << 63) != 0 {
                (crc << 1) ^ CRC64_POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running CRC-64 (ECMA-182 polynomial, no reflection, zero init and xor).
#[derive(Debug, Default, Clone, Copy)]
pub struct Crc64(u64);

impl Crc64 {
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            let index = ((self.0 >> 56) as u8 ^ byte) as usize;
            self.0 = (self.0 << 8) ^ CRC64_TABLE[index];
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Checksum a file's contents. Anything other than a regular file has a
/// checksum of zero.
pub fn checksum_file(path: &Path) -> Result<u64> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(Error::system(format!("stat {}: {}", path.display(), e)));
        }
    };
    if !metadata.is_file() {
        return Ok(0);
    }

    let file = File::open(path)
        .map_err(|e| Error::system(format!("open {}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);
    let mut crc = Crc64::default();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buffer)
            .map_err(|e| Error::system(format!("read {}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        crc.update(&buffer[..n]);
    }
    Ok(crc.value())
}

/// A path plus a checksum of the file it names.
///
/// A zero checksum means "unknown" and matches any checksum for the same
/// path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileName {
    path: PathBuf,
    checksum: u64,
}

impl FileName {
    /// Name `path`, checksumming its contents.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let checksum = checksum_file(&path)?;
        Ok(Self { path, checksum })
    }

    pub fn with_checksum(path: impl Into<PathBuf>, checksum: u64) -> Self {
        Self {
            path: path.into(),
            checksum,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn checksum(&self) -> u64 {
        self.checksum
    }
}

impl PartialEq for FileName {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && (self.checksum == 0 || other.checksum == 0 || self.checksum == other.checksum)
    }
}

impl Eq for FileName {}

impl Hash for FileName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Ord for FileName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path).then_with(|| {
            if self.checksum != 0 && other.checksum != 0 {
                self.checksum.cmp(&other.checksum)
            } else {
                Ordering::Equal
            }
        })
    }
}

impl PartialOrd for FileName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_crc_known_vector() {
        // CRC-64/ECMA-182 check value for "123456789"
        let mut crc = Crc64::default();
        crc.update(b"123456789");
        assert_eq!(crc.value(), 0x6C40_DF5F_0B49_7347);
    }

    #[test]
    fn test_empty_file_checksum_is_zero() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let name = FileName::new(file.path()).unwrap();
        assert_eq!(name.checksum(), 0);
    }

    #[test]
    fn test_nonempty_file_checksum() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"123456789").unwrap();
        file.flush().unwrap();
        let name = FileName::new(file.path()).unwrap();
        assert_eq!(name.checksum(), 0x6C40_DF5F_0B49_7347);
    }

    #[test]
    fn test_missing_file_and_directory_have_zero_checksum() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FileName::new(dir.path()).unwrap().checksum(), 0);
        assert_eq!(FileName::new(dir.path().join("nope")).unwrap().checksum(), 0);
    }

    #[test]
    fn test_equality_rules() {
        let a = FileName::with_checksum("/lib/libc.so", 0);
        let b = FileName::with_checksum("/lib/libc.so", 0);
        assert_eq!(a, b);

        let c = FileName::with_checksum("/lib/libc.so", 1);
        let d = FileName::with_checksum("/lib/libc.so", 2);
        assert_ne!(c, d);
        assert_eq!(a, c);

        let e = FileName::with_checksum("/lib/libm.so", 1);
        assert_ne!(c, e);
    }

    #[test]
    fn test_ordering() {
        let a = FileName::with_checksum("/a", 5);
        let b = FileName::with_checksum("/b", 1);
        assert!(a < b);
        let c = FileName::with_checksum("/a", 7);
        assert!(a < c);
        let zero = FileName::with_checksum("/a", 0);
        assert_eq!(a.cmp(&zero), Ordering::Equal);
    }
}
