//! Utility functions and helpers

pub mod spin_mutex;
pub mod time;

pub use spin_mutex::{SpinGuard, SpinMutex};

/// Convert bytes to a hexadecimal string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
