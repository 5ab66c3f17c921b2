//! Primitive value types and address containers

pub mod address;
pub mod address_buffer;
pub mod address_set;
pub mod bitmap;
pub mod feature;
pub mod file_name;
pub mod interval;
pub mod thread_name;
pub mod time;

pub use address::Address;
pub use address_buffer::AddressBuffer;
pub use address_set::{AddressSet, PARTITIONING_THRESHOLD};
pub use bitmap::{AddressBitmap, MAX_BITMAP_WIDTH};
pub use feature::{Feature, FeatureVector};
pub use file_name::FileName;
pub use interval::{AddressRange, ByOverlap, Interval, TimeInterval};
pub use thread_name::ThreadName;
pub use time::Time;
