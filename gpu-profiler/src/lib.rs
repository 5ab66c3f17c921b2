//! CUDA performance data
//!
//! Records produced by the CUDA collector, the per-thread store that pairs
//! enqueue requests with their completions, and the collector-side pieces
//! that stage records into blobs.

pub mod collector;
pub mod dump;
pub mod messages;
pub mod performance_data;
pub mod staging;

pub use collector::{Collector, CollectorState, ReplayCollector, COLLECTOR_ID};
pub use dump::format_blob;
pub use messages::{visit_pcs, CudaData, CudaMessage};
pub use performance_data::{DataTransfer, KernelExecution, PerformanceData};
pub use staging::StagingBuffer;
