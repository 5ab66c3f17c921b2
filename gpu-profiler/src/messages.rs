//! CUDA performance-data records
//!
//! A CUDA blob payload is a [`CudaData`]: a sequence of [`CudaMessage`]s plus
//! a pool of zero-terminated stack traces that enqueue requests index into.

use cudascope_shared::sampling::SampleKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key pairing an enqueue request with its completion.
pub type RequestKey = (u64, u64, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    MemoryCopy,
    ExecuteKernel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CopyKind {
    #[default]
    Unknown,
    HostToDevice,
    DeviceToHost,
    HostToArray,
    ArrayToHost,
    ArrayToArray,
    ArrayToDevice,
    DeviceToArray,
    DeviceToDevice,
    HostToHost,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryKind {
    #[default]
    Unknown,
    Pageable,
    Pinned,
    Device,
    Array,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CachePreference {
    #[default]
    InvalidCachePreference,
    NoPreference,
    PreferShared,
    PreferCache,
    PreferEqual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Vector3 {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// `x * y * z`, treating negative extents as zero and saturating at
    /// `u64::MAX`.
    pub fn volume(&self) -> u64 {
        [self.x, self.y, self.z]
            .iter()
            .map(|&v| v.max(0) as u64)
            .fold(1, u64::saturating_mul)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub context: u64,
    pub device: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device: u32,
    pub name: String,
    pub compute_capability: (u32, u32),
    pub global_memory_size: u64,
    pub multiprocessors: u32,
    pub threads_per_warp: u32,
    pub max_threads_per_block: u32,
    pub core_clock_rate: u64,
}

/// Description of one sampled hardware counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterDescription {
    pub name: String,
    pub kind: SampleKind,
    /// Overflow threshold; zero for counters only sampled periodically.
    pub threshold: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Periodic sampling interval in nanoseconds.
    pub interval: u64,
    pub events: Vec<CounterDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub kind: RequestKind,
    pub time: u64,
    pub context: u64,
    pub stream: u64,
    pub correlation_id: u32,
    /// Index of the first frame in [`CudaData::stack_traces`].
    pub call_site: u32,
}

impl EnqueueRequest {
    pub fn key(&self) -> RequestKey {
        (self.context, self.stream, self.correlation_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedExec {
    pub context: u64,
    pub stream: u64,
    pub correlation_id: u32,
    pub time_begin: u64,
    pub time_end: u64,
    pub function: String,
    pub grid: Vector3,
    pub block: Vector3,
    pub cache_preference: CachePreference,
    pub registers_per_thread: u32,
    pub static_shared_memory: u64,
    pub dynamic_shared_memory: u64,
    pub local_memory: u64,
}

impl CompletedExec {
    pub fn key(&self) -> RequestKey {
        (self.context, self.stream, self.correlation_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedXfer {
    pub context: u64,
    pub stream: u64,
    pub correlation_id: u32,
    pub time_begin: u64,
    pub time_end: u64,
    pub size: u64,
    pub kind: CopyKind,
    pub source_kind: MemoryKind,
    pub destination_kind: MemoryKind,
    pub asynchronous: bool,
}

impl CompletedXfer {
    pub fn key(&self) -> RequestKey {
        (self.context, self.stream, self.correlation_id)
    }
}

/// Counter overflows at sampled program counters. `counts` holds one value
/// per counter for each PC: `counts[i * counters + c]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowSamples {
    pub time_begin: u64,
    pub time_end: u64,
    pub pcs: Vec<u64>,
    pub counts: Vec<u64>,
}

/// One value per counter at a single time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicSamples {
    pub time: u64,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedModule {
    pub time: u64,
    pub handle: u64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadedModule {
    pub time: u64,
    pub handle: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFunction {
    pub time: u64,
    pub module_handle: u64,
    pub function: String,
    pub handle: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CudaMessage {
    ContextInfo(ContextInfo),
    DeviceInfo(DeviceInfo),
    SamplingConfig(SamplingConfig),
    EnqueueRequest(EnqueueRequest),
    CompletedExec(CompletedExec),
    CompletedXfer(CompletedXfer),
    OverflowSamples(OverflowSamples),
    PeriodicSamples(PeriodicSamples),
    LoadedModule(LoadedModule),
    UnloadedModule(UnloadedModule),
    ResolvedFunction(ResolvedFunction),
}

impl CudaMessage {
    /// Request key of a completion record.
    pub fn completion_key(&self) -> Option<RequestKey> {
        match self {
            CudaMessage::CompletedExec(m) => Some(m.key()),
            CudaMessage::CompletedXfer(m) => Some(m.key()),
            _ => None,
        }
    }

    /// Start and end time covered by the record, if it has any.
    pub fn time_range(&self) -> Option<(u64, u64)> {
        match self {
            CudaMessage::EnqueueRequest(m) => Some((m.time, m.time)),
            CudaMessage::CompletedExec(m) => Some((m.time_begin, m.time_end)),
            CudaMessage::CompletedXfer(m) => Some((m.time_begin, m.time_end)),
            CudaMessage::OverflowSamples(m) => Some((m.time_begin, m.time_end)),
            CudaMessage::PeriodicSamples(m) => Some((m.time, m.time)),
            CudaMessage::LoadedModule(m) => Some((m.time, m.time)),
            CudaMessage::UnloadedModule(m) => Some((m.time, m.time)),
            CudaMessage::ResolvedFunction(m) => Some((m.time, m.time)),
            CudaMessage::ContextInfo(_)
            | CudaMessage::DeviceInfo(_)
            | CudaMessage::SamplingConfig(_) => None,
        }
    }
}

/// Payload of a CUDA performance-data blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CudaData {
    pub messages: Vec<CudaMessage>,
    pub stack_traces: Vec<u64>,
}

impl CudaData {
    /// Frames of the zero-terminated stack trace starting at `call_site`.
    pub fn stack_trace(&self, call_site: u32) -> Option<&[u64]> {
        let start = call_site as usize;
        let tail = self.stack_traces.get(start..)?;
        let len = tail.iter().position(|&pc| pc == 0).unwrap_or(tail.len());
        Some(&tail[..len])
    }
}

/// Visit every non-zero PC in the enqueue-request call sites and overflow
/// samples of `data`, stopping when the visitor returns false.
pub fn visit_pcs<F>(data: &CudaData, mut visitor: F)
where
    F: FnMut(u64) -> bool,
{
    for message in &data.messages {
        let pcs: &[u64] = match message {
            CudaMessage::EnqueueRequest(request) => {
                data.stack_trace(request.call_site).unwrap_or(&[])
            }
            CudaMessage::OverflowSamples(samples) => &samples.pcs,
            _ => continue,
        };
        for &pc in pcs {
            if pc != 0 && !visitor(pc) {
                return;
            }
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestKind::MemoryCopy => "MemoryCopy",
            RequestKind::ExecuteKernel => "ExecuteKernel",
        })
    }
}

impl fmt::Display for CopyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CopyKind::Unknown => "Unknown",
            CopyKind::HostToDevice => "HostToDevice",
            CopyKind::DeviceToHost => "DeviceToHost",
            CopyKind::HostToArray => "HostToArray",
            CopyKind::ArrayToHost => "ArrayToHost",
            CopyKind::ArrayToArray => "ArrayToArray",
            CopyKind::ArrayToDevice => "ArrayToDevice",
            CopyKind::DeviceToArray => "DeviceToArray",
            CopyKind::DeviceToDevice => "DeviceToDevice",
            CopyKind::HostToHost => "HostToHost",
        })
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemoryKind::Unknown => "Unknown",
            MemoryKind::Pageable => "Pageable",
            MemoryKind::Pinned => "Pinned",
            MemoryKind::Device => "Device",
            MemoryKind::Array => "Array",
        })
    }
}

impl fmt::Display for CachePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CachePreference::InvalidCachePreference => "InvalidCachePreference",
            CachePreference::NoPreference => "NoPreference",
            CachePreference::PreferShared => "PreferShared",
            CachePreference::PreferCache => "PreferCache",
            CachePreference::PreferEqual => "PreferEqual",
        })
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}
