//! Wire records exchanged between pipeline components.
//!
//! Ranges and time intervals travel half-open (`end` is one past the last
//! value) and are converted to closed intervals on receipt. Blob payloads are
//! bincode with an explicit fixint config so every component decodes with the
//! same layout; trailing bytes are rejected so truncation and padding both
//! surface as [`Error::Malformed`].

use crate::error::{Error, Result};
use crate::types::{Address, AddressRange, FileName, Interval, ThreadName, Time, TimeInterval};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

fn wire_bincode() -> impl bincode::config::Options {
    bincode::config::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode a record for transport inside a [`Blob`].
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    wire_bincode().serialize(value).map_err(Into::into)
}

/// Decode a record, reporting any shape mismatch as malformed.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    wire_bincode()
        .deserialize(bytes)
        .map_err(|e| Error::malformed(format!("undecodable record: {}", e)))
}

// ---------------------------------------------------------------------------
// Primitive records
// ---------------------------------------------------------------------------

/// Half-open `[begin, end)` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeRecord {
    pub begin: u64,
    pub end: u64,
}

impl From<AddressRange> for RangeRecord {
    fn from(range: AddressRange) -> Self {
        let (begin, end) = range.to_half_open();
        Self { begin, end }
    }
}

impl From<RangeRecord> for AddressRange {
    fn from(record: RangeRecord) -> Self {
        Interval::from_half_open(record.begin, record.end)
    }
}

impl From<TimeInterval> for RangeRecord {
    fn from(interval: TimeInterval) -> Self {
        let (begin, end) = interval.to_half_open();
        Self { begin, end }
    }
}

impl From<RangeRecord> for TimeInterval {
    fn from(record: RangeRecord) -> Self {
        Interval::from_half_open(record.begin, record.end)
    }
}

/// Packed address bitmap: bit `i` is `data[i / 8] & (1 << (i % 8))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapRecord {
    pub range: RangeRecord,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub experiment: i32,
    pub host: String,
    pub pid: i64,
    pub has_posix_tid: bool,
    pub posix_tid: i64,
    /// Negative when the thread has no MPI rank.
    pub rank: i32,
}

impl From<&ThreadName> for ThreadRecord {
    fn from(thread: &ThreadName) -> Self {
        Self {
            experiment: 0,
            host: thread.host().to_string(),
            pid: thread.pid() as i64,
            has_posix_tid: thread.tid().is_some(),
            posix_tid: thread.tid().unwrap_or(0) as i64,
            rank: thread.mpi_rank().map(|r| r as i32).unwrap_or(-1),
        }
    }
}

impl From<&ThreadRecord> for ThreadName {
    fn from(record: &ThreadRecord) -> Self {
        ThreadName::new(
            record.host.clone(),
            record.pid as u64,
            record.has_posix_tid.then_some(record.posix_tid as u64),
            (record.rank >= 0).then_some(record.rank as u32),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub checksum: u64,
}

impl From<&FileName> for FileRecord {
    fn from(file: &FileName) -> Self {
        Self {
            path: file.path().to_string_lossy().into_owned(),
            checksum: file.checksum(),
        }
    }
}

impl From<&FileRecord> for FileName {
    fn from(record: &FileRecord) -> Self {
        FileName::with_checksum(record.path.clone(), record.checksum)
    }
}

// ---------------------------------------------------------------------------
// Symbol tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub bitmaps: Vec<BitmapRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRecord {
    pub head: u64,
    pub bitmaps: Vec<BitmapRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementRecord {
    pub path: FileRecord,
    pub line: u32,
    pub column: u32,
    pub bitmaps: Vec<BitmapRecord>,
}

/// Symbol information for one linked object. Addresses are relative to the
/// object's load address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTableMessage {
    pub linked_object: FileRecord,
    pub functions: Vec<FunctionRecord>,
    pub loops: Vec<LoopRecord>,
    pub statements: Vec<StatementRecord>,
}

// ---------------------------------------------------------------------------
// Thread and address-space lifecycle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedObjectRecord {
    pub linked_object: FileRecord,
    pub range: RangeRecord,
    /// Half-open: `time_end` is one past the last time of the mapping.
    pub time_begin: u64,
    pub time_end: u64,
    pub is_executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedObjectGroup {
    pub thread: ThreadRecord,
    pub linkedobjects: Vec<LinkedObjectRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachedToThreads {
    pub threads: Vec<ThreadRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedLinkedObject {
    pub threads: Vec<ThreadRecord>,
    pub time: u64,
    pub range: RangeRecord,
    pub linked_object: FileRecord,
    pub is_executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnloadedLinkedObject {
    pub threads: Vec<ThreadRecord>,
    pub time: u64,
    pub linked_object: FileRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadState {
    Disconnected,
    Connecting,
    Nonexistent,
    Running,
    Suspended,
    Terminated,
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreadState::Disconnected => "disconnected",
            ThreadState::Connecting => "connecting",
            ThreadState::Nonexistent => "nonexistent",
            ThreadState::Running => "running",
            ThreadState::Suspended => "suspended",
            ThreadState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadsStateChanged {
    pub threads: Vec<ThreadRecord>,
    pub state: ThreadState,
}

// ---------------------------------------------------------------------------
// Performance data blobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobHeader {
    pub experiment: i32,
    pub collector: i32,
    pub id: String,
    pub thread: ThreadRecord,
    pub time_begin: u64,
    pub time_end: u64,
}

impl BlobHeader {
    pub fn thread_name(&self) -> ThreadName {
        ThreadName::from(&self.thread)
    }

    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::from(RangeRecord {
            begin: self.time_begin,
            end: self.time_end,
        })
    }
}

/// A header plus an opaque, collector-specific payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub header: BlobHeader,
    pub payload: Vec<u8>,
}

impl Blob {
    pub fn new<T: Serialize>(header: BlobHeader, payload: &T) -> Result<Self> {
        Ok(Self {
            header,
            payload: encode(payload)?,
        })
    }

    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.payload)
    }
}

/// Convenience for building half-open records from closed values.
pub fn range_record(begin: Address, end: Address) -> RangeRecord {
    RangeRecord::from(AddressRange::new(begin, end))
}

pub fn time_record(begin: Time, end: Time) -> RangeRecord {
    RangeRecord::from(TimeInterval::new(begin, end))
}
