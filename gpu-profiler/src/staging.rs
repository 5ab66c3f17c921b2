//! Collector-side staging of CUDA records
//!
//! Instrumentation callbacks may fire on any thread. Records are appended to a
//! [`StagingBuffer`] under a [`SpinMutex`] and periodically flushed into a
//! [`Blob`].

use crate::messages::{CudaData, CudaMessage, EnqueueRequest};
use cudascope_shared::protocol::wire::{Blob, BlobHeader};
use cudascope_shared::utils::SpinMutex;
use cudascope_shared::Result;
use std::cell::UnsafeCell;

/// Records held before a flush.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct StagingBuffer {
    lock: SpinMutex,
    header: BlobHeader,
    capacity: usize,
    data: UnsafeCell<CudaData>,
}

// SAFETY: `data` is only touched while `lock` is held.
unsafe impl Sync for StagingBuffer {}

impl StagingBuffer {
    pub fn new(header: BlobHeader) -> Self {
        Self::with_capacity(header, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(header: BlobHeader, capacity: usize) -> Self {
        Self {
            lock: SpinMutex::new(),
            header,
            capacity: capacity.max(1),
            data: UnsafeCell::new(CudaData::default()),
        }
    }

    fn with_data<R>(&self, f: impl FnOnce(&mut CudaData) -> R) -> R {
        let _guard = self.lock.lock();
        // SAFETY: the spin lock gives exclusive access for the guard's lifetime.
        let data = unsafe { &mut *self.data.get() };
        f(data)
    }

    /// Append a record. Returns true once the buffer is full and should be
    /// flushed.
    pub fn push(&self, message: CudaMessage) -> bool {
        self.with_data(|data| {
            data.messages.push(message);
            data.messages.len() >= self.capacity
        })
    }

    /// Append an enqueue request together with the stack trace of its call
    /// site; `call_site` is rewritten to point at the stored trace.
    pub fn push_request(&self, mut request: EnqueueRequest, frames: &[u64]) -> bool {
        self.with_data(|data| {
            request.call_site = data.stack_traces.len() as u32;
            data.stack_traces
                .extend(frames.iter().copied().filter(|&pc| pc != 0));
            data.stack_traces.push(0);
            data.messages.push(CudaMessage::EnqueueRequest(request));
            data.messages.len() >= self.capacity
        })
    }

    pub fn len(&self) -> usize {
        self.with_data(|data| data.messages.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything staged so far as one blob, or `None` if nothing is
    /// staged. The header's time range covers the staged records.
    pub fn flush(&self) -> Result<Option<Blob>> {
        let data = self.with_data(std::mem::take);
        if data.messages.is_empty() {
            return Ok(None);
        }

        let (begin, end) = data
            .messages
            .iter()
            .filter_map(CudaMessage::time_range)
            .fold((u64::MAX, u64::MIN), |(b, e), (mb, me)| (b.min(mb), e.max(me)));
        let mut header = self.header.clone();
        if begin <= end {
            header.time_begin = begin;
            header.time_end = end.wrapping_add(1);
        }
        Blob::new(header, &data).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::RequestKind;
    use crate::COLLECTOR_ID;
    use cudascope_shared::protocol::wire::ThreadRecord;
    use cudascope_shared::ThreadName;
    use std::sync::Arc;
    use std::thread;

    fn header() -> BlobHeader {
        BlobHeader {
            experiment: 0,
            collector: 1,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(&ThreadName::new("h", 1, Some(1), None)),
            time_begin: 0,
            time_end: 0,
        }
    }

    fn request(correlation_id: u32, time: u64) -> EnqueueRequest {
        EnqueueRequest {
            kind: RequestKind::MemoryCopy,
            time,
            context: 1,
            stream: 0,
            correlation_id,
            call_site: 0,
        }
    }

    #[test]
    fn test_flush_builds_blob() {
        let buffer = StagingBuffer::new(header());
        assert!(buffer.flush().unwrap().is_none());

        buffer.push_request(request(1, 100), &[0x10, 0x20]);
        buffer.push_request(request(2, 300), &[0x30]);
        let blob = buffer.flush().unwrap().unwrap();
        assert!(buffer.is_empty());
        assert_eq!((blob.header.time_begin, blob.header.time_end), (100, 301));

        let data: CudaData = blob.decode_payload().unwrap();
        assert_eq!(data.stack_traces, vec![0x10, 0x20, 0, 0x30, 0]);
        match &data.messages[1] {
            CudaMessage::EnqueueRequest(r) => {
                assert_eq!(data.stack_trace(r.call_site), Some(&[0x30][..]))
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_producers() {
        let buffer = Arc::new(StagingBuffer::with_capacity(header(), 10_000));
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..250u32 {
                        buffer.push_request(request(p * 1000 + i, i as u64), &[0x1000 + i as u64]);
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(buffer.len(), 1000);
        let data: CudaData = buffer.flush().unwrap().unwrap().decode_payload().unwrap();
        assert_eq!(data.stack_traces.len(), 2000);
    }

    #[test]
    fn test_push_reports_full() {
        let buffer = StagingBuffer::with_capacity(header(), 2);
        assert!(!buffer.push_request(request(1, 1), &[]));
        assert!(buffer.push_request(request(2, 2), &[]));
    }
}
