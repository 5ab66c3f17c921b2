//! Per-thread CUDA performance data
//!
//! [`PerformanceData`] accumulates CUDA blobs from many threads. The CUDA
//! driver may report a completion on a different thread than the one that
//! enqueued the request, so completions are matched to their requests by
//! `(context, stream, correlation_id)` and attributed to the enqueuing
//! thread. [`PerformanceData::visit_reshuffled_blobs`] re-emits each
//! thread's blobs with completions moved to the thread that owns them.

use crate::messages::{
    self, CompletedExec, CompletedXfer, CounterDescription, CudaData, CudaMessage, DeviceInfo,
    EnqueueRequest, RequestKey, RequestKind,
};
use crate::messages::{CachePreference, CopyKind, MemoryKind, Vector3};
use crate::COLLECTOR_ID;
use cudascope_shared::protocol::wire::{Blob, BlobHeader, ThreadRecord};
use cudascope_shared::sampling::{OverflowSamples, PeriodicSamples, PeriodicSamplesGroup};
use cudascope_shared::{Address, Error, Result, ThreadName, Time, TimeInterval};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A completed memory copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTransfer {
    pub device: u32,
    /// Index into [`PerformanceData::call_sites`].
    pub call_site: usize,
    /// When the copy was requested.
    pub time: Time,
    pub time_begin: Time,
    pub time_end: Time,
    pub size: u64,
    pub kind: CopyKind,
    pub source_kind: MemoryKind,
    pub destination_kind: MemoryKind,
    pub asynchronous: bool,
}

impl DataTransfer {
    /// From request to completion.
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.time, self.time_end.max(self.time))
    }
}

/// A completed kernel launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelExecution {
    pub device: u32,
    pub call_site: usize,
    pub correlation_id: u32,
    pub context: u64,
    pub stream: u64,
    pub time: Time,
    pub time_begin: Time,
    pub time_end: Time,
    pub function: String,
    pub grid: Vector3,
    pub block: Vector3,
    pub cache_preference: CachePreference,
    pub registers_per_thread: u32,
    pub static_shared_memory: u64,
    pub dynamic_shared_memory: u64,
    pub local_memory: u64,
}

impl KernelExecution {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.time, self.time_end.max(self.time))
    }

    /// Execution time on the device, in nanoseconds.
    pub fn duration(&self) -> u64 {
        self.time_end.value().saturating_sub(self.time_begin.value())
    }
}

#[derive(Debug, Clone)]
enum Completion {
    Exec(CompletedExec),
    Xfer(CompletedXfer),
}

#[derive(Debug, Clone)]
struct Pending {
    thread: ThreadName,
    request: EnqueueRequest,
    call_site: usize,
}

#[derive(Debug, Default)]
struct ThreadData {
    blobs: Vec<Blob>,
    transfers: Vec<DataTransfer>,
    kernels: Vec<KernelExecution>,
    /// All counter values at each sample time.
    periodic: BTreeMap<Time, Vec<u64>>,
    /// One per counter.
    overflow: Vec<OverflowSamples>,
}

/// CUDA performance data for any number of threads.
#[derive(Debug, Default)]
pub struct PerformanceData {
    threads: BTreeMap<ThreadName, ThreadData>,
    counters: Vec<CounterDescription>,
    sampling_interval: Option<u64>,
    devices: BTreeMap<u32, DeviceInfo>,
    contexts: BTreeMap<u64, u32>,
    call_sites: Vec<Vec<Address>>,
    requests: BTreeMap<RequestKey, Pending>,
    parked: BTreeMap<RequestKey, Completion>,
    owners: BTreeMap<RequestKey, ThreadName>,
}

impl PerformanceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one blob: record it in its thread's receive order and fold its
    /// records into the per-thread tables. A blob with any malformed record
    /// is rejected whole and leaves no trace.
    pub fn apply(&mut self, blob: &Blob) -> Result<()> {
        let data: CudaData = blob.decode_payload()?;
        self.validate(&data)?;
        let thread = blob.header.thread_name();

        self.threads
            .entry(thread.clone())
            .or_default()
            .blobs
            .push(blob.clone());

        for message in &data.messages {
            match message {
                CudaMessage::ContextInfo(info) => {
                    self.contexts.insert(info.context, info.device);
                }
                CudaMessage::DeviceInfo(info) => {
                    self.devices.insert(info.device, info.clone());
                }
                CudaMessage::SamplingConfig(config) => {
                    if self.counters.is_empty() {
                        self.counters = config.events.clone();
                        self.sampling_interval = Some(config.interval);
                    } else if self.counters != config.events {
                        warn!(thread = %thread, "ignoring conflicting sampling configuration");
                    }
                }
                CudaMessage::EnqueueRequest(request) => {
                    self.enqueue(&thread, &data, request)?;
                }
                CudaMessage::CompletedExec(completed) => {
                    self.complete(completed.key(), Completion::Exec(completed.clone()));
                }
                CudaMessage::CompletedXfer(completed) => {
                    self.complete(completed.key(), Completion::Xfer(completed.clone()));
                }
                CudaMessage::OverflowSamples(samples) => {
                    self.add_overflow_samples(&thread, samples)?;
                }
                CudaMessage::PeriodicSamples(samples) => {
                    if samples.counts.len() != self.counters.len() {
                        return Err(Error::malformed(format!(
                            "periodic sample has {} counts for {} counters",
                            samples.counts.len(),
                            self.counters.len()
                        )));
                    }
                    self.thread_mut(&thread)
                        .periodic
                        .insert(Time::new(samples.time), samples.counts.clone());
                }
                CudaMessage::LoadedModule(_)
                | CudaMessage::UnloadedModule(_)
                | CudaMessage::ResolvedFunction(_) => {
                    debug!(thread = %thread, "skipping informational CUDA record");
                }
            }
        }
        Ok(())
    }

    /// Check every record against the state `apply` would build, including
    /// a sampling configuration carried earlier in the same blob.
    fn validate(&self, data: &CudaData) -> Result<()> {
        let mut counters = self.counters.len();
        for message in &data.messages {
            match message {
                CudaMessage::SamplingConfig(config) if counters == 0 => {
                    counters = config.events.len();
                }
                CudaMessage::EnqueueRequest(request) => {
                    if data.stack_trace(request.call_site).is_none() {
                        return Err(Error::malformed(format!(
                            "call site {} outside a stack trace pool of {}",
                            request.call_site,
                            data.stack_traces.len()
                        )));
                    }
                }
                CudaMessage::OverflowSamples(samples) => {
                    if Some(samples.counts.len()) != samples.pcs.len().checked_mul(counters) {
                        return Err(Error::malformed(format!(
                            "{} overflow counts for {} PCs and {} counters",
                            samples.counts.len(),
                            samples.pcs.len(),
                            counters
                        )));
                    }
                }
                CudaMessage::PeriodicSamples(samples) => {
                    if samples.counts.len() != counters {
                        return Err(Error::malformed(format!(
                            "periodic sample has {} counts for {} counters",
                            samples.counts.len(),
                            counters
                        )));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn thread_mut(&mut self, thread: &ThreadName) -> &mut ThreadData {
        self.threads.entry(thread.clone()).or_default()
    }

    fn enqueue(&mut self, thread: &ThreadName, data: &CudaData, request: &EnqueueRequest) -> Result<()> {
        let frames = data.stack_trace(request.call_site).ok_or_else(|| {
            Error::malformed(format!(
                "call site {} outside a stack trace pool of {}",
                request.call_site,
                data.stack_traces.len()
            ))
        })?;
        let call_site = self.intern_call_site(frames);
        let key = request.key();

        self.owners.insert(key, thread.clone());
        let pending = Pending {
            thread: thread.clone(),
            request: request.clone(),
            call_site,
        };
        match self.parked.remove(&key) {
            Some(completion) => self.finalize(pending, completion),
            None => {
                self.requests.insert(key, pending);
            }
        }
        Ok(())
    }

    fn complete(&mut self, key: RequestKey, completion: Completion) {
        match self.requests.remove(&key) {
            Some(pending) => self.finalize(pending, completion),
            None => {
                debug!(?key, "completion arrived before its request");
                self.parked.insert(key, completion);
            }
        }
    }

    fn finalize(&mut self, pending: Pending, completion: Completion) {
        let device = self
            .contexts
            .get(&pending.request.context)
            .copied()
            .unwrap_or_default();
        let time = Time::new(pending.request.time);

        match (pending.request.kind, completion) {
            (RequestKind::MemoryCopy, Completion::Xfer(x)) => {
                self.thread_mut(&pending.thread).transfers.push(DataTransfer {
                    device,
                    call_site: pending.call_site,
                    time,
                    time_begin: Time::new(x.time_begin),
                    time_end: Time::new(x.time_end),
                    size: x.size,
                    kind: x.kind,
                    source_kind: x.source_kind,
                    destination_kind: x.destination_kind,
                    asynchronous: x.asynchronous,
                });
            }
            (RequestKind::ExecuteKernel, Completion::Exec(e)) => {
                self.thread_mut(&pending.thread).kernels.push(KernelExecution {
                    device,
                    call_site: pending.call_site,
                    correlation_id: e.correlation_id,
                    context: e.context,
                    stream: e.stream,
                    time,
                    time_begin: Time::new(e.time_begin),
                    time_end: Time::new(e.time_end),
                    function: e.function,
                    grid: e.grid,
                    block: e.block,
                    cache_preference: e.cache_preference,
                    registers_per_thread: e.registers_per_thread,
                    static_shared_memory: e.static_shared_memory,
                    dynamic_shared_memory: e.dynamic_shared_memory,
                    local_memory: e.local_memory,
                });
            }
            (kind, _) => {
                warn!(
                    thread = %pending.thread,
                    %kind,
                    correlation_id = pending.request.correlation_id,
                    "completion does not match request kind"
                );
            }
        }
    }

    fn intern_call_site(&mut self, frames: &[u64]) -> usize {
        let trace: Vec<Address> = frames.iter().copied().map(Address::new).collect();
        if let Some(index) = self.call_sites.iter().position(|t| *t == trace) {
            return index;
        }
        self.call_sites.push(trace);
        self.call_sites.len() - 1
    }

    fn add_overflow_samples(
        &mut self,
        thread: &ThreadName,
        samples: &messages::OverflowSamples,
    ) -> Result<()> {
        let counters = self.counters.len();
        if samples.counts.len() != samples.pcs.len() * counters {
            return Err(Error::malformed(format!(
                "{} overflow counts for {} PCs and {} counters",
                samples.counts.len(),
                samples.pcs.len(),
                counters
            )));
        }

        let names: Vec<String> = self.counters.iter().map(|c| c.name.clone()).collect();
        let data = self.thread_mut(thread);
        if data.overflow.len() != counters {
            data.overflow = names.into_iter().map(OverflowSamples::new).collect();
        }
        for (i, &pc) in samples.pcs.iter().enumerate() {
            for (c, series) in data.overflow.iter_mut().enumerate() {
                let count = samples.counts[i * counters + c];
                if count > 0 {
                    series.add(Address::new(pc), count);
                }
            }
        }
        Ok(())
    }

    pub fn threads(&self) -> Vec<ThreadName> {
        self.threads.keys().cloned().collect()
    }

    pub fn counters(&self) -> &[CounterDescription] {
        &self.counters
    }

    /// Periodic sampling interval in nanoseconds, once configured.
    pub fn sampling_interval(&self) -> Option<u64> {
        self.sampling_interval
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.devices.values()
    }

    pub fn call_sites(&self) -> &[Vec<Address>] {
        &self.call_sites
    }

    /// Requests still waiting for a completion.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn visit_data_transfers<F>(&self, thread: &ThreadName, interval: &TimeInterval, mut visitor: F)
    where
        F: FnMut(&DataTransfer) -> bool,
    {
        let Some(data) = self.threads.get(thread) else {
            return;
        };
        for transfer in &data.transfers {
            if transfer.interval().intersects(interval) && !visitor(transfer) {
                return;
            }
        }
    }

    pub fn visit_kernel_executions<F>(&self, thread: &ThreadName, interval: &TimeInterval, mut visitor: F)
    where
        F: FnMut(&KernelExecution) -> bool,
    {
        let Some(data) = self.threads.get(thread) else {
            return;
        };
        for kernel in &data.kernels {
            if kernel.interval().intersects(interval) && !visitor(kernel) {
                return;
            }
        }
    }

    /// One call per sample time inside `interval`, with every counter's
    /// value at that time.
    pub fn visit_periodic_samples<F>(&self, thread: &ThreadName, interval: &TimeInterval, mut visitor: F)
    where
        F: FnMut(Time, &[u64]) -> bool,
    {
        if interval.is_empty() {
            return;
        }
        let Some(data) = self.threads.get(thread) else {
            return;
        };
        for (&time, counts) in data.periodic.range(interval.begin()..=interval.end()) {
            if !visitor(time, counts) {
                return;
            }
        }
    }

    /// A thread's periodic samples split into one series per counter.
    pub fn periodic_samples(&self, thread: &ThreadName) -> PeriodicSamplesGroup {
        let mut series: Vec<PeriodicSamples> = self
            .counters
            .iter()
            .map(|c| PeriodicSamples::new(c.name.clone(), c.kind))
            .collect();
        if let Some(data) = self.threads.get(thread) {
            for (&time, counts) in &data.periodic {
                for (s, &value) in series.iter_mut().zip(counts) {
                    s.add(time, value);
                }
            }
        }
        PeriodicSamplesGroup::new(series)
    }

    /// A thread's overflow samples, one entry per counter.
    pub fn overflow_samples(&self, thread: &ThreadName) -> &[OverflowSamples] {
        self.threads
            .get(thread)
            .map(|d| d.overflow.as_slice())
            .unwrap_or(&[])
    }

    /// A thread's blobs in the order they were received.
    pub fn visit_blobs<F>(&self, thread: &ThreadName, mut visitor: F)
    where
        F: FnMut(&Blob) -> bool,
    {
        for blob in self.threads.get(thread).into_iter().flat_map(|d| &d.blobs) {
            if !visitor(blob) {
                return;
            }
        }
    }

    /// Every non-zero PC in every blob of every thread.
    pub fn visit_pcs<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(u64) -> bool,
    {
        for blob in self.threads.values().flat_map(|d| &d.blobs) {
            let data: CudaData = blob.decode_payload()?;
            let mut more = true;
            messages::visit_pcs(&data, |pc| {
                more = visitor(pc);
                more
            });
            if !more {
                break;
            }
        }
        Ok(())
    }

    /// A thread's blobs rearranged so every completion travels with the
    /// thread that enqueued its request.
    ///
    /// The thread's own blobs come first, in receive order, minus the
    /// completions owned by other threads; blobs left empty are dropped.
    /// Then a single blob carries the completions other threads reported
    /// for this thread's requests. Completions with no known request stay
    /// where they were reported.
    pub fn visit_reshuffled_blobs<F>(&self, thread: &ThreadName, mut visitor: F) -> Result<()>
    where
        F: FnMut(&Blob) -> bool,
    {
        let Some(own) = self.threads.get(thread) else {
            return Ok(());
        };
        let foreign = |message: &CudaMessage| {
            message
                .completion_key()
                .and_then(|key| self.owners.get(&key))
                .is_some_and(|owner| owner != thread)
        };

        for blob in &own.blobs {
            let mut data: CudaData = blob.decode_payload()?;
            let before = data.messages.len();
            data.messages.retain(|m| !foreign(m));
            if data.messages.len() == before {
                if !visitor(blob) {
                    return Ok(());
                }
                continue;
            }
            if data.messages.is_empty() {
                continue;
            }
            let reduced = Blob::new(blob.header.clone(), &data)?;
            if !visitor(&reduced) {
                return Ok(());
            }
        }

        let mut adopted = CudaData::default();
        for (reporter, other) in &self.threads {
            if reporter == thread {
                continue;
            }
            for blob in &other.blobs {
                let data: CudaData = blob.decode_payload()?;
                adopted.messages.extend(data.messages.into_iter().filter(|m| {
                    m.completion_key()
                        .and_then(|key| self.owners.get(&key))
                        .is_some_and(|owner| owner == thread)
                }));
            }
        }
        if adopted.messages.is_empty() {
            return Ok(());
        }

        let (time_begin, time_end) = adopted
            .messages
            .iter()
            .filter_map(CudaMessage::time_range)
            .fold((u64::MAX, u64::MIN), |(b, e), (mb, me)| (b.min(mb), e.max(me)));
        let template = &own.blobs[0].header;
        let header = BlobHeader {
            experiment: template.experiment,
            collector: template.collector,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(thread),
            time_begin,
            time_end: time_end.wrapping_add(1),
        };
        visitor(&Blob::new(header, &adopted)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ContextInfo, SamplingConfig};
    use cudascope_shared::sampling::SampleKind;

    fn thread(tid: u64) -> ThreadName {
        ThreadName::new("gpu-node", 4242, Some(tid), None)
    }

    fn blob(tid: u64, messages: Vec<CudaMessage>, stack_traces: Vec<u64>) -> Blob {
        let header = BlobHeader {
            experiment: 0,
            collector: 1,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(&thread(tid)),
            time_begin: 0,
            time_end: 1_000,
        };
        Blob::new(header, &CudaData { messages, stack_traces }).unwrap()
    }

    fn launch(correlation_id: u32, time: u64) -> CudaMessage {
        CudaMessage::EnqueueRequest(EnqueueRequest {
            kind: RequestKind::ExecuteKernel,
            time,
            context: 7,
            stream: 1,
            correlation_id,
            call_site: 0,
        })
    }

    fn executed(correlation_id: u32, begin: u64, end: u64) -> CudaMessage {
        CudaMessage::CompletedExec(CompletedExec {
            context: 7,
            stream: 1,
            correlation_id,
            time_begin: begin,
            time_end: end,
            function: "saxpy".to_string(),
            grid: Vector3::new(64, 1, 1),
            block: Vector3::new(256, 1, 1),
            cache_preference: CachePreference::PreferShared,
            registers_per_thread: 32,
            static_shared_memory: 0,
            dynamic_shared_memory: 0,
            local_memory: 0,
        })
    }

    fn kernels(data: &PerformanceData, tid: u64) -> Vec<KernelExecution> {
        let mut found = Vec::new();
        data.visit_kernel_executions(&thread(tid), &TimeInterval::full(), |k| {
            found.push(k.clone());
            true
        });
        found
    }

    #[test]
    fn test_cross_thread_completion_attributed_to_enqueuer() {
        let mut data = PerformanceData::new();
        data.apply(&blob(1, vec![launch(5, 100)], vec![0x400, 0])).unwrap();
        data.apply(&blob(2, vec![executed(5, 120, 180)], vec![])).unwrap();

        let on_one = kernels(&data, 1);
        assert_eq!(on_one.len(), 1);
        assert_eq!(on_one[0].time, Time::new(100));
        assert_eq!(on_one[0].duration(), 60);
        assert!(kernels(&data, 2).is_empty());
        assert_eq!(data.call_sites()[on_one[0].call_site], vec![Address::new(0x400)]);
    }

    #[test]
    fn test_completion_before_request_is_parked() {
        let mut data = PerformanceData::new();
        data.apply(&blob(2, vec![executed(9, 50, 60)], vec![])).unwrap();
        assert!(kernels(&data, 2).is_empty());
        data.apply(&blob(1, vec![launch(9, 40)], vec![0x1, 0])).unwrap();
        assert_eq!(kernels(&data, 1).len(), 1);
        assert_eq!(data.pending_requests(), 0);
    }

    #[test]
    fn test_device_from_context() {
        let mut data = PerformanceData::new();
        data.apply(&blob(
            1,
            vec![
                CudaMessage::ContextInfo(ContextInfo { context: 7, device: 3 }),
                launch(1, 10),
                executed(1, 11, 12),
            ],
            vec![0x9, 0],
        ))
        .unwrap();
        assert_eq!(kernels(&data, 1)[0].device, 3);
    }

    #[test]
    fn test_interval_filter() {
        let mut data = PerformanceData::new();
        data.apply(&blob(
            1,
            vec![launch(1, 10), executed(1, 15, 20), launch(2, 100), executed(2, 105, 110)],
            vec![0x9, 0],
        ))
        .unwrap();
        let mut hits = 0;
        data.visit_kernel_executions(
            &thread(1),
            &TimeInterval::new(Time::new(18), Time::new(50)),
            |_| {
                hits += 1;
                true
            },
        );
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_samples_require_counter_shape() {
        let mut data = PerformanceData::new();
        let config = CudaMessage::SamplingConfig(SamplingConfig {
            interval: 10,
            events: vec![
                CounterDescription {
                    name: "inst_executed".to_string(),
                    kind: SampleKind::Count,
                    threshold: 1000,
                },
                CounterDescription {
                    name: "PAPI_TOT_CYC".to_string(),
                    kind: SampleKind::Count,
                    threshold: 0,
                },
            ],
        });
        let periodic = |time, counts: Vec<u64>| {
            CudaMessage::PeriodicSamples(messages::PeriodicSamples { time, counts })
        };
        data.apply(&blob(
            1,
            vec![
                config,
                periodic(0, vec![1, 10]),
                periodic(10, vec![2, 20]),
                CudaMessage::OverflowSamples(messages::OverflowSamples {
                    time_begin: 0,
                    time_end: 10,
                    pcs: vec![0x70, 0x80],
                    counts: vec![3, 0, 1, 4],
                }),
            ],
            vec![],
        ))
        .unwrap();

        let mut rows = Vec::new();
        data.visit_periodic_samples(&thread(1), &TimeInterval::full(), |t, c| {
            rows.push((t.value(), c.to_vec()));
            true
        });
        assert_eq!(rows, vec![(0, vec![1, 10]), (10, vec![2, 20])]);
        assert_eq!(data.periodic_samples(&thread(1)).series()[1].rate(), 10);

        let overflow = data.overflow_samples(&thread(1));
        assert_eq!(overflow[0].total(), 4);
        assert_eq!(overflow[1].total(), 4);

        let bad = blob(1, vec![periodic(20, vec![1])], vec![]);
        assert!(matches!(data.apply(&bad), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_reshuffled_blobs_move_completions() {
        let mut data = PerformanceData::new();
        data.apply(&blob(1, vec![launch(1, 10)], vec![0x400, 0])).unwrap();
        data.apply(&blob(
            2,
            vec![executed(1, 20, 30), launch(2, 40), executed(2, 41, 42)],
            vec![0x500, 0],
        ))
        .unwrap();

        let collect = |tid| {
            let mut out = Vec::new();
            data.visit_reshuffled_blobs(&thread(tid), |b| {
                out.push(b.decode_payload::<CudaData>().unwrap());
                true
            })
            .unwrap();
            out
        };

        let one = collect(1);
        assert_eq!(one.len(), 2);
        assert_eq!(one[0].messages, vec![launch(1, 10)]);
        assert!(one[1].messages.iter().all(|m| m.completion_key() == Some((7, 1, 1))));

        let two = collect(2);
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].messages, vec![launch(2, 40), executed(2, 41, 42)]);
    }

    #[test]
    fn test_malformed_call_site() {
        let mut data = PerformanceData::new();
        let request = CudaMessage::EnqueueRequest(EnqueueRequest {
            kind: RequestKind::MemoryCopy,
            time: 10,
            context: 7,
            stream: 1,
            correlation_id: 1,
            call_site: 5,
        });
        let bad = blob(1, vec![request], vec![0x10, 0]);
        assert!(matches!(data.apply(&bad), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_rejected_blob_leaves_no_trace() {
        let mut data = PerformanceData::new();
        let periodic = CudaMessage::PeriodicSamples(messages::PeriodicSamples {
            time: 0,
            counts: vec![1, 2],
        });
        let bad = blob(1, vec![launch(3, 10), periodic], vec![0x400, 0]);
        assert!(matches!(data.apply(&bad), Err(Error::Malformed(_))));
        assert!(data.threads().is_empty());
        assert_eq!(data.pending_requests(), 0);
        assert!(data.call_sites().is_empty());

        // The completion for the rejected launch has nothing to pair with.
        data.apply(&blob(2, vec![executed(3, 20, 30)], vec![])).unwrap();
        assert!(kernels(&data, 1).is_empty());
        assert_eq!(data.threads(), vec![thread(2)]);
    }

    #[test]
    fn test_sampling_config_in_same_blob_shapes_validation() {
        let mut data = PerformanceData::new();
        let config = CudaMessage::SamplingConfig(SamplingConfig {
            interval: 10,
            events: vec![CounterDescription {
                name: "inst_executed".to_string(),
                kind: SampleKind::Count,
                threshold: 0,
            }],
        });
        let overflow = CudaMessage::OverflowSamples(messages::OverflowSamples {
            time_begin: 0,
            time_end: 10,
            pcs: vec![0x70],
            counts: vec![1, 1],
        });
        let bad = blob(1, vec![config.clone(), overflow], vec![]);
        assert!(matches!(data.apply(&bad), Err(Error::Malformed(_))));
        assert!(data.counters().is_empty());

        let periodic = CudaMessage::PeriodicSamples(messages::PeriodicSamples {
            time: 0,
            counts: vec![7],
        });
        data.apply(&blob(1, vec![config, periodic], vec![])).unwrap();
        assert_eq!(data.counters().len(), 1);
    }
}
