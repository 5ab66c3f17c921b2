//! Human-readable rendering of CUDA blobs

use crate::messages::{CudaData, CudaMessage};
use cudascope_shared::protocol::wire::Blob;
use cudascope_shared::stringify::short_name;
use cudascope_shared::utils::bytes_to_hex;
use cudascope_shared::utils::time::elapsed;
use cudascope_shared::{Result, Time, TimeInterval};
use std::fmt::Write;

const MAX_LISTED: usize = 8;

fn list(values: &[u64]) -> String {
    let mut out: Vec<String> = values
        .iter()
        .take(MAX_LISTED)
        .map(|v| format!("0x{:x}", v))
        .collect();
    if values.len() > MAX_LISTED {
        out.push(format!("... ({} total)", values.len()));
    }
    out.join(", ")
}

/// One line per record, preceded by the blob header.
pub fn format_blob(blob: &Blob) -> Result<String> {
    let data: CudaData = blob.decode_payload()?;
    let mut out = String::new();
    let header = &blob.header;

    // Writing to a String cannot fail.
    let _ = writeln!(
        out,
        "[{}] {} {} ({} records, {} stack frames, payload {}...)",
        header.id,
        header.thread_name(),
        header.time_interval(),
        data.messages.len(),
        data.stack_traces.len(),
        bytes_to_hex(&blob.payload[..blob.payload.len().min(8)])
    );

    for message in &data.messages {
        let _ = match message {
            CudaMessage::ContextInfo(m) => {
                writeln!(out, "  ContextInfo context=0x{:x} device={}", m.context, m.device)
            }
            CudaMessage::DeviceInfo(m) => writeln!(
                out,
                "  DeviceInfo device={} name={:?} cc={}.{} sms={} memory={}",
                m.device,
                m.name,
                m.compute_capability.0,
                m.compute_capability.1,
                m.multiprocessors,
                m.global_memory_size
            ),
            CudaMessage::SamplingConfig(m) => writeln!(
                out,
                "  SamplingConfig interval={} events=[{}]",
                m.interval,
                m.events
                    .iter()
                    .map(|e| format!(
                        "{} [{}] ({}, threshold {})",
                        short_name(&e.name),
                        e.name,
                        e.kind,
                        e.threshold
                    ))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CudaMessage::EnqueueRequest(m) => writeln!(
                out,
                "  EnqueueRequest {} time={} context=0x{:x} stream=0x{:x} correlation={} call_site=[{}]",
                m.kind,
                m.time,
                m.context,
                m.stream,
                m.correlation_id,
                list(data.stack_trace(m.call_site).unwrap_or(&[]))
            ),
            CudaMessage::CompletedExec(m) => writeln!(
                out,
                "  CompletedExec {} {} ({:?}) context=0x{:x} stream=0x{:x} correlation={} grid={} block={} cache={} regs={} shared={}+{} local={}",
                m.function,
                TimeInterval::from_half_open(m.time_begin, m.time_end.wrapping_add(1)),
                elapsed(Time::new(m.time_begin), Time::new(m.time_end)),
                m.context,
                m.stream,
                m.correlation_id,
                m.grid,
                m.block,
                m.cache_preference,
                m.registers_per_thread,
                m.static_shared_memory,
                m.dynamic_shared_memory,
                m.local_memory
            ),
            CudaMessage::CompletedXfer(m) => writeln!(
                out,
                "  CompletedXfer {} bytes {} {} ({} -> {}) context=0x{:x} stream=0x{:x} correlation={}{}",
                m.size,
                m.kind,
                TimeInterval::from_half_open(m.time_begin, m.time_end.wrapping_add(1)),
                m.source_kind,
                m.destination_kind,
                m.context,
                m.stream,
                m.correlation_id,
                if m.asynchronous { " async" } else { "" }
            ),
            CudaMessage::OverflowSamples(m) => writeln!(
                out,
                "  OverflowSamples [{}, {}] pcs=[{}] counts={}",
                m.time_begin,
                m.time_end,
                list(&m.pcs),
                m.counts.len()
            ),
            CudaMessage::PeriodicSamples(m) => {
                writeln!(out, "  PeriodicSamples time={} counts={:?}", m.time, m.counts)
            }
            CudaMessage::LoadedModule(m) => {
                writeln!(out, "  LoadedModule time={} handle=0x{:x} {}", m.time, m.handle, m.path)
            }
            CudaMessage::UnloadedModule(m) => {
                writeln!(out, "  UnloadedModule time={} handle=0x{:x}", m.time, m.handle)
            }
            CudaMessage::ResolvedFunction(m) => writeln!(
                out,
                "  ResolvedFunction time={} module=0x{:x} {} handle=0x{:x}",
                m.time, m.module_handle, m.function, m.handle
            ),
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{CompletedXfer, CopyKind, CounterDescription, MemoryKind, SamplingConfig};
    use crate::COLLECTOR_ID;
    use cudascope_shared::protocol::wire::{BlobHeader, ThreadRecord};
    use cudascope_shared::sampling::SampleKind;
    use cudascope_shared::ThreadName;

    #[test]
    fn test_sampling_config_uses_counter_names() {
        let data = CudaData {
            messages: vec![CudaMessage::SamplingConfig(SamplingConfig {
                interval: 10_000_000,
                events: vec![CounterDescription {
                    name: "PAPI_TOT_CYC".to_string(),
                    kind: SampleKind::Count,
                    threshold: 0,
                }],
            })],
            stack_traces: vec![],
        };
        let header = BlobHeader {
            experiment: 0,
            collector: 1,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(&ThreadName::new("h", 1, None, None)),
            time_begin: 0,
            time_end: 1,
        };
        let text = format_blob(&Blob::new(header, &data).unwrap()).unwrap();
        assert!(text.contains("Cycles [PAPI_TOT_CYC] (count, threshold 0)"));
    }

    #[test]
    fn test_dump_lists_records() {
        let data = CudaData {
            messages: vec![CudaMessage::CompletedXfer(CompletedXfer {
                context: 1,
                stream: 2,
                correlation_id: 3,
                time_begin: 10,
                time_end: 20,
                size: 4096,
                kind: CopyKind::HostToDevice,
                source_kind: MemoryKind::Pinned,
                destination_kind: MemoryKind::Device,
                asynchronous: true,
            })],
            stack_traces: vec![],
        };
        let header = BlobHeader {
            experiment: 0,
            collector: 1,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(&ThreadName::new("h", 1, None, None)),
            time_begin: 10,
            time_end: 21,
        };
        let text = format_blob(&Blob::new(header, &data).unwrap()).unwrap();
        assert!(text.starts_with("[cuda] h:1"));
        assert!(text.contains("CompletedXfer 4096 bytes HostToDevice"));
        assert!(text.contains("(Pinned -> Device)"));
        assert!(text.trim_end().ends_with("async"));
    }
}
