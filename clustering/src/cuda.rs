//! Per-thread features of CUDA kernel launches and memory copies.

use crate::generator::{FeatureGenerator, GeneratorContext};
use cudascope_gpu::{visit_pcs, CudaData, PerformanceData, COLLECTOR_ID};
use cudascope_shared::protocol::wire::Blob;
use cudascope_shared::{Address, Feature, FeatureVector, Result, ThreadName, TimeInterval};
use tracing::debug;

pub const FEATURE_VECTOR_NAME: &str = "cuda";

#[derive(Debug, Default)]
pub struct CudaFeatureGenerator {
    data: PerformanceData,
}

impl CudaFeatureGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performance_data(&self) -> &PerformanceData {
        &self.data
    }

    /// Kernel count, total and mean kernel time, transfer count, bytes
    /// transferred and total transfer time. Times are in nanoseconds.
    pub fn features(&self, thread: &ThreadName) -> Result<FeatureVector> {
        let everything = TimeInterval::full();

        let mut kernels = 0u64;
        let mut kernel_time = 0u64;
        self.data
            .visit_kernel_executions(thread, &everything, |kernel| {
                kernels += 1;
                kernel_time = kernel_time.saturating_add(kernel.duration());
                true
            });

        let mut transfers = 0u64;
        let mut bytes = 0u64;
        let mut transfer_time = 0u64;
        self.data.visit_data_transfers(thread, &everything, |transfer| {
            transfers += 1;
            bytes = bytes.saturating_add(transfer.size);
            transfer_time = transfer_time.saturating_add(
                transfer
                    .time_end
                    .value()
                    .saturating_sub(transfer.time_begin.value()),
            );
            true
        });

        let mean_kernel_time = if kernels == 0 {
            0.0
        } else {
            kernel_time as f64 / kernels as f64
        };

        let mut vector = FeatureVector::new(FEATURE_VECTOR_NAME, thread.clone());
        vector.add(Feature::named("kernel_count", kernels as f32))?;
        vector.add(Feature::named("kernel_time", kernel_time as f32))?;
        vector.add(Feature::named("transfer_count", transfers as f32))?;
        vector.add(Feature::named("transfer_bytes", bytes as f32))?;
        vector.add(Feature::named("transfer_time", transfer_time as f32))?;
        vector.add(Feature::named("mean_kernel_time", mean_kernel_time as f32))?;
        Ok(vector)
    }
}

impl FeatureGenerator for CudaFeatureGenerator {
    fn name(&self) -> &'static str {
        "CudaFeatureGenerator"
    }

    fn on_performance_data(&mut self, blob: &Blob, ctx: &mut GeneratorContext<'_>) -> Result<()> {
        if blob.header.id != COLLECTOR_ID {
            debug!(collector = %blob.header.id, "ignoring non-CUDA blob");
            return Ok(());
        }
        let data: CudaData = blob.decode_payload()?;
        visit_pcs(&data, |pc| {
            ctx.emit_observed_address(Address::new(pc));
            true
        });
        self.data.apply(blob)
    }

    fn on_emit_performance_data(
        &mut self,
        thread: &ThreadName,
        ctx: &mut GeneratorContext<'_>,
    ) -> Result<()> {
        let mut blobs = Vec::new();
        self.data.visit_reshuffled_blobs(thread, |blob| {
            blobs.push(blob.clone());
            true
        })?;
        for blob in blobs {
            ctx.emit_performance_data(blob);
        }
        Ok(())
    }

    fn on_emit_features(&mut self, thread: &ThreadName, ctx: &mut GeneratorContext<'_>) -> Result<()> {
        let vector = self.features(thread)?;
        debug!(thread = %thread, features = vector.len(), "emitting features");
        ctx.emit_feature(vector);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::FeatureGeneratorComponent;
    use cudascope_aggregator::Component;
    use cudascope_gpu::messages::{
        CompletedExec, CompletedXfer, CopyKind, EnqueueRequest, MemoryKind, RequestKind, Vector3,
    };
    use cudascope_gpu::CudaMessage;
    use cudascope_shared::protocol::wire::{BlobHeader, ThreadRecord};
    use cudascope_shared::Message;

    fn thread() -> ThreadName {
        ThreadName::new("gpu01", 42, Some(1), None)
    }

    fn request(kind: RequestKind, correlation_id: u32, time: u64) -> CudaMessage {
        CudaMessage::EnqueueRequest(EnqueueRequest {
            kind,
            time,
            context: 1,
            stream: 1,
            correlation_id,
            call_site: 0,
        })
    }

    fn header() -> BlobHeader {
        BlobHeader {
            experiment: 0,
            collector: 1,
            id: COLLECTOR_ID.to_string(),
            thread: ThreadRecord::from(&thread()),
            time_begin: 0,
            time_end: 1_000,
        }
    }

    fn transfer(correlation_id: u32, size: u64, time_end: u64) -> CudaMessage {
        CudaMessage::CompletedXfer(CompletedXfer {
            context: 1,
            stream: 1,
            correlation_id,
            time_begin: 0,
            time_end,
            size,
            kind: CopyKind::HostToDevice,
            source_kind: MemoryKind::Pinned,
            destination_kind: MemoryKind::Device,
            asynchronous: true,
        })
    }

    fn blob() -> Blob {
        let header = header();
        let messages = vec![
            request(RequestKind::ExecuteKernel, 1, 10),
            CudaMessage::CompletedExec(CompletedExec {
                context: 1,
                stream: 1,
                correlation_id: 1,
                time_begin: 100,
                time_end: 400,
                function: "saxpy".to_string(),
                grid: Vector3::new(4, 1, 1),
                block: Vector3::new(256, 1, 1),
                cache_preference: Default::default(),
                registers_per_thread: 16,
                static_shared_memory: 0,
                dynamic_shared_memory: 0,
                local_memory: 0,
            }),
            request(RequestKind::MemoryCopy, 2, 500),
            CudaMessage::CompletedXfer(CompletedXfer {
                context: 1,
                stream: 1,
                correlation_id: 2,
                time_begin: 600,
                time_end: 700,
                size: 4096,
                kind: CopyKind::DeviceToHost,
                source_kind: MemoryKind::Device,
                destination_kind: MemoryKind::Pageable,
                asynchronous: false,
            }),
        ];
        Blob::new(
            header,
            &CudaData {
                messages,
                stack_traces: vec![0x401000, 0x400800, 0],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_features_summarize_kernels_and_transfers() {
        let mut component = FeatureGeneratorComponent::new(CudaFeatureGenerator::new());
        let mut out = Vec::new();
        component.handle(Message::Data(blob()), &mut out).unwrap();
        assert!(out.is_empty());
        assert_eq!(component.buffer().count(Address::new(0x401000)), 2);
        assert_eq!(component.buffer().count(Address::new(0x400800)), 2);

        component
            .handle(Message::EmitFeatures(thread()), &mut out)
            .unwrap();
        let vector = match out.as_slice() {
            [Message::Feature(vector)] => vector,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(vector.name(), FEATURE_VECTOR_NAME);
        assert_eq!(vector.thread(), &thread());
        assert_eq!(vector.values(), vec![1.0, 300.0, 1.0, 4096.0, 100.0, 300.0]);
        assert_eq!(vector.features()[3].name_str(), Some("transfer_bytes"));
    }

    #[test]
    fn test_thread_without_data_has_zero_features() {
        let generator = CudaFeatureGenerator::new();
        let vector = generator.features(&thread()).unwrap();
        assert_eq!(vector.values(), vec![0.0; 6]);
    }

    #[test]
    fn test_other_collectors_are_ignored() {
        let mut component = FeatureGeneratorComponent::new(CudaFeatureGenerator::new());
        let mut other = blob();
        other.header.id = "pcsamp".to_string();
        let mut out = Vec::new();
        component.handle(Message::Data(other), &mut out).unwrap();
        assert!(component.buffer().is_empty());
        assert!(component.generator().performance_data().threads().is_empty());
    }

    #[test]
    fn test_totals_saturate() {
        let mut component = FeatureGeneratorComponent::new(CudaFeatureGenerator::new());
        let messages = vec![
            request(RequestKind::MemoryCopy, 1, 0),
            transfer(1, u64::MAX - 1, u64::MAX),
            request(RequestKind::MemoryCopy, 2, 0),
            transfer(2, 16, u64::MAX),
        ];
        let data = CudaData {
            messages,
            stack_traces: vec![0x401000, 0],
        };
        let mut out = Vec::new();
        component
            .handle(Message::Data(Blob::new(header(), &data).unwrap()), &mut out)
            .unwrap();

        let vector = component.generator().features(&thread()).unwrap();
        assert_eq!(vector.values()[2], 2.0);
        assert_eq!(vector.values()[3], u64::MAX as f32);
        assert_eq!(vector.values()[4], u64::MAX as f32);
    }
}
