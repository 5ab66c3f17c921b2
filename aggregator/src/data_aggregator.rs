//! Collects CUDA performance data until the state manager asks for it,
//! then re-emits every thread's blobs with completions attributed to the
//! requesting thread.

use crate::component::{Component, Emitter};
use crate::config::DataAggregatorConfig;
use cudascope_gpu::{format_blob, visit_pcs, CudaData, PerformanceData, COLLECTOR_ID};
use cudascope_shared::protocol::wire::Blob;
use cudascope_shared::{Address, AddressSet, Message, Result};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct DataAggregator {
    config: DataAggregatorConfig,
    addresses: AddressSet,
    data: PerformanceData,
}

impl DataAggregator {
    pub fn new(config: DataAggregatorConfig) -> Self {
        Self {
            config,
            addresses: AddressSet::new(),
            data: PerformanceData::new(),
        }
    }

    pub fn addresses(&self) -> &AddressSet {
        &self.addresses
    }

    pub fn performance_data(&self) -> &PerformanceData {
        &self.data
    }

    fn dump(&self, direction: &str, blob: &Blob) {
        if !self.config.debug {
            return;
        }
        match format_blob(blob) {
            Ok(text) => println!("[DataAggregator] {}\n{}", direction, text),
            Err(e) => warn!(error = %e, "blob dump failed"),
        }
    }

    fn receive(&mut self, blob: Blob) -> Result<()> {
        if blob.header.id != COLLECTOR_ID {
            debug!(collector = %blob.header.id, "ignoring non-CUDA blob");
            return Ok(());
        }
        self.dump("received", &blob);

        let data: CudaData = blob.decode_payload()?;
        self.data.apply(&blob)?;

        let mut pcs = BTreeSet::new();
        visit_pcs(&data, |pc| {
            pcs.insert(Address::new(pc));
            true
        });
        if !pcs.is_empty() {
            self.addresses = self.addresses.union(&AddressSet::from_addresses(pcs));
        }
        Ok(())
    }

    fn emit_data(&self, out: &mut dyn Emitter) -> Result<()> {
        let mut emitted = 0usize;
        for thread in self.data.threads() {
            let mut blobs = Vec::new();
            self.data.visit_reshuffled_blobs(&thread, |blob| {
                blobs.push(blob.clone());
                true
            })?;
            for blob in blobs {
                self.dump("emitted", &blob);
                out.emit(Message::Data(blob));
                emitted += 1;
            }
        }
        info!(blobs = emitted, "emitted reshuffled performance data");
        Ok(())
    }
}

impl Default for DataAggregator {
    fn default() -> Self {
        Self::new(DataAggregatorConfig::default())
    }
}

impl Component for DataAggregator {
    fn name(&self) -> &'static str {
        "DataAggregator"
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(
            message,
            Message::Data(_) | Message::TriggerAddressBuffer(_) | Message::TriggerData(_)
        )
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        match message {
            Message::Data(blob) => self.receive(blob),
            Message::TriggerAddressBuffer(true) => {
                debug!(addresses = self.addresses.len(), "emitting address set");
                out.emit(Message::AddressSet(self.addresses.clone()));
                Ok(())
            }
            Message::TriggerData(true) => self.emit_data(out),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cudascope_gpu::messages::{EnqueueRequest, RequestKind};
    use cudascope_gpu::CudaMessage;
    use cudascope_shared::protocol::wire::{BlobHeader, ThreadRecord};
    use cudascope_shared::ThreadName;

    fn blob(id: &str) -> Blob {
        blob_with_call_site(id, 0)
    }

    fn blob_with_call_site(id: &str, call_site: u32) -> Blob {
        let header = BlobHeader {
            experiment: 0,
            collector: 1,
            id: id.to_string(),
            thread: ThreadRecord::from(&ThreadName::new("h", 1, Some(1), None)),
            time_begin: 0,
            time_end: 100,
        };
        let data = CudaData {
            messages: vec![CudaMessage::EnqueueRequest(EnqueueRequest {
                kind: RequestKind::MemoryCopy,
                time: 5,
                context: 1,
                stream: 1,
                correlation_id: 1,
                call_site,
            })],
            stack_traces: vec![0x400, 0x500, 0],
        };
        Blob::new(header, &data).unwrap()
    }

    #[test]
    fn test_triggers_with_no_data_emit_empty() {
        let mut aggregator = DataAggregator::new(DataAggregatorConfig { debug: false });
        let mut out = Vec::new();
        aggregator.handle(Message::TriggerData(true), &mut out).unwrap();
        assert!(out.is_empty());
        aggregator
            .handle(Message::TriggerAddressBuffer(true), &mut out)
            .unwrap();
        assert_eq!(out, vec![Message::AddressSet(AddressSet::new())]);
    }

    #[test]
    fn test_false_triggers_are_ignored() {
        let mut aggregator = DataAggregator::new(DataAggregatorConfig { debug: false });
        aggregator.handle(Message::Data(blob("cuda")), &mut Vec::new()).unwrap();
        let mut out = Vec::new();
        aggregator.handle(Message::TriggerData(false), &mut out).unwrap();
        aggregator
            .handle(Message::TriggerAddressBuffer(false), &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_collects_pcs_and_skips_foreign_collectors() {
        let mut aggregator = DataAggregator::new(DataAggregatorConfig { debug: true });
        let mut out = Vec::new();
        aggregator.handle(Message::Data(blob("pcsamp")), &mut out).unwrap();
        assert!(aggregator.addresses().is_empty());

        aggregator.handle(Message::Data(blob("cuda")), &mut out).unwrap();
        assert!(out.is_empty());
        assert!(aggregator.addresses().contains(Address::new(0x400)));
        assert_eq!(aggregator.addresses().len(), 2);
        assert_eq!(aggregator.performance_data().pending_requests(), 1);
    }

    #[test]
    fn test_rejected_blob_contributes_no_addresses() {
        let mut aggregator = DataAggregator::new(DataAggregatorConfig { debug: false });
        let mut out = Vec::new();
        assert!(aggregator
            .handle(Message::Data(blob_with_call_site("cuda", 9)), &mut out)
            .is_err());
        assert!(aggregator.addresses().is_empty());
        assert!(aggregator.performance_data().threads().is_empty());

        aggregator.handle(Message::TriggerData(true), &mut out).unwrap();
        assert!(out.is_empty());
    }
}
