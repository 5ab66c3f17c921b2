//! Counts observed program counters as performance data flows past.

use crate::component::{Component, Emitter};
use cudascope_gpu::{visit_pcs, CudaData, COLLECTOR_ID};
use cudascope_shared::{Address, AddressBuffer, Message, Result};
use tracing::debug;

#[derive(Debug, Default)]
pub struct AddressAggregator {
    buffer: AddressBuffer,
}

impl AddressAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &AddressBuffer {
        &self.buffer
    }
}

impl Component for AddressAggregator {
    fn name(&self) -> &'static str {
        "AddressAggregator"
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(message, Message::Data(_) | Message::ThreadsFinished(_))
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        match message {
            Message::Data(blob) => {
                if blob.header.id == COLLECTOR_ID {
                    let data: CudaData = blob.decode_payload()?;
                    visit_pcs(&data, |pc| {
                        self.buffer.update_address_counts(Address::new(pc));
                        true
                    });
                }
                out.emit(Message::Data(blob));
            }
            Message::ThreadsFinished(finished) => {
                if finished {
                    debug!(
                        addresses = self.buffer.len(),
                        total = self.buffer.total(),
                        "emitting address buffer"
                    );
                    out.emit(Message::AddressBuffer(self.buffer.clone()));
                }
                out.emit(Message::ThreadsFinished(finished));
            }
            _ => {}
        }
        Ok(())
    }
}
