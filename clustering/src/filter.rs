//! Interior node of the clustering tree
//!
//! Unions the address buffers of its children and forwards a single buffer
//! once every child has reported; forwards one ThreadsFinished once every
//! child has finished. Everything else passes through untouched.

use cudascope_aggregator::{Component, Emitter};
use cudascope_shared::{AddressBuffer, Message, Result};
use tracing::debug;

#[derive(Debug)]
pub struct ClusteringFilter {
    fan_in: usize,
    buffer: AddressBuffer,
    reported: usize,
    finished: usize,
    all_finished: bool,
}

impl ClusteringFilter {
    /// A filter with `fan_in` children (at least one).
    pub fn new(fan_in: usize) -> Self {
        Self {
            fan_in: fan_in.max(1),
            buffer: AddressBuffer::new(),
            reported: 0,
            finished: 0,
            all_finished: true,
        }
    }

    pub fn fan_in(&self) -> usize {
        self.fan_in
    }
}

impl Default for ClusteringFilter {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Component for ClusteringFilter {
    fn name(&self) -> &'static str {
        "ClusteringFilter"
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(
            message,
            Message::AddressBuffer(_) | Message::ThreadsFinished(_)
        )
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        match message {
            Message::AddressBuffer(buffer) => {
                self.buffer.merge(&buffer);
                self.reported += 1;
                debug!(reported = self.reported, fan_in = self.fan_in, "address buffer");
                if self.reported == self.fan_in {
                    out.emit(Message::AddressBuffer(std::mem::take(&mut self.buffer)));
                    self.reported = 0;
                }
            }
            Message::ThreadsFinished(finished) => {
                self.finished += 1;
                self.all_finished &= finished;
                if self.finished == self.fan_in {
                    out.emit(Message::ThreadsFinished(self.all_finished));
                    self.finished = 0;
                    self.all_finished = true;
                }
            }
            other => out.emit(other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cudascope_shared::Address;

    fn buffer(pairs: &[(u64, u64)]) -> AddressBuffer {
        let mut buffer = AddressBuffer::new();
        for &(a, c) in pairs {
            buffer.add(Address::new(a), c);
        }
        buffer
    }

    #[test]
    fn test_waits_for_every_child() {
        let mut filter = ClusteringFilter::new(2);
        let mut out = Vec::new();

        filter
            .handle(Message::AddressBuffer(buffer(&[(0x10, 1)])), &mut out)
            .unwrap();
        filter.handle(Message::ThreadsFinished(true), &mut out).unwrap();
        assert!(out.is_empty());

        filter
            .handle(Message::AddressBuffer(buffer(&[(0x10, 2), (0x20, 1)])), &mut out)
            .unwrap();
        filter.handle(Message::ThreadsFinished(true), &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                Message::AddressBuffer(buffer(&[(0x10, 3), (0x20, 1)])),
                Message::ThreadsFinished(true),
            ]
        );
    }

    #[test]
    fn test_passes_other_messages_through() {
        let mut filter = ClusteringFilter::default();
        let mut out = Vec::new();
        filter
            .handle(Message::EmitAddressBuffer(true), &mut out)
            .unwrap();
        assert_eq!(out, vec![Message::EmitAddressBuffer(true)]);
    }
}
