//! Feature generator seam
//!
//! A [`FeatureGenerator`] turns a thread's performance data into feature
//! vectors. [`FeatureGeneratorComponent`] wires it into a pipeline: it keeps
//! the address spaces and the observed-address buffer, and calls the
//! generator when data arrives or when the leaf asks for output.

use cudascope_aggregator::{Component, Emitter};
use cudascope_shared::protocol::wire::{Blob, LinkedObjectGroup, ThreadRecord};
use cudascope_shared::{
    Address, AddressBuffer, AddressSpaces, FeatureVector, Message, Result, ThreadName,
};
use tracing::debug;

/// What a generator may do from inside a callback.
pub struct GeneratorContext<'a> {
    spaces: &'a AddressSpaces,
    buffer: &'a mut AddressBuffer,
    out: &'a mut dyn Emitter,
}

impl<'a> GeneratorContext<'a> {
    pub fn emit_performance_data(&mut self, blob: Blob) {
        self.out.emit(Message::Data(blob));
    }

    /// Count one observation of `address` in the buffer sent upstream.
    pub fn emit_observed_address(&mut self, address: Address) {
        self.buffer.update_address_counts(address);
    }

    pub fn emit_feature(&mut self, features: FeatureVector) {
        self.out.emit(Message::Feature(features));
    }

    /// Address spaces accumulated so far.
    pub fn spaces(&self) -> &AddressSpaces {
        self.spaces
    }
}

pub trait FeatureGenerator {
    fn name(&self) -> &'static str;

    /// Called for every incoming blob.
    fn on_performance_data(&mut self, blob: &Blob, ctx: &mut GeneratorContext<'_>) -> Result<()>;

    /// Re-emit the blobs of `thread`.
    fn on_emit_performance_data(
        &mut self,
        thread: &ThreadName,
        ctx: &mut GeneratorContext<'_>,
    ) -> Result<()>;

    /// Emit the feature vectors of `thread`.
    fn on_emit_features(&mut self, thread: &ThreadName, ctx: &mut GeneratorContext<'_>)
        -> Result<()>;
}

pub struct FeatureGeneratorComponent<G> {
    generator: G,
    spaces: AddressSpaces,
    buffer: AddressBuffer,
}

impl<G: FeatureGenerator> FeatureGeneratorComponent<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            spaces: AddressSpaces::new(),
            buffer: AddressBuffer::new(),
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn spaces(&self) -> &AddressSpaces {
        &self.spaces
    }

    pub fn buffer(&self) -> &AddressBuffer {
        &self.buffer
    }
}

/// The mappings of one thread, or an empty group when it has none.
fn linked_object_group(spaces: &AddressSpaces, thread: &ThreadName) -> LinkedObjectGroup {
    spaces
        .to_linked_object_groups()
        .into_iter()
        .find(|group| ThreadName::from(&group.thread) == *thread)
        .unwrap_or_else(|| LinkedObjectGroup {
            thread: ThreadRecord::from(thread),
            linkedobjects: Vec::new(),
        })
}

impl<G: FeatureGenerator> Component for FeatureGeneratorComponent<G> {
    fn name(&self) -> &'static str {
        self.generator.name()
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(
            message,
            Message::Data(_)
                | Message::InitialLinkedObjects(_)
                | Message::LinkedObjectGroup(_)
                | Message::LoadedLinkedObject(_)
                | Message::UnloadedLinkedObject(_)
                | Message::SymbolTable(_)
                | Message::EmitAddressBuffer(_)
                | Message::EmitData(_)
                | Message::EmitFeatures(_)
        )
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        let Self {
            generator,
            spaces,
            buffer,
        } = self;
        match message {
            Message::Data(blob) => {
                let mut ctx = GeneratorContext { spaces, buffer, out };
                generator.on_performance_data(&blob, &mut ctx)?;
            }
            Message::InitialLinkedObjects(groups) => {
                for group in &groups {
                    spaces.apply_linked_object_group(group);
                }
            }
            Message::LinkedObjectGroup(group) => spaces.apply_linked_object_group(&group),
            Message::LoadedLinkedObject(loaded) => spaces.apply_loaded(&loaded),
            Message::UnloadedLinkedObject(unloaded) => spaces.apply_unloaded(&unloaded)?,
            Message::SymbolTable(table) => spaces.apply_symbol_table(&table)?,
            Message::EmitAddressBuffer(true) => {
                debug!(addresses = buffer.len(), "emitting address buffer");
                out.emit(Message::AddressBuffer(buffer.clone()));
            }
            Message::EmitData(thread) => {
                out.emit(Message::LinkedObjectGroup(linked_object_group(spaces, &thread)));
                let mut ctx = GeneratorContext { spaces, buffer, out };
                generator.on_emit_performance_data(&thread, &mut ctx)?;
            }
            Message::EmitFeatures(thread) => {
                let mut ctx = GeneratorContext { spaces, buffer, out };
                generator.on_emit_features(&thread, &mut ctx)?;
            }
            _ => {}
        }
        Ok(())
    }
}
