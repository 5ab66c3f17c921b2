//! Messages exchanged between pipeline components
//!
//! Each variant corresponds to one named port type. Components match on the
//! variants they consume and pass the rest through or ignore them.

pub mod wire;

use crate::types::{AddressBuffer, AddressSet, FeatureVector, ThreadName};
use serde::{Deserialize, Serialize};
use wire::{
    AttachedToThreads, Blob, LinkedObjectGroup, LoadedLinkedObject, SymbolTableMessage,
    ThreadsStateChanged, UnloadedLinkedObject,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// A performance-data blob.
    Data(Blob),
    /// Observed program counters with their counts.
    AddressBuffer(AddressBuffer),
    /// Observed program counters as a set.
    AddressSet(AddressSet),
    AttachedToThreads(AttachedToThreads),
    /// The linked objects of every thread at attach time.
    InitialLinkedObjects(Vec<LinkedObjectGroup>),
    LinkedObjectGroup(LinkedObjectGroup),
    LoadedLinkedObject(LoadedLinkedObject),
    UnloadedLinkedObject(UnloadedLinkedObject),
    ThreadsStateChanged(ThreadsStateChanged),
    SymbolTable(SymbolTableMessage),
    ThreadsFinished(bool),
    TriggerAddressBuffer(bool),
    TriggerData(bool),
    EmitAddressBuffer(bool),
    EmitData(ThreadName),
    EmitFeatures(ThreadName),
    Feature(FeatureVector),
}

impl Message {
    /// Port name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Data(_) => "Data",
            Message::AddressBuffer(_) => "AddressBuffer",
            Message::AddressSet(_) => "AddressSet",
            Message::AttachedToThreads(_) => "AttachedToThreads",
            Message::InitialLinkedObjects(_) => "InitialLinkedObjects",
            Message::LinkedObjectGroup(_) => "LinkedObjectGroup",
            Message::LoadedLinkedObject(_) => "LoadedLinkedObject",
            Message::UnloadedLinkedObject(_) => "UnloadedLinkedObject",
            Message::ThreadsStateChanged(_) => "ThreadsStateChanged",
            Message::SymbolTable(_) => "SymbolTable",
            Message::ThreadsFinished(_) => "ThreadsFinished",
            Message::TriggerAddressBuffer(_) => "TriggerAddressBuffer",
            Message::TriggerData(_) => "TriggerData",
            Message::EmitAddressBuffer(_) => "EmitAddressBuffer",
            Message::EmitData(_) => "EmitData",
            Message::EmitFeatures(_) => "EmitFeatures",
            Message::Feature(_) => "Feature",
        }
    }
}
