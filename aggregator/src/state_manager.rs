//! Tracks attached threads and their address spaces, and fires the
//! terminal sequence once every thread has terminated.

use crate::component::{Component, Emitter};
use cudascope_shared::protocol::wire::{ThreadRecord, ThreadState, ThreadsStateChanged};
use cudascope_shared::{AddressSpaces, Message, Result, ThreadName};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Thread lifecycle bookkeeping shared by components that wait for every
/// attached thread to terminate.
#[derive(Debug, Default)]
pub struct ThreadTracker {
    threads: BTreeMap<ThreadName, ThreadState>,
    finished: bool,
}

impl ThreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a thread as running. Known threads keep their state.
    pub fn attach(&mut self, record: &ThreadRecord) {
        self.threads
            .entry(ThreadName::from(record))
            .or_insert(ThreadState::Running);
    }

    /// Apply a state change. Returns true exactly once: when the last
    /// tracked thread terminates. Unknown threads are logged and ignored.
    pub fn update(&mut self, changed: &ThreadsStateChanged) -> bool {
        for record in &changed.threads {
            let thread = ThreadName::from(record);
            match self.threads.get_mut(&thread) {
                Some(state) => *state = changed.state,
                None => {
                    warn!(thread = %thread, state = %changed.state, "state change for unknown thread")
                }
            }
        }
        if changed.state == ThreadState::Terminated && !self.finished && self.all_terminated() {
            self.finished = true;
            return true;
        }
        false
    }

    fn all_terminated(&self) -> bool {
        !self.threads.is_empty()
            && self
                .threads
                .values()
                .all(|&state| state == ThreadState::Terminated)
    }

    pub fn state(&self, thread: &ThreadName) -> Option<ThreadState> {
        self.threads.get(thread).copied()
    }

    /// Every thread ever attached, in order.
    pub fn threads(&self) -> impl Iterator<Item = &ThreadName> {
        self.threads.keys()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[derive(Debug, Default)]
pub struct StateManager {
    spaces: AddressSpaces,
    tracker: ThreadTracker,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spaces(&self) -> &AddressSpaces {
        &self.spaces
    }

    pub fn thread_state(&self, thread: &ThreadName) -> Option<ThreadState> {
        self.tracker.state(thread)
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_finished()
    }

    /// Everything the frontend learns about threads and mappings here comes
    /// from the address spaces, not from the attach bookkeeping.
    fn emit_terminal_sequence(&self, out: &mut dyn Emitter) {
        let attached = self.spaces.to_attached_to_threads();
        info!(
            tracked = self.tracker.len(),
            mapped = attached.threads.len(),
            "all threads terminated"
        );

        out.emit(Message::TriggerData(true));
        out.emit(Message::AttachedToThreads(attached));
        out.emit(Message::TriggerAddressBuffer(true));
        for group in self.spaces.to_linked_object_groups() {
            out.emit(Message::LinkedObjectGroup(group));
        }
        out.emit(Message::ThreadsFinished(true));
    }
}

impl Component for StateManager {
    fn name(&self) -> &'static str {
        "StateManager"
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(
            message,
            Message::AttachedToThreads(_)
                | Message::InitialLinkedObjects(_)
                | Message::LoadedLinkedObject(_)
                | Message::UnloadedLinkedObject(_)
                | Message::ThreadsStateChanged(_)
                | Message::SymbolTable(_)
        )
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        match message {
            Message::AttachedToThreads(attached) => {
                for record in &attached.threads {
                    self.tracker.attach(record);
                }
                debug!(threads = self.tracker.len(), "attached");
            }
            Message::InitialLinkedObjects(groups) => {
                for group in &groups {
                    self.tracker.attach(&group.thread);
                    self.spaces.apply_linked_object_group(group);
                }
            }
            Message::LoadedLinkedObject(loaded) => self.spaces.apply_loaded(&loaded),
            Message::UnloadedLinkedObject(unloaded) => self.spaces.apply_unloaded(&unloaded)?,
            Message::SymbolTable(table) => self.spaces.apply_symbol_table(&table)?,
            Message::ThreadsStateChanged(changed) => {
                if self.tracker.update(&changed) {
                    self.emit_terminal_sequence(out);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
