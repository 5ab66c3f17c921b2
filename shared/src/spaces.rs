//! Per-thread address spaces
//!
//! Tracks which linked objects each thread had loaded, over which address
//! ranges, during which time intervals. Mappings live in an arena and are
//! reached through three ordered indexes: by thread, by linked object and by
//! `(thread, linked object)`. Linked objects are shared between mappings and
//! looked up by [`FileName`].

use crate::error::{Error, Result};
use crate::protocol::wire::{
    AttachedToThreads, FileRecord, LinkedObjectGroup, LinkedObjectRecord, LoadedLinkedObject,
    RangeRecord, SymbolTableMessage, ThreadRecord, UnloadedLinkedObject,
};
use crate::symbols::LinkedObject;
use crate::types::{AddressRange, FileName, ThreadName, Time, TimeInterval};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// One linked object loaded into one thread's address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub thread: ThreadName,
    pub linked_object: LinkedObject,
    pub range: AddressRange,
    pub interval: TimeInterval,
    pub is_executable: bool,
}

impl Mapping {
    /// Whether the mapping is still open (not yet unloaded).
    pub fn is_loaded(&self) -> bool {
        self.interval.end() == Time::THE_END
    }
}

#[derive(Debug, Default, Clone)]
pub struct AddressSpaces {
    mappings: Vec<Mapping>,
    by_thread: BTreeMap<ThreadName, Vec<usize>>,
    by_linked_object: BTreeMap<LinkedObject, Vec<usize>>,
    by_thread_linked_object: BTreeMap<(ThreadName, LinkedObject), Vec<usize>>,
    // Keyed by path; several checksums of one path may coexist.
    linked_objects: BTreeMap<PathBuf, Vec<LinkedObject>>,
}

impl AddressSpaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// The cached linked object for `file`, if any.
    pub fn linked_object(&self, file: &FileName) -> Option<LinkedObject> {
        self.linked_objects
            .get(file.path())?
            .iter()
            .find(|lo| lo.file() == *file)
            .cloned()
    }

    fn linked_object_or_insert(&mut self, file: FileName) -> LinkedObject {
        if let Some(existing) = self.linked_object(&file) {
            return existing;
        }
        let linked_object = LinkedObject::new(file.clone());
        self.linked_objects
            .entry(file.path().to_path_buf())
            .or_default()
            .push(linked_object.clone());
        linked_object
    }

    fn insert(&mut self, mapping: Mapping) {
        let index = self.mappings.len();
        self.by_thread
            .entry(mapping.thread.clone())
            .or_default()
            .push(index);
        self.by_linked_object
            .entry(mapping.linked_object.clone())
            .or_default()
            .push(index);
        self.by_thread_linked_object
            .entry((mapping.thread.clone(), mapping.linked_object.clone()))
            .or_default()
            .push(index);
        self.mappings.push(mapping);
    }

    /// Insert one mapping per entry of a thread's initial linked objects.
    pub fn apply_linked_object_group(&mut self, message: &LinkedObjectGroup) {
        let thread = ThreadName::from(&message.thread);
        for record in &message.linkedobjects {
            let linked_object = self.linked_object_or_insert(FileName::from(&record.linked_object));
            self.insert(Mapping {
                thread: thread.clone(),
                linked_object,
                range: AddressRange::from(record.range),
                interval: TimeInterval::from(RangeRecord {
                    begin: record.time_begin,
                    end: record.time_end,
                }),
                is_executable: record.is_executable,
            });
        }
    }

    pub fn apply_loaded(&mut self, message: &LoadedLinkedObject) {
        let linked_object = self.linked_object_or_insert(FileName::from(&message.linked_object));
        let range = AddressRange::from(message.range);
        for thread in &message.threads {
            self.load_mapping(
                ThreadName::from(thread),
                linked_object.clone(),
                range,
                Time::new(message.time),
                message.is_executable,
            );
        }
    }

    pub fn apply_unloaded(&mut self, message: &UnloadedLinkedObject) -> Result<()> {
        let file = FileName::from(&message.linked_object);
        let linked_object = self.linked_object(&file).ok_or_else(|| {
            Error::state_violation(format!("unload of unknown linked object {}", file))
        })?;
        for thread in &message.threads {
            self.unload(&ThreadName::from(thread), &linked_object, Time::new(message.time))?;
        }
        Ok(())
    }

    /// Attach a symbol table. A new file gets a new linked object; a known
    /// file has its linked object replaced in every mapping that used it.
    pub fn apply_symbol_table(&mut self, message: &SymbolTableMessage) -> Result<()> {
        let replacement = LinkedObject::from_message(message)?;
        let file = replacement.file();

        let Some(previous) = self.linked_object(&file) else {
            self.linked_objects
                .entry(file.path().to_path_buf())
                .or_default()
                .push(replacement);
            return Ok(());
        };

        if let Some(cached) = self
            .linked_objects
            .get_mut(file.path())
            .and_then(|v| v.iter_mut().find(|lo| **lo == previous))
        {
            *cached = replacement.clone();
        }

        let indices = self.by_linked_object.remove(&previous).unwrap_or_default();
        debug!(
            file = %file,
            mappings = indices.len(),
            "replacing linked object with symbol-bearing copy"
        );
        for &index in &indices {
            let thread = self.mappings[index].thread.clone();
            if let Some(mut keyed) = self
                .by_thread_linked_object
                .remove(&(thread.clone(), previous.clone()))
            {
                self.by_thread_linked_object
                    .entry((thread, replacement.clone()))
                    .or_default()
                    .append(&mut keyed);
            }
            self.mappings[index].linked_object = replacement.clone();
        }
        if !indices.is_empty() {
            self.by_linked_object.insert(replacement, indices);
        }
        Ok(())
    }

    /// Record `linked_object` as loaded into `thread` from `when` onwards.
    pub fn load(
        &mut self,
        thread: ThreadName,
        linked_object: LinkedObject,
        range: AddressRange,
        when: Time,
    ) {
        self.load_mapping(thread, linked_object, range, when, false);
    }

    fn load_mapping(
        &mut self,
        thread: ThreadName,
        linked_object: LinkedObject,
        range: AddressRange,
        when: Time,
        is_executable: bool,
    ) {
        self.insert(Mapping {
            thread,
            linked_object,
            range,
            interval: TimeInterval::new(when, Time::THE_END),
            is_executable,
        });
    }

    /// Close every open mapping of `linked_object` in `thread` at `when`.
    pub fn unload(
        &mut self,
        thread: &ThreadName,
        linked_object: &LinkedObject,
        when: Time,
    ) -> Result<()> {
        let open: Vec<usize> = self
            .by_thread_linked_object
            .get(&(thread.clone(), linked_object.clone()))
            .map(|indices| {
                indices
                    .iter()
                    .copied()
                    .filter(|&i| self.mappings[i].is_loaded())
                    .collect()
            })
            .unwrap_or_default();

        if open.is_empty() {
            return Err(Error::state_violation(format!(
                "{} is not loaded in thread {}",
                linked_object, thread
            )));
        }
        for index in open {
            let mapping = &mut self.mappings[index];
            mapping.interval = TimeInterval::new(mapping.interval.begin(), when);
        }
        Ok(())
    }

    pub fn threads(&self) -> Vec<ThreadName> {
        self.by_thread.keys().cloned().collect()
    }

    pub fn visit_threads<F>(&self, mut visitor: F)
    where
        F: FnMut(&ThreadName) -> bool,
    {
        for thread in self.by_thread.keys() {
            if !visitor(thread) {
                return;
            }
        }
    }

    /// Every known linked object, mapped or not.
    pub fn visit_linked_objects<F>(&self, mut visitor: F)
    where
        F: FnMut(&LinkedObject) -> bool,
    {
        for linked_object in self.linked_objects.values().flatten() {
            if !visitor(linked_object) {
                return;
            }
        }
    }

    /// Linked objects mapped into one thread, each once.
    pub fn visit_thread_linked_objects<F>(&self, thread: &ThreadName, mut visitor: F)
    where
        F: FnMut(&LinkedObject) -> bool,
    {
        let mut seen = Vec::<&LinkedObject>::new();
        for index in self.by_thread.get(thread).into_iter().flatten() {
            let linked_object = &self.mappings[*index].linked_object;
            if seen.contains(&linked_object) {
                continue;
            }
            seen.push(linked_object);
            if !visitor(linked_object) {
                return;
            }
        }
    }

    pub fn visit_mappings<F>(&self, mut visitor: F)
    where
        F: FnMut(&Mapping) -> bool,
    {
        for mapping in &self.mappings {
            if !visitor(mapping) {
                return;
            }
        }
    }

    pub fn visit_thread_mappings<F>(&self, thread: &ThreadName, mut visitor: F)
    where
        F: FnMut(&Mapping) -> bool,
    {
        for index in self.by_thread.get(thread).into_iter().flatten() {
            if !visitor(&self.mappings[*index]) {
                return;
            }
        }
    }

    pub fn visit_linked_object_mappings<F>(&self, linked_object: &LinkedObject, mut visitor: F)
    where
        F: FnMut(&Mapping) -> bool,
    {
        for index in self.by_linked_object.get(linked_object).into_iter().flatten() {
            if !visitor(&self.mappings[*index]) {
                return;
            }
        }
    }

    /// Mappings of `thread` that overlap both `range` and `interval`.
    pub fn visit_mappings_in<F>(
        &self,
        thread: &ThreadName,
        range: &AddressRange,
        interval: &TimeInterval,
        mut visitor: F,
    ) where
        F: FnMut(&Mapping) -> bool,
    {
        self.visit_thread_mappings(thread, |mapping| {
            if mapping.range.intersects(range) && mapping.interval.intersects(interval) {
                visitor(mapping)
            } else {
                true
            }
        });
    }

    /// Same mappings on `(thread, file, range, interval)`, whichever linked
    /// object handles carry them.
    pub fn equivalent(&self, other: &AddressSpaces) -> bool {
        fn covered(lhs: &AddressSpaces, rhs: &AddressSpaces) -> bool {
            lhs.mappings.iter().all(|m| {
                let file = m.linked_object.file();
                rhs.by_thread
                    .get(&m.thread)
                    .into_iter()
                    .flatten()
                    .map(|&i| &rhs.mappings[i])
                    .any(|n| {
                        n.range == m.range
                            && n.interval == m.interval
                            && n.linked_object.file() == file
                    })
            })
        }
        covered(self, other) && covered(other, self)
    }

    /// Every thread with at least one mapping.
    pub fn to_attached_to_threads(&self) -> AttachedToThreads {
        AttachedToThreads {
            threads: self.by_thread.keys().map(ThreadRecord::from).collect(),
        }
    }

    /// One group per thread listing its mappings.
    pub fn to_linked_object_groups(&self) -> Vec<LinkedObjectGroup> {
        self.by_thread
            .iter()
            .map(|(thread, indices)| LinkedObjectGroup {
                thread: ThreadRecord::from(thread),
                linkedobjects: indices
                    .iter()
                    .map(|&i| {
                        let m = &self.mappings[i];
                        let interval = RangeRecord::from(m.interval);
                        LinkedObjectRecord {
                            linked_object: FileRecord::from(&m.linked_object.file()),
                            range: RangeRecord::from(m.range),
                            time_begin: interval.begin,
                            time_end: interval.end,
                            is_executable: m.is_executable,
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}
