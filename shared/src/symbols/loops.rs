use super::{handle_identity, Function, LinkedObject, LoopEntry, SymbolTable};
use crate::types::{Address, AddressSet};
use std::fmt;

/// A source-code loop, identified by the address of its head.
#[derive(Debug, Clone)]
pub struct Loop {
    table: SymbolTable,
    id: usize,
}

handle_identity!(Loop);

impl Loop {
    pub fn new(linked_object: &LinkedObject, head: Address) -> Self {
        let table = linked_object.symbol_table().clone();
        let mut tables = table.write();
        tables.loops.push(LoopEntry {
            linked_object: linked_object.id(),
            head,
            ranges: AddressSet::new(),
        });
        let id = tables.loops.len() - 1;
        drop(tables);
        Self::from_parts(table, id)
    }

    pub fn linked_object(&self) -> LinkedObject {
        let owner = self.table.read().loops[self.id].linked_object;
        LinkedObject::from_parts(self.table.clone(), owner)
    }

    pub fn head(&self) -> Address {
        self.table.read().loops[self.id].head
    }

    pub fn address_ranges(&self) -> AddressSet {
        self.table.read().loops[self.id].ranges.clone()
    }

    pub fn add_address_ranges(&self, ranges: &AddressSet) {
        let mut tables = self.table.write();
        let entry = &mut tables.loops[self.id];
        entry.ranges = entry.ranges.union(ranges);
    }

    /// Functions containing the loop head.
    pub fn functions(&self) -> Vec<Function> {
        self.linked_object().functions_at(self.head())
    }

    pub fn equivalent(&self, other: &Loop) -> bool {
        self.head() == other.head() && self.address_ranges() == other.address_ranges()
    }
}

impl fmt::Display for Loop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop@{}", self.head())
    }
}
