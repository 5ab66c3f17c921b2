use super::{handle_identity, Function, LinkedObject, StatementEntry, SymbolTable};
use crate::types::{AddressSet, FileName};
use std::fmt;

/// A source-code statement: one line (and column) of one file.
#[derive(Debug, Clone)]
pub struct Statement {
    table: SymbolTable,
    id: usize,
}

handle_identity!(Statement);

impl Statement {
    pub fn new(linked_object: &LinkedObject, file: FileName, line: u32, column: u32) -> Self {
        let table = linked_object.symbol_table().clone();
        let mut tables = table.write();
        tables.statements.push(StatementEntry {
            linked_object: linked_object.id(),
            file,
            line,
            column,
            ranges: AddressSet::new(),
        });
        let id = tables.statements.len() - 1;
        drop(tables);
        Self::from_parts(table, id)
    }

    pub fn linked_object(&self) -> LinkedObject {
        let owner = self.table.read().statements[self.id].linked_object;
        LinkedObject::from_parts(self.table.clone(), owner)
    }

    pub fn file(&self) -> FileName {
        self.table.read().statements[self.id].file.clone()
    }

    pub fn line(&self) -> u32 {
        self.table.read().statements[self.id].line
    }

    pub fn column(&self) -> u32 {
        self.table.read().statements[self.id].column
    }

    pub fn address_ranges(&self) -> AddressSet {
        self.table.read().statements[self.id].ranges.clone()
    }

    pub fn add_address_ranges(&self, ranges: &AddressSet) {
        let mut tables = self.table.write();
        let entry = &mut tables.statements[self.id];
        entry.ranges = entry.ranges.union(ranges);
    }

    /// Functions sharing at least one address with this statement.
    pub fn functions(&self) -> Vec<Function> {
        let ranges = self.address_ranges();
        self.linked_object()
            .functions()
            .into_iter()
            .filter(|f| !ranges.intersection(&f.address_ranges()).is_empty())
            .collect()
    }

    pub fn equivalent(&self, other: &Statement) -> bool {
        self.file() == other.file()
            && self.line() == other.line()
            && self.column() == other.column()
            && self.address_ranges() == other.address_ranges()
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file(), self.line(), self.column())
    }
}
