use super::{handle_identity, FunctionEntry, LinkedObject, Loop, Statement, SymbolTable};
use crate::types::AddressSet;
use std::fmt;

/// A source-code function within a linked object.
#[derive(Debug, Clone)]
pub struct Function {
    table: SymbolTable,
    id: usize,
}

handle_identity!(Function);

impl Function {
    /// Add a function, with no address ranges yet, to `linked_object`.
    pub fn new(linked_object: &LinkedObject, name: &str) -> Self {
        let table = linked_object.symbol_table().clone();
        let mut tables = table.write();
        tables.functions.push(FunctionEntry {
            linked_object: linked_object.id(),
            name: name.to_string(),
            ranges: AddressSet::new(),
        });
        let id = tables.functions.len() - 1;
        drop(tables);
        Self::from_parts(table, id)
    }

    pub fn linked_object(&self) -> LinkedObject {
        let owner = self.table.read().functions[self.id].linked_object;
        LinkedObject::from_parts(self.table.clone(), owner)
    }

    /// Mangled name.
    pub fn name(&self) -> String {
        self.table.read().functions[self.id].name.clone()
    }

    pub fn address_ranges(&self) -> AddressSet {
        self.table.read().functions[self.id].ranges.clone()
    }

    pub fn add_address_ranges(&self, ranges: &AddressSet) {
        let mut tables = self.table.write();
        let entry = &mut tables.functions[self.id];
        entry.ranges = entry.ranges.union(ranges);
    }

    /// Loops whose head lies inside this function.
    pub fn loops(&self) -> Vec<Loop> {
        let ranges = self.address_ranges();
        self.linked_object()
            .loops()
            .into_iter()
            .filter(|l| ranges.contains(l.head()))
            .collect()
    }

    /// Statements sharing at least one address with this function.
    pub fn statements(&self) -> Vec<Statement> {
        let ranges = self.address_ranges();
        self.linked_object()
            .statements()
            .into_iter()
            .filter(|s| !ranges.intersection(&s.address_ranges()).is_empty())
            .collect()
    }

    pub fn equivalent(&self, other: &Function) -> bool {
        self.name() == other.name() && self.address_ranges() == other.address_ranges()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, AddressRange, FileName};

    #[test]
    fn test_ranges_accumulate() {
        let lo = LinkedObject::new(FileName::with_checksum("/bin/app", 0));
        let f = Function::new(&lo, "solve");
        f.add_address_ranges(&AddressSet::from_ranges([AddressRange::new(
            Address::new(0x10),
            Address::new(0x1f),
        )]).unwrap());
        f.add_address_ranges(&AddressSet::from_ranges([AddressRange::new(
            Address::new(0x20),
            Address::new(0x2f),
        )]).unwrap());
        assert_eq!(
            f.address_ranges().ranges(),
            vec![AddressRange::new(Address::new(0x10), Address::new(0x2f))]
        );
    }

    #[test]
    fn test_contained_loops_and_statements() {
        let lo = LinkedObject::new(FileName::with_checksum("/bin/app", 0));
        let f = Function::new(&lo, "solve");
        f.add_address_ranges(&AddressSet::from_ranges([AddressRange::new(
            Address::new(0x100),
            Address::new(0x1ff),
        )]).unwrap());
        Loop::new(&lo, Address::new(0x120));
        Loop::new(&lo, Address::new(0x300));
        let s = Statement::new(&lo, FileName::with_checksum("solve.c", 0), 4, 1);
        s.add_address_ranges(&AddressSet::from_addresses([Address::new(0x1fe)]));
        Statement::new(&lo, FileName::with_checksum("solve.c", 0), 9, 1);

        let loops = f.loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].head(), Address::new(0x120));
        assert_eq!(f.statements(), vec![s]);
    }
}
