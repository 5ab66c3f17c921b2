use super::{
    handle_identity, Function, FunctionEntry, LinkedObjectEntry, Loop, LoopEntry, Statement,
    StatementEntry, SymbolTable,
};
use crate::error::Result;
use crate::protocol::wire::{
    FileRecord, FunctionRecord, LoopRecord, StatementRecord, SymbolTableMessage,
};
use crate::types::{Address, AddressSet, FileName};
use std::fmt;

/// An executable or shared library.
#[derive(Debug, Clone)]
pub struct LinkedObject {
    table: SymbolTable,
    id: usize,
}

handle_identity!(LinkedObject);

impl LinkedObject {
    /// A linked object in a fresh symbol table of its own.
    pub fn new(file: FileName) -> Self {
        Self::in_table(&SymbolTable::new(), file)
    }

    /// Add a linked object to an existing symbol table.
    pub fn in_table(table: &SymbolTable, file: FileName) -> Self {
        let mut tables = table.write();
        tables.linked_objects.push(LinkedObjectEntry { file });
        let id = tables.linked_objects.len() - 1;
        drop(tables);
        Self::from_parts(table.clone(), id)
    }

    /// Build a linked object, with its functions, loops and statements, from
    /// a symbol table message.
    pub fn from_message(message: &SymbolTableMessage) -> Result<Self> {
        let linked_object = Self::new(FileName::from(&message.linked_object));

        for record in &message.functions {
            let ranges = AddressSet::from_wire(&record.bitmaps)?;
            Function::new(&linked_object, &record.name).add_address_ranges(&ranges);
        }
        for record in &message.loops {
            let ranges = AddressSet::from_wire(&record.bitmaps)?;
            Loop::new(&linked_object, Address::new(record.head)).add_address_ranges(&ranges);
        }
        for record in &message.statements {
            let ranges = AddressSet::from_wire(&record.bitmaps)?;
            Statement::new(
                &linked_object,
                FileName::from(&record.path),
                record.line,
                record.column,
            )
            .add_address_ranges(&ranges);
        }

        Ok(linked_object)
    }

    pub fn to_message(&self) -> Result<SymbolTableMessage> {
        let tables = self.table.read();
        let id = self.id;

        Ok(SymbolTableMessage {
            linked_object: FileRecord::from(&tables.linked_objects[id].file),
            functions: tables
                .functions
                .iter()
                .filter(|f| f.linked_object == id)
                .map(|f| {
                    Ok(FunctionRecord {
                        name: f.name.clone(),
                        bitmaps: f.ranges.to_wire()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            loops: tables
                .loops
                .iter()
                .filter(|l| l.linked_object == id)
                .map(|l| {
                    Ok(LoopRecord {
                        head: l.head.value(),
                        bitmaps: l.ranges.to_wire()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            statements: tables
                .statements
                .iter()
                .filter(|s| s.linked_object == id)
                .map(|s| {
                    Ok(StatementRecord {
                        path: FileRecord::from(&s.file),
                        line: s.line,
                        column: s.column,
                        bitmaps: s.ranges.to_wire()?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn file(&self) -> FileName {
        self.table.read().linked_objects[self.id].file.clone()
    }

    /// Deep-copy this linked object and everything it contains into `table`.
    pub fn clone_into(&self, table: &SymbolTable) -> LinkedObject {
        let (file, functions, loops, statements) = {
            let tables = self.table.read();
            let id = self.id;
            (
                tables.linked_objects[id].file.clone(),
                tables
                    .functions
                    .iter()
                    .filter(|f| f.linked_object == id)
                    .cloned()
                    .collect::<Vec<_>>(),
                tables
                    .loops
                    .iter()
                    .filter(|l| l.linked_object == id)
                    .cloned()
                    .collect::<Vec<_>>(),
                tables
                    .statements
                    .iter()
                    .filter(|s| s.linked_object == id)
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        };

        let clone = LinkedObject::in_table(table, file);
        let mut target = table.write();
        target
            .functions
            .extend(functions.into_iter().map(|f| FunctionEntry {
                linked_object: clone.id,
                ..f
            }));
        target.loops.extend(loops.into_iter().map(|l| LoopEntry {
            linked_object: clone.id,
            ..l
        }));
        target
            .statements
            .extend(statements.into_iter().map(|s| StatementEntry {
                linked_object: clone.id,
                ..s
            }));
        drop(target);
        clone
    }

    /// Deep-copy into a fresh symbol table.
    pub fn deep_clone(&self) -> LinkedObject {
        self.clone_into(&SymbolTable::new())
    }

    pub fn functions(&self) -> Vec<Function> {
        let tables = self.table.read();
        tables
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.linked_object == self.id)
            .map(|(id, _)| Function::from_parts(self.table.clone(), id))
            .collect()
    }

    /// Functions containing the (relative) address.
    pub fn functions_at(&self, address: Address) -> Vec<Function> {
        let tables = self.table.read();
        tables
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.linked_object == self.id && f.ranges.contains(address))
            .map(|(id, _)| Function::from_parts(self.table.clone(), id))
            .collect()
    }

    /// Functions with the given mangled name.
    pub fn functions_named(&self, name: &str) -> Vec<Function> {
        let tables = self.table.read();
        tables
            .functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.linked_object == self.id && f.name == name)
            .map(|(id, _)| Function::from_parts(self.table.clone(), id))
            .collect()
    }

    pub fn loops(&self) -> Vec<Loop> {
        let tables = self.table.read();
        tables
            .loops
            .iter()
            .enumerate()
            .filter(|(_, l)| l.linked_object == self.id)
            .map(|(id, _)| Loop::from_parts(self.table.clone(), id))
            .collect()
    }

    pub fn loops_at(&self, address: Address) -> Vec<Loop> {
        let tables = self.table.read();
        tables
            .loops
            .iter()
            .enumerate()
            .filter(|(_, l)| l.linked_object == self.id && l.ranges.contains(address))
            .map(|(id, _)| Loop::from_parts(self.table.clone(), id))
            .collect()
    }

    pub fn statements(&self) -> Vec<Statement> {
        let tables = self.table.read();
        tables
            .statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.linked_object == self.id)
            .map(|(id, _)| Statement::from_parts(self.table.clone(), id))
            .collect()
    }

    pub fn statements_at(&self, address: Address) -> Vec<Statement> {
        let tables = self.table.read();
        tables
            .statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.linked_object == self.id && s.ranges.contains(address))
            .map(|(id, _)| Statement::from_parts(self.table.clone(), id))
            .collect()
    }

    /// Same file and the same functions, loops and statements, regardless of
    /// which symbol tables hold them.
    pub fn equivalent(&self, other: &LinkedObject) -> bool {
        if self.file() != other.file() {
            return false;
        }

        fn sorted_by_key<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
            items.sort_by_key(|item| key(item));
            items
        }

        let pairs_match = |a: &[Function], b: &[Function]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
        };
        let fa = sorted_by_key(self.functions(), Function::name);
        let fb = sorted_by_key(other.functions(), Function::name);
        if !pairs_match(&fa, &fb) {
            return false;
        }

        let la = sorted_by_key(self.loops(), Loop::head);
        let lb = sorted_by_key(other.loops(), Loop::head);
        if la.len() != lb.len() || !la.iter().zip(&lb).all(|(x, y)| x.equivalent(y)) {
            return false;
        }

        let key = |s: &Statement| (s.file(), s.line(), s.column());
        let sa = sorted_by_key(self.statements(), key);
        let sb = sorted_by_key(other.statements(), key);
        sa.len() == sb.len() && sa.iter().zip(&sb).all(|(x, y)| x.equivalent(y))
    }
}

impl fmt::Display for LinkedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressRange;

    fn ranges(b: u64, e: u64) -> AddressSet {
        AddressSet::from_ranges([AddressRange::new(Address::new(b), Address::new(e))]).unwrap()
    }

    fn populated() -> LinkedObject {
        let lo = LinkedObject::new(FileName::with_checksum("/usr/lib/libcuda.so", 77));
        Function::new(&lo, "cuLaunchKernel").add_address_ranges(&ranges(0x1000, 0x10ff));
        Function::new(&lo, "cuMemcpy").add_address_ranges(&ranges(0x2000, 0x20ff));
        Loop::new(&lo, Address::new(0x1010)).add_address_ranges(&ranges(0x1010, 0x1040));
        Statement::new(&lo, FileName::with_checksum("launch.c", 0), 12, 3)
            .add_address_ranges(&ranges(0x1000, 0x1020));
        lo
    }

    #[test]
    fn test_message_roundtrip_is_equivalent() {
        let lo = populated();
        let message = lo.to_message().unwrap();
        assert_eq!(message.functions.len(), 2);
        let rebuilt = LinkedObject::from_message(&message).unwrap();
        assert!(rebuilt.equivalent(&lo));
        assert_ne!(rebuilt, lo);
    }

    #[test]
    fn test_address_queries() {
        let lo = populated();
        let at = lo.functions_at(Address::new(0x1015));
        assert_eq!(at.len(), 1);
        assert_eq!(at[0].name(), "cuLaunchKernel");
        assert_eq!(lo.loops_at(Address::new(0x1015)).len(), 1);
        assert_eq!(lo.statements_at(Address::new(0x1015)).len(), 1);
        assert!(lo.functions_at(Address::new(0x3000)).is_empty());
        assert_eq!(lo.functions_named("cuMemcpy").len(), 1);
    }

    #[test]
    fn test_clone_into_shared_table() {
        let lo = populated();
        let table = SymbolTable::new();
        let other = LinkedObject::in_table(&table, FileName::with_checksum("/bin/app", 1));
        let copy = lo.clone_into(&table);
        assert!(copy.symbol_table().same_as(&table));
        assert_eq!(copy.functions().len(), 2);
        assert!(other.functions().is_empty());
        assert_eq!(table.linked_objects().len(), 2);
        assert!(copy.equivalent(&lo));
    }
}
