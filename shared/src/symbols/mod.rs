//! Symbol tables and the handles that reference into them
//!
//! A [`SymbolTable`] is a shared store of linked objects, functions, loops and
//! statements. [`LinkedObject`], [`Function`], [`Loop`] and [`Statement`] are
//! cheap handles of `(table, id)`; cloning a handle shares the table, and the
//! table lives as long as any handle does. Handles compare by identity;
//! `equivalent()` compares contents.
//!
//! Every address stored here is relative to the owning linked object's load
//! address.

mod function;
mod linked_object;
mod loops;
mod statement;

pub use function::Function;
pub use linked_object::LinkedObject;
pub use loops::Loop;
pub use statement::Statement;

use crate::types::{Address, AddressSet, FileName};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub(crate) struct LinkedObjectEntry {
    pub(crate) file: FileName,
}

#[derive(Debug, Clone)]
pub(crate) struct FunctionEntry {
    pub(crate) linked_object: usize,
    pub(crate) name: String,
    pub(crate) ranges: AddressSet,
}

#[derive(Debug, Clone)]
pub(crate) struct LoopEntry {
    pub(crate) linked_object: usize,
    pub(crate) head: Address,
    pub(crate) ranges: AddressSet,
}

#[derive(Debug, Clone)]
pub(crate) struct StatementEntry {
    pub(crate) linked_object: usize,
    pub(crate) file: FileName,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) ranges: AddressSet,
}

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) linked_objects: Vec<LinkedObjectEntry>,
    pub(crate) functions: Vec<FunctionEntry>,
    pub(crate) loops: Vec<LoopEntry>,
    pub(crate) statements: Vec<StatementEntry>,
}

/// Shared store behind the symbol handles.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    inner: Arc<RwLock<Tables>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether two values refer to the same underlying store.
    pub fn same_as(&self, other: &SymbolTable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    // A panic while holding the lock cannot leave the tables half-updated:
    // every mutation is a single push or field assignment.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Handles for every linked object in the table.
    pub fn linked_objects(&self) -> Vec<LinkedObject> {
        let count = self.read().linked_objects.len();
        (0..count)
            .map(|id| LinkedObject::from_parts(self.clone(), id))
            .collect()
    }
}

/// Identity, ordering and hashing by `(table, id)` for a handle type.
macro_rules! handle_identity {
    ($handle:ident) => {
        impl $handle {
            pub(crate) fn from_parts(table: $crate::symbols::SymbolTable, id: usize) -> Self {
                Self { table, id }
            }

            /// Unique identifier within the owning symbol table.
            pub fn id(&self) -> usize {
                self.id
            }

            pub fn symbol_table(&self) -> &$crate::symbols::SymbolTable {
                &self.table
            }
        }

        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                self.table.same_as(&other.table) && self.id == other.id
            }
        }

        impl Eq for $handle {}

        impl Ord for $handle {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                (self.table.key(), self.id).cmp(&(other.table.key(), other.id))
            }
        }

        impl PartialOrd for $handle {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::hash::Hash for $handle {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.table.key().hash(state);
                self.id.hash(state);
            }
        }
    };
}

pub(crate) use handle_identity;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressRange;

    fn ranges(b: u64, e: u64) -> AddressSet {
        AddressSet::from_ranges([AddressRange::new(Address::new(b), Address::new(e))]).unwrap()
    }

    #[test]
    fn test_handles_share_table() {
        let lo = LinkedObject::new(FileName::with_checksum("/bin/app", 1));
        let f = Function::new(&lo, "main");
        f.add_address_ranges(&ranges(0x100, 0x1ff));
        assert!(f.symbol_table().same_as(lo.symbol_table()));
        assert_eq!(lo.functions(), vec![f.clone()]);
        assert_eq!(f.linked_object(), lo);
    }

    #[test]
    fn test_table_outlives_creating_handle() {
        let f = {
            let lo = LinkedObject::new(FileName::with_checksum("/bin/app", 1));
            Function::new(&lo, "main")
        };
        assert_eq!(f.name(), "main");
        assert_eq!(f.linked_object().file().path().to_str(), Some("/bin/app"));
    }

    #[test]
    fn test_identity_versus_equivalence() {
        let a = LinkedObject::new(FileName::with_checksum("/lib/x.so", 9));
        Function::new(&a, "f").add_address_ranges(&ranges(0, 15));
        let b = a.deep_clone();
        assert_ne!(a, b);
        assert!(a.equivalent(&b));

        Function::new(&b, "g");
        assert!(!a.equivalent(&b));
    }
}
