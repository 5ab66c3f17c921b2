//! Shared types and utilities for cudascope
//!
//! Value types, address sets, per-thread address spaces, symbol tables and
//! the messages exchanged between pipeline components.

pub mod error;
pub mod protocol;
pub mod sampling;
pub mod spaces;
pub mod stringify;
pub mod symbols;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
pub use protocol::Message;
pub use spaces::{AddressSpaces, Mapping};
pub use symbols::{Function, LinkedObject, Loop, Statement, SymbolTable};
pub use types::*;
