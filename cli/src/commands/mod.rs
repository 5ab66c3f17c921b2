pub mod dump;
pub mod features;
pub mod replay;
