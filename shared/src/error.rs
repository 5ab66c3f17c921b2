//! Error type shared by every cudascope crate

use thiserror::Error;

/// Errors raised by the value types, containers and pipeline components.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was outside the domain of the operation (address outside
    /// a bitmap's range, mixed named and unnamed features, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A wire record did not have the expected shape or size.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A system facility (clock, file I/O) failed.
    #[error("system error: {0}")]
    System(String),

    /// An operation was applied in a state that does not permit it.
    #[error("state violation: {0}")]
    StateViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    pub fn system(msg: impl Into<String>) -> Self {
        Error::System(msg.into())
    }

    pub fn state_violation(msg: impl Into<String>) -> Self {
        Error::StateViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
