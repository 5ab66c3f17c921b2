//! Thread identification

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Name of a thread within the monitored application.
///
/// Ordered by host, then pid, then POSIX thread id, then MPI rank. A missing
/// tid or rank sorts before a present one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadName {
    host: String,
    pid: u64,
    tid: Option<u64>,
    mpi_rank: Option<u32>,
}

impl ThreadName {
    pub fn new(host: impl Into<String>, pid: u64, tid: Option<u64>, mpi_rank: Option<u32>) -> Self {
        Self {
            host: host.into(),
            pid,
            tid,
            mpi_rank,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn pid(&self) -> u64 {
        self.pid
    }

    pub fn tid(&self) -> Option<u64> {
        self.tid
    }

    pub fn mpi_rank(&self) -> Option<u32> {
        self.mpi_rank
    }
}

impl Ord for ThreadName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.host
            .cmp(&other.host)
            .then_with(|| self.pid.cmp(&other.pid))
            .then_with(|| self.tid.cmp(&other.tid))
            .then_with(|| self.mpi_rank.cmp(&other.mpi_rank))
    }
}

impl PartialOrd for ThreadName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ThreadName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.pid)?;
        if let Some(tid) = self.tid {
            write!(f, ":{}", tid)?;
        }
        if let Some(rank) = self.mpi_rank {
            write!(f, " (rank {})", rank)?;
        }
        Ok(())
    }
}
