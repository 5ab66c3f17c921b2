//! Collector entry points
//!
//! The host collector service drives a collector through four calls. Live
//! instrumentation is provided by the host; the replay path needs none of
//! it, so [`ReplayCollector`] only tracks its state.

use cudascope_shared::protocol::wire::BlobHeader;
use cudascope_shared::Result;
use tracing::debug;

/// Identifier the host uses to select this collector.
pub const COLLECTOR_ID: &str = "cuda";

pub trait Collector {
    /// Begin collecting into blobs stamped with `header`.
    fn start(&mut self, header: BlobHeader) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectorState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Collector used when performance data comes from a recording.
#[derive(Debug, Default)]
pub struct ReplayCollector {
    header: Option<BlobHeader>,
    state: CollectorState,
}

impl ReplayCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn header(&self) -> Option<&BlobHeader> {
        self.header.as_ref()
    }
}

impl Collector for ReplayCollector {
    fn start(&mut self, header: BlobHeader) -> Result<()> {
        debug!(collector = COLLECTOR_ID, thread = %header.thread_name(), "start");
        self.header = Some(header);
        self.state = CollectorState::Running;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        debug!(collector = COLLECTOR_ID, "pause");
        self.state = CollectorState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        debug!(collector = COLLECTOR_ID, "resume");
        self.state = CollectorState::Running;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        debug!(collector = COLLECTOR_ID, "stop");
        self.state = CollectorState::Stopped;
        Ok(())
    }
}
