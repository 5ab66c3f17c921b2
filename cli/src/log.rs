//! Recorded message logs
//!
//! A log file holds one wire-encoded `Vec<Message>`: every message a
//! component received, in arrival order.

use anyhow::{Context, Result};
use cudascope_shared::protocol::wire;
use cudascope_shared::Message;
use std::path::Path;
use tracing::debug;

pub fn read_log(path: &Path) -> Result<Vec<Message>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read message log {}", path.display()))?;
    let messages: Vec<Message> = wire::decode(&bytes)
        .with_context(|| format!("Failed to decode message log {}", path.display()))?;
    debug!(path = %path.display(), messages = messages.len(), "loaded message log");
    Ok(messages)
}

#[cfg(test)]
pub fn write_log(path: &Path, messages: &[Message]) -> Result<()> {
    let bytes = wire::encode(&messages.to_vec())?;
    std::fs::write(path, bytes)?;
    Ok(())
}
