//! Dump command implementation

use crate::log::read_log;
use anyhow::Result;
use clap::Args;
use cudascope_gpu::{format_blob, COLLECTOR_ID};
use cudascope_shared::Message;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Message log to print
    pub log: PathBuf,
}

pub fn run(args: DumpArgs) -> Result<()> {
    for message in read_log(&args.log)? {
        match message {
            Message::Data(blob) if blob.header.id == COLLECTOR_ID => {
                println!("{}", format_blob(&blob)?);
            }
            other => println!("{}", other.kind()),
        }
    }
    Ok(())
}
