//! Replay command implementation

use crate::log::read_log;
use crate::output;
use anyhow::Result;
use clap::Args;
use cudascope_aggregator::{default_pipeline, DataAggregatorConfig};
use cudascope_shared::{Message, ThreadName};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Message log to replay
    pub log: PathBuf,

    /// Dump every CUDA blob the data aggregator receives and emits. Also
    /// enabled by CBTF_DEBUG_DATA_AGGREGATOR_FOR_CUDA.
    #[arg(long)]
    pub debug_data: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// What came out of the pipeline.
#[derive(Debug, Default, Serialize)]
pub struct ReplaySummary {
    pub messages_in: usize,
    pub messages_out: usize,
    pub by_kind: BTreeMap<&'static str, usize>,
    pub threads: Vec<String>,
    pub observed_addresses: usize,
    pub address_samples: u64,
    pub finished: Option<bool>,
}

pub fn summarize(messages_in: usize, out: &[Message]) -> ReplaySummary {
    let mut summary = ReplaySummary {
        messages_in,
        messages_out: out.len(),
        ..Default::default()
    };
    let mut threads = BTreeSet::new();
    for message in out {
        *summary.by_kind.entry(message.kind()).or_default() += 1;
        match message {
            Message::Data(blob) => {
                threads.insert(blob.header.thread_name());
            }
            Message::AddressSet(set) => summary.observed_addresses = set.len() as usize,
            Message::AddressBuffer(buffer) => summary.address_samples = buffer.total(),
            Message::ThreadsFinished(finished) => summary.finished = Some(*finished),
            _ => {}
        }
    }
    summary.threads = threads.iter().map(ThreadName::to_string).collect();
    summary
}

pub fn replay(messages: Vec<Message>, config: DataAggregatorConfig) -> Result<Vec<Message>> {
    let mut pipeline = default_pipeline(config);
    let mut out = Vec::new();
    for message in messages {
        pipeline.send(message, &mut out)?;
    }
    Ok(out)
}

pub fn run(args: ReplayArgs) -> Result<()> {
    let messages = read_log(&args.log)?;
    let count = messages.len();
    let mut config = DataAggregatorConfig::default();
    config.debug |= args.debug_data;
    let out = replay(messages, config)?;
    let summary = summarize(count, &out);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    output::info(&format!(
        "Replayed {} messages, {} emitted",
        summary.messages_in, summary.messages_out
    ));
    output::heading("Emitted messages");
    for (kind, count) in &summary.by_kind {
        output::row(kind, count);
    }
    if !summary.threads.is_empty() {
        output::heading("Threads with data");
        for thread in &summary.threads {
            println!("  {}", thread);
        }
    }
    println!(
        "\n  {} observed addresses, {} address samples",
        summary.observed_addresses, summary.address_samples
    );
    match summary.finished {
        Some(true) => output::success("All threads finished"),
        Some(false) => output::warning("Threads finished abnormally"),
        None => output::warning("Not every thread terminated; nothing was emitted"),
    }
    Ok(())
}
