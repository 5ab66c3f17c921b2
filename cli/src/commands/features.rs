//! Features command implementation

use crate::log::read_log;
use crate::output;
use anyhow::Result;
use clap::Args;
use cudascope_clustering::cuda_leaf_pipeline;
use cudascope_shared::{FeatureVector, Message};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Message log to replay
    pub log: PathBuf,

    /// Print the feature vectors as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn features(messages: Vec<Message>) -> Result<Vec<FeatureVector>> {
    let mut leaf = cuda_leaf_pipeline();
    let mut out = Vec::new();
    for message in messages {
        leaf.send(message, &mut out)?;
    }
    Ok(out
        .into_iter()
        .filter_map(|message| match message {
            Message::Feature(vector) => Some(vector),
            _ => None,
        })
        .collect())
}

pub fn run(args: FeaturesArgs) -> Result<()> {
    let vectors = features(read_log(&args.log)?)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&vectors)?);
        return Ok(());
    }
    if vectors.is_empty() {
        output::warning("No feature vectors; not every thread terminated");
        return Ok(());
    }

    for vector in &vectors {
        output::heading(&format!("{} {}", vector.name(), vector.thread()));
        for feature in vector.features() {
            let name = feature.name_str().unwrap_or("?");
            output::row(name, format!("{:.1}", feature.value()));
        }
    }
    Ok(())
}
