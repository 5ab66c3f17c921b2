//! Leaf of the clustering tree: waits for its threads to terminate, then
//! asks the feature generator for addresses, data and features.

use cudascope_aggregator::{Component, Emitter, ThreadTracker};
use cudascope_shared::{Message, Result};
use tracing::info;

#[derive(Debug, Default)]
pub struct ClusteringLeaf {
    tracker: ThreadTracker,
}

impl ClusteringLeaf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.tracker.is_finished()
    }
}

impl Component for ClusteringLeaf {
    fn name(&self) -> &'static str {
        "ClusteringLeaf"
    }

    fn accepts(&self, message: &Message) -> bool {
        matches!(
            message,
            Message::AttachedToThreads(_) | Message::ThreadsStateChanged(_)
        )
    }

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        match message {
            Message::AttachedToThreads(attached) => {
                for record in &attached.threads {
                    self.tracker.attach(record);
                }
            }
            Message::ThreadsStateChanged(changed) => {
                if self.tracker.update(&changed) {
                    info!(threads = self.tracker.len(), "requesting features");
                    out.emit(Message::EmitAddressBuffer(true));
                    for thread in self.tracker.threads() {
                        out.emit(Message::EmitData(thread.clone()));
                        out.emit(Message::EmitFeatures(thread.clone()));
                    }
                    out.emit(Message::ThreadsFinished(true));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cudascope_shared::protocol::wire::{
        AttachedToThreads, ThreadRecord, ThreadState, ThreadsStateChanged,
    };
    use cudascope_shared::ThreadName;

    #[test]
    fn test_requests_after_last_termination() {
        let a = ThreadName::new("h", 1, Some(1), None);
        let b = ThreadName::new("h", 1, Some(2), None);
        let mut leaf = ClusteringLeaf::new();
        let mut out = Vec::new();

        leaf.handle(
            Message::AttachedToThreads(AttachedToThreads {
                threads: vec![ThreadRecord::from(&b), ThreadRecord::from(&a)],
            }),
            &mut out,
        )
        .unwrap();
        let terminated = |t: &ThreadName| {
            Message::ThreadsStateChanged(ThreadsStateChanged {
                threads: vec![ThreadRecord::from(t)],
                state: ThreadState::Terminated,
            })
        };
        leaf.handle(terminated(&a), &mut out).unwrap();
        assert!(out.is_empty());
        leaf.handle(terminated(&b), &mut out).unwrap();

        assert_eq!(
            out,
            vec![
                Message::EmitAddressBuffer(true),
                Message::EmitData(a.clone()),
                Message::EmitFeatures(a),
                Message::EmitData(b.clone()),
                Message::EmitFeatures(b.clone()),
                Message::ThreadsFinished(true),
            ]
        );
        assert!(leaf.is_finished());

        out.clear();
        leaf.handle(terminated(&b), &mut out).unwrap();
        assert!(out.is_empty());
    }
}
