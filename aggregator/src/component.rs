//! Component seam
//!
//! A component consumes [`Message`]s from its input ports and emits messages
//! on its output ports through an [`Emitter`]. Components are driven
//! serially; outputs of one call are emitted in program order.

use cudascope_shared::{Message, Result};
use tracing::trace;

/// Sink for a component's outputs.
pub trait Emitter {
    fn emit(&mut self, message: Message);
}

impl Emitter for Vec<Message> {
    fn emit(&mut self, message: Message) {
        self.push(message);
    }
}

pub trait Component {
    fn name(&self) -> &'static str;

    /// Whether `message` arrives on one of this component's input ports.
    fn accepts(&self, message: &Message) -> bool;

    fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()>;
}

/// Components connected in a line. Each stage's outputs feed the next
/// stage; messages a stage does not accept flow past it unchanged.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Component>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: Box<dyn Component>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn push(&mut self, stage: Box<dyn Component>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run one message through every stage.
    pub fn send(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
        let mut current = vec![message];
        for stage in &mut self.stages {
            let mut next = Vec::new();
            for message in current {
                if stage.accepts(&message) {
                    trace!(component = stage.name(), kind = message.kind(), "deliver");
                    stage.handle(message, &mut next)?;
                } else {
                    next.push(message);
                }
            }
            current = next;
        }
        for message in current {
            out.emit(message);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl Component for Doubler {
        fn name(&self) -> &'static str {
            "Doubler"
        }

        fn accepts(&self, message: &Message) -> bool {
            matches!(message, Message::TriggerData(_))
        }

        fn handle(&mut self, message: Message, out: &mut dyn Emitter) -> Result<()> {
            out.emit(message.clone());
            out.emit(message);
            Ok(())
        }
    }

    #[test]
    fn test_pipeline_forwards_unaccepted() {
        let mut pipeline = Pipeline::new()
            .with_stage(Box::new(Doubler))
            .with_stage(Box::new(Doubler));
        let mut out = Vec::new();
        pipeline.send(Message::TriggerData(true), &mut out).unwrap();
        pipeline.send(Message::ThreadsFinished(false), &mut out).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[4], Message::ThreadsFinished(false));
        assert_eq!(pipeline.stage_names(), vec!["Doubler", "Doubler"]);
    }
}
