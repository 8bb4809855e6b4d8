//! Fan-out of captured artifacts to consumers.
//!
//! Two sink kinds behind one [`Router`]:
//!
//! - [`CommandMailbox`] (push): immediate delivery to an already-running
//!   consumer; fire-and-forget.
//! - [`PromptQueue`] (pull): durable file-backed FIFO drained by a polling
//!   consumer; at-least-once delivery.
//!
//! Sinks are addressed by name from the capture request; one sink's failure
//! is recorded on the [`DeliveryReport`] and never blocks or rolls back the
//! others.

mod pull;
mod push;

pub use pull::{ItemKind, PromptQueue, QueueItem};
pub use push::{CommandMailbox, CommandMessage};

use crate::error::{AppError, Result};
use crate::storage::SavedCapture;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Name of the standard pull destination.
pub const SINK_QUEUE: &str = "queue";
/// Name of the standard push destination.
pub const SINK_COMMAND: &str = "command";

const QUEUE_FILE: &str = ".prompt_queue.json";
const COMMAND_FILE: &str = ".command";

/// Per-sink delivery outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SinkOutcome {
    Delivered,
    Failed { reason: String },
}

impl SinkOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// What happened to a capture at each requested destination.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DeliveryReport {
    /// File name of the routed capture, when one exists.
    pub filename: Option<String>,
    /// Outcomes keyed by sink name, in stable order for inspection.
    pub outcomes: BTreeMap<String, SinkOutcome>,
}

impl DeliveryReport {
    pub fn record(&mut self, sink: &str, outcome: SinkOutcome) {
        self.outcomes.insert(sink.to_string(), outcome);
    }

    pub fn delivered_to(&self, sink: &str) -> bool {
        self.outcomes
            .get(sink)
            .is_some_and(SinkOutcome::is_delivered)
    }

    pub fn fully_delivered(&self) -> bool {
        self.outcomes.values().all(SinkOutcome::is_delivered)
    }
}

enum Sink {
    Push(CommandMailbox),
    Pull(PromptQueue),
}

/// Maps destination names to sinks.
pub struct Router {
    sinks: BTreeMap<String, Sink>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            sinks: BTreeMap::new(),
        }
    }

    /// The standard single-machine topology under one root:
    /// `"queue"` → `<root>/.prompt_queue.json`, `"command"` → `<root>/.command`.
    pub fn standard(root: &Path) -> Self {
        let mut router = Self::new();
        router.add_pull(SINK_QUEUE, Self::standard_queue(root));
        router.add_push(SINK_COMMAND, Self::standard_mailbox(root));
        router
    }

    /// Handle on the standard queue file; the consumer process opens its own.
    pub fn standard_queue(root: &Path) -> PromptQueue {
        PromptQueue::new(root.join(QUEUE_FILE))
    }

    /// Handle on the standard mailbox file.
    pub fn standard_mailbox(root: &Path) -> CommandMailbox {
        CommandMailbox::new(root.join(COMMAND_FILE))
    }

    pub fn add_push(&mut self, name: impl Into<String>, mailbox: CommandMailbox) -> &mut Self {
        self.sinks.insert(name.into(), Sink::Push(mailbox));
        self
    }

    pub fn add_pull(&mut self, name: impl Into<String>, queue: PromptQueue) -> &mut Self {
        self.sinks.insert(name.into(), Sink::Pull(queue));
        self
    }

    /// Routes one persisted capture to one named sink.
    pub fn route(&self, name: &str, capture: &SavedCapture, prompt: Option<&str>) -> Result<()> {
        let sink = self
            .sinks
            .get(name)
            .ok_or_else(|| AppError::routing(name, "unknown destination"))?;

        match sink {
            Sink::Pull(queue) => {
                let item = QueueItem::screenshot(capture.filename(), prompt.unwrap_or_default());
                queue
                    .enqueue(item)
                    .map_err(|e| AppError::routing(name, e.to_string()))?;
            }
            Sink::Push(mailbox) => {
                let message = CommandMessage::analyze_screenshot(
                    prompt.map(str::to_string),
                    capture.png_path.to_string_lossy(),
                );
                mailbox
                    .deliver(&message)
                    .map_err(|e| AppError::routing(name, e.to_string()))?;
            }
        }

        info!(sink = name, file = %capture.filename(), "capture routed");
        Ok(())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
