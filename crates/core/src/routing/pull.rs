//! Durable file-backed FIFO queue (the pull sink).
//!
//! The two ends of this queue live in separate OS processes with no other
//! shared channel; a plain JSON array on disk doubles as a debugging
//! artifact and survives restarts. There is no file lock: the deployment
//! topology is single-writer (the orchestrator enqueues) and single-reader
//! (the consumer dequeues). Delivery is at-least-once, since a consumer
//! crash between read and write can redeliver, so consumers must treat
//! processing as idempotent.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a queue item asks the consumer to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Screenshot,
    Text,
    CodeGeneration,
}

/// One unit of durable work for a polling consumer.
///
/// Born when a capture reaches the persisted stage, destroyed the moment a
/// consumer successfully dequeues it. If no consumer ever polls, the queue
/// file grows without bound; bounding it is the caller's responsibility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub kind: ItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcripts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl QueueItem {
    /// A captured screenshot awaiting analysis.
    pub fn screenshot(filename: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Screenshot,
            filename: Some(filename.into()),
            prompt: prompt.into(),
            transcripts: None,
            action: None,
            timestamp: Utc::now(),
        }
    }

    /// A text-only prompt, optionally carrying transcript snippets from the
    /// audio pipeline (opaque strings here).
    pub fn text(prompt: impl Into<String>, transcripts: Option<Vec<String>>) -> Self {
        Self {
            kind: ItemKind::Text,
            filename: None,
            prompt: prompt.into(),
            transcripts,
            action: None,
            timestamp: Utc::now(),
        }
    }

    /// A code-generation request for the fast polling backend.
    pub fn code_generation(prompt: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::CodeGeneration,
            filename: None,
            prompt: prompt.into(),
            transcripts: None,
            action: Some(action.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Handle on one queue file. The same type serves the writer and the reader;
/// the roles are separated by process, not by type.
#[derive(Clone, Debug)]
pub struct PromptQueue {
    path: PathBuf,
}

impl PromptQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends an item. A missing queue file is an empty queue.
    pub fn enqueue(&self, item: QueueItem) -> Result<()> {
        let mut items = self.read_all()?;
        items.push(item);
        self.write_all(&items)?;
        debug!(path = %self.path.display(), depth = items.len(), "queue item enqueued");
        Ok(())
    }

    /// Removes and returns the oldest item, or `None` when the queue is
    /// empty.
    pub fn dequeue(&self) -> Result<Option<QueueItem>> {
        let mut items = self.read_all()?;
        if items.is_empty() {
            return Ok(None);
        }
        let item = items.remove(0);
        self.write_all(&items)?;
        Ok(Some(item))
    }

    /// Current queue depth.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read_all()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_all(&self) -> Result<Vec<QueueItem>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, items: &[QueueItem]) -> Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
