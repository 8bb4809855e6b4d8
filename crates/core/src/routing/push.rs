//! Fire-and-forget mailbox (the push sink).
//!
//! The fast path to an already-running consumer: one JSON object in a
//! well-known file, overwritten on every delivery. The consumer polls,
//! reads, and unlinks. If nobody is listening the message is simply
//! overwritten by the next one (that is the design, not a defect), and a
//! failed write is recorded on the delivery report but never retried.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The mailbox payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<String>,
}

impl CommandMessage {
    /// Asks the consumer to analyze a persisted screenshot.
    pub fn analyze_screenshot(prompt: Option<String>, screenshot_path: impl Into<String>) -> Self {
        Self {
            command: "analyze_screenshot".to_string(),
            prompt,
            screenshot_path: Some(screenshot_path.into()),
        }
    }

    /// Asks the consumer to analyze a bare text prompt.
    pub fn analyze_text(prompt: impl Into<String>) -> Self {
        Self {
            command: "analyze_text_prompt".to_string(),
            prompt: Some(prompt.into()),
            screenshot_path: None,
        }
    }
}

/// Handle on one mailbox file.
#[derive(Clone, Debug)]
pub struct CommandMailbox {
    path: PathBuf,
}

impl CommandMailbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delivers a message, replacing whatever was there.
    pub fn deliver(&self, message: &CommandMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), command = %message.command, "mailbox delivery");
        Ok(())
    }

    /// Consumer side: takes the pending message, leaving the mailbox empty.
    /// Returns `None` when there is nothing to take.
    pub fn take(&self) -> Result<Option<CommandMessage>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let message = serde_json::from_str(&contents)?;
        fs::remove_file(&self.path)?;
        Ok(Some(message))
    }
}
