//! Destinations for output messages

use anyhow::{Context, Result};
use std::io::Write;

use super::OutputMessage;

/// Trait for the structured-output transport
///
/// `write_message` must hand the message over before returning; a STATE
/// message is a checkpoint.
pub trait MessageSink {
    fn write_message(&mut self, message: &OutputMessage) -> Result<()>;

    /// Flush anything still buffered
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes one JSON object per line, flushing after each
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn write_message(&mut self, message: &OutputMessage) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)
            .context("Failed to serialize output message")?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .context("Failed to write output message")
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush output")
    }
}

/// Collects messages in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub messages: Vec<OutputMessage>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted for `stream`, in order
    pub fn records(&self, stream: &str) -> Vec<&crate::models::Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                OutputMessage::Record { stream: s, record } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Streams in the order their schemas were declared
    pub fn schemas(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                OutputMessage::Schema { stream, .. } => Some(stream.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every checkpointed state, in order
    pub fn states(&self) -> Vec<&crate::models::State> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                OutputMessage::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for MemorySink {
    fn write_message(&mut self, message: &OutputMessage) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}
