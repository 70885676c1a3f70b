//! Record emitter: schema-first writes to the output sink

use anyhow::Result;
use log::debug;
use std::collections::HashSet;

use super::{MessageSink, OutputMessage, load_schema};
use crate::models::{Checkpoint, Record, State};

/// Primary key declared for every stream
const KEY_PROPERTIES: [&str; 1] = ["id"];

/// Writes schema, record and state messages to a sink
///
/// A stream's schema is declared at most once per run, always before its
/// first record.
pub struct RecordEmitter<'a> {
    sink: &'a mut dyn MessageSink,
    declared: HashSet<String>,
}

impl<'a> RecordEmitter<'a> {
    pub fn new(sink: &'a mut dyn MessageSink) -> Self {
        Self {
            sink,
            declared: HashSet::new(),
        }
    }

    /// Declare the schema for `stream` unless already declared this run
    pub fn ensure_schema(&mut self, stream: &str) -> Result<()> {
        if self.declared.contains(stream) {
            return Ok(());
        }

        let schema = load_schema(stream)?;
        debug!("Declaring schema for {}", stream);
        self.sink.write_message(&OutputMessage::Schema {
            stream: stream.to_string(),
            schema,
            key_properties: KEY_PROPERTIES.iter().map(|k| k.to_string()).collect(),
        })?;
        self.declared.insert(stream.to_string());
        Ok(())
    }

    /// Write one record tagged with `stream`
    pub fn emit(&mut self, stream: &str, record: Record) -> Result<()> {
        self.ensure_schema(stream)?;
        self.sink.write_message(&OutputMessage::Record {
            stream: stream.to_string(),
            record,
        })
    }

    /// Write the full bookmark map
    pub fn write_state(&mut self, state: &State) -> Result<()> {
        self.sink.write_message(&OutputMessage::State {
            value: state.clone(),
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }
}

impl Checkpoint for RecordEmitter<'_> {
    fn checkpoint(&mut self, state: &State) -> Result<()> {
        self.write_state(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use serde_json::json;

    fn record(id: &str) -> Record {
        json!({"id": id}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_schema_declared_once_before_first_record() {
        let mut sink = MemorySink::new();
        {
            let mut emitter = RecordEmitter::new(&mut sink);
            for i in 0..1000 {
                emitter.ensure_schema("user").unwrap();
                emitter.emit("user", record(&format!("U{}", i))).unwrap();
            }
        }

        assert_eq!(sink.schemas(), vec!["user"]);
        assert!(matches!(
            &sink.messages[0],
            OutputMessage::Schema { stream, key_properties, .. }
                if stream == "user" && key_properties == &vec!["id".to_string()]
        ));
        assert_eq!(sink.records("user").len(), 1000);
    }

    #[test]
    fn test_emit_declares_schema_when_caller_did_not() {
        let mut sink = MemorySink::new();
        {
            let mut emitter = RecordEmitter::new(&mut sink);
            emitter.emit("team", record("T1")).unwrap();
            emitter.emit("file", record("F1")).unwrap();
        }

        let kinds: Vec<&str> = sink
            .messages
            .iter()
            .map(|m| match m {
                OutputMessage::Schema { .. } => "schema",
                OutputMessage::Record { .. } => "record",
                OutputMessage::State { .. } => "state",
            })
            .collect();
        assert_eq!(kinds, vec!["schema", "record", "schema", "record"]);
        assert_eq!(sink.schemas(), vec!["team", "file"]);
    }

    #[test]
    fn test_unknown_stream_fails_without_writing() {
        let mut sink = MemorySink::new();
        {
            let mut emitter = RecordEmitter::new(&mut sink);
            assert!(emitter.emit("reminder", record("R1")).is_err());
        }
        assert!(sink.messages.is_empty());
    }

    #[test]
    fn test_checkpoint_writes_state() {
        let mut sink = MemorySink::new();
        {
            let mut emitter = RecordEmitter::new(&mut sink);
            let mut state = State::new();
            state.insert("files".to_string(), "2020-01-01T00:00:00.000000Z".to_string());
            emitter.checkpoint(&state).unwrap();
        }
        assert_eq!(sink.states().len(), 1);
        assert_eq!(sink.states()[0]["files"], "2020-01-01T00:00:00.000000Z");
    }
}
