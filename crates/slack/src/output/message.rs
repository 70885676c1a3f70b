//! Messages written to the downstream record channel

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Record, State};

/// One line of output, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputMessage {
    /// One-time declaration of a stream's shape
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    },
    /// A single entity belonging to `stream`
    Record { stream: String, record: Record },
    /// The full bookmark map
    State { value: State },
}
