//! Fixed per-stream JSON schemas, embedded at build time

use anyhow::{Context, Result};
use serde_json::Value;

/// Every stream the tap can emit
pub const STREAMS: [&str; 8] = [
    "conversation",
    "emoji",
    "file",
    "im",
    "message",
    "team",
    "user",
    "usergroup",
];

fn raw_schema(stream: &str) -> Option<&'static str> {
    let raw = match stream {
        "conversation" => include_str!("../../schemas/conversation.json"),
        "emoji" => include_str!("../../schemas/emoji.json"),
        "file" => include_str!("../../schemas/file.json"),
        "im" => include_str!("../../schemas/im.json"),
        "message" => include_str!("../../schemas/message.json"),
        "team" => include_str!("../../schemas/team.json"),
        "user" => include_str!("../../schemas/user.json"),
        "usergroup" => include_str!("../../schemas/usergroup.json"),
        _ => return None,
    };
    Some(raw)
}

/// Load the schema for `stream`
pub fn load_schema(stream: &str) -> Result<Value> {
    let raw = raw_schema(stream).with_context(|| format!("No schema for stream \"{}\"", stream))?;
    serde_json::from_str(raw).with_context(|| format!("Invalid schema for stream \"{}\"", stream))
}
