//! Emitted records and field accessors

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// A single emitted entity: field name to arbitrary JSON value
pub type Record = Map<String, Value>;

/// Read the required string `id` of an entity
pub fn record_id<'r>(record: &'r Record, entity: &str) -> Result<&'r str> {
    record
        .get("id")
        .and_then(Value::as_str)
        .with_context(|| format!("{} is missing a string \"id\"", entity))
}

/// Read a boolean flag, treating absence as false
pub fn flag(record: &Record, field: &str) -> bool {
    record.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// Read an epoch-seconds field sent either as a number or a numeric string
pub fn epoch_seconds(record: &Record, field: &str) -> Result<f64> {
    let value = record
        .get(field)
        .with_context(|| format!("record is missing \"{}\"", field))?;

    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
    .filter(|ts| ts.is_finite())
    .with_context(|| format!("\"{}\" is not a timestamp: {}", field, value))
}

/// Message record id: channel id plus the timestamp in microseconds
pub fn message_id(channel_id: &str, ts: f64) -> String {
    format!("{}_{}", channel_id, (ts * 1_000_000.0).round() as i64)
}
