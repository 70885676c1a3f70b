//! Per-stream incremental sync watermarks
//!
//! Watermarks are epoch seconds held as `f64` and persisted as RFC 3339
//! strings with microsecond precision. A key's watermark never decreases:
//! [`BookmarkStore::update`] only ever moves it forward, and checkpoints the
//! full map each time it does.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use log::debug;
use std::collections::BTreeMap;

/// Bookmark key for the file stream
pub const FILES_KEY: &str = "files";

/// Bookmark key for one channel's message history
pub fn history_key(channel_id: &str) -> String {
    format!("conversation_history:{}", channel_id)
}

/// Earliest storable watermark, 0001-01-01T00:00:00Z
const MIN_MICROS: i64 = -62_135_596_800_000_000;
/// Latest storable watermark, 9999-12-31T23:59:59.999999Z
const MAX_MICROS: i64 = 253_402_300_799_999_999;

/// Serialized form of the bookmark map, as written in STATE messages
pub type State = BTreeMap<String, String>;

/// Receives the full bookmark map every time a watermark advances
///
/// Must not return until the state has been handed to the collaborator.
pub trait Checkpoint {
    fn checkpoint(&mut self, state: &State) -> Result<()>;
}

/// Maps a stream key to its watermark
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkStore {
    /// Default watermark for keys with no bookmark yet
    start: f64,
    values: BTreeMap<String, f64>,
}

impl BookmarkStore {
    /// Create an empty store defaulting every key to `start`
    pub fn new(start: f64) -> Self {
        Self {
            start,
            values: BTreeMap::new(),
        }
    }

    /// Resume from a previously emitted state map
    pub fn from_state(start: f64, state: &State) -> Result<Self> {
        let mut values = BTreeMap::new();
        for (key, raw) in state {
            let ts = parse_timestamp(raw)
                .with_context(|| format!("Invalid bookmark for \"{}\"", key))?;
            values.insert(key.clone(), ts);
        }
        Ok(Self { start, values })
    }

    /// Stored watermark for `key`, or the configured start
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(self.start)
    }

    /// Advance `key` to `candidate` if that moves it forward
    ///
    /// Returns whether the watermark advanced. When it does, the full map is
    /// checkpointed before returning.
    pub fn update(
        &mut self,
        key: &str,
        candidate: f64,
        checkpoint: &mut dyn Checkpoint,
    ) -> Result<bool> {
        if !candidate.is_nan() && !in_range(candidate) {
            anyhow::bail!("Bookmark for \"{}\" out of range: {}", key, candidate);
        }

        let existing = self.get(key);
        // f64::max ignores a NaN candidate
        let new = existing.max(candidate);
        let advanced = new > existing;
        debug!(
            "update_bookmark, {}, {}, {}, {}, {}",
            key, candidate, existing, new, advanced
        );

        if advanced {
            self.values.insert(key.to_string(), new);
            checkpoint.checkpoint(&self.to_state())?;
        }
        Ok(advanced)
    }

    /// Serialize every stored watermark
    pub fn to_state(&self) -> State {
        self.values
            .iter()
            .map(|(key, ts)| (key.clone(), format_timestamp(*ts)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse an ISO-8601 timestamp into epoch seconds
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC), or a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<f64> {
    let raw = raw.trim();

    let micros = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.timestamp_micros()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc().timestamp_micros()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_hms_opt(0, 0, 0)
            .context("midnight is always valid")?
            .and_utc()
            .timestamp_micros()
    } else {
        anyhow::bail!("Unrecognized timestamp: {:?}", raw);
    };

    if !(MIN_MICROS..=MAX_MICROS).contains(&micros) {
        anyhow::bail!("Timestamp out of range: {:?}", raw);
    }
    Ok(micros as f64 / 1_000_000.0)
}

fn in_range(ts: f64) -> bool {
    ts.is_finite() && (MIN_MICROS..=MAX_MICROS).contains(&to_micros(ts))
}

/// `as` saturates, so out-of-range seconds land on `i64::MIN`/`i64::MAX`
fn to_micros(ts: f64) -> i64 {
    (ts * 1_000_000.0).round() as i64
}

/// Format epoch seconds as RFC 3339 UTC with microseconds
///
/// Values outside years 0001 to 9999 are clamped so the output always
/// parses back with [`parse_timestamp`].
pub fn format_timestamp(ts: f64) -> String {
    let micros = to_micros(ts).clamp(MIN_MICROS, MAX_MICROS);
    DateTime::from_timestamp_micros(micros)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}
