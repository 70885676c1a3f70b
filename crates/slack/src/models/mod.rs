//! Domain models for extracted entities and sync progress

mod bookmarks;
mod record;

pub use bookmarks::{
    BookmarkStore, Checkpoint, FILES_KEY, State, format_timestamp, history_key, parse_timestamp,
};
pub use record::{Record, epoch_seconds, flag, message_id, record_id};
