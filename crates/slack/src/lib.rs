//! Slack crate - Incremental extraction of a Slack workspace
//!
//! This crate provides:
//! - Slack Web API client with rate-limit handling
//! - Per-stream bookmarks for resumable, incremental sync
//! - Schema-tagged record output (schema, record and state messages)
//! - The task scheduler that expands a few seed requests into the full
//!   tree of paginated calls
//!
//! Everything runs on the calling thread; a run either drains its task list
//! or aborts on the first unrecoverable error.

pub mod api;
pub mod config;
pub mod models;
pub mod output;
pub mod sync;

pub use api::{SlackApi, SlackClient, SlackError};
pub use self::config::TapConfig;
pub use models::{BookmarkStore, Record, State};
pub use output::{JsonLinesSink, MemorySink, MessageSink, OutputMessage, RecordEmitter};
pub use sync::{
    Scheduler, SyncContext, SyncStats, Task, seed_tasks, sync_workspace, sync_workspace_at,
};
