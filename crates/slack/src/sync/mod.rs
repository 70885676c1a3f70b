//! Sync engine: self-expanding task list over the Slack API
//!
//! A run seeds the scheduler with one task per top-level resource. Each task
//! performs one API call and returns follow-ups (next pages, per-channel
//! members and history, per-group members) until no work remains. Progress
//! is made durable only through bookmark checkpoints.

mod context;
mod scheduler;
mod task;
mod workspace;

pub use context::{SyncContext, SyncStats};
pub use scheduler::Scheduler;
pub use task::{CHANNEL_TYPES, FILES_WINDOW_SECS, Task};
pub use workspace::{seed_tasks, sync_workspace, sync_workspace_at};
