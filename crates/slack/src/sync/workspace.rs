//! Full workspace sync

use anyhow::Result;
use chrono::Utc;
use log::info;

use super::{Scheduler, SyncContext, SyncStats, Task};
use crate::api::SlackApi;
use crate::models::{BookmarkStore, FILES_KEY};
use crate::output::MessageSink;

/// Sync every stream of the workspace
///
/// Captures the sync epoch now, then runs until no work remains. Returns the
/// final bookmarks alongside the run statistics.
///
/// # Arguments
/// * `api` - Slack API transport
/// * `sink` - Destination for schema, record and state messages
/// * `bookmarks` - Watermarks from the previous run's state (or empty)
pub fn sync_workspace(
    api: &dyn SlackApi,
    sink: &mut dyn MessageSink,
    bookmarks: BookmarkStore,
) -> Result<(BookmarkStore, SyncStats)> {
    let sync_epoch = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    sync_workspace_at(api, sink, bookmarks, sync_epoch)
}

/// Sync every stream with an explicit sync epoch
pub fn sync_workspace_at(
    api: &dyn SlackApi,
    sink: &mut dyn MessageSink,
    bookmarks: BookmarkStore,
    sync_epoch: f64,
) -> Result<(BookmarkStore, SyncStats)> {
    let start = std::time::Instant::now();
    let mut ctx = SyncContext::new(api, sink, bookmarks, sync_epoch);

    let mut scheduler = Scheduler::new(seed_tasks(&ctx));
    scheduler.run(&mut ctx)?;

    let (bookmarks, mut stats) = ctx.finish()?;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Completed sync: {} tasks, {} records, {} bookmark updates in {}ms",
        stats.tasks_executed, stats.records_emitted, stats.bookmarks_advanced, stats.duration_ms
    );
    Ok((bookmarks, stats))
}

/// The top-level tasks every run starts from
///
/// The scheduler takes from the back, so `ListUsers` runs first.
pub fn seed_tasks(ctx: &SyncContext<'_>) -> Vec<Task> {
    vec![
        Task::list_channels(),
        Task::ListEmoji,
        Task::files_window(ctx.bookmarks().get(FILES_KEY), ctx.sync_epoch()),
        Task::TeamInfo,
        Task::ListUserGroups,
        Task::list_users(),
    ]
}
