//! Run-wide state shared by every task

use anyhow::Result;

use crate::api::SlackApi;
use crate::models::{BookmarkStore, Record};
use crate::output::{MessageSink, RecordEmitter};

/// Statistics from a sync run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncStats {
    /// Number of tasks executed (one API call each, not counting 429 retries)
    pub tasks_executed: usize,
    /// Number of records written
    pub records_emitted: usize,
    /// Number of bookmark updates that moved a watermark forward
    pub bookmarks_advanced: usize,
    /// Duration of the run
    pub duration_ms: u64,
}

/// Everything a task needs while executing
///
/// Created once per run; the bookmark store, the declared-schema set and the
/// sync epoch live here rather than in globals.
pub struct SyncContext<'a> {
    api: &'a dyn SlackApi,
    emitter: RecordEmitter<'a>,
    bookmarks: BookmarkStore,
    sync_epoch: f64,
    stats: SyncStats,
}

impl<'a> SyncContext<'a> {
    /// # Arguments
    /// * `api` - Transport every task issues its request through
    /// * `sink` - Destination for schema, record and state messages
    /// * `bookmarks` - Watermarks resumed from prior state (or empty)
    /// * `sync_epoch` - Fixed "now" in epoch seconds, captured at run start
    pub fn new(
        api: &'a dyn SlackApi,
        sink: &'a mut dyn MessageSink,
        bookmarks: BookmarkStore,
        sync_epoch: f64,
    ) -> Self {
        Self {
            api,
            emitter: RecordEmitter::new(sink),
            bookmarks,
            sync_epoch,
            stats: SyncStats::default(),
        }
    }

    pub fn api(&self) -> &'a dyn SlackApi {
        self.api
    }

    pub fn sync_epoch(&self) -> f64 {
        self.sync_epoch
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Declare `stream` if needed, then write `record`
    pub fn emit_record(&mut self, stream: &str, record: Record) -> Result<()> {
        self.emitter.ensure_schema(stream)?;
        self.emitter.emit(stream, record)?;
        self.stats.records_emitted += 1;
        Ok(())
    }

    /// Advance a watermark, checkpointing state when it moves
    pub fn update_bookmark(&mut self, key: &str, candidate: f64) -> Result<bool> {
        let advanced = self.bookmarks.update(key, candidate, &mut self.emitter)?;
        if advanced {
            self.stats.bookmarks_advanced += 1;
        }
        Ok(advanced)
    }

    pub(crate) fn task_executed(&mut self) {
        self.stats.tasks_executed += 1;
    }

    /// Final flush at normal end of run: the full bookmark map once more
    pub fn finish(mut self) -> Result<(BookmarkStore, SyncStats)> {
        self.emitter.write_state(&self.bookmarks.to_state())?;
        self.emitter.flush()?;
        Ok((self.bookmarks, self.stats))
    }
}
