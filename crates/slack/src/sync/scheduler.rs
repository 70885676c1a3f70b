//! Drives the pending-task list to exhaustion
//!
//! The list is a deque with fixed ends: tasks are taken from the back, and
//! the follow-ups of a step are put at the front, ahead of everything
//! already pending and in the order they were returned. So every task that
//! was pending when a step began runs before that step's follow-ups, and
//! follow-ups produced by one step stay adjacent.

use anyhow::Result;
use log::info;
use std::collections::VecDeque;

use super::{SyncContext, Task};

pub struct Scheduler {
    pending: VecDeque<Task>,
}

impl Scheduler {
    pub fn new(seeds: Vec<Task>) -> Self {
        Self {
            pending: seeds.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take the next task to run from the back
    pub fn next_task(&mut self) -> Option<Task> {
        self.pending.pop_back()
    }

    /// Put one step's follow-ups at the front, keeping their order
    pub fn schedule(&mut self, follow_ups: Vec<Task>) {
        for task in follow_ups.into_iter().rev() {
            self.pending.push_front(task);
        }
    }

    /// Execute tasks until none remain, returning how many ran
    ///
    /// The first error aborts the run; tasks still pending are dropped.
    pub fn run(&mut self, ctx: &mut SyncContext<'_>) -> Result<usize> {
        let mut executed = 0;
        while let Some(task) = self.next_task() {
            info!(
                "Processing {} ({:?}), {} requests pending",
                task.method(),
                task.params(),
                self.pending.len()
            );
            let follow_ups = task.execute(ctx)?;
            ctx.task_executed();
            executed += 1;
            self.schedule(follow_ups);
        }
        Ok(executed)
    }
}
