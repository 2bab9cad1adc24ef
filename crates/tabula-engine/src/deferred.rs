//! Deferred work for the host's next event-loop tick.
//!
//! Some updates cannot run while the host is mid-transition, so the engine
//! queues them and the host adapter drains the queue later. Tasks run in
//! FIFO order, which keeps a rebuild ahead of any filter queued after it.

use std::collections::VecDeque;

use tabula_core::GroupId;

/// A unit of deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Rebuild tab associations from scratch
    Rebuild,
    /// Apply the listing filter for a group
    ApplyFilter(GroupId),
}

/// FIFO of pending tasks. Queuing a task that is already pending is a no-op.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    tasks: VecDeque<DeferredTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `task`, returning false when an identical task is pending.
    pub fn defer(&mut self, task: DeferredTask) -> bool {
        if self.tasks.contains(&task) {
            return false;
        }
        self.tasks.push_back(task);
        true
    }

    pub fn pop(&mut self) -> Option<DeferredTask> {
        self.tasks.pop_front()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
