//! Single-process queue backend.
//!
//! Tasks live in one binary heap per lane ordered by priority, then by
//! submission order. Nothing survives a restart; periodic library scans
//! re-create whatever work was lost.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    fmt,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, trace};

use crate::error::{BinderyError, Result};

use super::{
    config::QueueConfig,
    queue::{EnqueueRequest, QueuedTask, TaskHandle, TaskQueue},
    task::{Task, TaskId, TaskLane, TaskPriority},
};

/// Priority queue item wrapper
#[derive(Debug, Clone)]
struct PendingTask {
    id: TaskId,
    task: Task,
    priority: TaskPriority,
    unique_id: String,
    enqueued_at: DateTime<Utc>,
    sequence: u64, // For stable sorting of same priority
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest item: lower priority value first, then
        // earlier sequence
        match other.priority.cmp(&self.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ordering => ordering,
        }
    }
}

#[derive(Debug, Default)]
struct LaneState {
    pending: BinaryHeap<PendingTask>,
    by_unique_id: HashMap<String, TaskId>,
}

impl LaneState {
    /// Raises the priority of a pending task, rebuilding the heap when the
    /// ordering actually changes.
    fn elevate(&mut self, task_id: TaskId, target: TaskPriority) -> TaskPriority {
        let current = self
            .pending
            .iter()
            .find(|item| item.id == task_id)
            .map(|item| item.priority)
            .unwrap_or(target);
        let elevated = current.elevate(target);
        if elevated == current {
            return current;
        }

        let mut items: Vec<_> = self.pending.drain().collect();
        for item in &mut items {
            if item.id == task_id {
                item.priority = elevated;
                item.task = item.task.clone().with_priority(elevated);
            }
        }
        self.pending = items.into_iter().collect();
        elevated
    }
}

#[derive(Debug, Default)]
struct QueueState {
    lanes: HashMap<TaskLane, LaneState>,
    sequence: u64,
    closed: bool,
}

impl QueueState {
    fn total_pending(&self) -> usize {
        self.lanes.values().map(|lane| lane.pending.len()).sum()
    }
}

/// In-memory [`TaskQueue`] with per-lane priority ordering and duplicate
/// merging on [`Task::unique_id`].
pub struct InMemoryTaskQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    scan_ready: Notify,
    processing_ready: Notify,
}

impl fmt::Debug for InMemoryTaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryTaskQueue");
        debug.field("capacity", &self.capacity);

        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("pending", &state.total_pending())
                    .field("closed", &state.closed);
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

impl InMemoryTaskQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(QueueState::default()),
            scan_ready: Notify::new(),
            processing_ready: Notify::new(),
        }
    }

    /// Stops accepting tasks and wakes every blocked consumer. Tasks still
    /// pending can be drained with `dequeue`, which reports
    /// [`BinderyError::QueueClosed`] once the lane is empty.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.scan_ready.notify_waiters();
        self.processing_ready.notify_waiters();
    }

    fn notifier(&self, lane: TaskLane) -> &Notify {
        match lane {
            TaskLane::Scan => &self.scan_ready,
            TaskLane::Processing => &self.processing_ready,
        }
    }

    async fn try_pop(&self, lane: TaskLane) -> (Option<QueuedTask>, bool) {
        let mut state = self.state.lock().await;
        let closed = state.closed;
        let Some(lane_state) = state.lanes.get_mut(&lane) else {
            return (None, closed);
        };

        let Some(item) = lane_state.pending.pop() else {
            return (None, closed);
        };
        lane_state.by_unique_id.remove(&item.unique_id);

        trace!(
            task_id = %item.id,
            lane = %lane,
            priority = %item.priority,
            "task delivered"
        );

        let delivered = QueuedTask {
            id: item.id,
            task: item.task,
            enqueued_at: item.enqueued_at,
            delivered_at: Utc::now(),
        };
        (Some(delivered), closed)
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<TaskHandle> {
        let lane = request.lane();
        let handle = {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(BinderyError::QueueClosed);
            }

            let existing = state
                .lanes
                .get(&lane)
                .and_then(|l| l.by_unique_id.get(&request.unique_id))
                .copied();

            if let Some(existing) = existing {
                let lane_state = state.lanes.entry(lane).or_default();
                let priority = lane_state.elevate(existing, request.priority);
                debug!(
                    task_id = %existing,
                    unique_id = %request.unique_id,
                    priority = %priority,
                    "merged duplicate task into pending entry"
                );
                TaskHandle::merged(existing, &request, priority)
            } else {
                if state.total_pending() >= self.capacity {
                    return Err(BinderyError::QueueFull {
                        capacity: self.capacity,
                    });
                }

                let sequence = state.sequence;
                state.sequence += 1;

                let task_id = TaskId::new();
                let handle = TaskHandle::accepted(task_id, &request);
                let lane_state = state.lanes.entry(lane).or_default();
                lane_state
                    .by_unique_id
                    .insert(request.unique_id.clone(), task_id);
                lane_state.pending.push(PendingTask {
                    id: task_id,
                    task: request.task.with_priority(request.priority),
                    priority: request.priority,
                    unique_id: request.unique_id,
                    enqueued_at: request.requested_at,
                    sequence,
                });
                handle
            }
        };

        if handle.accepted {
            self.notifier(lane).notify_one();
        }
        Ok(handle)
    }

    async fn dequeue(
        &self,
        lane: TaskLane,
        wait: Duration,
    ) -> Result<Option<QueuedTask>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before checking so a concurrent enqueue
            // between the check and the wait is not missed.
            let notified = self.notifier(lane).notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (delivered, closed) = self.try_pop(lane).await;
            if delivered.is_some() {
                return Ok(delivered);
            }
            if closed {
                return Err(BinderyError::QueueClosed);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn depth(&self, lane: TaskLane) -> Result<usize> {
        let state = self.state.lock().await;
        Ok(state
            .lanes
            .get(&lane)
            .map(|l| l.pending.len())
            .unwrap_or_default())
    }
}
