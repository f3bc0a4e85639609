//! Task lifecycle notifications.
//!
//! The handler reports every dispatch to a [`TaskEventSink`] that is created
//! with the runtime and flushed when it shuts down. Sinks must never fail a
//! task: publishing errors are logged and dropped by the caller.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::error::Result;

use super::{
    config::EventConfig,
    handler::TaskOutcome,
    task::{Task, TaskSubject},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task: Task,
    pub payload: TaskEventPayload,
    pub at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn started(task: &Task) -> Self {
        Self::new(task, TaskEventPayload::Started)
    }

    pub fn finished(task: &Task, outcome: &TaskOutcome) -> Self {
        Self::new(task, TaskEventPayload::from(outcome))
    }

    fn new(task: &Task, payload: TaskEventPayload) -> Self {
        Self {
            task: task.clone(),
            payload,
            at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEventPayload {
    Started,
    Completed {
        duration: Duration,
        follow_ups: usize,
    },
    Skipped {
        missing: TaskSubject,
    },
    Failed {
        error: String,
    },
}

impl From<&TaskOutcome> for TaskEventPayload {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Completed {
                duration,
                follow_ups,
            } => TaskEventPayload::Completed {
                duration: *duration,
                follow_ups: *follow_ups,
            },
            TaskOutcome::Skipped { missing } => {
                TaskEventPayload::Skipped { missing: *missing }
            }
            TaskOutcome::Failed { error } => TaskEventPayload::Failed {
                error: error.clone(),
            },
        }
    }
}

#[async_trait]
pub trait TaskEventSink: Send + Sync {
    async fn publish(&self, event: TaskEvent) -> Result<()>;

    /// Called once when the runtime shuts down.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTaskEvents;

#[async_trait]
impl TaskEventSink for NoopTaskEvents {
    async fn publish(&self, _event: TaskEvent) -> Result<()> {
        Ok(())
    }
}

/// Fans task events out to in-process observers.
pub struct InProcTaskEventBus {
    sender: broadcast::Sender<TaskEvent>,
    capacity: usize,
}

impl fmt::Debug for InProcTaskEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcTaskEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl InProcTaskEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, capacity }
    }

    pub fn from_config(config: &EventConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl TaskEventSink for InProcTaskEventBus {
    async fn publish(&self, event: TaskEvent) -> Result<()> {
        // No subscribers is fine.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Process-wide task counters.
#[derive(Debug, Default)]
pub struct TaskMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    follow_ups: AtomicU64,
    busy_ms: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetricsSnapshot {
    pub started: u64,
    pub completed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub follow_ups: u64,
    pub busy_ms: u64,
}

impl TaskMetricsSnapshot {
    /// Tasks that started but have not reported an outcome yet.
    pub fn in_flight(&self) -> u64 {
        self.started
            .saturating_sub(self.completed + self.skipped + self.failed)
    }
}

impl TaskMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TaskMetricsSnapshot {
        TaskMetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            follow_ups: self.follow_ups.load(Ordering::Relaxed),
            busy_ms: self.busy_ms.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl TaskEventSink for TaskMetrics {
    async fn publish(&self, event: TaskEvent) -> Result<()> {
        match event.payload {
            TaskEventPayload::Started => {
                self.started.fetch_add(1, Ordering::Relaxed);
            }
            TaskEventPayload::Completed {
                duration,
                follow_ups,
            } => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                self.follow_ups
                    .fetch_add(follow_ups as u64, Ordering::Relaxed);
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                self.busy_ms.fetch_add(ms, Ordering::Relaxed);
            }
            TaskEventPayload::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            TaskEventPayload::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let snapshot = self.snapshot();
        info!(
            started = snapshot.started,
            completed = snapshot.completed,
            skipped = snapshot.skipped,
            failed = snapshot.failed,
            follow_ups = snapshot.follow_ups,
            busy_ms = snapshot.busy_ms,
            in_flight = snapshot.in_flight(),
            "task metrics"
        );
        Ok(())
    }
}
