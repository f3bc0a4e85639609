use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::task::{Task, TaskId, TaskKind, TaskLane, TaskPriority};

/// Abstracts the queue backend consumed by submitters and workers.
///
/// Delivery is at-least-once: a backend may hand the same task out again
/// after a crash, so every stage must be safe to re-run.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, request: EnqueueRequest) -> Result<TaskHandle>;

    /// Takes the most urgent task of `lane`, waiting up to `wait` for one to
    /// show up.
    async fn dequeue(
        &self,
        lane: TaskLane,
        wait: Duration,
    ) -> Result<Option<QueuedTask>>;

    async fn depth(&self, lane: TaskLane) -> Result<usize>;

    /// Enqueue multiple tasks. Default implementation issues tasks one-by-one.
    async fn enqueue_many(
        &self,
        requests: Vec<EnqueueRequest>,
    ) -> Result<Vec<TaskHandle>> {
        let mut out = Vec::with_capacity(requests.len());
        for req in requests {
            out.push(self.enqueue(req).await?);
        }
        Ok(out)
    }
}

/// High-level enqueue request used by submitters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub task: Task,
    pub priority: TaskPriority,
    pub unique_id: String,
    pub requested_at: DateTime<Utc>,
}

impl EnqueueRequest {
    pub fn new(task: Task) -> Self {
        Self {
            priority: task.priority(),
            unique_id: task.unique_id(),
            task,
            requested_at: Utc::now(),
        }
    }

    pub fn lane(&self) -> TaskLane {
        self.task.lane()
    }
}

/// Lightweight summary returned to callers after enqueue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: TaskId,
    pub kind: TaskKind,
    pub lane: TaskLane,
    pub unique_id: String,
    pub priority: TaskPriority,
    pub accepted: bool,
    pub merged_into: Option<TaskId>,
}

impl TaskHandle {
    pub fn accepted(task_id: TaskId, request: &EnqueueRequest) -> Self {
        Self {
            task_id,
            kind: request.task.kind(),
            lane: request.lane(),
            unique_id: request.unique_id.clone(),
            priority: request.priority,
            accepted: true,
            merged_into: None,
        }
    }

    pub fn merged(
        existing: TaskId,
        request: &EnqueueRequest,
        priority: TaskPriority,
    ) -> Self {
        Self {
            task_id: existing,
            kind: request.task.kind(),
            lane: request.lane(),
            unique_id: request.unique_id.clone(),
            priority,
            accepted: false,
            merged_into: Some(existing),
        }
    }
}

/// A task handed to exactly one consumer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: TaskId,
    pub task: Task,
    pub enqueued_at: DateTime<Utc>,
    pub delivered_at: DateTime<Utc>,
}
