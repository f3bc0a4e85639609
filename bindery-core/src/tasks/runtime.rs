use std::{fmt, sync::Arc};

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{BinderyError, Result};

use super::{
    config::TaskEngineConfig,
    events::TaskEventSink,
    handler::TaskHandler,
    queue::TaskQueue,
    task::TaskLane,
};

/// Owns the consumer pools that drain the task queue.
///
/// Every lane gets its own pool. A worker takes one task at a time and runs it
/// to completion; cancellation only stops workers between tasks.
pub struct TaskRuntime {
    config: TaskEngineConfig,
    queue: Arc<dyn TaskQueue>,
    handler: Arc<TaskHandler>,
    events: Arc<dyn TaskEventSink>,
    shutdown_token: CancellationToken,
    worker_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let workers = self
            .worker_handles
            .try_lock()
            .map(|handles| handles.len())
            .ok();
        f.debug_struct("TaskRuntime")
            .field("config", &self.config)
            .field("handler", &self.handler)
            .field("workers", &workers)
            .field("shutdown_cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl TaskRuntime {
    pub fn new(
        config: TaskEngineConfig,
        queue: Arc<dyn TaskQueue>,
        handler: Arc<TaskHandler>,
        events: Arc<dyn TaskEventSink>,
    ) -> Self {
        Self {
            config,
            queue,
            handler,
            events,
            shutdown_token: CancellationToken::new(),
            worker_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &TaskEngineConfig {
        &self.config
    }

    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        Arc::clone(&self.queue)
    }

    pub async fn start(&self) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(BinderyError::Conflict(
                "task runtime was already shut down".into(),
            ));
        }
        if !self.worker_handles.lock().await.is_empty() {
            return Err(BinderyError::Conflict(
                "task runtime already started".into(),
            ));
        }

        self.spawn_worker_pool(TaskLane::Scan, self.config.workers.scan_workers)
            .await;
        self.spawn_worker_pool(
            TaskLane::Processing,
            self.config.workers.task_workers,
        )
        .await;

        info!(
            scan_workers = self.config.workers.scan_workers,
            task_workers = self.config.workers.task_workers,
            "task runtime started"
        );
        Ok(())
    }

    async fn spawn_worker_pool(&self, lane: TaskLane, parallelism: usize) {
        let wait = self.config.queue.dequeue_wait();
        let mut handles = self.worker_handles.lock().await;

        for i in 0..parallelism {
            let worker_id = format!("{lane}-w{i}");
            let queue = Arc::clone(&self.queue);
            let handler = Arc::clone(&self.handler);
            let shutdown = self.shutdown_token.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        next = queue.dequeue(lane, wait) => next,
                    };

                    match next {
                        Ok(Some(queued)) => {
                            trace!(
                                worker = %worker_id,
                                task_id = %queued.id,
                                waited_ms = (queued.delivered_at - queued.enqueued_at)
                                    .num_milliseconds(),
                                "picked up task"
                            );
                            handler.handle(queued.task).await;
                        }
                        Ok(None) => {}
                        Err(BinderyError::QueueClosed) => {
                            debug!(worker = %worker_id, "queue closed");
                            break;
                        }
                        Err(err) => {
                            warn!(worker = %worker_id, error = %err, "dequeue failed");
                            tokio::select! {
                                _ = shutdown.cancelled() => break,
                                _ = tokio::time::sleep(wait) => {}
                            }
                        }
                    }
                }
                debug!(worker = %worker_id, "worker stopped");
            }));
        }
    }

    /// Stops taking new tasks, waits for in-flight ones and flushes the event
    /// sink. Workers that outlive the shutdown timeout are left to finish
    /// detached and counted in a warning. Tasks still queued stay in the
    /// queue.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down task runtime");
        self.shutdown_token.cancel();

        let handles = {
            let mut guard = self.worker_handles.lock().await;
            std::mem::take(&mut *guard)
        };

        let timeout = self.config.shutdown_timeout();
        let mut still_running = 0usize;
        for handle in handles {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("worker failed: {e:?}"),
                // Dropping the handle detaches the worker; its task keeps
                // running to completion.
                Err(_) => still_running += 1,
            }
        }
        if still_running > 0 {
            warn!(
                workers = still_running,
                timeout_secs = timeout.as_secs(),
                "workers still running a task after the shutdown timeout; \
                 their outcomes are missing from the flushed events"
            );
        }

        self.events.flush().await?;
        info!("task runtime shutdown complete");
        Ok(())
    }
}
