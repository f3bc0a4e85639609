use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global knobs that tune the background task engine.
///
/// All fields carry defaults so a configuration file only needs to mention
/// the values it overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEngineConfig {
    /// Queue sizing and consumer polling.
    pub queue: QueueConfig,
    /// Number of consumers per lane.
    pub workers: WorkerConfig,
    /// In-process task event fan-out.
    pub events: EventConfig,
    /// How long `shutdown` waits for in-flight tasks before giving up on a
    /// worker.
    pub shutdown_timeout_secs: u64,
}

impl Default for TaskEngineConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            workers: WorkerConfig::default(),
            events: EventConfig::default(),
            shutdown_timeout_secs: 30,
        }
    }
}

impl TaskEngineConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending tasks across all lanes.
    pub capacity: usize,
    /// How long an idle consumer blocks on an empty lane before checking for
    /// shutdown again.
    pub dequeue_wait_ms: u64,
}

impl QueueConfig {
    pub fn dequeue_wait(&self) -> Duration {
        Duration::from_millis(self.dequeue_wait_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 100_000,
            dequeue_wait_ms: 500,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Consumers on the scan lane. Scans are disk bound; one is usually right.
    pub scan_workers: usize,
    /// Consumers on the processing lane.
    pub task_workers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scan_workers: 1,
            task_workers: num_cpus::get().clamp(1, 4),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Broadcast buffer for task events; slow subscribers lag past this.
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}
