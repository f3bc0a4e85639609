//! Background task engine.
//!
//! Library maintenance runs out of band from user requests: a trigger submits
//! a root [`Task`], a worker picks it up from the [`TaskQueue`], runs the
//! matching stage through the [`TaskHandler`] and submits the next stages one
//! priority step lower. These modules hold the task model, the queue boundary
//! and its in-memory backend, the submitter, the handler and the worker
//! runtime.

pub mod config;
pub mod events;
pub mod handler;
pub mod memory;
pub mod ports;
pub mod queue;
pub mod runtime;
pub mod submitter;
pub mod task;

pub use config::{EventConfig, QueueConfig, TaskEngineConfig, WorkerConfig};
pub use events::{
    InProcTaskEventBus, NoopTaskEvents, TaskEvent, TaskEventPayload,
    TaskEventSink, TaskMetrics, TaskMetricsSnapshot,
};
pub use handler::{TaskHandler, TaskOutcome};
pub use memory::InMemoryTaskQueue;
pub use ports::{
    BookCatalog, BookConverter, BookImporter, BookLifecycle, BookRepository,
    LibraryContentLifecycle, LibraryRepository, MetadataLifecycle,
    SeriesRepository, TaskCollaborators,
};
pub use queue::{EnqueueRequest, QueuedTask, TaskHandle, TaskQueue};
pub use runtime::TaskRuntime;
pub use submitter::{QueueTaskSubmitter, TaskSubmitter};
pub use task::{
    DEFAULT_PRIORITY, HIGH_PRIORITY, HIGHEST_PRIORITY, LOWEST_PRIORITY, Task,
    TaskId, TaskKind, TaskLane, TaskPriority, TaskSubject,
};
