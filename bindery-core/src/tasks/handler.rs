use std::{
    any::Any,
    fmt,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use bindery_model::{Book, BookID, MetadataCapability, Series, SeriesID};
use futures::FutureExt;
use tracing::{Instrument, debug, debug_span, error, info, warn};

use crate::error::Result;

use super::{
    events::{TaskEvent, TaskEventSink},
    ports::TaskCollaborators,
    submitter::TaskSubmitter,
    task::{LOWEST_PRIORITY, Task, TaskSubject},
};

/// How a single dispatch ended. Dispatch never returns an error: failures are
/// logged and reported here so the consumer can move on to the next task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    Completed {
        duration: Duration,
        /// Submissions made after the stage succeeded. A library-wide sweep
        /// counts once.
        follow_ups: usize,
    },
    /// The referenced entity no longer exists.
    Skipped { missing: TaskSubject },
    Failed { error: String },
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }
}

enum Execution {
    Done { follow_ups: usize },
    Missing(TaskSubject),
}

/// Runs tasks delivered by the queue and chains the next pipeline stages.
///
/// ```text
/// scan library -> analyze unknown/outdated books -> analyze book
///              -> convert books (only if the library auto-converts)
/// analyze book (changed) -> generate thumbnail
///                        -> refresh book metadata -> refresh series metadata
///                                                 -> aggregate series metadata
/// import book -> analyze book
/// ```
///
/// Follow-ups are submitted one priority step below the task that produced
/// them. Submission happens after the stage has finished and is not
/// transactional with it: a crash in between loses the rest of the chain
/// until the next scan picks the books up again.
#[derive(Clone)]
pub struct TaskHandler {
    collaborators: TaskCollaborators,
    submitter: Arc<dyn TaskSubmitter>,
    events: Arc<dyn TaskEventSink>,
}

impl fmt::Debug for TaskHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandler")
            .field("collaborators", &self.collaborators)
            .field("submitter", &"TaskSubmitter")
            .field("events", &"TaskEventSink")
            .finish()
    }
}

impl TaskHandler {
    pub fn new(
        collaborators: TaskCollaborators,
        submitter: Arc<dyn TaskSubmitter>,
        events: Arc<dyn TaskEventSink>,
    ) -> Self {
        Self {
            collaborators,
            submitter,
            events,
        }
    }

    pub async fn handle(&self, task: Task) -> TaskOutcome {
        let span = debug_span!(
            "task",
            kind = %task.kind(),
            subject = %task.subject(),
            priority = %task.priority()
        );
        self.handle_inner(task).instrument(span).await
    }

    async fn handle_inner(&self, task: Task) -> TaskOutcome {
        debug!("running {task}");
        self.publish(TaskEvent::started(&task)).await;

        let started = Instant::now();
        let result = AssertUnwindSafe(self.execute(&task)).catch_unwind().await;
        let duration = started.elapsed();

        let outcome = match result {
            Ok(Ok(Execution::Done { follow_ups })) => {
                info!(
                    duration_ms = duration.as_millis() as u64,
                    follow_ups,
                    "{task} executed in {duration:?}"
                );
                TaskOutcome::Completed {
                    duration,
                    follow_ups,
                }
            }
            Ok(Ok(Execution::Missing(missing))) => {
                warn!(%missing, "{missing} could not be found, skipping {task}");
                info!(
                    duration_ms = duration.as_millis() as u64,
                    "{task} executed in {duration:?}"
                );
                TaskOutcome::Skipped { missing }
            }
            Ok(Err(err)) => {
                error!(task = %task, error = %err, "task failed");
                TaskOutcome::Failed {
                    error: err.to_string(),
                }
            }
            Err(panic) => {
                let message = panic_message(&*panic);
                error!(task = %task, panic = %message, "task panicked");
                TaskOutcome::Failed {
                    error: format!("panicked: {message}"),
                }
            }
        };

        self.publish(TaskEvent::finished(&task, &outcome)).await;
        outcome
    }

    async fn publish(&self, event: TaskEvent) {
        if let Err(err) = self.events.publish(event).await {
            warn!(error = %err, "failed to publish task event");
        }
    }

    async fn execute(&self, task: &Task) -> Result<Execution> {
        let next = task.priority().follow_up();
        let actors = &self.collaborators;

        match task {
            Task::ScanLibrary { library_id, .. } => {
                let Some(library) = actors.libraries.find_by_id(*library_id).await?
                else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors.content.scan_root_folder(&library).await?;

                self.submitter
                    .analyze_unknown_and_outdated_books(&library, next)
                    .await?;
                let mut follow_ups = 1;
                if library.convert_to_cbz {
                    self.submitter
                        .convert_books_to_cbz(&library, LOWEST_PRIORITY)
                        .await?;
                    follow_ups += 1;
                }
                Ok(Execution::Done { follow_ups })
            }
            Task::AnalyzeBook { book_id, .. } => {
                let Some(book) = self.find_book(*book_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                if !actors.book_lifecycle.analyze_and_persist(&book).await? {
                    return Ok(Execution::Done { follow_ups: 0 });
                }

                self.submitter.generate_book_thumbnail(book.id, next).await?;
                self.submitter
                    .refresh_book_metadata(book.id, MetadataCapability::all(), next)
                    .await?;
                Ok(Execution::Done { follow_ups: 2 })
            }
            Task::GenerateBookThumbnail { book_id, .. } => {
                let Some(book) = self.find_book(*book_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors
                    .book_lifecycle
                    .generate_thumbnail_and_persist(&book)
                    .await?;
                Ok(Execution::Done { follow_ups: 0 })
            }
            Task::RefreshBookMetadata {
                book_id,
                capabilities,
                ..
            } => {
                let Some(book) = self.find_book(*book_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors
                    .metadata
                    .refresh_book_metadata(&book, capabilities)
                    .await?;
                self.submitter
                    .refresh_series_metadata(book.series_id, next)
                    .await?;
                Ok(Execution::Done { follow_ups: 1 })
            }
            Task::RefreshSeriesMetadata { series_id, .. } => {
                let Some(series) = self.find_series(*series_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors.metadata.refresh_series_metadata(&series).await?;
                self.submitter
                    .aggregate_series_metadata(series.id, next)
                    .await?;
                Ok(Execution::Done { follow_ups: 1 })
            }
            Task::AggregateSeriesMetadata { series_id, .. } => {
                let Some(series) = self.find_series(*series_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors.metadata.aggregate_series_metadata(&series).await?;
                Ok(Execution::Done { follow_ups: 0 })
            }
            Task::ImportBook {
                source_file,
                series_id,
                copy_mode,
                destination_name,
                upgrade_book_id,
                ..
            } => {
                let Some(series) = self.find_series(*series_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                let imported = actors
                    .importer
                    .import_book(
                        source_file,
                        &series,
                        *copy_mode,
                        destination_name.as_deref(),
                        *upgrade_book_id,
                    )
                    .await?;
                self.submitter.analyze_book(imported.id, next).await?;
                Ok(Execution::Done { follow_ups: 1 })
            }
            Task::ConvertBook { book_id, .. } => {
                let Some(book) = self.find_book(*book_id).await? else {
                    return Ok(Execution::Missing(task.subject()));
                };
                actors.converter.convert_to_cbz(&book).await?;
                Ok(Execution::Done { follow_ups: 0 })
            }
        }
    }

    async fn find_book(&self, book_id: BookID) -> Result<Option<Book>> {
        self.collaborators.books.find_by_id(book_id).await
    }

    async fn find_series(
        &self,
        series_id: SeriesID,
    ) -> Result<Option<Series>> {
        self.collaborators.series.find_by_id(series_id).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
