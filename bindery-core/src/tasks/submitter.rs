use std::{collections::BTreeSet, fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use bindery_model::{
    BookID, CopyMode, Library, LibraryID, MediaStatus, MetadataCapability,
    SeriesID,
};
use tracing::{debug, info};

use crate::error::Result;

use super::{
    ports::{BookCatalog, LibraryRepository},
    queue::{EnqueueRequest, TaskHandle, TaskQueue},
    task::{Task, TaskPriority},
};

/// Entry point for anything that wants background work done.
///
/// Submission is fire-and-forget: the only feedback is whether the queue took
/// the task. Completion is never reported back to the caller.
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit(&self, task: Task) -> Result<()>;

    /// Queues an [`Task::AnalyzeBook`] for every book of the library that was
    /// never analyzed or changed on disk since.
    async fn analyze_unknown_and_outdated_books(
        &self,
        library: &Library,
        priority: TaskPriority,
    ) -> Result<()>;

    /// Queues a [`Task::ConvertBook`] for every convertible book of the
    /// library.
    async fn convert_books_to_cbz(
        &self,
        library: &Library,
        priority: TaskPriority,
    ) -> Result<()>;

    async fn scan_library(
        &self,
        library_id: LibraryID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::ScanLibrary {
            library_id,
            priority,
        })
        .await
    }

    async fn analyze_book(
        &self,
        book_id: BookID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::AnalyzeBook { book_id, priority }).await
    }

    async fn generate_book_thumbnail(
        &self,
        book_id: BookID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::GenerateBookThumbnail { book_id, priority })
            .await
    }

    async fn refresh_book_metadata(
        &self,
        book_id: BookID,
        capabilities: BTreeSet<MetadataCapability>,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::RefreshBookMetadata {
            book_id,
            capabilities,
            priority,
        })
        .await
    }

    async fn refresh_series_metadata(
        &self,
        series_id: SeriesID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::RefreshSeriesMetadata {
            series_id,
            priority,
        })
        .await
    }

    async fn aggregate_series_metadata(
        &self,
        series_id: SeriesID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::AggregateSeriesMetadata {
            series_id,
            priority,
        })
        .await
    }

    async fn import_book(
        &self,
        source_file: PathBuf,
        series_id: SeriesID,
        copy_mode: CopyMode,
        destination_name: Option<String>,
        upgrade_book_id: Option<BookID>,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::ImportBook {
            source_file,
            series_id,
            copy_mode,
            destination_name,
            upgrade_book_id,
            priority,
        })
        .await
    }

    async fn convert_book(
        &self,
        book_id: BookID,
        priority: TaskPriority,
    ) -> Result<()> {
        self.submit(Task::ConvertBook { book_id, priority }).await
    }
}

/// [`TaskSubmitter`] backed by a [`TaskQueue`].
pub struct QueueTaskSubmitter<Q>
where
    Q: TaskQueue + ?Sized,
{
    queue: Arc<Q>,
    catalog: Arc<dyn BookCatalog>,
    libraries: Arc<dyn LibraryRepository>,
}

impl<Q> fmt::Debug for QueueTaskSubmitter<Q>
where
    Q: TaskQueue + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTaskSubmitter")
            .field("queue", &std::any::type_name::<Q>())
            .field("catalog", &"BookCatalog")
            .field("libraries", &"LibraryRepository")
            .finish()
    }
}

impl<Q> QueueTaskSubmitter<Q>
where
    Q: TaskQueue + ?Sized,
{
    pub fn new(
        queue: Arc<Q>,
        catalog: Arc<dyn BookCatalog>,
        libraries: Arc<dyn LibraryRepository>,
    ) -> Self {
        Self {
            queue,
            catalog,
            libraries,
        }
    }

    pub fn queue(&self) -> Arc<Q> {
        Arc::clone(&self.queue)
    }

    /// Queues a scan of every library. Returns how many scans were submitted.
    pub async fn scan_libraries(&self, priority: TaskPriority) -> Result<usize> {
        let ids = self.libraries.find_all_ids().await?;
        let count = ids.len();
        self.fan_out(ids.into_iter().map(|library_id| Task::ScanLibrary {
            library_id,
            priority,
        }))
        .await?;
        info!(libraries = count, %priority, "queued library scans");
        Ok(count)
    }

    async fn fan_out<I>(&self, tasks: I) -> Result<()>
    where
        I: IntoIterator<Item = Task> + Send,
        I::IntoIter: Send,
    {
        let requests: Vec<_> = tasks.into_iter().map(EnqueueRequest::new).collect();
        if requests.is_empty() {
            return Ok(());
        }
        let handles = self.queue.enqueue_many(requests).await?;
        for handle in &handles {
            log_handle(handle);
        }
        Ok(())
    }
}

fn log_handle(handle: &TaskHandle) {
    if handle.accepted {
        debug!(
            task_id = %handle.task_id,
            kind = %handle.kind,
            priority = %handle.priority,
            "task queued"
        );
    } else {
        debug!(
            unique_id = %handle.unique_id,
            merged_into = ?handle.merged_into,
            priority = %handle.priority,
            "task already pending, merged"
        );
    }
}

#[async_trait]
impl<Q> TaskSubmitter for QueueTaskSubmitter<Q>
where
    Q: TaskQueue + ?Sized,
{
    async fn submit(&self, task: Task) -> Result<()> {
        let handle = self.queue.enqueue(EnqueueRequest::new(task)).await?;
        log_handle(&handle);
        Ok(())
    }

    async fn analyze_unknown_and_outdated_books(
        &self,
        library: &Library,
        priority: TaskPriority,
    ) -> Result<()> {
        let book_ids = self
            .catalog
            .book_ids_by_media_status(library.id, MediaStatus::needs_analysis())
            .await?;
        debug!(
            library = %library.id,
            books = book_ids.len(),
            "queueing analysis of unknown and outdated books"
        );
        self.fan_out(
            book_ids
                .into_iter()
                .map(|book_id| Task::AnalyzeBook { book_id, priority }),
        )
        .await
    }

    async fn convert_books_to_cbz(
        &self,
        library: &Library,
        priority: TaskPriority,
    ) -> Result<()> {
        let book_ids = self.catalog.convertible_book_ids(library.id).await?;
        debug!(
            library = %library.id,
            books = book_ids.len(),
            "queueing conversion of books to cbz"
        );
        self.fan_out(
            book_ids
                .into_iter()
                .map(|book_id| Task::ConvertBook { book_id, priority }),
        )
        .await
    }
}
