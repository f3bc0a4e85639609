//! In-memory library server used to drive the task engine end to end.
#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bindery_core::{
    error::{BinderyError, Result},
    tasks::{
        InMemoryTaskQueue, QueueTaskSubmitter, Task, TaskCollaborators,
        TaskEngineConfig, TaskHandler, TaskLane, TaskMetrics, TaskQueue,
        TaskRuntime,
        ports::{
            BookCatalog, BookConverter, BookImporter, BookLifecycle,
            BookRepository, LibraryContentLifecycle, LibraryRepository,
            MetadataLifecycle, SeriesRepository,
        },
    },
};
use bindery_model::{
    Book, BookID, CopyMode, Library, LibraryID, MediaStatus, MetadataCapability,
    Series, SeriesID,
};
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ScanRootFolder(LibraryID),
    Analyze(BookID),
    Thumbnail(BookID),
    RefreshBook(BookID),
    RefreshSeries(SeriesID),
    Aggregate(SeriesID),
    Import(PathBuf, SeriesID, CopyMode, Option<BookID>),
    Convert(BookID),
}

#[derive(Default)]
pub struct FakeLibraryServer {
    libraries: Mutex<HashMap<LibraryID, Library>>,
    books: Mutex<HashMap<BookID, Book>>,
    series: Mutex<HashMap<SeriesID, Series>>,
    calls: Mutex<Vec<Call>>,
    pub analyze_changed: AtomicBool,
    /// Conversions never finish while set.
    pub stall_conversions: AtomicBool,
    /// Conversions currently stalled.
    pub stalled: AtomicUsize,
    broken_books: Mutex<Vec<BookID>>,
    imported: Mutex<Vec<BookID>>,
}

impl fmt::Debug for FakeLibraryServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeLibraryServer").finish_non_exhaustive()
    }
}

impl FakeLibraryServer {
    pub async fn add_library(&self, convert_to_cbz: bool) -> Library {
        let library =
            Library::new("Comics", "/comics").with_convert_to_cbz(convert_to_cbz);
        self.libraries
            .lock()
            .await
            .insert(library.id, library.clone());
        library
    }

    pub async fn add_series(&self, library: &Library, name: &str) -> Series {
        let series = Series::new(library.id, name, library.root.join(name));
        self.series.lock().await.insert(series.id, series.clone());
        series
    }

    pub async fn add_book(&self, series: &Series, file: &str) -> Book {
        let book = Book::new(series.id, series.library_id, series.path.join(file));
        self.books.lock().await.insert(book.id, book.clone());
        book
    }

    pub async fn break_book(&self, book_id: BookID) {
        self.broken_books.lock().await.push(book_id);
    }

    pub async fn imported(&self) -> Vec<BookID> {
        self.imported.lock().await.clone()
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    /// Polls the recorded calls until `done` accepts them.
    pub async fn wait_for<F>(&self, mut done: F) -> Vec<Call>
    where
        F: FnMut(&[Call]) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let calls = self.calls().await;
                if done(&calls) {
                    return calls;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("pipeline did not settle in time")
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn check_book(&self, book: &Book) -> Result<()> {
        if self.broken_books.lock().await.contains(&book.id) {
            return Err(BinderyError::InvalidBook(book.path.display().to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LibraryRepository for FakeLibraryServer {
    async fn find_by_id(&self, id: LibraryID) -> Result<Option<Library>> {
        Ok(self.libraries.lock().await.get(&id).cloned())
    }

    async fn find_all_ids(&self) -> Result<Vec<LibraryID>> {
        Ok(self.libraries.lock().await.keys().copied().collect())
    }
}

#[async_trait]
impl BookRepository for FakeLibraryServer {
    async fn find_by_id(&self, id: BookID) -> Result<Option<Book>> {
        Ok(self.books.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl SeriesRepository for FakeLibraryServer {
    async fn find_by_id(&self, id: SeriesID) -> Result<Option<Series>> {
        Ok(self.series.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl BookCatalog for FakeLibraryServer {
    async fn book_ids_by_media_status(
        &self,
        library_id: LibraryID,
        statuses: &[MediaStatus],
    ) -> Result<Vec<BookID>> {
        let mut ids: Vec<_> = self
            .books
            .lock()
            .await
            .values()
            .filter(|b| b.library_id == library_id)
            .filter(|b| statuses.contains(&b.media_status))
            .map(|b| b.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn convertible_book_ids(
        &self,
        library_id: LibraryID,
    ) -> Result<Vec<BookID>> {
        let mut ids: Vec<_> = self
            .books
            .lock()
            .await
            .values()
            .filter(|b| b.library_id == library_id)
            .filter(|b| b.path.extension().is_some_and(|ext| ext != "cbz"))
            .map(|b| b.id)
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl LibraryContentLifecycle for FakeLibraryServer {
    async fn scan_root_folder(&self, library: &Library) -> Result<()> {
        self.record(Call::ScanRootFolder(library.id)).await;
        Ok(())
    }
}

#[async_trait]
impl BookLifecycle for FakeLibraryServer {
    async fn analyze_and_persist(&self, book: &Book) -> Result<bool> {
        self.record(Call::Analyze(book.id)).await;
        self.check_book(book).await?;
        if let Some(stored) = self.books.lock().await.get_mut(&book.id) {
            stored.media_status = MediaStatus::Ready;
        }
        Ok(self.analyze_changed.load(Ordering::SeqCst))
    }

    async fn generate_thumbnail_and_persist(&self, book: &Book) -> Result<()> {
        self.record(Call::Thumbnail(book.id)).await;
        Ok(())
    }
}

#[async_trait]
impl MetadataLifecycle for FakeLibraryServer {
    async fn refresh_book_metadata(
        &self,
        book: &Book,
        _capabilities: &BTreeSet<MetadataCapability>,
    ) -> Result<()> {
        self.record(Call::RefreshBook(book.id)).await;
        Ok(())
    }

    async fn refresh_series_metadata(&self, series: &Series) -> Result<()> {
        self.record(Call::RefreshSeries(series.id)).await;
        Ok(())
    }

    async fn aggregate_series_metadata(&self, series: &Series) -> Result<()> {
        self.record(Call::Aggregate(series.id)).await;
        Ok(())
    }
}

#[async_trait]
impl BookImporter for FakeLibraryServer {
    async fn import_book(
        &self,
        source_file: &Path,
        series: &Series,
        copy_mode: CopyMode,
        destination_name: Option<&str>,
        upgrade_book_id: Option<BookID>,
    ) -> Result<Book> {
        self.record(Call::Import(
            source_file.to_path_buf(),
            series.id,
            copy_mode,
            upgrade_book_id,
        ))
        .await;
        let file_name = match destination_name {
            Some(name) => format!("{name}.cbz"),
            None => source_file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        let book = self.add_book(series, &file_name).await;
        self.imported.lock().await.push(book.id);
        Ok(book)
    }
}

struct StallGuard<'a>(&'a AtomicUsize);

impl Drop for StallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookConverter for FakeLibraryServer {
    async fn convert_to_cbz(&self, book: &Book) -> Result<()> {
        self.record(Call::Convert(book.id)).await;
        if self.stall_conversions.load(Ordering::SeqCst) {
            self.stalled.fetch_add(1, Ordering::SeqCst);
            let _guard = StallGuard(&self.stalled);
            std::future::pending::<()>().await;
        }
        self.check_book(book).await
    }
}

/// Real queue, submitter and handler wired to a [`FakeLibraryServer`].
#[derive(Debug)]
pub struct Pipeline {
    pub server: Arc<FakeLibraryServer>,
    pub queue: Arc<InMemoryTaskQueue>,
    pub submitter: Arc<QueueTaskSubmitter<InMemoryTaskQueue>>,
    pub handler: Arc<TaskHandler>,
    pub metrics: Arc<TaskMetrics>,
}

impl Pipeline {
    pub fn new() -> Self {
        let server = Arc::new(FakeLibraryServer::default());
        let queue = Arc::new(InMemoryTaskQueue::default());
        let submitter = Arc::new(QueueTaskSubmitter::new(
            Arc::clone(&queue),
            server.clone(),
            server.clone(),
        ));
        let metrics = Arc::new(TaskMetrics::new());
        let collaborators = TaskCollaborators {
            libraries: server.clone(),
            books: server.clone(),
            series: server.clone(),
            content: server.clone(),
            book_lifecycle: server.clone(),
            metadata: server.clone(),
            importer: server.clone(),
            converter: server.clone(),
        };
        let handler = Arc::new(TaskHandler::new(
            collaborators,
            submitter.clone(),
            metrics.clone(),
        ));
        Self {
            server,
            queue,
            submitter,
            handler,
            metrics,
        }
    }

    pub fn runtime(&self, config: TaskEngineConfig) -> TaskRuntime {
        TaskRuntime::new(
            config,
            self.queue.clone(),
            Arc::clone(&self.handler),
            self.metrics.clone(),
        )
    }

    /// Removes and returns everything pending in `lane`.
    pub async fn drain(&self, lane: TaskLane) -> Vec<Task> {
        let mut out = Vec::new();
        while let Some(queued) = self
            .queue
            .dequeue(lane, Duration::ZERO)
            .await
            .expect("in-memory dequeue")
        {
            out.push(queued.task);
        }
        out
    }
}

pub fn fast_config() -> TaskEngineConfig {
    let mut config = TaskEngineConfig::default();
    config.queue.dequeue_wait_ms = 20;
    config.workers.scan_workers = 1;
    config.workers.task_workers = 2;
    config.shutdown_timeout_secs = 5;
    config
}
