//! Collaborators the task engine calls into.
//!
//! Persistence and the actual scanning, analysis, thumbnailing, metadata and
//! conversion logic live outside this crate. The handler only sees these
//! traits, so every implementation must be safe to call again for the same
//! entity: the queue delivers at least once.

use std::{collections::BTreeSet, fmt, path::Path, sync::Arc};

use async_trait::async_trait;
use bindery_model::{
    Book, BookID, CopyMode, Library, LibraryID, MediaStatus, MetadataCapability,
    Series, SeriesID,
};

use crate::error::Result;

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn find_by_id(&self, id: LibraryID) -> Result<Option<Library>>;

    /// Every library known to the server. Used by periodic scan triggers.
    async fn find_all_ids(&self) -> Result<Vec<LibraryID>>;
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: BookID) -> Result<Option<Book>>;
}

#[async_trait]
pub trait SeriesRepository: Send + Sync {
    async fn find_by_id(&self, id: SeriesID) -> Result<Option<Series>>;
}

/// Read-side queries the library-wide sweeps fan out over.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn book_ids_by_media_status(
        &self,
        library_id: LibraryID,
        statuses: &[MediaStatus],
    ) -> Result<Vec<BookID>>;

    /// Books of the library whose container format can be converted to CBZ.
    async fn convertible_book_ids(
        &self,
        library_id: LibraryID,
    ) -> Result<Vec<BookID>>;
}

#[async_trait]
pub trait LibraryContentLifecycle: Send + Sync {
    /// Walks the library root, adding, updating and trashing books and
    /// series. Fails on I/O errors.
    async fn scan_root_folder(&self, library: &Library) -> Result<()>;
}

#[async_trait]
pub trait BookLifecycle: Send + Sync {
    /// Analyzes the book file and persists the media. Returns `true` when the
    /// persisted state changed.
    async fn analyze_and_persist(&self, book: &Book) -> Result<bool>;

    async fn generate_thumbnail_and_persist(&self, book: &Book) -> Result<()>;
}

#[async_trait]
pub trait MetadataLifecycle: Send + Sync {
    async fn refresh_book_metadata(
        &self,
        book: &Book,
        capabilities: &BTreeSet<MetadataCapability>,
    ) -> Result<()>;

    async fn refresh_series_metadata(&self, series: &Series) -> Result<()>;

    /// Recomputes series rollups from the constituent books.
    async fn aggregate_series_metadata(&self, series: &Series) -> Result<()>;
}

#[async_trait]
pub trait BookImporter: Send + Sync {
    /// Imports `source_file` into `series` and returns the created book.
    /// When `upgrade_book_id` is set the existing book is replaced.
    async fn import_book(
        &self,
        source_file: &Path,
        series: &Series,
        copy_mode: CopyMode,
        destination_name: Option<&str>,
        upgrade_book_id: Option<BookID>,
    ) -> Result<Book>;
}

#[async_trait]
pub trait BookConverter: Send + Sync {
    async fn convert_to_cbz(&self, book: &Book) -> Result<()>;
}

/// Bundle of collaborators handed to the task handler.
#[derive(Clone)]
pub struct TaskCollaborators {
    pub libraries: Arc<dyn LibraryRepository>,
    pub books: Arc<dyn BookRepository>,
    pub series: Arc<dyn SeriesRepository>,
    pub content: Arc<dyn LibraryContentLifecycle>,
    pub book_lifecycle: Arc<dyn BookLifecycle>,
    pub metadata: Arc<dyn MetadataLifecycle>,
    pub importer: Arc<dyn BookImporter>,
    pub converter: Arc<dyn BookConverter>,
}

impl fmt::Debug for TaskCollaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCollaborators")
            .field("libraries", &"LibraryRepository")
            .field("books", &"BookRepository")
            .field("series", &"SeriesRepository")
            .field("content", &"LibraryContentLifecycle")
            .field("book_lifecycle", &"BookLifecycle")
            .field("metadata", &"MetadataLifecycle")
            .field("importer", &"BookImporter")
            .field("converter", &"BookConverter")
            .finish()
    }
}
