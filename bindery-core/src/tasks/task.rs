use std::{collections::BTreeSet, fmt, path::PathBuf};

use bindery_model::{BookID, CopyMode, LibraryID, MetadataCapability, SeriesID};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier assigned to a task when the queue accepts it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task urgency. Smaller values are served first.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskPriority(u8);

/// User-facing work: explicit scans, imports.
pub const HIGHEST_PRIORITY: TaskPriority = TaskPriority(0);
pub const HIGH_PRIORITY: TaskPriority = TaskPriority(2);
/// Periodic scans and sweeps.
pub const DEFAULT_PRIORITY: TaskPriority = TaskPriority(4);
/// Reserved for bulk background work that must never preempt anything else.
pub const LOWEST_PRIORITY: TaskPriority = TaskPriority(u8::MAX);

impl TaskPriority {
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Priority for work chained off a task running at `self`: one step less
    /// urgent, saturating at [`LOWEST_PRIORITY`].
    pub fn follow_up(self) -> TaskPriority {
        TaskPriority(self.0.saturating_add(1))
    }

    /// Keeps whichever of the two priorities is more urgent.
    pub fn elevate(self, target: TaskPriority) -> TaskPriority {
        if target <= self { target } else { self }
    }

    pub fn is_lowest(self) -> bool {
        self == LOWEST_PRIORITY
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        DEFAULT_PRIORITY
    }
}

impl From<u8> for TaskPriority {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_lowest() {
            write!(f, "lowest")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Queue partition a consumer subscribes to. Library scans get their own lane
/// so a long scan never sits behind thousands of per-book tasks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskLane {
    Scan = 0,
    Processing = 1,
}

impl fmt::Display for TaskLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskLane::Scan => write!(f, "scan"),
            TaskLane::Processing => write!(f, "processing"),
        }
    }
}

/// Fieldless discriminant of [`Task`], handy for logs and metrics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TaskKind {
    ScanLibrary = 0,
    AnalyzeBook = 1,
    GenerateBookThumbnail = 2,
    RefreshBookMetadata = 3,
    RefreshSeriesMetadata = 4,
    AggregateSeriesMetadata = 5,
    ImportBook = 6,
    ConvertBook = 7,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::ScanLibrary => write!(f, "scan library"),
            TaskKind::AnalyzeBook => write!(f, "analyze book"),
            TaskKind::GenerateBookThumbnail => {
                write!(f, "generate book thumbnail")
            }
            TaskKind::RefreshBookMetadata => write!(f, "refresh book metadata"),
            TaskKind::RefreshSeriesMetadata => {
                write!(f, "refresh series metadata")
            }
            TaskKind::AggregateSeriesMetadata => {
                write!(f, "aggregate series metadata")
            }
            TaskKind::ImportBook => write!(f, "import book"),
            TaskKind::ConvertBook => write!(f, "convert book"),
        }
    }
}

/// Entity a task operates on. Resolved by id when the task runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskSubject {
    Library(LibraryID),
    Book(BookID),
    Series(SeriesID),
}

impl fmt::Display for TaskSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskSubject::Library(id) => write!(f, "library {id}"),
            TaskSubject::Book(id) => write!(f, "book {id}"),
            TaskSubject::Series(id) => write!(f, "series {id}"),
        }
    }
}

/// One unit of background work.
///
/// Tasks are plain values: two tasks with the same variant and payload are
/// interchangeable, which is what lets the queue merge duplicates through
/// [`Task::unique_id`]. Entities are referenced by id only.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Task {
    ScanLibrary {
        library_id: LibraryID,
        priority: TaskPriority,
    },
    AnalyzeBook {
        book_id: BookID,
        priority: TaskPriority,
    },
    GenerateBookThumbnail {
        book_id: BookID,
        priority: TaskPriority,
    },
    RefreshBookMetadata {
        book_id: BookID,
        capabilities: BTreeSet<MetadataCapability>,
        priority: TaskPriority,
    },
    RefreshSeriesMetadata {
        series_id: SeriesID,
        priority: TaskPriority,
    },
    AggregateSeriesMetadata {
        series_id: SeriesID,
        priority: TaskPriority,
    },
    ImportBook {
        source_file: PathBuf,
        series_id: SeriesID,
        copy_mode: CopyMode,
        destination_name: Option<String>,
        /// Existing book replaced by the imported file.
        upgrade_book_id: Option<BookID>,
        priority: TaskPriority,
    },
    ConvertBook {
        book_id: BookID,
        priority: TaskPriority,
    },
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::ScanLibrary { .. } => TaskKind::ScanLibrary,
            Task::AnalyzeBook { .. } => TaskKind::AnalyzeBook,
            Task::GenerateBookThumbnail { .. } => {
                TaskKind::GenerateBookThumbnail
            }
            Task::RefreshBookMetadata { .. } => TaskKind::RefreshBookMetadata,
            Task::RefreshSeriesMetadata { .. } => {
                TaskKind::RefreshSeriesMetadata
            }
            Task::AggregateSeriesMetadata { .. } => {
                TaskKind::AggregateSeriesMetadata
            }
            Task::ImportBook { .. } => TaskKind::ImportBook,
            Task::ConvertBook { .. } => TaskKind::ConvertBook,
        }
    }

    pub fn priority(&self) -> TaskPriority {
        match self {
            Task::ScanLibrary { priority, .. }
            | Task::AnalyzeBook { priority, .. }
            | Task::GenerateBookThumbnail { priority, .. }
            | Task::RefreshBookMetadata { priority, .. }
            | Task::RefreshSeriesMetadata { priority, .. }
            | Task::AggregateSeriesMetadata { priority, .. }
            | Task::ImportBook { priority, .. }
            | Task::ConvertBook { priority, .. } => *priority,
        }
    }

    pub fn with_priority(mut self, new_priority: TaskPriority) -> Self {
        match &mut self {
            Task::ScanLibrary { priority, .. }
            | Task::AnalyzeBook { priority, .. }
            | Task::GenerateBookThumbnail { priority, .. }
            | Task::RefreshBookMetadata { priority, .. }
            | Task::RefreshSeriesMetadata { priority, .. }
            | Task::AggregateSeriesMetadata { priority, .. }
            | Task::ImportBook { priority, .. }
            | Task::ConvertBook { priority, .. } => *priority = new_priority,
        }
        self
    }

    pub fn lane(&self) -> TaskLane {
        match self {
            Task::ScanLibrary { .. } => TaskLane::Scan,
            _ => TaskLane::Processing,
        }
    }

    pub fn subject(&self) -> TaskSubject {
        match self {
            Task::ScanLibrary { library_id, .. } => {
                TaskSubject::Library(*library_id)
            }
            Task::AnalyzeBook { book_id, .. }
            | Task::GenerateBookThumbnail { book_id, .. }
            | Task::RefreshBookMetadata { book_id, .. }
            | Task::ConvertBook { book_id, .. } => TaskSubject::Book(*book_id),
            Task::RefreshSeriesMetadata { series_id, .. }
            | Task::AggregateSeriesMetadata { series_id, .. }
            | Task::ImportBook { series_id, .. } => {
                TaskSubject::Series(*series_id)
            }
        }
    }

    /// Idempotency / selector key. Priority is deliberately excluded so a
    /// re-submission at another priority lands on the same pending task.
    pub fn unique_id(&self) -> String {
        match self {
            Task::ScanLibrary { library_id, .. } => {
                format!("SCAN_LIBRARY_{library_id}")
            }
            Task::AnalyzeBook { book_id, .. } => {
                format!("ANALYZE_BOOK_{book_id}")
            }
            Task::GenerateBookThumbnail { book_id, .. } => {
                format!("GENERATE_BOOK_THUMBNAIL_{book_id}")
            }
            Task::RefreshBookMetadata {
                book_id,
                capabilities,
                ..
            } => {
                let caps = capabilities
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("REFRESH_BOOK_METADATA_{book_id}_{caps}")
            }
            Task::RefreshSeriesMetadata { series_id, .. } => {
                format!("REFRESH_SERIES_METADATA_{series_id}")
            }
            Task::AggregateSeriesMetadata { series_id, .. } => {
                format!("AGGREGATE_SERIES_METADATA_{series_id}")
            }
            Task::ImportBook {
                source_file,
                series_id,
                ..
            } => format!("IMPORT_BOOK_{series_id}_{}", source_file.display()),
            Task::ConvertBook { book_id, .. } => {
                format!("CONVERT_BOOK_{book_id}")
            }
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::ImportBook {
                source_file,
                series_id,
                copy_mode,
                upgrade_book_id,
                priority,
                ..
            } => {
                write!(
                    f,
                    "import book {} into series {series_id} ({copy_mode}",
                    source_file.display()
                )?;
                if let Some(upgrade) = upgrade_book_id {
                    write!(f, ", upgrading book {upgrade}")?;
                }
                write!(f, ", priority {priority})")
            }
            other => write!(
                f,
                "{} for {} (priority {})",
                other.kind(),
                other.subject(),
                other.priority()
            ),
        }
    }
}
