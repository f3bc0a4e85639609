use std::path::PathBuf;

use super::ids::{BookID, LibraryID, SeriesID};

/// Analysis state of a book's file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum MediaStatus {
    /// Never analyzed.
    Unknown,
    Ready,
    Error,
    Unsupported,
    /// File changed on disk since the last analysis.
    Outdated,
}

impl MediaStatus {
    /// Statuses picked up by the post-scan analysis sweep.
    pub fn needs_analysis() -> &'static [MediaStatus] {
        &[MediaStatus::Unknown, MediaStatus::Outdated]
    }
}

/// How an imported file reaches the library folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CopyMode {
    Move,
    #[default]
    Copy,
    Hardlink,
}

impl std::fmt::Display for CopyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyMode::Move => write!(f, "move"),
            CopyMode::Copy => write!(f, "copy"),
            CopyMode::Hardlink => write!(f, "hardlink"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Book {
    pub id: BookID,
    pub series_id: SeriesID,
    pub library_id: LibraryID,
    pub name: String,
    pub path: PathBuf,
    pub media_status: MediaStatus,
}

impl Book {
    pub fn new(
        series_id: SeriesID,
        library_id: LibraryID,
        path: impl Into<PathBuf>,
    ) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            id: BookID::new(),
            series_id,
            library_id,
            name,
            path,
            media_status: MediaStatus::Unknown,
        }
    }
}
