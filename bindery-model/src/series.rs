use std::path::PathBuf;

use super::ids::{LibraryID, SeriesID};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    pub id: SeriesID,
    pub library_id: LibraryID,
    pub name: String,
    pub path: PathBuf,
}

impl Series {
    pub fn new(
        library_id: LibraryID,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: SeriesID::new(),
            library_id,
            name: name.into(),
            path: path.into(),
        }
    }
}
