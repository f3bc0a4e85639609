use std::path::PathBuf;

use super::ids::LibraryID;

/// Snapshot of a library as seen by background tasks.
///
/// Tasks only carry the id; the snapshot is fetched again when the task runs
/// so configuration changes made in between are honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Library {
    pub id: LibraryID,
    pub name: String,
    pub root: PathBuf,
    /// Convert books to CBZ after every scan.
    pub convert_to_cbz: bool,
}

impl Library {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: LibraryID::new(),
            name: name.into(),
            root: root.into(),
            convert_to_cbz: false,
        }
    }

    pub fn with_convert_to_cbz(mut self, enabled: bool) -> Self {
        self.convert_to_cbz = enabled;
        self
    }
}

impl std::fmt::Display for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
