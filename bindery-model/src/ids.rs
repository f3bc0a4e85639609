use std::str::FromStr;

use uuid::Uuid;

/// Strongly typed ID for libraries
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LibraryID(pub Uuid);

impl Default for LibraryID {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryID {
    pub fn new() -> Self {
        LibraryID(Uuid::now_v7())
    }
}

impl AsRef<Uuid> for LibraryID {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for LibraryID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(LibraryID)
    }
}

impl std::fmt::Display for LibraryID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for books
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BookID(pub Uuid);

impl Default for BookID {
    fn default() -> Self {
        Self::new()
    }
}

impl BookID {
    pub fn new() -> Self {
        BookID(Uuid::now_v7())
    }
}

impl AsRef<Uuid> for BookID {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for BookID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(BookID)
    }
}

impl std::fmt::Display for BookID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed ID for series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeriesID(pub Uuid);

impl Default for SeriesID {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesID {
    pub fn new() -> Self {
        SeriesID(Uuid::now_v7())
    }
}

impl AsRef<Uuid> for SeriesID {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for SeriesID {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SeriesID)
    }
}

impl std::fmt::Display for SeriesID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
