//! Core data model definitions shared across Bindery crates.
#![allow(missing_docs)]

pub mod book;
pub mod ids;
pub mod library;
pub mod metadata;
pub mod series;

pub use book::{Book, CopyMode, MediaStatus};
pub use ids::{BookID, LibraryID, SeriesID};
pub use library::Library;
pub use metadata::MetadataCapability;
pub use series::Series;
