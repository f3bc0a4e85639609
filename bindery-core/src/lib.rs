//! # Bindery Core
//!
//! Background task engine for the Bindery library server.
//!
//! ## Overview
//!
//! Scanning library folders, analyzing books, generating thumbnails,
//! refreshing metadata, importing and converting files all run as queued
//! tasks. This crate provides:
//!
//! - **Task model**: [`tasks::Task`], one variant per pipeline stage, with
//!   priority and deduplication key
//! - **Queue boundary**: the [`tasks::TaskQueue`] trait and an in-memory,
//!   per-lane priority backend
//! - **Submission**: [`tasks::TaskSubmitter`] for triggers and follow-ups
//! - **Dispatch**: [`tasks::TaskHandler`] resolves entities, calls the domain
//!   collaborators and chains the next stages
//! - **Runtime**: [`tasks::TaskRuntime`] worker pools with graceful shutdown
//!
//! Persistence and the actual file processing live behind the traits in
//! [`tasks::ports`].
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bindery_core::tasks::{
//!     HIGHEST_PRIORITY, InMemoryTaskQueue, QueueTaskSubmitter, TaskSubmitter,
//! };
//! use bindery_core::tasks::ports::{BookCatalog, LibraryRepository};
//! use bindery_model::LibraryID;
//!
//! async fn rescan(
//!     catalog: Arc<dyn BookCatalog>,
//!     libraries: Arc<dyn LibraryRepository>,
//!     library_id: LibraryID,
//! ) -> bindery_core::error::Result<()> {
//!     let queue = Arc::new(InMemoryTaskQueue::default());
//!     let submitter = QueueTaskSubmitter::new(queue, catalog, libraries);
//!     submitter.scan_library(library_id, HIGHEST_PRIORITY).await
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Error types shared by the engine and its collaborators
pub mod error;

/// Task model, queue, submitter, handler and runtime
pub mod tasks;

pub use bindery_model as model;
pub use error::{BinderyError, Result};
