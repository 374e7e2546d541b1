//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use course_core::model::{CatalogError, Ordinal, StepError};
use storage::repository::StorageError;

/// Errors emitted by `ProgressStore`.
///
/// A `Persistence` error means the in-memory record already holds the change
/// but it may not survive a restart.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error("progress was updated but could not be saved: {0}")]
    Persistence(#[from] StorageError),
}

/// Errors emitted by `LessonFlowService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonFlowError {
    #[error("no lesson at position {0}")]
    UnknownLesson(Ordinal),
    #[error("lesson {0} is locked")]
    Locked(Ordinal),
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
}

/// Errors emitted while loading a course catalog.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}
