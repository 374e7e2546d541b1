use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{PROGRESS_SCHEMA_VERSION, ProgressRecord, ProgressRecordError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Namespace under which the single learner's progress is stored.
pub const PROGRESS_NAMESPACE: &str = "course-progress";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a progress record.
///
/// Kept separate from `ProgressRecord` so the version stamp and timestamp stay a
/// storage concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRow {
    pub schema_version: u32,
    pub completed_ordinals: Vec<u32>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRow {
    #[must_use]
    pub fn from_record(record: &ProgressRecord, updated_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: PROGRESS_SCHEMA_VERSION,
            completed_ordinals: record.to_persisted(),
            updated_at,
        }
    }

    /// Convert the row back into a domain `ProgressRecord`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressRecordError` if the version is unknown or an ordinal is invalid.
    pub fn into_record(self) -> Result<ProgressRecord, ProgressRecordError> {
        ProgressRecord::from_persisted(self.schema_version, self.completed_ordinals)
    }
}

/// Repository contract for the durable progress record.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the record stored under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend is unreachable or the row is malformed.
    async fn load_progress(&self, namespace: &str) -> Result<Option<ProgressRow>, StorageError>;

    /// Insert or replace the record stored under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be written.
    async fn save_progress(&self, namespace: &str, row: &ProgressRow) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<String, ProgressRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, namespace: &str) -> Result<Option<ProgressRow>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(namespace).cloned())
    }

    async fn save_progress(&self, namespace: &str, row: &ProgressRow) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(namespace.to_owned(), row.clone());
        Ok(())
    }
}

/// Stand-in used when the durable backend could not be opened.
///
/// Reads and writes fail with `StorageError::Connection`, so callers keep
/// working from memory and every save reports that it was not persisted.
#[derive(Debug, Clone)]
pub struct UnavailableRepository {
    reason: String,
}

impl UnavailableRepository {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ProgressRepository for UnavailableRepository {
    async fn load_progress(&self, _namespace: &str) -> Result<Option<ProgressRow>, StorageError> {
        Err(StorageError::Connection(self.reason.clone()))
    }

    async fn save_progress(&self, _namespace: &str, _row: &ProgressRow) -> Result<(), StorageError> {
        Err(StorageError::Connection(self.reason.clone()))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }

    /// Storage whose every operation fails with `reason`.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(UnavailableRepository::new(reason));
        Self { progress }
    }
}
