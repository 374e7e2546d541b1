use std::collections::BTreeMap;
use std::sync::Arc;

use course_core::model::{Catalog, Ordinal, ProgressRecord};
use course_core::reachability::{self, CourseOverview, Reachability};
use storage::repository::{PROGRESS_NAMESPACE, ProgressRepository, ProgressRow};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::ProgressStoreError;

/// Authoritative, write-through owner of the learner's `ProgressRecord`.
///
/// One instance is created at startup and handed to every consumer by
/// reference. Readers get `&ProgressRecord`; only the store mutates it.
pub struct ProgressStore {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
    namespace: String,
    record: ProgressRecord,
    dirty: bool,
}

impl ProgressStore {
    /// Load progress from the default namespace.
    ///
    /// Never fails: an unreachable backend or a corrupted row starts the learner
    /// from an empty record.
    pub async fn hydrate(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self::hydrate_namespace(clock, repo, PROGRESS_NAMESPACE).await
    }

    pub async fn hydrate_namespace(
        clock: Clock,
        repo: Arc<dyn ProgressRepository>,
        namespace: &str,
    ) -> Self {
        let record = match repo.load_progress(namespace).await {
            Ok(Some(row)) => row.into_record().unwrap_or_else(|err| {
                warn!(namespace, error = %err, "discarding unreadable progress record");
                ProgressRecord::new()
            }),
            Ok(None) => {
                debug!(namespace, "no saved progress, starting fresh");
                ProgressRecord::new()
            }
            Err(err) => {
                warn!(namespace, error = %err, "progress storage unavailable, starting fresh");
                ProgressRecord::new()
            }
        };
        info!(namespace, completed = record.len(), "progress hydrated");

        Self {
            clock,
            repo,
            namespace: namespace.to_owned(),
            record,
            dirty: false,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> &ProgressRecord {
        &self.record
    }

    #[must_use]
    pub fn is_completed(&self, ordinal: Ordinal) -> bool {
        self.record.contains(ordinal)
    }

    /// True when the last write failed and memory is ahead of storage.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record `ordinal` as completed and persist before returning.
    ///
    /// Returns `Ok(false)` if it was already completed and nothing needed saving.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Persistence` if the write fails; the ordinal
    /// stays completed in memory.
    pub async fn mark_completed(&mut self, ordinal: Ordinal) -> Result<bool, ProgressStoreError> {
        let added = self.record.insert(ordinal);
        if !added && !self.dirty {
            return Ok(false);
        }
        self.persist().await?;
        if added {
            info!(%ordinal, completed = self.record.len(), "lesson marked completed");
        } else {
            info!(%ordinal, "pending progress saved");
        }
        Ok(added)
    }

    /// Clear all progress and persist. Irreversible; callers confirm with the learner first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Persistence` if the write fails; memory is
    /// already cleared.
    pub async fn reset(&mut self) -> Result<(), ProgressStoreError> {
        let cleared = self.record.len();
        self.record.clear();
        self.persist().await?;
        info!(cleared, "progress reset");
        Ok(())
    }

    /// Retry a write that previously failed.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError::Persistence` if the write fails again.
    pub async fn flush(&mut self) -> Result<(), ProgressStoreError> {
        if self.dirty {
            self.persist().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn reachability(&self, catalog: &Catalog) -> BTreeMap<Ordinal, Reachability> {
        reachability::evaluate(catalog, &self.record)
    }

    #[must_use]
    pub fn status_of(&self, catalog: &Catalog, ordinal: Ordinal) -> Reachability {
        reachability::status_of(catalog, &self.record, ordinal)
    }

    #[must_use]
    pub fn overview(&self, catalog: &Catalog) -> CourseOverview {
        CourseOverview::build(catalog, &self.record)
    }

    async fn persist(&mut self) -> Result<(), ProgressStoreError> {
        let row = ProgressRow::from_record(&self.record, self.clock.now());
        match self.repo.save_progress(&self.namespace, &row).await {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                warn!(namespace = %self.namespace, error = %err, "failed to save progress");
                self.dirty = true;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use course_core::model::PROGRESS_SCHEMA_VERSION;
    use course_core::time::fixed_now;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, StorageError};

    fn ord(n: u32) -> Ordinal {
        Ordinal::try_new(n).unwrap()
    }

    /// Wraps the in-memory repo with switchable failures and a write counter.
    #[derive(Default)]
    struct FlakyRepo {
        inner: InMemoryRepository,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ProgressRepository for FlakyRepo {
        async fn load_progress(&self, namespace: &str) -> Result<Option<ProgressRow>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("disk unavailable".into()));
            }
            self.inner.load_progress(namespace).await
        }

        async fn save_progress(&self, namespace: &str, row: &ProgressRow) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.save_progress(namespace, row).await
        }
    }

    async fn store_with(repo: &Arc<FlakyRepo>) -> ProgressStore {
        let dyn_repo: Arc<dyn ProgressRepository> = repo.clone();
        ProgressStore::hydrate(Clock::fixed(fixed_now()), dyn_repo).await
    }

    #[tokio::test]
    async fn mark_completed_writes_through() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;

        assert!(store.mark_completed(ord(1)).await.unwrap());
        assert!(store.is_completed(ord(1)));

        let saved = repo.inner.load_progress(PROGRESS_NAMESPACE).await.unwrap().unwrap();
        assert_eq!(saved.completed_ordinals, vec![1]);
        assert_eq!(saved.updated_at, fixed_now());

        let reloaded = store_with(&repo).await;
        assert!(reloaded.is_completed(ord(1)));
    }

    #[tokio::test]
    async fn repeated_mark_is_idempotent_and_skips_write() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;

        store.mark_completed(ord(2)).await.unwrap();
        let once = store.snapshot().clone();
        assert!(!store.mark_completed(ord(2)).await.unwrap());

        assert_eq!(store.snapshot(), &once);
        assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn completed_set_only_shrinks_on_reset() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;

        let mut last = 0;
        for n in [1, 2, 2, 3, 1] {
            store.mark_completed(ord(n)).await.unwrap();
            assert!(store.snapshot().len() >= last);
            last = store.snapshot().len();
        }
        assert_eq!(last, 3);

        store.reset().await.unwrap();
        assert!(store.snapshot().is_empty());
        let saved = repo.inner.load_progress(PROGRESS_NAMESPACE).await.unwrap().unwrap();
        assert!(saved.completed_ordinals.is_empty());
    }

    #[tokio::test]
    async fn unavailable_storage_hydrates_empty() {
        let repo = Arc::new(FlakyRepo::default());
        repo.fail_reads.store(true, Ordering::SeqCst);
        let store = store_with(&repo).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn unsupported_version_hydrates_empty() {
        let repo = Arc::new(FlakyRepo::default());
        let row = ProgressRow {
            schema_version: PROGRESS_SCHEMA_VERSION + 1,
            completed_ordinals: vec![1, 2],
            updated_at: fixed_now(),
        };
        repo.inner.save_progress(PROGRESS_NAMESPACE, &row).await.unwrap();

        let store = store_with(&repo).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_and_reports() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;
        repo.fail_writes.store(true, Ordering::SeqCst);

        let err = store.mark_completed(ord(1)).await.unwrap_err();
        assert!(matches!(err, ProgressStoreError::Persistence(_)));
        assert!(store.is_completed(ord(1)));
        assert!(store.is_dirty());

        repo.fail_writes.store(false, Ordering::SeqCst);
        store.flush().await.unwrap();
        assert!(!store.is_dirty());
        let saved = repo.inner.load_progress(PROGRESS_NAMESPACE).await.unwrap().unwrap();
        assert_eq!(saved.completed_ordinals, vec![1]);
    }

    #[tokio::test]
    async fn failed_reset_keeps_cleared_memory_and_reports() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;
        store.mark_completed(ord(1)).await.unwrap();
        store.mark_completed(ord(2)).await.unwrap();
        repo.fail_writes.store(true, Ordering::SeqCst);

        let err = store.reset().await.unwrap_err();
        assert!(matches!(err, ProgressStoreError::Persistence(_)));
        assert!(store.snapshot().is_empty());
        assert!(store.is_dirty());
        let stale = repo.inner.load_progress(PROGRESS_NAMESPACE).await.unwrap().unwrap();
        assert_eq!(stale.completed_ordinals, vec![1, 2]);

        repo.fail_writes.store(false, Ordering::SeqCst);
        store.flush().await.unwrap();
        assert!(!store.is_dirty());
        let saved = repo.inner.load_progress(PROGRESS_NAMESPACE).await.unwrap().unwrap();
        assert!(saved.completed_ordinals.is_empty());
    }

    #[tokio::test]
    async fn remarking_after_failed_write_retries_save() {
        let repo = Arc::new(FlakyRepo::default());
        let mut store = store_with(&repo).await;
        repo.fail_writes.store(true, Ordering::SeqCst);
        let _ = store.mark_completed(ord(1)).await;

        repo.fail_writes.store(false, Ordering::SeqCst);
        assert!(!store.mark_completed(ord(1)).await.unwrap());
        assert!(!store.is_dirty());
        assert_eq!(repo.writes.load(Ordering::SeqCst), 1);
    }
}
