use std::sync::Arc;

use course_core::model::Catalog;
use storage::repository::Storage;
use tracing::warn;

use crate::Clock;
use crate::lesson_flow::LessonFlowService;
use crate::progress_store::ProgressStore;

/// Assembles the catalog, lesson flow and the single progress store.
pub struct AppServices {
    catalog: Arc<Catalog>,
    lessons: Arc<LessonFlowService>,
    progress: ProgressStore,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Startup never fails on storage. If the database cannot be opened or
    /// migrated, progress starts empty and every save reports
    /// `ProgressStoreError::Persistence`.
    pub async fn new_sqlite(db_url: &str, catalog: Catalog, clock: Clock) -> Self {
        let storage = match Storage::sqlite(db_url).await {
            Ok(storage) => storage,
            Err(err) => {
                warn!(db_url, error = %err, "progress database unavailable, progress will not be saved");
                Storage::unavailable(err.to_string())
            }
        };
        Self::from_storage(&storage, catalog, clock).await
    }

    pub async fn from_storage(storage: &Storage, catalog: Catalog, clock: Clock) -> Self {
        let catalog = Arc::new(catalog);
        let lessons = Arc::new(LessonFlowService::new(Arc::clone(&catalog)));
        let progress = ProgressStore::hydrate(clock, Arc::clone(&storage.progress)).await;
        Self {
            catalog,
            lessons,
            progress,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonFlowService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressStore {
        &mut self.progress
    }
}
