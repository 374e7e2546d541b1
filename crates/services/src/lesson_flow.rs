use std::sync::Arc;

use course_core::model::{
    Catalog, CompletionAttempt, GateRejection, LessonCompleted, LessonSession, Ordinal,
};
use tracing::{debug, info};

use crate::error::LessonFlowError;
use crate::progress_store::ProgressStore;

/// Result of asking to complete a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonCompletion {
    /// The lesson was completed and saved in the progress store.
    Recorded(LessonCompleted),
    /// The gate held; nothing changed.
    Rejected(GateRejection),
}

/// Opens lessons the learner may reach and hands completions to the progress store.
#[derive(Clone)]
pub struct LessonFlowService {
    catalog: Arc<Catalog>,
}

impl LessonFlowService {
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Start a session for the lesson at `ordinal`.
    ///
    /// Completed lessons may be reopened for review.
    ///
    /// # Errors
    ///
    /// Returns `LessonFlowError::UnknownLesson` if the catalog has no such lesson,
    /// or `LessonFlowError::Locked` if earlier lessons are still open.
    pub fn open_lesson(
        &self,
        progress: &ProgressStore,
        ordinal: Ordinal,
    ) -> Result<LessonSession, LessonFlowError> {
        let lesson = self
            .catalog
            .get(ordinal)
            .ok_or(LessonFlowError::UnknownLesson(ordinal))?;
        if !progress.status_of(&self.catalog, ordinal).is_accessible() {
            return Err(LessonFlowError::Locked(ordinal));
        }
        debug!(%ordinal, lesson_id = %lesson.id, "lesson opened");
        Ok(LessonSession::start(lesson))
    }

    /// Attempt the session's terminal transition and record it on success.
    ///
    /// # Errors
    ///
    /// Returns `LessonFlowError::Step` if the session already finished, or
    /// `LessonFlowError::Progress` if the completion could not be saved. In the
    /// latter case the store still reports the lesson as completed.
    pub async fn complete_lesson(
        &self,
        progress: &mut ProgressStore,
        session: &mut LessonSession,
    ) -> Result<LessonCompletion, LessonFlowError> {
        match session.complete()? {
            CompletionAttempt::Rejected(rejection) => {
                debug!(ordinal = %session.ordinal(), ?rejection, "completion rejected");
                Ok(LessonCompletion::Rejected(rejection))
            }
            CompletionAttempt::Completed(event) => {
                progress.mark_completed(event.ordinal).await?;
                info!(ordinal = %event.ordinal, lesson_id = %event.lesson_id, "lesson completed");
                Ok(LessonCompletion::Recorded(event))
            }
        }
    }
}
