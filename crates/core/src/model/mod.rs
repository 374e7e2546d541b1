mod catalog;
mod ids;
mod lesson_session;
mod progress;
mod quiz;

pub use ids::{LessonId, Ordinal, ParseIdError};

pub use catalog::{Catalog, CatalogError, Lesson, LessonContent};
pub use lesson_session::{
    CompletionAttempt, GateRejection, LessonCompleted, LessonSession, StepError, StepMove,
};
pub use progress::{PROGRESS_SCHEMA_VERSION, ProgressRecord, ProgressRecordError};
pub use quiz::{
    MissedQuestion, PASS_THRESHOLD_PERCENT, Question, QuestionSet, QuizError, QuizOutcome,
    QuizSession, SubmitOutcome, score,
};
