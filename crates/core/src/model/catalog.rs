use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{LessonId, Ordinal, QuestionSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog has no lessons")]
    Empty,

    #[error("duplicate ordinal {0}")]
    DuplicateOrdinal(Ordinal),

    #[error("duplicate lesson id {0}")]
    DuplicateId(LessonId),

    #[error("ordinals must run 1..={len} without gaps, found {found}")]
    NonContiguous { len: usize, found: Ordinal },

    #[error("lesson {0} has no steps")]
    NoSteps(Ordinal),

    #[error("lesson {0} has a quiz with no questions")]
    EmptyQuiz(Ordinal),

    #[error("lesson {lesson} question {question} needs at least two options")]
    TooFewOptions { lesson: Ordinal, question: usize },

    #[error("lesson {lesson} question {question} has correct index {index} out of range")]
    CorrectIndexOutOfRange {
        lesson: Ordinal,
        question: usize,
        index: usize,
    },
}

/// How a lesson is delivered and what gates its completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LessonContent {
    Simple { steps: u32 },
    QuizGated { steps: u32, quiz: QuestionSet },
}

impl LessonContent {
    #[must_use]
    pub fn steps(&self) -> u32 {
        match self {
            LessonContent::Simple { steps } | LessonContent::QuizGated { steps, .. } => *steps,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuestionSet> {
        match self {
            LessonContent::Simple { .. } => None,
            LessonContent::QuizGated { quiz, .. } => Some(quiz),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub ordinal: Ordinal,
    pub title: String,
    pub content: LessonContent,
}

impl Lesson {
    fn validate(&self) -> Result<(), CatalogError> {
        if self.content.steps() == 0 {
            return Err(CatalogError::NoSteps(self.ordinal));
        }
        let Some(quiz) = self.content.quiz() else {
            return Ok(());
        };
        if quiz.is_empty() {
            return Err(CatalogError::EmptyQuiz(self.ordinal));
        }
        for (i, question) in quiz.questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(CatalogError::TooFewOptions {
                    lesson: self.ordinal,
                    question: i,
                });
            }
            if question.correct_index >= question.options.len() {
                return Err(CatalogError::CorrectIndexOutOfRange {
                    lesson: self.ordinal,
                    question: i,
                    index: question.correct_index,
                });
            }
        }
        Ok(())
    }
}

/// The fixed, ordered course sequence. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    lessons: Vec<Lesson>,
}

impl Catalog {
    /// Validate lessons and order them by ordinal.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the catalog is empty, ordinals or ids repeat,
    /// ordinals leave a gap, or a lesson's content is malformed.
    pub fn new(mut lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        if lessons.is_empty() {
            return Err(CatalogError::Empty);
        }
        lessons.sort_by_key(|lesson| lesson.ordinal);

        let mut ids = HashSet::with_capacity(lessons.len());
        for (pos, lesson) in lessons.iter().enumerate() {
            if pos > 0 && lessons[pos - 1].ordinal == lesson.ordinal {
                return Err(CatalogError::DuplicateOrdinal(lesson.ordinal));
            }
            if usize::try_from(lesson.ordinal.value()).ok() != Some(pos + 1) {
                return Err(CatalogError::NonContiguous {
                    len: lessons.len(),
                    found: lesson.ordinal,
                });
            }
            if !ids.insert(lesson.id) {
                return Err(CatalogError::DuplicateId(lesson.id));
            }
            lesson.validate()?;
        }

        Ok(Self { lessons })
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    #[must_use]
    pub fn get(&self, ordinal: Ordinal) -> Option<&Lesson> {
        let index = usize::try_from(ordinal.value()).ok()?.checked_sub(1)?;
        self.lessons.get(index)
    }

    #[must_use]
    pub fn by_id(&self, id: LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id == id)
    }

    #[must_use]
    pub fn contains(&self, ordinal: Ordinal) -> bool {
        self.get(ordinal).is_some()
    }
}
