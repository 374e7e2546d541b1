//! Lock evaluation: which lessons a learner may open.
//!
//! Gating is strictly linear. The lowest uncompleted ordinal is `Current`,
//! everything completed stays open for review, and everything else is `Locked`.

use std::collections::BTreeMap;

use crate::model::{Catalog, LessonId, Ordinal, ProgressRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reachability {
    Completed,
    Current,
    Locked,
}

impl Reachability {
    /// Completed and current lessons may be opened.
    #[must_use]
    pub fn is_accessible(self) -> bool {
        !matches!(self, Reachability::Locked)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Reachability::Completed => "completed",
            Reachability::Current => "current",
            Reachability::Locked => "locked",
        }
    }
}

/// Lowest catalog ordinal not yet completed, or `None` once the course is done.
#[must_use]
pub fn first_uncompleted(catalog: &Catalog, record: &ProgressRecord) -> Option<Ordinal> {
    catalog
        .lessons()
        .iter()
        .map(|lesson| lesson.ordinal)
        .find(|ordinal| !record.contains(*ordinal))
}

/// Reachability of a single lesson.
#[must_use]
pub fn status_of(catalog: &Catalog, record: &ProgressRecord, ordinal: Ordinal) -> Reachability {
    if record.contains(ordinal) {
        Reachability::Completed
    } else if first_uncompleted(catalog, record) == Some(ordinal) {
        Reachability::Current
    } else {
        Reachability::Locked
    }
}

/// Reachability of every lesson in the catalog.
#[must_use]
pub fn evaluate(catalog: &Catalog, record: &ProgressRecord) -> BTreeMap<Ordinal, Reachability> {
    let current = first_uncompleted(catalog, record);
    catalog
        .lessons()
        .iter()
        .map(|lesson| {
            let status = if record.contains(lesson.ordinal) {
                Reachability::Completed
            } else if current == Some(lesson.ordinal) {
                Reachability::Current
            } else {
                Reachability::Locked
            };
            (lesson.ordinal, status)
        })
        .collect()
}

/// One row of the lesson index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOverview {
    pub ordinal: Ordinal,
    pub lesson_id: LessonId,
    pub title: String,
    pub status: Reachability,
}

/// Ordered reachability rows plus completion totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOverview {
    pub lessons: Vec<LessonOverview>,
    pub completed: usize,
    pub total: usize,
}

impl CourseOverview {
    #[must_use]
    pub fn build(catalog: &Catalog, record: &ProgressRecord) -> Self {
        let statuses = evaluate(catalog, record);
        let lessons: Vec<LessonOverview> = catalog
            .lessons()
            .iter()
            .map(|lesson| LessonOverview {
                ordinal: lesson.ordinal,
                lesson_id: lesson.id,
                title: lesson.title.clone(),
                status: statuses
                    .get(&lesson.ordinal)
                    .copied()
                    .unwrap_or(Reachability::Locked),
            })
            .collect();
        let completed = lessons
            .iter()
            .filter(|row| row.status == Reachability::Completed)
            .count();
        Self {
            total: lessons.len(),
            lessons,
            completed,
        }
    }

    /// Completed share as a whole percentage, rounded down.
    #[must_use]
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.completed * 100 / self.total
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }

    #[must_use]
    pub fn current(&self) -> Option<&LessonOverview> {
        self.lessons
            .iter()
            .find(|row| row.status == Reachability::Current)
    }
}
