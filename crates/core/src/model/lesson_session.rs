use thiserror::Error;

use crate::model::{
    Lesson, LessonContent, LessonId, Ordinal, QuestionSet, QuizError, QuizSession, SubmitOutcome,
};

/// Caller bugs: the session was used after it terminated, or asked for a quiz it
/// does not have.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("lesson session already completed")]
    SessionFinished,

    #[error("lesson has no knowledge check")]
    NoQuiz,

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

/// Result of a `next`/`prev` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMove {
    Moved(u32),
    AtBoundary,
}

/// Why a `complete` request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    NotOnFinalStep { current: u32, total: u32 },
    QuizNotPassed,
}

/// Event emitted once when a lesson is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonCompleted {
    pub lesson_id: LessonId,
    pub ordinal: Ordinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAttempt {
    Completed(LessonCompleted),
    Rejected(GateRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CompletionGate {
    Open,
    Quiz {
        questions: QuestionSet,
        session: QuizSession,
    },
}

/// Step-by-step walk through one lesson, ending in a gated completion.
///
/// Lives only while the learner is inside the lesson; dropping it discards the
/// step position and any quiz answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSession {
    lesson_id: LessonId,
    ordinal: Ordinal,
    current_step: u32,
    total_steps: u32,
    gate: CompletionGate,
    finished: bool,
}

impl LessonSession {
    #[must_use]
    pub fn start(lesson: &Lesson) -> Self {
        let gate = match &lesson.content {
            LessonContent::Simple { .. } => CompletionGate::Open,
            LessonContent::QuizGated { quiz, .. } => CompletionGate::Quiz {
                session: QuizSession::new(quiz),
                questions: quiz.clone(),
            },
        };
        Self {
            lesson_id: lesson.id,
            ordinal: lesson.ordinal,
            current_step: 1,
            // Catalog validation guarantees at least one step.
            total_steps: lesson.content.steps().max(1),
            gate,
            finished: false,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    #[must_use]
    pub fn is_final_step(&self) -> bool {
        self.current_step == self.total_steps
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn has_quiz(&self) -> bool {
        matches!(self.gate, CompletionGate::Quiz { .. })
    }

    /// Whether `complete` would succeed right now.
    #[must_use]
    pub fn can_complete(&self) -> bool {
        !self.finished && self.gate_rejection().is_none()
    }

    /// # Errors
    ///
    /// Returns `StepError::SessionFinished` after the lesson was completed.
    pub fn next(&mut self) -> Result<StepMove, StepError> {
        self.ensure_active()?;
        if self.current_step >= self.total_steps {
            return Ok(StepMove::AtBoundary);
        }
        self.current_step += 1;
        Ok(StepMove::Moved(self.current_step))
    }

    /// # Errors
    ///
    /// Returns `StepError::SessionFinished` after the lesson was completed.
    pub fn prev(&mut self) -> Result<StepMove, StepError> {
        self.ensure_active()?;
        if self.current_step <= 1 {
            return Ok(StepMove::AtBoundary);
        }
        self.current_step -= 1;
        Ok(StepMove::Moved(self.current_step))
    }

    /// Attempt the terminal transition.
    ///
    /// A refused gate is not an error: the session is left untouched and the
    /// reason is returned so the caller can keep the action disabled.
    ///
    /// # Errors
    ///
    /// Returns `StepError::SessionFinished` if the lesson was already completed.
    pub fn complete(&mut self) -> Result<CompletionAttempt, StepError> {
        self.ensure_active()?;
        if let Some(rejection) = self.gate_rejection() {
            return Ok(CompletionAttempt::Rejected(rejection));
        }
        self.finished = true;
        Ok(CompletionAttempt::Completed(LessonCompleted {
            lesson_id: self.lesson_id,
            ordinal: self.ordinal,
        }))
    }

    /// The knowledge check questions, if this lesson has one.
    #[must_use]
    pub fn questions(&self) -> Option<&QuestionSet> {
        match &self.gate {
            CompletionGate::Open => None,
            CompletionGate::Quiz { questions, .. } => Some(questions),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizSession> {
        match &self.gate {
            CompletionGate::Open => None,
            CompletionGate::Quiz { session, .. } => Some(session),
        }
    }

    /// Record an answer in the knowledge check.
    ///
    /// Returns `Ok(false)` if the quiz was already submitted.
    ///
    /// # Errors
    ///
    /// Returns `StepError` if the session is finished, has no quiz, or the
    /// indices are out of range.
    pub fn answer(&mut self, question: usize, option: usize) -> Result<bool, StepError> {
        let (questions, session) = self.quiz_parts()?;
        Ok(session.select(questions, question, option)?)
    }

    /// Submit the knowledge check.
    ///
    /// # Errors
    ///
    /// Returns `StepError` if the session is finished or has no quiz.
    pub fn submit_quiz(&mut self) -> Result<SubmitOutcome, StepError> {
        let (questions, session) = self.quiz_parts()?;
        Ok(session.submit(questions)?)
    }

    /// Reset the knowledge check for another attempt.
    ///
    /// # Errors
    ///
    /// Returns `StepError` if the session is finished or has no quiz.
    pub fn retry_quiz(&mut self) -> Result<(), StepError> {
        let (_, session) = self.quiz_parts()?;
        session.retry();
        Ok(())
    }

    fn quiz_parts(&mut self) -> Result<(&QuestionSet, &mut QuizSession), StepError> {
        self.ensure_active()?;
        match &mut self.gate {
            CompletionGate::Open => Err(StepError::NoQuiz),
            CompletionGate::Quiz { questions, session } => Ok((questions, session)),
        }
    }

    fn gate_rejection(&self) -> Option<GateRejection> {
        if !self.is_final_step() {
            return Some(GateRejection::NotOnFinalStep {
                current: self.current_step,
                total: self.total_steps,
            });
        }
        match &self.gate {
            CompletionGate::Open => None,
            CompletionGate::Quiz { session, .. } if session.passed() => None,
            CompletionGate::Quiz { .. } => Some(GateRejection::QuizNotPassed),
        }
    }

    fn ensure_active(&self) -> Result<(), StepError> {
        if self.finished {
            Err(StepError::SessionFinished)
        } else {
            Ok(())
        }
    }
}
