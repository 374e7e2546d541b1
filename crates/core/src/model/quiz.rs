use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum share of correct answers, in percent, required to pass a knowledge check.
pub const PASS_THRESHOLD_PERCENT: usize = 70;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("expected {expected} answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },

    #[error("question index {index} out of range ({len} questions)")]
    QuestionOutOfRange { index: usize, len: usize },

    #[error("option {option} out of range for question {question} ({len} options)")]
    OptionOutOfRange {
        question: usize,
        option: usize,
        len: usize,
    },
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_index)
    }
}

/// Ordered questions forming a lesson's knowledge check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub questions: Vec<Question>,
}

impl QuestionSet {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// Result of scoring a complete set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizOutcome {
    correct: usize,
    total: usize,
    passed: bool,
}

impl QuizOutcome {
    fn new(correct: usize, total: usize) -> Self {
        // Integer comparison; 7/10 must pass exactly at the boundary.
        let passed = correct * 100 >= total * PASS_THRESHOLD_PERCENT;
        Self {
            correct,
            total,
            passed,
        }
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Score as a whole percentage, rounded down.
    #[must_use]
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.correct * 100 / self.total
    }
}

/// A question answered incorrectly, with the explanation to show the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissedQuestion<'a> {
    pub index: usize,
    pub question: &'a Question,
    pub given: Option<usize>,
}

impl MissedQuestion<'_> {
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.question.explanation.as_deref()
    }
}

/// Score `answers` against `questions`.
///
/// # Errors
///
/// Returns `QuizError::AnswerCountMismatch` if the slices differ in length.
pub fn score(questions: &QuestionSet, answers: &[Option<usize>]) -> Result<QuizOutcome, QuizError> {
    if answers.len() != questions.len() {
        return Err(QuizError::AnswerCountMismatch {
            expected: questions.len(),
            actual: answers.len(),
        });
    }
    let correct = questions
        .questions
        .iter()
        .zip(answers)
        .filter(|(question, answer)| question.is_correct(**answer))
        .count();
    Ok(QuizOutcome::new(correct, questions.len()))
}

/// Outcome of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// At least one question is unanswered; nothing changed.
    Incomplete { unanswered: usize },
    Scored(QuizOutcome),
}

/// Ephemeral answering state for one knowledge check.
///
/// `None` marks an unanswered question. Created when the check is opened and
/// dropped with the lesson session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    answers: Vec<Option<usize>>,
    outcome: Option<QuizOutcome>,
}

impl QuizSession {
    #[must_use]
    pub fn new(questions: &QuestionSet) -> Self {
        Self {
            answers: vec![None; questions.len()],
            outcome: None,
        }
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.outcome.is_some()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        self.outcome
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.is_some_and(|outcome| outcome.passed())
    }

    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.answers.iter().filter(|answer| answer.is_none()).count()
    }

    /// Record `option` as the answer to `question`.
    ///
    /// Returns `Ok(false)` without changing anything once the session has been submitted.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if either index is outside the question set.
    pub fn select(
        &mut self,
        questions: &QuestionSet,
        question: usize,
        option: usize,
    ) -> Result<bool, QuizError> {
        self.check_len(questions)?;
        let q = questions.get(question).ok_or(QuizError::QuestionOutOfRange {
            index: question,
            len: questions.len(),
        })?;
        if option >= q.options.len() {
            return Err(QuizError::OptionOutOfRange {
                question,
                option,
                len: q.options.len(),
            });
        }
        if self.is_submitted() {
            return Ok(false);
        }
        self.answers[question] = Some(option);
        Ok(true)
    }

    /// Score the session if every question has an answer.
    ///
    /// A second submit returns the stored outcome unchanged.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AnswerCountMismatch` if `questions` is not the set this
    /// session was created for.
    pub fn submit(&mut self, questions: &QuestionSet) -> Result<SubmitOutcome, QuizError> {
        if let Some(outcome) = self.outcome {
            return Ok(SubmitOutcome::Scored(outcome));
        }
        let unanswered = self.unanswered();
        if unanswered > 0 {
            return Ok(SubmitOutcome::Incomplete { unanswered });
        }
        let outcome = score(questions, &self.answers)?;
        self.outcome = Some(outcome);
        Ok(SubmitOutcome::Scored(outcome))
    }

    /// Clear all answers and the submitted flag.
    pub fn retry(&mut self) {
        self.answers.fill(None);
        self.outcome = None;
    }

    /// Questions answered incorrectly in a submitted session.
    #[must_use]
    pub fn missed<'a>(&self, questions: &'a QuestionSet) -> Vec<MissedQuestion<'a>> {
        if !self.is_submitted() {
            return Vec::new();
        }
        questions
            .questions
            .iter()
            .zip(&self.answers)
            .enumerate()
            .filter(|(_, (question, answer))| !question.is_correct(**answer))
            .map(|(index, (question, answer))| MissedQuestion {
                index,
                question,
                given: *answer,
            })
            .collect()
    }

    fn check_len(&self, questions: &QuestionSet) -> Result<(), QuizError> {
        if self.answers.len() == questions.len() {
            Ok(())
        } else {
            Err(QuizError::AnswerCountMismatch {
                expected: questions.len(),
                actual: self.answers.len(),
            })
        }
    }
}
