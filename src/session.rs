//! Learner Session: Completion Set and Unlock State Machine
//!
//! A [`Session`] is one learner working through one [`Lesson`]. It owns the
//! only mutable state in the crate: the set of completed steps.
//!
//! ## States
//!
//! ```text
//! Locked ──(all prerequisites completed)──▶ Unlocked ──(correct answer / shown)──▶ Completed
//!    ▲                                                                                │
//!    └──────────────────────────────── reset() ───────────────────────────────────────┘
//! ```
//!
//! - Manual steps complete through [`Session::submit`] with a matrix that
//!   matches the expected one in every cell.
//! - Auto steps complete through [`Session::reveal`] (or
//!   [`Session::reveal_unlocked`]), which the presentation layer calls when
//!   it displays them.
//!
//! The completion set only grows until [`Session::reset`] puts it back to the
//! lesson's seed. Since unlocking is "every prerequisite is completed", a
//! step never relocks while the set grows.
//!
//! ## Example
//!
//! ```rust
//! use matrix_tutor::{Lesson, LessonKind, Session, StepId, StepStatus};
//!
//! let lesson = Lesson::load(LessonKind::SelfAttention).unwrap();
//! let mut session = Session::new(&lesson);
//!
//! let k = StepId::new("calc-k");
//! let kt = StepId::new("calc-kt");
//! assert_eq!(session.status(&kt).unwrap(), StepStatus::Locked);
//!
//! let answer = lesson.compute_expected(&k).unwrap().to_rows();
//! let result = session.submit(&k, &answer).unwrap();
//! assert!(result.validation.is_valid);
//! assert_eq!(result.unlocked, vec![kt.clone()]);
//! assert_eq!(session.status(&kt).unwrap(), StepStatus::Unlocked);
//! ```

use crate::error::{TutorError, TutorResult};
use crate::graph::{Grading, StepId};
use crate::lesson::Lesson;
use crate::validation::Validation;
use serde::Serialize;
use std::collections::BTreeSet;

/// Where a step stands for the current learner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Locked,
    Unlocked,
    Completed,
}

/// What a submission did to the session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// Correct; the step is now completed
    Completed,
    /// At least one cell is wrong; nothing changed
    Incorrect,
    /// Prerequisites are missing; the answer was checked but not recorded
    Locked,
    /// The step was already completed; nothing changed
    AlreadyCompleted,
}

/// Result of [`Session::submit`]
#[derive(Clone, Debug, Serialize)]
pub struct Submission {
    pub validation: Validation,
    pub outcome: Outcome,
    /// Steps that became unlocked because of this submission
    pub unlocked: Vec<StepId>,
}

/// One learner's progress through a lesson
#[derive(Clone, Debug)]
pub struct Session<'a> {
    lesson: &'a Lesson,
    completed: BTreeSet<StepId>,
}

impl<'a> Session<'a> {
    /// Start a session with the lesson's seed steps completed
    pub fn new(lesson: &'a Lesson) -> Self {
        Self {
            lesson,
            completed: lesson.seed().clone(),
        }
    }

    pub fn lesson(&self) -> &'a Lesson {
        self.lesson
    }

    /// The current completion set
    pub fn completed(&self) -> &BTreeSet<StepId> {
        &self.completed
    }

    pub fn is_completed(&self, step: &StepId) -> bool {
        self.completed.contains(step)
    }

    pub fn is_unlocked(&self, step: &StepId) -> TutorResult<bool> {
        self.lesson.is_unlocked(step, &self.completed)
    }

    pub fn status(&self, step: &StepId) -> TutorResult<StepStatus> {
        let unlocked = self.is_unlocked(step)?;
        Ok(if self.completed.contains(step) {
            StepStatus::Completed
        } else if unlocked {
            StepStatus::Unlocked
        } else {
            StepStatus::Locked
        })
    }

    /// Status of every step in declaration order
    pub fn statuses(&self) -> Vec<(StepId, StepStatus)> {
        self.lesson
            .steps()
            .map(|meta| {
                let status = if self.completed.contains(&meta.id) {
                    StepStatus::Completed
                } else if meta.prerequisites.iter().all(|p| self.completed.contains(p)) {
                    StepStatus::Unlocked
                } else {
                    StepStatus::Locked
                };
                (meta.id.clone(), status)
            })
            .collect()
    }

    /// Check a learner's answer for a manually graded step
    ///
    /// The answer is always validated so the caller can show the error mask.
    /// It is only recorded when the step is unlocked, not yet completed and
    /// correct.
    ///
    /// # Errors
    ///
    /// Unknown steps, and auto-graded steps (they take no input).
    pub fn submit(&mut self, step: &StepId, candidate: &[Vec<f64>]) -> TutorResult<Submission> {
        let meta = self.lesson.metadata(step)?;
        if meta.grading == Grading::Auto {
            return Err(TutorError::NotManuallyGraded(step.to_string()));
        }

        let validation = self.lesson.validate(step, candidate)?;

        let outcome = if self.completed.contains(step) {
            Outcome::AlreadyCompleted
        } else if !self.is_unlocked(step)? {
            log::debug!("{}: {} submitted while locked", self.lesson.kind(), step);
            Outcome::Locked
        } else if validation.is_valid {
            Outcome::Completed
        } else {
            log::debug!(
                "{}: {} has {} wrong cells",
                self.lesson.kind(),
                step,
                validation.error_count()
            );
            Outcome::Incorrect
        };

        let unlocked = if outcome == Outcome::Completed {
            self.complete(step)?
        } else {
            Vec::new()
        };

        Ok(Submission {
            validation,
            outcome,
            unlocked,
        })
    }

    /// Mark an auto-graded step as shown
    ///
    /// Returns the steps newly unlocked by completing it. Revealing a step
    /// that is still locked or already completed changes nothing.
    ///
    /// # Errors
    ///
    /// Unknown steps, and manually graded steps.
    pub fn reveal(&mut self, step: &StepId) -> TutorResult<Vec<StepId>> {
        let meta = self.lesson.metadata(step)?;
        if meta.grading == Grading::Manual {
            return Err(TutorError::NotAutoGraded(step.to_string()));
        }
        if self.completed.contains(step) || !self.is_unlocked(step)? {
            return Ok(Vec::new());
        }
        self.complete(step)
    }

    /// Reveal every unlocked auto step, repeating until none is left
    ///
    /// Returns the revealed steps in the order they completed.
    pub fn reveal_unlocked(&mut self) -> Vec<StepId> {
        let mut revealed = Vec::new();
        loop {
            let ready: Vec<StepId> = self
                .lesson
                .steps()
                .filter(|m| m.grading == Grading::Auto && !self.completed.contains(&m.id))
                .filter(|m| m.prerequisites.iter().all(|p| self.completed.contains(p)))
                .map(|m| m.id.clone())
                .collect();
            if ready.is_empty() {
                return revealed;
            }
            for id in ready {
                log::info!("{}: revealed {}", self.lesson.kind(), id);
                self.completed.insert(id.clone());
                revealed.push(id);
            }
        }
    }

    /// Add `step` to the completion set and report what it unlocked
    fn complete(&mut self, step: &StepId) -> TutorResult<Vec<StepId>> {
        self.completed.insert(step.clone());
        log::info!("{}: completed {}", self.lesson.kind(), step);

        let mut unlocked = Vec::new();
        for dependent in self.lesson.dependents(step)? {
            if !self.completed.contains(dependent) && self.is_unlocked(dependent)? {
                log::debug!("{}: unlocked {}", self.lesson.kind(), dependent);
                unlocked.push(dependent.clone());
            }
        }
        Ok(unlocked)
    }

    /// `(completed, total)` step counts
    pub fn progress(&self) -> (usize, usize) {
        (self.completed.len(), self.lesson.step_count())
    }

    pub fn is_finished(&self) -> bool {
        self.completed.len() == self.lesson.step_count()
    }

    /// Clear progress back to the lesson's seed
    pub fn reset(&mut self) -> &BTreeSet<StepId> {
        self.completed = self.lesson.seed().clone();
        log::info!(
            "{}: reset to {} seed steps",
            self.lesson.kind(),
            self.completed.len()
        );
        &self.completed
    }
}
