//! Walkthrough Scripts
//!
//! Lesson numbers are compiled in and never configurable. What can be
//! loaded from disk is a *script*: a recorded sequence of learner actions
//! that is replayed against a fresh session. Scripts drive the
//! `walkthrough replay` command and make classroom scenarios reproducible.
//!
//! # Example
//!
//! ```json
//! {
//!   "lesson": "neural-network",
//!   "steps": [
//!     { "step": "calc-z1", "matrix": [[0.09, 0.5, -0.12, 0.07]] },
//!     { "reveal": "activate-a1" },
//!     { "reveal_unlocked": true },
//!     { "reset": true }
//!   ]
//! }
//! ```

use crate::error::{TutorError, TutorResult};
use crate::graph::{Grading, StepId};
use crate::lesson::Lesson;
use crate::lessons::LessonKind;
use crate::session::{Outcome, Session};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One recorded learner action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptAction {
    /// Type a matrix into a manually graded step
    Submit { step: StepId, matrix: Vec<Vec<f64>> },
    /// Display an auto-graded step
    Reveal { reveal: StepId },
    /// Display every auto-graded step that is ready
    RevealUnlocked { reveal_unlocked: bool },
    /// Start over from the seed
    Reset { reset: bool },
}

/// A lesson plus the actions to replay against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub lesson: LessonKind,
    pub steps: Vec<ScriptAction>,
}

/// What one replayed action did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ReplayEvent {
    Submit {
        step: StepId,
        outcome: Outcome,
        wrong_cells: usize,
        unlocked: Vec<StepId>,
    },
    Reveal {
        step: StepId,
        unlocked: Vec<StepId>,
    },
    RevealUnlocked {
        revealed: Vec<StepId>,
    },
    Reset,
    /// An action whose flag was `false`
    Skipped,
}

/// Load and validate a script from a JSON file
///
/// # Errors
///
/// I/O and JSON errors, plus [`TutorError::InvalidConfig`] for a script
/// that names unknown steps, submits to an auto-graded step, reveals a
/// manual one, carries an empty matrix, or has no actions.
pub fn load_script(path: impl AsRef<Path>) -> TutorResult<Script> {
    let contents = fs::read_to_string(path.as_ref())?;
    let script = parse_script(&contents)?;
    log::debug!(
        "loaded {} actions for {} from {}",
        script.steps.len(),
        script.lesson,
        path.as_ref().display()
    );
    Ok(script)
}

/// Parse and validate a script from JSON text
pub fn parse_script(json: &str) -> TutorResult<Script> {
    let script: Script = serde_json::from_str(json)?;
    let lesson = Lesson::load(script.lesson)?;
    validate_script(&script, &lesson)?;
    Ok(script)
}

fn invalid(msg: String) -> TutorError {
    log::error!("invalid script: {}", msg);
    TutorError::InvalidConfig(msg)
}

fn grading_of(lesson: &Lesson, step: &StepId, index: usize) -> TutorResult<Grading> {
    if !lesson.contains(step) {
        return Err(invalid(format!(
            "action {}: {} has no step {}",
            index,
            lesson.kind(),
            step
        )));
    }
    Ok(lesson.metadata(step)?.grading)
}

fn validate_script(script: &Script, lesson: &Lesson) -> TutorResult<()> {
    if script.steps.is_empty() {
        return Err(invalid("script has no actions".to_string()));
    }

    for (i, action) in script.steps.iter().enumerate() {
        match action {
            ScriptAction::Submit { step, matrix } => {
                if grading_of(lesson, step, i)? == Grading::Auto {
                    return Err(invalid(format!(
                        "action {}: {} is auto-graded; use \"reveal\"",
                        i, step
                    )));
                }
                if matrix.is_empty() || matrix.iter().any(Vec::is_empty) {
                    return Err(invalid(format!("action {}: matrix for {} is empty", i, step)));
                }
            }
            ScriptAction::Reveal { reveal } => {
                if grading_of(lesson, reveal, i)? == Grading::Manual {
                    return Err(invalid(format!(
                        "action {}: {} is graded from input; use \"step\" and \"matrix\"",
                        i, reveal
                    )));
                }
            }
            ScriptAction::RevealUnlocked { .. } | ScriptAction::Reset { .. } => {}
        }
    }
    Ok(())
}

impl Script {
    /// Play every action against `session`, in order
    ///
    /// # Errors
    ///
    /// Only for actions that do not fit the session's lesson, which a
    /// script from [`load_script`] never contains.
    pub fn replay(&self, session: &mut Session<'_>) -> TutorResult<Vec<ReplayEvent>> {
        if session.lesson().kind() != self.lesson {
            return Err(TutorError::InvalidConfig(format!(
                "script is for {}, session is for {}",
                self.lesson,
                session.lesson().kind()
            )));
        }

        self.steps
            .iter()
            .map(|action| {
                Ok(match action {
                    ScriptAction::Submit { step, matrix } => {
                        let result = session.submit(step, matrix)?;
                        ReplayEvent::Submit {
                            step: step.clone(),
                            outcome: result.outcome,
                            wrong_cells: result.validation.error_count(),
                            unlocked: result.unlocked,
                        }
                    }
                    ScriptAction::Reveal { reveal } => ReplayEvent::Reveal {
                        step: reveal.clone(),
                        unlocked: session.reveal(reveal)?,
                    },
                    ScriptAction::RevealUnlocked {
                        reveal_unlocked: true,
                    } => ReplayEvent::RevealUnlocked {
                        revealed: session.reveal_unlocked(),
                    },
                    ScriptAction::Reset { reset: true } => {
                        session.reset();
                        ReplayEvent::Reset
                    }
                    ScriptAction::RevealUnlocked { .. } | ScriptAction::Reset { .. } => {
                        ReplayEvent::Skipped
                    }
                })
            })
            .collect()
    }
}
