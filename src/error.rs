//! Error types for lesson assembly and session control
//!
//! Only configuration problems are errors. Dimension mismatches inside the
//! kernel are recovered locally (see [`crate::matrix`]) and wrong learner
//! answers are ordinary [`crate::validation::Validation`] results.

use thiserror::Error;

/// Result type for tutor operations
pub type TutorResult<T> = Result<T, TutorError>;

/// Errors that can occur while building lessons or driving a session
#[derive(Error, Debug)]
pub enum TutorError {
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Invalid step identifier: {0:?}")]
    InvalidStepId(String),

    #[error("Step {step} references unknown constant {name:?}")]
    UnknownConstant { step: String, name: String },

    #[error("Step {step} references {operand}, which is not defined before it")]
    ForwardReference { step: String, operand: String },

    #[error("Step {0} is declared more than once")]
    DuplicateStep(String),

    #[error("Seed step {0} is not declared in the lesson")]
    UnknownSeed(String),

    #[error("Step {0} is graded from learner input and cannot be revealed")]
    NotAutoGraded(String),

    #[error("Step {0} completes itself when unlocked and takes no submissions")]
    NotManuallyGraded(String),

    #[error("Ragged matrix: row {row} has {got} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
