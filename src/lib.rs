//! Matrix Tutor: Hand-Verifiable Neural-Network Arithmetic
//!
//! An engine for teaching the arithmetic behind attention, backpropagation
//! and word2vec. The learner fills in intermediate matrices one step at a
//! time. Each answer is graded cell by cell against precomputed values, and
//! solving a step unlocks the steps that depend on it.
//!
//! # Modules
//!
//! - [`matrix`] - Dense matrix and the kernel operations the lessons use
//! - [`graph`] - Step identifiers and the declarative step formulas
//! - [`lesson`] - Evaluated lessons: expected values, catalog, prerequisites
//! - [`validation`] - Tolerance check and per-cell error mask
//! - [`session`] - Completion set and the unlock state machine
//! - [`lessons`] - The four built-in lessons
//! - [`config`] - Replayable JSON walkthrough scripts
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust
//! use matrix_tutor::{Lesson, LessonKind, Session, StepId, StepStatus};
//!
//! let lesson = Lesson::load(LessonKind::MultiHeadAttention).unwrap();
//! let session = Session::new(&lesson);
//!
//! let scores = StepId::head("calc-scores", 1);
//! let expected = lesson.compute_expected(&scores).unwrap();
//! assert!((expected[(0, 0)] - 28.2843).abs() < 1e-4);
//!
//! // Wrong answers come back as an error mask, not an error
//! let v = lesson.validate(&scores, &vec![vec![0.0; 5]; 5]).unwrap();
//! assert!(!v.is_valid);
//! assert_eq!(session.status(&scores).unwrap(), StepStatus::Locked);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod lesson;
pub mod lessons;
pub mod matrix;
pub mod session;
pub mod validation;

// Re-export main types for convenience
pub use error::{TutorError, TutorResult};
pub use graph::{Expr, Grading, StepGuide, StepId};
pub use lesson::{audit_all, Lesson, StepMetadata};
pub use lessons::LessonKind;
pub use matrix::Matrix;
pub use session::{Outcome, Session, StepStatus, Submission};
pub use validation::{Validation, TOLERANCE};
