//! Lesson Assembly and the Step Metadata Catalog
//!
//! A [`Lesson`] is one teaching module after its declaration has been
//! evaluated. Building it does everything at once:
//!
//! 1. Evaluate every step's [`Expr`](crate::graph::Expr) in declaration
//!    order against the constant bank and the earlier steps.
//! 2. Snapshot the display matrices listed for each step.
//! 3. Record prerequisites (the steps each expression mentions) and the
//!    reverse edges (dependents).
//! 4. Check the seed set.
//!
//! After that the lesson is immutable. Everything here is a pure read:
//! expected values, metadata, validation and the unlock check never depend
//! on learner progress except through the completion set passed in. That
//! makes a lesson safe to share between any number of sessions.
//!
//! ## Example
//!
//! ```rust
//! use matrix_tutor::{Lesson, LessonKind, StepId};
//! use std::collections::BTreeSet;
//!
//! let lesson = Lesson::load(LessonKind::SelfAttention).unwrap();
//! let q = StepId::new("calc-q");
//!
//! assert_eq!(lesson.compute_expected(&q).unwrap()[(0, 0)], 10.0);
//! assert!(lesson.is_unlocked(&q, &BTreeSet::new()).unwrap());
//! assert!(!lesson.is_unlocked(&StepId::new("calc-scores"), &BTreeSet::new()).unwrap());
//! ```

use crate::error::{TutorError, TutorResult};
use crate::graph::{Grading, StepDecl, StepGuide, StepId};
use crate::lessons::LessonKind;
use crate::matrix::Matrix;
use crate::validation::{validate, Validation};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Declarative description of a lesson
///
/// Produced by each module under [`crate::lessons`] and turned into a
/// [`Lesson`] by [`Lesson::build`].
#[derive(Clone, Debug)]
pub struct LessonSpec {
    pub kind: LessonKind,
    pub title: String,
    /// The constant tensor bank, by name
    pub constants: Vec<(String, Matrix)>,
    /// Steps in topological order
    pub steps: Vec<StepDecl>,
    /// Steps completed at the start of every session
    pub seed: Vec<StepId>,
    /// Teaching text shown before the first step
    pub intro: Option<StepGuide>,
}

/// A labelled matrix shown next to a step
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedMatrix {
    pub name: String,
    pub data: Matrix,
}

/// Everything the presentation layer needs to draw one step
#[derive(Clone, Debug, Serialize)]
pub struct StepMetadata {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub formula: String,
    /// Result label with the expected shape appended, e.g. `Q (5×4)`
    pub result_name: String,
    pub input_matrices: Vec<NamedMatrix>,
    pub expected: Matrix,
    pub hint: String,
    pub grading: Grading,
    pub prerequisites: Vec<StepId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide: Option<StepGuide>,
}

/// An evaluated lesson: derivation graph, catalog and prerequisite table
#[derive(Clone, Debug)]
pub struct Lesson {
    kind: LessonKind,
    title: String,
    steps: Vec<StepMetadata>,
    index: HashMap<StepId, usize>,
    dependents: Vec<Vec<StepId>>,
    seed: BTreeSet<StepId>,
    intro: Option<StepGuide>,
}

impl Lesson {
    /// Build one of the built-in lessons
    pub fn load(kind: LessonKind) -> TutorResult<Self> {
        Self::build(kind.spec())
    }

    /// Evaluate a lesson declaration
    ///
    /// # Errors
    ///
    /// Fails on a duplicate step, on a reference to an unknown constant or
    /// to a step not declared earlier, and on a seed that names an unknown
    /// step or depends on a step outside the seed.
    pub fn build(spec: LessonSpec) -> TutorResult<Self> {
        let LessonSpec {
            kind,
            title,
            constants,
            steps: decls,
            seed,
            intro,
        } = spec;
        let constants: HashMap<String, Matrix> = constants.into_iter().collect();

        let mut computed: HashMap<StepId, Matrix> = HashMap::with_capacity(decls.len());
        let mut index = HashMap::with_capacity(decls.len());
        let mut steps = Vec::with_capacity(decls.len());

        for decl in decls {
            if index.contains_key(&decl.id) {
                return Err(TutorError::DuplicateStep(decl.id.to_string()));
            }

            let expected = decl.expr.eval(&decl.id, &constants, &computed)?;
            let input_matrices = decl
                .inputs
                .iter()
                .map(|(label, expr)| {
                    Ok(NamedMatrix {
                        name: label.clone(),
                        data: expr.eval(&decl.id, &constants, &computed)?,
                    })
                })
                .collect::<TutorResult<Vec<_>>>()?;

            let (rows, cols) = expected.shape();
            log::debug!("{}: evaluated {} ({}×{})", kind, decl.id, rows, cols);
            if expected.has_nan() {
                log::warn!("{}: step {} evaluated to NaN cells", kind, decl.id);
            }

            computed.insert(decl.id.clone(), expected.clone());
            index.insert(decl.id.clone(), steps.len());
            steps.push(StepMetadata {
                prerequisites: decl.expr.step_refs(),
                result_name: format!("{} ({}×{})", decl.result_name, rows, cols),
                id: decl.id,
                title: decl.title,
                description: decl.description,
                formula: decl.formula,
                input_matrices,
                expected,
                hint: decl.hint,
                grading: decl.grading,
                guide: decl.guide,
            });
        }

        let mut dependents = vec![Vec::new(); steps.len()];
        for step in &steps {
            for prereq in &step.prerequisites {
                if let Some(&i) = index.get(prereq) {
                    dependents[i].push(step.id.clone());
                }
            }
        }

        let seed: BTreeSet<StepId> = seed.into_iter().collect();
        for id in &seed {
            let i = *index
                .get(id)
                .ok_or_else(|| TutorError::UnknownSeed(id.to_string()))?;
            if let Some(outside) = steps[i].prerequisites.iter().find(|p| !seed.contains(*p)) {
                return Err(TutorError::InvalidConfig(format!(
                    "seed step {} depends on {}, which is not seeded",
                    id, outside
                )));
            }
        }

        log::debug!("{}: built {} steps, seed {:?}", kind, steps.len(), seed);

        Ok(Self {
            kind,
            title,
            steps,
            index,
            dependents,
            seed,
            intro,
        })
    }

    pub fn kind(&self) -> LessonKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Teaching text for the lesson as a whole, if it has any
    pub fn intro(&self) -> Option<&StepGuide> {
        self.intro.as_ref()
    }

    /// Number of steps, including display steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Catalog entries in declaration order
    pub fn steps(&self) -> impl Iterator<Item = &StepMetadata> {
        self.steps.iter()
    }

    pub fn contains(&self, step: &StepId) -> bool {
        self.index.contains_key(step)
    }

    /// Parse a textual step id and confirm it belongs to this lesson
    pub fn step_id(&self, text: &str) -> TutorResult<StepId> {
        let id: StepId = text.parse()?;
        self.position(&id)?;
        Ok(id)
    }

    fn position(&self, step: &StepId) -> TutorResult<usize> {
        self.index.get(step).copied().ok_or_else(|| {
            log::error!("{}: unknown step {}", self.kind, step);
            TutorError::UnknownStep(step.to_string())
        })
    }

    /// Catalog entry for `step`
    pub fn metadata(&self, step: &StepId) -> TutorResult<&StepMetadata> {
        Ok(&self.steps[self.position(step)?])
    }

    /// Ground-truth matrix for `step`
    pub fn compute_expected(&self, step: &StepId) -> TutorResult<&Matrix> {
        Ok(&self.metadata(step)?.expected)
    }

    /// Steps whose values `step` is computed from
    pub fn prerequisites(&self, step: &StepId) -> TutorResult<&[StepId]> {
        Ok(&self.metadata(step)?.prerequisites)
    }

    /// Steps that list `step` as a prerequisite
    pub fn dependents(&self, step: &StepId) -> TutorResult<&[StepId]> {
        Ok(&self.dependents[self.position(step)?])
    }

    /// Steps completed when a session starts or resets
    pub fn seed(&self) -> &BTreeSet<StepId> {
        &self.seed
    }

    /// Check a learner's matrix against the expected one for `step`
    ///
    /// Wrong values and wrong shapes are reported in the returned
    /// [`Validation`]; only an unknown step is an error.
    pub fn validate(&self, step: &StepId, candidate: &[Vec<f64>]) -> TutorResult<Validation> {
        Ok(validate(candidate, self.compute_expected(step)?))
    }

    /// True when every prerequisite of `step` is in `completed`
    pub fn is_unlocked(&self, step: &StepId, completed: &BTreeSet<StepId>) -> TutorResult<bool> {
        Ok(self
            .prerequisites(step)?
            .iter()
            .all(|p| completed.contains(p)))
    }

    /// An order in which every step can be completed, one at a time
    ///
    /// Declaration order is topological, so each step's prerequisites come
    /// before it.
    pub fn solve_order(&self) -> Vec<&StepId> {
        self.steps.iter().map(|s| &s.id).collect()
    }

    /// Steps whose own expected matrix fails validation
    ///
    /// Empty for a healthy lesson. A non-empty result means some expression
    /// produced NaN cells.
    pub fn self_check(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| !validate(&s.expected.to_rows(), &s.expected).is_valid)
            .map(|s| s.id.clone())
            .collect()
    }
}

/// Self-check result for one lesson
#[derive(Clone, Debug, Serialize)]
pub struct AuditReport {
    pub kind: LessonKind,
    pub steps: usize,
    pub failures: Vec<StepId>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Build every built-in lesson and self-check it, in parallel
pub fn audit_all() -> TutorResult<Vec<AuditReport>> {
    LessonKind::ALL
        .par_iter()
        .map(|&kind| {
            let lesson = Lesson::load(kind)?;
            Ok(AuditReport {
                kind,
                steps: lesson.step_count(),
                failures: lesson.self_check(),
            })
        })
        .collect()
}
