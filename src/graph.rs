//! Derivation Graph Building Blocks
//!
//! A lesson is declared, not coded. Each step names one derived matrix and
//! gives an [`Expr`] describing how to compute it from the lesson's constants
//! and from steps declared before it:
//!
//! ```text
//! calc-q       = Input × Wq
//! calc-kt      = calc-k^T
//! calc-scores  = (calc-q × calc-kt) / 2
//! ```
//!
//! ## Prerequisites Come From the Expression
//!
//! The steps an expression mentions are exactly the step's prerequisites.
//! Constants never count. There is no separate prerequisite table to keep in
//! sync with the arithmetic, so the two cannot drift apart.
//!
//! ## Acyclicity
//!
//! A step may only mention steps declared *earlier* in the lesson. Lesson
//! assembly rejects anything else with
//! [`TutorError::ForwardReference`](crate::error::TutorError::ForwardReference),
//! which makes a cycle impossible to express.
//!
//! ## Step Identifiers
//!
//! A [`StepId`] is a name plus an optional attention-head index. Its text
//! form appends `-head{n}`:
//!
//! ```rust
//! use matrix_tutor::StepId;
//!
//! let id: StepId = "calc-scores-head1".parse().unwrap();
//! assert_eq!(id, StepId::head("calc-scores", 1));
//! assert_eq!(id.to_string(), "calc-scores-head1");
//! ```

use crate::error::{TutorError, TutorResult};
use crate::matrix::{cross_entropy_loss, Matrix};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const HEAD_SEPARATOR: &str = "-head";

/// Identifies one derived matrix within a lesson
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StepId {
    name: String,
    head: Option<usize>,
}

impl StepId {
    /// A step with no head index
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: None,
        }
    }

    /// A step belonging to attention head `head` (1-based)
    pub fn head(name: impl Into<String>, head: usize) -> Self {
        Self {
            name: name.into(),
            head: Some(head),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head_index(&self) -> Option<usize> {
        self.head
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.head {
            Some(h) => f.pad(&format!("{}{}{}", self.name, HEAD_SEPARATOR, h)),
            None => f.pad(&self.name),
        }
    }
}

fn is_head_index(digits: &str) -> bool {
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for StepId {
    type Err = TutorError;

    fn from_str(s: &str) -> TutorResult<Self> {
        let s = s.trim();
        let invalid = || TutorError::InvalidStepId(s.to_string());

        let id = match s.rsplit_once(HEAD_SEPARATOR) {
            Some((name, digits)) if is_head_index(digits) => {
                // "head0" and zero-padded indices have no canonical text form
                if digits.starts_with('0') {
                    return Err(invalid());
                }
                let head: usize = digits.parse().map_err(|_| invalid())?;
                StepId::head(name, head)
            }
            _ => StepId::new(s),
        };

        if id.name.is_empty() {
            return Err(invalid());
        }
        Ok(id)
    }
}

impl From<StepId> for String {
    fn from(id: StepId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for StepId {
    type Error = TutorError;

    fn try_from(s: String) -> TutorResult<Self> {
        s.parse()
    }
}

/// How a step reaches `Completed`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grading {
    /// The learner types the matrix and it is checked cell by cell
    Manual,
    /// Read-only display that completes as soon as it is shown unlocked
    Auto,
}

/// Declarative formula for a derived matrix
///
/// Built with the chaining helpers:
///
/// ```rust
/// use matrix_tutor::graph::Expr;
///
/// // Scores = (Q × K^T) / 2
/// let scores = Expr::step("calc-q")
///     .matmul(Expr::step("calc-kt"))
///     .div_scalar(2.0);
/// assert_eq!(scores.step_refs().len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(String),
    Step(StepId),
    MatMul(Box<Expr>, Box<Expr>),
    Transpose(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Hadamard(Box<Expr>, Box<Expr>),
    Scale(Box<Expr>, f64),
    DivScalar(Box<Expr>, f64),
    SoftmaxRows(Box<Expr>),
    Relu(Box<Expr>),
    ReluDerivative(Box<Expr>),
    /// Single-row cross-entropy as a 1×1 matrix: `(predicted, truth)`
    CrossEntropy(Box<Expr>, Box<Expr>),
    ConcatHorizontal(Vec<Expr>),
    ConcatVertical(Vec<Expr>),
    MeanRows(Box<Expr>),
}

impl Expr {
    pub fn constant(name: impl Into<String>) -> Self {
        Expr::Const(name.into())
    }

    pub fn step(name: impl Into<String>) -> Self {
        Expr::Step(StepId::new(name))
    }

    pub fn head_step(name: impl Into<String>, head: usize) -> Self {
        Expr::Step(StepId::head(name, head))
    }

    pub fn matmul(self, rhs: Expr) -> Self {
        Expr::MatMul(Box::new(self), Box::new(rhs))
    }

    pub fn t(self) -> Self {
        Expr::Transpose(Box::new(self))
    }

    pub fn plus(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn minus(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn hadamard(self, rhs: Expr) -> Self {
        Expr::Hadamard(Box::new(self), Box::new(rhs))
    }

    pub fn scale(self, s: f64) -> Self {
        Expr::Scale(Box::new(self), s)
    }

    pub fn div_scalar(self, s: f64) -> Self {
        Expr::DivScalar(Box::new(self), s)
    }

    pub fn softmax_rows(self) -> Self {
        Expr::SoftmaxRows(Box::new(self))
    }

    pub fn relu(self) -> Self {
        Expr::Relu(Box::new(self))
    }

    pub fn relu_derivative(self) -> Self {
        Expr::ReluDerivative(Box::new(self))
    }

    pub fn cross_entropy(self, truth: Expr) -> Self {
        Expr::CrossEntropy(Box::new(self), Box::new(truth))
    }

    pub fn mean_rows(self) -> Self {
        Expr::MeanRows(Box::new(self))
    }

    /// Direct operands of this node
    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Step(_) => Vec::new(),
            Expr::Transpose(a)
            | Expr::Scale(a, _)
            | Expr::DivScalar(a, _)
            | Expr::SoftmaxRows(a)
            | Expr::Relu(a)
            | Expr::ReluDerivative(a)
            | Expr::MeanRows(a) => vec![a],
            Expr::MatMul(a, b)
            | Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Hadamard(a, b)
            | Expr::CrossEntropy(a, b) => vec![a, b],
            Expr::ConcatHorizontal(parts) | Expr::ConcatVertical(parts) => parts.iter().collect(),
        }
    }

    /// Steps mentioned anywhere in the expression, first mention first,
    /// without duplicates
    pub fn step_refs(&self) -> Vec<StepId> {
        let mut out = Vec::new();
        self.collect_steps(&mut out);
        out
    }

    fn collect_steps(&self, out: &mut Vec<StepId>) {
        if let Expr::Step(id) = self {
            if !out.contains(id) {
                out.push(id.clone());
            }
            return;
        }
        for child in self.children() {
            child.collect_steps(out);
        }
    }

    /// Evaluate against the constant bank and the steps computed so far
    ///
    /// # Arguments
    ///
    /// * `owner` - The step being evaluated, for error messages
    /// * `constants` - The lesson's constant tensor bank
    /// * `computed` - Values of every step declared before `owner`
    ///
    /// # Returns
    ///
    /// The derived matrix. Shape problems inside the kernel do not fail here;
    /// they surface as NaN or pass-through values. Only references to
    /// unknown constants or not-yet-computed steps are errors.
    pub fn eval(
        &self,
        owner: &StepId,
        constants: &HashMap<String, Matrix>,
        computed: &HashMap<StepId, Matrix>,
    ) -> TutorResult<Matrix> {
        let ev = |e: &Expr| e.eval(owner, constants, computed);

        Ok(match self {
            Expr::Const(name) => constants
                .get(name)
                .cloned()
                .ok_or_else(|| TutorError::UnknownConstant {
                    step: owner.to_string(),
                    name: name.clone(),
                })?,
            Expr::Step(id) => computed
                .get(id)
                .cloned()
                .ok_or_else(|| TutorError::ForwardReference {
                    step: owner.to_string(),
                    operand: id.to_string(),
                })?,
            Expr::MatMul(a, b) => ev(a)?.matmul(&ev(b)?),
            Expr::Transpose(a) => ev(a)?.transpose(),
            Expr::Add(a, b) => ev(a)?.add(&ev(b)?),
            Expr::Sub(a, b) => ev(a)?.sub(&ev(b)?),
            Expr::Hadamard(a, b) => ev(a)?.hadamard(&ev(b)?),
            Expr::Scale(a, s) => ev(a)?.scale(*s),
            Expr::DivScalar(a, s) => ev(a)?.div_scalar(*s),
            Expr::SoftmaxRows(a) => ev(a)?.softmax_rows(),
            Expr::Relu(a) => ev(a)?.relu(),
            Expr::ReluDerivative(a) => ev(a)?.relu_derivative(),
            Expr::CrossEntropy(p, y) => {
                Matrix::new(vec![cross_entropy_loss(&ev(p)?, &ev(y)?)], 1, 1)
            }
            Expr::MeanRows(a) => ev(a)?.mean_rows(),
            Expr::ConcatHorizontal(parts) => {
                let values = parts.iter().map(ev).collect::<TutorResult<Vec<_>>>()?;
                Matrix::concat_horizontal(&values.iter().collect::<Vec<_>>())
            }
            Expr::ConcatVertical(parts) => {
                let values = parts.iter().map(ev).collect::<TutorResult<Vec<_>>>()?;
                Matrix::concat_vertical(&values.iter().collect::<Vec<_>>())
            }
        })
    }
}

/// Longer teaching text for a step: why it matters and a worked example
///
/// ```rust
/// use matrix_tutor::graph::StepGuide;
///
/// let guide = StepGuide::new("Step 2", "Queries ask what each token is looking for.")
///     .example("Q = X × Wq")
///     .tip("Input.cols must equal Wq.rows.");
/// assert_eq!(guide.tips.len(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGuide {
    /// Position in the lesson as shown to the learner, e.g. "Step 3"
    pub step_number: String,
    pub explanation: String,
    pub importance: String,
    /// Worked example; lines are separated by `\n`
    pub example: String,
    pub tips: Vec<String>,
}

impl StepGuide {
    pub fn new(step_number: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            step_number: step_number.into(),
            explanation: explanation.into(),
            ..Self::default()
        }
    }

    pub fn importance(mut self, importance: impl Into<String>) -> Self {
        self.importance = importance.into();
        self
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    pub fn tip(mut self, tip: impl Into<String>) -> Self {
        self.tips.push(tip.into());
        self
    }
}

/// One step as written in a lesson definition
///
/// Carries the formula plus everything the catalog shows next to it.
#[derive(Clone, Debug)]
pub struct StepDecl {
    pub id: StepId,
    pub expr: Expr,
    pub grading: Grading,
    pub title: String,
    pub description: String,
    pub formula: String,
    pub result_name: String,
    pub inputs: Vec<(String, Expr)>,
    pub hint: String,
    pub guide: Option<StepGuide>,
}

impl StepDecl {
    /// A step the learner fills in by hand
    pub fn manual(id: StepId, expr: Expr) -> Self {
        Self::with_grading(id, expr, Grading::Manual)
    }

    /// A step that completes itself once shown
    pub fn auto(id: StepId, expr: Expr) -> Self {
        Self::with_grading(id, expr, Grading::Auto)
    }

    fn with_grading(id: StepId, expr: Expr, grading: Grading) -> Self {
        let name = id.to_string();
        Self {
            id,
            expr,
            grading,
            title: name.clone(),
            description: String::new(),
            formula: String::new(),
            result_name: name,
            inputs: Vec::new(),
            hint: String::new(),
            guide: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = formula.into();
        self
    }

    /// Label for the result; the catalog appends the expected shape
    pub fn result(mut self, name: impl Into<String>) -> Self {
        self.result_name = name.into();
        self
    }

    /// Add a named matrix shown alongside the step
    pub fn input(mut self, label: impl Into<String>, expr: Expr) -> Self {
        self.inputs.push((label.into(), expr));
        self
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn guide(mut self, guide: StepGuide) -> Self {
        self.guide = Some(guide);
        self
    }
}
