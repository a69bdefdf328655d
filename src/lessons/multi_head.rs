//! Multi-Head Attention
//!
//! Three independent attention heads over the same input, each looking at a
//! different pair of feature columns, followed by concatenation and an
//! output projection.
//!
//! ## Computation (per head h = 1, 2, 3)
//!
//! ```text
//! Q_h      = Input × Wq_h                       (5×6)(6×2) → 5×2
//! K_h      = Input × Wk_h
//! V_h      = Input × Wv_h
//! K_h^T    = transpose(K_h)                     2×5
//! Scores_h = (Q_h × K_h^T) / √2                 5×5
//! Head_h   = softmax(Scores_h) × V_h            5×2
//!
//! Concat   = [Head_1 | Head_2 | Head_3]         5×6
//! Output   = Concat × Wo                        5×6, Wo = I₆
//! ```
//!
//! The softmax node folds in the multiplication by `V_h`, so its result is
//! the head's output rather than the bare attention weights.
//!
//! ## Weights
//!
//! Head h reads feature columns `2h−2` and `2h−1`. Its `Wq`, `Wk` and `Wv`
//! place 10, 2 and 1 on those two rows and zeros elsewhere.

use crate::graph::{Expr, StepDecl, StepId};
use crate::lesson::LessonSpec;
use crate::lessons::LessonKind;
use crate::matrix::Matrix;

pub const HEADS: usize = 3;
pub const HEAD_DIM: usize = 2;

pub fn input() -> Matrix {
    Matrix::from_array([
        [1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0, 1.0, 1.0],
    ])
}

/// 6×2 projection for `head` with `value` on the head's two feature rows
///
/// # Panics
///
/// Panics if `head` is not in `1..=HEADS`.
pub fn head_weight(head: usize, value: f64) -> Matrix {
    assert!((1..=HEADS).contains(&head), "head {} out of range", head);
    let d_model = HEADS * HEAD_DIM;
    let mut data = vec![0.0; d_model * HEAD_DIM];
    let first = (head - 1) * HEAD_DIM;
    for k in 0..HEAD_DIM {
        data[(first + k) * HEAD_DIM + k] = value;
    }
    Matrix::new(data, d_model, HEAD_DIM)
}

pub fn wo() -> Matrix {
    Matrix::identity(HEADS * HEAD_DIM)
}

fn head_steps(h: usize, scale: f64) -> Vec<StepDecl> {
    let input = || Expr::constant("input");
    let w = |kind: &str| Expr::constant(format!("{}-head{}", kind, h));
    let s = |name: &str| Expr::head_step(name, h);

    vec![
        StepDecl::manual(StepId::head("calc-q", h), input().matmul(w("wq")))
            .title(format!("Query Matrix (Q) (Head {})", h))
            .description(format!("Calculate the Query matrix for head {}.", h))
            .formula(format!("Q{h} = Input × Wq{h}"))
            .result(format!("Q{} Matrix", h))
            .input("Input (5×6)", input())
            .input(format!("Wq{} (6×2)", h), w("wq"))
            .hint(format!(
                "Multiply the Input matrix by Wq{h} to get the queries for head {h}."
            )),
        StepDecl::manual(StepId::head("calc-k", h), input().matmul(w("wk")))
            .title(format!("Key Matrix (K) (Head {})", h))
            .description(format!("Calculate the Key matrix for head {}.", h))
            .formula(format!("K{h} = Input × Wk{h}"))
            .result(format!("K{} Matrix", h))
            .input("Input (5×6)", input())
            .input(format!("Wk{} (6×2)", h), w("wk"))
            .hint(format!(
                "Multiply the Input matrix by Wk{h} to get the keys for head {h}."
            )),
        StepDecl::manual(StepId::head("calc-v", h), input().matmul(w("wv")))
            .title(format!("Value Matrix (V) (Head {})", h))
            .description(format!("Calculate the Value matrix for head {}.", h))
            .formula(format!("V{h} = Input × Wv{h}"))
            .result(format!("V{} Matrix", h))
            .input("Input (5×6)", input())
            .input(format!("Wv{} (6×2)", h), w("wv"))
            .hint(format!(
                "Multiply the Input matrix by Wv{h} to get the values for head {h}."
            )),
        StepDecl::manual(StepId::head("k-transpose", h), s("calc-k").t())
            .title(format!("Transposed Keys (Head {})", h))
            .description(format!("Transpose K{} so it can be multiplied with Q{}.", h, h))
            .formula(format!("K{h}^T = transpose(K{h})"))
            .result(format!("K{}^T", h))
            .input(format!("K{} (5×2)", h), s("calc-k"))
            .hint("Rows become columns: the 5×2 key matrix turns into 2×5."),
        StepDecl::manual(
            StepId::head("calc-scores", h),
            s("calc-q").matmul(s("k-transpose")).div_scalar(scale),
        )
        .title(format!("Attention Scores (Head {})", h))
        .description(format!("Calculate scaled attention scores for head {}.", h))
        .formula(format!("Scores{h} = (Q{h} × K{h}^T) / √2"))
        .result(format!("Scaled Scores{} Matrix", h))
        .input(format!("Q{} (5×2)", h), s("calc-q"))
        .input(format!("K{}^T (2×5)", h), s("k-transpose"))
        .hint(format!(
            "Multiply Q{h} by K{h}^T, then divide every value by √2 ≈ 1.4142."
        )),
        StepDecl::manual(
            StepId::head("calc-softmax", h),
            s("calc-scores").softmax_rows().matmul(s("calc-v")),
        )
        .title(format!("Softmax Attention (Head {})", h))
        .description(format!(
            "Apply softmax to the scores of head {} and weight its values.",
            h
        ))
        .formula(format!("Attention{h} = softmax(Scores{h}) × V{h}"))
        .result(format!("Head{} Output Matrix", h))
        .input(format!("Scores{} (5×5)", h), s("calc-scores"))
        .input(format!("V{} (5×2)", h), s("calc-v"))
        .hint(format!(
            "Apply softmax row-wise to Scores{h}, then multiply the result by V{h}."
        )),
    ]
}

pub fn spec() -> LessonSpec {
    let scale = (HEAD_DIM as f64).sqrt();

    let mut constants = vec![("input".to_string(), input()), ("wo".to_string(), wo())];
    for h in 1..=HEADS {
        constants.push((format!("wq-head{}", h), head_weight(h, 10.0)));
        constants.push((format!("wk-head{}", h), head_weight(h, 2.0)));
        constants.push((format!("wv-head{}", h), head_weight(h, 1.0)));
    }

    let mut steps = vec![StepDecl::auto(StepId::new("input"), Expr::constant("input"))
        .title("Input Matrix")
        .description("Starting input embeddings (5×6).")
        .formula("Input = X")
        .result("Input Matrix")
        .hint("This matrix is given. Just observe the values.")];

    for h in 1..=HEADS {
        steps.extend(head_steps(h, scale));
    }

    let heads: Vec<Expr> = (1..=HEADS)
        .map(|h| Expr::head_step("calc-softmax", h))
        .collect();

    let mut concat = StepDecl::manual(
        StepId::new("concat-matrix"),
        Expr::ConcatHorizontal(heads.clone()),
    )
    .title("Concatenate Heads")
    .description("Place the three head outputs side by side.")
    .formula("Concat = [Head₁ | Head₂ | Head₃]")
    .result("Concatenated Matrix")
    .hint(
        "Row i of the result is row i of Head₁, then Head₂, then Head₃: \
         5×2 + 5×2 + 5×2 → 5×6.",
    );
    for (h, head) in heads.into_iter().enumerate() {
        concat = concat.input(format!("Head{} Output (5×2)", h + 1), head);
    }
    steps.push(concat);

    steps.push(
        StepDecl::manual(
            StepId::new("calc-output"),
            Expr::step("concat-matrix").matmul(Expr::constant("wo")),
        )
        .title("Multi-Head Output")
        .description("Project the concatenated heads with the output weights.")
        .formula("Output = Concat(Head₁, Head₂, Head₃) × Wo")
        .result("Final Output Matrix")
        .input("Concat (5×6)", Expr::step("concat-matrix"))
        .input("Wo (6×6)", Expr::constant("wo"))
        .hint(
            "Multiply the 5×6 concatenation by Wo (6×6). \
             Wo is the identity, so nothing changes.",
        ),
    );

    LessonSpec {
        kind: LessonKind::MultiHeadAttention,
        title: "Multi-Head Attention".to_string(),
        constants,
        steps,
        seed: vec![StepId::new("input")],
        intro: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_weight_layout() {
        let w = head_weight(2, 10.0);
        assert_eq!(w.shape(), (6, 2));
        assert_eq!(w[(2, 0)], 10.0);
        assert_eq!(w[(3, 1)], 10.0);
        assert_eq!(w.data().iter().sum::<f64>(), 20.0);
    }

    #[test]
    #[should_panic]
    fn test_head_weight_rejects_head_zero() {
        head_weight(0, 1.0);
    }

    #[test]
    fn test_step_count() {
        // input + 6 per head + concat + output
        assert_eq!(spec().steps.len(), 1 + 6 * HEADS + 2);
    }
}
