//! Word2Vec: One CBOW Training Step
//!
//! Continuous bag-of-words predicts a target word from the average of its
//! context words' embeddings. The sentence is "the cat sat on the mat", the
//! target is `sat` and its context is `cat` and `on`.
//!
//! ## Forward Pass
//!
//! ```text
//! X  = [onehot(cat); onehot(on)]      2×5
//! h  = mean_rows(X · W1)              1×3   average of the two embeddings
//! z  = h · W2                         1×5   one logit per vocabulary word
//! ŷ  = softmax(z)                     1×5
//! L  = −Σ y·log(ŷ)                    1×1
//! ```
//!
//! ## Backward Pass and Update
//!
//! ```text
//! dz  = ŷ − y                         1×5
//! dW2 = hᵀ · dz                       3×5
//! dh  = dz · W2ᵀ                      1×3
//! dW1 = x̄ᵀ · dh,  x̄ = mean_rows(X)    5×3   only context rows are non-zero
//! W1' = W1 − η·dW1,  W2' = W2 − η·dW2,  η = 0.1
//! ```
//!
//! The update is applied once so the learner can see which weights move.
//! There is no training loop.

use crate::graph::{Expr, StepDecl, StepId};
use crate::lesson::LessonSpec;
use crate::lessons::LessonKind;
use crate::matrix::Matrix;

pub const VOCABULARY: [&str; 5] = ["the", "cat", "sat", "on", "mat"];
pub const SENTENCE: &str = "the cat sat on the mat";
pub const TARGET: &str = "sat";
pub const CONTEXT: [&str; 2] = ["cat", "on"];
pub const LEARNING_RATE: f64 = 0.1;

/// Position of `word` in [`VOCABULARY`]
pub fn word_index(word: &str) -> Option<usize> {
    VOCABULARY.iter().position(|w| *w == word)
}

/// One-hot row for a vocabulary word
pub fn one_hot(word: &str) -> Option<Matrix> {
    word_index(word).map(|i| Matrix::one_hot(i, VOCABULARY.len()))
}

/// Input embeddings, one row per vocabulary word
pub fn w1() -> Matrix {
    Matrix::from_array([
        [0.2, 0.1, 0.0],
        [0.5, 0.3, 0.1],
        [0.1, 0.4, 0.6],
        [0.3, 0.1, 0.5],
        [0.0, 0.2, 0.4],
    ])
}

/// Output embeddings, one column per vocabulary word
pub fn w2() -> Matrix {
    Matrix::from_array([
        [0.1, 0.4, 0.6, 0.2, 0.0],
        [0.3, 0.2, 0.5, 0.1, 0.4],
        [0.0, 0.1, 0.7, 0.3, 0.2],
    ])
}

/// Word with the highest predicted probability
pub fn predicted_word(y_pred: &Matrix) -> Option<&'static str> {
    y_pred
        .argmax_rows()
        .first()
        .and_then(|&i| VOCABULARY.get(i).copied())
}

fn s(name: &str) -> Expr {
    Expr::step(name)
}

pub fn spec() -> LessonSpec {
    let mut constants = vec![
        ("w1".to_string(), w1()),
        ("w2".to_string(), w2()),
    ];
    for word in CONTEXT.iter().chain([&TARGET]) {
        if let Some(m) = one_hot(word) {
            constants.push((format!("onehot-{}", word), m));
        }
    }

    let steps = vec![
        StepDecl::auto(StepId::new("context-cat"), Expr::constant("onehot-cat"))
            .title("Context Word: cat")
            .description(format!("One-hot vector for \"cat\" in \"{}\".", SENTENCE))
            .formula("x_cat = onehot(cat)")
            .result("x_cat")
            .hint("Given."),
        StepDecl::auto(StepId::new("context-on"), Expr::constant("onehot-on"))
            .title("Context Word: on")
            .description(format!("One-hot vector for \"on\" in \"{}\".", SENTENCE))
            .formula("x_on = onehot(on)")
            .result("x_on")
            .hint("Given."),
        StepDecl::auto(StepId::new("w1-matrix"), Expr::constant("w1"))
            .title("Input Embeddings W1")
            .description("One 3-dimensional embedding per vocabulary word.")
            .formula("W1")
            .result("W1")
            .hint("Given."),
        StepDecl::auto(StepId::new("w2-matrix"), Expr::constant("w2"))
            .title("Output Embeddings W2")
            .description("One column of output weights per vocabulary word.")
            .formula("W2")
            .result("W2")
            .hint("Given."),
        StepDecl::auto(StepId::new("y-true"), Expr::constant("onehot-sat"))
            .title("Target Word: sat")
            .description("The word the model should predict.")
            .formula("y = onehot(sat)")
            .result("y")
            .hint("Given."),
        // Forward
        StepDecl::manual(
            StepId::new("calc-x"),
            Expr::ConcatVertical(vec![s("context-cat"), s("context-on")]),
        )
        .title("Context Matrix X")
        .description("Stack the context one-hot vectors.")
        .formula("X = [x_cat; x_on]")
        .result("X")
        .input("x_cat (1×5)", s("context-cat"))
        .input("x_on (1×5)", s("context-on"))
        .hint("Put the one-hot vector for \"cat\" on the first row and \"on\" on the second."),
        StepDecl::manual(
            StepId::new("calc-h"),
            s("calc-x").matmul(s("w1-matrix")).mean_rows(),
        )
        .title("Hidden Layer h")
        .description("Look up both context embeddings and average them.")
        .formula("h = mean(X · W1)")
        .result("h")
        .input("X (2×5)", s("calc-x"))
        .input("W1 (5×3)", s("w1-matrix"))
        .hint("X · W1 picks rows 2 and 4 of W1. Average them column by column."),
        StepDecl::manual(StepId::new("calc-z"), s("calc-h").matmul(s("w2-matrix")))
            .title("Output Scores z")
            .description("Score every vocabulary word against the hidden vector.")
            .formula("z = h · W2")
            .result("z")
            .input("h (1×3)", s("calc-h"))
            .input("W2 (3×5)", s("w2-matrix"))
            .hint("Multiply h (1×3) with W2 (3×5), one dot product per word."),
        StepDecl::auto(StepId::new("activate-y-pred"), s("calc-z").softmax_rows())
            .title("Prediction ŷ")
            .description("Turn scores into probabilities over the vocabulary.")
            .formula("ŷ = softmax(z)")
            .result("ŷ")
            .input("z (1×5)", s("calc-z"))
            .hint("exp(z_i) / Σ exp(z_j). The largest entry is the predicted word."),
        StepDecl::manual(
            StepId::new("calc-loss"),
            s("activate-y-pred").cross_entropy(s("y-true")),
        )
        .title("Cross-Entropy Loss")
        .description("How surprised the model is by the true target.")
        .formula("L = −Σ y · log(ŷ)")
        .result("Loss")
        .input("ŷ (1×5)", s("activate-y-pred"))
        .input("y (1×5)", s("y-true"))
        .hint("Only the \"sat\" entry of y is 1, so L = −log(ŷ_sat)."),
        // Backward
        StepDecl::manual(StepId::new("calc-dz"), s("activate-y-pred").minus(s("y-true")))
            .title("Gradient dz")
            .description("Error at the output scores.")
            .formula("dz = ŷ − y")
            .result("dz")
            .input("ŷ (1×5)", s("activate-y-pred"))
            .input("y (1×5)", s("y-true"))
            .hint("Subtract the one-hot target from the prediction."),
        StepDecl::manual(StepId::new("calc-dw2"), s("calc-h").t().matmul(s("calc-dz")))
            .title("Gradient dW2")
            .description("Gradient of the output embeddings.")
            .formula("dW2 = hᵀ · dz")
            .result("dW2")
            .input("hᵀ (3×1)", s("calc-h").t())
            .input("dz (1×5)", s("calc-dz"))
            .hint("An outer product: entry (i, j) is h_i × dz_j."),
        StepDecl::manual(StepId::new("calc-dh"), s("calc-dz").matmul(s("w2-matrix").t()))
            .title("Gradient dh")
            .description("Error sent back to the hidden layer.")
            .formula("dh = dz · W2ᵀ")
            .result("dh")
            .input("dz (1×5)", s("calc-dz"))
            .input("W2ᵀ (5×3)", s("w2-matrix").t())
            .hint("Multiply dz (1×5) with the transpose of W2 (5×3)."),
        StepDecl::manual(
            StepId::new("calc-dw1"),
            s("calc-x").mean_rows().t().matmul(s("calc-dh")),
        )
        .title("Gradient dW1")
        .description("Gradient of the input embeddings.")
        .formula("dW1 = mean(X)ᵀ · dh")
        .result("dW1")
        .input("mean(X)ᵀ (5×1)", s("calc-x").mean_rows().t())
        .input("dh (1×3)", s("calc-dh"))
        .hint(
            "Each context word received half of h, so its row gets 0.5 × dh. \
             Rows of words outside the context stay 0.",
        ),
        StepDecl::manual(
            StepId::new("w1-new"),
            s("w1-matrix").minus(s("calc-dw1").scale(LEARNING_RATE)),
        )
        .title("Updated W1")
        .description("One gradient-descent step on the input embeddings.")
        .formula("W1' = W1 − 0.1 · dW1")
        .result("W1'")
        .input("W1 (5×3)", s("w1-matrix"))
        .input("dW1 (5×3)", s("calc-dw1"))
        .hint("Only the rows for \"cat\" and \"on\" change."),
        StepDecl::manual(
            StepId::new("w2-new"),
            s("w2-matrix").minus(s("calc-dw2").scale(LEARNING_RATE)),
        )
        .title("Updated W2")
        .description("One gradient-descent step on the output embeddings.")
        .formula("W2' = W2 − 0.1 · dW2")
        .result("W2'")
        .input("W2 (3×5)", s("w2-matrix"))
        .input("dW2 (3×5)", s("calc-dw2"))
        .hint("Subtract 0.1 × dW2 from every entry of W2. The \"sat\" column grows."),
    ];

    LessonSpec {
        kind: LessonKind::Word2Vec,
        title: "Word2Vec (CBOW)".to_string(),
        constants,
        steps,
        seed: ["context-cat", "context-on", "w1-matrix", "w2-matrix", "y-true"]
            .into_iter()
            .map(StepId::new)
            .collect(),
        intro: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_lookup() {
        assert_eq!(word_index("sat"), Some(2));
        assert_eq!(word_index("dog"), None);
        assert_eq!(one_hot("on").unwrap().row(0), &[0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_constants_cover_context_and_target() {
        let names: Vec<String> = spec().constants.into_iter().map(|(n, _)| n).collect();
        for word in ["onehot-cat", "onehot-on", "onehot-sat"] {
            assert!(names.iter().any(|n| n == word), "missing {}", word);
        }
    }

    #[test]
    fn test_predicted_word() {
        let y = Matrix::from_array([[0.1, 0.2, 0.4, 0.2, 0.1]]);
        assert_eq!(predicted_word(&y), Some("sat"));
    }
}
