//! Single-Head Self-Attention
//!
//! The classic scaled dot-product attention, small enough to do on paper.
//!
//! ## Computation
//!
//! ```text
//! Q      = Input × Wq                 (5×8)(8×4) → 5×4
//! K      = Input × Wk
//! V      = Input × Wv
//! K^T    = transpose(K)               4×5
//! Scores = (Q × K^T) / √d_k           5×5, √d_k = √4 = 2
//! Attn   = softmax(Scores)            row-wise
//! Output = Attn × V                   5×4
//! ```
//!
//! ## Constants
//!
//! The input is a one-hot encoding of "The next day is bright". The weights
//! put the first three tokens in one group and the last two in another, so
//! each token attends evenly to the members of its own group:
//!
//! - `Wq` maps group members to 10 in column 0 or 1
//! - `Wk` does the same with 2, giving scaled scores of 10 within a group
//! - `Wv` is close to an identity, so the output mixes token identities

use crate::graph::{Expr, StepDecl, StepGuide, StepId};
use crate::lesson::LessonSpec;
use crate::lessons::LessonKind;
use crate::matrix::Matrix;

/// Tokens of the input sentence, one per input row
pub const TOKENS: [&str; 5] = ["The", "next", "day", "is", "bright"];

/// One-hot rows over an 8-wide vocabulary
pub fn input() -> Matrix {
    let rows: Vec<Matrix> = (0..TOKENS.len()).map(|i| Matrix::one_hot(i, 8)).collect();
    Matrix::concat_vertical(&rows.iter().collect::<Vec<_>>())
}

pub fn wq() -> Matrix {
    Matrix::from_array([
        [10.0, 0.0, 0.0, 0.0],
        [10.0, 0.0, 0.0, 0.0],
        [10.0, 0.0, 0.0, 0.0],
        [0.0, 10.0, 0.0, 0.0],
        [0.0, 10.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
    ])
}

pub fn wk() -> Matrix {
    wq().div_scalar(5.0)
}

pub fn wv() -> Matrix {
    Matrix::from_array([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
        [0.0, 0.0, 0.0, 1.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 0.0],
    ])
}

/// Teaching text for the input matrix, shown before the first step
fn intro() -> StepGuide {
    StepGuide::new(
        "Step 1",
        "The input matrix X represents token embeddings for a sequence of words. \
         Each row is a one-hot encoded vector representing a word from the sequence: \
         'The next day is bright'.",
    )
    .importance(
        "Input embeddings are the foundation of the self-attention mechanism. \
         They represent the initial state of each token before contextualization.",
    )
    .example(
        "X = [x₁, x₂, x₃, x₄, x₅]ᵀ where each x is a one-hot encoded vector\n\
         For example, x₁ = [1, 0, 0, 0, 0, 0, 0, 0] representing 'The'",
    )
    .tip("Each row represents a token (word) from the input sequence.")
    .tip("In practice, these would be dense word embeddings, not one-hot vectors.")
    .tip("We're using simplified embeddings for educational purposes.")
}

pub fn spec() -> LessonSpec {
    let wk = wk();
    let scale = (wk.cols() as f64).sqrt();

    let constants = vec![
        ("input".to_string(), input()),
        ("wq".to_string(), wq()),
        ("wk".to_string(), wk),
        ("wv".to_string(), wv()),
    ];

    let input = || Expr::constant("input");

    let steps = vec![
        StepDecl::manual(StepId::new("calc-q"), input().matmul(Expr::constant("wq")))
            .title("Query Matrix (Q)")
            .description("Multiply the input embeddings by the query weights Wq.")
            .formula("Q = Input × Wq")
            .result("Query Matrix")
            .input("Input (5×8)", input())
            .input("Wq (8×4)", Expr::constant("wq"))
            .hint(
                "Multiply each row of Input (5×8) with each column of Wq (8×4). \
                 For Q₁₁: (1×10) + (0×10) + (0×10) + (0×0) + (0×0) + (0×0) \
                 + (0×0) + (0×0) = 10",
            )
            .guide(
                StepGuide::new(
                    "Step 2",
                    "The Query (Q) matrix is produced by multiplying the Input embeddings (X) \
                     with a learned weight matrix Wq. Queries represent 'what information is \
                     this token looking for?' from other tokens.",
                )
                .importance(
                    "Queries determine what kind of information each token is searching for \
                     in other tokens. They are used to find relevant content in the sequence \
                     for each position.",
                )
                .example(
                    "Q = X × Wq\n\
                     To calculate Q₁₁ (first cell of Q):\n\
                     (1×10) + (0×10) + (0×10) + (0×0) + (0×0) + (0×0) + (0×0) + (0×0) = 10\n\
                     Resulting shape: (5, 4)",
                )
                .tip("Queries search for relevant information in other tokens.")
                .tip("Each token generates its own query vector.")
                .tip("Dimensions must align for matrix multiplication (Input.cols == Wq.rows)."),
            ),
        StepDecl::manual(StepId::new("calc-k"), input().matmul(Expr::constant("wk")))
            .title("Key Matrix (K)")
            .description("Multiply the input embeddings by the key weights Wk.")
            .formula("K = Input × Wk")
            .result("Key Matrix")
            .input("Input (5×8)", input())
            .input("Wk (8×4)", Expr::constant("wk"))
            .hint(
                "Same as Q but with Wk. For K₁₁: (1×2) + (0×2) + (0×2) + (0×0) \
                 + (0×0) + (0×0) + (0×0) + (0×0) = 2",
            )
            .guide(
                StepGuide::new(
                    "Step 3",
                    "The Key (K) matrix is created by multiplying the Input embeddings (X) \
                     with a learned weight matrix Wk. Keys represent 'what information does \
                     this token contain?' for other tokens to find and attend to.",
                )
                .importance(
                    "Keys are like labels or summaries of information available at each \
                     position. They are compared against queries to compute raw attention \
                     scores.",
                )
                .example(
                    "K = X × Wk\n\
                     To calculate K₁₁ (first cell of K):\n\
                     (1×2) + (0×2) + (0×2) + (0×0) + (0×0) + (0×0) + (0×0) + (0×0) = 2\n\
                     Resulting shape: (5, 4)",
                )
                .tip("Keys describe the content available at each token position.")
                .tip("Used to calculate compatibility with Query vectors.")
                .tip("Same matrix multiplication process as Q, but with different weights."),
            ),
        StepDecl::manual(StepId::new("calc-v"), input().matmul(Expr::constant("wv")))
            .title("Value Matrix (V)")
            .description("Multiply the input embeddings by the value weights Wv.")
            .formula("V = Input × Wv")
            .result("Value Matrix")
            .input("Input (5×8)", input())
            .input("Wv (8×4)", Expr::constant("wv"))
            .hint("Use Wv this time. For V₁₁: (1×1) + 0 + 0 + 0 + 0 + 0 + 0 + 0 = 1")
            .guide(
                StepGuide::new(
                    "Step 4",
                    "The Value (V) matrix is produced by multiplying the Input embeddings (X) \
                     with a learned weight matrix Wv. Values contain the actual content or \
                     information that will be combined and passed forward based on the \
                     attention weights.",
                )
                .importance(
                    "Values are the actual 'payload' of information that gets aggregated. \
                     The attention mechanism determines how much of each value vector \
                     contributes to the final output for every token.",
                )
                .example(
                    "V = X × Wv\n\
                     To calculate V₁₁ (first cell of V):\n\
                     (1×1) + (0×0) + (0×0) + (0×0) + (0×0) + (0×0) + (0×0) + (0×0) = 1\n\
                     Resulting shape: (5, 4)",
                )
                .tip("Values hold the rich information content.")
                .tip("They are weighted by the attention scores.")
                .tip("The final output is a weighted sum of these value vectors."),
            ),
        // Folded into the scores step in the written walkthrough, so no guide
        StepDecl::manual(StepId::new("calc-kt"), Expr::step("calc-k").t())
            .title("Transposed Keys (K^T)")
            .description("Flip K so that its rows become columns.")
            .formula("K^T = transpose(K)")
            .result("K^T")
            .input("K (5×4)", Expr::step("calc-k"))
            .hint("Row i of K becomes column i of K^T. A 5×4 matrix turns into 4×5."),
        StepDecl::manual(
            StepId::new("calc-scores"),
            Expr::step("calc-q")
                .matmul(Expr::step("calc-kt"))
                .div_scalar(scale),
        )
        .title("Attention Scores (Scaled)")
        .description(
            "Compute raw scores Q × K^T, then divide every value by the scaling factor √d_k = 2.",
        )
        .formula("Scores = (Q × K^T) / 2.0")
        .result("Scaled Scores Matrix")
        .input("Q (5×4)", Expr::step("calc-q"))
        .input("K^T (4×5)", Expr::step("calc-kt"))
        .hint(
            "Multiply Q (5×4) by K^T (4×5) to get a 5×5 matrix of raw scores, \
             then divide each value by 2.0.",
        )
        .guide(
            StepGuide::new(
                "Step 5",
                "Attention scores are calculated by multiplying the Query (Q) matrix with the \
                 transpose of the Key (K^T) matrix. These raw scores are then divided by the \
                 square root of the key dimension (√d_k), which is 2.0, for numerical \
                 stability.",
            )
            .importance(
                "Attention scores measure the compatibility between each Query and every Key. \
                 These scores determine how much attention each token pays to every other \
                 token in the sequence. Scaling prevents values from becoming too large \
                 during training, leading to more stable gradients.",
            )
            .example(
                "Scores = (Q × K^T) / √d_k\n\
                 Q × K^T gives us raw compatibility scores between tokens.\n\
                 Dividing by √d_k (which is 2.0) scales the values appropriately.\n\
                 Resulting shape: (5, 5), where each cell (i,j) represents how much \
                 token i attends to token j.",
            )
            .tip("Scores show how relevant each token is to every other token.")
            .tip("K is transposed (K^T shape: 4×5) to enable matrix multiplication with Q.")
            .tip("Scaling stabilizes training by normalizing the variance of scores.")
            .tip("Each cell represents one token's query interacting with another token's key."),
        ),
        StepDecl::manual(
            StepId::new("calc-softmax"),
            Expr::step("calc-scores").softmax_rows(),
        )
        .title("Softmax Attention Weights")
        .description("Apply softmax to each row of the scaled scores.")
        .formula("Attention = softmax(Scores)")
        .result("Attention Matrix")
        .input("Scaled Scores (5×5)", Expr::step("calc-scores"))
        .hint(
            "For each row: exp(value) / sum(exp(row)). Every row sums to 1. \
             Scores of 10 dominate the sum, so exp(0) terms are close to zero.",
        )
        .guide(
            StepGuide::new(
                "Step 6",
                "The softmax function is applied row-wise to the Scaled Attention Scores. \
                 This transforms the scores into a probability distribution, ensuring that \
                 the attention weights for each query sum to 1.",
            )
            .importance(
                "Softmax normalizes the scores, making them interpretable as true \
                 probabilities. It highlights the most relevant connections (assigning higher \
                 probabilities) while effectively reducing the impact of less relevant ones \
                 (assigning probabilities close to zero). This process is essential for \
                 creating a meaningful weighted average of the value vectors.",
            )
            .example(
                "Attention = softmax(Scaled Scores)\n\
                 For a token with scores [5, 0, 0, 0, 0]:\n\
                 softmax converts to: [0.9933, 0.0017, 0.0017, 0.0017, 0.0017]\n\
                 This means the token primarily attends to itself (99.33%), with minimal \
                 attention to other tokens.\n\
                 Resulting shape: (5, 5)",
            )
            .tip("softmax(x) = exp(x) / Σexp(x) for each row")
            .tip("Each row sums to 1.0, creating a proper probability distribution.")
            .tip("Higher scores dominate the attention (winner-takes-most).")
            .tip(
                "This step determines how much each value vector contributes to the final \
                 output.",
            ),
        ),
        StepDecl::manual(
            StepId::new("calc-output"),
            Expr::step("calc-softmax").matmul(Expr::step("calc-v")),
        )
        .title("Final Output")
        .description("Weight the value vectors by the attention matrix.")
        .formula("Output = Attention × V")
        .result("Output Matrix")
        .input("Attention (5×5)", Expr::step("calc-softmax"))
        .input("V (5×4)", Expr::step("calc-v"))
        .hint(
            "Each output row is a weighted sum of the rows of V, using the matching \
             attention row as weights. Output₁₁ ≈ 0.3333×V₁₁ + 0.3333×V₂₁ + 0.3333×V₃₁.",
        )
        .guide(
            StepGuide::new(
                "Step 7",
                "The final Output matrix is computed by multiplying the Attention (softmax \
                 probabilities) matrix with the Value (V) matrix. This operation combines the \
                 value vectors based on the attention weights, resulting in a new \
                 representation for each token that incorporates information from other \
                 relevant tokens.",
            )
            .importance(
                "This is the culmination of the self-attention mechanism! The Output matrix \
                 represents a contextually enriched version of the input. Each token's new \
                 representation is a weighted blend of all original value vectors, allowing \
                 the model to focus on important parts of the input sequence for each token.",
            )
            .example(
                "Output = Attention × V\n\
                 For the first token, if it primarily attends to itself and 'next':\n\
                 Output₁ = (0.8 × V₁) + (0.2 × V₂) + (0 × V₃) + (0 × V₄) + (0 × V₅)\n\
                 Resulting shape: (5, 4), where each row is a contextualized \
                 representation of the corresponding input token.",
            )
            .tip("Output captures contextualized representations of each token.")
            .tip("Information flows between tokens based on attention weights.")
            .tip("The network can learn specialized attention patterns through training.")
            .tip(
                "In practice, this is followed by a feed-forward network and layer \
                 normalization.",
            ),
        ),
    ];

    LessonSpec {
        kind: LessonKind::SelfAttention,
        title: "Self-Attention".to_string(),
        constants,
        steps,
        seed: Vec::new(),
        intro: Some(intro()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_one_hot() {
        let x = input();
        assert_eq!(x.shape(), (5, 8));
        for i in 0..5 {
            assert_eq!(x.row(i).iter().sum::<f64>(), 1.0);
            assert_eq!(x[(i, i)], 1.0);
        }
    }

    #[test]
    fn test_wk_is_scaled_wq() {
        assert_eq!(wk()[(0, 0)], 2.0);
        assert_eq!(wk()[(3, 1)], 2.0);
        assert_eq!(wk()[(5, 0)], 0.0);
    }

    #[test]
    fn test_guides_are_numbered_in_order() {
        let spec = spec();
        let numbers: Vec<String> = spec
            .steps
            .iter()
            .filter_map(|s| s.guide.as_ref().map(|g| g.step_number.clone()))
            .collect();
        assert_eq!(
            numbers,
            ["Step 2", "Step 3", "Step 4", "Step 5", "Step 6", "Step 7"]
        );
        assert_eq!(spec.intro.unwrap().step_number, "Step 1");
    }

    #[test]
    fn test_every_step_is_manual() {
        let spec = spec();
        assert_eq!(spec.steps.len(), 7);
        assert!(spec.seed.is_empty());
        assert!(spec
            .steps
            .iter()
            .all(|s| s.grading == crate::graph::Grading::Manual));
    }
}
