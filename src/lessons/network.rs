//! Feed-Forward Network with Backpropagation
//!
//! A 2→4→4→2 network: two ReLU hidden layers, a softmax output and
//! cross-entropy loss, followed by the full backward pass.
//!
//! ## Forward Pass
//!
//! ```text
//! Z¹ = A⁰·W¹ + b¹      A¹ = ReLU(Z¹)        1×4
//! Z² = A¹·W² + b²      A² = ReLU(Z²)        1×4
//! Z³ = A²·W³ + b³      A³ = Softmax(Z³)     1×2
//! L  = −Σ Y·log(A³)                          1×1
//! ```
//!
//! ## Backward Pass
//!
//! Softmax followed by cross-entropy has the simple output gradient
//! `dZ³ = A³ − Y`. Every earlier layer repeats the same three rules:
//!
//! ```text
//! dW^l = A^(l−1)ᵀ · dZ^l
//! db^l = dZ^l
//! dZ^(l−1) = (dZ^l · W^lᵀ) ⊙ ReLU'(Z^(l−1))
//! ```
//!
//! ## Grading
//!
//! The three activation steps are auto-graded: once their pre-activation is
//! solved they are simply displayed. The input is a display step completed
//! from the start.

use crate::graph::{Expr, StepDecl, StepId};
use crate::lesson::LessonSpec;
use crate::lessons::LessonKind;
use crate::matrix::Matrix;

pub fn input() -> Matrix {
    Matrix::from_array([[0.5, -0.2]])
}

pub fn y_true() -> Matrix {
    Matrix::from_array([[0.0, 1.0]])
}

pub fn w1() -> Matrix {
    Matrix::from_array([[0.1, 0.4, -0.2, 0.7], [0.3, -0.5, 0.6, -0.1]])
}

pub fn b1() -> Matrix {
    Matrix::from_array([[0.1, 0.2, 0.1, -0.3]])
}

pub fn w2() -> Matrix {
    Matrix::from_array([
        [0.4, -0.2, 0.1, 0.5],
        [-0.1, 0.3, -0.5, 0.2],
        [0.7, -0.3, 0.2, -0.1],
        [0.2, 0.6, -0.4, 0.3],
    ])
}

pub fn b2() -> Matrix {
    Matrix::from_array([[-0.2, 0.1, 0.3, -0.1]])
}

pub fn w3() -> Matrix {
    Matrix::from_array([[0.2, -0.1], [-0.3, 0.5], [0.6, -0.2], [-0.1, 0.4]])
}

pub fn b3() -> Matrix {
    Matrix::from_array([[0.1, -0.2]])
}

fn c(name: &str) -> Expr {
    Expr::constant(name)
}

fn s(name: &str) -> Expr {
    Expr::step(name)
}

/// `Z = A·W + b`
fn affine(prev: &str, w: &str, b: &str) -> Expr {
    s(prev).matmul(c(w)).plus(c(b))
}

/// `dZ_prev = (dZ · Wᵀ) ⊙ ReLU'(Z_prev)`
fn backprop_relu(dz: &str, w: &str, z_prev: &str) -> Expr {
    s(dz).matmul(c(w).t()).hadamard(s(z_prev).relu_derivative())
}

pub fn spec() -> LessonSpec {
    let constants = vec![
        ("input".to_string(), input()),
        ("y-true".to_string(), y_true()),
        ("w1".to_string(), w1()),
        ("b1".to_string(), b1()),
        ("w2".to_string(), w2()),
        ("b2".to_string(), b2()),
        ("w3".to_string(), w3()),
        ("b3".to_string(), b3()),
    ];

    let steps = vec![
        StepDecl::auto(StepId::new("input"), c("input"))
            .title("Input (A⁰)")
            .description("The 1×2 input vector.")
            .formula("A⁰ = X")
            .result("A⁰")
            .hint("Given. Nothing to compute."),
        // Forward
        StepDecl::manual(StepId::new("calc-z1"), affine("input", "w1", "b1"))
            .title("Calculate Z¹")
            .description("First layer pre-activation")
            .formula("Z¹ = A⁰·W¹ + b¹")
            .result("Z¹")
            .input("A⁰ (1×2)", s("input"))
            .input("W¹ (2×4)", c("w1"))
            .input("b¹ (1×4)", c("b1"))
            .hint("Multiply the input (1×2) with W¹ (2×4) and add b¹ (1×4)."),
        StepDecl::auto(StepId::new("activate-a1"), s("calc-z1").relu())
            .title("Activate A¹")
            .description("First layer activation")
            .formula("A¹ = ReLU(Z¹)")
            .result("A¹")
            .input("Z¹ (1×4)", s("calc-z1"))
            .hint("Apply ReLU to Z¹: max(0, value) for each element."),
        StepDecl::manual(StepId::new("calc-z2"), affine("activate-a1", "w2", "b2"))
            .title("Calculate Z²")
            .description("Second layer pre-activation")
            .formula("Z² = A¹·W² + b²")
            .result("Z²")
            .input("A¹ (1×4)", s("activate-a1"))
            .input("W² (4×4)", c("w2"))
            .input("b² (1×4)", c("b2"))
            .hint("Multiply A¹ (1×4) with W² (4×4) and add b² (1×4)."),
        StepDecl::auto(StepId::new("activate-a2"), s("calc-z2").relu())
            .title("Activate A²")
            .description("Second layer activation")
            .formula("A² = ReLU(Z²)")
            .result("A²")
            .input("Z² (1×4)", s("calc-z2"))
            .hint("Apply ReLU to Z²: max(0, value) for each element."),
        StepDecl::manual(StepId::new("calc-z3"), affine("activate-a2", "w3", "b3"))
            .title("Calculate Z³")
            .description("Output layer pre-activation")
            .formula("Z³ = A²·W³ + b³")
            .result("Z³")
            .input("A² (1×4)", s("activate-a2"))
            .input("W³ (4×2)", c("w3"))
            .input("b³ (1×2)", c("b3"))
            .hint("Multiply A² (1×4) with W³ (4×2) and add b³ (1×2)."),
        StepDecl::auto(StepId::new("activate-a3"), s("calc-z3").softmax_rows())
            .title("Activate A³ (Output)")
            .description("Output layer activation")
            .formula("A³ = Softmax(Z³)")
            .result("A³")
            .input("Z³ (1×2)", s("calc-z3"))
            .hint("exp(value) / sum(exp(values)) for each element of Z³."),
        StepDecl::manual(
            StepId::new("calc-loss"),
            s("activate-a3").cross_entropy(c("y-true")),
        )
        .title("Calculate Loss")
        .description("Cross-entropy loss")
        .formula("Loss = −Σ(Y·log(A³))")
        .result("Loss")
        .input("A³ (1×2)", s("activate-a3"))
        .input("Y (1×2)", c("y-true"))
        .hint("−sum(true_label × log(predicted)). Only the correct class contributes."),
        // Backward
        StepDecl::manual(StepId::new("calc-dz3"), s("activate-a3").minus(c("y-true")))
            .title("Gradient dZ³")
            .description("Output layer error")
            .formula("dZ³ = A³ − Y")
            .result("dZ³")
            .input("A³ (1×2)", s("activate-a3"))
            .input("Y (1×2)", c("y-true"))
            .hint("Subtract the true labels from the predictions."),
        StepDecl::manual(
            StepId::new("calc-dw3"),
            s("activate-a2").t().matmul(s("calc-dz3")),
        )
        .title("Gradient dW³")
        .description("Output layer weight gradients")
        .formula("dW³ = A²ᵀ·dZ³")
        .result("dW³")
        .input("A²ᵀ (4×1)", s("activate-a2").t())
        .input("dZ³ (1×2)", s("calc-dz3"))
        .hint("Multiply the transpose of A² (4×1) with dZ³ (1×2)."),
        StepDecl::manual(StepId::new("calc-db3"), s("calc-dz3"))
            .title("Gradient db³")
            .description("Output layer bias gradients")
            .formula("db³ = dZ³")
            .result("db³")
            .input("dZ³ (1×2)", s("calc-dz3"))
            .hint("The gradient of the bias is just dZ³."),
        StepDecl::manual(
            StepId::new("calc-dz2"),
            backprop_relu("calc-dz3", "w3", "calc-z2"),
        )
        .title("Gradient dZ²")
        .description("Second layer error")
        .formula("dZ² = (dZ³·W³ᵀ) ⊙ ReLU'(Z²)")
        .result("dZ²")
        .input("dZ³ (1×2)", s("calc-dz3"))
        .input("W³ᵀ (2×4)", c("w3").t())
        .input("Z² (1×4)", s("calc-z2"))
        .hint(
            "Multiply dZ³ (1×2) with W³ᵀ (2×4), then multiply element-wise by \
             ReLU'(Z²): 1 where Z² > 0, otherwise 0.",
        ),
        StepDecl::manual(
            StepId::new("calc-dw2"),
            s("activate-a1").t().matmul(s("calc-dz2")),
        )
        .title("Gradient dW²")
        .description("Second layer weight gradients")
        .formula("dW² = A¹ᵀ·dZ²")
        .result("dW²")
        .input("A¹ᵀ (4×1)", s("activate-a1").t())
        .input("dZ² (1×4)", s("calc-dz2"))
        .hint("Multiply the transpose of A¹ (4×1) with dZ² (1×4)."),
        StepDecl::manual(StepId::new("calc-db2"), s("calc-dz2"))
            .title("Gradient db²")
            .description("Second layer bias gradients")
            .formula("db² = dZ²")
            .result("db²")
            .input("dZ² (1×4)", s("calc-dz2"))
            .hint("The gradient of the bias is just dZ²."),
        StepDecl::manual(
            StepId::new("calc-dz1"),
            backprop_relu("calc-dz2", "w2", "calc-z1"),
        )
        .title("Gradient dZ¹")
        .description("First layer error")
        .formula("dZ¹ = (dZ²·W²ᵀ) ⊙ ReLU'(Z¹)")
        .result("dZ¹")
        .input("dZ² (1×4)", s("calc-dz2"))
        .input("W²ᵀ (4×4)", c("w2").t())
        .input("Z¹ (1×4)", s("calc-z1"))
        .hint(
            "Multiply dZ² (1×4) with W²ᵀ (4×4), then multiply element-wise by \
             ReLU'(Z¹). Z¹₃ is negative, so dZ¹₃ is 0.",
        ),
        StepDecl::manual(StepId::new("calc-dw1"), s("input").t().matmul(s("calc-dz1")))
            .title("Gradient dW¹")
            .description("First layer weight gradients")
            .formula("dW¹ = A⁰ᵀ·dZ¹")
            .result("dW¹")
            .input("A⁰ᵀ (2×1)", s("input").t())
            .input("dZ¹ (1×4)", s("calc-dz1"))
            .hint("Multiply the transpose of the input (2×1) with dZ¹ (1×4)."),
        StepDecl::manual(StepId::new("calc-db1"), s("calc-dz1"))
            .title("Gradient db¹")
            .description("First layer bias gradients")
            .formula("db¹ = dZ¹")
            .result("db¹")
            .input("dZ¹ (1×4)", s("calc-dz1"))
            .hint("The gradient of the bias is just dZ¹."),
    ];

    LessonSpec {
        kind: LessonKind::NeuralNetwork,
        title: "Neural Network: Forward and Backward Pass".to_string(),
        constants,
        steps,
        seed: vec![StepId::new("input")],
        intro: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Grading;

    #[test]
    fn test_layer_shapes_chain() {
        assert_eq!(input().cols(), w1().rows());
        assert_eq!(w1().cols(), w2().rows());
        assert_eq!(w2().cols(), w3().rows());
        assert_eq!(b3().shape(), y_true().shape());
    }

    #[test]
    fn test_activation_steps_are_auto() {
        let spec = spec();
        let auto: Vec<String> = spec
            .steps
            .iter()
            .filter(|s| s.grading == Grading::Auto)
            .map(|s| s.id.to_string())
            .collect();
        assert_eq!(auto, ["input", "activate-a1", "activate-a2", "activate-a3"]);
    }
}
