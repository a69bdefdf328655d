//! Property tests for the matrix kernel
//!
//! Covers the algebraic identities and edge cases the lessons rely on:
//! - transpose(A·B) == Bᵀ·Aᵀ
//! - softmax rows are probability distributions
//! - ReLU derivative at exactly zero
//! - lenient handling of mismatched shapes

use approx::{assert_abs_diff_eq, assert_relative_eq};
use matrix_tutor::matrix::{cross_entropy_loss, LOG_EPSILON};
use matrix_tutor::Matrix;

// Deterministic, non-symmetric test matrix
fn sample(rows: usize, cols: usize, offset: f64) -> Matrix {
    let data = (0..rows * cols)
        .map(|i| ((i as f64) * 0.37 + offset).sin() * 3.0)
        .collect();
    Matrix::new(data, rows, cols)
}

// ============================================================================
// Multiplication and Transpose
// ============================================================================

#[test]
fn test_transpose_of_product() {
    for &(m, k, n) in &[(1, 1, 1), (2, 3, 4), (5, 8, 4), (6, 6, 6), (1, 5, 3), (4, 2, 1)] {
        let a = sample(m, k, 0.1);
        let b = sample(k, n, 1.7);
        let left = a.matmul(&b).transpose();
        let right = b.transpose().matmul(&a.transpose());
        assert_eq!(left.shape(), (n, m));
        for (&x, &y) in left.data().iter().zip(right.data()) {
            assert_abs_diff_eq!(x, y, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_identity_is_neutral() {
    let a = sample(5, 6, 0.3);
    assert_eq!(a.matmul(&Matrix::identity(6)), a);
    assert_eq!(Matrix::identity(5).matmul(&a), a);
}

#[test]
fn test_double_transpose() {
    let a = sample(3, 7, 2.0);
    assert_eq!(a.transpose().transpose(), a);
}

#[test]
fn test_mismatched_product_is_all_nan() {
    let c = sample(2, 3, 0.0).matmul(&sample(4, 5, 0.0));
    assert_eq!(c.shape(), (2, 5));
    assert!(c.data().iter().all(|v| v.is_nan()));
}

// ============================================================================
// Softmax
// ============================================================================

#[test]
fn test_softmax_rows_are_distributions() {
    for offset in [0.0, 1.0, 2.5] {
        let m = sample(4, 5, offset).scale(10.0);
        let s = m.softmax_rows();
        for i in 0..s.rows() {
            assert_abs_diff_eq!(s.row(i).iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            assert!(s.row(i).iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }
}

#[test]
fn test_softmax_handles_large_inputs() {
    let m = Matrix::from_array([[1000.0, 1000.0], [-1000.0, 0.0]]);
    let s = m.softmax_rows();
    assert_relative_eq!(s[(0, 0)], 0.5);
    assert_relative_eq!(s[(1, 1)], 1.0);
}

#[test]
fn test_softmax_is_shift_invariant() {
    let m = Matrix::from_array([[1.0, 2.0, 3.0]]);
    let shifted = m.add(&Matrix::from_array([[5.0, 5.0, 5.0]]));
    for (&a, &b) in m.softmax_rows().data().iter().zip(shifted.softmax_rows().data()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
}

// ============================================================================
// Activations and Loss
// ============================================================================

#[test]
fn test_relu_derivative_is_zero_at_zero() {
    let z = Matrix::from_array([[0.0, -0.0, 1e-300, -1e-300]]);
    assert_eq!(z.relu_derivative().row(0), &[0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_cross_entropy_matches_hand_value() {
    let p = Matrix::from_array([[0.2, 0.7, 0.1]]);
    let y = Matrix::from_array([[0.0, 1.0, 0.0]]);
    assert_relative_eq!(
        cross_entropy_loss(&p, &y),
        -(0.7 + LOG_EPSILON).ln(),
        epsilon = 1e-12
    );
}

#[test]
fn test_cross_entropy_rejects_shape_mismatch() {
    let p = Matrix::from_array([[0.5, 0.5]]);
    let y = Matrix::from_array([[0.0, 1.0, 0.0]]);
    assert!(cross_entropy_loss(&p, &y).is_nan());
}

// ============================================================================
// Lenient Element-wise Operations
// ============================================================================

#[test]
fn test_elementwise_mismatch_returns_left_operand() {
    let a = sample(2, 2, 0.0);
    let b = sample(3, 2, 0.0);
    assert_eq!(a.add(&b), a);
    assert_eq!(a.sub(&b), a);
    assert_eq!(a.hadamard(&b), a);
}

#[test]
fn test_scale_and_div_scalar_are_inverse() {
    let a = sample(3, 3, 0.5);
    let back = a.scale(4.0).div_scalar(4.0);
    for (&x, &y) in a.data().iter().zip(back.data()) {
        assert_relative_eq!(x, y, epsilon = 1e-12);
    }
}

// ============================================================================
// Concatenation and Averaging
// ============================================================================

#[test]
fn test_concat_horizontal_preserves_argument_order() {
    let parts: Vec<Matrix> = (0..3).map(|h| Matrix::new(vec![h as f64; 10], 5, 2)).collect();
    let c = Matrix::concat_horizontal(&parts.iter().collect::<Vec<_>>());
    assert_eq!(c.shape(), (5, 6));
    for i in 0..5 {
        assert_eq!(c.row(i), &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }
}

#[test]
fn test_concat_vertical_mismatch_keeps_first() {
    let a = sample(1, 3, 0.0);
    let b = sample(1, 4, 0.0);
    assert_eq!(Matrix::concat_vertical(&[&a, &b]), a);
}

#[test]
fn test_mean_rows_of_empty_matrix() {
    let m = Matrix::zeros(0, 3);
    assert_eq!(m.mean_rows().to_rows(), vec![vec![0.0, 0.0, 0.0]]);
}
