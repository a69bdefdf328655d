//! Matrix Kernel for Hand-Verifiable Arithmetic
//!
//! This module provides the small dense matrix type every lesson is built
//! from, together with the handful of operations the lessons need:
//! multiplication, transposition, element-wise arithmetic, row-wise softmax,
//! ReLU and its derivative, cross-entropy, and concatenation.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f64>` storing all elements in row-major order
//! - **Shape**: `rows × cols`; every row has the same length by construction
//!
//! ## Mismatched Shapes Never Panic
//!
//! Lesson graphs must always evaluate to *something* the learner can look at,
//! so no operation here panics on incompatible operands:
//!
//! - `matmul` and `concat_horizontal` return a NaN-filled matrix of the shape
//!   the caller asked for and log a warning.
//! - `add`, `sub` and `hadamard` return the left operand unchanged.
//!
//! NaN cells can never pass validation, so a broken graph shows up as "every
//! cell wrong" rather than as a crash.
//!
//! ## Example
//!
//! ```rust
//! use matrix_tutor::Matrix;
//!
//! let a = Matrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 3);
//! let b = Matrix::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], 3, 2);
//! let c = a.matmul(&b);
//! assert_eq!(c.shape(), (2, 2));
//! assert_eq!(c.row(0), &[4.0, 5.0]);
//! ```
//!
//! Element-wise operations run through Rayon parallel iterators. Every cell
//! is an independent pure function, so results match sequential evaluation.

use crate::error::{TutorError, TutorResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Epsilon added inside `log` by [`cross_entropy_loss`]
pub const LOG_EPSILON: f64 = 1e-12;

/// A dense row-major matrix of `f64`
///
/// Serializes as a list of rows (`[[1.0, 2.0], [3.0, 4.0]]`), which is the
/// shape the rendering layer consumes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Vec<f64>>", try_from = "Vec<Vec<f64>>")]
pub struct Matrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create a matrix from flat row-major data
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != rows * cols`. Compiled-in constants are the
    /// only callers, so a mismatch is a typo in the source.
    pub fn new(data: Vec<f64>, rows: usize, cols: usize) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length ({}) doesn't match shape {}×{}",
            data.len(),
            rows,
            cols
        );
        Self { data, rows, cols }
    }

    /// Create a matrix from nested rows, rejecting ragged input
    ///
    /// An empty outer vector yields a 0×0 matrix.
    ///
    /// ```rust
    /// # use matrix_tutor::Matrix;
    /// let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m.shape(), (2, 2));
    /// assert!(Matrix::from_rows(vec![vec![1.0], vec![2.0, 3.0]]).is_err());
    /// ```
    pub fn from_rows(rows: Vec<Vec<f64>>) -> TutorResult<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(TutorError::RaggedMatrix {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self::new(data, n_rows, cols))
    }

    /// Build a matrix from fixed-size row literals
    ///
    /// Used by the lesson constant banks, where raggedness is ruled out by
    /// the type system.
    pub fn from_array<const R: usize, const C: usize>(rows: [[f64; C]; R]) -> Self {
        let data = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Self::new(data, R, C)
    }

    /// Create a matrix filled with zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(vec![0.0; rows * cols], rows, cols)
    }

    /// Create a matrix filled with NaN
    ///
    /// This is the sentinel result of an operation whose operands have
    /// incompatible shapes.
    pub fn nan(rows: usize, cols: usize) -> Self {
        Self::new(vec![f64::NAN; rows * cols], rows, cols)
    }

    /// Create an `n × n` identity matrix
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Create a `1 × n` one-hot row with a 1.0 at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= n`.
    pub fn one_hot(index: usize, n: usize) -> Self {
        assert!(index < n, "one-hot index {} out of range for {}", index, n);
        let mut m = Self::zeros(1, n);
        m.data[index] = 1.0;
        m
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Flat row-major data
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Cell `(i, j)`, or `None` when out of range
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.rows && j < self.cols).then(|| self.data[i * self.cols + j])
    }

    /// Row `i` as a slice
    ///
    /// # Panics
    ///
    /// Panics if `i >= rows`.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Nested-row copy of the matrix
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|i| self.row(i).to_vec()).collect()
    }

    /// True when any cell is NaN
    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Matrix multiplication
    ///
    /// For `A @ B` where `A` is `[m, k]` and `B` is `[k, n]`, the result is
    /// `[m, n]` with `C[i,j] = Σ_l A[i,l] · B[l,j]`.
    ///
    /// When `cols(A) != rows(B)` the result is an `m × n` matrix of NaN and a
    /// warning is logged.
    ///
    /// ```rust
    /// # use matrix_tutor::Matrix;
    /// let a = Matrix::zeros(2, 3);
    /// let b = Matrix::zeros(2, 4);
    /// let c = a.matmul(&b);
    /// assert_eq!(c.shape(), (2, 4));
    /// assert!(c.has_nan());
    /// ```
    pub fn matmul(&self, other: &Matrix) -> Matrix {
        let m = self.rows;
        let n = other.cols;
        let k = self.cols;

        if k != other.rows {
            log::warn!(
                "Matrix dimensions incompatible for multiplication: [{}, {}] @ [{}, {}]",
                self.rows,
                self.cols,
                other.rows,
                other.cols
            );
            return Matrix::nan(m, n);
        }

        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for l in 0..k {
                    sum += self.data[i * k + l] * other.data[l * n + j];
                }
                result[i * n + j] = sum;
            }
        }

        Matrix::new(result, m, n)
    }

    /// Transpose: `B[i][j] = A[j][i]`
    pub fn transpose(&self) -> Matrix {
        let mut result = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                result[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Matrix::new(result, self.cols, self.rows)
    }

    /// Combine two same-shaped matrices cell by cell
    ///
    /// Returns `self` unchanged when the shapes differ.
    fn zip_with<F>(&self, other: &Matrix, op: &str, f: F) -> Matrix
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        if self.shape() != other.shape() {
            log::debug!(
                "Shapes differ for {}: {:?} vs {:?}; returning left operand",
                op,
                self.shape(),
                other.shape()
            );
            return self.clone();
        }
        let result = self
            .data
            .par_iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Matrix::new(result, self.rows, self.cols)
    }

    /// Apply `f` to every cell
    fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let result = self.data.par_iter().map(|&x| f(x)).collect();
        Matrix::new(result, self.rows, self.cols)
    }

    /// Element-wise addition (left operand returned on shape mismatch)
    pub fn add(&self, other: &Matrix) -> Matrix {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Element-wise subtraction (left operand returned on shape mismatch)
    pub fn sub(&self, other: &Matrix) -> Matrix {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product (left operand returned on shape mismatch)
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        self.zip_with(other, "hadamard", |a, b| a * b)
    }

    /// Multiply all elements by a scalar
    pub fn scale(&self, scalar: f64) -> Matrix {
        self.map(|x| x * scalar)
    }

    /// Divide all elements by a scalar
    pub fn div_scalar(&self, scalar: f64) -> Matrix {
        self.map(|x| x / scalar)
    }

    /// ReLU: `max(0, x)` per cell
    pub fn relu(&self) -> Matrix {
        // NaN passes through so broken operands stay visible
        self.map(|x| if x < 0.0 { 0.0 } else { x })
    }

    /// ReLU derivative: `1` where `x > 0`, otherwise `0`
    ///
    /// The derivative at exactly zero is taken to be 0.
    pub fn relu_derivative(&self) -> Matrix {
        self.map(|x| if x > 0.0 { 1.0 } else { 0.0 })
    }

    /// Row-wise softmax
    ///
    /// Uses the numerically stable form:
    ///
    /// ```text
    /// softmax(x)[i] = exp(x[i] - max(x)) / Σ_j exp(x[j] - max(x))
    /// ```
    ///
    /// A row whose exponentials sum to exactly zero (every entry `-inf`)
    /// becomes a row of zeros.
    pub fn softmax_rows(&self) -> Matrix {
        let cols = self.cols;
        if cols == 0 {
            return self.clone();
        }

        let result: Vec<f64> = self
            .data
            .par_chunks(cols)
            .flat_map_iter(|row| {
                let max = row.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
                let shift = if max.is_finite() { max } else { 0.0 };

                let exp_values: Vec<f64> = row.iter().map(|&x| (x - shift).exp()).collect();
                let sum: f64 = exp_values.iter().sum();

                exp_values
                    .into_iter()
                    .map(move |val| if sum == 0.0 { 0.0 } else { val / sum })
            })
            .collect();

        Matrix::new(result, self.rows, cols)
    }

    /// Column means as a `1 × cols` matrix
    ///
    /// A matrix with no rows averages to zeros.
    pub fn mean_rows(&self) -> Matrix {
        let mut result = vec![0.0; self.cols];
        if self.rows == 0 {
            return Matrix::new(result, 1, self.cols);
        }
        for row in self.data.chunks(self.cols.max(1)) {
            for (acc, &v) in result.iter_mut().zip(row) {
                *acc += v;
            }
        }
        let n = self.rows as f64;
        result.iter_mut().for_each(|v| *v /= n);
        Matrix::new(result, 1, self.cols)
    }

    /// Index of the largest value in each row (first one on ties)
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|i| {
                self.row(i)
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (j, &v)| {
                        if v > best.1 {
                            (j, v)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect()
    }

    /// Concatenate matrices side by side
    ///
    /// All inputs must share the same row count `R`. Row `i` of the result is
    /// row `i` of each input in argument order. On a row-count mismatch the
    /// result is NaN with the first input's row count.
    pub fn concat_horizontal(matrices: &[&Matrix]) -> Matrix {
        let Some(first) = matrices.first() else {
            return Matrix::zeros(0, 0);
        };
        let rows = first.rows;
        let cols: usize = matrices.iter().map(|m| m.cols).sum();

        if let Some(bad) = matrices.iter().find(|m| m.rows != rows) {
            log::warn!(
                "Cannot concatenate horizontally: expected {} rows, found a {}×{} operand",
                rows,
                bad.rows,
                bad.cols
            );
            return Matrix::nan(rows, cols);
        }

        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for m in matrices {
                data.extend_from_slice(m.row(i));
            }
        }
        Matrix::new(data, rows, cols)
    }

    /// Stack matrices on top of each other
    ///
    /// All inputs must share the same column count. On a mismatch the first
    /// input is returned unchanged.
    pub fn concat_vertical(matrices: &[&Matrix]) -> Matrix {
        let Some(first) = matrices.first() else {
            return Matrix::zeros(0, 0);
        };
        let cols = first.cols;

        if matrices.iter().any(|m| m.cols != cols) {
            log::warn!(
                "Cannot stack matrices with differing column counts; keeping the first operand"
            );
            return (*first).clone();
        }

        let rows = matrices.iter().map(|m| m.rows).sum();
        let data = matrices.iter().flat_map(|m| m.data.iter().copied()).collect();
        Matrix::new(data, rows, cols)
    }
}

/// Cross-entropy loss of a single prediction row
///
/// ```text
/// loss = -Σ_i y[i] · log(p[i] + ε),  ε = 1e-12
/// ```
///
/// Both operands must be `1 × n` with the same `n`; otherwise the loss is NaN
/// and a warning is logged.
///
/// ```rust
/// # use matrix_tutor::{Matrix, matrix::cross_entropy_loss};
/// let p = Matrix::from_array([[0.25, 0.75]]);
/// let y = Matrix::from_array([[0.0, 1.0]]);
/// assert!((cross_entropy_loss(&p, &y) - 0.75f64.ln().abs()).abs() < 1e-9);
/// ```
pub fn cross_entropy_loss(predicted: &Matrix, truth: &Matrix) -> f64 {
    if predicted.rows != 1 || predicted.shape() != truth.shape() {
        log::warn!(
            "Cross-entropy expects two 1×n rows, got {:?} and {:?}",
            predicted.shape(),
            truth.shape()
        );
        return f64::NAN;
    }
    -predicted
        .data
        .iter()
        .zip(&truth.data)
        .map(|(&p, &y)| y * (p + LOG_EPSILON).ln())
        .sum::<f64>()
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(
            i < self.rows && j < self.cols,
            "index ({}, {}) out of range for {}×{}",
            i,
            j,
            self.rows,
            self.cols
        );
        &self.data[i * self.cols + j]
    }
}

impl From<Matrix> for Vec<Vec<f64>> {
    fn from(m: Matrix) -> Self {
        m.to_rows()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = TutorError;

    fn try_from(rows: Vec<Vec<f64>>) -> TutorResult<Self> {
        Matrix::from_rows(rows)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            let cells: Vec<String> = self.row(i).iter().map(|v| format!("{:8.4}", v)).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_matmul_basic() {
        let a = Matrix::from_array([[1.0, 2.0], [3.0, 4.0]]);
        let b = Matrix::from_array([[5.0, 6.0], [7.0, 8.0]]);
        let c = a.matmul(&b);
        assert_eq!(c.to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
    }

    #[test]
    fn test_matmul_dimension_mismatch_is_nan() {
        let a = Matrix::zeros(5, 4);
        let b = Matrix::zeros(5, 4);
        let c = a.matmul(&b);
        assert_eq!(c.shape(), (5, 4));
        assert!(c.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_transpose_shape_and_values() {
        let a = Matrix::from_array([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let t = a.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t[(0, 1)], 4.0);
    }

    #[test]
    fn test_elementwise_mismatch_returns_left() {
        let a = Matrix::from_array([[1.0, 2.0]]);
        let b = Matrix::from_array([[1.0], [2.0]]);
        assert_eq!(a.add(&b), a);
        assert_eq!(a.sub(&b), a);
        assert_eq!(a.hadamard(&b), a);
    }

    #[test]
    fn test_elementwise_ops() {
        let a = Matrix::from_array([[1.0, -2.0]]);
        let b = Matrix::from_array([[3.0, 4.0]]);
        assert_eq!(a.add(&b).to_rows(), vec![vec![4.0, 2.0]]);
        assert_eq!(a.sub(&b).to_rows(), vec![vec![-2.0, -6.0]]);
        assert_eq!(a.hadamard(&b).to_rows(), vec![vec![3.0, -8.0]]);
    }

    #[test]
    fn test_relu_and_derivative_at_zero() {
        let z = Matrix::from_array([[-1.0, 0.0, 2.5]]);
        assert_eq!(z.relu().to_rows(), vec![vec![0.0, 0.0, 2.5]]);
        assert_eq!(z.relu_derivative().to_rows(), vec![vec![0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let m = Matrix::from_array([[1.0, 2.0, 3.0], [1000.0, 1001.0, 1002.0]]);
        let s = m.softmax_rows();
        for i in 0..2 {
            let sum: f64 = s.row(i).iter().sum();
            assert!((sum - 1.0).abs() < EPSILON);
        }
        assert!(!s.has_nan());
    }

    #[test]
    fn test_softmax_degenerate_row_is_zero() {
        let m = Matrix::from_array([[f64::NEG_INFINITY, f64::NEG_INFINITY], [0.0, 0.0]]);
        let s = m.softmax_rows();
        assert_eq!(s.row(0), &[0.0, 0.0]);
        assert_eq!(s.row(1), &[0.5, 0.5]);
    }

    #[test]
    fn test_cross_entropy_requires_single_rows() {
        let p = Matrix::from_array([[0.5, 0.5], [0.5, 0.5]]);
        let y = Matrix::from_array([[0.0, 1.0], [0.0, 1.0]]);
        assert!(cross_entropy_loss(&p, &y).is_nan());
    }

    #[test]
    fn test_cross_entropy_of_zero_probability_is_finite() {
        let p = Matrix::from_array([[1.0, 0.0]]);
        let y = Matrix::from_array([[0.0, 1.0]]);
        let loss = cross_entropy_loss(&p, &y);
        assert!(loss.is_finite());
        assert!((loss - (-LOG_EPSILON.ln())).abs() < EPSILON);
    }

    #[test]
    fn test_concat_horizontal() {
        let a = Matrix::from_array([[1.0], [2.0]]);
        let b = Matrix::from_array([[3.0, 4.0], [5.0, 6.0]]);
        let c = Matrix::concat_horizontal(&[&a, &b]);
        assert_eq!(c.to_rows(), vec![vec![1.0, 3.0, 4.0], vec![2.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_concat_horizontal_row_mismatch() {
        let a = Matrix::zeros(2, 1);
        let b = Matrix::zeros(3, 1);
        let c = Matrix::concat_horizontal(&[&a, &b]);
        assert_eq!(c.shape(), (2, 2));
        assert!(c.has_nan());
    }

    #[test]
    fn test_concat_vertical_and_mean() {
        let a = Matrix::from_array([[0.0, 1.0, 0.0]]);
        let b = Matrix::from_array([[0.0, 0.0, 1.0]]);
        let x = Matrix::concat_vertical(&[&a, &b]);
        assert_eq!(x.shape(), (2, 3));
        assert_eq!(x.mean_rows().to_rows(), vec![vec![0.0, 0.5, 0.5]]);
    }

    #[test]
    fn test_argmax_rows_prefers_first_on_tie() {
        let m = Matrix::from_array([[1.0, 3.0, 3.0], [2.0, 0.0, -1.0]]);
        assert_eq!(m.argmax_rows(), vec![1, 0]);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TutorError::RaggedMatrix { row: 1, expected: 2, got: 1 }));
    }

    #[test]
    fn test_serde_as_nested_rows() {
        let m = Matrix::from_array([[1.0, 2.0], [3.0, 4.0]]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[1.0,2.0],[3.0,4.0]]");
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
