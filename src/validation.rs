//! Cell-by-Cell Answer Checking
//!
//! A learner's answer is compared against the expected matrix with a fixed
//! absolute tolerance:
//!
//! ```text
//! error[i][j] = |U[i][j] − E[i][j]| > 0.0001
//! is_valid    = no error cell is set
//! ```
//!
//! Submissions arrive as raw nested rows, so they may be ragged, empty or
//! the wrong size. Any shape disagreement flags every cell of the expected
//! shape. A NaN in either matrix also counts as an error.

use crate::matrix::Matrix;
use serde::Serialize;

/// Absolute per-cell tolerance for accepting an answer
pub const TOLERANCE: f64 = 0.0001;

/// Outcome of checking one candidate matrix
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    /// Same shape as the expected matrix; `true` marks a wrong cell
    pub error_mask: Vec<Vec<bool>>,
}

impl Validation {
    /// Number of flagged cells
    pub fn error_count(&self) -> usize {
        self.error_mask.iter().flatten().filter(|&&e| e).count()
    }

    /// Coordinates of flagged cells in row-major order
    pub fn error_cells(&self) -> Vec<(usize, usize)> {
        self.error_mask
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &e)| e)
                    .map(move |(j, _)| (i, j))
            })
            .collect()
    }
}

fn same_shape(candidate: &[Vec<f64>], expected: &Matrix) -> bool {
    candidate.len() == expected.rows() && candidate.iter().all(|row| row.len() == expected.cols())
}

/// Compare `candidate` against `expected`
///
/// # Example
///
/// ```rust
/// use matrix_tutor::{validation::validate, Matrix};
///
/// let expected = Matrix::from_array([[1.0, 2.0]]);
/// let v = validate(&[vec![1.00005, 2.5]], &expected);
/// assert!(!v.is_valid);
/// assert_eq!(v.error_mask, vec![vec![false, true]]);
/// ```
pub fn validate(candidate: &[Vec<f64>], expected: &Matrix) -> Validation {
    if !same_shape(candidate, expected) {
        return Validation {
            is_valid: false,
            error_mask: vec![vec![true; expected.cols()]; expected.rows()],
        };
    }

    let error_mask: Vec<Vec<bool>> = candidate
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .zip(expected.row(i))
                // written negated so NaN differences are flagged
                .map(|(&u, &e)| !((u - e).abs() <= TOLERANCE))
                .collect()
        })
        .collect();

    let is_valid = !error_mask.iter().flatten().any(|&e| e);
    Validation {
        is_valid,
        error_mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> Matrix {
        Matrix::from_array([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])
    }

    #[test]
    fn test_exact_match_is_valid() {
        let e = expected();
        let v = validate(&e.to_rows(), &e);
        assert!(v.is_valid);
        assert_eq!(v.error_count(), 0);
    }

    #[test]
    fn test_within_tolerance_is_valid() {
        let v = validate(&[vec![1.00009, 2.0, 3.0], vec![4.0, 4.99991, 6.0]], &expected());
        assert!(v.is_valid);
    }

    #[test]
    fn test_single_wrong_cell() {
        let v = validate(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.01]], &expected());
        assert!(!v.is_valid);
        assert_eq!(v.error_cells(), vec![(1, 2)]);
    }

    #[test]
    fn test_ragged_candidate_flags_everything() {
        let v = validate(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0]], &expected());
        assert!(!v.is_valid);
        assert_eq!(v.error_count(), 6);
        assert_eq!(v.error_mask.len(), 2);
        assert!(v.error_mask.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_empty_candidate_flags_everything() {
        let v = validate(&[], &expected());
        assert!(!v.is_valid);
        assert_eq!(v.error_count(), 6);
    }

    #[test]
    fn test_nan_cell_is_an_error() {
        let v = validate(&[vec![f64::NAN, 2.0, 3.0], vec![4.0, 5.0, 6.0]], &expected());
        assert!(!v.is_valid);
        assert_eq!(v.error_cells(), vec![(0, 0)]);
    }

    #[test]
    fn test_nan_expected_never_validates() {
        let e = Matrix::nan(1, 2);
        let v = validate(&e.to_rows(), &e);
        assert!(!v.is_valid);
        assert_eq!(v.error_count(), 2);
    }
}
