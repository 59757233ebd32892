//! Dominant eigenpair of a Hermitian theta-theta matrix.
//!
//! A single thin screen makes the theta-theta matrix rank one, so its
//! largest-magnitude eigenvalue measures how much of the spectrum the
//! curvature explains and its eigenvector is the screen's complex amplitude.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, ArrayView2};
use num_complex::Complex64;
use thiserror::Error;

/// Errors from the Hermitian eigen solve
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EigenError {
    #[error("Cannot decompose an empty matrix")]
    Empty,

    #[error("Matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Matrix contains non-finite entries")]
    NonFinite,
}

/// Largest-magnitude eigenvalue with its unit eigenvector.
#[derive(Debug, Clone)]
pub struct DominantEigenpair {
    /// Signed eigenvalue; its magnitude is the quality of fit
    pub value: f64,
    /// Unit-norm eigenvector, phased so its largest component is real and positive
    pub vector: Array1<Complex64>,
}

impl DominantEigenpair {
    /// `|value|`
    pub fn magnitude(&self) -> f64 {
        self.value.abs()
    }
}

/// Solve for the eigenpair of largest `|w|` of a Hermitian matrix.
///
/// The full decomposition is computed densely; reduced theta-theta matrices
/// are at most a few hundred bins on a side.
pub fn dominant_eigenpair(matrix: ArrayView2<Complex64>) -> Result<DominantEigenpair, EigenError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(EigenError::NotSquare { rows, cols });
    }
    if rows == 0 {
        return Err(EigenError::Empty);
    }
    if matrix.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
        return Err(EigenError::NonFinite);
    }

    let na_matrix = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);
    let eigen = SymmetricEigen::new(na_matrix);

    let (index, &value) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .ok_or(EigenError::Empty)?;

    let column = eigen.eigenvectors.column(index);
    let pivot = column
        .iter()
        .copied()
        .max_by(|a, b| a.norm().total_cmp(&b.norm()))
        .unwrap_or(Complex64::new(1.0, 0.0));
    let phase = if pivot.norm() > 0.0 {
        pivot.conj() / pivot.norm()
    } else {
        Complex64::new(1.0, 0.0)
    };

    Ok(DominantEigenpair {
        value,
        vector: column.iter().map(|&v| v * phase).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_rank_one_matrix_recovers_vector() {
        let v = array![c(0.5, 0.5), c(-0.3, 0.1), c(0.0, 0.6), c(0.2, 0.0)];
        let norm_sq: f64 = v.iter().map(|x| x.norm_sqr()).sum();
        let m = Array2::from_shape_fn((4, 4), |(i, j)| 3.0 * v[i] * v[j].conj() / norm_sq);

        let pair = dominant_eigenpair(m.view()).unwrap();
        assert_relative_eq!(pair.value, 3.0, epsilon = 1e-10);

        let unit: f64 = pair.vector.iter().map(|x| x.norm_sqr()).sum();
        assert_relative_eq!(unit, 1.0, epsilon = 1e-10);

        // Same vector up to a global phase: |<u, v>| = |v|
        let overlap: Complex64 = pair.vector.iter().zip(v.iter()).map(|(a, b)| a.conj() * b).sum();
        assert_relative_eq!(overlap.norm(), norm_sq.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_picks_largest_magnitude_even_if_negative() {
        let m = array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-4.0, 0.0)]];
        let pair = dominant_eigenpair(m.view()).unwrap();
        assert_relative_eq!(pair.value, -4.0, epsilon = 1e-12);
        assert_relative_eq!(pair.magnitude(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(pair.vector[1].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(pair.vector[1].im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_bad_matrices() {
        let empty = Array2::<Complex64>::zeros((0, 0));
        assert_eq!(dominant_eigenpair(empty.view()).unwrap_err(), EigenError::Empty);

        let rect = Array2::<Complex64>::zeros((2, 3));
        assert_eq!(
            dominant_eigenpair(rect.view()).unwrap_err(),
            EigenError::NotSquare { rows: 2, cols: 3 }
        );

        let mut nan = Array2::<Complex64>::zeros((2, 2));
        nan[[0, 1]] = c(f64::NAN, 0.0);
        assert_eq!(dominant_eigenpair(nan.view()).unwrap_err(), EigenError::NonFinite);
    }
}
