//! Rank-1 theta-theta model of a secondary spectrum.
//!
//! The reduced theta-theta matrix is approximated by its dominant eigenpair,
//! mapped back onto delay/Doppler bins with the conjugate fold, and inverse
//! transformed into a model dynamic spectrum.

use nalgebra::DMatrix;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;
use thiserror::Error;

use crate::eigen::{dominant_eigenpair, DominantEigenpair, EigenError};
use crate::fft::{ifft2, ifftshift};
use crate::mapping::{inverse_map, reduced_map, MappingError, ReducedThetaTheta};
use crate::spectra::{DynamicSpectrum, SecondarySpectrum, SpectralAxes};
use crate::units::Curvature;

/// Errors from building a theta-theta model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Eigen(#[from] EigenError),

    #[error("Mask shape {mask:?} does not match data shape {data:?}")]
    MaskShape {
        mask: (usize, usize),
        data: (usize, usize),
    },

    #[error("Model {model:?} is smaller than the data {data:?}")]
    ModelTooSmall {
        model: (usize, usize),
        data: (usize, usize),
    },

    #[error("SVD failed: {0}")]
    Svd(String),
}

/// Everything produced by one rank-1 model evaluation.
#[derive(Debug, Clone)]
pub struct ThetaThetaModel {
    /// Reduced theta-theta matrix of the data
    pub thth_reduced: Array2<Complex64>,
    /// `|w| V V^H` over the same bins
    pub thth_model: Array2<Complex64>,
    /// Model secondary spectrum on the target axes, `[tau, fd]`
    pub recovered: Array2<Complex64>,
    /// Real part of the inverse transform of `recovered`
    pub model_dspec: Array2<f64>,
    /// Edges of the reduced bins
    pub edges_reduced: Array1<f64>,
    pub eigenpair: DominantEigenpair,
}

/// `|w| V V^H`
pub fn rank_one(pair: &DominantEigenpair) -> Array2<Complex64> {
    let n = pair.vector.len();
    let scale = pair.magnitude();
    Array2::from_shape_fn((n, n), |(i, j)| pair.vector[i] * pair.vector[j].conj() * scale)
}

/// Model an already reduced theta-theta matrix onto `target` axes.
pub fn model_reduced(
    reduced: ReducedThetaTheta,
    target: &SpectralAxes,
    eta: Curvature,
) -> Result<ThetaThetaModel, ModelError> {
    let eigenpair = dominant_eigenpair(reduced.thth.view())?;
    let thth_model = rank_one(&eigenpair);

    let recovered = inverse_map(thth_model.view(), target, eta, reduced.edges.view(), true)?;
    let model_dspec = ifft2(&ifftshift(&recovered)).mapv(|v| v.re);

    Ok(ThetaThetaModel {
        thth_reduced: reduced.thth,
        thth_model,
        recovered,
        model_dspec,
        edges_reduced: reduced.edges,
        eigenpair,
    })
}

/// Rank-1 model of `ss` at curvature `eta`.
///
/// The model secondary spectrum is built on `target` when given (for example
/// a finer grid), otherwise on the axes of `ss`.
pub fn model(
    ss: &SecondarySpectrum,
    eta: Curvature,
    edges: ArrayView1<f64>,
    target: Option<&SpectralAxes>,
) -> Result<ThetaThetaModel, ModelError> {
    let reduced = reduced_map(ss, eta, edges)?;
    model_reduced(reduced, target.unwrap_or(&ss.axes), eta)
}

/// `|w|` of the dominant eigenpair of the reduced theta-theta matrix, the
/// figure of merit maximized by the curvature search.
pub fn dominant_eigenvalue(
    ss: &SecondarySpectrum,
    eta: Curvature,
    edges: ArrayView1<f64>,
) -> Result<f64, ModelError> {
    let reduced = reduced_map(ss, eta, edges)?;
    Ok(dominant_eigenpair(reduced.thth.view())?.magnitude())
}

/// Chi-square of the rank-1 model against the data it was built from.
///
/// The model dynamic spectrum is cropped to the data shape and
/// `sum((model - data)[mask]^2) / n` is returned.
pub fn chi_square(
    dspec: &DynamicSpectrum,
    ss: &SecondarySpectrum,
    eta: Curvature,
    edges: ArrayView1<f64>,
    mask: ArrayView2<bool>,
    n: f64,
) -> Result<f64, ModelError> {
    let data = dspec.data();
    if mask.dim() != data.dim() {
        return Err(ModelError::MaskShape {
            mask: mask.dim(),
            data: data.dim(),
        });
    }

    let result = model(ss, eta, edges, None)?;
    let (rows, cols) = data.dim();
    let (model_rows, model_cols) = result.model_dspec.dim();
    if model_rows < rows || model_cols < cols {
        return Err(ModelError::ModelTooSmall {
            model: result.model_dspec.dim(),
            data: data.dim(),
        });
    }
    let cropped = result.model_dspec.slice(s![..rows, ..cols]);

    let sum: f64 = ndarray::Zip::from(&cropped)
        .and(data)
        .and(&mask)
        .fold(0.0, |acc, &m, &d, &keep| {
            if keep {
                acc + (m - d).powi(2)
            } else {
                acc
            }
        });
    Ok(sum / n)
}

/// Keep only the `n_modes` largest singular values of `matrix`.
pub fn svd_model(matrix: ArrayView2<Complex64>, n_modes: usize) -> Result<Array2<Complex64>, ModelError> {
    let (rows, cols) = matrix.dim();
    let na_matrix = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);

    let mut svd = na_matrix.svd(true, true);
    for (k, value) in svd.singular_values.iter_mut().enumerate() {
        if k >= n_modes {
            *value = 0.0;
        }
    }
    let recomposed = svd.recompose().map_err(|e| ModelError::Svd(e.to_string()))?;

    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| recomposed[(i, j)]))
}
