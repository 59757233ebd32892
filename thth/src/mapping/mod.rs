//! Mapping between secondary-spectrum coordinates and the theta-theta plane
//!
//! For a thin screen of curvature `eta`, a pair of screen angles
//! (theta1, theta2) interferes at delay `tau = eta * (theta1^2 - theta2^2)`
//! and Doppler frequency `fd = theta1 - theta2`. The forward map samples a
//! secondary spectrum on that grid, the reduced selector keeps the square
//! block the spectrum fully supports, and the inverse map histograms a
//! theta-theta matrix back onto delay/Doppler bins.

mod forward;
mod inverse;
mod reduced;

use num_complex::Complex64;
use thiserror::Error;

use crate::spectra::SecondarySpectrum;

pub use forward::forward_map;
pub use inverse::inverse_map;
pub use reduced::{reduced_map, retained_bins, ReducedThetaTheta};

/// Errors that can occur during theta-theta mapping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Spectrum shape {data:?} does not match axes {axes:?}")]
    ShapeMismatch {
        data: (usize, usize),
        axes: (usize, usize),
    },

    #[error("Theta-theta matrix shape {matrix:?} does not match {centers} bin centers")]
    MatrixSizeMismatch {
        matrix: (usize, usize),
        centers: usize,
    },

    #[error("Need at least {expected} theta edges, got {got}")]
    TooFewEdges { expected: usize, got: usize },

    #[error("Target {axis} axis needs at least 2 samples")]
    AxisTooShort { axis: &'static str },

    #[error("Curvature {0} s^3 gives a degenerate map")]
    DegenerateCurvature(f64),

    #[error("Only {retained} theta bins lie inside the spectrum, need at least 3")]
    ReducedDomainTooSmall { retained: usize },
}

fn check_spectrum(ss: &SecondarySpectrum) -> Result<(), MappingError> {
    if ss.data.dim() != ss.axes.dim() {
        return Err(MappingError::ShapeMismatch {
            data: ss.data.dim(),
            axes: ss.axes.dim(),
        });
    }
    if ss.axes.tau.len() < 2 {
        return Err(MappingError::AxisTooShort { axis: "tau" });
    }
    if ss.axes.fd.len() < 2 {
        return Err(MappingError::AxisTooShort { axis: "fd" });
    }
    Ok(())
}

fn check_edges(len: usize) -> Result<(), MappingError> {
    if len < 2 {
        return Err(MappingError::TooFewEdges {
            expected: 2,
            got: len,
        });
    }
    Ok(())
}

/// Zero each non-finite component independently
fn finite_or_zero(v: Complex64) -> Complex64 {
    Complex64::new(
        if v.re.is_finite() { v.re } else { 0.0 },
        if v.im.is_finite() { v.im } else { 0.0 },
    )
}

/// `sqrt(|2 eta (theta2 - theta1)|)`, the Jacobian of the quadratic map
#[inline]
fn flux_factor(eta: f64, theta1: f64, theta2: f64) -> f64 {
    (2.0 * eta * (theta2 - theta1)).abs().sqrt()
}

#[cfg(test)]
mod tests;
