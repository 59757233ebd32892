use ndarray::{Array1, Array2, ArrayView1, Axis};
use num_complex::Complex64;

use super::{forward_map, MappingError};
use crate::binning::{bin_centers, edges_from_centers};
use crate::spectra::{SecondarySpectrum, SpectralAxes};
use crate::units::Curvature;

/// Square block of a theta-theta matrix fully supported by the spectrum.
#[derive(Debug, Clone)]
pub struct ReducedThetaTheta {
    /// Hermitian theta-theta matrix over the retained bins
    pub thth: Array2<Complex64>,
    /// Edges rebuilt from the retained centers
    pub edges: Array1<f64>,
}

impl ReducedThetaTheta {
    /// Bin centers of the reduced edges
    pub fn centers(&self) -> Array1<f64> {
        bin_centers(self.edges.view())
    }
}

fn axis_max(axis: &Array1<f64>) -> f64 {
    axis.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Indices of `centers` that stay inside the spectrum: `eta theta^2` below
/// the largest delay and `|theta|` below half the largest Doppler frequency.
pub fn retained_bins(centers: ArrayView1<f64>, eta: Curvature, axes: &SpectralAxes) -> Vec<usize> {
    let eta = eta.as_us_per_mhz2();
    let tau_max = axis_max(&axes.tau).abs();
    let fd_max = axis_max(&axes.fd).abs();

    centers
        .iter()
        .enumerate()
        .filter(|(_, &theta)| eta * theta * theta < tau_max && theta.abs() < fd_max / 2.0)
        .map(|(i, _)| i)
        .collect()
}

/// Theta-theta map restricted to the bins the spectrum fully supports.
///
/// # Errors
/// * `MappingError::DegenerateCurvature` - `eta` is zero, negative or not finite
/// * `MappingError::ReducedDomainTooSmall` - fewer than 3 bins survive
/// * any error from [`forward_map`]
pub fn reduced_map(
    ss: &SecondarySpectrum,
    eta: Curvature,
    edges: ArrayView1<f64>,
) -> Result<ReducedThetaTheta, MappingError> {
    let eta_value = eta.as_us_per_mhz2();
    if !eta_value.is_finite() || eta_value <= 0.0 {
        return Err(MappingError::DegenerateCurvature(eta.as_seconds_cubed()));
    }

    let thth = forward_map(ss, eta, edges)?;
    let centers = bin_centers(edges);
    let keep = retained_bins(centers.view(), eta, &ss.axes);

    let reduced_edges = edges_from_centers(centers.select(Axis(0), &keep).view()).ok_or(
        MappingError::ReducedDomainTooSmall {
            retained: keep.len(),
        },
    )?;
    let reduced = thth.select(Axis(0), &keep).select(Axis(1), &keep);

    Ok(ReducedThetaTheta {
        thth: reduced,
        edges: reduced_edges,
    })
}
