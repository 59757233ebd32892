use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;

use super::{check_edges, finite_or_zero, flux_factor, MappingError};
use crate::binning::bin_centers;
use crate::spectra::SpectralAxes;
use crate::units::Curvature;

/// Histogram bin edges centered on each sample of `axis`, using the first
/// step as the bin width.
fn sample_edges(axis: &Array1<f64>) -> Vec<f64> {
    let n = axis.len();
    let step = axis[1] - axis[0];
    (0..=n)
        .map(|k| (k as f64 - 0.5) * step + axis[0])
        .collect()
}

/// Bin holding `x` for ascending `edges`. Bins are half-open except the
/// last, which also takes its right edge. Values outside, and NaN, have no bin.
fn histogram_bin(edges: &[f64], x: f64) -> Option<usize> {
    let n_bins = edges.len().checked_sub(1)?;
    let mut idx = edges.partition_point(|&e| e <= x);
    if x == edges[n_bins] {
        idx -= 1;
    }
    (1..=n_bins).contains(&idx).then(|| idx - 1)
}

/// Project a theta-theta matrix back onto delay/Doppler bins.
///
/// Entry `[i, j]` lands at `fd = centers[j] - centers[i]` and
/// `tau = eta (centers[j]^2 - centers[i]^2)` with the flux factor divided
/// out. Each target bin holds the mean of everything that landed in it;
/// empty bins are zero. With `fold_conjugate` set, every entry also lands at
/// `(-fd, -tau)` with its conjugate, as required for the transform of a real
/// dynamic spectrum.
///
/// The result is indexed `[tau, fd]` over `axes`.
///
/// # Errors
/// * `MappingError::TooFewEdges` - fewer than two theta edges
/// * `MappingError::MatrixSizeMismatch` - `thth` is not `n x n` for the `n` centers
/// * `MappingError::AxisTooShort` - a target axis has fewer than two samples
pub fn inverse_map(
    thth: ArrayView2<Complex64>,
    axes: &SpectralAxes,
    eta: Curvature,
    edges: ArrayView1<f64>,
    fold_conjugate: bool,
) -> Result<Array2<Complex64>, MappingError> {
    check_edges(edges.len())?;
    let centers = bin_centers(edges);
    let n = centers.len();
    if thth.dim() != (n, n) {
        return Err(MappingError::MatrixSizeMismatch {
            matrix: thth.dim(),
            centers: n,
        });
    }
    if axes.tau.len() < 2 {
        return Err(MappingError::AxisTooShort { axis: "tau" });
    }
    if axes.fd.len() < 2 {
        return Err(MappingError::AxisTooShort { axis: "fd" });
    }

    let eta = eta.as_us_per_mhz2();
    let tau_edges = sample_edges(&axes.tau);
    let fd_edges = sample_edges(&axes.fd);
    let (n_tau, n_fd) = axes.dim();

    let mut sums = Array2::<Complex64>::zeros((n_tau, n_fd));
    let mut counts = Array2::<f64>::zeros((n_tau, n_fd));
    let mut deposit = |tau: f64, fd: f64, weight: Complex64| {
        if let (Some(t), Some(f)) = (
            histogram_bin(&tau_edges, tau),
            histogram_bin(&fd_edges, fd),
        ) {
            sums[[t, f]] += weight;
            counts[[t, f]] += 1.0;
        }
    };

    for i in 0..n {
        for j in 0..n {
            let (theta1, theta2) = (centers[j], centers[i]);
            let fd = theta1 - theta2;
            let tau = eta * (theta1 * theta1 - theta2 * theta2);
            // The diagonal divides by zero; it still counts toward its bin
            let weight = finite_or_zero(thth[[i, j]] / flux_factor(eta, theta1, theta2));

            deposit(tau, fd, weight);
            if fold_conjugate {
                deposit(-tau, -fd, weight.conj());
            }
        }
    }

    Ok(ndarray::Zip::from(&sums)
        .and(&counts)
        .map_collect(|&sum, &count| {
            if count > 0.0 {
                finite_or_zero(sum / count)
            } else {
                Complex64::new(0.0, 0.0)
            }
        }))
}
