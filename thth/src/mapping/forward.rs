use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;

use super::{check_edges, check_spectrum, finite_or_zero, flux_factor, MappingError};
use crate::binning::{bin_centers, AxisIndexer};
use crate::spectra::SecondarySpectrum;
use crate::units::Curvature;

/// Resolve a Doppler column the way a negative array index would: values
/// below zero count back from the end. There is no lower-bound rejection
/// beyond the array length itself.
fn doppler_column(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    match index {
        i if i >= len => None,
        i if i >= 0 => Some(i as usize),
        i if i >= -len => Some((i + len) as usize),
        _ => None,
    }
}

/// Delay rows must lie strictly above the first sample.
fn delay_row(index: i64, len: usize) -> Option<usize> {
    (index > 0 && index < len as i64).then_some(index as usize)
}

/// Map a secondary spectrum into the theta-theta plane.
///
/// Entry `[i, j]` pairs `theta1 = centers[j]` with `theta2 = centers[i]` and
/// takes the nearest spectrum sample at
/// `(eta (theta1^2 - theta2^2), theta1 - theta2)`, scaled by the flux factor
/// `sqrt(|2 eta (theta2 - theta1)|)`.
///
/// Only the upper triangle is sampled; the lower triangle is its conjugate
/// transpose, and the diagonal and anti-diagonal (`theta1 = -theta2`) are
/// zero. Pairs whose sample falls outside the spectrum stay zero, and
/// non-finite components of a product are zeroed one at a time.
///
/// # Errors
/// * `MappingError::ShapeMismatch` - spectrum data and axes disagree
/// * `MappingError::AxisTooShort` - an axis has fewer than two samples
/// * `MappingError::TooFewEdges` - fewer than two theta edges
pub fn forward_map(
    ss: &SecondarySpectrum,
    eta: Curvature,
    edges: ArrayView1<f64>,
) -> Result<Array2<Complex64>, MappingError> {
    check_spectrum(ss)?;
    check_edges(edges.len())?;

    let eta = eta.as_us_per_mhz2();
    let centers = bin_centers(edges);
    let n = centers.len();
    let tau_index = AxisIndexer::new(ss.axes.tau.view());
    let fd_index = AxisIndexer::new(ss.axes.fd.view());

    let lookup = |theta1: f64, theta2: f64| -> Option<(usize, usize)> {
        let row = delay_row(
            tau_index.index(eta * (theta1 * theta1 - theta2 * theta2)),
            tau_index.len(),
        )?;
        let col = doppler_column(fd_index.index(theta1 - theta2), fd_index.len())?;
        Some((row, col))
    };

    let mut thth = Array2::<Complex64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            if i + j == n - 1 {
                continue;
            }
            let (theta1, theta2) = (centers[j], centers[i]);
            let Some((row, col)) = lookup(theta1, theta2) else {
                continue;
            };

            let value = finite_or_zero(ss.data[[row, col]] * flux_factor(eta, theta1, theta2));
            thth[[i, j]] = value;
            thth[[j, i]] = value.conj();
        }
    }

    Ok(thth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doppler_column_wraps_like_negative_index() {
        assert_eq!(doppler_column(3, 8), Some(3));
        assert_eq!(doppler_column(8, 8), None);
        assert_eq!(doppler_column(-1, 8), Some(7));
        assert_eq!(doppler_column(-8, 8), Some(0));
        assert_eq!(doppler_column(-9, 8), None);
    }

    #[test]
    fn test_delay_row_excludes_first_sample() {
        assert_eq!(delay_row(0, 8), None);
        assert_eq!(delay_row(1, 8), Some(1));
        assert_eq!(delay_row(7, 8), Some(7));
        assert_eq!(delay_row(8, 8), None);
        assert_eq!(delay_row(-2, 8), None);
    }
}
