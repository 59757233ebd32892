use approx::assert_relative_eq;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;
use crate::binning::{bin_centers, linear_edges, AxisIndexer};
use crate::spectra::{SecondarySpectrum, SpectralAxes};
use crate::units::Curvature;

/// 64 x 64 grid with 0.05 us delay and 0.25 mHz Doppler steps
fn test_axes() -> SpectralAxes {
    SpectralAxes::new(
        Array1::from_shape_fn(64, |k| (k as f64 - 32.0) * 0.05),
        Array1::from_shape_fn(64, |k| (k as f64 - 32.0) * 0.25),
    )
}

fn random_spectrum(seed: u64) -> SecondarySpectrum {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = Array2::from_shape_fn((64, 64), |_| {
        Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
    });
    SecondarySpectrum::new(data, test_axes()).unwrap()
}

fn eta() -> Curvature {
    Curvature::from_us_per_mhz2(0.1)
}

#[test]
fn test_forward_map_is_hermitian_with_zero_diagonals() {
    let ss = random_spectrum(7);
    let edges = linear_edges(6.0, 50);
    let thth = forward_map(&ss, eta(), edges.view()).unwrap();
    let n = thth.nrows();
    assert_eq!(thth.dim(), (49, 49));

    for i in 0..n {
        assert_eq!(thth[[i, i]], Complex64::new(0.0, 0.0));
        assert_eq!(thth[[i, n - 1 - i]], Complex64::new(0.0, 0.0));
        for j in 0..n {
            assert_eq!(thth[[i, j]], thth[[j, i]].conj());
            assert!(thth[[i, j]].re.is_finite() && thth[[i, j]].im.is_finite());
        }
    }
    // Something off the diagonals was actually sampled
    assert!(thth.iter().any(|v| v.norm() > 0.0));
}

#[test]
fn test_forward_map_scrubs_non_finite_samples() {
    let mut ss = random_spectrum(3);
    ss.data.fill(Complex64::new(f64::NAN, f64::INFINITY));
    let thth = forward_map(&ss, eta(), linear_edges(6.0, 50).view()).unwrap();
    assert!(thth.iter().all(|v| *v == Complex64::new(0.0, 0.0)));
}

#[test]
fn test_forward_map_keeps_finite_component_of_partial_nan() {
    let mut ss = random_spectrum(3);
    ss.data.fill(Complex64::new(f64::NAN, 1.0));
    let thth = forward_map(&ss, eta(), linear_edges(6.0, 50).view()).unwrap();
    let n = thth.nrows();

    assert!(thth.iter().all(|v| v.re == 0.0 && v.im.is_finite()));
    assert!(thth.iter().any(|v| v.im != 0.0));
    for i in 0..n {
        for j in 0..n {
            assert_eq!(thth[[i, j]], thth[[j, i]].conj());
        }
    }
}

#[test]
fn test_forward_map_rejects_bad_inputs() {
    let ss = random_spectrum(1);
    assert_eq!(
        forward_map(&ss, eta(), Array1::from_vec(vec![1.0]).view()).unwrap_err(),
        MappingError::TooFewEdges {
            expected: 2,
            got: 1
        }
    );

    let mut bad = ss.clone();
    bad.axes.fd = Array1::zeros(10);
    assert!(matches!(
        forward_map(&bad, eta(), linear_edges(6.0, 50).view()),
        Err(MappingError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_single_pixel_round_trip() {
    let axes = test_axes();
    let edges = linear_edges(6.0, 50);
    let centers = bin_centers(edges.view());
    let eta_value = 0.1;

    // Place one pixel where the pair (centers[30], centers[40]) samples
    let (theta2, theta1) = (centers[30], centers[40]);
    let t = AxisIndexer::new(axes.tau.view()).index(eta_value * (theta1 * theta1 - theta2 * theta2))
        as usize;
    let f = AxisIndexer::new(axes.fd.view()).index(theta1 - theta2) as usize;
    let value = Complex64::new(2.0, -1.5);

    let mut data = Array2::<Complex64>::zeros((64, 64));
    data[[t, f]] = value;
    let ss = SecondarySpectrum::new(data, axes.clone()).unwrap();

    let thth = forward_map(&ss, eta(), edges.view()).unwrap();
    assert!(thth[[30, 40]].norm() > 0.0);

    let recovered = inverse_map(thth.view(), &axes, eta(), edges.view(), false).unwrap();
    assert_eq!(recovered.dim(), (64, 64));
    assert_relative_eq!(recovered[[t, f]].re, value.re, epsilon = 1e-9);
    assert_relative_eq!(recovered[[t, f]].im, value.im, epsilon = 1e-9);

    // The conjugate half of the matrix lands at the mirrored bin
    assert_relative_eq!(recovered[[64 - t, 64 - f]].re, value.re, epsilon = 1e-9);
    assert_relative_eq!(recovered[[64 - t, 64 - f]].im, -value.im, epsilon = 1e-9);
    let occupied = recovered.iter().filter(|v| v.norm() > 1e-12).count();
    assert_eq!(occupied, 2);

    // Folding duplicates both halves, which leaves the bin means unchanged
    let folded = inverse_map(thth.view(), &axes, eta(), edges.view(), true).unwrap();
    for (a, b) in folded.iter().zip(recovered.iter()) {
        assert_relative_eq!(a.re, b.re, epsilon = 1e-9);
        assert_relative_eq!(a.im, b.im, epsilon = 1e-9);
    }
}

#[test]
fn test_inverse_map_rejects_wrong_matrix_size() {
    let edges = linear_edges(6.0, 50);
    let thth = Array2::<Complex64>::zeros((10, 10));
    assert_eq!(
        inverse_map(thth.view(), &test_axes(), eta(), edges.view(), false).unwrap_err(),
        MappingError::MatrixSizeMismatch {
            matrix: (10, 10),
            centers: 49
        }
    );
}

#[test]
fn test_reduced_domain_respects_spectrum_extent() {
    let ss = random_spectrum(11);
    let axes = &ss.axes;
    // Edges wider than the spectrum supports
    let edges = linear_edges(20.0, 80);
    let reduced = reduced_map(&ss, eta(), edges.view()).unwrap();

    let tau_max = axes.tau.iter().copied().fold(f64::NEG_INFINITY, f64::max).abs();
    let fd_max = axes.fd.iter().copied().fold(f64::NEG_INFINITY, f64::max).abs();

    let all_centers = bin_centers(edges.view());
    let keep = retained_bins(all_centers.view(), eta(), axes);
    assert!(keep.len() >= 3);
    assert!(keep.len() < all_centers.len());
    for &i in &keep {
        let theta = all_centers[i];
        assert!(0.1 * theta * theta < tau_max);
        assert!(theta.abs() < fd_max / 2.0);
    }

    let n = keep.len();
    assert_eq!(reduced.thth.dim(), (n, n));
    assert_eq!(reduced.edges.len(), n + 1);

    // The reduced block is the retained slice of the full map
    let full = forward_map(&ss, eta(), edges.view()).unwrap();
    for (a, &i) in keep.iter().enumerate() {
        for (b, &j) in keep.iter().enumerate() {
            assert_eq!(reduced.thth[[a, b]], full[[i, j]]);
        }
    }

    // Uniform retained centers are reproduced by the reduced edges
    let centers = reduced.centers();
    for (a, &i) in keep.iter().enumerate() {
        assert_relative_eq!(centers[a], all_centers[i], epsilon = 1e-9);
    }
}

#[test]
fn test_reduced_map_rejects_degenerate_curvature() {
    let ss = random_spectrum(5);
    let edges = linear_edges(6.0, 50);
    for bad in [0.0, -0.1, f64::NAN] {
        assert!(matches!(
            reduced_map(&ss, Curvature::from_us_per_mhz2(bad), edges.view()),
            Err(MappingError::DegenerateCurvature(_))
        ));
    }
}

#[test]
fn test_reduced_map_needs_three_bins() {
    let ss = random_spectrum(5);
    // Curvature so large that only theta = 0 fits under the delay limit
    let result = reduced_map(&ss, Curvature::from_us_per_mhz2(1e4), linear_edges(6.0, 50).view());
    assert_eq!(
        result.unwrap_err(),
        MappingError::ReducedDomainTooSmall { retained: 1 }
    );
}
