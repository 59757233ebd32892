//! Synthetic thin-screen scintillation
//!
//! A one-dimensional screen of point images at angles `theta_k` (expressed
//! as Doppler frequencies) with complex magnifications `mu_k` gives the
//! electric field
//!
//! `E(f, t) = sum_k mu_k exp(2 pi i (theta_k t + eta theta_k^2 f))`
//!
//! whose intensity `|E|^2` is the dynamic spectrum. Every image pair then
//! interferes at exactly the delay and Doppler frequency the theta-theta
//! transform expects, which makes these spectra the reference input for
//! curvature recovery tests and for the `--synthetic-eta` mode of the binary.

use std::f64::consts::PI;

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use thiserror::Error;

use crate::spectra::{DynamicSpectrum, SpectrumError};
use crate::units::{Curvature, Frequency, FrequencyExt, Time, TimeExt};

/// Errors from the synthetic generators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntheticError {
    #[error(transparent)]
    Spectrum(#[from] SpectrumError),

    #[error("Noise level must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
}

/// One point image on the screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenImage {
    /// Angular position expressed as the Doppler frequency it induces
    pub theta: Frequency,
    /// Complex magnification
    pub amplitude: Complex64,
}

impl ScreenImage {
    pub fn new(theta: Frequency, amplitude: Complex64) -> Self {
        Self { theta, amplitude }
    }
}

/// Dynamic spectrum `|E(f, t)|^2` of a screen of images at curvature `eta`.
pub fn synthetic_dynamic_spectrum(
    images: &[ScreenImage],
    eta: Curvature,
    freqs: &[Frequency],
    times: &[Time],
) -> Result<DynamicSpectrum, SyntheticError> {
    let eta_us = eta.as_us_per_mhz2();
    let f_mhz: Vec<f64> = freqs.iter().map(|f| f.as_megahertz()).collect();
    let t_s: Vec<f64> = times.iter().map(|t| t.as_seconds()).collect();

    // Per image: Doppler rate in Hz and delay in us
    let terms: Vec<(Complex64, f64, f64)> = images
        .iter()
        .map(|img| {
            let theta = img.theta.as_millihertz();
            (img.amplitude, theta * 1e-3, eta_us * theta * theta)
        })
        .collect();

    let data = Array2::from_shape_fn((f_mhz.len(), t_s.len()), |(fi, ti)| {
        let field: Complex64 = terms
            .iter()
            .map(|&(mu, fd_hz, tau_us)| {
                mu * Complex64::from_polar(1.0, 2.0 * PI * (fd_hz * t_s[ti] + tau_us * f_mhz[fi]))
            })
            .sum();
        field.norm_sqr()
    });

    Ok(DynamicSpectrum::new(data, freqs.to_vec(), times.to_vec())?)
}

/// A screen with a unit image at `theta = 0` plus `n` weaker images
/// scattered uniformly over `[-theta_max, theta_max]`, their amplitudes
/// falling off away from the origin.
pub fn random_screen(n: usize, theta_max: Frequency, seed: u64) -> Vec<ScreenImage> {
    let mut rng = StdRng::seed_from_u64(seed);
    let max = theta_max.as_millihertz();

    let mut images = vec![ScreenImage::new(
        Frequency::from_millihertz(0.0),
        Complex64::new(1.0, 0.0),
    )];
    images.extend((0..n).map(|_| {
        let theta = rng.random_range(-max..=max);
        let magnitude = 0.5 * (-(theta / max).abs()).exp() * rng.random_range(0.2..1.0);
        let phase = rng.random_range(0.0..2.0 * PI);
        ScreenImage::new(
            Frequency::from_millihertz(theta),
            Complex64::from_polar(magnitude, phase),
        )
    }));
    images
}

/// Add white Gaussian noise of standard deviation `sigma`.
pub fn add_noise(
    dspec: &DynamicSpectrum,
    sigma: f64,
    seed: u64,
) -> Result<DynamicSpectrum, SyntheticError> {
    if !(sigma.is_finite() && sigma >= 0.0) {
        return Err(SyntheticError::InvalidNoise(sigma));
    }
    let normal = Normal::new(0.0, sigma).map_err(|_| SyntheticError::InvalidNoise(sigma))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let noisy = dspec.data().mapv(|v| v + normal.sample(&mut rng));
    Ok(DynamicSpectrum::new(
        noisy,
        dspec.freqs().to_vec(),
        dspec.times().to_vec(),
    )?)
}
