//! Curvature search over one chunk of a dynamic spectrum
//!
//! The chunk is mean-padded and transformed once. Each candidate curvature
//! is scored by the dominant eigenvalue of its reduced theta-theta matrix;
//! a parabola fitted around the best candidate gives the curvature and its
//! uncertainty. Failures at any stage produce NaN estimates instead of
//! errors so chunk results always share one schema.

use std::path::PathBuf;

use log::{debug, info, warn};
use ndarray::Array1;

use crate::fit::{fit_parabola, FitError, Parabola, MIN_DATA_POINTS};
use crate::model::dominant_eigenvalue;
use crate::plot::{render_diagnostic, DiagnosticInputs};
use crate::spectra::{DynamicSpectrum, SecondarySpectrum};
use crate::units::{Curvature, Frequency, FrequencyExt, Time};

/// Tunables of a single curvature search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Number of evenly spaced candidate curvatures
    pub n_candidates: usize,
    /// Extra copies of each axis length appended as mean padding
    pub pad: usize,
    /// Half-width of the fit window as a fraction of the peak curvature
    pub fit_window: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_candidates: 100,
            pad: 3,
            fit_window: 0.1,
        }
    }
}

/// Everything one search needs, bundled for one-call-per-task dispatch.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Chunk of the dynamic spectrum with its own frequency and time axes
    pub dspec: DynamicSpectrum,
    pub eta_low: Curvature,
    pub eta_high: Curvature,
    /// Theta bin edges in mHz
    pub edges: Array1<f64>,
    /// Where the diagnostic figure goes when `plot` is set
    pub name: PathBuf,
    pub plot: bool,
    pub config: SearchConfig,
}

/// Eigenvalue as a function of curvature. NaN marks failed candidates.
#[derive(Debug, Clone, Default)]
pub struct EigenvalueCurve {
    pub etas: Vec<Curvature>,
    pub eigenvalues: Vec<f64>,
}

impl EigenvalueCurve {
    /// Only the candidates with finite eigenvalues
    pub fn finite(&self) -> Self {
        let (etas, eigenvalues) = self
            .etas
            .iter()
            .zip(&self.eigenvalues)
            .filter(|(_, w)| w.is_finite())
            .map(|(&eta, &w)| (eta, w))
            .unzip();
        Self { etas, eigenvalues }
    }

    pub fn len(&self) -> usize {
        self.etas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.etas.is_empty()
    }

    /// Candidate with the largest eigenvalue (first one on ties), ignoring NaN
    pub fn peak(&self) -> Option<(Curvature, f64)> {
        self.etas
            .iter()
            .zip(&self.eigenvalues)
            .filter(|(_, w)| w.is_finite())
            .fold(None, |best: Option<(Curvature, f64)>, (&eta, &w)| match best {
                Some((_, b)) if b >= w => best,
                _ => Some((eta, w)),
            })
    }
}

/// `n` curvatures evenly spaced over `[low, high]`
pub fn candidate_curvatures(low: Curvature, high: Curvature, n: usize) -> Vec<Curvature> {
    Array1::linspace(low.as_seconds_cubed(), high.as_seconds_cubed(), n)
        .iter()
        .map(|&v| Curvature::from_seconds_cubed(v))
        .collect()
}

/// Score every candidate. A candidate that fails scores NaN and the sweep
/// carries on.
pub fn eigenvalue_sweep(
    ss: &SecondarySpectrum,
    etas: &[Curvature],
    edges: &Array1<f64>,
) -> EigenvalueCurve {
    let eigenvalues = etas
        .iter()
        .map(|&eta| match dominant_eigenvalue(ss, eta, edges.view()) {
            Ok(w) => w,
            Err(e) => {
                debug!("Candidate eta = {eta} failed: {e}");
                f64::NAN
            }
        })
        .collect();

    EigenvalueCurve {
        etas: etas.to_vec(),
        eigenvalues,
    }
}

/// Parabola fitted to the eigenvalue peak
#[derive(Debug, Clone)]
pub struct CurvatureFit {
    pub eta: Curvature,
    pub sigma: Curvature,
    /// Fitted parabola in (s^3, eigenvalue) coordinates
    pub parabola: Parabola,
    /// Candidates inside the fit window
    pub window: EigenvalueCurve,
}

/// Fit `A (eta - x0)^2 + C` to the finite candidates within
/// `window_fraction * eta_peak` of the peak.
///
/// The uncertainty is `sqrt(std(residuals) / |A|)`.
pub fn fit_curvature(curve: &EigenvalueCurve, window_fraction: f64) -> Result<CurvatureFit, FitError> {
    let finite = curve.finite();
    let (peak_eta, _) = finite.peak().ok_or(FitError::InsufficientData {
        expected: MIN_DATA_POINTS,
        got: 0,
    })?;
    let peak = peak_eta.as_seconds_cubed();
    let half_width = window_fraction * peak;

    let (etas, eigenvalues) = finite
        .etas
        .iter()
        .zip(&finite.eigenvalues)
        .filter(|(eta, _)| (eta.as_seconds_cubed() - peak).abs() < half_width)
        .map(|(&eta, &w)| (eta, w))
        .unzip();
    let window = EigenvalueCurve { etas, eigenvalues };

    if window.len() < MIN_DATA_POINTS {
        return Err(FitError::InsufficientData {
            expected: MIN_DATA_POINTS,
            got: window.len(),
        });
    }

    let x: Vec<f64> = window.etas.iter().map(|e| e.as_seconds_cubed()).collect();
    let y = window.eigenvalues.clone();

    let (x0, c) = window
        .peak()
        .map(|(eta, w)| (eta.as_seconds_cubed(), w))
        .ok_or(FitError::NonFinite)?;
    // Slope from whichever end of the window is not the peak
    let (x_end, y_end) = if x0 == x[0] {
        (x[x.len() - 1], y[y.len() - 1])
    } else {
        (x[0], y[0])
    };
    let a = (y_end - c) / (x_end - x0).powi(2);

    let parabola = fit_parabola(&x, &y, Parabola::new(a, x0, c))?;

    let residuals = parabola.residuals(&x, &y);
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let std = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let sigma = (std / parabola.a.abs()).sqrt();

    Ok(CurvatureFit {
        eta: Curvature::from_seconds_cubed(parabola.x0),
        sigma: Curvature::from_seconds_cubed(sigma),
        parabola,
        window,
    })
}

/// Result of one chunk's search. `eta` and `sigma` are NaN when the
/// curvature could not be determined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvatureEstimate {
    pub eta: Curvature,
    pub sigma: Curvature,
    pub mean_frequency: Frequency,
    pub mean_time: Time,
}

impl CurvatureEstimate {
    pub fn is_determined(&self) -> bool {
        self.eta.is_finite() && self.sigma.is_finite()
    }
}

/// Run the full search for one chunk.
///
/// Never fails: candidate and fit failures become NaN, and a failing
/// diagnostic figure is only logged.
pub fn single_search(params: &SearchParams) -> CurvatureEstimate {
    let config = params.config;
    let ss = params.dspec.secondary_spectrum(config.pad);
    let etas = candidate_curvatures(params.eta_low, params.eta_high, config.n_candidates);
    let curve = eigenvalue_sweep(&ss, &etas, &params.edges);

    let fit = match fit_curvature(&curve, config.fit_window) {
        Ok(fit) => Some(fit),
        Err(e) => {
            warn!("Curvature fit failed: {e}");
            None
        }
    };

    if params.plot {
        let rendered = DiagnosticInputs::prepare(&params.dspec, &ss, &params.edges, &curve, fit.as_ref())
            .and_then(|inputs| render_diagnostic(&inputs, &params.name));
        if let Err(e) = rendered {
            warn!("Plotting error for {}: {e}", params.name.display());
        }
    }

    let (eta, sigma) = fit
        .map(|f| (f.eta, f.sigma))
        .unwrap_or((Curvature::nan(), Curvature::nan()));
    let mean_frequency = params.dspec.mean_frequency();

    info!(
        "Chunk completed (eta = {eta} ± {sigma} at {:.3} MHz)",
        mean_frequency.as_megahertz()
    );

    CurvatureEstimate {
        eta,
        sigma,
        mean_frequency,
        mean_time: params.dspec.mean_time(),
    }
}
