//! Diagnostic figure for one chunk's curvature search
//!
//! Every value the figure shows is gathered into [`DiagnosticInputs`] first,
//! so rendering reads nothing but its arguments. The layout is a 5 x 2 grid:
//!
//! ```text
//! data dynamic spectrum    | model dynamic spectrum
//! data secondary spectrum  | model secondary spectrum
//! data theta-theta         | model theta-theta
//! eigenvalue search curve with fitted parabola
//! recovered phases         | recovered wavefield power
//! ```

use std::path::Path;

use ndarray::{s, Array2};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use thiserror::Error;

use crate::mapping::MappingError;
use crate::model::{model, ModelError, ThetaThetaModel};
use crate::search::{CurvatureFit, EigenvalueCurve};
use crate::spectra::{DynamicSpectrum, SecondarySpectrum};
use crate::units::{Curvature, FrequencyExt, TimeExt};
use crate::wavefield::{retrieve_wavefield, RetrievedWavefield};

/// Errors raised while preparing or drawing the figure
#[derive(Error, Debug)]
pub enum PlotError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("No finite eigenvalues to plot")]
    EmptyCurve,

    #[error("Drawing failed: {0}")]
    Drawing(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for PlotError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(e.to_string())
    }
}

/// Figure size in pixels, two columns by five rows
const FIGURE_SIZE: (u32, u32) = (800, 2000);

/// Decades of dynamic range shown on logarithmic panels
const LOG_DECADES: f64 = 2.0;

/// Everything shown in the diagnostic figure.
pub struct DiagnosticInputs<'a> {
    pub dspec: &'a DynamicSpectrum,
    pub ss: &'a SecondarySpectrum,
    /// Finite part of the eigenvalue search
    pub curve: EigenvalueCurve,
    pub fit: Option<&'a CurvatureFit>,
    /// Curvature the model panels were built at
    pub eta: Curvature,
    pub model: ThetaThetaModel,
    pub wavefield: RetrievedWavefield,
    /// Doppler half-range of the secondary-spectrum panels, mHz
    pub fd_limit: f64,
}

impl<'a> DiagnosticInputs<'a> {
    /// Build the model and wavefield panels for a finished search.
    ///
    /// The model is evaluated at the fitted curvature, or at the mean of the
    /// finite candidates when the fit failed.
    pub fn prepare(
        dspec: &'a DynamicSpectrum,
        ss: &'a SecondarySpectrum,
        edges: &ndarray::Array1<f64>,
        curve: &EigenvalueCurve,
        fit: Option<&'a CurvatureFit>,
    ) -> Result<Self, PlotError> {
        let curve = curve.finite();
        let eta = match fit {
            Some(f) => f.eta,
            None => {
                if curve.is_empty() {
                    return Err(PlotError::EmptyCurve);
                }
                let sum: f64 = curve.etas.iter().map(|e| e.as_seconds_cubed()).sum();
                Curvature::from_seconds_cubed(sum / curve.len() as f64)
            }
        };

        let model = model(ss, eta, edges.view(), None)?;
        let wavefield = retrieve_wavefield(dspec, &model, &ss.axes, eta)?;

        let edge_max = edges.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let fd_max = ss.axes.fd.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            dspec,
            ss,
            curve,
            fit,
            eta,
            model,
            wavefield,
            fd_limit: (2.0 * edge_max).min(fd_max),
        })
    }
}

/// Extent of an image panel: (x range, y range)
type Extent = ((f64, f64), (f64, f64));

/// Pixel-edge extent of samples on uniform axes
fn extent(x: &[f64], y: &[f64]) -> Extent {
    let half_step = |v: &[f64]| {
        if v.len() > 1 {
            (v[v.len() - 1] - v[0]) / (v.len() - 1) as f64 / 2.0
        } else {
            0.5
        }
    };
    let (hx, hy) = (half_step(x), half_step(y));
    (
        (x[0] - hx, x[x.len() - 1] + hx),
        (y[0] - hy, y[y.len() - 1] + hy),
    )
}

fn intensity_color(v: f64) -> HSLColor {
    // Dark blue through green to yellow
    HSLColor(0.66 - 0.5 * v, 0.85, 0.15 + 0.5 * v)
}

fn phase_color(v: f64) -> HSLColor {
    // Cyclic hue so -pi and pi meet
    HSLColor(v, 0.6, 0.5)
}

/// `log10` of `values` scaled to [0, 1] over the top `LOG_DECADES` decades
fn log_scaled(values: &Array2<f64>, peak: f64) -> Array2<f64> {
    let top = peak.log10();
    values.mapv(|v| {
        let l = (v.log10() - (top - LOG_DECADES)) / LOG_DECADES;
        if l.is_finite() {
            l.clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

fn linear_scaled(values: &Array2<f64>, low: f64, high: f64) -> Array2<f64> {
    let span = if high > low { high - low } else { 1.0 };
    values.mapv(|v| {
        let l = (v - low) / span;
        if l.is_finite() {
            l.clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

struct Panel<'t> {
    title: &'t str,
    x_desc: &'t str,
    y_desc: &'t str,
}

/// Draw `image` (row = y, column = x, origin at the bottom) with values
/// already scaled to [0, 1], cropped to `view`.
fn draw_image(
    area: &DrawingArea<BitMapBackend, Shift>,
    panel: Panel,
    image: &Array2<f64>,
    full: Extent,
    view: Extent,
    color: fn(f64) -> HSLColor,
) -> Result<(), PlotError> {
    let ((x0, x1), (y0, y1)) = full;
    let (rows, cols) = image.dim();
    let dx = (x1 - x0) / cols as f64;
    let dy = (y1 - y0) / rows as f64;
    let ((vx0, vx1), (vy0, vy1)) = view;

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(vx0..vx1, vy0..vy1)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(panel.x_desc)
        .y_desc(panel.y_desc)
        .draw()?;

    chart.draw_series(image.indexed_iter().filter_map(|((r, c), &v)| {
        let (left, bottom) = (x0 + c as f64 * dx, y0 + r as f64 * dy);
        let (right, top) = (left + dx, bottom + dy);
        if right < vx0 || left > vx1 || top < vy0 || bottom > vy1 {
            return None;
        }
        Some(Rectangle::new(
            [(left.max(vx0), bottom.max(vy0)), (right.min(vx1), top.min(vy1))],
            color(v).filled(),
        ))
    }))?;

    Ok(())
}

/// Format `value ± sigma` with as many significant digits as the
/// uncertainty supports.
pub fn format_with_uncertainty(value: f64, sigma: f64) -> (String, String) {
    let exponent = |v: f64| v.abs().log10().floor() as i32;
    let digits = if value != 0.0 && sigma > 0.0 && sigma.is_finite() {
        (exponent(value) - exponent(sigma)).max(0) as usize
    } else {
        2
    };
    (format!("{value:.digits$e}"), format!("{sigma:.1e}"))
}

fn draw_search_curve(
    area: &DrawingArea<BitMapBackend, Shift>,
    curve: &EigenvalueCurve,
    fit: Option<&CurvatureFit>,
) -> Result<(), PlotError> {
    let points: Vec<(f64, f64)> = curve
        .etas
        .iter()
        .zip(&curve.eigenvalues)
        .map(|(e, &w)| (e.as_seconds_cubed(), w))
        .collect();
    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let y_pad = ((y_max - y_min) * 0.05).max(f64::EPSILON);

    let mut chart = ChartBuilder::on(area)
        .caption("Eigenvalue Search", ("sans-serif", 18))
        .margin(5)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max.max(x_min + f64::EPSILON), (y_min - y_pad)..(y_max + y_pad))?;

    chart
        .configure_mesh()
        .x_desc("η (s³)")
        .y_desc("Largest Eigenvalue")
        .x_label_formatter(&|x| format!("{x:.2e}"))
        .y_label_formatter(&|y| format!("{y:.2e}"))
        .draw()?;

    chart.draw_series(LineSeries::new(points, &BLUE))?;

    if let Some(fit) = fit {
        let (eta_text, sigma_text) =
            format_with_uncertainty(fit.eta.as_seconds_cubed(), fit.sigma.as_seconds_cubed());
        let fitted: Vec<(f64, f64)> = fit
            .window
            .etas
            .iter()
            .map(|e| {
                let x = e.as_seconds_cubed();
                (x, fit.parabola.eval(x))
            })
            .collect();
        chart
            .draw_series(LineSeries::new(fitted, RED.stroke_width(2)))?
            .label(format!("η = {eta_text} ± {sigma_text} s³"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    Ok(())
}

/// Render the diagnostic figure to `path` (PNG).
pub fn render_diagnostic(inputs: &DiagnosticInputs, path: &Path) -> Result<(), PlotError> {
    let dspec = inputs.dspec;
    let (n_freq, n_time) = dspec.dim();
    let minutes: Vec<f64> = dspec.times().iter().map(|t| t.as_minutes()).collect();
    let mhz: Vec<f64> = dspec.freqs().iter().map(|f| f.as_megahertz()).collect();
    let dspec_extent = extent(&minutes, &mhz);

    let ss_axes = &inputs.ss.axes;
    let ss_extent = extent(&ss_axes.fd.to_vec(), &ss_axes.tau.to_vec());
    let tau_top = ss_extent.1 .1;
    let ss_view = ((-inputs.fd_limit, inputs.fd_limit), (0.0, tau_top));

    let edges = &inputs.model.edges_reduced;
    let thth_extent = (
        (edges[0], edges[edges.len() - 1]),
        (edges[0], edges[edges.len() - 1]),
    );

    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let rows = root.split_evenly((5, 1));

    // Row 0: dynamic spectra on a common linear scale
    let top = rows[0].split_evenly((1, 2));
    let d_max = dspec.data().iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let model_dspec = inputs.model.model_dspec.slice(s![..n_freq, ..n_time]).to_owned();
    for (area, image, title) in [
        (&top[0], dspec.data().clone(), "Data Dynamic Spectrum"),
        (&top[1], model_dspec, "Model Dynamic Spectrum"),
    ] {
        draw_image(
            area,
            Panel {
                title,
                x_desc: "Time (min)",
                y_desc: "Freq (MHz)",
            },
            &linear_scaled(&image, 0.0, d_max),
            dspec_extent,
            dspec_extent,
            intensity_color,
        )?;
    }

    // Row 1: secondary spectra, both scaled to the data peak
    let second = rows[1].split_evenly((1, 2));
    let ss_power = inputs.ss.power();
    let ss_peak = ss_power.iter().copied().fold(0.0, f64::max);
    let model_power = inputs.model.recovered.mapv(|v| v.norm_sqr());
    for (area, image, title) in [
        (&second[0], &ss_power, "Data Secondary Spectrum"),
        (&second[1], &model_power, "Model Secondary Spectrum"),
    ] {
        draw_image(
            area,
            Panel {
                title,
                x_desc: "fD (mHz)",
                y_desc: "τ (us)",
            },
            &log_scaled(image, ss_peak),
            ss_extent,
            ss_view,
            intensity_color,
        )?;
    }

    // Row 2: theta-theta, both scaled to the data peak
    let third = rows[2].split_evenly((1, 2));
    let thth_power = inputs.model.thth_reduced.mapv(|v| v.norm_sqr());
    let thth_peak = thth_power.iter().copied().fold(0.0, f64::max);
    let thth_model_power = inputs.model.thth_model.mapv(|v| v.norm_sqr());
    for (area, image, title) in [
        (&third[0], &thth_power, "Data θ-θ"),
        (&third[1], &thth_model_power, "Model θ-θ"),
    ] {
        draw_image(
            area,
            Panel {
                title,
                x_desc: "θ1",
                y_desc: "θ2",
            },
            &log_scaled(image, thth_peak),
            thth_extent,
            thth_extent,
            intensity_color,
        )?;
    }

    // Row 3: eigenvalue search
    draw_search_curve(&rows[3], &inputs.curve, inputs.fit)?;

    // Row 4: recovered wavefield
    let bottom = rows[4].split_evenly((1, 2));
    let phases = inputs
        .wavefield
        .phases()
        .mapv(|p| (p + std::f64::consts::PI) / (2.0 * std::f64::consts::PI));
    draw_image(
        &bottom[0],
        Panel {
            title: "Recovered Phases",
            x_desc: "Time (min)",
            y_desc: "Freq (MHz)",
        },
        &phases,
        dspec_extent,
        dspec_extent,
        phase_color,
    )?;

    let power = &inputs.wavefield.power;
    let power_peak = power.iter().copied().fold(0.0, f64::max);
    draw_image(
        &bottom[1],
        Panel {
            title: "Recovered Wavefield",
            x_desc: "fD (mHz)",
            y_desc: "τ (us)",
        },
        &log_scaled(power, power_peak),
        ss_extent,
        ((-inputs.fd_limit, inputs.fd_limit), ss_extent.1),
        intensity_color,
    )?;

    root.present()?;
    log::debug!("Diagnostic figure written to {}", path.display());
    Ok(())
}
