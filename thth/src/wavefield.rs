//! Screen and wavefield reconstruction from the dominant eigenpair.

use ndarray::{s, Array1, Array2, ArrayView1};
use num_complex::Complex64;

use crate::binning::{bin_centers, AxisIndexer};
use crate::eigen::DominantEigenpair;
use crate::fft::{fft2, fftshift, ifft2, ifftshift};
use crate::mapping::{inverse_map, MappingError};
use crate::model::ThetaThetaModel;
use crate::spectra::{DynamicSpectrum, SpectralAxes};
use crate::units::Curvature;

/// Complex screen amplitude per theta bin, `conj(V) sqrt(|w|)`
pub fn screen(pair: &DominantEigenpair) -> Array1<Complex64> {
    let scale = pair.magnitude().sqrt();
    pair.vector.mapv(|v| v.conj() * scale)
}

/// Place the screen on its arc in delay/Doppler space and transform back.
///
/// Bin `theta` lands at `(eta theta^2, theta)` using the same nearest-sample
/// rule as the forward map. Samples on or outside the first row/column, or
/// past the end, are dropped. Returns the complex field over the inverse
/// transform of `axes`.
pub fn screen_wavefield(
    pair: &DominantEigenpair,
    eta: Curvature,
    edges: ArrayView1<f64>,
    axes: &SpectralAxes,
) -> Result<Array2<Complex64>, MappingError> {
    let centers = bin_centers(edges);
    if centers.len() != pair.vector.len() {
        return Err(MappingError::MatrixSizeMismatch {
            matrix: (pair.vector.len(), pair.vector.len()),
            centers: centers.len(),
        });
    }

    let eta = eta.as_us_per_mhz2();
    let tau_index = AxisIndexer::new(axes.tau.view());
    let fd_index = AxisIndexer::new(axes.fd.view());
    let in_range = |index: i64, len: usize| (index > 0 && index < len as i64).then_some(index as usize);

    let mut field = Array2::<Complex64>::zeros(axes.dim());
    for (&theta, value) in centers.iter().zip(screen(pair).iter()) {
        let row = in_range(tau_index.index(eta * theta * theta), tau_index.len());
        let col = in_range(fd_index.index(theta), fd_index.len());
        if let (Some(row), Some(col)) = (row, col) {
            field[[row, col]] = *value;
        }
    }

    Ok(ifft2(&ifftshift(&field)))
}

/// Wavefield consistent with both the rank-1 model and the data amplitudes.
#[derive(Debug, Clone)]
pub struct RetrievedWavefield {
    /// Complex field over the data chunk, `[freq, time]`
    pub field: Array2<Complex64>,
    /// `|FFT(field)|^2` over the secondary-spectrum grid
    pub power: Array2<f64>,
    /// Mean power over the first quarter of delay rows
    pub noise_level: f64,
}

impl RetrievedWavefield {
    /// Phase of the field in radians
    pub fn phases(&self) -> Array2<f64> {
        self.field.mapv(|v| v.arg())
    }
}

/// Retrieve the wavefield of a chunk from its rank-1 model.
///
/// The central row of the reduced theta-theta matrix is replaced by the
/// screen and mapped back without the conjugate fold, giving a one-sided
/// field estimate. Its amplitude is then replaced by `sqrt(data)` wherever
/// the data is positive, keeping the model phase.
///
/// # Arguments
/// * `dspec` - Data chunk
/// * `model` - Rank-1 model of the chunk's secondary spectrum
/// * `axes` - Axes of that secondary spectrum
/// * `eta` - Curvature the model was built at
pub fn retrieve_wavefield(
    dspec: &DynamicSpectrum,
    model: &ThetaThetaModel,
    axes: &SpectralAxes,
    eta: Curvature,
) -> Result<RetrievedWavefield, MappingError> {
    let data = dspec.data();
    let (rows, cols) = data.dim();
    let (n_tau, n_fd) = axes.dim();
    if rows > n_tau || cols > n_fd {
        return Err(MappingError::ShapeMismatch {
            data: (rows, cols),
            axes: (n_tau, n_fd),
        });
    }

    let n = model.thth_reduced.nrows();
    let mut thth_e = Array2::<Complex64>::zeros((n, n));
    thth_e.row_mut(n / 2).assign(&screen(&model.eigenpair));

    let recovered = inverse_map(thth_e.view(), axes, eta, model.edges_reduced.view(), false)?;
    let full = ifft2(&ifftshift(&recovered));

    let scale = (rows * cols) as f64 / 4.0;
    let mut field = full.slice(s![..rows, ..cols]).mapv(|v| v * scale);
    ndarray::Zip::from(&mut field).and(data).for_each(|e, &d| {
        if d > 0.0 {
            *e = Complex64::from_polar(d.sqrt(), e.arg());
        }
    });

    let mut padded = Array2::<Complex64>::zeros(axes.dim());
    padded.slice_mut(s![..rows, ..cols]).assign(&field);
    let power = fftshift(&fft2(&padded)).mapv(|v| v.norm_sqr());

    let quarter = (power.nrows() / 4).max(1);
    let noise_level = power.slice(s![..quarter, ..]).mean().unwrap_or(0.0);

    Ok(RetrievedWavefield {
        field,
        power,
        noise_level,
    })
}
