//! Dynamic and secondary spectrum containers.
//!
//! A [`DynamicSpectrum`] is stored with one row per frequency channel and
//! one column per time sample, so its 2D Fourier transform is indexed
//! `[tau, fd]` directly. The transform lives in a [`SecondarySpectrum`]
//! whose axes are plain `f64` in the working units of the mapping routines
//! (tau in microseconds, fd in millihertz).

use ndarray::{s, Array1, Array2};
use num_complex::Complex64;
use thiserror::Error;

use crate::fft::{fft2_real, fftshift, shifted_fftfreq};
use crate::units::{Frequency, FrequencyExt, Time, TimeExt};

/// Errors raised for malformed spectra or axes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    #[error("Data shape {data:?} does not match axes (frequency: {freqs}, time: {times})")]
    ShapeMismatch {
        data: (usize, usize),
        freqs: usize,
        times: usize,
    },

    #[error("{axis} axis needs at least 2 samples, got {len}")]
    AxisTooShort { axis: &'static str, len: usize },

    #[error("{axis} axis must be strictly ascending")]
    UnsortedAxis { axis: &'static str },

    #[error("{axis} range {start}..{end} is outside 0..{len}")]
    RangeOutOfBounds {
        axis: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

fn check_range(
    range: &std::ops::Range<usize>,
    len: usize,
    axis: &'static str,
) -> Result<(), SpectrumError> {
    if range.start > range.end || range.end > len {
        return Err(SpectrumError::RangeOutOfBounds {
            axis,
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}

/// Intensity as a function of observing frequency and time.
#[derive(Debug, Clone)]
pub struct DynamicSpectrum {
    data: Array2<f64>,
    freqs: Vec<Frequency>,
    times: Vec<Time>,
}

fn check_axis(values: &[f64], axis: &'static str) -> Result<(), SpectrumError> {
    if values.len() < 2 {
        return Err(SpectrumError::AxisTooShort {
            axis,
            len: values.len(),
        });
    }
    if values.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(SpectrumError::UnsortedAxis { axis });
    }
    Ok(())
}

impl DynamicSpectrum {
    /// Build a dynamic spectrum from `data[channel, sample]` and its axes.
    ///
    /// Axes must be ascending with at least two samples each; the spacing is
    /// assumed uniform (the first step is used by the transform).
    pub fn new(
        data: Array2<f64>,
        freqs: Vec<Frequency>,
        times: Vec<Time>,
    ) -> Result<Self, SpectrumError> {
        if data.dim() != (freqs.len(), times.len()) {
            return Err(SpectrumError::ShapeMismatch {
                data: data.dim(),
                freqs: freqs.len(),
                times: times.len(),
            });
        }
        let f: Vec<f64> = freqs.iter().map(|f| f.as_megahertz()).collect();
        check_axis(&f, "frequency")?;
        let t: Vec<f64> = times.iter().map(|t| t.as_seconds()).collect();
        check_axis(&t, "time")?;

        Ok(Self { data, freqs, times })
    }

    /// Uniformly sampled axes starting at `freq_start` and `time_start`
    pub fn from_uniform(
        data: Array2<f64>,
        freq_start: Frequency,
        channel_width: Frequency,
        time_start: Time,
        sample_time: Time,
    ) -> Result<Self, SpectrumError> {
        let (n_freq, n_time) = data.dim();
        let freqs = (0..n_freq)
            .map(|i| freq_start + channel_width * i as f64)
            .collect();
        let times = (0..n_time)
            .map(|i| time_start + sample_time * i as f64)
            .collect();
        Self::new(data, freqs, times)
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn freqs(&self) -> &[Frequency] {
        &self.freqs
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Number of (frequency channels, time samples)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn mean_frequency(&self) -> Frequency {
        let sum: f64 = self.freqs.iter().map(|f| f.as_megahertz()).sum();
        Frequency::from_megahertz(sum / self.freqs.len() as f64)
    }

    pub fn mean_time(&self) -> Time {
        let sum: f64 = self.times.iter().map(|t| t.as_seconds()).sum();
        Time::from_seconds(sum / self.times.len() as f64)
    }

    /// Copy out the sub-spectrum covering `channels` x `samples`.
    pub fn slice(
        &self,
        channels: std::ops::Range<usize>,
        samples: std::ops::Range<usize>,
    ) -> Result<Self, SpectrumError> {
        let (n_freq, n_time) = self.dim();
        check_range(&channels, n_freq, "frequency")?;
        check_range(&samples, n_time, "time")?;
        let data = self
            .data
            .slice(s![channels.clone(), samples.clone()])
            .to_owned();
        Self::new(
            data,
            self.freqs[channels].to_vec(),
            self.times[samples].to_vec(),
        )
    }

    /// Delay axis (us) of the transform after padding by `pad` extra copies
    pub fn tau_axis(&self, pad: usize) -> Array1<f64> {
        let df_mhz = self.freqs[1].as_megahertz() - self.freqs[0].as_megahertz();
        // 1 / MHz = 1 us
        shifted_fftfreq((pad + 1) * self.freqs.len(), df_mhz)
    }

    /// Doppler axis (mHz) of the transform after padding by `pad` extra copies
    pub fn fd_axis(&self, pad: usize) -> Array1<f64> {
        let dt_s = self.times[1].as_seconds() - self.times[0].as_seconds();
        shifted_fftfreq((pad + 1) * self.times.len(), dt_s).mapv(|hz| hz * 1e3)
    }

    /// Pad by `pad` extra copies of each axis length, filled with the mean.
    pub fn padded(&self, pad: usize) -> Array2<f64> {
        let (n_freq, n_time) = self.data.dim();
        let mean = self.data.mean().unwrap_or(0.0);
        let mut out = Array2::from_elem(((pad + 1) * n_freq, (pad + 1) * n_time), mean);
        out.slice_mut(s![..n_freq, ..n_time]).assign(&self.data);
        out
    }

    /// Mean-pad, transform and center the zero delay/Doppler bin.
    pub fn secondary_spectrum(&self, pad: usize) -> SecondarySpectrum {
        let data = fftshift(&fft2_real(&self.padded(pad)));
        SecondarySpectrum {
            data,
            axes: SpectralAxes {
                tau: self.tau_axis(pad),
                fd: self.fd_axis(pad),
            },
        }
    }
}

/// Delay and Doppler axes of a secondary spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralAxes {
    /// Delay in microseconds, ascending, zero at index `len / 2`
    pub tau: Array1<f64>,
    /// Doppler frequency in millihertz, ascending, zero at index `len / 2`
    pub fd: Array1<f64>,
}

impl SpectralAxes {
    pub fn new(tau: Array1<f64>, fd: Array1<f64>) -> Self {
        Self { tau, fd }
    }

    /// Shape of a secondary spectrum over these axes, `(tau, fd)`
    pub fn dim(&self) -> (usize, usize) {
        (self.tau.len(), self.fd.len())
    }

    /// Mean delay step
    pub fn dtau(&self) -> f64 {
        mean_step(&self.tau)
    }

    /// Mean Doppler step
    pub fn dfd(&self) -> f64 {
        mean_step(&self.fd)
    }
}

fn mean_step(axis: &Array1<f64>) -> f64 {
    let n = axis.len();
    if n < 2 {
        return f64::NAN;
    }
    (axis[n - 1] - axis[0]) / (n - 1) as f64
}

/// Complex secondary spectrum indexed `[tau, fd]` with (0, 0) at the center.
#[derive(Debug, Clone)]
pub struct SecondarySpectrum {
    pub data: Array2<Complex64>,
    pub axes: SpectralAxes,
}

impl SecondarySpectrum {
    /// Pair a spectrum with its axes, checking the shapes agree.
    pub fn new(data: Array2<Complex64>, axes: SpectralAxes) -> Result<Self, SpectrumError> {
        if data.dim() != axes.dim() {
            return Err(SpectrumError::ShapeMismatch {
                data: data.dim(),
                freqs: axes.tau.len(),
                times: axes.fd.len(),
            });
        }
        check_axis(&axes.tau.to_vec(), "tau")?;
        check_axis(&axes.fd.to_vec(), "fd")?;
        Ok(Self { data, axes })
    }

    /// Power `|SS|^2`
    pub fn power(&self) -> Array2<f64> {
        self.data.mapv(|v| v.norm_sqr())
    }
}
