//! Split a long dynamic spectrum into chunks and search each one.
//!
//! Chunks are independent, so the searches run on the rayon pool. Results
//! come back in chunk order (frequency-major) regardless of scheduling.

use std::path::{Path, PathBuf};

use ndarray::Array1;
use rayon::prelude::*;

use crate::search::{single_search, CurvatureEstimate, SearchConfig, SearchParams};
use crate::spectra::{DynamicSpectrum, SpectrumError};
use crate::units::Curvature;

/// Chunk size in frequency channels and time samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub channels: usize,
    pub samples: usize,
}

impl ChunkLayout {
    pub fn new(channels: usize, samples: usize) -> Self {
        Self { channels, samples }
    }

    /// Number of whole chunks along (frequency, time). Remainders are dropped.
    pub fn grid(&self, dspec: &DynamicSpectrum) -> (usize, usize) {
        let (n_freq, n_time) = dspec.dim();
        if self.channels == 0 || self.samples == 0 {
            return (0, 0);
        }
        (n_freq / self.channels, n_time / self.samples)
    }

    /// Cut out chunk `(fi, ti)`
    pub fn chunk(&self, dspec: &DynamicSpectrum, fi: usize, ti: usize) -> Result<DynamicSpectrum, SpectrumError> {
        let f0 = fi * self.channels;
        let t0 = ti * self.samples;
        dspec.slice(f0..f0 + self.channels, t0..t0 + self.samples)
    }
}

/// One `SearchParams` per chunk, frequency-major.
///
/// Figures are named `<prefix>_<fi>_<ti>.png` inside `plot_dir`.
#[allow(clippy::too_many_arguments)]
pub fn chunk_params(
    dspec: &DynamicSpectrum,
    layout: ChunkLayout,
    eta_low: Curvature,
    eta_high: Curvature,
    edges: &Array1<f64>,
    plot_dir: &Path,
    prefix: &str,
    plot: bool,
    config: SearchConfig,
) -> Result<Vec<SearchParams>, SpectrumError> {
    let (n_f, n_t) = layout.grid(dspec);
    let mut params = Vec::with_capacity(n_f * n_t);
    for fi in 0..n_f {
        for ti in 0..n_t {
            params.push(SearchParams {
                dspec: layout.chunk(dspec, fi, ti)?,
                eta_low,
                eta_high,
                edges: edges.clone(),
                name: plot_name(plot_dir, prefix, fi, ti),
                plot,
                config,
            });
        }
    }
    Ok(params)
}

fn plot_name(dir: &Path, prefix: &str, fi: usize, ti: usize) -> PathBuf {
    dir.join(format!("{prefix}_{fi}_{ti}.png"))
}

/// Search every chunk, in parallel unless `parallel` is false.
///
/// `on_done` is called once per finished chunk, from whichever thread ran it.
pub fn run_chunks<F>(params: &[SearchParams], parallel: bool, on_done: F) -> Vec<CurvatureEstimate>
where
    F: Fn() + Sync,
{
    let search = |p: &SearchParams| {
        let estimate = single_search(p);
        on_done();
        estimate
    };

    if parallel {
        params.par_iter().map(search).collect()
    } else {
        params.iter().map(search).collect()
    }
}
