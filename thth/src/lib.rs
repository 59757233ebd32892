//! Theta-theta analysis of pulsar scintillation spectra
//!
//! A dynamic spectrum (intensity over observing frequency and time) is
//! Fourier transformed into a secondary spectrum over delay and Doppler
//! frequency. Scattering from a thin screen puts power on the parabola
//! `tau = eta * fd^2`, and remapping the secondary spectrum onto pairs of
//! screen angles (the theta-theta plane) turns that power into a nearly
//! rank-1 Hermitian matrix when `eta` is right. This crate provides the
//! mappings between the three spaces, the rank-1 model built from the
//! dominant eigenpair, and the curvature search that maximizes the dominant
//! eigenvalue over a range of `eta`.
//!
//! # Working units
//!
//! Mapping routines take plain `f64` axes: delay in microseconds, Doppler
//! frequency and theta in millihertz. In those units a curvature in
//! us/mHz^2 equals seconds cubed; see [`units::Curvature`].

pub mod binning;
pub mod chunking;
pub mod eigen;
pub mod fft;
pub mod fit;
pub mod io;
pub mod mapping;
pub mod model;
pub mod plot;
pub mod range_arg;
pub mod search;
pub mod spectra;
pub mod synthetic;
pub mod units;
pub mod wavefield;

pub use binning::{arc_length_edges, bin_centers, linear_edges, EdgeSpec};
pub use chunking::{chunk_params, run_chunks, ChunkLayout};
pub use eigen::{dominant_eigenpair, DominantEigenpair};
pub use mapping::{forward_map, inverse_map, reduced_map, MappingError, ReducedThetaTheta};
pub use model::{model, ThetaThetaModel};
pub use search::{single_search, CurvatureEstimate, SearchConfig, SearchParams};
pub use spectra::{DynamicSpectrum, SecondarySpectrum, SpectralAxes};
pub use units::Curvature;
