//! Theta binning and the discretization shared by the mapping routines.
//!
//! Theta edges are 1D, ascending and symmetric about zero, in millihertz.
//! Two constructions are provided: evenly spaced edges and edges spaced at
//! equal arc length along the parabola `tau = eta * theta^2`, which keeps the
//! angular resolution uniform where the quadratic map stretches the plane.

use ndarray::{Array1, ArrayView1};

use crate::spectra::SpectralAxes;
use crate::units::{Curvature, Frequency, FrequencyExt, Time, TimeExt};

/// Midpoints of consecutive edges, shifted so the center nearest zero is
/// exactly zero. Ties go to the first (lowest index) candidate.
pub fn bin_centers(edges: ArrayView1<f64>) -> Array1<f64> {
    if edges.len() < 2 {
        return Array1::zeros(0);
    }
    let centers: Array1<f64> = edges
        .windows(2)
        .into_iter()
        .map(|w| (w[0] + w[1]) / 2.0)
        .collect();

    let offset = centers
        .iter()
        .copied()
        .fold(None, |best: Option<f64>, c| match best {
            Some(b) if b.abs() <= c.abs() => Some(b),
            _ => Some(c),
        })
        .unwrap_or(0.0);

    centers.mapv(|c| c - offset)
}

/// `n` edges evenly spaced over `[-max, max]`
pub fn linear_edges(max: f64, n: usize) -> Array1<f64> {
    Array1::linspace(-max, max, n)
}

/// Arc length of the parabola `y = (a/2) x^2` from 0 to `x`, with `a = 2 * eta`.
pub fn arc_length(x: f64, eta: f64) -> f64 {
    let a = 2.0 * eta;
    if a == 0.0 {
        return x;
    }
    let ax = a * x;
    (ax * (ax * ax + 1.0).sqrt() + ax.asinh()) / (2.0 * a)
}

/// Theta edges with equal arc length per bin along `tau = eta * theta^2`.
///
/// Positions are built in units of one Doppler bin, stepping each edge
/// forward by `dl / sqrt(1 + (2 eta x)^2)` (first order in the local slope)
/// until `n / 2` positive edges exist, then mirrored to the negative side.
/// The returned edges are in millihertz.
///
/// # Arguments
/// * `eta` - Curvature of the arc
/// * `dfd` - Doppler resolution of the secondary spectrum
/// * `dtau` - Delay resolution of the secondary spectrum
/// * `fd_max` - Largest Doppler frequency the edges should reach
/// * `n` - Number of edges (an odd `n` is rounded down to even)
pub fn arc_length_edges(
    eta: Curvature,
    dfd: Frequency,
    dtau: Time,
    fd_max: Frequency,
    n: usize,
) -> Array1<f64> {
    let half = n / 2;
    if half == 0 {
        return Array1::zeros(0);
    }

    let dfd_mhz = dfd.as_millihertz();
    let x_max = fd_max.as_millihertz() / dfd_mhz;
    // Curvature in pixel units of the secondary spectrum
    let eta_px = dfd_mhz * dfd_mhz * eta.as_us_per_mhz2() / dtau.as_microseconds();

    let l_max = arc_length(x_max, eta_px);
    let dl = l_max / (half as f64 - 0.5);

    let positive: Vec<f64> = std::iter::successors(Some(dl / 2.0), |&x| {
        Some(x + dl / (1.0 + (2.0 * eta_px * x).powi(2)).sqrt())
    })
    .take(half)
    .collect();

    positive
        .iter()
        .rev()
        .map(|&x| -x * dfd_mhz)
        .chain(positive.iter().map(|&x| x * dfd_mhz))
        .collect()
}

/// Edges at the midpoints of `centers`, extrapolated by one mean spacing
/// past each end. Uniform centers are reproduced exactly by [`bin_centers`].
/// Needs at least 3 centers.
pub fn edges_from_centers(centers: ArrayView1<f64>) -> Option<Array1<f64>> {
    if centers.len() < 3 {
        return None;
    }
    let mids: Vec<f64> = centers
        .windows(2)
        .into_iter()
        .map(|w| (w[0] + w[1]) / 2.0)
        .collect();
    let spacing = (mids[mids.len() - 1] - mids[0]) / (mids.len() - 1) as f64;

    let mut edges = Vec::with_capacity(mids.len() + 2);
    edges.push(mids[0] - spacing);
    edges.extend_from_slice(&mids);
    edges.push(mids[mids.len() - 1] + spacing);
    Some(Array1::from_vec(edges))
}

/// How theta edges are laid out for a search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeSpec {
    /// `n` evenly spaced edges over `[-max, max]`
    Linear { max: Frequency, n: usize },
    /// `n` equal-arc-length edges along the parabola at `eta`, out to `fd_max`
    ArcLength {
        eta: Curvature,
        fd_max: Frequency,
        n: usize,
    },
}

impl EdgeSpec {
    /// Edges in millihertz for a secondary spectrum over `axes`.
    pub fn build(&self, axes: &SpectralAxes) -> Array1<f64> {
        match *self {
            EdgeSpec::Linear { max, n } => linear_edges(max.as_millihertz(), n),
            EdgeSpec::ArcLength { eta, fd_max, n } => arc_length_edges(
                eta,
                Frequency::from_millihertz(axes.dfd()),
                Time::from_microseconds(axes.dtau()),
                fd_max,
                n,
            ),
        }
    }
}

/// Nearest-sample lookup on a uniformly spaced ascending axis.
///
/// Indices are floor-rounded so a value sitting half a step above a sample
/// lands in the next one. Results may be negative or past the end; callers
/// decide what is in range.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisIndexer {
    start: f64,
    step: f64,
    len: usize,
}

impl AxisIndexer {
    pub(crate) fn new(axis: ArrayView1<f64>) -> Self {
        let len = axis.len();
        let step = if len > 1 {
            (axis[len - 1] - axis[0]) / (len - 1) as f64
        } else {
            f64::NAN
        };
        Self {
            start: axis.first().copied().unwrap_or(0.0),
            step,
            len,
        }
    }

    pub(crate) fn index(&self, value: f64) -> i64 {
        ((value - self.start + self.step / 2.0) / self.step).floor() as i64
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_bin_centers_symmetric_edges() {
        let edges = linear_edges(3.0, 8);
        let centers = bin_centers(edges.view());
        let n = centers.len();
        assert_eq!(n, 7);
        assert_eq!(centers[3], 0.0);
        for i in 0..n {
            assert_relative_eq!(centers[i], -centers[n - 1 - i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bin_centers_recenters_offset_grid() {
        // Nearest center to zero is 0.1, so the grid shifts by -0.1
        let edges = array![-1.9, -0.9, 1.1, 2.1];
        let centers = bin_centers(edges.view());
        assert_relative_eq!(centers[0], -1.5, epsilon = 1e-12);
        assert_eq!(centers[1], 0.0);
        assert_relative_eq!(centers[2], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bin_centers_tie_goes_to_first() {
        let edges = array![-1.0, 0.0, 1.0];
        let centers = bin_centers(edges.view());
        assert_eq!(centers.to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_bin_centers_degenerate_input() {
        assert_eq!(bin_centers(array![1.0].view()).len(), 0);
    }

    #[test]
    fn test_arc_length_limits() {
        // Flat parabola: arc length equals the abscissa
        assert_eq!(arc_length(2.5, 0.0), 2.5);
        assert_relative_eq!(arc_length(2.5, 1e-9), 2.5, epsilon = 1e-9);

        // Steep parabola: arc length approaches eta * x^2
        let eta = 50.0;
        let x = 10.0;
        assert_relative_eq!(arc_length(x, eta), eta * x * x, max_relative = 1e-3);
        assert_relative_eq!(arc_length(-x, eta), -arc_length(x, eta), epsilon = 1e-9);
    }

    #[test]
    fn test_arc_length_edges_symmetric_and_ascending() {
        let edges = arc_length_edges(
            Curvature::from_us_per_mhz2(0.01),
            Frequency::from_millihertz(0.5),
            Time::from_microseconds(0.05),
            Frequency::from_millihertz(20.0),
            64,
        );
        assert_eq!(edges.len(), 64);
        for i in 0..64 {
            assert_relative_eq!(edges[i], -edges[63 - i], epsilon = 1e-12);
        }
        assert!(edges.windows(2).into_iter().all(|w| w[1] > w[0]));

        // Bins shrink away from the origin where the parabola steepens
        let inner = edges[33] - edges[32];
        let outer = edges[63] - edges[62];
        assert!(outer < inner);

        // The outermost edge lands close to the requested Doppler extent
        assert_relative_eq!(edges[63], 20.0, max_relative = 0.1);
    }

    #[test]
    fn test_arc_length_edges_equal_arc_per_bin() {
        let dfd = 0.5;
        let eta_px = dfd * dfd * 0.02 / 0.05;
        let edges = arc_length_edges(
            Curvature::from_us_per_mhz2(0.02),
            Frequency::from_millihertz(dfd),
            Time::from_microseconds(0.05),
            Frequency::from_millihertz(20.0),
            200,
        );
        let lengths: Vec<f64> = edges
            .iter()
            .skip(100)
            .map(|&e| arc_length(e / dfd, eta_px))
            .collect();
        let steps: Vec<f64> = lengths.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = steps.iter().sum::<f64>() / steps.len() as f64;
        for step in steps {
            assert_relative_eq!(step, mean, max_relative = 0.1);
        }
    }

    #[test]
    fn test_arc_length_edges_flat_limit_is_uniform() {
        let edges = arc_length_edges(
            Curvature::from_us_per_mhz2(0.0),
            Frequency::from_millihertz(1.0),
            Time::from_microseconds(1.0),
            Frequency::from_millihertz(9.5),
            20,
        );
        let spacing: Vec<f64> = edges.windows(2).into_iter().map(|w| w[1] - w[0]).collect();
        for s in spacing {
            assert_relative_eq!(s, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_edges_from_centers_round_trip() {
        let centers = array![-2.0, -1.0, 0.0, 1.0, 2.0];
        let edges = edges_from_centers(centers.view()).unwrap();
        assert_eq!(edges.len(), 6);
        assert_relative_eq!(edges[0], -2.5);
        assert_relative_eq!(edges[5], 2.5);
        assert_eq!(bin_centers(edges.view()), centers);

        assert!(edges_from_centers(array![0.0, 1.0].view()).is_none());
    }

    #[test]
    fn test_edge_spec_builds_both_layouts() {
        let axes = SpectralAxes::new(
            Array1::linspace(-1.6, 1.55, 64),
            Array1::linspace(-32.0, 31.0, 64),
        );

        let linear = EdgeSpec::Linear {
            max: Frequency::from_millihertz(10.0),
            n: 21,
        }
        .build(&axes);
        assert_eq!(linear, linear_edges(10.0, 21));

        let spec = EdgeSpec::ArcLength {
            eta: Curvature::from_us_per_mhz2(0.01),
            fd_max: Frequency::from_millihertz(20.0),
            n: 32,
        };
        let expected = arc_length_edges(
            Curvature::from_us_per_mhz2(0.01),
            Frequency::from_millihertz(axes.dfd()),
            Time::from_microseconds(axes.dtau()),
            Frequency::from_millihertz(20.0),
            32,
        );
        assert_eq!(spec.build(&axes), expected);
    }

    #[test]
    fn test_axis_indexer_nearest_sample() {
        let axis = array![-2.0, -1.0, 0.0, 1.0, 2.0];
        let idx = AxisIndexer::new(axis.view());
        assert_eq!(idx.index(0.0), 2);
        assert_eq!(idx.index(0.49), 2);
        assert_eq!(idx.index(0.5), 3);
        assert_eq!(idx.index(-2.6), -1);
        assert_eq!(idx.index(2.6), 5);
        assert_eq!(idx.len(), 5);
    }
}
