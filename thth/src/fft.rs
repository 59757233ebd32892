//! Two-dimensional FFT helpers built on `rustfft`
//!
//! Conventions follow the usual array-library ones: the forward transform is
//! unnormalized, the inverse divides by the number of samples, and the
//! shifted frequency grid runs from `-floor(n/2)` to `ceil(n/2) - 1` bins.

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

/// Transform every row then every column of `input` in the given direction.
fn fft2_unnormalized(input: &Array2<Complex64>, direction: FftDirection) -> Array2<Complex64> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return input.clone();
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft = planner.plan_fft(cols, direction);
    let col_fft = planner.plan_fft(rows, direction);

    // Row-major buffer: rustfft processes consecutive chunks of `cols`
    let mut buffer: Vec<Complex64> = input.iter().copied().collect();
    row_fft.process(&mut buffer);

    // Column-major buffer for the second pass
    let mut columns: Vec<Complex64> = (0..cols)
        .flat_map(|c| (0..rows).map(move |r| (r, c)))
        .map(|(r, c)| buffer[r * cols + c])
        .collect();
    col_fft.process(&mut columns);

    Array2::from_shape_fn((rows, cols), |(r, c)| columns[c * rows + r])
}

/// Forward 2D FFT (no normalization)
pub fn fft2(input: &Array2<Complex64>) -> Array2<Complex64> {
    fft2_unnormalized(input, FftDirection::Forward)
}

/// Forward 2D FFT of a real array
pub fn fft2_real(input: &Array2<f64>) -> Array2<Complex64> {
    fft2(&input.mapv(|v| Complex64::new(v, 0.0)))
}

/// Inverse 2D FFT normalized by `1 / (rows * cols)`
pub fn ifft2(input: &Array2<Complex64>) -> Array2<Complex64> {
    let n = input.len().max(1) as f64;
    fft2_unnormalized(input, FftDirection::Inverse).mapv(|v| v / n)
}

/// Circularly shift both axes so that `out[(i + dr) % rows, (j + dc) % cols] = in[i, j]`.
fn roll2<T: Copy>(input: &Array2<T>, dr: usize, dc: usize) -> Array2<T> {
    let (rows, cols) = input.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        input[[(i + rows - dr % rows) % rows, (j + cols - dc % cols) % cols]]
    })
}

/// Move the zero-frequency element to the center of the array
pub fn fftshift<T: Copy>(input: &Array2<T>) -> Array2<T> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return input.clone();
    }
    roll2(input, rows / 2, cols / 2)
}

/// Inverse of [`fftshift`] (differs from it for odd lengths)
pub fn ifftshift<T: Copy>(input: &Array2<T>) -> Array2<T> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return input.clone();
    }
    roll2(input, rows - rows / 2, cols - cols / 2)
}

/// Sample frequencies of an `n`-point transform with spacing `d`, already
/// shifted into ascending order.
pub fn shifted_fftfreq(n: usize, d: f64) -> Array1<f64> {
    let half = (n / 2) as f64;
    Array1::from_shape_fn(n, |k| (k as f64 - half) / (n as f64 * d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_fft2_of_plane_wave_is_single_bin() {
        let (rows, cols) = (8, 16);
        let (kr, kc) = (3, 5);
        let wave = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let phase = 2.0 * PI * (kr as f64 * r as f64 / rows as f64 + kc as f64 * c as f64 / cols as f64);
            Complex64::new(phase.cos(), phase.sin())
        });

        let spectrum = fft2(&wave);
        for ((r, c), v) in spectrum.indexed_iter() {
            if (r, c) == (kr, kc) {
                assert_relative_eq!(v.re, (rows * cols) as f64, epsilon = 1e-9);
            } else {
                assert!(v.norm() < 1e-9, "leakage at ({r}, {c}): {v}");
            }
        }
    }

    #[test]
    fn test_ifft2_inverts_fft2() {
        let input = Array2::from_shape_fn((6, 5), |(r, c)| {
            Complex64::new((r * 5 + c) as f64 * 0.3, (r as f64 - c as f64).sin())
        });
        let restored = ifft2(&fft2(&input));
        for (a, b) in input.iter().zip(restored.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_shift_round_trip_odd_and_even() {
        let input = Array2::from_shape_fn((5, 4), |(r, c)| (r * 4 + c) as i32);
        let shifted = fftshift(&input);
        // Zero element moves to (rows/2, cols/2)
        assert_eq!(shifted[[2, 2]], 0);
        assert_eq!(ifftshift(&shifted), input);
    }

    #[test]
    fn test_shifted_fftfreq_matches_convention() {
        let even = shifted_fftfreq(4, 0.5);
        assert_eq!(even.to_vec(), vec![-1.0, -0.5, 0.0, 0.5]);

        let odd = shifted_fftfreq(5, 1.0);
        assert_relative_eq!(odd[0], -0.4, epsilon = 1e-15);
        assert_relative_eq!(odd[2], 0.0);
        assert_relative_eq!(odd[4], 0.4, epsilon = 1e-15);
    }
}
