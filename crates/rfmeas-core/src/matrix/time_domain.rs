//! Frequency-to-time transform for parameter series
//!
//! A windowed inverse FFT turning one spectrum column into a
//! time-domain waveform. No ifftshift is applied: the output starts at
//! t = 0 and spans one period of the mean frequency step, matching the
//! convention of the interoperating calibration tool.

use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

use super::series::ParameterSeries;
use crate::constants::NEAR_ZERO;

/// Real-valued spectral window applied before the inverse FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Identity (rectangular).
    #[default]
    None,
    Hamming,
    Hanning,
    Blackman,
    /// sinc^2 taper evaluated over [-1, 1].
    SincSquared,
}

impl Window {
    /// Window samples for a series of `n` points.
    pub fn values(&self, n: usize) -> Vec<f64> {
        match self {
            Window::None => vec![1.0; n],
            Window::Hamming => cosine_window(n, &[0.54, 0.46]),
            Window::Hanning => cosine_window(n, &[0.5, 0.5]),
            Window::Blackman => cosine_window(n, &[0.42, 0.5, 0.08]),
            Window::SincSquared => sinc_squared_window(n),
        }
    }
}

/// Generalized cosine window: w[k] = sum((-1)^m * coeffs[m] * cos(m * 2*pi * k / (n-1))).
fn cosine_window(n: usize, coeffs: &[f64]) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|k| {
            let x = 2.0 * PI * k as f64 / (n - 1) as f64;
            coeffs
                .iter()
                .enumerate()
                .map(|(m, &c)| {
                    let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                    sign * c * (m as f64 * x).cos()
                })
                .sum()
        })
        .collect()
}

/// sinc^2 taper sampled uniformly over [-1, 1].
fn sinc_squared_window(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|k| {
            let x = -1.0 + 2.0 * k as f64 / (n - 1) as f64;
            sinc(x).powi(2)
        })
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < NEAR_ZERO {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

impl ParameterSeries {
    /// Transform this spectrum into a time-domain waveform.
    ///
    /// The window is applied multiplicatively to the complex spectrum,
    /// then an inverse FFT is taken. The time axis spans
    /// `0 .. 1/mean_frequency_step` with `len()` uniformly spaced
    /// samples. Returns `None` for series shorter than two points or
    /// with a degenerate axis.
    pub fn ifft(&self, window: Window) -> Option<(Vec<f64>, Vec<Complex64>)> {
        let n = self.len();
        if n < 2 {
            return None;
        }

        let f = self.frequencies();
        let mean_df = (f[n - 1] - f[0]) / (n - 1) as f64;
        if mean_df <= NEAR_ZERO {
            return None;
        }

        let w = window.values(n);
        let mut buffer: Vec<Complex64> = self
            .values()
            .iter()
            .zip(w.iter())
            .map(|(&c, &wk)| c * wk)
            .collect();

        let mut planner = FftPlanner::new();
        let plan = planner.plan_fft_inverse(n);
        plan.process(&mut buffer);

        // rustfft leaves the inverse unnormalized.
        let scale = 1.0 / n as f64;
        for c in buffer.iter_mut() {
            *c *= scale;
        }

        let dt = 1.0 / (mean_df * n as f64);
        let times = (0..n).map(|k| k as f64 * dt).collect();

        Some((times, buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_window_endpoints() {
        let w = Window::SincSquared.values(5);
        assert_eq!(w.len(), 5);
        // sinc(+-1) = 0, sinc(0) = 1
        assert_relative_eq!(w[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[2], 1.0, epsilon = 1e-12);
        assert_relative_eq!(w[4], 0.0, epsilon = 1e-12);

        let h = Window::Hanning.values(5);
        assert_relative_eq!(h[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(h[2], 1.0, epsilon = 1e-12);

        assert_eq!(Window::None.values(3), vec![1.0; 3]);
    }

    #[test]
    fn test_ifft_of_flat_spectrum_is_impulse() {
        let n = 8;
        let freqs: Vec<f64> = (0..n).map(|k| k as f64 * 1e9).collect();
        let vals = vec![Complex64::new(1.0, 0.0); n];
        let s = ParameterSeries::new(freqs, vals);

        let (t, y) = s.ifft(Window::None).unwrap();
        assert_eq!(t.len(), n);
        assert_eq!(y.len(), n);

        // Axis spans one period of the mean step: dt = 1/(df*n).
        assert_relative_eq!(t[0], 0.0, epsilon = 1e-30);
        assert_relative_eq!(t[1], 1.0 / (1e9 * n as f64), epsilon = 1e-20);

        // A flat spectrum concentrates all energy at t = 0.
        assert_relative_eq!(y[0].re, 1.0, epsilon = 1e-9);
        for yk in &y[1..] {
            assert_relative_eq!(yk.norm(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ifft_rejects_degenerate_series() {
        let s = ParameterSeries::new(vec![1e9], vec![Complex64::new(1.0, 0.0)]);
        assert!(s.ifft(Window::None).is_none());
    }
}
