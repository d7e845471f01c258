//! Single (wave, port-pair) column of a matrix
//!
//! A series owns its own copy of the frequency axis, so it stays valid
//! when the parent matrix is mutated or dropped.

use ndarray::Array1;
use num_complex::Complex64;
use std::ops::{Add, Div, Mul, Sub};

use super::core::MatrixError;

/// One column of complex values aligned to a frequency axis.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSeries {
    frequencies: Vec<f64>,
    values: Vec<Complex64>,
}

impl ParameterSeries {
    /// Create a series from an axis and values of equal length.
    pub fn new(frequencies: Vec<f64>, values: Vec<Complex64>) -> Self {
        assert_eq!(
            frequencies.len(),
            values.len(),
            "axis and value lengths differ"
        );
        Self {
            frequencies,
            values,
        }
    }

    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    #[inline]
    pub fn values(&self) -> &[Complex64] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// |value| per point, recomputed on access.
    pub fn magnitude(&self) -> Array1<f64> {
        self.values.iter().map(|c| c.norm()).collect()
    }

    /// 20*log10(|value|) per point.
    pub fn magnitude_db(&self) -> Array1<f64> {
        self.values.iter().map(|c| 20.0 * c.norm().log10()).collect()
    }

    /// arg(value) in radians per point.
    pub fn phase_rad(&self) -> Array1<f64> {
        self.values.iter().map(|c| c.arg()).collect()
    }

    /// arg(value) in degrees per point.
    pub fn phase_deg(&self) -> Array1<f64> {
        self.values
            .iter()
            .map(|c| c.arg() * 180.0 / std::f64::consts::PI)
            .collect()
    }

    /// Keep points with `lo <= f <= hi`.
    pub fn crop(&self, lo: f64, hi: f64) -> ParameterSeries {
        self.filter(|f| f >= lo && f <= hi)
    }

    /// Keep points with `f <= lo || f >= hi` (complement of `crop`).
    pub fn cut(&self, lo: f64, hi: f64) -> ParameterSeries {
        self.filter(|f| f <= lo || f >= hi)
    }

    fn filter(&self, keep: impl Fn(f64) -> bool) -> ParameterSeries {
        let mut frequencies = Vec::new();
        let mut values = Vec::new();
        for (k, &f) in self.frequencies.iter().enumerate() {
            if keep(f) {
                frequencies.push(f);
                values.push(self.values[k]);
            }
        }
        ParameterSeries {
            frequencies,
            values,
        }
    }

    /// Combine two series at exactly the frequencies present in both.
    ///
    /// Points measured by only one operand are dropped rather than
    /// fabricated; an empty intersection is an error.
    fn zip_overlap(
        &self,
        other: &ParameterSeries,
        op: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> Result<ParameterSeries, MatrixError> {
        let mut frequencies = Vec::new();
        let mut values = Vec::new();
        let (mut i, mut j) = (0usize, 0usize);
        while i < self.len() && j < other.len() {
            let (fa, fb) = (self.frequencies[i], other.frequencies[j]);
            if fa == fb {
                frequencies.push(fa);
                values.push(op(self.values[i], other.values[j]));
                i += 1;
                j += 1;
            } else if fa < fb {
                i += 1;
            } else {
                j += 1;
            }
        }
        if frequencies.is_empty() {
            return Err(MatrixError::NoOverlap);
        }
        Ok(ParameterSeries {
            frequencies,
            values,
        })
    }

    fn map(&self, op: impl Fn(Complex64) -> Complex64) -> ParameterSeries {
        ParameterSeries {
            frequencies: self.frequencies.clone(),
            values: self.values.iter().map(|&c| op(c)).collect(),
        }
    }
}

impl Add for &ParameterSeries {
    type Output = Result<ParameterSeries, MatrixError>;

    fn add(self, other: &ParameterSeries) -> Self::Output {
        self.zip_overlap(other, |a, b| a + b)
    }
}

impl Sub for &ParameterSeries {
    type Output = Result<ParameterSeries, MatrixError>;

    fn sub(self, other: &ParameterSeries) -> Self::Output {
        self.zip_overlap(other, |a, b| a - b)
    }
}

impl Mul for &ParameterSeries {
    type Output = Result<ParameterSeries, MatrixError>;

    fn mul(self, other: &ParameterSeries) -> Self::Output {
        self.zip_overlap(other, |a, b| a * b)
    }
}

impl Div for &ParameterSeries {
    type Output = Result<ParameterSeries, MatrixError>;

    fn div(self, other: &ParameterSeries) -> Self::Output {
        self.zip_overlap(other, |a, b| a / b)
    }
}

// Scalar operations apply elementwise without any frequency filtering.

impl Add<Complex64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn add(self, scalar: Complex64) -> ParameterSeries {
        self.map(|c| c + scalar)
    }
}

impl Sub<Complex64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn sub(self, scalar: Complex64) -> ParameterSeries {
        self.map(|c| c - scalar)
    }
}

impl Mul<Complex64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn mul(self, scalar: Complex64) -> ParameterSeries {
        self.map(|c| c * scalar)
    }
}

impl Div<Complex64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn div(self, scalar: Complex64) -> ParameterSeries {
        self.map(|c| c / scalar)
    }
}

impl Add<f64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn add(self, scalar: f64) -> ParameterSeries {
        self.map(|c| c + scalar)
    }
}

impl Sub<f64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn sub(self, scalar: f64) -> ParameterSeries {
        self.map(|c| c - scalar)
    }
}

impl Mul<f64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn mul(self, scalar: f64) -> ParameterSeries {
        self.map(|c| c * scalar)
    }
}

impl Div<f64> for &ParameterSeries {
    type Output = ParameterSeries;

    fn div(self, scalar: f64) -> ParameterSeries {
        self.map(|c| c / scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(freqs: &[f64], vals: &[(f64, f64)]) -> ParameterSeries {
        ParameterSeries::new(
            freqs.to_vec(),
            vals.iter().map(|&(r, i)| Complex64::new(r, i)).collect(),
        )
    }

    #[test]
    fn test_add_keeps_only_overlap() {
        let x = series(&[1e9, 2e9, 3e9], &[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let y = series(&[2e9, 3e9, 4e9], &[(10.0, 0.0), (20.0, 0.0), (30.0, 0.0)]);

        let sum = (&x + &y).unwrap();
        assert_eq!(sum.frequencies(), &[2e9, 3e9]);
        assert_relative_eq!(sum.values()[0].re, 12.0, epsilon = 1e-12);
        assert_relative_eq!(sum.values()[1].re, 23.0, epsilon = 1e-12);
    }

    #[test]
    fn test_disjoint_axes_are_an_error() {
        let x = series(&[1e9], &[(1.0, 0.0)]);
        let y = series(&[2e9], &[(1.0, 0.0)]);
        assert!(matches!(&x * &y, Err(MatrixError::NoOverlap)));
    }

    #[test]
    fn test_scalar_ops_do_not_filter() {
        let x = series(&[1e9, 2e9], &[(1.0, 1.0), (2.0, -1.0)]);
        let doubled = &x * 2.0;
        assert_eq!(doubled.len(), 2);
        assert_relative_eq!(doubled.values()[0].re, 2.0, epsilon = 1e-12);
        assert_relative_eq!(doubled.values()[0].im, 2.0, epsilon = 1e-12);

        let shifted = &x + Complex64::new(0.0, 1.0);
        assert_relative_eq!(shifted.values()[1].im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_crop_and_cut_are_complements() {
        let x = series(
            &[1e9, 2e9, 3e9, 4e9],
            &[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)],
        );
        let kept = x.crop(2e9, 3e9);
        assert_eq!(kept.frequencies(), &[2e9, 3e9]);

        let rest = x.cut(2e9, 3e9);
        assert_eq!(rest.frequencies(), &[1e9, 2e9, 3e9, 4e9]);

        let strict = x.cut(1e9, 4e9);
        assert_eq!(strict.frequencies(), &[1e9, 4e9]);
    }

    #[test]
    fn test_derived_views() {
        let x = series(&[1e9], &[(0.0, 1.0)]);
        assert_relative_eq!(x.magnitude()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x.magnitude_db()[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            x.phase_rad()[0],
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
        assert_relative_eq!(x.phase_deg()[0], 90.0, epsilon = 1e-12);
    }
}
