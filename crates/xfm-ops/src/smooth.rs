//! Field smoothing.
//!
//! The elastic builder smooths its random offsets before turning them into
//! displacements. [`Smoother`] is the seam for plugging in any filter;
//! [`GaussianSmoother`] is the bundled separable implementation.
//!
//! When the `parallel` feature is enabled, components are smoothed on the
//! rayon thread pool.

use tracing::trace;
use xfm_core::{Error, Result};
use xfm_math::Field;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Smooths every component of a field independently.
pub trait Smoother {
    /// Returns a smoothed copy of `field` on the same grid.
    fn smooth(&self, field: &Field, sigma: f64) -> Result<Field>;
}

/// Separable sampled Gaussian with zero padding.
///
/// The kernel has `2 * tail + 1` taps with
/// `tail = floor(max(sigma * truncated, 0.5) + 0.5)` and weights
/// `exp(-x^2 / 2 sigma^2) / (sqrt(2 pi) sigma)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSmoother {
    /// Kernel half-width in units of sigma.
    pub truncated: f64,
}

impl Default for GaussianSmoother {
    fn default() -> Self {
        Self { truncated: 3.0 }
    }
}

impl GaussianSmoother {
    /// Creates a smoother truncating the kernel at `truncated` sigmas.
    pub fn new(truncated: f64) -> Self {
        Self { truncated }
    }

    /// Kernel taps for `sigma`, from `-tail` to `tail`.
    pub fn kernel(&self, sigma: f64) -> Vec<f64> {
        let tail = ((sigma * self.truncated).max(0.5) + 0.5).floor() as i64;
        let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * sigma);
        (-tail..=tail)
            .map(|x| {
                let x = x as f64;
                norm * (-(x * x) / (2.0 * sigma * sigma)).exp()
            })
            .collect()
    }
}

impl Smoother for GaussianSmoother {
    fn smooth(&self, field: &Field, sigma: f64) -> Result<Field> {
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "smoothing sigma must be positive, got {sigma}"
            )));
        }
        if !(self.truncated > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "kernel truncation must be positive, got {}",
                self.truncated
            )));
        }
        let kernel = self.kernel(sigma);
        let spatial = field.spatial();
        let strides = field.strides();
        trace!(sigma, taps = kernel.len(), components = field.components(), "gaussian smooth");

        let blur = |c: usize| {
            let mut values = field.component(c).to_vec();
            for axis in 0..spatial.len() {
                values = convolve_axis(&values, spatial[axis], strides[axis], &kernel);
            }
            values
        };

        #[cfg(feature = "parallel")]
        let parts: Vec<Vec<f64>> = (0..field.components()).into_par_iter().map(blur).collect();
        #[cfg(not(feature = "parallel"))]
        let parts: Vec<Vec<f64>> = (0..field.components()).map(blur).collect();

        Field::from_vec(field.components(), spatial, parts.concat())
    }
}

/// 1D convolution along one axis of a row-major buffer; samples outside
/// the axis count as zero.
fn convolve_axis(src: &[f64], dim: usize, stride: usize, kernel: &[f64]) -> Vec<f64> {
    let tail = (kernel.len() / 2) as isize;
    let dim = dim as isize;
    let mut dst = vec![0.0; src.len()];
    for (i, out) in dst.iter_mut().enumerate() {
        let j = ((i / stride) as isize) % dim;
        let base = i as isize - j * stride as isize;
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
            let jj = j + k as isize - tail;
            if (0..dim).contains(&jj) {
                acc += w * src[(base + jj * stride as isize) as usize];
            }
        }
        *out = acc;
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kernel_size_and_symmetry() {
        let g = GaussianSmoother::default();
        let k = g.kernel(1.0);
        assert_eq!(k.len(), 7);
        assert_relative_eq!(k[0], k[6]);
        assert_relative_eq!(k[3], 1.0 / (2.0 * std::f64::consts::PI).sqrt(), epsilon = 1e-12);
        // tiny sigma still gets a 3-tap kernel
        assert_eq!(g.kernel(0.01).len(), 3);
    }

    #[test]
    fn test_impulse_response() {
        let mut f = Field::zeros(1, &[9]).unwrap();
        f.component_mut(0)[4] = 1.0;
        let g = GaussianSmoother::default();
        let out = g.smooth(&f, 1.0).unwrap();
        let k = g.kernel(1.0);
        for (i, v) in out.component(0).iter().enumerate().skip(1).take(7) {
            assert_relative_eq!(*v, k[i - 1], epsilon = 1e-12);
        }
        assert_relative_eq!(out.component(0)[0], 0.0);
    }

    #[test]
    fn test_separable_2d_keeps_components_apart() {
        let mut f = Field::zeros(2, &[5, 5]).unwrap();
        f.component_mut(0)[12] = 1.0;
        let out = GaussianSmoother::default().smooth(&f, 0.8).unwrap();
        let c0 = out.component(0);
        // symmetric about the center
        assert_relative_eq!(c0[11], c0[13], epsilon = 1e-12);
        assert_relative_eq!(c0[7], c0[17], epsilon = 1e-12);
        assert_relative_eq!(c0[11], c0[7], epsilon = 1e-12);
        assert!(out.component(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_bad_sigma() {
        let f = Field::zeros(1, &[4]).unwrap();
        assert!(GaussianSmoother::default().smooth(&f, 0.0).unwrap_err().is_configuration());
        assert!(GaussianSmoother::default().smooth(&f, f64::NAN).is_err());
    }
}
