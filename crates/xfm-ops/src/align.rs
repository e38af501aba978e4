//! Corner-alignment adjustment.
//!
//! Builders produce transforms in the voxel-center convention. When a
//! resampler pins the extreme samples to the voxel corners instead, the
//! same matrix maps onto a grid that is one voxel wider per axis. Scaling
//! by `s / (s + 1)` compensates.

use xfm_core::{Error, Result};
use xfm_math::Matrix;

/// Rewrites `matrix` for corner-aligned sampling on a grid of
/// `spatial_size`.
///
/// Returns `scale(s_i / (s_i + 1)) * matrix`.
///
/// # Example
///
/// ```rust
/// use xfm_math::Matrix;
/// use xfm_ops::apply_align_corners;
///
/// let m = apply_align_corners(&Matrix::identity(2), &[3, 1]).unwrap();
/// assert_eq!(m.get(0, 0), 0.75);
/// assert_eq!(m.get(1, 1), 0.5);
/// ```
pub fn apply_align_corners(matrix: &Matrix, spatial_size: &[usize]) -> Result<Matrix> {
    if spatial_size.len() != matrix.spatial_rank() {
        return Err(Error::DimensionMismatch {
            what: "corner-alignment size",
            expected: matrix.spatial_rank(),
            actual: spatial_size.len(),
        });
    }
    let factors: Vec<f64> = spatial_size
        .iter()
        .map(|&s| s as f64 / (s as f64 + 1.0))
        .collect();
    Matrix::scale(&factors)?.matmul(matrix)
}
