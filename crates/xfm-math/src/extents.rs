//! Output-shape prediction from image corner extents.
//!
//! Predicting the shape of an image after an affine transform never needs
//! the sampling grid: transforming the 2^K corners of the spatial bounding
//! box and taking the per-axis span gives the extent of the result.
//!
//! # Usage
//!
//! ```rust
//! use xfm_core::Shape;
//! use xfm_math::{Matrix, transform_shape};
//!
//! let shape = Shape::new(vec![1, 10, 20]).unwrap();
//! let half = Matrix::scale(&[0.5, 0.5]).unwrap();
//! let out = transform_shape(&shape, &half).unwrap();
//! assert_eq!(out.dims(), &[1, 5, 10]);
//! ```

use crate::Matrix;
use xfm_core::{Error, Result, Shape};

/// Values closer than this to an integer are treated as that integer when
/// sizing an extent.
const SNAP_EPS: f64 = 1e-6;

/// Homogeneous corner coordinates of the box `[0, d1] x ... x [0, dK]`.
///
/// Returns 2^K points of length K+1 (trailing 1). The last spatial axis
/// toggles fastest. Fails when 2^K does not fit in `usize`.
pub fn extents_from_shape(shape: &Shape) -> Result<Vec<Vec<f64>>> {
    let spatial = shape.spatial();
    let rank = spatial.len();
    let count = u32::try_from(rank)
        .ok()
        .and_then(|r| 1usize.checked_shl(r))
        .ok_or_else(|| Error::InvalidShape(format!("too many spatial dims for corner extents: {rank}")))?;
    Ok((0..count)
        .map(|corner| {
            let mut p: Vec<f64> = (0..rank)
                .map(|axis| {
                    let bit = (corner >> (rank - 1 - axis)) & 1;
                    if bit == 1 { spatial[axis] as f64 } else { 0.0 }
                })
                .collect();
            p.push(1.0);
            p
        })
        .collect())
}

/// Shape spanned by a set of (transformed) extents.
///
/// Each spatial extent is `ceil(max - min)` along its axis; the channel
/// count of `original` is kept.
pub fn shape_from_extents(original: &Shape, extents: &[Vec<f64>]) -> Result<Shape> {
    let rank = original.spatial_rank();
    if extents.is_empty() {
        return Err(Error::InvalidShape("no extents to measure".into()));
    }
    if let Some(bad) = extents.iter().find(|e| e.len() != rank + 1) {
        return Err(Error::DimensionMismatch {
            what: "extent",
            expected: rank + 1,
            actual: bad.len(),
        });
    }

    let mut spatial = Vec::with_capacity(rank);
    for axis in 0..rank {
        let (lo, hi) = extents.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e[axis]), hi.max(e[axis]))
        });
        let span = hi - lo;
        if !span.is_finite() {
            return Err(Error::InvalidShape(format!(
                "non-finite extent along axis {axis}"
            )));
        }
        spatial.push(snap_ceil(span) as usize);
    }
    Shape::from_parts(original.channels(), &spatial)
}

/// Predicts the shape of `input` after `matrix`.
///
/// `matrix` must be `(K+1)x(K+1)` for the K spatial dims of `input`.
pub fn transform_shape(input: &Shape, matrix: &Matrix) -> Result<Shape> {
    if matrix.spatial_rank() != input.spatial_rank() {
        return Err(Error::DimensionMismatch {
            what: "homogeneous matrix",
            expected: input.spatial_rank() + 1,
            actual: matrix.dim(),
        });
    }
    let moved = extents_from_shape(input)?
        .iter()
        .map(|e| matrix.transform_point(e))
        .collect::<Result<Vec<_>>>()?;
    shape_from_extents(input, &moved)
}

fn snap_ceil(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPS { r } else { v.ceil() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    #[test]
    fn test_extents_2d() {
        let e = extents_from_shape(&shape(&[1, 3, 5])).unwrap();
        assert_eq!(
            e,
            vec![
                vec![0.0, 0.0, 1.0],
                vec![0.0, 5.0, 1.0],
                vec![3.0, 0.0, 1.0],
                vec![3.0, 5.0, 1.0],
            ]
        );
    }

    #[test]
    fn test_round_trip_is_exact() {
        for dims in [&[1, 7][..], &[2, 10, 20], &[1, 3, 4, 5], &[4, 1, 1, 1, 9]] {
            let s = shape(dims);
            assert_eq!(shape_from_extents(&s, &extents_from_shape(&s).unwrap()).unwrap(), s);
        }
    }

    #[test]
    fn test_identity_keeps_shape() {
        let s = shape(&[3, 12, 8, 5]);
        assert_eq!(transform_shape(&s, &Matrix::identity(3)).unwrap(), s);
    }

    #[test]
    fn test_rotation_grows_and_quarter_swaps() {
        let s = shape(&[1, 10, 10]);
        let grown = transform_shape(&s, &Matrix::rotation_2d(FRAC_PI_4)).unwrap();
        assert_eq!(grown.dims(), &[1, 15, 15]);

        // no spurious voxel from cos(pi/2) noise
        let r = shape(&[1, 10, 20]);
        let swapped = transform_shape(&r, &Matrix::rotation_2d(FRAC_PI_2)).unwrap();
        assert_eq!(swapped.dims(), &[1, 20, 10]);
    }

    #[test]
    fn test_shape_errors() {
        let s = shape(&[1, 4, 4]);
        let err = transform_shape(&s, &Matrix::identity(3)).unwrap_err();
        assert!(err.is_shape());

        let bad = vec![vec![0.0, 0.0]];
        assert!(shape_from_extents(&s, &bad).unwrap_err().is_shape());
        assert!(shape_from_extents(&s, &[]).unwrap_err().is_shape());
    }

    #[test]
    fn test_corner_count_overflow_is_an_error() {
        let mut dims = vec![1];
        dims.extend(std::iter::repeat_n(1, 64));
        let s = shape(&dims);
        assert!(extents_from_shape(&s).unwrap_err().is_shape());
        let err = transform_shape(&s, &Matrix::identity(64)).unwrap_err();
        assert!(err.is_shape());
    }
}
