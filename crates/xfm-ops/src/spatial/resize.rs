//! Resizing to an explicit or aspect-preserving size.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, SizeMode, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Error, Interpolation, Result, Shape};
use xfm_math::Matrix;

/// Parameters of [`resize`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    /// Target size. One entry per spatial axis in [`SizeMode::All`]
    /// (non-positive entries keep the input extent), a single entry in
    /// [`SizeMode::Longest`].
    pub spatial_size: Vec<i64>,
    /// Size interpretation.
    pub size_mode: SizeMode,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Corner alignment flag for the resampler.
    pub align_corners: bool,
    /// Smooth before downsampling.
    pub anti_aliasing: Option<bool>,
    /// Gaussian sigma for anti-aliasing.
    pub anti_aliasing_sigma: Option<Vec<f64>>,
    /// Output dtype, defaults to the input dtype.
    pub dtype: Option<DType>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl ResizeParams {
    /// Resizes every spatial axis to `spatial_size`.
    pub fn new(spatial_size: Vec<i64>) -> Self {
        Self {
            spatial_size,
            size_mode: SizeMode::All,
            mode: Interpolation::Area,
            align_corners: false,
            anti_aliasing: None,
            anti_aliasing_sigma: None,
            dtype: None,
            shape_override: None,
        }
    }

    /// Scales so the longest spatial axis becomes `size`.
    pub fn longest(size: i64) -> Self {
        Self {
            size_mode: SizeMode::Longest,
            ..Self::new(vec![size])
        }
    }

    /// Sets the interpolation mode.
    pub fn with_mode(mut self, mode: Interpolation) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the corner alignment flag.
    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
        self
    }

    /// Enables or disables anti-aliasing.
    pub fn with_anti_aliasing(mut self, anti_aliasing: bool, sigma: Option<Vec<f64>>) -> Self {
        self.anti_aliasing = Some(anti_aliasing);
        self.anti_aliasing_sigma = sigma;
        self
    }

    /// Sets the output dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Sets the input shape explicitly.
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }

    fn target(&self, input: &Shape) -> Result<(Shape, Vec<usize>)> {
        let rank = input.spatial_rank();
        match self.size_mode {
            SizeMode::All => {
                let n = self.spatial_size.len();
                if n < rank {
                    return Err(Error::LengthMismatch {
                        param: "spatial_size",
                        expected: rank,
                        actual: n,
                    });
                }
                // a longer request gains trailing singleton axes
                let input = input.padded_to(n);
                let size = self
                    .spatial_size
                    .iter()
                    .zip(input.spatial())
                    .map(|(&t, &d)| if t > 0 { t as usize } else { d })
                    .collect();
                Ok((input, size))
            }
            SizeMode::Longest => {
                let [target] = self.spatial_size[..] else {
                    return Err(Error::InvalidParameter(format!(
                        "longest-side resize takes a single size, got {:?}",
                        self.spatial_size
                    )));
                };
                if target <= 0 {
                    return Err(Error::InvalidParameter(format!(
                        "longest-side size must be positive, got {target}"
                    )));
                }
                let longest = input.spatial().iter().copied().max().unwrap_or(1);
                let scale = target as f64 / longest as f64;
                let size = input
                    .spatial()
                    .iter()
                    .map(|&d| ((d as f64 * scale).round_ties_even() as usize).max(1))
                    .collect();
                Ok((input.clone(), size))
            }
        }
    }
}

impl SpatialOp for ResizeParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let (input, size) = self.target(&ctx.input_shape)?;
        let factors: Vec<f64> = size
            .iter()
            .zip(input.spatial())
            .map(|(&t, &d)| t as f64 / d as f64)
            .collect();
        let transform = Matrix::scale(&factors)?;
        let output = Shape::from_parts(input.channels(), &size)?;

        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: output,
                kind: OpKind::Resize {
                    spatial_size: self.spatial_size.clone(),
                    size_mode: self.size_mode,
                    mode: self.mode,
                    align_corners: self.align_corners,
                    anti_aliasing: self.anti_aliasing,
                    anti_aliasing_sigma: self.anti_aliasing_sigma.clone(),
                    dtype: self.dtype.unwrap_or(ctx.dtype),
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a resize on `image`.
///
/// In [`SizeMode::All`] a request with more axes than the image reshapes
/// the image with trailing singleton axes first; that is an error while
/// operations are pending.
pub fn resize(
    image: &mut Image,
    params: &ResizeParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ctx(dims: &[usize]) -> BuildContext {
        BuildContext::new(Shape::new(dims.to_vec()).unwrap())
    }

    #[test]
    fn test_resize_all() {
        let op = ResizeParams::new(vec![5, 40]).build(&ctx(&[3, 10, 20])).unwrap();
        assert_eq!(op.shape_override().dims(), &[3, 5, 40]);
        let m = op.transform.as_matrix().unwrap();
        assert_relative_eq!(m.get(0, 0), 0.5);
        assert_relative_eq!(m.get(1, 1), 2.0);
    }

    #[test]
    fn test_resize_keeps_non_positive_axes() {
        let op = ResizeParams::new(vec![-1, 8]).build(&ctx(&[1, 10, 20])).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 10, 8]);
    }

    #[test]
    fn test_resize_longest() {
        let op = ResizeParams::longest(20).build(&ctx(&[1, 10, 40])).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 5, 20]);
        // 3 * 0.5 = 1.5 rounds to even
        let op = ResizeParams::longest(4).build(&ctx(&[1, 3, 8])).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 2, 4]);
        // never collapses an axis
        let op = ResizeParams::longest(2).build(&ctx(&[1, 1, 100])).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 1, 2]);
    }

    #[test]
    fn test_resize_expands_rank() {
        let op = ResizeParams::new(vec![4, 4, 6]).build(&ctx(&[1, 8, 8])).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 4, 4, 6]);
        assert_eq!(op.transform.spatial_rank(), 3);
    }

    #[test]
    fn test_resize_errors() {
        let c = ctx(&[1, 8, 8, 8]);
        assert!(ResizeParams::new(vec![4, 4]).build(&c).unwrap_err().is_configuration());
        let bad = ResizeParams {
            size_mode: SizeMode::Longest,
            ..ResizeParams::new(vec![4, 4, 4])
        };
        assert!(bad.build(&c).unwrap_err().is_configuration());
        assert!(ResizeParams::longest(0).build(&c).unwrap_err().is_configuration());
    }
}
