//! Rotation by arbitrary angles.

use super::{BuildContext, SpatialOp, run};
use crate::align::apply_align_corners;
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Error, Interpolation, PaddingMode, Result, Shape};
use xfm_math::{Matrix, transform_shape};

/// Parameters of [`rotate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotateParams {
    /// Angles in radians: one for 2D; one (used for every axis) or three
    /// (x, y, z) for 3D.
    pub angle: Vec<f64>,
    /// Keep the input shape; otherwise grow to contain the rotated image.
    pub keep_size: bool,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Padding mode.
    pub padding_mode: PaddingMode,
    /// Rescale the transform for corner-aligned sampling.
    pub align_corners: bool,
    /// Output dtype, defaults to the input dtype.
    pub dtype: Option<DType>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl RotateParams {
    /// Rotates by `angle` radians.
    pub fn new(angle: Vec<f64>) -> Self {
        Self {
            angle,
            keep_size: true,
            mode: Interpolation::Area,
            padding_mode: PaddingMode::Border,
            align_corners: false,
            dtype: None,
            shape_override: None,
        }
    }

    /// Sets whether the input shape is kept.
    pub fn with_keep_size(mut self, keep_size: bool) -> Self {
        self.keep_size = keep_size;
        self
    }

    /// Sets the interpolation mode.
    pub fn with_mode(mut self, mode: Interpolation) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the padding mode.
    pub fn with_padding_mode(mut self, padding_mode: PaddingMode) -> Self {
        self.padding_mode = padding_mode;
        self
    }

    /// Sets the corner alignment flag.
    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
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

    fn matrix(&self, rank: usize) -> Result<Matrix> {
        let length_error = |expected| Error::LengthMismatch {
            param: "angle",
            expected,
            actual: self.angle.len(),
        };
        match (rank, self.angle.as_slice()) {
            (2, &[a]) => Ok(Matrix::rotation_2d(a)),
            (2, _) => Err(length_error(1)),
            (3, &[a]) => Ok(Matrix::rotation_3d([a; 3])),
            (3, &[x, y, z]) => Ok(Matrix::rotation_3d([x, y, z])),
            (3, _) => Err(length_error(3)),
            _ => Err(Error::Unsupported(format!(
                "rotation of {rank} spatial dimensions, only 2D and 3D are supported"
            ))),
        }
    }
}

impl SpatialOp for RotateParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let rank = ctx.input_shape.spatial_rank();
        let rotation = self.matrix(rank)?;
        let output = if self.keep_size {
            ctx.input_shape.clone()
        } else {
            transform_shape(&ctx.input_shape, &rotation)?
        };
        let transform = if self.align_corners {
            apply_align_corners(&rotation, output.spatial())?
        } else {
            rotation
        };

        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: output,
                kind: OpKind::Rotate {
                    angle: self.angle.clone(),
                    keep_size: self.keep_size,
                    mode: self.mode,
                    padding_mode: self.padding_mode,
                    align_corners: self.align_corners,
                    dtype: self.dtype.unwrap_or(ctx.dtype),
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a rotation on `image`.
pub fn rotate(
    image: &mut Image,
    params: &RotateParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn ctx(dims: &[usize]) -> BuildContext {
        BuildContext::new(Shape::new(dims.to_vec()).unwrap())
    }

    #[test]
    fn test_rotate_keep_size() {
        let c = ctx(&[1, 10, 20]);
        let op = RotateParams::new(vec![FRAC_PI_4]).build(&c).unwrap();
        assert_eq!(op.shape_override(), &c.input_shape);
    }

    #[test]
    fn test_rotate_grows() {
        let op = RotateParams::new(vec![FRAC_PI_4])
            .with_keep_size(false)
            .build(&ctx(&[1, 10, 10]))
            .unwrap();
        let out = op.shape_override().spatial();
        assert!(out[0] > 10 && out[1] > 10);
    }

    #[test]
    fn test_rotate_3d_scalar_broadcast() {
        let op = RotateParams::new(vec![FRAC_PI_2]).build(&ctx(&[1, 4, 4, 4])).unwrap();
        let expected = Matrix::rotation_3d([FRAC_PI_2; 3]);
        assert!(op.transform.as_matrix().unwrap().approx_eq(&expected, 1e-12));
    }

    #[test]
    fn test_rotate_align_corners() {
        let op = RotateParams::new(vec![0.0])
            .with_align_corners(true)
            .build(&ctx(&[1, 3, 7]))
            .unwrap();
        let m = op.transform.as_matrix().unwrap();
        assert_relative_eq!(m.get(0, 0), 0.75);
        assert_relative_eq!(m.get(1, 1), 0.875);
        assert!(op.meta.resample_params().align_corners);
    }

    #[test]
    fn test_rotate_rank_errors() {
        for dims in [&[1, 10][..], &[1, 2, 2, 2, 2]] {
            let err = RotateParams::new(vec![0.1]).build(&ctx(dims)).unwrap_err();
            assert!(err.is_configuration());
        }
        let err = RotateParams::new(vec![0.1, 0.2]).build(&ctx(&[1, 4, 4, 4])).unwrap_err();
        assert!(err.is_configuration());
    }
}
