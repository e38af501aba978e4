//! Zoom by per-axis factors.

use super::{BuildContext, SpatialOp, broadcast, run};
use crate::align::apply_align_corners;
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Error, Interpolation, PaddingMode, Result, Shape};
use xfm_math::{Matrix, transform_shape};

/// Parameters of [`zoom`].
///
/// The transform maps output coordinates back to the input, so a zoom of
/// `2` is stored as a `0.5` scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomParams {
    /// Magnification, one value or one per spatial axis.
    pub factor: Vec<f64>,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Padding mode.
    pub padding_mode: PaddingMode,
    /// Rescale the transform for corner-aligned sampling.
    pub align_corners: bool,
    /// Keep the input shape.
    pub keep_size: bool,
    /// Output dtype, defaults to the input dtype.
    pub dtype: Option<DType>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl ZoomParams {
    /// Zooms by `factor`.
    pub fn new(factor: Vec<f64>) -> Self {
        Self {
            factor,
            mode: Interpolation::Bilinear,
            padding_mode: PaddingMode::Border,
            align_corners: false,
            keep_size: true,
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
}

impl SpatialOp for ZoomParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let rank = ctx.input_shape.spatial_rank();
        let factor = broadcast("factor", &self.factor, rank)?;
        if let Some(bad) = factor.iter().find(|f| !f.is_finite() || **f == 0.0) {
            return Err(Error::InvalidParameter(format!(
                "zoom factor must be finite and non-zero, got {bad}"
            )));
        }
        let stored: Vec<f64> = factor.iter().map(|f| 1.0 / f).collect();
        let scale = Matrix::scale(&stored)?;
        let output = if self.keep_size {
            ctx.input_shape.clone()
        } else {
            transform_shape(&ctx.input_shape, &scale)?
        };
        let transform = if self.align_corners {
            apply_align_corners(&scale, output.spatial())?
        } else {
            scale
        };

        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: output,
                kind: OpKind::Zoom {
                    factor: stored,
                    mode: self.mode,
                    padding_mode: self.padding_mode,
                    align_corners: self.align_corners,
                    keep_size: self.keep_size,
                    dtype: self.dtype.unwrap_or(ctx.dtype),
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a zoom on `image`.
pub fn zoom(
    image: &mut Image,
    params: &ZoomParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}
