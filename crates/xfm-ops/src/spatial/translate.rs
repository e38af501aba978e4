//! Translation.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Error, Interpolation, PaddingMode, Result, Shape};
use xfm_math::Matrix;

/// Parameters of [`translate`].
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateParams {
    /// Offset per spatial axis, in voxels.
    pub translation: Vec<f64>,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Padding mode.
    pub padding_mode: PaddingMode,
    /// Output dtype.
    pub dtype: DType,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl TranslateParams {
    /// Translates by `translation`.
    pub fn new(translation: Vec<f64>) -> Self {
        Self {
            translation,
            mode: Interpolation::Bilinear,
            padding_mode: PaddingMode::Border,
            dtype: DType::F32,
            shape_override: None,
        }
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

    /// Sets the output dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Sets the input shape explicitly.
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }
}

impl SpatialOp for TranslateParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let rank = ctx.input_shape.spatial_rank();
        if self.translation.len() != rank {
            return Err(Error::LengthMismatch {
                param: "translation",
                expected: rank,
                actual: self.translation.len(),
            });
        }
        Ok(PendingOp::new(
            Transform::Matrix(Matrix::translation(&self.translation)?),
            OpMeta {
                shape_override: ctx.input_shape.clone(),
                kind: OpKind::Translate {
                    translation: self.translation.clone(),
                    mode: self.mode,
                    padding_mode: self.padding_mode,
                    dtype: self.dtype,
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a translation on `image`.
pub fn translate(
    image: &mut Image,
    params: &TranslateParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}
