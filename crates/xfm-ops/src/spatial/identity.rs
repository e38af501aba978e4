//! Identity resample.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Interpolation, PaddingMode, Result, Shape};
use xfm_math::Matrix;

/// Parameters of [`identity`].
///
/// With everything unset this is a no-op record; setting a mode or dtype
/// turns it into a re-interpolation or cast step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityParams {
    /// Interpolation mode.
    pub mode: Option<Interpolation>,
    /// Padding mode.
    pub padding_mode: Option<PaddingMode>,
    /// Output dtype, defaults to the input dtype.
    pub dtype: Option<DType>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl IdentityParams {
    /// Sets the interpolation mode.
    pub fn with_mode(mut self, mode: Interpolation) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Sets the padding mode.
    pub fn with_padding_mode(mut self, padding_mode: PaddingMode) -> Self {
        self.padding_mode = Some(padding_mode);
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

impl SpatialOp for IdentityParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let rank = ctx.input_shape.spatial_rank();
        Ok(PendingOp::new(
            Transform::Matrix(Matrix::identity(rank)),
            OpMeta {
                shape_override: ctx.input_shape.clone(),
                kind: OpKind::Identity {
                    mode: self.mode,
                    padding_mode: self.padding_mode,
                    dtype: self.dtype.unwrap_or(ctx.dtype),
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies an identity resample on `image`.
pub fn identity(
    image: &mut Image,
    params: &IdentityParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_keeps_shape_and_dtype() {
        let s = Shape::new(vec![3, 7, 5, 2]).unwrap();
        let ctx = BuildContext::new(s.clone()).with_dtype(DType::I16);
        let op = IdentityParams::default().build(&ctx).unwrap();
        assert_eq!(op.shape_override(), &s);
        assert!(op.transform.as_matrix().unwrap().is_identity(0.0));
        match op.meta.kind {
            OpKind::Identity { mode, dtype, .. } => {
                assert_eq!(mode, None);
                assert_eq!(dtype, DType::I16);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_identity_cast() {
        let ctx = BuildContext::new(Shape::new(vec![1, 4]).unwrap());
        let op = IdentityParams::default()
            .with_dtype(DType::U8)
            .with_mode(Interpolation::Nearest)
            .build(&ctx)
            .unwrap();
        let p = op.meta.resample_params();
        assert_eq!(p.dtype, Some(DType::U8));
        assert_eq!(p.mode, Some(Interpolation::Nearest));
        assert_eq!(p.padding_mode, None);
    }
}
