//! Resampling to a new physical voxel spacing.

use super::{BuildContext, SpatialOp, broadcast, ensure_positive, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{DType, Error, Interpolation, PaddingMode, Result, Shape};
use xfm_math::{Matrix, transform_shape};

/// Parameters of [`spacing`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingParams {
    /// Target spacing, one value or one per spatial axis.
    pub pixdim: Vec<f64>,
    /// Source spacing, defaults to the image spacing.
    pub src_pixdim: Option<Vec<f64>>,
    /// Diagonal resampling. Not supported, `true` is rejected.
    pub diagonal: bool,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Padding mode.
    pub padding_mode: PaddingMode,
    /// Corner alignment flag for the resampler.
    pub align_corners: bool,
    /// Output dtype, defaults to the input dtype.
    pub dtype: Option<DType>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl SpacingParams {
    /// Resamples to `pixdim`.
    pub fn new(pixdim: Vec<f64>) -> Self {
        Self {
            pixdim,
            src_pixdim: None,
            diagonal: false,
            mode: Interpolation::Area,
            padding_mode: PaddingMode::Border,
            align_corners: false,
            dtype: None,
            shape_override: None,
        }
    }

    /// Sets the source spacing.
    pub fn with_src_pixdim(mut self, src_pixdim: Vec<f64>) -> Self {
        self.src_pixdim = Some(src_pixdim);
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

impl SpatialOp for SpacingParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        if self.diagonal {
            return Err(Error::Unsupported("diagonal spacing resampling".into()));
        }
        let rank = ctx.input_shape.spatial_rank();
        let pixdim = broadcast("pixdim", &self.pixdim, rank)?;
        let src_pixdim = broadcast(
            "src_pixdim",
            self.src_pixdim.as_deref().unwrap_or(&ctx.spacing),
            rank,
        )?;
        ensure_positive("pixdim", &pixdim)?;
        ensure_positive("src_pixdim", &src_pixdim)?;

        let factors: Vec<f64> = src_pixdim.iter().zip(&pixdim).map(|(s, t)| s / t).collect();
        let transform = Matrix::scale(&factors)?;
        let output = transform_shape(&ctx.input_shape, &transform)?;

        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: output,
                kind: OpKind::Spacing {
                    pixdim,
                    src_pixdim,
                    diagonal: self.diagonal,
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

/// Queues or applies a spacing change on `image`.
pub fn spacing(
    image: &mut Image,
    params: &SpacingParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(dims: &[usize]) -> BuildContext {
        BuildContext::new(Shape::new(dims.to_vec()).unwrap())
    }

    #[test]
    fn test_spacing_shape() {
        let c = ctx(&[1, 10, 20, 30]).with_spacing(vec![1.0, 1.0, 3.0]);
        let op = SpacingParams::new(vec![2.0, 0.5, 1.5]).build(&c).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 5, 40, 60]);
        match &op.meta.kind {
            OpKind::Spacing { pixdim, src_pixdim, mode, padding_mode, .. } => {
                assert_eq!(pixdim, &vec![2.0, 0.5, 1.5]);
                assert_eq!(src_pixdim, &vec![1.0, 1.0, 3.0]);
                assert_eq!(*mode, Interpolation::Area);
                assert_eq!(*padding_mode, PaddingMode::Border);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_explicit_source_spacing_wins() {
        let c = ctx(&[1, 8, 8]).with_spacing(vec![4.0, 4.0]);
        let op = SpacingParams::new(vec![1.0]).with_src_pixdim(vec![0.5]).build(&c).unwrap();
        assert_eq!(op.shape_override().dims(), &[1, 4, 4]);
    }

    #[test]
    fn test_spacing_errors() {
        let c = ctx(&[1, 8, 8]);
        let diag = SpacingParams { diagonal: true, ..SpacingParams::new(vec![1.0]) };
        assert!(matches!(diag.build(&c), Err(Error::Unsupported(_))));
        assert!(SpacingParams::new(vec![1.0, 1.0, 1.0]).build(&c).unwrap_err().is_configuration());
        assert!(SpacingParams::new(vec![0.0]).build(&c).unwrap_err().is_configuration());
    }
}
