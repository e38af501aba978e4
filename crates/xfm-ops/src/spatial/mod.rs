//! Spatial transform builders.
//!
//! Every builder is a parameter struct implementing [`SpatialOp`] plus a
//! free function of the same name that builds the record against an
//! [`Image`] and hands it to [`dispatch`](crate::dispatch):
//!
//! | Builder      | Transform                    | Output shape                     |
//! |--------------|------------------------------|----------------------------------|
//! | [`identity`] | identity                     | input                            |
//! | [`spacing`]  | scale `src / target`         | bounding box                     |
//! | [`flip`]     | axis mirror                  | bounding box                     |
//! | [`resize`]   | scale `target / current`     | requested size                   |
//! | [`rotate`]   | rotation (2D or 3D)          | input or bounding box            |
//! | [`zoom`]     | scale `1 / factor`           | input or bounding box            |
//! | [`rotate90`] | quarter turns in a plane     | input                            |
//! | [`translate`]| translation                  | input                            |
//! | [`elastic`]  | smoothed random grid (field) | input                            |
//!
//! The input shape a builder works from is resolved in this order:
//! explicit `shape_override`, then the shape predicted by the image's
//! pending log, then the concrete shape. Building is pure, so
//! [`build_op`] can plan shapes without any pixels.
//!
//! # Example
//!
//! ```rust
//! use xfm_core::Shape;
//! use xfm_ops::spatial::{build_op, BuildContext, RotateParams};
//!
//! let ctx = BuildContext::new(Shape::new(vec![1, 10, 10]).unwrap());
//! let op = build_op(&RotateParams::new(vec![std::f64::consts::FRAC_PI_4]).with_keep_size(false), &ctx).unwrap();
//! assert_eq!(op.shape_override().dims(), &[1, 15, 15]);
//! ```

mod elastic;
mod flip;
mod identity;
mod resize;
mod rotate;
mod rotate90;
mod spacing;
mod translate;
mod zoom;

pub use elastic::{ElasticParams, elastic, elastic_with, random_offsets};
pub use flip::{FlipParams, flip};
pub use identity::{IdentityParams, identity};
pub use resize::{ResizeParams, resize};
pub use rotate::{RotateParams, rotate};
pub use rotate90::{Rotate90Params, rotate90};
pub use spacing::{SpacingParams, spacing};
pub use translate::{TranslateParams, translate};
pub use zoom::{ZoomParams, zoom};

use crate::image::Image;
use crate::lazy::{ExecutionMode, dispatch};
use crate::pending::{OpKind, PendingOp};
use crate::resample::Resampler;
use tracing::trace;
use xfm_core::{DType, Error, Result, Shape};

/// A parameterized spatial operation that can be turned into a record.
pub trait SpatialOp {
    /// Builds the pending record for an input described by `ctx`.
    ///
    /// Must not depend on anything but `self` and `ctx`.
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp>;

    /// Explicit input shape, bypassing the image.
    fn shape_override(&self) -> Option<&Shape>;
}

/// What a builder knows about its input.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildContext {
    /// Resolved input shape.
    pub input_shape: Shape,
    /// Element type of the input.
    pub dtype: DType,
    /// Physical voxel spacing of the input.
    pub spacing: Vec<f64>,
}

impl BuildContext {
    /// Context for `input_shape` with unit spacing and the default dtype.
    pub fn new(input_shape: Shape) -> Self {
        let spacing = vec![1.0; input_shape.spatial_rank()];
        Self {
            input_shape,
            dtype: DType::default(),
            spacing,
        }
    }

    /// Sets the input dtype.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Sets the physical voxel spacing.
    pub fn with_spacing(mut self, spacing: Vec<f64>) -> Self {
        self.spacing = spacing;
        self
    }

    /// Resolves the input of the next operation on `image`.
    ///
    /// Shape, dtype and spacing are those the queued operations will leave
    /// behind, so a live image and a pixel-free plan agree.
    pub fn from_image(image: &Image, shape_override: Option<&Shape>) -> Self {
        let mut ctx = Self {
            input_shape: image.current_shape().clone(),
            dtype: image.dtype(),
            spacing: image.spacing(),
        };
        for op in image.pending_operations() {
            ctx.advance(op);
        }
        match shape_override {
            Some(shape) => ctx.with_input_shape(shape.clone()),
            None => ctx,
        }
    }

    /// Replaces the input shape, padding or truncating spacing to its rank.
    fn with_input_shape(mut self, shape: Shape) -> Self {
        self.spacing.resize(shape.spatial_rank(), 1.0);
        self.input_shape = shape;
        self
    }

    /// Moves the context past `op`, as seen by the next operation.
    pub fn advance(&mut self, op: &PendingOp) {
        self.input_shape = op.meta.shape_override.clone();
        let rank = self.input_shape.spatial_rank();
        match &op.meta.kind {
            OpKind::Spacing { pixdim, dtype, .. } => {
                self.spacing = pixdim.clone();
                self.dtype = *dtype;
            }
            OpKind::Identity { dtype, .. }
            | OpKind::Resize { dtype, .. }
            | OpKind::Rotate { dtype, .. }
            | OpKind::Zoom { dtype, .. }
            | OpKind::Translate { dtype, .. } => self.dtype = *dtype,
            _ => {}
        }
        self.spacing.resize(rank, 1.0);
    }
}

/// Builds the record for `op` without touching any image.
pub fn build_op(op: &dyn SpatialOp, ctx: &BuildContext) -> Result<PendingOp> {
    match op.shape_override() {
        Some(shape) if shape != &ctx.input_shape => op.build(&ctx.clone().with_input_shape(shape.clone())),
        _ => op.build(ctx),
    }
}

/// Builds `op` against `image` and dispatches it.
///
/// Nothing on the image changes if building fails.
pub(crate) fn run(
    image: &mut Image,
    op: &dyn SpatialOp,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    let ctx = BuildContext::from_image(image, op.shape_override());
    let record = op.build(&ctx)?;
    trace!(op = record.name(), input = %ctx.input_shape, output = %record.shape_override(), "Built record");

    let rank = record.transform.spatial_rank();
    if rank > image.current_shape().spatial_rank() {
        image.expand_spatial(rank)?;
    }
    dispatch(image, record, execution, resampler)
}

/// Repeats a scalar to `rank` entries or checks a per-axis vector.
pub(crate) fn broadcast(param: &'static str, values: &[f64], rank: usize) -> Result<Vec<f64>> {
    match values.len() {
        1 => Ok(vec![values[0]; rank]),
        n if n == rank => Ok(values.to_vec()),
        n => Err(Error::LengthMismatch {
            param,
            expected: rank,
            actual: n,
        }),
    }
}

/// Fails unless every value is finite and positive.
pub(crate) fn ensure_positive(param: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
        Some(bad) => Err(Error::InvalidParameter(format!(
            "'{param}' must be finite and positive, got {bad}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::Transform;
    use crate::resample::ResampleParams;
    use xfm_core::Volume;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    #[test]
    fn test_broadcast() {
        assert_eq!(broadcast("x", &[2.0], 3).unwrap(), vec![2.0; 3]);
        assert_eq!(broadcast("x", &[1.0, 2.0], 2).unwrap(), vec![1.0, 2.0]);
        assert!(broadcast("x", &[1.0, 2.0], 3).unwrap_err().is_configuration());
    }

    #[test]
    fn test_context_resolution_order() {
        let mut img = Image::tracked(Volume::zeros(shape(&[1, 8, 8])));
        assert_eq!(BuildContext::from_image(&img, None).input_shape, shape(&[1, 8, 8]));

        let resampler = |_: &Volume, _: &Transform, p: &ResampleParams| -> Result<Volume> {
            Ok(Volume::zeros(p.output_shape.clone()))
        };
        let grow = ResizeParams::new(vec![16, 4]);
        resize(&mut img, &grow, ExecutionMode::Deferred, &resampler).unwrap();
        assert_eq!(BuildContext::from_image(&img, None).input_shape, shape(&[1, 16, 4]));

        let over = shape(&[1, 3, 3]);
        assert_eq!(BuildContext::from_image(&img, Some(&over)).input_shape, over);
    }

    #[test]
    fn test_advance_tracks_spacing() {
        let mut ctx = BuildContext::new(shape(&[1, 10, 10])).with_spacing(vec![1.0, 1.0]);
        let op = build_op(&SpacingParams::new(vec![2.0]), &ctx).unwrap();
        ctx.advance(&op);
        assert_eq!(ctx.input_shape, shape(&[1, 5, 5]));
        assert_eq!(ctx.spacing, vec![2.0, 2.0]);
    }

    #[test]
    fn test_context_follows_queued_spacing() {
        let mut img = Image::tracked(
            Volume::zeros(shape(&[1, 10, 10]))
                .with_spacing(vec![1.0, 1.0])
                .unwrap()
                .with_dtype(DType::U8),
        );
        let resampler = |_: &Volume, _: &Transform, p: &ResampleParams| -> Result<Volume> {
            Ok(Volume::zeros(p.output_shape.clone()))
        };
        let coarse = SpacingParams::new(vec![2.0]).with_dtype(DType::F32);
        spacing(&mut img, &coarse, ExecutionMode::Deferred, &resampler).unwrap();

        let ctx = BuildContext::from_image(&img, None);
        assert_eq!(ctx.input_shape, shape(&[1, 5, 5]));
        assert_eq!(ctx.spacing, vec![2.0, 2.0]);
        assert_eq!(ctx.dtype, DType::F32);

        let ctx = BuildContext::from_image(&img, Some(&shape(&[1, 4, 4, 4])));
        assert_eq!(ctx.spacing, vec![2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_build_op_uses_override() {
        let ctx = BuildContext::new(shape(&[1, 10, 10]));
        let params = TranslateParams::new(vec![1.0, 2.0, 3.0]).with_shape_override(shape(&[1, 4, 4, 4]));
        let op = build_op(&params, &ctx).unwrap();
        assert_eq!(op.shape_override(), &shape(&[1, 4, 4, 4]));
    }
}
