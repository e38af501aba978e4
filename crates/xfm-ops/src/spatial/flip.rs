//! Axis mirroring.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{Result, Shape};
use xfm_math::{Matrix, transform_shape};

/// Parameters of [`flip`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlipParams {
    /// Spatial axes to mirror; `None` mirrors all of them.
    pub spatial_axis: Option<Vec<usize>>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl FlipParams {
    /// Mirrors `axes`.
    pub fn new(axes: Vec<usize>) -> Self {
        Self {
            spatial_axis: Some(axes),
            shape_override: None,
        }
    }

    /// Sets the input shape explicitly.
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }
}

impl SpatialOp for FlipParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let rank = ctx.input_shape.spatial_rank();
        let axes = match &self.spatial_axis {
            Some(axes) => axes.clone(),
            None => (0..rank).collect(),
        };
        let transform = Matrix::flip(rank, &axes)?;
        let output = transform_shape(&ctx.input_shape, &transform)?;
        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: output,
                kind: OpKind::Flip { spatial_axis: axes },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a flip on `image`.
pub fn flip(
    image: &mut Image,
    params: &FlipParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_all_axes_by_default() {
        let s = Shape::new(vec![2, 3, 4, 5]).unwrap();
        let op = FlipParams::default().build(&BuildContext::new(s.clone())).unwrap();
        assert_eq!(op.shape_override(), &s);
        assert_eq!(op.meta.kind, OpKind::Flip { spatial_axis: vec![0, 1, 2] });
        let m = op.transform.as_matrix().unwrap();
        assert_eq!((m.get(0, 0), m.get(1, 1), m.get(2, 2)), (-1.0, -1.0, -1.0));
    }

    #[test]
    fn test_flip_axis_out_of_range() {
        let s = Shape::new(vec![1, 4, 4]).unwrap();
        let err = FlipParams::new(vec![2]).build(&BuildContext::new(s)).unwrap_err();
        assert!(err.is_shape());
    }
}
