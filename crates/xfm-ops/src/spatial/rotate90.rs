//! Quarter-turn rotation in a plane.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use xfm_core::{Error, Result, Shape};
use xfm_math::Matrix;

/// Parameters of [`rotate90`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rotate90Params {
    /// Number of quarter turns; negative turns the other way.
    pub k: i64,
    /// Rotation plane, exactly two spatial axes.
    pub spatial_axes: Vec<usize>,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl Default for Rotate90Params {
    fn default() -> Self {
        Self {
            k: 1,
            spatial_axes: vec![0, 1],
            shape_override: None,
        }
    }
}

impl Rotate90Params {
    /// `k` quarter turns in the plane of the first two axes.
    pub fn new(k: i64) -> Self {
        Self { k, ..Self::default() }
    }

    /// Sets the rotation plane.
    pub fn with_axes(mut self, axes: Vec<usize>) -> Self {
        self.spatial_axes = axes;
        self
    }

    /// Sets the input shape explicitly.
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }
}

impl SpatialOp for Rotate90Params {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        let &[a, b] = self.spatial_axes.as_slice() else {
            return Err(Error::LengthMismatch {
                param: "spatial_axes",
                expected: 2,
                actual: self.spatial_axes.len(),
            });
        };
        let rank = ctx.input_shape.spatial_rank();
        let transform = Matrix::rotate_90(rank, (a, b), self.k)?;

        // TODO: report swapped extents of axes a and b for odd k; the
        // bounding box of a non-square plane is transposed.
        Ok(PendingOp::new(
            Transform::Matrix(transform),
            OpMeta {
                shape_override: ctx.input_shape.clone(),
                kind: OpKind::Rotate90 {
                    k: self.k,
                    spatial_axes: (a, b),
                },
            },
        ))
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Queues or applies a quarter-turn rotation on `image`.
pub fn rotate90(
    image: &mut Image,
    params: &Rotate90Params,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xfm_math::transform_shape;

    fn ctx(dims: &[usize]) -> BuildContext {
        BuildContext::new(Shape::new(dims.to_vec()).unwrap())
    }

    #[test]
    fn test_rotate90_matrix() {
        let op = Rotate90Params::new(1).build(&ctx(&[1, 4, 4])).unwrap();
        let expected = Matrix::from_rows(&[
            vec![0.0, -1.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        assert_eq!(op.transform.as_matrix().unwrap(), &expected);

        let back = Rotate90Params::new(-3).build(&ctx(&[1, 4, 4])).unwrap();
        assert_eq!(back.transform, op.transform);
    }

    #[test]
    fn test_rotate90_reports_input_shape_on_non_square() {
        let c = ctx(&[1, 10, 20]);
        let op = Rotate90Params::new(1).build(&c).unwrap();
        assert_eq!(op.shape_override(), &c.input_shape);
        // the rotated bounding box is actually transposed
        let actual = transform_shape(&c.input_shape, op.transform.as_matrix().unwrap()).unwrap();
        assert_eq!(actual.dims(), &[1, 20, 10]);
        assert_ne!(&actual, op.shape_override());
    }

    #[test]
    fn test_rotate90_axis_errors() {
        let c = ctx(&[1, 4, 4, 4]);
        let err = Rotate90Params::new(1).with_axes(vec![0]).build(&c).unwrap_err();
        assert!(err.is_configuration());
        let err = Rotate90Params::new(1).with_axes(vec![0, 1, 2]).build(&c).unwrap_err();
        assert!(err.is_configuration());
        let err = Rotate90Params::new(1).with_axes(vec![0, 3]).build(&c).unwrap_err();
        assert!(err.is_shape());
    }
}
