//! Elastic deformation through a smoothed random displacement field.
//!
//! The sampling grid is the centered identity grid from
//! [`create_grid`] plus `magnitude * smooth(offsets, sigma)` on its
//! coordinate components. Since the result is a per-voxel field and not a
//! matrix, an elastic record always becomes its own resampling stage.

use super::{BuildContext, SpatialOp, run};
use crate::image::Image;
use crate::lazy::ExecutionMode;
use crate::pending::{OpKind, OpMeta, PendingOp, Transform};
use crate::resample::Resampler;
use crate::smooth::{GaussianSmoother, Smoother};
use rand::Rng;
use tracing::trace;
use xfm_core::{Error, Interpolation, PaddingMode, Result, Shape};
use xfm_math::{Field, create_grid};

/// Parameters of [`elastic`].
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticParams {
    /// Smoothing sigma applied to the offsets.
    pub sigma: f64,
    /// Scale of the smoothed displacement.
    pub magnitude: f64,
    /// Raw offsets, one component per spatial axis over the sampling grid.
    pub offsets: Field,
    /// Sampling grid size; missing or non-positive entries use the input
    /// extent.
    pub spatial_size: Option<Vec<i64>>,
    /// Interpolation mode.
    pub mode: Interpolation,
    /// Padding mode.
    pub padding_mode: PaddingMode,
    /// Explicit input shape.
    pub shape_override: Option<Shape>,
}

impl ElasticParams {
    /// Deformation from precomputed `offsets`.
    pub fn new(sigma: f64, magnitude: f64, offsets: Field) -> Self {
        Self {
            sigma,
            magnitude,
            offsets,
            spatial_size: None,
            mode: Interpolation::Bilinear,
            padding_mode: PaddingMode::Reflection,
            shape_override: None,
        }
    }

    /// Deformation with uniform random offsets over `spatial`.
    pub fn random<R: Rng>(rng: &mut R, sigma: f64, magnitude: f64, spatial: &[usize]) -> Result<Self> {
        let offsets = random_offsets(rng, spatial.len(), spatial)?;
        Ok(Self::new(sigma, magnitude, offsets))
    }

    /// Sets the sampling grid size.
    pub fn with_spatial_size(mut self, spatial_size: Vec<i64>) -> Self {
        self.spatial_size = Some(spatial_size);
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

    /// Sets the input shape explicitly.
    pub fn with_shape_override(mut self, shape: Shape) -> Self {
        self.shape_override = Some(shape);
        self
    }

    /// Builds the record, smoothing the offsets with `smoother`.
    pub fn build_with(&self, ctx: &BuildContext, smoother: &dyn Smoother) -> Result<PendingOp> {
        if !self.magnitude.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "elastic magnitude must be finite, got {}",
                self.magnitude
            )));
        }
        let input = ctx.input_shape.spatial();
        let grid_size = self.grid_size(input)?;
        if self.offsets.components() != input.len() {
            return Err(Error::DimensionMismatch {
                what: "elastic offsets",
                expected: input.len(),
                actual: self.offsets.components(),
            });
        }
        if self.offsets.spatial() != grid_size.as_slice() {
            return Err(Error::InvalidShape(format!(
                "elastic offsets cover {:?}, sampling grid is {grid_size:?}",
                self.offsets.spatial()
            )));
        }

        let displacement = smoother.smooth(&self.offsets, self.sigma)?;
        let mut grid = create_grid(&grid_size)?;
        grid.add_scaled(&displacement, self.magnitude)?;
        trace!(sigma = self.sigma, magnitude = self.magnitude, grid = ?grid_size, "Built elastic grid");

        Ok(PendingOp::new(
            Transform::Field(grid),
            OpMeta {
                shape_override: ctx.input_shape.clone(),
                kind: OpKind::Elastic {
                    sigma: self.sigma,
                    magnitude: self.magnitude,
                    spatial_size: self.spatial_size.clone(),
                    mode: self.mode,
                    padding_mode: self.padding_mode,
                },
            },
        ))
    }

    fn grid_size(&self, input: &[usize]) -> Result<Vec<usize>> {
        let Some(requested) = &self.spatial_size else {
            return Ok(input.to_vec());
        };
        if requested.len() != input.len() {
            return Err(Error::LengthMismatch {
                param: "spatial_size",
                expected: input.len(),
                actual: requested.len(),
            });
        }
        Ok(requested
            .iter()
            .zip(input)
            .map(|(&r, &d)| if r > 0 { r as usize } else { d })
            .collect())
    }
}

impl SpatialOp for ElasticParams {
    fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
        self.build_with(ctx, &GaussianSmoother::default())
    }

    fn shape_override(&self) -> Option<&Shape> {
        self.shape_override.as_ref()
    }
}

/// Uniform `[-1, 1)` offsets with `components` components over `spatial`.
pub fn random_offsets<R: Rng>(rng: &mut R, components: usize, spatial: &[usize]) -> Result<Field> {
    let mut field = Field::zeros(components, spatial)?;
    for c in 0..components {
        for v in field.component_mut(c) {
            *v = rng.random_range(-1.0..1.0);
        }
    }
    Ok(field)
}

/// Queues or applies an elastic deformation on `image`, smoothing with
/// the default [`GaussianSmoother`].
pub fn elastic(
    image: &mut Image,
    params: &ElasticParams,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    run(image, params, execution, resampler)
}

/// Like [`elastic`] with a caller-supplied smoother.
pub fn elastic_with(
    image: &mut Image,
    params: &ElasticParams,
    smoother: &dyn Smoother,
    execution: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    struct WithSmoother<'a> {
        params: &'a ElasticParams,
        smoother: &'a dyn Smoother,
    }

    impl SpatialOp for WithSmoother<'_> {
        fn build(&self, ctx: &BuildContext) -> Result<PendingOp> {
            self.params.build_with(ctx, self.smoother)
        }

        fn shape_override(&self) -> Option<&Shape> {
            self.params.shape_override.as_ref()
        }
    }

    run(image, &WithSmoother { params, smoother }, execution, resampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ctx(dims: &[usize]) -> BuildContext {
        BuildContext::new(Shape::new(dims.to_vec()).unwrap())
    }

    /// Returns the offsets unchanged.
    struct Passthrough;

    impl Smoother for Passthrough {
        fn smooth(&self, field: &Field, _sigma: f64) -> Result<Field> {
            Ok(field.clone())
        }
    }

    #[test]
    fn test_random_offsets_range_and_seed() {
        let a = random_offsets(&mut StdRng::seed_from_u64(7), 2, &[6, 5]).unwrap();
        let b = random_offsets(&mut StdRng::seed_from_u64(7), 2, &[6, 5]).unwrap();
        assert_eq!(a, b);
        assert!(a.data().iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_zero_offsets_give_identity_grid() {
        let offsets = Field::zeros(2, &[4, 3]).unwrap();
        let op = ElasticParams::new(2.0, 5.0, offsets).build(&ctx(&[1, 4, 3])).unwrap();
        assert_eq!(op.transform.as_field().unwrap(), &create_grid(&[4, 3]).unwrap());
        assert_eq!(op.shape_override().dims(), &[1, 4, 3]);
        let p = op.meta.resample_params();
        assert_eq!(p.mode, Some(Interpolation::Bilinear));
        assert_eq!(p.padding_mode, Some(PaddingMode::Reflection));
    }

    #[test]
    fn test_displacement_scaled_by_magnitude() {
        let offsets = Field::from_vec(1, &[3], vec![1.0, 0.0, -1.0]).unwrap();
        let params = ElasticParams::new(1.0, 0.5, offsets);
        let op = params.build_with(&ctx(&[1, 3]), &Passthrough).unwrap();
        let grid = op.transform.as_field().unwrap();
        assert_relative_eq!(grid.component(0)[0], -1.0 + 0.5);
        assert_relative_eq!(grid.component(0)[2], 1.0 - 0.5);
        assert!(grid.component(1).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_spatial_size_grid_keeps_input_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = ElasticParams::random(&mut rng, 1.0, 1.0, &[4, 4])
            .unwrap()
            .with_spatial_size(vec![4, -1]);
        let op = params.build(&ctx(&[1, 8, 4])).unwrap();
        assert_eq!(op.transform.as_field().unwrap().spatial(), &[4, 4]);
        assert_eq!(op.shape_override().dims(), &[1, 8, 4]);
    }

    #[test]
    fn test_offsets_must_match_grid() {
        let offsets = Field::zeros(2, &[4, 4]).unwrap();
        let err = ElasticParams::new(1.0, 1.0, offsets.clone()).build(&ctx(&[1, 5, 4])).unwrap_err();
        assert!(err.is_shape());
        let err = ElasticParams::new(1.0, 1.0, offsets).build(&ctx(&[1, 4, 4, 4])).unwrap_err();
        assert!(err.is_shape());
    }
}
