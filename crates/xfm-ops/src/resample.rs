//! Pixel resampling interface.
//!
//! The engine decides *what* transform and output shape to request; turning
//! that into pixels is the job of a [`Resampler`] supplied by the caller.

use crate::pending::Transform;
use xfm_core::{DType, Interpolation, PaddingMode, Result, Shape, Volume};

/// Parameters handed to a [`Resampler`] alongside the transform.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleParams {
    /// Shape of the resampled volume.
    pub output_shape: Shape,
    /// Interpolation mode, `None` leaves the choice to the resampler.
    pub mode: Option<Interpolation>,
    /// Out-of-bounds handling, `None` leaves the choice to the resampler.
    pub padding_mode: Option<PaddingMode>,
    /// Output dtype, `None` keeps the source dtype.
    pub dtype: Option<DType>,
    /// Pin extreme samples to voxel corners.
    pub align_corners: bool,
    /// Smooth before downsampling (resize only).
    pub anti_aliasing: Option<bool>,
    /// Per-axis anti-aliasing sigma (resize only).
    pub anti_aliasing_sigma: Option<Vec<f64>>,
}

impl ResampleParams {
    /// Parameters with only the output shape set.
    pub fn new(output_shape: Shape) -> Self {
        Self {
            output_shape,
            mode: None,
            padding_mode: None,
            dtype: None,
            align_corners: false,
            anti_aliasing: None,
            anti_aliasing_sigma: None,
        }
    }

    /// Overlays `later` on top of `self`.
    ///
    /// Sampling options set by `later` win; the output shape and corner
    /// alignment always come from `later`.
    pub fn merge(&mut self, later: &ResampleParams) {
        self.output_shape = later.output_shape.clone();
        self.align_corners = later.align_corners;
        if later.mode.is_some() {
            self.mode = later.mode;
        }
        if later.padding_mode.is_some() {
            self.padding_mode = later.padding_mode;
        }
        if later.dtype.is_some() {
            self.dtype = later.dtype;
        }
        if later.anti_aliasing.is_some() {
            self.anti_aliasing = later.anti_aliasing;
        }
        if later.anti_aliasing_sigma.is_some() {
            self.anti_aliasing_sigma = later.anti_aliasing_sigma.clone();
        }
    }
}

/// Resamples a volume through a transform.
///
/// Implementations must return a volume of `params.output_shape`. Errors
/// should be reported as [`xfm_core::Error::External`].
pub trait Resampler {
    /// Produces the resampled volume.
    fn resample(&self, src: &Volume, transform: &Transform, params: &ResampleParams) -> Result<Volume>;
}

impl<F> Resampler for F
where
    F: Fn(&Volume, &Transform, &ResampleParams) -> Result<Volume>,
{
    fn resample(&self, src: &Volume, transform: &Transform, params: &ResampleParams) -> Result<Volume> {
        self(src, transform, params)
    }
}
