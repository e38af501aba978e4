//! # xfm-ops
//!
//! Lazy spatial transforms for channel-first N-dimensional images.
//!
//! Each spatial operation is expressed as a homogeneous transform (or a
//! sampling grid for non-linear cases) plus a metadata record, instead of
//! being applied to pixels right away. Records queued on a tracked
//! [`Image`] are composed into as few resampling passes as possible.
//!
//! # Modules
//!
//! - [`spatial`] - Transform builders (identity, spacing, flip, resize,
//!   rotate, zoom, rotate90, translate, elastic)
//! - [`pending`] - Pending-operation records
//! - [`lazy`] - Dispatch, composition and execution
//! - [`image`] - Image handles with an optional pending log
//! - [`resample`] - Resampler interface supplied by the caller
//! - [`smooth`] - Field smoothing for elastic deformation
//!
//! # Example
//!
//! ```rust
//! use xfm_core::{Result, Shape, Volume};
//! use xfm_ops::spatial::{flip, rotate, FlipParams, RotateParams};
//! use xfm_ops::{ExecutionMode, Image, ResampleParams, Transform};
//!
//! // Stand-in resampler producing zeros of the requested shape
//! let resampler = |_: &Volume, _: &Transform, p: &ResampleParams| -> Result<Volume> {
//!     Ok(Volume::zeros(p.output_shape.clone()))
//! };
//!
//! let mut img = Image::tracked(Volume::zeros(Shape::new(vec![1, 10, 10]).unwrap()));
//! flip(&mut img, &FlipParams::new(vec![0]), ExecutionMode::Deferred, &resampler).unwrap();
//! let grow = RotateParams::new(vec![std::f64::consts::FRAC_PI_4]).with_keep_size(false);
//! rotate(&mut img, &grow, ExecutionMode::Deferred, &resampler).unwrap();
//! assert_eq!(img.peek_pending_shape().dims(), &[1, 15, 15]);
//!
//! // One resampling pass for both operations
//! img.drain_and_apply(&resampler).unwrap();
//! assert_eq!(img.current_shape().dims(), &[1, 15, 15]);
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - smooth field components on the rayon pool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod align;
pub mod image;
pub mod lazy;
pub mod pending;
pub mod resample;
pub mod smooth;
pub mod spatial;

pub use align::apply_align_corners;
pub use image::{Image, Tracking};
pub use lazy::{ExecutionMode, Stage, apply, compose_matrices, dispatch, execute, plan};
pub use pending::{OpKind, OpMeta, PendingOp, SizeMode, Transform};
pub use resample::{ResampleParams, Resampler};
pub use smooth::{GaussianSmoother, Smoother};
pub use spatial::{BuildContext, SpatialOp, build_op};
