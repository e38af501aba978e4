//! # xfm-math
//!
//! Math primitives for lazy spatial transforms.
//!
//! - [`Matrix`] - `(K+1)x(K+1)` homogeneous matrices for any spatial rank
//! - [`Field`] - Dense per-voxel vector fields, see [`create_grid`]
//! - [`extents_from_shape`], [`shape_from_extents`], [`transform_shape`] -
//!   output-shape prediction from corner extents
//!
//! # Design
//!
//! Spatial rank is a runtime property of the image, so [`Matrix`] uses
//! flat dynamic storage and converts to [`glam`] for the 2D/3D cases.
//! All matrices are **row-major** and act on **column vectors**:
//!
//! ```text
//! result = matrix * point
//! ```
//!
//! # Dependencies
//!
//! - [`glam`] - 3D rotation construction and fixed-size interop
//! - `xfm-core` - Shape and error types
//!
//! # Used By
//!
//! - `xfm-ops` - Transform builders and composition

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod extents;
mod field;
mod matrix;

pub use extents::*;
pub use field::*;
pub use matrix::*;

/// Re-export glam types for direct use
pub mod glam {
    pub use ::glam::{DMat3, DMat4};
}
