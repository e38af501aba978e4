//! # xfm-core
//!
//! Core types for lazy spatial transforms of N-dimensional images.
//!
//! This crate provides the leaf types used throughout xfm-rs:
//!
//! - [`Shape`] - Channel-first shape `[C, d1, ..., dK]`
//! - [`Volume`] - Zero-copy channel-first sample buffer with voxel spacing
//! - [`DType`] - Requested output element type
//! - [`Interpolation`], [`PaddingMode`] - Resampling options
//! - [`Error`], [`Result`] - Unified error handling
//!
//! ## Crate Structure
//!
//! ```text
//! xfm-core (this crate)
//!    ^
//!    +-- xfm-math (homogeneous matrices, fields, extents)
//!    +-- xfm-ops  (builders, pending records, lazy dispatcher)
//!    +-- xfm-cli  (pipeline planner)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod format;
pub mod image;
pub mod mode;
pub mod shape;

pub use error::{Error, ErrorKind, Result};
pub use format::DType;
pub use image::Volume;
pub use mode::{Interpolation, PaddingMode};
pub use shape::Shape;
