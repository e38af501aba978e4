//! Concrete channel-first image buffers.
//!
//! [`Volume`] is the pixel container the transform engine hands to a
//! resampler. It stores `f32` samples in channel-first, row-major order
//! (last spatial axis fastest) together with the physical voxel spacing and
//! the element type the data represents.
//!
//! # Memory Management
//!
//! The sample buffer lives in an [`Arc<Vec<f32>>`], so cloning a volume is
//! cheap and queued operations never copy pixel data. Use
//! [`make_mut`](Volume::make_mut) to get an exclusive mutable buffer.
//!
//! # Usage
//!
//! ```rust
//! use xfm_core::{Shape, Volume};
//!
//! let shape = Shape::new(vec![1, 4, 4]).unwrap();
//! let vol = Volume::zeros(shape).with_spacing(vec![0.5, 0.5]).unwrap();
//! assert_eq!(vol.data().len(), 16);
//! assert_eq!(vol.spacing(), vec![0.5, 0.5]);
//! ```

use crate::{DType, Error, Result, Shape};
use std::sync::Arc;

/// Owned channel-first image buffer.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Sample buffer (Arc for cheap cloning)
    data: Arc<Vec<f32>>,
    shape: Shape,
    /// Physical voxel spacing, one entry per spatial axis
    spacing: Option<Vec<f64>>,
    dtype: DType,
}

impl Volume {
    /// Creates a zero-filled volume.
    pub fn zeros(shape: Shape) -> Self {
        Self {
            data: Arc::new(vec![0.0; shape.num_elements()]),
            shape,
            spacing: None,
            dtype: DType::default(),
        }
    }

    /// Wraps an existing buffer. Fails if the length does not match `shape`.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.num_elements() {
            return Err(Error::InvalidShape(format!(
                "buffer of {} samples does not fit shape {shape}",
                data.len()
            )));
        }
        Ok(Self {
            data: Arc::new(data),
            shape,
            spacing: None,
            dtype: DType::default(),
        })
    }

    /// Sets the physical voxel spacing. Length must equal the spatial rank.
    pub fn with_spacing(mut self, spacing: Vec<f64>) -> Result<Self> {
        if spacing.len() != self.shape.spatial_rank() {
            return Err(Error::DimensionMismatch {
                what: "voxel spacing",
                expected: self.shape.spatial_rank(),
                actual: spacing.len(),
            });
        }
        self.spacing = Some(spacing);
        Ok(self)
    }

    /// Sets the element type.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Shape of the buffer.
    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Element type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Voxel spacing; unit spacing when none was set.
    pub fn spacing(&self) -> Vec<f64> {
        match &self.spacing {
            Some(s) => s.clone(),
            None => vec![1.0; self.shape.spatial_rank()],
        }
    }

    /// True when an explicit spacing was attached.
    #[inline]
    pub fn has_spacing(&self) -> bool {
        self.spacing.is_some()
    }

    /// Read-only samples.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable samples, cloning the buffer if it is shared.
    pub fn make_mut(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Reshapes to `rank` spatial dims by appending singleton axes.
    ///
    /// The sample order is unchanged. Spacing, when present, is extended
    /// with unit entries.
    pub fn expand_spatial(mut self, rank: usize) -> Self {
        if rank <= self.shape.spatial_rank() {
            return self;
        }
        self.shape = self.shape.padded_to(rank);
        if let Some(spacing) = self.spacing.as_mut() {
            spacing.resize(rank, 1.0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_vec_checks_len() {
        let shape = Shape::new(vec![2, 3]).unwrap();
        assert!(Volume::from_vec(shape.clone(), vec![0.0; 6]).is_ok());
        assert!(Volume::from_vec(shape, vec![0.0; 5]).unwrap_err().is_shape());
    }

    #[test]
    fn test_spacing_default_and_validation() {
        let vol = Volume::zeros(Shape::new(vec![1, 2, 2, 2]).unwrap());
        assert_eq!(vol.spacing(), vec![1.0; 3]);
        assert!(!vol.has_spacing());
        assert!(vol.clone().with_spacing(vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_make_mut_copy_on_write() {
        let a = Volume::zeros(Shape::new(vec![1, 2]).unwrap());
        let mut b = a.clone();
        b.make_mut()[0] = 3.5;
        assert_relative_eq!(b.data()[0], 3.5);
        assert_relative_eq!(a.data()[0], 0.0);
    }

    #[test]
    fn test_expand_spatial() {
        let vol = Volume::zeros(Shape::new(vec![1, 4]).unwrap())
            .with_spacing(vec![0.5])
            .unwrap()
            .expand_spatial(3);
        assert_eq!(vol.shape().dims(), &[1, 4, 1, 1]);
        assert_eq!(vol.spacing(), vec![0.5, 1.0, 1.0]);
    }
}
