//! Channel-first image shapes.
//!
//! A [`Shape`] is `[C, d1, ..., dK]`: the channel count followed by K
//! spatial extents. Shapes are what every transform builder predicts, so
//! they are validated once here and passed around by value afterwards.

use crate::{Error, Result};
use std::fmt;

/// Channel-first shape `[C, d1, ..., dK]`.
///
/// # Example
///
/// ```rust
/// use xfm_core::Shape;
///
/// let shape = Shape::new(vec![1, 10, 20]).unwrap();
/// assert_eq!(shape.channels(), 1);
/// assert_eq!(shape.spatial(), &[10, 20]);
/// assert_eq!(shape.spatial_rank(), 2);
/// assert_eq!(shape.to_string(), "(1, 10, 20)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape from channel-first dims.
    ///
    /// Fails if `dims` is empty or any spatial extent is zero.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(Error::InvalidShape(
                "shape needs at least a channel dimension".into(),
            ));
        }
        if let Some(axis) = dims[1..].iter().position(|&d| d == 0) {
            return Err(Error::InvalidShape(format!(
                "spatial axis {axis} has zero extent in {dims:?}"
            )));
        }
        Ok(Self { dims })
    }

    /// Creates a shape from a channel count and spatial extents.
    pub fn from_parts(channels: usize, spatial: &[usize]) -> Result<Self> {
        let mut dims = Vec::with_capacity(spatial.len() + 1);
        dims.push(channels);
        dims.extend_from_slice(spatial);
        Self::new(dims)
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.dims[0]
    }

    /// Spatial extents `[d1, ..., dK]`.
    #[inline]
    pub fn spatial(&self) -> &[usize] {
        &self.dims[1..]
    }

    /// Number of spatial dimensions K.
    #[inline]
    pub fn spatial_rank(&self) -> usize {
        self.dims.len() - 1
    }

    /// All dims, channel first.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Total number of elements.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns a copy with trailing singleton spatial dims appended until
    /// the spatial rank reaches `rank`. Shapes already at or above `rank`
    /// are returned unchanged.
    pub fn padded_to(&self, rank: usize) -> Self {
        let mut dims = self.dims.clone();
        while dims.len() < rank + 1 {
            dims.push(1);
        }
        Self { dims }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = Error;

    fn try_from(dims: Vec<usize>) -> Result<Self> {
        Self::new(dims)
    }
}

impl TryFrom<&[usize]> for Shape {
    type Error = Error;

    fn try_from(dims: &[usize]) -> Result<Self> {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_parts() {
        let s = Shape::from_parts(3, &[4, 5, 6]).unwrap();
        assert_eq!(s.dims(), &[3, 4, 5, 6]);
        assert_eq!(s.num_elements(), 360);
    }

    #[test]
    fn test_shape_rejects_empty_and_zero() {
        assert!(Shape::new(vec![]).unwrap_err().is_shape());
        assert!(Shape::new(vec![1, 0, 4]).unwrap_err().is_shape());
        // A zero channel count is legal (empty label maps etc.)
        assert!(Shape::new(vec![0, 4]).is_ok());
    }

    #[test]
    fn test_shape_padded() {
        let s = Shape::new(vec![2, 8]).unwrap();
        assert_eq!(s.padded_to(3).dims(), &[2, 8, 1, 1]);
        assert_eq!(s.padded_to(1), s);
    }
}
