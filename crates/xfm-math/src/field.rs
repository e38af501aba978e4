//! Dense per-voxel vector fields.
//!
//! A [`Field`] stores `components` scalar arrays over a shared spatial grid
//! in the layout `[components, d1, ..., dK]` (component-major, last spatial
//! axis fastest). It is used for raw offset fields, smoothed displacement
//! fields and the homogeneous sampling grid of non-linear operations.

use xfm_core::{Error, Result};

/// Dense `[components, d1, ..., dK]` array of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    components: usize,
    spatial: Vec<usize>,
    data: Vec<f64>,
}

impl Field {
    /// Zero-filled field.
    pub fn zeros(components: usize, spatial: &[usize]) -> Result<Self> {
        let voxels = check_spatial(spatial)?;
        Ok(Self {
            components,
            spatial: spatial.to_vec(),
            data: vec![0.0; components * voxels],
        })
    }

    /// Wraps an existing buffer; length must be `components * prod(spatial)`.
    pub fn from_vec(components: usize, spatial: &[usize], data: Vec<f64>) -> Result<Self> {
        let voxels = check_spatial(spatial)?;
        if data.len() != components * voxels {
            return Err(Error::InvalidShape(format!(
                "field buffer of {} values does not fit {components} x {spatial:?}",
                data.len()
            )));
        }
        Ok(Self {
            components,
            spatial: spatial.to_vec(),
            data,
        })
    }

    /// Number of components.
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Spatial extents.
    #[inline]
    pub fn spatial(&self) -> &[usize] {
        &self.spatial
    }

    /// Number of voxels per component.
    #[inline]
    pub fn voxels(&self) -> usize {
        self.spatial.iter().product()
    }

    /// Read-only view of component `c`.
    pub fn component(&self, c: usize) -> &[f64] {
        let n = self.voxels();
        &self.data[c * n..(c + 1) * n]
    }

    /// Mutable view of component `c`.
    pub fn component_mut(&mut self, c: usize) -> &mut [f64] {
        let n = self.voxels();
        &mut self.data[c * n..(c + 1) * n]
    }

    /// All values, component-major.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Adds `scale * other` to the first `other.components()` components.
    pub fn add_scaled(&mut self, other: &Field, scale: f64) -> Result<()> {
        if other.spatial != self.spatial {
            return Err(Error::InvalidShape(format!(
                "field grids differ: {:?} vs {:?}",
                self.spatial, other.spatial
            )));
        }
        if other.components > self.components {
            return Err(Error::DimensionMismatch {
                what: "field components",
                expected: self.components,
                actual: other.components,
            });
        }
        let n = other.data.len();
        for (dst, src) in self.data[..n].iter_mut().zip(&other.data) {
            *dst += scale * src;
        }
        Ok(())
    }

    /// Row-major strides of the spatial axes.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.spatial.len()];
        for i in (0..self.spatial.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.spatial[i + 1];
        }
        strides
    }
}

/// Builds the centered homogeneous sampling grid over `spatial`.
///
/// The result has `K + 1` components: component `i` holds the coordinate
/// `j - (d_i - 1) / 2` of each voxel along axis `i`, and the last component
/// is all ones.
///
/// # Example
///
/// ```rust
/// use xfm_math::create_grid;
///
/// let grid = create_grid(&[3]).unwrap();
/// assert_eq!(grid.component(0), &[-1.0, 0.0, 1.0]);
/// assert_eq!(grid.component(1), &[1.0, 1.0, 1.0]);
/// ```
pub fn create_grid(spatial: &[usize]) -> Result<Field> {
    let rank = spatial.len();
    let mut grid = Field::zeros(rank + 1, spatial)?;
    let strides = grid.strides();

    for axis in 0..rank {
        let d = spatial[axis];
        let center = (d as f64 - 1.0) / 2.0;
        let stride = strides[axis];
        let comp = grid.component_mut(axis);
        for (idx, v) in comp.iter_mut().enumerate() {
            let j = (idx / stride) % d;
            *v = j as f64 - center;
        }
    }
    grid.component_mut(rank).fill(1.0);
    Ok(grid)
}

fn check_spatial(spatial: &[usize]) -> Result<usize> {
    if spatial.is_empty() {
        return Err(Error::InvalidShape("field needs at least one spatial axis".into()));
    }
    if spatial.contains(&0) {
        return Err(Error::InvalidShape(format!(
            "field has a zero-sized axis: {spatial:?}"
        )));
    }
    Ok(spatial.iter().product())
}
