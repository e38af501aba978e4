//! Square homogeneous matrices of any spatial rank.
//!
//! [`Matrix`] is a `(K+1)x(K+1)` affine map on K-dimensional points in
//! homogeneous coordinates. K is only known at runtime (it comes from the
//! image shape), so unlike the fixed-size glam types the storage is a flat
//! vector. 2D and 3D matrices convert to and from `glam::DMat3` /
//! `glam::DMat4`.
//!
//! # Convention
//!
//! Matrices are stored in **row-major** order and act on **column vectors**:
//!
//! ```text
//! | a b tx |   | x |   | a*x + b*y + tx |
//! | c d ty | * | y | = | c*x + d*y + ty |
//! | 0 0 1  |   | 1 |   | 1              |
//! ```
//!
//! Composition `b.matmul(&a)` applies `a` first, then `b`.
//!
//! # Usage
//!
//! ```rust
//! use xfm_math::Matrix;
//!
//! let s = Matrix::scale(&[2.0, 3.0]).unwrap();
//! let t = Matrix::translation(&[1.0, 1.0]).unwrap();
//! let st = t.matmul(&s).unwrap();
//! assert_eq!(st.transform_point(&[1.0, 1.0, 1.0]).unwrap(), vec![3.0, 4.0, 1.0]);
//! ```

use glam::{DMat3, DMat4};
use std::fmt;
use xfm_core::{Error, Result};

/// Square homogeneous matrix, row-major `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Side length (K+1)
    n: usize,
    m: Vec<f64>,
}

impl Matrix {
    /// Identity for `rank` spatial dims.
    pub fn identity(rank: usize) -> Self {
        let n = rank + 1;
        let mut m = vec![0.0; n * n];
        for i in 0..n {
            m[i * n + i] = 1.0;
        }
        Self { n, m }
    }

    /// Creates a matrix from rows.
    ///
    /// Rows must form a square matrix of side at least 2.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(Error::MalformedMatrix {
                rows: n,
                cols: rows.first().map_or(0, Vec::len),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(Error::MalformedMatrix {
                rows: n,
                cols: bad.len(),
            });
        }
        Ok(Self {
            n,
            m: rows.iter().flatten().copied().collect(),
        })
    }

    /// Diagonal scale, one factor per spatial axis.
    pub fn scale(factors: &[f64]) -> Result<Self> {
        if factors.is_empty() {
            return Err(Error::InvalidParameter("scale needs at least one factor".into()));
        }
        let mut out = Self::identity(factors.len());
        for (i, &f) in factors.iter().enumerate() {
            out.set(i, i, f);
        }
        Ok(out)
    }

    /// Pure translation, one offset per spatial axis.
    pub fn translation(offsets: &[f64]) -> Result<Self> {
        if offsets.is_empty() {
            return Err(Error::InvalidParameter(
                "translation needs at least one offset".into(),
            ));
        }
        let rank = offsets.len();
        let mut out = Self::identity(rank);
        for (i, &t) in offsets.iter().enumerate() {
            out.set(i, rank, t);
        }
        Ok(out)
    }

    /// Mirror about the origin along each of `axes`.
    ///
    /// Repeated axes are flipped once.
    pub fn flip(rank: usize, axes: &[usize]) -> Result<Self> {
        let mut out = Self::identity(rank);
        for &axis in axes {
            if axis >= rank {
                return Err(Error::AxisOutOfRange { axis, rank });
            }
            out.set(axis, axis, -1.0);
        }
        Ok(out)
    }

    /// 2D rotation by `angle` radians (counter-clockwise).
    pub fn rotation_2d(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_dmat3(DMat3::from_cols_array_2d(&[
            [c, s, 0.0],
            [-s, c, 0.0],
            [0.0, 0.0, 1.0],
        ]))
    }

    /// 3D rotation from per-axis angles, composed as `Rx * Ry * Rz`.
    pub fn rotation_3d(angles: [f64; 3]) -> Self {
        let r = DMat3::from_rotation_x(angles[0])
            * DMat3::from_rotation_y(angles[1])
            * DMat3::from_rotation_z(angles[2]);
        Self::from_dmat4(DMat4::from_mat3(r))
    }

    /// Rotation by `k` quarter turns in the plane of `axes`.
    ///
    /// Entries are exact (0, 1 or -1). Negative `k` rotates the other way.
    pub fn rotate_90(rank: usize, axes: (usize, usize), k: i64) -> Result<Self> {
        let (a, b) = axes;
        for axis in [a, b] {
            if axis >= rank {
                return Err(Error::AxisOutOfRange { axis, rank });
            }
        }
        if a == b {
            return Err(Error::InvalidParameter(format!(
                "rotation plane needs two distinct axes, got ({a}, {b})"
            )));
        }
        let (cos, sin) = match k.rem_euclid(4) {
            0 => (1.0, 0.0),
            1 => (0.0, 1.0),
            2 => (-1.0, 0.0),
            _ => (0.0, -1.0),
        };
        let mut out = Self::identity(rank);
        out.set(a, a, cos);
        out.set(a, b, -sin);
        out.set(b, a, sin);
        out.set(b, b, cos);
        Ok(out)
    }

    /// Side length K+1.
    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Number of spatial dims K.
    #[inline]
    pub fn spatial_rank(&self) -> usize {
        self.n - 1
    }

    /// Element at (`row`, `col`).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row * self.n + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, v: f64) {
        self.m[row * self.n + col] = v;
    }

    /// Row `i` as a slice.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.m[i * self.n..(i + 1) * self.n]
    }

    /// Matrix product `self * rhs`.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        if self.n != rhs.n {
            return Err(Error::DimensionMismatch {
                what: "matrix product",
                expected: self.n,
                actual: rhs.n,
            });
        }
        let n = self.n;
        let mut m = vec![0.0; n * n];
        for i in 0..n {
            for k in 0..n {
                let a = self.m[i * n + k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    m[i * n + j] += a * rhs.m[k * n + j];
                }
            }
        }
        Ok(Self { n, m })
    }

    /// Applies the matrix to a homogeneous point of length K+1.
    pub fn transform_point(&self, p: &[f64]) -> Result<Vec<f64>> {
        if p.len() != self.n {
            return Err(Error::DimensionMismatch {
                what: "homogeneous point",
                expected: self.n,
                actual: p.len(),
            });
        }
        Ok((0..self.n)
            .map(|i| self.row(i).iter().zip(p).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Element-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.n == other.n
            && self
                .m
                .iter()
                .zip(&other.m)
                .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// True if within `eps` of the identity.
    pub fn is_identity(&self, eps: f64) -> bool {
        self.approx_eq(&Self::identity(self.spatial_rank()), eps)
    }

    /// Returns true if all elements are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.m.iter().all(|x| x.is_finite())
    }

    /// Converts a 2D homogeneous matrix to glam (column-major).
    pub fn to_dmat3(&self) -> Option<DMat3> {
        (self.n == 3).then(|| DMat3::from_cols_array_2d(&self.cols_3()))
    }

    /// Converts a 3D homogeneous matrix to glam (column-major).
    pub fn to_dmat4(&self) -> Option<DMat4> {
        (self.n == 4).then(|| DMat4::from_cols_array_2d(&self.cols_4()))
    }

    /// Creates from glam DMat3.
    pub fn from_dmat3(m: DMat3) -> Self {
        let cols = m.to_cols_array_2d();
        let mut out = Self::identity(2);
        for (c, col) in cols.iter().enumerate() {
            for (r, &v) in col.iter().enumerate() {
                out.set(r, c, v);
            }
        }
        out
    }

    /// Creates from glam DMat4.
    pub fn from_dmat4(m: DMat4) -> Self {
        let cols = m.to_cols_array_2d();
        let mut out = Self::identity(3);
        for (c, col) in cols.iter().enumerate() {
            for (r, &v) in col.iter().enumerate() {
                out.set(r, c, v);
            }
        }
        out
    }

    fn cols_3(&self) -> [[f64; 3]; 3] {
        let mut cols = [[0.0; 3]; 3];
        for (c, col) in cols.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = self.get(r, c);
            }
        }
        cols
    }

    fn cols_4(&self) -> [[f64; 4]; 4] {
        let mut cols = [[0.0; 4]; 4];
        for (c, col) in cols.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = self.get(r, c);
            }
        }
        cols
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(4);
        for i in 0..self.n {
            write!(f, "[")?;
            for (j, v) in self.row(i).iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                // avoid printing -0.0000
                let v = if v.abs() < 0.5 * 10f64.powi(-(prec as i32)) { 0.0 } else { *v };
                write!(f, "{v:>9.prec$}")?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
