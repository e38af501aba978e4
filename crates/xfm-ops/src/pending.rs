//! Pending-operation records.
//!
//! A [`PendingOp`] is the immutable pair a transform builder produces: the
//! transform itself (a homogeneous [`Matrix`] or a dense sampling [`Field`])
//! and an [`OpMeta`] record. The metadata always carries the predicted
//! output shape plus the typed parameters of the operation, which is enough
//! to resample either right away or after composition with later records.

use crate::resample::ResampleParams;
use xfm_core::{DType, Interpolation, PaddingMode, Shape};
use xfm_math::{Field, Matrix};

/// Transform carried by a pending operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Linear/affine map in homogeneous coordinates.
    Matrix(Matrix),
    /// Per-voxel homogeneous sampling grid (non-linear operations).
    Field(Field),
}

impl Transform {
    /// The matrix, if this is a linear transform.
    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Transform::Matrix(m) => Some(m),
            Transform::Field(_) => None,
        }
    }

    /// The sampling grid, if this is a non-linear transform.
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Transform::Matrix(_) => None,
            Transform::Field(f) => Some(f),
        }
    }

    /// Spatial rank the transform operates in.
    pub fn spatial_rank(&self) -> usize {
        match self {
            Transform::Matrix(m) => m.spatial_rank(),
            Transform::Field(f) => f.spatial().len(),
        }
    }
}

/// How `resize` interprets its target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeMode {
    /// Every spatial axis gets an explicit size.
    #[default]
    All,
    /// The longest axis gets the (scalar) size, the rest keep aspect ratio.
    Longest,
}

impl SizeMode {
    /// Canonical lower-case name.
    pub const fn name(&self) -> &'static str {
        match self {
            SizeMode::All => "all",
            SizeMode::Longest => "longest",
        }
    }
}

impl std::str::FromStr for SizeMode {
    type Err = xfm_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SizeMode::All),
            "longest" => Ok(SizeMode::Longest),
            _ => Err(xfm_core::Error::UnknownOption {
                kind: "size mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Operation-specific metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// Identity resample (optionally a cast / re-interpolation).
    Identity {
        /// Interpolation mode.
        mode: Option<Interpolation>,
        /// Padding mode.
        padding_mode: Option<PaddingMode>,
        /// Output dtype.
        dtype: DType,
    },
    /// Resample to a new physical voxel spacing.
    Spacing {
        /// Target spacing per axis.
        pixdim: Vec<f64>,
        /// Source spacing per axis.
        src_pixdim: Vec<f64>,
        /// Diagonal resampling flag (always false, true is rejected).
        diagonal: bool,
        /// Interpolation mode.
        mode: Interpolation,
        /// Padding mode.
        padding_mode: PaddingMode,
        /// Corner alignment flag for the resampler.
        align_corners: bool,
        /// Output dtype.
        dtype: DType,
    },
    /// Mirror along spatial axes.
    Flip {
        /// Flipped spatial axes.
        spatial_axis: Vec<usize>,
    },
    /// Resize to an explicit or aspect-preserving size.
    Resize {
        /// Requested size as given by the caller.
        spatial_size: Vec<i64>,
        /// Size interpretation.
        size_mode: SizeMode,
        /// Interpolation mode.
        mode: Interpolation,
        /// Corner alignment flag for the resampler.
        align_corners: bool,
        /// Smooth before downsampling.
        anti_aliasing: Option<bool>,
        /// Gaussian sigma per axis for anti-aliasing.
        anti_aliasing_sigma: Option<Vec<f64>>,
        /// Output dtype.
        dtype: DType,
    },
    /// Rotation by arbitrary angles.
    Rotate {
        /// Angles in radians (1 for 2D, 3 for 3D).
        angle: Vec<f64>,
        /// Keep the input shape instead of growing to fit.
        keep_size: bool,
        /// Interpolation mode.
        mode: Interpolation,
        /// Padding mode.
        padding_mode: PaddingMode,
        /// Corner alignment applied to the transform.
        align_corners: bool,
        /// Output dtype.
        dtype: DType,
    },
    /// Zoom by per-axis factors.
    Zoom {
        /// Stored scale factors (reciprocals of the requested zoom).
        factor: Vec<f64>,
        /// Interpolation mode.
        mode: Interpolation,
        /// Padding mode.
        padding_mode: PaddingMode,
        /// Corner alignment applied to the transform.
        align_corners: bool,
        /// Keep the input shape.
        keep_size: bool,
        /// Output dtype.
        dtype: DType,
    },
    /// Quarter-turn rotation in a plane.
    Rotate90 {
        /// Number of quarter turns.
        k: i64,
        /// Rotation plane.
        spatial_axes: (usize, usize),
    },
    /// Smoothed random elastic deformation.
    Elastic {
        /// Smoothing sigma.
        sigma: f64,
        /// Displacement magnitude.
        magnitude: f64,
        /// Requested sampling grid size, if any.
        spatial_size: Option<Vec<i64>>,
        /// Interpolation mode.
        mode: Interpolation,
        /// Padding mode.
        padding_mode: PaddingMode,
    },
    /// Translation.
    Translate {
        /// Offset per spatial axis.
        translation: Vec<f64>,
        /// Interpolation mode.
        mode: Interpolation,
        /// Padding mode.
        padding_mode: PaddingMode,
        /// Output dtype.
        dtype: DType,
    },
}

impl OpKind {
    /// Operation name.
    pub const fn name(&self) -> &'static str {
        match self {
            OpKind::Identity { .. } => "identity",
            OpKind::Spacing { .. } => "spacing",
            OpKind::Flip { .. } => "flip",
            OpKind::Resize { .. } => "resize",
            OpKind::Rotate { .. } => "rotate",
            OpKind::Zoom { .. } => "zoom",
            OpKind::Rotate90 { .. } => "rotate90",
            OpKind::Elastic { .. } => "elastic",
            OpKind::Translate { .. } => "translate",
        }
    }
}

/// Metadata of a pending operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OpMeta {
    /// Predicted output shape.
    pub shape_override: Shape,
    /// Operation parameters.
    pub kind: OpKind,
}

impl OpMeta {
    /// Resampling parameters implied by this record.
    pub fn resample_params(&self) -> ResampleParams {
        let mut params = ResampleParams::new(self.shape_override.clone());
        match &self.kind {
            OpKind::Identity { mode, padding_mode, dtype } => {
                params.mode = *mode;
                params.padding_mode = *padding_mode;
                params.dtype = Some(*dtype);
            }
            OpKind::Spacing { mode, padding_mode, align_corners, dtype, .. }
            | OpKind::Rotate { mode, padding_mode, align_corners, dtype, .. }
            | OpKind::Zoom { mode, padding_mode, align_corners, dtype, .. } => {
                params.mode = Some(*mode);
                params.padding_mode = Some(*padding_mode);
                params.align_corners = *align_corners;
                params.dtype = Some(*dtype);
            }
            OpKind::Resize { mode, align_corners, anti_aliasing, anti_aliasing_sigma, dtype, .. } => {
                params.mode = Some(*mode);
                params.align_corners = *align_corners;
                params.dtype = Some(*dtype);
                params.anti_aliasing = *anti_aliasing;
                params.anti_aliasing_sigma = anti_aliasing_sigma.clone();
            }
            OpKind::Elastic { mode, padding_mode, .. } => {
                params.mode = Some(*mode);
                params.padding_mode = Some(*padding_mode);
            }
            OpKind::Translate { mode, padding_mode, dtype, .. } => {
                params.mode = Some(*mode);
                params.padding_mode = Some(*padding_mode);
                params.dtype = Some(*dtype);
            }
            OpKind::Flip { .. } | OpKind::Rotate90 { .. } => {}
        }
        params
    }
}

/// A queued, not-yet-applied spatial operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOp {
    /// Transform to apply.
    pub transform: Transform,
    /// Output shape and parameters.
    pub meta: OpMeta,
}

impl PendingOp {
    /// Creates a record.
    pub fn new(transform: Transform, meta: OpMeta) -> Self {
        Self { transform, meta }
    }

    /// Operation name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.meta.kind.name()
    }

    /// Predicted output shape.
    #[inline]
    pub fn shape_override(&self) -> &Shape {
        &self.meta.shape_override
    }

    /// True for matrix-backed records.
    #[inline]
    pub fn is_matrix(&self) -> bool {
        matches!(self.transform, Transform::Matrix(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> Shape {
        Shape::new(vec![1, 8, 8]).unwrap()
    }

    #[test]
    fn test_resample_params_from_rotate() {
        let meta = OpMeta {
            shape_override: shape(),
            kind: OpKind::Rotate {
                angle: vec![0.1],
                keep_size: true,
                mode: Interpolation::Bilinear,
                padding_mode: PaddingMode::Reflection,
                align_corners: true,
                dtype: DType::F64,
            },
        };
        let p = meta.resample_params();
        assert_eq!(p.output_shape, shape());
        assert_eq!(p.mode, Some(Interpolation::Bilinear));
        assert_eq!(p.padding_mode, Some(PaddingMode::Reflection));
        assert_eq!(p.dtype, Some(DType::F64));
        assert!(p.align_corners);
    }

    #[test]
    fn test_flip_has_no_sampling_options() {
        let meta = OpMeta {
            shape_override: shape(),
            kind: OpKind::Flip { spatial_axis: vec![0] },
        };
        let p = meta.resample_params();
        assert_eq!(p.mode, None);
        assert_eq!(p.dtype, None);
        assert!(!p.align_corners);
    }

    #[test]
    fn test_size_mode_parse() {
        assert_eq!("Longest".parse::<SizeMode>().unwrap(), SizeMode::Longest);
        assert!("shortest".parse::<SizeMode>().is_err());
    }

    #[test]
    fn test_transform_accessors() {
        let t = Transform::Matrix(Matrix::identity(3));
        assert_eq!(t.spatial_rank(), 3);
        assert!(t.as_field().is_none());
        let op = PendingOp::new(
            t,
            OpMeta {
                shape_override: shape(),
                kind: OpKind::Rotate90 { k: 1, spatial_axes: (0, 1) },
            },
        );
        assert_eq!(op.name(), "rotate90");
        assert!(op.is_matrix());
    }
}
