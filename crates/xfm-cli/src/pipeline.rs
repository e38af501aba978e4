//! YAML pipeline files.
//!
//! ```yaml
//! input:
//!   shape: [1, 64, 64]
//!   spacing: [0.8, 0.8]
//!   dtype: float32
//! seed: 42
//! ops:
//!   - op: spacing
//!     pixdim: 1.0
//!   - op: rotate
//!     angle: 30
//!     degrees: true
//!     keep_size: false
//!   - op: elastic
//!     sigma: 4.0
//!     magnitude: 2.0
//! ```
//!
//! Files are parsed into raw serde structs first and then converted into
//! typed builder parameters, so option names are canonicalized in one place.

use std::path::Path;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tracing::debug;

use xfm_core::{DType, Interpolation, PaddingMode, Shape};
use xfm_ops::spatial::{
    ElasticParams, FlipParams, IdentityParams, ResizeParams, Rotate90Params, RotateParams, SpacingParams,
    TranslateParams, ZoomParams, random_offsets,
};
use xfm_ops::{BuildContext, PendingOp, SizeMode, build_op};

/// Operation names and the YAML keys each accepts.
pub const OPS: &[(&str, &[&str])] = &[
    ("identity", &["mode", "padding_mode", "dtype"]),
    (
        "spacing",
        &["pixdim", "src_pixdim", "diagonal", "mode", "padding_mode", "align_corners", "dtype"],
    ),
    ("flip", &["spatial_axis"]),
    (
        "resize",
        &[
            "spatial_size",
            "size_mode",
            "mode",
            "align_corners",
            "anti_aliasing",
            "anti_aliasing_sigma",
            "dtype",
        ],
    ),
    (
        "rotate",
        &["angle", "degrees", "keep_size", "mode", "padding_mode", "align_corners", "dtype"],
    ),
    (
        "zoom",
        &["factor", "keep_size", "mode", "padding_mode", "align_corners", "dtype"],
    ),
    ("rotate90", &["k", "spatial_axes"]),
    ("translate", &["translation", "mode", "padding_mode", "dtype"]),
    ("elastic", &["sigma", "magnitude", "spatial_size", "mode", "padding_mode"]),
];

// ============================================================================
// Raw YAML structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPipeline {
    input: RawInput,
    seed: Option<u64>,
    #[serde(default)]
    ops: Vec<RawOp>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInput {
    shape: Vec<usize>,
    spacing: Option<OneOrMany<f64>>,
    dtype: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum RawOp {
    Identity {
        mode: Option<String>,
        padding_mode: Option<String>,
        dtype: Option<String>,
    },
    Spacing {
        pixdim: OneOrMany<f64>,
        src_pixdim: Option<OneOrMany<f64>>,
        #[serde(default)]
        diagonal: bool,
        mode: Option<String>,
        padding_mode: Option<String>,
        align_corners: Option<bool>,
        dtype: Option<String>,
    },
    Flip {
        spatial_axis: Option<OneOrMany<usize>>,
    },
    Resize {
        spatial_size: OneOrMany<i64>,
        size_mode: Option<String>,
        mode: Option<String>,
        align_corners: Option<bool>,
        anti_aliasing: Option<bool>,
        anti_aliasing_sigma: Option<OneOrMany<f64>>,
        dtype: Option<String>,
    },
    Rotate {
        angle: OneOrMany<f64>,
        #[serde(default)]
        degrees: bool,
        keep_size: Option<bool>,
        mode: Option<String>,
        padding_mode: Option<String>,
        align_corners: Option<bool>,
        dtype: Option<String>,
    },
    Zoom {
        factor: OneOrMany<f64>,
        keep_size: Option<bool>,
        mode: Option<String>,
        padding_mode: Option<String>,
        align_corners: Option<bool>,
        dtype: Option<String>,
    },
    Rotate90 {
        k: Option<i64>,
        spatial_axes: Option<Vec<usize>>,
    },
    Translate {
        translation: Vec<f64>,
        mode: Option<String>,
        padding_mode: Option<String>,
        dtype: Option<String>,
    },
    Elastic {
        sigma: f64,
        magnitude: f64,
        spatial_size: Option<OneOrMany<i64>>,
        mode: Option<String>,
        padding_mode: Option<String>,
    },
}

// ============================================================================
// Typed pipeline
// ============================================================================

/// Elastic step; offsets are drawn once the input shape is known.
#[derive(Debug, Clone, PartialEq)]
pub struct ElasticStep {
    sigma: f64,
    magnitude: f64,
    spatial_size: Option<Vec<i64>>,
    mode: Option<Interpolation>,
    padding_mode: Option<PaddingMode>,
}

/// One parsed pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Identity(IdentityParams),
    Spacing(SpacingParams),
    Flip(FlipParams),
    Resize(ResizeParams),
    Rotate(RotateParams),
    Zoom(ZoomParams),
    Rotate90(Rotate90Params),
    Translate(TranslateParams),
    Elastic(ElasticStep),
}

impl Step {
    /// Builds the record for the input described by `ctx`.
    pub fn build(&self, ctx: &BuildContext, rng: &mut StdRng) -> xfm_core::Result<PendingOp> {
        match self {
            Step::Identity(p) => build_op(p, ctx),
            Step::Spacing(p) => build_op(p, ctx),
            Step::Flip(p) => build_op(p, ctx),
            Step::Resize(p) => build_op(p, ctx),
            Step::Rotate(p) => build_op(p, ctx),
            Step::Zoom(p) => build_op(p, ctx),
            Step::Rotate90(p) => build_op(p, ctx),
            Step::Translate(p) => build_op(p, ctx),
            Step::Elastic(e) => {
                let input = ctx.input_shape.spatial();
                let grid: Vec<usize> = match &e.spatial_size {
                    Some(size) if size.len() == input.len() => size
                        .iter()
                        .zip(input)
                        .map(|(&s, &d)| if s > 0 { s as usize } else { d })
                        .collect(),
                    // length errors surface from the builder
                    _ => input.to_vec(),
                };
                let offsets = random_offsets(rng, input.len(), &grid)?;
                let mut params = ElasticParams::new(e.sigma, e.magnitude, offsets);
                if let Some(size) = &e.spatial_size {
                    params = params.with_spatial_size(size.clone());
                }
                if let Some(mode) = e.mode {
                    params = params.with_mode(mode);
                }
                if let Some(padding_mode) = e.padding_mode {
                    params = params.with_padding_mode(padding_mode);
                }
                build_op(&params, ctx)
            }
        }
    }
}

/// A parsed pipeline file.
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Description of the input image.
    pub input: BuildContext,
    /// Steps in application order.
    pub steps: Vec<Step>,
    /// Seed for random offsets.
    pub seed: u64,
}

impl Pipeline {
    /// Loads a pipeline from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline: {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid pipeline: {}", path.display()))
    }

    /// Parses a pipeline from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let raw: RawPipeline = serde_yaml::from_str(yaml)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawPipeline) -> Result<Self> {
        let shape = Shape::new(raw.input.shape).context("input.shape")?;
        let mut input = BuildContext::new(shape);
        if let Some(spacing) = raw.input.spacing {
            let rank = input.input_shape.spatial_rank();
            input.spacing = match spacing.into_vec() {
                v if v.len() == 1 => vec![v[0]; rank],
                v => v,
            };
            anyhow::ensure!(
                input.spacing.len() == rank,
                "input.spacing has {} entries for {rank} spatial dims",
                input.spacing.len()
            );
        }
        if let Some(dtype) = raw.input.dtype {
            input.dtype = dtype.parse().context("input.dtype")?;
        }

        let steps = raw
            .ops
            .into_iter()
            .enumerate()
            .map(|(i, op)| convert_op(op).with_context(|| format!("ops[{i}]")))
            .collect::<Result<Vec<_>>>()?;
        debug!(steps = steps.len(), input = %input.input_shape, "Parsed pipeline");

        Ok(Self {
            input,
            steps,
            seed: raw.seed.unwrap_or(0),
        })
    }

    /// Builds every step, threading the predicted shape from one to the next.
    pub fn build(&self) -> Result<Vec<PendingOp>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut ctx = self.input.clone();
        let mut ops = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let op = step
                .build(&ctx, &mut rng)
                .with_context(|| format!("ops[{i}] on input {}", ctx.input_shape))?;
            ctx.advance(&op);
            ops.push(op);
        }
        Ok(ops)
    }
}

fn interpolation(value: Option<String>) -> Result<Option<Interpolation>> {
    Ok(value.map(|s| s.parse()).transpose()?)
}

fn padding(value: Option<String>) -> Result<Option<PaddingMode>> {
    Ok(value.map(|s| s.parse()).transpose()?)
}

fn dtype(value: Option<String>) -> Result<Option<DType>> {
    Ok(value.map(|s| s.parse()).transpose()?)
}

fn convert_op(raw: RawOp) -> Result<Step> {
    let step = match raw {
        RawOp::Identity { mode, padding_mode, dtype: dt } => Step::Identity(IdentityParams {
            mode: interpolation(mode)?,
            padding_mode: padding(padding_mode)?,
            dtype: dtype(dt)?,
            shape_override: None,
        }),
        RawOp::Spacing {
            pixdim,
            src_pixdim,
            diagonal,
            mode,
            padding_mode,
            align_corners,
            dtype: dt,
        } => {
            let mut p = SpacingParams::new(pixdim.into_vec());
            p.src_pixdim = src_pixdim.map(OneOrMany::into_vec);
            p.diagonal = diagonal;
            p.mode = interpolation(mode)?.unwrap_or(p.mode);
            p.padding_mode = padding(padding_mode)?.unwrap_or(p.padding_mode);
            p.align_corners = align_corners.unwrap_or(p.align_corners);
            p.dtype = dtype(dt)?;
            Step::Spacing(p)
        }
        RawOp::Flip { spatial_axis } => Step::Flip(FlipParams {
            spatial_axis: spatial_axis.map(OneOrMany::into_vec),
            shape_override: None,
        }),
        RawOp::Resize {
            spatial_size,
            size_mode,
            mode,
            align_corners,
            anti_aliasing,
            anti_aliasing_sigma,
            dtype: dt,
        } => {
            let mut p = ResizeParams::new(spatial_size.into_vec());
            if let Some(size_mode) = size_mode {
                p.size_mode = size_mode.parse::<SizeMode>()?;
            }
            p.mode = interpolation(mode)?.unwrap_or(p.mode);
            p.align_corners = align_corners.unwrap_or(p.align_corners);
            p.anti_aliasing = anti_aliasing;
            p.anti_aliasing_sigma = anti_aliasing_sigma.map(OneOrMany::into_vec);
            p.dtype = dtype(dt)?;
            Step::Resize(p)
        }
        RawOp::Rotate {
            angle,
            degrees,
            keep_size,
            mode,
            padding_mode,
            align_corners,
            dtype: dt,
        } => {
            let mut angle = angle.into_vec();
            if degrees {
                angle.iter_mut().for_each(|a| *a = a.to_radians());
            }
            let mut p = RotateParams::new(angle);
            p.keep_size = keep_size.unwrap_or(p.keep_size);
            p.mode = interpolation(mode)?.unwrap_or(p.mode);
            p.padding_mode = padding(padding_mode)?.unwrap_or(p.padding_mode);
            p.align_corners = align_corners.unwrap_or(p.align_corners);
            p.dtype = dtype(dt)?;
            Step::Rotate(p)
        }
        RawOp::Zoom {
            factor,
            keep_size,
            mode,
            padding_mode,
            align_corners,
            dtype: dt,
        } => {
            let mut p = ZoomParams::new(factor.into_vec());
            p.keep_size = keep_size.unwrap_or(p.keep_size);
            p.mode = interpolation(mode)?.unwrap_or(p.mode);
            p.padding_mode = padding(padding_mode)?.unwrap_or(p.padding_mode);
            p.align_corners = align_corners.unwrap_or(p.align_corners);
            p.dtype = dtype(dt)?;
            Step::Zoom(p)
        }
        RawOp::Rotate90 { k, spatial_axes } => {
            let mut p = Rotate90Params::new(k.unwrap_or(1));
            if let Some(axes) = spatial_axes {
                p = p.with_axes(axes);
            }
            Step::Rotate90(p)
        }
        RawOp::Translate {
            translation,
            mode,
            padding_mode,
            dtype: dt,
        } => {
            let mut p = TranslateParams::new(translation);
            p.mode = interpolation(mode)?.unwrap_or(p.mode);
            p.padding_mode = padding(padding_mode)?.unwrap_or(p.padding_mode);
            p.dtype = dtype(dt)?.unwrap_or(p.dtype);
            Step::Translate(p)
        }
        RawOp::Elastic {
            sigma,
            magnitude,
            spatial_size,
            mode,
            padding_mode,
        } => Step::Elastic(ElasticStep {
            sigma,
            magnitude,
            spatial_size: spatial_size.map(OneOrMany::into_vec),
            mode: interpolation(mode)?,
            padding_mode: padding(padding_mode)?,
        }),
    };
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
input:
  shape: [1, 10, 10]
  spacing: 1.0
  dtype: uint8
seed: 3
ops:
  - op: flip
    spatial_axis: 0
  - op: rotate
    angle: 45
    degrees: true
    keep_size: false
    padding_mode: edge
  - op: resize
    spatial_size: 30
    size_mode: longest
  - op: elastic
    sigma: 2.0
    magnitude: 1.0
"#;

    #[test]
    fn test_parse_sample() {
        let p = Pipeline::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(p.input.input_shape.dims(), &[1, 10, 10]);
        assert_eq!(p.input.spacing, vec![1.0, 1.0]);
        assert_eq!(p.input.dtype, DType::U8);
        assert_eq!(p.seed, 3);
        assert_eq!(p.steps.len(), 4);
        match &p.steps[1] {
            Step::Rotate(r) => {
                assert!((r.angle[0] - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
                assert_eq!(r.padding_mode, PaddingMode::Border);
                assert!(!r.keep_size);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_build_threads_shapes() {
        let ops = Pipeline::from_yaml_str(SAMPLE).unwrap().build().unwrap();
        let shapes: Vec<_> = ops.iter().map(|op| op.shape_override().dims().to_vec()).collect();
        assert_eq!(shapes, vec![vec![1, 10, 10], vec![1, 15, 15], vec![1, 30, 30], vec![1, 30, 30]]);
    }

    #[test]
    fn test_bundled_pipeline_plans() {
        let p = Pipeline::from_yaml_str(include_str!("../pipelines/ct_augment.yaml")).unwrap();
        let ops = p.build().unwrap();
        assert_eq!(ops[0].shape_override().dims(), &[1, 48, 48, 96]);
        assert_eq!(ops.last().unwrap().shape_override().dims(), &[1, 64, 64, 64]);
        // spacing+rotate+zoom+flip, elastic, translate+resize
        assert_eq!(xfm_ops::plan(&ops).unwrap().len(), 3);
    }

    #[test]
    fn test_build_is_reproducible() {
        let p = Pipeline::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(p.build().unwrap(), p.build().unwrap());
    }

    #[test]
    fn test_unknown_option_reports_step() {
        let yaml = "input: {shape: [1, 4, 4]}\nops:\n  - op: zoom\n    factor: 2\n    mode: sinc\n";
        let err = Pipeline::from_yaml_str(yaml).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("ops[0]"), "{msg}");
        assert!(msg.contains("sinc"), "{msg}");
    }

    #[test]
    fn test_builder_error_reports_step() {
        let yaml = "input: {shape: [1, 4, 4, 4]}\nops:\n  - op: translate\n    translation: [1, 2]\n";
        let err = Pipeline::from_yaml_str(yaml).unwrap().build().unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("ops[0]"), "{msg}");
        assert!(msg.contains("translation"), "{msg}");
    }

    #[test]
    fn test_ops_table_matches_parser() {
        for (name, _) in OPS {
            let yaml = format!("input: {{shape: [1, 4]}}\nops:\n  - op: {name}\n");
            // required fields may be missing, but the tag itself must be known
            if let Err(e) = Pipeline::from_yaml_str(&yaml) {
                assert!(!format!("{e:#}").contains("unknown variant"), "{name}: {e:#}");
            }
        }
    }
}
