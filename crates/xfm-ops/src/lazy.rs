//! Lazy dispatch and composition of pending operations.
//!
//! Builders never resample on their own; they hand a [`PendingOp`] to
//! [`dispatch`], which either queues it or applies it. Applying goes through
//! two steps that can also be used directly:
//!
//! 1. [`plan`] folds consecutive matrix records into a single product
//!    `Tn * ... * T2 * T1`. A field record cannot be folded: it flushes the
//!    running product as one stage and becomes a stage of its own.
//! 2. [`execute`] runs each stage through the caller's [`Resampler`].
//!
//! A log of n matrix records therefore costs one resampling pass instead
//! of n.

use crate::image::Image;
use crate::pending::{OpKind, PendingOp, Transform};
use crate::resample::{ResampleParams, Resampler};
use crate::spatial::BuildContext;
use tracing::{debug, trace};
use xfm_core::{Error, Result, Volume};
use xfm_math::Matrix;

/// When a dispatched operation is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExecutionMode {
    /// Queue on tracked images, hand back on plain ones.
    #[default]
    Deferred,
    /// Compose and resample now.
    Immediate,
}

impl ExecutionMode {
    /// True for [`ExecutionMode::Immediate`].
    #[inline]
    pub fn is_immediate(self) -> bool {
        matches!(self, ExecutionMode::Immediate)
    }
}

impl From<bool> for ExecutionMode {
    /// Maps an "apply now" flag.
    fn from(apply_now: bool) -> Self {
        if apply_now { ExecutionMode::Immediate } else { ExecutionMode::Deferred }
    }
}

/// One resampling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Composed transform.
    pub transform: Transform,
    /// Merged resampling parameters.
    pub params: ResampleParams,
    /// Names of the folded operations, in call order.
    pub ops: Vec<&'static str>,
}

impl Stage {
    fn from_op(op: &PendingOp) -> Self {
        Self {
            transform: op.transform.clone(),
            params: op.meta.resample_params(),
            ops: vec![op.name()],
        }
    }
}

/// Composes a log of pending operations into resampling stages.
///
/// Matrix records are multiplied in call order so the last operation ends
/// up leftmost. A matrix whose rank differs from the running product
/// starts a new stage.
pub fn plan(ops: &[PendingOp]) -> Result<Vec<Stage>> {
    let mut stages = Vec::new();
    let mut running: Option<Stage> = None;

    for op in ops {
        match &op.transform {
            Transform::Matrix(m) => {
                if !m.is_finite() {
                    return Err(Error::InvalidParameter(format!(
                        "{} produced a non-finite matrix",
                        op.name()
                    )));
                }
                running = Some(match running.take() {
                    Some(mut stage) => match &stage.transform {
                        Transform::Matrix(acc) if acc.dim() == m.dim() => {
                            let composed = m.matmul(acc)?;
                            trace!(op = op.name(), "Folded matrix into running stage");
                            stage.transform = Transform::Matrix(composed);
                            stage.params.merge(&op.meta.resample_params());
                            stage.ops.push(op.name());
                            stage
                        }
                        _ => {
                            stages.push(stage);
                            Stage::from_op(op)
                        }
                    },
                    None => Stage::from_op(op),
                });
            }
            Transform::Field(_) => {
                if let Some(stage) = running.take() {
                    stages.push(stage);
                }
                stages.push(Stage::from_op(op));
            }
        }
    }
    if let Some(stage) = running {
        stages.push(stage);
    }

    debug!(ops = ops.len(), stages = stages.len(), "Planned resampling");
    Ok(stages)
}

/// Runs stages in order, feeding each output into the next.
///
/// Fails with [`Error::External`] if the resampler returns a volume whose
/// shape differs from the requested one.
pub fn execute(volume: Volume, stages: &[Stage], resampler: &dyn Resampler) -> Result<Volume> {
    stages.iter().try_fold(volume, |src, stage| {
        trace!(ops = ?stage.ops, output = %stage.params.output_shape, "Resampling stage");
        let out = resampler.resample(&src, &stage.transform, &stage.params)?;
        if out.shape() != &stage.params.output_shape {
            return Err(Error::External {
                collaborator: "resampler",
                reason: format!(
                    "returned shape {}, requested {}",
                    out.shape(),
                    stage.params.output_shape
                ),
            });
        }
        Ok(out)
    })
}

/// Plans and executes `ops` on `volume`.
///
/// The result carries the spacing and dtype the operations leave behind,
/// e.g. the target `pixdim` of a spacing record.
pub fn apply(volume: &Volume, ops: &[PendingOp], resampler: &dyn Resampler) -> Result<Volume> {
    let stages = plan(ops)?;
    let out = execute(volume.clone(), &stages, resampler)?;

    let mut ctx = BuildContext::new(volume.shape().clone())
        .with_dtype(volume.dtype())
        .with_spacing(volume.spacing());
    for op in ops {
        ctx.advance(op);
    }
    let out = out.with_dtype(ctx.dtype);
    if volume.has_spacing() || ops.iter().any(|op| matches!(op.meta.kind, OpKind::Spacing { .. })) {
        return out.with_spacing(ctx.spacing);
    }
    Ok(out)
}

/// Queues or applies a pending operation.
///
/// | image   | mode        | effect                                        | returns    |
/// |---------|-------------|-----------------------------------------------|------------|
/// | tracked | `Deferred`  | append to the log                             | `None`     |
/// | tracked | `Immediate` | append, then compose and apply the whole log  | `None`     |
/// | plain   | `Deferred`  | nothing                                       | `Some(op)` |
/// | plain   | `Immediate` | apply `op` alone                              | `None`     |
pub fn dispatch(
    image: &mut Image,
    op: PendingOp,
    mode: ExecutionMode,
    resampler: &dyn Resampler,
) -> Result<Option<PendingOp>> {
    debug!(op = op.name(), ?mode, tracked = image.supports_pending_log(), "Dispatching");

    if image.supports_pending_log() {
        image.append_pending_operation(op)?;
        if mode.is_immediate() {
            if let Err(e) = image.drain_and_apply(resampler) {
                // drop the record of the failed call
                image.pop_pending_operation();
                return Err(e);
            }
        }
        return Ok(None);
    }

    if !mode.is_immediate() {
        return Ok(Some(op));
    }
    let out = apply(image.volume(), std::slice::from_ref(&op), resampler)?;
    image.set_volume(out);
    Ok(None)
}

/// Product of every matrix in `ops`, in call order.
///
/// Returns `None` if a record carries a field or the ranks differ.
pub fn compose_matrices(ops: &[PendingOp]) -> Option<Matrix> {
    let mut acc: Option<Matrix> = None;
    for op in ops {
        let m = op.transform.as_matrix()?;
        acc = Some(match acc {
            Some(prev) => m.matmul(&prev).ok()?,
            None => m.clone(),
        });
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::{OpKind, OpMeta};
    use xfm_core::{DType, Interpolation, PaddingMode, Shape};
    use xfm_math::Field;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    fn translate(offsets: &[f64], out: Shape) -> PendingOp {
        PendingOp::new(
            Transform::Matrix(Matrix::translation(offsets).unwrap()),
            OpMeta {
                shape_override: out,
                kind: OpKind::Translate {
                    translation: offsets.to_vec(),
                    mode: Interpolation::Bilinear,
                    padding_mode: PaddingMode::Border,
                    dtype: DType::F32,
                },
            },
        )
    }

    fn field(out: Shape) -> PendingOp {
        PendingOp::new(
            Transform::Field(Field::zeros(3, out.spatial()).unwrap()),
            OpMeta {
                shape_override: out,
                kind: OpKind::Elastic {
                    sigma: 1.0,
                    magnitude: 1.0,
                    spatial_size: None,
                    mode: Interpolation::Nearest,
                    padding_mode: PaddingMode::Reflection,
                },
            },
        )
    }

    #[test]
    fn test_plan_folds_matrices() {
        let s = shape(&[1, 4, 4]);
        let ops = vec![translate(&[1.0, 0.0], s.clone()), translate(&[0.0, 2.0], s.clone())];
        let stages = plan(&ops).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].ops, vec!["translate", "translate"]);
        let m = stages[0].transform.as_matrix().unwrap();
        assert_eq!(m.get(0, 2), 1.0);
        assert_eq!(m.get(1, 2), 2.0);
    }

    #[test]
    fn test_field_splits_stages() {
        let s = shape(&[1, 4, 4]);
        let ops = vec![
            translate(&[1.0, 0.0], s.clone()),
            field(s.clone()),
            translate(&[0.0, 1.0], s.clone()),
            translate(&[0.0, 1.0], s.clone()),
        ];
        let stages = plan(&ops).unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages[1].transform.as_field().is_some());
        assert_eq!(stages[1].params.mode, Some(Interpolation::Nearest));
        assert_eq!(stages[2].ops.len(), 2);
        assert!(compose_matrices(&ops).is_none());
    }

    #[test]
    fn test_execution_mode_from_flag() {
        assert_eq!(ExecutionMode::from(true), ExecutionMode::Immediate);
        assert_eq!(ExecutionMode::default(), ExecutionMode::Deferred);
    }

    #[test]
    fn test_execute_checks_output_shape() {
        let s = shape(&[1, 4, 4]);
        let stages = plan(&[translate(&[1.0, 1.0], s.clone())]).unwrap();
        let wrong = |_: &Volume, _: &Transform, _: &ResampleParams| -> Result<Volume> { Ok(Volume::zeros(shape(&[1, 2, 2]))) };
        let err = execute(Volume::zeros(s), &stages, &wrong).unwrap_err();
        assert_eq!(err.kind(), xfm_core::ErrorKind::External);
    }

    #[test]
    fn test_plain_deferred_returns_op() {
        let s = shape(&[1, 4, 4]);
        let mut img = Image::plain(Volume::zeros(s.clone()));
        let never = |_: &Volume, _: &Transform, _: &ResampleParams| -> Result<Volume> {
            panic!("deferred dispatch must not resample")
        };
        let op = translate(&[1.0, 1.0], s.clone());
        let left = dispatch(&mut img, op.clone(), ExecutionMode::Deferred, &never).unwrap();
        assert_eq!(left, Some(op));
        assert_eq!(img.current_shape(), &s);
    }
}
