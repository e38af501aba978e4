//! Image handles with an optional pending-operation log.
//!
//! An [`Image`] owns a concrete [`Volume`] and decides at construction
//! time whether it can queue operations:
//!
//! - [`Image::tracked`] keeps a log of [`PendingOp`]s that is composed
//!   into as few resampling passes as possible on [`Image::drain_and_apply`]
//! - [`Image::plain`] has no log; builders either apply right away or hand
//!   the record back to the caller
//!
//! # Example
//!
//! ```rust
//! use xfm_core::{Shape, Volume};
//! use xfm_ops::Image;
//!
//! let vol = Volume::zeros(Shape::new(vec![1, 16, 16]).unwrap());
//! let img = Image::tracked(vol);
//! assert!(img.supports_pending_log());
//! assert!(!img.has_pending_operations());
//! ```

use crate::lazy::apply;
use crate::pending::PendingOp;
use crate::resample::Resampler;
use tracing::debug;
use xfm_core::{DType, Error, Result, Shape, Volume};

/// Whether an image keeps a pending-operation log.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Tracking {
    /// Plain value without a log.
    #[default]
    Untracked,
    /// Queued operations, oldest first.
    Tracked(Vec<PendingOp>),
}

/// A volume plus its tracking state.
#[derive(Debug, Clone)]
pub struct Image {
    volume: Volume,
    tracking: Tracking,
}

impl Image {
    /// Wraps a volume without a pending-operation log.
    pub fn plain(volume: Volume) -> Self {
        Self {
            volume,
            tracking: Tracking::Untracked,
        }
    }

    /// Wraps a volume with an empty pending-operation log.
    pub fn tracked(volume: Volume) -> Self {
        Self {
            volume,
            tracking: Tracking::Tracked(Vec::new()),
        }
    }

    /// True if operations can be queued on this handle.
    #[inline]
    pub fn supports_pending_log(&self) -> bool {
        matches!(self.tracking, Tracking::Tracked(_))
    }

    /// The concrete volume (pending operations not applied).
    #[inline]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Consumes the handle, returning the concrete volume.
    pub fn into_volume(self) -> Volume {
        self.volume
    }

    /// Shape of the concrete volume.
    #[inline]
    pub fn current_shape(&self) -> &Shape {
        self.volume.shape()
    }

    /// Physical voxel spacing of the concrete volume.
    pub fn spacing(&self) -> Vec<f64> {
        self.volume.spacing()
    }

    /// Dtype of the concrete volume.
    pub fn dtype(&self) -> DType {
        self.volume.dtype()
    }

    /// True if at least one operation is queued.
    pub fn has_pending_operations(&self) -> bool {
        !self.pending_operations().is_empty()
    }

    /// Queued operations, oldest first. Always empty for plain images.
    pub fn pending_operations(&self) -> &[PendingOp] {
        match &self.tracking {
            Tracking::Tracked(log) => log,
            Tracking::Untracked => &[],
        }
    }

    /// Shape the image will have once the queued operations are applied.
    ///
    /// Each record carries its own predicted output shape, so this is the
    /// `shape_override` of the last record, or the current shape when the
    /// log is empty.
    pub fn peek_pending_shape(&self) -> Shape {
        self.pending_operations()
            .last()
            .map(|op| op.meta.shape_override.clone())
            .unwrap_or_else(|| self.current_shape().clone())
    }

    /// Queues an operation.
    ///
    /// Fails with [`Error::UntrackedImage`] on a plain image.
    pub fn append_pending_operation(&mut self, op: PendingOp) -> Result<()> {
        match &mut self.tracking {
            Tracking::Tracked(log) => {
                debug!(op = op.name(), queued = log.len() + 1, "Queued pending operation");
                log.push(op);
                Ok(())
            }
            Tracking::Untracked => Err(Error::UntrackedImage),
        }
    }

    /// Composes and applies every queued operation, leaving the log empty.
    ///
    /// On failure the log is left as it was.
    pub fn drain_and_apply(&mut self, resampler: &dyn Resampler) -> Result<()> {
        let log = match &mut self.tracking {
            Tracking::Tracked(log) if !log.is_empty() => std::mem::take(log),
            _ => return Ok(()),
        };

        match apply(&self.volume, &log, resampler) {
            Ok(volume) => {
                self.volume = volume;
                Ok(())
            }
            Err(e) => {
                self.tracking = Tracking::Tracked(log);
                Err(e)
            }
        }
    }

    /// Removes the most recently queued operation.
    pub(crate) fn pop_pending_operation(&mut self) -> Option<PendingOp> {
        match &mut self.tracking {
            Tracking::Tracked(log) => log.pop(),
            Tracking::Untracked => None,
        }
    }

    /// Replaces the concrete volume.
    pub(crate) fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
    }

    /// Reshapes the volume to `rank` spatial dims with trailing singleton
    /// axes. Not allowed while operations are queued.
    pub(crate) fn expand_spatial(&mut self, rank: usize) -> Result<()> {
        if rank <= self.current_shape().spatial_rank() {
            return Ok(());
        }
        if self.has_pending_operations() {
            return Err(Error::InvalidShape(format!(
                "cannot add spatial dims to {} while operations are pending",
                self.current_shape()
            )));
        }
        self.volume = self.volume.clone().expand_spatial(rank);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::{OpKind, OpMeta, Transform};
    use crate::resample::ResampleParams;
    use xfm_math::Matrix;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims.to_vec()).unwrap()
    }

    fn flip_op(out: Shape) -> PendingOp {
        PendingOp::new(
            Transform::Matrix(Matrix::flip(2, &[0]).unwrap()),
            OpMeta {
                shape_override: out,
                kind: OpKind::Flip { spatial_axis: vec![0] },
            },
        )
    }

    fn zeros_resampler(_: &Volume, _: &Transform, p: &ResampleParams) -> Result<Volume> {
        Ok(Volume::zeros(p.output_shape.clone()))
    }

    fn failing_resampler(_: &Volume, _: &Transform, _: &ResampleParams) -> Result<Volume> {
        Err(Error::External {
            collaborator: "resampler",
            reason: "out of memory".into(),
        })
    }

    #[test]
    fn test_plain_rejects_append() {
        let mut img = Image::plain(Volume::zeros(shape(&[1, 4, 4])));
        assert!(!img.supports_pending_log());
        let err = img.append_pending_operation(flip_op(shape(&[1, 4, 4]))).unwrap_err();
        assert!(err.is_configuration());
        assert!(!img.has_pending_operations());
    }

    #[test]
    fn test_peek_pending_shape() {
        let mut img = Image::tracked(Volume::zeros(shape(&[1, 4, 4])));
        assert_eq!(img.peek_pending_shape(), shape(&[1, 4, 4]));
        img.append_pending_operation(flip_op(shape(&[1, 6, 6]))).unwrap();
        assert_eq!(img.peek_pending_shape(), shape(&[1, 6, 6]));
        assert_eq!(img.current_shape(), &shape(&[1, 4, 4]));
    }

    #[test]
    fn test_drain_and_apply() {
        let mut img = Image::tracked(Volume::zeros(shape(&[1, 4, 4])));
        img.append_pending_operation(flip_op(shape(&[1, 4, 4]))).unwrap();
        img.drain_and_apply(&zeros_resampler).unwrap();
        assert!(!img.has_pending_operations());
        assert!(img.supports_pending_log());
    }

    #[test]
    fn test_failed_drain_keeps_log() {
        let mut img = Image::tracked(Volume::zeros(shape(&[1, 4, 4])));
        img.append_pending_operation(flip_op(shape(&[1, 4, 4]))).unwrap();
        let err = img.drain_and_apply(&failing_resampler).unwrap_err();
        assert_eq!(err.kind(), xfm_core::ErrorKind::External);
        assert_eq!(img.pending_operations().len(), 1);
    }

    #[test]
    fn test_expand_spatial() {
        let mut img = Image::tracked(Volume::zeros(shape(&[2, 4, 4])));
        img.expand_spatial(3).unwrap();
        assert_eq!(img.current_shape(), &shape(&[2, 4, 4, 1]));

        img.append_pending_operation(flip_op(shape(&[2, 4, 4, 1]))).unwrap();
        assert!(img.expand_spatial(4).unwrap_err().is_shape());
    }
}
