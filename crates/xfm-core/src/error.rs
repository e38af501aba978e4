//! Error types for xfm operations.
//!
//! Every failure in the workspace is reported through the single [`Error`]
//! enum. Variants are grouped into three kinds, see [`ErrorKind`]:
//!
//! - **Shape errors**: a shape, axis or matrix is inconsistent with the
//!   spatial dimensionality it is used with.
//! - **Configuration errors**: a parameter value or a combination of
//!   parameters is invalid or unsupported.
//! - **External errors**: a collaborator (resampler, smoothing filter)
//!   failed while queued operations were being applied.
//!
//! Builders validate everything before a pending operation is created, so
//! shape and configuration errors are always raised at the call site.
//!
//! # Usage
//!
//! ```rust
//! use xfm_core::{Error, ErrorKind, Result};
//!
//! fn check_rank(expected: usize, actual: usize) -> Result<()> {
//!     if expected != actual {
//!         return Err(Error::DimensionMismatch {
//!             what: "translation",
//!             expected,
//!             actual,
//!         });
//!     }
//!     Ok(())
//! }
//!
//! let err = check_rank(3, 2).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Shape);
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Shape or dimensionality mismatch, malformed transform matrix.
    Shape,
    /// Invalid or unsupported parameter combination.
    Configuration,
    /// Failure reported by an external collaborator.
    External,
}

/// Errors raised by shape inference, transform builders and the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Shape is empty or has a zero-sized spatial axis.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Two things that must agree on dimensionality do not.
    #[error("{what}: expected {expected} dimensions, got {actual}")]
    DimensionMismatch {
        /// What was being compared.
        what: &'static str,
        /// Expected number of dimensions.
        expected: usize,
        /// Actual number of dimensions.
        actual: usize,
    },

    /// Matrix is not a square homogeneous matrix.
    #[error("malformed homogeneous matrix: {rows}x{cols}")]
    MalformedMatrix {
        /// Number of rows.
        rows: usize,
        /// Number of columns (of the first offending row).
        cols: usize,
    },

    /// Spatial axis index outside `0..rank`.
    #[error("spatial axis {axis} out of range for {rank} spatial dimensions")]
    AxisOutOfRange {
        /// Offending axis.
        axis: usize,
        /// Spatial rank of the image.
        rank: usize,
    },

    /// Parameter value is invalid.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Parameter combination is not supported.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Parameter vector has the wrong length.
    #[error("'{param}' has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Parameter name.
        param: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Enumerated option string not recognized.
    #[error("unknown {kind} option: '{value}'")]
    UnknownOption {
        /// Option family (e.g. "interpolation").
        kind: &'static str,
        /// Value that failed to canonicalize.
        value: String,
    },

    /// Pending-log operation attempted on an untracked image.
    #[error("image does not carry a pending-operation log")]
    UntrackedImage,

    /// External collaborator failure.
    #[error("{collaborator} failed: {reason}")]
    External {
        /// Collaborator name ("resampler", "smoother").
        collaborator: &'static str,
        /// Failure description.
        reason: String,
    },
}

impl Error {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidShape(_)
            | Error::DimensionMismatch { .. }
            | Error::MalformedMatrix { .. }
            | Error::AxisOutOfRange { .. } => ErrorKind::Shape,
            Error::InvalidParameter(_)
            | Error::Unsupported(_)
            | Error::LengthMismatch { .. }
            | Error::UnknownOption { .. }
            | Error::UntrackedImage => ErrorKind::Configuration,
            Error::External { .. } => ErrorKind::External,
        }
    }

    /// True for [`ErrorKind::Shape`].
    #[inline]
    pub fn is_shape(&self) -> bool {
        self.kind() == ErrorKind::Shape
    }

    /// True for [`ErrorKind::Configuration`].
    #[inline]
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert!(Error::InvalidShape("x".into()).is_shape());
        assert!(Error::AxisOutOfRange { axis: 3, rank: 2 }.is_shape());
        assert!(Error::Unsupported("diagonal".into()).is_configuration());
        assert!(Error::UntrackedImage.is_configuration());
        let ext = Error::External {
            collaborator: "resampler",
            reason: "oom".into(),
        };
        assert_eq!(ext.kind(), ErrorKind::External);
    }

    #[test]
    fn test_display() {
        let err = Error::LengthMismatch {
            param: "translation",
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "'translation' has length 2, expected 3");
    }
}
