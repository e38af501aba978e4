//! Output data types for resampling passes.
//!
//! [`DType`] is the element type a resampler is asked to produce. The
//! transform engine itself only records it; conversion happens in the
//! resampling kernel.
//!
//! # Usage
//!
//! ```rust
//! use xfm_core::DType;
//!
//! let dt: DType = "float32".parse().unwrap();
//! assert_eq!(dt, DType::F32);
//! assert!(dt.is_float());
//! ```

use crate::Error;
use std::str::FromStr;

/// Element data type of a resampled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit signed integer (CT Hounsfield units).
    I16,
    /// 32-bit signed integer (label maps).
    I32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
    /// 64-bit double-precision float.
    F64,
}

impl DType {
    /// Number of bytes per element.
    #[inline]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 | Self::F16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }

    /// Short name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Ok(Self::U8),
            "i16" | "int16" => Ok(Self::I16),
            "i32" | "int32" => Ok(Self::I32),
            "f16" | "float16" | "half" => Ok(Self::F16),
            "f32" | "float32" | "float" => Ok(Self::F32),
            "f64" | "float64" | "double" => Ok(Self::F64),
            _ => Err(Error::UnknownOption {
                kind: "dtype",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_parse() {
        assert_eq!("uint8".parse::<DType>().unwrap(), DType::U8);
        assert_eq!("Float64".parse::<DType>().unwrap(), DType::F64);
        assert!("complex64".parse::<DType>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_dtype_bytes() {
        assert_eq!(DType::I16.bytes(), 2);
        assert_eq!(DType::F64.bytes(), 8);
        assert!(!DType::I32.is_float());
    }
}
