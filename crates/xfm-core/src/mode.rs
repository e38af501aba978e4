//! Interpolation and padding options passed through to the resampler.
//!
//! Both are closed enumerations with a single canonicalization point
//! ([`FromStr`]). Padding accepts the numpy pad names as aliases and folds
//! them onto the three grid-sampling padding behaviors.

use crate::Error;
use std::str::FromStr;

/// Interpolation mode requested from the resampling kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Nearest neighbour (legacy rounding).
    Nearest,
    /// Nearest neighbour with exact half-pixel rounding.
    NearestExact,
    /// Linear (1D).
    Linear,
    /// Bilinear (2D).
    #[default]
    Bilinear,
    /// Bicubic (2D).
    Bicubic,
    /// Trilinear (3D).
    Trilinear,
    /// Area averaging.
    Area,
}

impl Interpolation {
    /// Canonical lower-case name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::NearestExact => "nearest-exact",
            Self::Linear => "linear",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Trilinear => "trilinear",
            Self::Area => "area",
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "nearest" => Ok(Self::Nearest),
            "nearest-exact" => Ok(Self::NearestExact),
            "linear" => Ok(Self::Linear),
            "bilinear" => Ok(Self::Bilinear),
            "bicubic" => Ok(Self::Bicubic),
            "trilinear" => Ok(Self::Trilinear),
            "area" => Ok(Self::Area),
            _ => Err(Error::UnknownOption {
                kind: "interpolation",
                value: s.to_string(),
            }),
        }
    }
}

/// How samples outside the source grid are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaddingMode {
    /// Constant zero.
    #[default]
    Zeros,
    /// Repeat the edge value.
    Border,
    /// Mirror about the edge.
    Reflection,
}

impl PaddingMode {
    /// Canonical lower-case name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Zeros => "zeros",
            Self::Border => "border",
            Self::Reflection => "reflection",
        }
    }
}

impl std::fmt::Display for PaddingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaddingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zeros" | "constant" => Ok(Self::Zeros),
            "border" | "edge" => Ok(Self::Border),
            "reflection" | "reflect" | "symmetric" => Ok(Self::Reflection),
            _ => Err(Error::UnknownOption {
                kind: "padding",
                value: s.to_string(),
            }),
        }
    }
}
