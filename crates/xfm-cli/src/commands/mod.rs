//! CLI command implementations

pub mod ops;
pub mod plan;
