//! Common types and utilities for WaveGS kernels
//!
//! This crate provides the foundational types shared across the WaveGS
//! workspace: the error taxonomy, the workspace-wide `Result` alias, and
//! numeric constants used by the cross-path validation suites.

pub mod error;

pub use error::*;

/// Tolerance for comparing SIMD-path results against the scalar reference.
///
/// The two code paths are written independently and may associate
/// floating-point operations differently (FMA contraction, block
/// accumulation), so exact bit equality is not guaranteed. Results are
/// required to agree within this absolute tolerance.
pub const PARITY_TOLERANCE: f64 = 1e-10;
