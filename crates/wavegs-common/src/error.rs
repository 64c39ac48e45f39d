//! Error types for WaveGS operations.

use thiserror::Error;

/// Top-level error type for the WaveGS workspace.
#[derive(Debug, Error)]
pub enum WavegsError {
    /// Kernel operation error
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

/// Errors raised by the gather/scatter kernels.
///
/// Every contract violation is checked eagerly, before any computation
/// touches an output buffer, so a returned error guarantees no
/// partially-written output.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum KernelError {
    /// Caller-supplied buffers or parameters violate an operation's
    /// contract: length mismatches, out-of-range offsets, strides, or
    /// indices, or a zero stride.
    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },
}

/// Result type alias for WaveGS operations.
pub type Result<T> = std::result::Result<T, WavegsError>;
