//! Gather/scatter compute kernels for wavelet filter banks
//!
//! This crate implements the array-reorganization primitives used by a
//! discrete-wavelet-transform pipeline: periodic-convolution downsampling,
//! interleaved upsampling, strided gathers, masked compaction, and batched
//! index gathers.
//!
//! Every operation has two interchangeable implementations behind the
//! [`KernelProvider`] trait: a SIMD path (AVX2/FMA on `x86_64`, NEON on
//! `aarch64`) and a portable scalar path that serves as the correctness
//! reference. A [`KernelDispatcher`] resolves which path executes at call
//! time from the capability probe and the test-mode override in
//! [`capability`], so both paths can be validated for numerical parity on
//! any machine.
//!
//! All operations are pure computations over caller-supplied buffers: no
//! allocation is retained, no internal locking is performed over signal
//! data, and every contract violation is reported eagerly as
//! `KernelError::InvalidArguments` before any output is written.

use std::sync::atomic::{AtomicU8, Ordering};

use wavegs_common::Result;

pub mod capability;
pub mod cpu;
pub(crate) mod validate;

pub use capability::{
    clear_test_mode, info_string, is_available, probe_capability, probe_cpu_features,
    set_test_mode, CapabilityMode, CpuFeatures,
};
pub use cpu::ScalarKernel;

#[cfg(target_arch = "x86_64")]
pub use cpu::Avx2Kernel;

#[cfg(target_arch = "aarch64")]
pub use cpu::NeonKernel;

/// Kernel provider trait: one implementation per code path.
///
/// Implementations must be numerically equivalent within
/// [`wavegs_common::PARITY_TOLERANCE`] for identical valid inputs.
pub trait KernelProvider: Send + Sync {
    /// Short identifier for diagnostics ("scalar", "avx2", "neon").
    fn name(&self) -> &'static str;

    /// Whether this provider's accelerated path can run on this host.
    fn is_available(&self) -> bool;

    /// Circular FIR filtering followed by decimation-by-2.
    ///
    /// `result[k] = sum_j filter[j] * signal[(2k + j) mod n]` for
    /// `k in [0, n/2)`. Indexing is periodic: windows that run past the end
    /// of the signal wrap around, including multiple full wraps when the
    /// filter is longer than the signal.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if the signal length is odd or the filter is
    /// empty.
    fn gather_periodic_downsample(&self, signal: &[f64], filter: &[f64]) -> Result<Vec<f64>>;

    /// Interleave two half-rate sequences into one full-rate sequence.
    ///
    /// `output[2i] = approx[i]`, `output[2i + 1] = detail[i]`.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `approx.len() != detail.len()` or
    /// `output.len() != 2 * approx.len()`.
    fn scatter_upsample(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) -> Result<()>;

    /// Gather `count` elements starting at `offset` with step `stride`.
    ///
    /// `result[i] = signal[offset + i * stride]`.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `stride == 0`, or `count > 0` and the last
    /// index `offset + (count - 1) * stride` is out of bounds (or its
    /// computation overflows).
    fn gather_strided(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Result<Vec<f64>>;

    /// Order-preserving compaction of `signal` at positions where `mask`
    /// is `true`.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `signal.len() != mask.len()`.
    fn gather_compressed(&self, signal: &[f64], mask: &[bool]) -> Result<Vec<f64>>;

    /// Batched index gather: `results[b][i] = signals[b][indices[i]]` for
    /// `i in [0, count)`, each batch processed independently.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` if `count > indices.len()`, the `results`
    /// dimensions are not `[signals.len()][count]`, or any of the first
    /// `count` indices is out of bounds for any batch. Validation happens
    /// before any write, so `results` is untouched on error.
    fn batch_gather(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) -> Result<()>;
}

static SCALAR: ScalarKernel = ScalarKernel;

#[cfg(target_arch = "x86_64")]
static SIMD: Avx2Kernel = Avx2Kernel;

#[cfg(target_arch = "aarch64")]
static SIMD: NeonKernel = NeonKernel;

/// The SIMD provider for this architecture.
///
/// On architectures with no SIMD implementation the scalar reference
/// stands in, so forced-SIMD dispatch stays well-defined everywhere.
pub(crate) fn simd_provider() -> &'static dyn KernelProvider {
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    {
        &SIMD
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        &SCALAR
    }
}

pub(crate) fn scalar_provider() -> &'static dyn KernelProvider {
    &SCALAR
}

/// Names of the providers whose accelerated path runs on this host.
///
/// The scalar reference is always present and always listed last.
pub fn available_kernels() -> Vec<&'static str> {
    let mut names = Vec::with_capacity(2);
    let simd = simd_provider();
    if simd.is_available() && simd.name() != SCALAR.name() {
        names.push(simd.name());
    }
    names.push(SCALAR.name());
    names
}

// Tracks the last path a dispatcher resolved to, so the selection is
// logged on transitions instead of once per call.
static LAST_SELECTED: AtomicU8 = AtomicU8::new(0);

/// Routes each call to the SIMD or scalar provider.
///
/// The capability policy is an explicit value held by the dispatcher
/// rather than hidden global state: [`KernelDispatcher::new`] defers to
/// the process-wide probe/override, while [`KernelDispatcher::with_mode`]
/// pins the path for a test or a caller that has already made the
/// decision.
#[derive(Debug, Clone, Copy)]
pub struct KernelDispatcher {
    mode: CapabilityMode,
}

impl KernelDispatcher {
    /// Dispatcher that resolves the effective capability flag on every
    /// call: the test-mode override if set, else the memoized probe.
    pub fn new() -> Self {
        Self::with_mode(CapabilityMode::Auto)
    }

    /// Dispatcher with a fixed capability policy.
    pub fn with_mode(mode: CapabilityMode) -> Self {
        Self { mode }
    }

    /// The capability policy this dispatcher was constructed with.
    pub fn mode(&self) -> CapabilityMode {
        self.mode
    }

    /// Name of the provider the next call would route to.
    pub fn active_kernel_name(&self) -> &'static str {
        self.resolve().name()
    }

    fn resolve(&self) -> &'static dyn KernelProvider {
        let use_simd = match self.mode {
            CapabilityMode::Auto => capability::is_available(),
            CapabilityMode::ForceSimd => true,
            CapabilityMode::ForceScalar => false,
        };
        let provider = if use_simd { simd_provider() } else { scalar_provider() };
        let tag = if use_simd { 1 } else { 2 };
        if LAST_SELECTED.swap(tag, Ordering::Relaxed) != tag {
            log::debug!("dispatching to {} kernel path", provider.name());
        }
        provider
    }

    /// See [`KernelProvider::gather_periodic_downsample`].
    pub fn gather_periodic_downsample(&self, signal: &[f64], filter: &[f64]) -> Result<Vec<f64>> {
        self.resolve().gather_periodic_downsample(signal, filter)
    }

    /// See [`KernelProvider::scatter_upsample`].
    pub fn scatter_upsample(
        &self,
        approx: &[f64],
        detail: &[f64],
        output: &mut [f64],
    ) -> Result<()> {
        self.resolve().scatter_upsample(approx, detail, output)
    }

    /// See [`KernelProvider::gather_strided`].
    pub fn gather_strided(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Result<Vec<f64>> {
        self.resolve().gather_strided(signal, offset, stride, count)
    }

    /// See [`KernelProvider::gather_compressed`].
    pub fn gather_compressed(&self, signal: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
        self.resolve().gather_compressed(signal, mask)
    }

    /// See [`KernelProvider::batch_gather`].
    pub fn batch_gather(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) -> Result<()> {
        self.resolve().batch_gather(signals, indices, results, count)
    }
}

impl Default for KernelDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Public API: dispatching convenience functions
// ---------------------------------------------------------------------------

/// Periodic filtering + decimation-by-2 through the default dispatcher.
pub fn gather_periodic_downsample(signal: &[f64], filter: &[f64]) -> Result<Vec<f64>> {
    KernelDispatcher::new().gather_periodic_downsample(signal, filter)
}

/// Polyphase interleave through the default dispatcher.
pub fn scatter_upsample(approx: &[f64], detail: &[f64], output: &mut [f64]) -> Result<()> {
    KernelDispatcher::new().scatter_upsample(approx, detail, output)
}

/// Strided gather through the default dispatcher.
pub fn gather_strided(
    signal: &[f64],
    offset: usize,
    stride: usize,
    count: usize,
) -> Result<Vec<f64>> {
    KernelDispatcher::new().gather_strided(signal, offset, stride, count)
}

/// Mask compaction through the default dispatcher.
pub fn gather_compressed(signal: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
    KernelDispatcher::new().gather_compressed(signal, mask)
}

/// Batched index gather through the default dispatcher.
pub fn batch_gather(
    signals: &[&[f64]],
    indices: &[usize],
    results: &mut [Vec<f64>],
    count: usize,
) -> Result<()> {
    KernelDispatcher::new().batch_gather(signals, indices, results, count)
}
