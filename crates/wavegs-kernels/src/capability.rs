//! Capability probing and test-mode control.
//!
//! The probe answers one question, once per process: can this host run the
//! accelerated gather/scatter path? The result is memoized in a
//! [`OnceLock`]. A tri-state override supersedes the probe for all
//! subsequent dispatch decisions until cleared, so test suites can force
//! either path regardless of the hardware they run on.
//!
//! The override is stored in an `AtomicU8` with relaxed ordering: it is a
//! self-contained byte read once per dispatch, written rarely (test
//! setup/teardown), and carries no dependent data.
//!
//! For CI runs that need a deterministic probe result without touching the
//! override API, `WAVEGS_SIMD_FAKE=simd` pins the probe to "supported" and
//! `WAVEGS_SIMD_FAKE=none` to "unsupported". The variable is read once, at
//! first probe.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

/// Capability policy for kernel dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityMode {
    /// Defer to the test-mode override if set, else the hardware probe.
    Auto,
    /// Route every call to the SIMD provider.
    ForceSimd,
    /// Route every call to the scalar provider.
    ForceScalar,
}

const OVERRIDE_UNSET: u8 = 0;
const OVERRIDE_SIMD: u8 = 1;
const OVERRIDE_SCALAR: u8 = 2;

static OVERRIDE: AtomicU8 = AtomicU8::new(OVERRIDE_UNSET);
static PROBE: OnceLock<bool> = OnceLock::new();

/// CPU SIMD features relevant to the gather/scatter kernels.
///
/// Obtained from [`probe_cpu_features`]; reported by [`info_string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuFeatures {
    /// AVX2 available (`x86_64` only).
    pub has_avx2: bool,
    /// FMA available (`x86_64` only).
    pub has_fma: bool,
    /// NEON available (always `true` on `aarch64`, `false` elsewhere).
    pub has_neon: bool,
}

/// Probe the CPU's SIMD features directly, bypassing cache and override.
pub fn probe_cpu_features() -> CpuFeatures {
    #[cfg(target_arch = "x86_64")]
    {
        CpuFeatures {
            has_avx2: is_x86_feature_detected!("avx2"),
            has_fma: is_x86_feature_detected!("fma"),
            has_neon: false,
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        CpuFeatures {
            has_avx2: false,
            has_fma: false,
            has_neon: std::arch::is_aarch64_feature_detected!("neon"),
        }
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        CpuFeatures { has_avx2: false, has_fma: false, has_neon: false }
    }
}

fn detect() -> bool {
    match std::env::var("WAVEGS_SIMD_FAKE").ok().as_deref() {
        Some("simd") => return true,
        Some("none") => return false,
        Some(other) => log::warn!("ignoring unrecognized WAVEGS_SIMD_FAKE value {other:?}"),
        None => {}
    }
    let features = probe_cpu_features();
    // The x86_64 path needs both AVX2 gathers and FMA accumulation.
    (features.has_avx2 && features.has_fma) || features.has_neon
}

/// Whether this host supports the accelerated gather/scatter path.
///
/// The platform check runs once; repeated calls return the cached value.
/// The test-mode override does NOT affect this function, only
/// [`is_available`].
pub fn probe_capability() -> bool {
    *PROBE.get_or_init(detect)
}

/// Force dispatch to the SIMD path (`true`) or the scalar path (`false`)
/// for all subsequent calls, superseding the probe until
/// [`clear_test_mode`] is called.
pub fn set_test_mode(enabled: bool) {
    let value = if enabled { OVERRIDE_SIMD } else { OVERRIDE_SCALAR };
    OVERRIDE.store(value, Ordering::Relaxed);
}

/// Reset the override. Dispatch decisions return to exactly the probe's
/// behavior, as if no override had ever been applied.
pub fn clear_test_mode() {
    OVERRIDE.store(OVERRIDE_UNSET, Ordering::Relaxed);
}

/// Effective capability flag: the override value if set, else the
/// memoized probe result.
pub fn is_available() -> bool {
    match OVERRIDE.load(Ordering::Relaxed) {
        OVERRIDE_SIMD => true,
        OVERRIDE_SCALAR => false,
        _ => probe_capability(),
    }
}

/// Human-readable capability diagnostic.
///
/// Contains the literal substring `"Available"` or `"Not Available"`,
/// always in agreement with [`is_available`], plus the kernel the next
/// dispatch would pick and the raw CPU feature flags.
pub fn info_string() -> String {
    let features = probe_cpu_features();
    let (status, kernel) = if is_available() {
        ("Available", crate::simd_provider().name())
    } else {
        ("Not Available", crate::scalar_provider().name())
    };
    format!(
        "gather/scatter SIMD: {status} (kernel: {kernel}, avx2: {}, fma: {}, neon: {})",
        features.has_avx2, features.has_fma, features.has_neon
    )
}
