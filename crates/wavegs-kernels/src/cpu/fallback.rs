//! Portable scalar kernel implementation
//!
//! Loop-based implementations of all gather/scatter operations that work
//! on any architecture. These prioritize clarity over throughput and serve
//! as the correctness reference the SIMD providers are validated against.

use crate::{validate, KernelProvider};
use wavegs_common::Result;

/// Scalar kernel that works on any architecture.
///
/// Always available. Used directly on hosts without SIMD support, and as
/// the reference implementation for cross-path parity tests everywhere
/// else.
pub struct ScalarKernel;

impl KernelProvider for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn gather_periodic_downsample(&self, signal: &[f64], filter: &[f64]) -> Result<Vec<f64>> {
        let half = validate::periodic_downsample(signal, filter)?;
        let n = signal.len();
        let mut result = vec![0.0; half];
        for (k, out) in result.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (j, &coef) in filter.iter().enumerate() {
                acc += coef * signal[(2 * k + j) % n];
            }
            *out = acc;
        }
        Ok(result)
    }

    fn scatter_upsample(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) -> Result<()> {
        validate::scatter_upsample(approx, detail, output)?;
        for (i, (&a, &d)) in approx.iter().zip(detail.iter()).enumerate() {
            output[2 * i] = a;
            output[2 * i + 1] = d;
        }
        Ok(())
    }

    fn gather_strided(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Result<Vec<f64>> {
        validate::strided(signal, offset, stride, count)?;
        Ok((0..count).map(|i| signal[offset + i * stride]).collect())
    }

    fn gather_compressed(&self, signal: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
        validate::compressed(signal, mask)?;
        Ok(signal
            .iter()
            .zip(mask.iter())
            .filter_map(|(&value, &keep)| keep.then_some(value))
            .collect())
    }

    fn batch_gather(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) -> Result<()> {
        validate::batch_gather(signals, indices, results, count)?;
        for (signal, out) in signals.iter().zip(results.iter_mut()) {
            for (slot, &idx) in out.iter_mut().zip(&indices[..count]) {
                *slot = signal[idx];
            }
        }
        Ok(())
    }
}
