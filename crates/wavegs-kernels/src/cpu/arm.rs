//! ARM64 kernels using NEON
#![allow(unsafe_op_in_unsafe_fn)]

use crate::cpu::fallback::ScalarKernel;
use crate::{validate, KernelProvider};
use std::arch::aarch64::*;
use wavegs_common::Result;

/// NEON kernel for aarch64.
///
/// NEON has no gather instruction, so the gather operations assemble
/// two-lane vectors from explicit lane loads; convolution accumulates with
/// `vfmaq_n_f64` and the interleave uses the `vst2q_f64` structured store.
/// Each operation checks availability and delegates to [`ScalarKernel`]
/// when NEON is not detected.
pub struct NeonKernel;

impl KernelProvider for NeonKernel {
    fn name(&self) -> &'static str {
        "neon"
    }

    fn is_available(&self) -> bool {
        std::arch::is_aarch64_feature_detected!("neon")
    }

    fn gather_periodic_downsample(&self, signal: &[f64], filter: &[f64]) -> Result<Vec<f64>> {
        if !self.is_available() {
            return ScalarKernel.gather_periodic_downsample(signal, filter);
        }
        let half = validate::periodic_downsample(signal, filter)?;
        // Safety: NEON presence checked above
        Ok(unsafe { self.downsample_neon(signal, filter, half) })
    }

    fn scatter_upsample(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) -> Result<()> {
        if !self.is_available() {
            return ScalarKernel.scatter_upsample(approx, detail, output);
        }
        validate::scatter_upsample(approx, detail, output)?;
        // Safety: NEON presence checked above
        unsafe { self.upsample_neon(approx, detail, output) };
        Ok(())
    }

    fn gather_strided(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Result<Vec<f64>> {
        if !self.is_available() {
            return ScalarKernel.gather_strided(signal, offset, stride, count);
        }
        validate::strided(signal, offset, stride, count)?;
        // Safety: NEON presence checked above
        Ok(unsafe { self.strided_neon(signal, offset, stride, count) })
    }

    fn gather_compressed(&self, signal: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
        if !self.is_available() {
            return ScalarKernel.gather_compressed(signal, mask);
        }
        validate::compressed(signal, mask)?;
        let mut result = Vec::with_capacity(mask.iter().filter(|&&keep| keep).count());
        for (&value, &keep) in signal.iter().zip(mask.iter()) {
            if keep {
                result.push(value);
            }
        }
        Ok(result)
    }

    fn batch_gather(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) -> Result<()> {
        if !self.is_available() {
            return ScalarKernel.batch_gather(signals, indices, results, count);
        }
        validate::batch_gather(signals, indices, results, count)?;
        // Safety: NEON presence checked above
        unsafe { self.batch_gather_neon(signals, indices, results, count) };
        Ok(())
    }
}

impl NeonKernel {
    /// Periodic FIR filtering + decimation, two outputs per iteration.
    #[target_feature(enable = "neon")]
    unsafe fn downsample_neon(&self, signal: &[f64], filter: &[f64], half: usize) -> Vec<f64> {
        let n = signal.len();
        let mut result = vec![0.0; half];
        if half == 0 {
            return result;
        }
        let taps = filter.len();

        let mut k = 0usize;
        while k + 2 <= half {
            let base = 2 * k;
            let mut acc = vdupq_n_f64(0.0);
            if base + taps + 1 < n {
                for (j, &coef) in filter.iter().enumerate() {
                    let pair = [signal[base + j], signal[base + 2 + j]];
                    acc = vfmaq_n_f64(acc, vld1q_f64(pair.as_ptr()), coef);
                }
            } else {
                for (j, &coef) in filter.iter().enumerate() {
                    let pair = [signal[(base + j) % n], signal[(base + 2 + j) % n]];
                    acc = vfmaq_n_f64(acc, vld1q_f64(pair.as_ptr()), coef);
                }
            }
            vst1q_f64(result.as_mut_ptr().add(k), acc);
            k += 2;
        }

        while k < half {
            let mut acc = 0.0;
            for (j, &coef) in filter.iter().enumerate() {
                acc = coef.mul_add(signal[(2 * k + j) % n], acc);
            }
            result[k] = acc;
            k += 1;
        }
        result
    }

    /// Interleave via the two-register structured store.
    #[target_feature(enable = "neon")]
    unsafe fn upsample_neon(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) {
        let half = approx.len();
        let out = output.as_mut_ptr();
        let mut i = 0usize;
        while i + 2 <= half {
            let a = vld1q_f64(approx.as_ptr().add(i));
            let d = vld1q_f64(detail.as_ptr().add(i));
            vst2q_f64(out.add(2 * i), float64x2x2_t(a, d));
            i += 2;
        }
        if i < half {
            output[2 * i] = approx[i];
            output[2 * i + 1] = detail[i];
        }
    }

    #[target_feature(enable = "neon")]
    unsafe fn strided_neon(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Vec<f64> {
        let mut result = vec![0.0; count];
        let mut i = 0usize;
        while i + 2 <= count {
            let pair = [signal[offset + i * stride], signal[offset + (i + 1) * stride]];
            vst1q_f64(result.as_mut_ptr().add(i), vld1q_f64(pair.as_ptr()));
            i += 2;
        }
        if i < count {
            result[i] = signal[offset + i * stride];
        }
        result
    }

    #[target_feature(enable = "neon")]
    unsafe fn batch_gather_neon(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) {
        for (signal, out) in signals.iter().zip(results.iter_mut()) {
            let mut i = 0usize;
            while i + 2 <= count {
                let pair = [signal[indices[i]], signal[indices[i + 1]]];
                vst1q_f64(out.as_mut_ptr().add(i), vld1q_f64(pair.as_ptr()));
                i += 2;
            }
            if i < count {
                out[i] = signal[indices[i]];
            }
        }
    }
}
