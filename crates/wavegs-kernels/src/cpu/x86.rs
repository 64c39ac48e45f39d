//! x86_64 kernels using AVX2 gather/scatter and FMA
#![allow(unsafe_op_in_unsafe_fn)]

use crate::cpu::fallback::ScalarKernel;
use crate::{validate, KernelProvider};
use std::arch::x86_64::*;
use wavegs_common::Result;

/// AVX2 kernel for x86_64.
///
/// Gathers go through `_mm256_i64gather_pd` (four doubles per
/// instruction), convolution accumulates with FMA, and the interleave
/// uses unpack/permute shuffles. Each operation checks availability and
/// delegates to [`ScalarKernel`] when the host lacks AVX2 or FMA, so a
/// forced-SIMD dispatch stays valid on any x86_64 machine.
pub struct Avx2Kernel;

impl KernelProvider for Avx2Kernel {
    fn name(&self) -> &'static str {
        "avx2"
    }

    fn is_available(&self) -> bool {
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    }

    fn gather_periodic_downsample(&self, signal: &[f64], filter: &[f64]) -> Result<Vec<f64>> {
        if !self.is_available() {
            return ScalarKernel.gather_periodic_downsample(signal, filter);
        }
        let half = validate::periodic_downsample(signal, filter)?;
        // Safety: AVX2 and FMA presence checked above
        Ok(unsafe { self.downsample_avx2(signal, filter, half) })
    }

    fn scatter_upsample(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) -> Result<()> {
        if !self.is_available() {
            return ScalarKernel.scatter_upsample(approx, detail, output);
        }
        validate::scatter_upsample(approx, detail, output)?;
        // Safety: AVX2 and FMA presence checked above
        unsafe { self.upsample_avx2(approx, detail, output) };
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
        // Safety: AVX2 and FMA presence checked above
        Ok(unsafe { self.strided_avx2(signal, offset, stride, count) })
    }

    fn gather_compressed(&self, signal: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
        if !self.is_available() {
            return ScalarKernel.gather_compressed(signal, mask);
        }
        validate::compressed(signal, mask)?;
        // Safety: AVX2 and FMA presence checked above
        Ok(unsafe { self.compressed_avx2(signal, mask) })
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
        // Safety: AVX2 and FMA presence checked above
        unsafe { self.batch_gather_avx2(signals, indices, results, count) };
        Ok(())
    }
}

impl Avx2Kernel {
    /// Periodic FIR filtering + decimation, four outputs per iteration.
    ///
    /// A block of four outputs starting at `k` reads source indices
    /// `2k .. 2k + 6 + taps - 1`. Blocks whose window stays inside the
    /// signal gather with plain linear indices; blocks that cross the end
    /// gather with explicitly wrapped indices, which also covers filters
    /// longer than the signal (multiple full wraps).
    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn downsample_avx2(&self, signal: &[f64], filter: &[f64], half: usize) -> Vec<f64> {
        let n = signal.len();
        let mut result = vec![0.0; half];
        if half == 0 {
            return result;
        }
        let src = signal.as_ptr();
        let taps = filter.len();

        let mut k = 0usize;
        while k + 4 <= half {
            let base = 2 * k;
            let mut acc = _mm256_setzero_pd();
            if base + taps + 5 < n {
                for (j, &coef) in filter.iter().enumerate() {
                    let start = base + j;
                    let idx = _mm256_set_epi64x(
                        (start + 6) as i64,
                        (start + 4) as i64,
                        (start + 2) as i64,
                        start as i64,
                    );
                    let vals = _mm256_i64gather_pd::<8>(src, idx);
                    acc = _mm256_fmadd_pd(_mm256_set1_pd(coef), vals, acc);
                }
            } else {
                for (j, &coef) in filter.iter().enumerate() {
                    let start = base + j;
                    let idx = _mm256_set_epi64x(
                        ((start + 6) % n) as i64,
                        ((start + 4) % n) as i64,
                        ((start + 2) % n) as i64,
                        (start % n) as i64,
                    );
                    let vals = _mm256_i64gather_pd::<8>(src, idx);
                    acc = _mm256_fmadd_pd(_mm256_set1_pd(coef), vals, acc);
                }
            }
            _mm256_storeu_pd(result.as_mut_ptr().add(k), acc);
            k += 4;
        }

        // Tail outputs, same tap order as the vector loop.
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

    /// Interleave, eight outputs per iteration.
    ///
    /// unpacklo/unpackhi interleave within 128-bit lanes, then
    /// permute2f128 stitches the lane halves into the two output vectors:
    /// `[a0 d0 a1 d1]` and `[a2 d2 a3 d3]`.
    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn upsample_avx2(&self, approx: &[f64], detail: &[f64], output: &mut [f64]) {
        let half = approx.len();
        let out = output.as_mut_ptr();
        let mut i = 0usize;
        while i + 4 <= half {
            let a = _mm256_loadu_pd(approx.as_ptr().add(i));
            let d = _mm256_loadu_pd(detail.as_ptr().add(i));
            let lo = _mm256_unpacklo_pd(a, d);
            let hi = _mm256_unpackhi_pd(a, d);
            _mm256_storeu_pd(out.add(2 * i), _mm256_permute2f128_pd::<0x20>(lo, hi));
            _mm256_storeu_pd(out.add(2 * i + 4), _mm256_permute2f128_pd::<0x31>(lo, hi));
            i += 4;
        }
        while i < half {
            output[2 * i] = approx[i];
            output[2 * i + 1] = detail[i];
            i += 1;
        }
    }

    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn strided_avx2(
        &self,
        signal: &[f64],
        offset: usize,
        stride: usize,
        count: usize,
    ) -> Vec<f64> {
        let mut result = vec![0.0; count];
        let src = signal.as_ptr();
        let mut i = 0usize;
        if count >= 4 {
            // Validation bounds stride * (count - 1), so the lane offsets
            // cannot overflow once at least four elements are gathered.
            let step = _mm256_set_epi64x(
                (3 * stride) as i64,
                (2 * stride) as i64,
                stride as i64,
                0,
            );
            while i + 4 <= count {
                let base = _mm256_set1_epi64x((offset + i * stride) as i64);
                let vals = _mm256_i64gather_pd::<8>(src, _mm256_add_epi64(base, step));
                _mm256_storeu_pd(result.as_mut_ptr().add(i), vals);
                i += 4;
            }
        }
        while i < count {
            result[i] = signal[offset + i * stride];
            i += 1;
        }
        result
    }

    /// Mask compaction in chunks of four lanes.
    ///
    /// AVX2 has no compress instruction for doubles, so only all-true
    /// chunks move as one vector; mixed chunks fall back to per-lane
    /// writes against a running cursor.
    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn compressed_avx2(&self, signal: &[f64], mask: &[bool]) -> Vec<f64> {
        let kept = mask.iter().filter(|&&keep| keep).count();
        let mut result = vec![0.0; kept];
        let mut cursor = 0usize;
        let mut i = 0usize;
        while i + 4 <= signal.len() {
            let bits = mask[i] as u8
                | (mask[i + 1] as u8) << 1
                | (mask[i + 2] as u8) << 2
                | (mask[i + 3] as u8) << 3;
            if bits == 0b1111 {
                // An all-true chunk implies at least four slots remain.
                let v = _mm256_loadu_pd(signal.as_ptr().add(i));
                _mm256_storeu_pd(result.as_mut_ptr().add(cursor), v);
                cursor += 4;
            } else if bits != 0 {
                for lane in 0..4 {
                    if mask[i + lane] {
                        result[cursor] = signal[i + lane];
                        cursor += 1;
                    }
                }
            }
            i += 4;
        }
        while i < signal.len() {
            if mask[i] {
                result[cursor] = signal[i];
                cursor += 1;
            }
            i += 1;
        }
        debug_assert_eq!(cursor, kept);
        result
    }

    #[target_feature(enable = "avx2", enable = "fma")]
    unsafe fn batch_gather_avx2(
        &self,
        signals: &[&[f64]],
        indices: &[usize],
        results: &mut [Vec<f64>],
        count: usize,
    ) {
        // Index translation is shared by every batch.
        let idx64: Vec<i64> = indices[..count].iter().map(|&v| v as i64).collect();
        for (signal, out) in signals.iter().zip(results.iter_mut()) {
            let src = signal.as_ptr();
            let mut i = 0usize;
            while i + 4 <= count {
                let idx = _mm256_loadu_si256(idx64.as_ptr().add(i) as *const __m256i);
                let vals = _mm256_i64gather_pd::<8>(src, idx);
                _mm256_storeu_pd(out.as_mut_ptr().add(i), vals);
                i += 4;
            }
            while i < count {
                out[i] = signal[indices[i]];
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wavegs_common::PARITY_TOLERANCE;

    fn test_signal(len: usize) -> Vec<f64> {
        (0..len).map(|i| ((i * 31 + 7) % 23) as f64 * 0.37 - 3.1).collect()
    }

    fn assert_close(simd: &[f64], scalar: &[f64]) {
        assert_eq!(simd.len(), scalar.len());
        for (i, (a, b)) in simd.iter().zip(scalar.iter()).enumerate() {
            assert!(
                (a - b).abs() <= PARITY_TOLERANCE,
                "lane {i}: avx2 {a} vs scalar {b}"
            );
        }
    }

    #[test]
    fn downsample_matches_scalar_across_sizes() {
        for n in [0usize, 2, 4, 6, 8, 16, 30, 64, 128] {
            let signal = test_signal(n);
            for taps in [1usize, 2, 4, 5, 9] {
                let filter: Vec<f64> = (0..taps).map(|j| 0.1 * (j + 1) as f64).collect();
                let simd = Avx2Kernel.gather_periodic_downsample(&signal, &filter).unwrap();
                let scalar = ScalarKernel.gather_periodic_downsample(&signal, &filter).unwrap();
                assert_close(&simd, &scalar);
            }
        }
    }

    #[test]
    fn downsample_matches_scalar_when_filter_wraps_repeatedly() {
        let signal = test_signal(4);
        let filter: Vec<f64> = (0..11).map(|j| 1.0 / (j + 1) as f64).collect();
        let simd = Avx2Kernel.gather_periodic_downsample(&signal, &filter).unwrap();
        let scalar = ScalarKernel.gather_periodic_downsample(&signal, &filter).unwrap();
        assert_close(&simd, &scalar);
    }

    #[test]
    fn upsample_matches_scalar() {
        for half in [0usize, 1, 3, 4, 7, 16, 33] {
            let approx = test_signal(half);
            let detail: Vec<f64> = test_signal(half).iter().map(|v| -v).collect();
            let mut simd_out = vec![0.0; 2 * half];
            let mut scalar_out = vec![0.0; 2 * half];
            Avx2Kernel.scatter_upsample(&approx, &detail, &mut simd_out).unwrap();
            ScalarKernel.scatter_upsample(&approx, &detail, &mut scalar_out).unwrap();
            assert_eq!(simd_out, scalar_out);
        }
    }

    #[test]
    fn strided_matches_scalar() {
        let signal = test_signal(120);
        for &(offset, stride, count) in
            &[(0usize, 1usize, 7usize), (1, 2, 9), (3, 7, 16), (5, 11, 10), (119, 1, 1)]
        {
            let simd = Avx2Kernel.gather_strided(&signal, offset, stride, count).unwrap();
            let scalar = ScalarKernel.gather_strided(&signal, offset, stride, count).unwrap();
            assert_eq!(simd, scalar);
        }
    }

    #[test]
    fn compressed_matches_scalar_on_mixed_masks() {
        let signal = test_signal(67);
        let mask: Vec<bool> = (0..67).map(|i| (i * 13 + 5) % 3 != 0).collect();
        let simd = Avx2Kernel.gather_compressed(&signal, &mask).unwrap();
        let scalar = ScalarKernel.gather_compressed(&signal, &mask).unwrap();
        assert_eq!(simd, scalar);
    }

    #[test]
    fn compressed_handles_uniform_masks() {
        let signal = test_signal(32);
        let all = Avx2Kernel.gather_compressed(&signal, &vec![true; 32]).unwrap();
        assert_eq!(all, signal);
        let none = Avx2Kernel.gather_compressed(&signal, &vec![false; 32]).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn batch_gather_matches_scalar() {
        let a = test_signal(40);
        let b = test_signal(25);
        let signals: [&[f64]; 2] = [&a, &b];
        let indices: Vec<usize> = (0..13).map(|i| (i * 7) % 25).collect();
        let mut simd_out = vec![vec![0.0; 13]; 2];
        let mut scalar_out = vec![vec![0.0; 13]; 2];
        Avx2Kernel.batch_gather(&signals, &indices, &mut simd_out, 13).unwrap();
        ScalarKernel.batch_gather(&signals, &indices, &mut scalar_out, 13).unwrap();
        assert_eq!(simd_out, scalar_out);
    }

    #[test]
    fn rejects_invalid_arguments_like_scalar() {
        assert!(Avx2Kernel.gather_periodic_downsample(&[1.0; 3], &[1.0]).is_err());
        assert!(Avx2Kernel.gather_strided(&[1.0; 4], 0, 0, 2).is_err());
        assert!(Avx2Kernel.gather_compressed(&[1.0; 4], &[true; 3]).is_err());
    }
}
