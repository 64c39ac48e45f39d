//! Eager argument validation shared by all kernel providers.
//!
//! Every check runs before any output buffer is touched, so a returned
//! error guarantees no partially-written output. Both providers call the
//! same helpers, keeping rejection behavior identical across paths.

use wavegs_common::{KernelError, Result};

fn invalid(reason: String) -> wavegs_common::WavegsError {
    KernelError::InvalidArguments { reason }.into()
}

/// Validate a periodic-downsample call and return the output length `n / 2`.
pub(crate) fn periodic_downsample(signal: &[f64], filter: &[f64]) -> Result<usize> {
    if filter.is_empty() {
        return Err(invalid("periodic downsample requires a non-empty filter".into()));
    }
    let n = signal.len();
    if n % 2 != 0 {
        return Err(invalid(format!(
            "periodic downsample requires an even signal length, got {n}"
        )));
    }
    Ok(n / 2)
}

pub(crate) fn scatter_upsample(approx: &[f64], detail: &[f64], output: &[f64]) -> Result<()> {
    if approx.len() != detail.len() {
        return Err(invalid(format!(
            "scatter upsample half-band length mismatch: approx {} != detail {}",
            approx.len(),
            detail.len()
        )));
    }
    if output.len() != 2 * approx.len() {
        return Err(invalid(format!(
            "scatter upsample output length {} != 2 * half-band length {}",
            output.len(),
            approx.len()
        )));
    }
    Ok(())
}

pub(crate) fn strided(signal: &[f64], offset: usize, stride: usize, count: usize) -> Result<()> {
    if stride == 0 {
        return Err(invalid("strided gather requires stride >= 1".into()));
    }
    if count == 0 {
        return Ok(());
    }
    let last = stride
        .checked_mul(count - 1)
        .and_then(|span| span.checked_add(offset))
        .ok_or_else(|| invalid("strided gather index computation overflows".into()))?;
    if last >= signal.len() {
        return Err(invalid(format!(
            "strided gather reads index {last} (offset {offset}, stride {stride}, \
             count {count}) beyond signal length {}",
            signal.len()
        )));
    }
    Ok(())
}

pub(crate) fn compressed(signal: &[f64], mask: &[bool]) -> Result<()> {
    if signal.len() != mask.len() {
        return Err(invalid(format!(
            "compressed gather length mismatch: signal {} != mask {}",
            signal.len(),
            mask.len()
        )));
    }
    Ok(())
}

pub(crate) fn batch_gather(
    signals: &[&[f64]],
    indices: &[usize],
    results: &[Vec<f64>],
    count: usize,
) -> Result<()> {
    if count > indices.len() {
        return Err(invalid(format!(
            "batch gather count {count} exceeds indices length {}",
            indices.len()
        )));
    }
    if results.len() != signals.len() {
        return Err(invalid(format!(
            "batch gather results batch count {} != signals batch count {}",
            results.len(),
            signals.len()
        )));
    }
    for (b, out) in results.iter().enumerate() {
        if out.len() != count {
            return Err(invalid(format!(
                "batch gather results[{b}] length {} != count {count}",
                out.len()
            )));
        }
    }
    for (b, signal) in signals.iter().enumerate() {
        for &idx in &indices[..count] {
            if idx >= signal.len() {
                return Err(invalid(format!(
                    "batch gather index {idx} out of bounds for batch {b} of length {}",
                    signal.len()
                )));
            }
        }
    }
    Ok(())
}
