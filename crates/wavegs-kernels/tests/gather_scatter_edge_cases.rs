//! Edge-case tests for the gather/scatter public API.
//!
//! Exercises the dispatching entry points with the documented contract
//! scenarios: decimation phase, periodic wrap direction, interleave
//! ordering, mask boundaries, batch independence, and the fail-fast error
//! paths.

use wavegs_kernels::{
    batch_gather, gather_compressed, gather_periodic_downsample, gather_strided, info_string,
    is_available, scatter_upsample,
};

// ── periodic downsample ──────────────────────────────────────────────

#[test]
fn downsample_pure_decimation() {
    let result = gather_periodic_downsample(&[1.0, 2.0, 3.0, 4.0], &[1.0]).unwrap();
    assert_eq!(result, vec![1.0, 3.0]);
}

#[test]
fn downsample_output_is_half_length() {
    let signal: Vec<f64> = (0..34).map(|i| i as f64).collect();
    let result = gather_periodic_downsample(&signal, &[0.5, 0.5]).unwrap();
    assert_eq!(result.len(), 17);
}

#[test]
fn downsample_scaled_decimation() {
    let result = gather_periodic_downsample(&[1.0, 2.0, 3.0, 4.0], &[2.0]).unwrap();
    assert_eq!(result, vec![2.0, 6.0]);
}

#[test]
fn downsample_last_window_wraps_to_front() {
    // k = 2 reads indices 4, 5, (6 mod 6) = 0
    let signal = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let result = gather_periodic_downsample(&signal, &[1.0, 1.0, 1.0]).unwrap();
    assert_eq!(result, vec![6.0, 12.0, 12.0]);
}

#[test]
fn downsample_wraps_more_than_once_for_long_filters() {
    // Seven taps over two samples: k = 0 reads 0,1,0,1,0,1,0
    let result = gather_periodic_downsample(&[1.0, 100.0], &[1.0; 7]).unwrap();
    assert_eq!(result, vec![4.0 + 300.0]);
}

#[test]
fn downsample_dc_constant_signal_with_unit_gain_filter() {
    let signal = vec![std::f64::consts::PI; 32];
    let filter = [0.1, 0.2, 0.4, 0.2, 0.1];
    let result = gather_periodic_downsample(&signal, &filter).unwrap();
    assert_eq!(result.len(), 16);
    for &v in &result {
        assert!((v - std::f64::consts::PI).abs() < 1e-12);
    }
}

#[test]
fn downsample_rejects_odd_signal_length() {
    assert!(gather_periodic_downsample(&[1.0, 2.0, 3.0], &[1.0]).is_err());
}

#[test]
fn downsample_rejects_empty_filter() {
    assert!(gather_periodic_downsample(&[1.0, 2.0], &[]).is_err());
}

#[test]
fn downsample_empty_signal_yields_empty() {
    assert!(gather_periodic_downsample(&[], &[0.5, 0.5]).unwrap().is_empty());
}

// ── scatter upsample ─────────────────────────────────────────────────

#[test]
fn upsample_interleaves_approx_and_detail() {
    let mut output = [0.0; 8];
    scatter_upsample(&[1.0, 2.0, 3.0, 4.0], &[0.1, 0.2, 0.3, 0.4], &mut output).unwrap();
    assert_eq!(output, [1.0, 0.1, 2.0, 0.2, 3.0, 0.3, 4.0, 0.4]);
}

#[test]
fn upsample_strictly_alternates() {
    let approx: Vec<f64> = (0..9).map(|i| i as f64).collect();
    let detail: Vec<f64> = (0..9).map(|i| -(i as f64)).collect();
    let mut output = vec![f64::NAN; 18];
    scatter_upsample(&approx, &detail, &mut output).unwrap();
    for i in 0..9 {
        assert_eq!(output[2 * i], approx[i]);
        assert_eq!(output[2 * i + 1], detail[i]);
    }
}

#[test]
fn upsample_empty_halves() {
    let mut output: [f64; 0] = [];
    scatter_upsample(&[], &[], &mut output).unwrap();
}

#[test]
fn upsample_rejects_wrong_output_length() {
    let mut output = [0.0; 5];
    assert!(scatter_upsample(&[1.0, 2.0], &[3.0, 4.0], &mut output).is_err());
}

// ── strided gather ───────────────────────────────────────────────────

#[test]
fn strided_basic() {
    let signal = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
    assert_eq!(gather_strided(&signal, 1, 2, 3).unwrap(), vec![1.0, 3.0, 5.0]);
}

#[test]
fn strided_output_length_is_count() {
    let signal: Vec<f64> = (0..100).map(|i| i as f64).collect();
    assert_eq!(gather_strided(&signal, 3, 7, 12).unwrap().len(), 12);
}

#[test]
fn strided_stride_one_is_a_slice_copy() {
    let signal = [5.0, 6.0, 7.0, 8.0];
    assert_eq!(gather_strided(&signal, 1, 1, 3).unwrap(), vec![6.0, 7.0, 8.0]);
}

#[test]
fn strided_rejects_zero_stride() {
    assert!(gather_strided(&[1.0, 2.0], 0, 0, 2).is_err());
}

#[test]
fn strided_rejects_last_index_out_of_range() {
    // last index = 2 + 3*3 = 11 for a 10-element signal
    assert!(gather_strided(&[0.0; 10], 2, 3, 4).is_err());
    assert!(gather_strided(&[0.0; 12], 2, 3, 4).is_ok());
}

#[test]
fn strided_rejects_offset_out_of_range() {
    assert!(gather_strided(&[0.0; 4], 4, 1, 1).is_err());
}

// ── compressed gather ────────────────────────────────────────────────

#[test]
fn compressed_basic() {
    let result = gather_compressed(&[1.0, 2.0, 3.0, 4.0], &[true, false, true, false]).unwrap();
    assert_eq!(result, vec![1.0, 3.0]);
}

#[test]
fn compressed_all_false_yields_empty() {
    assert!(gather_compressed(&[1.0, 2.0, 3.0], &[false; 3]).unwrap().is_empty());
}

#[test]
fn compressed_all_true_copies_signal() {
    let signal: Vec<f64> = (0..23).map(|i| i as f64 * 1.5).collect();
    assert_eq!(gather_compressed(&signal, &vec![true; 23]).unwrap(), signal);
}

#[test]
fn compressed_preserves_order() {
    let signal = [9.0, 1.0, 8.0, 2.0, 7.0, 3.0];
    let mask = [false, true, true, false, false, true];
    assert_eq!(gather_compressed(&signal, &mask).unwrap(), vec![1.0, 8.0, 3.0]);
}

#[test]
fn compressed_rejects_length_mismatch() {
    assert!(gather_compressed(&[1.0, 2.0], &[true]).is_err());
}

// ── batch gather ─────────────────────────────────────────────────────

#[test]
fn batch_gather_basic() {
    let a = [1.0, 2.0, 3.0, 4.0];
    let b = [5.0, 6.0, 7.0, 8.0];
    let signals: [&[f64]; 2] = [&a, &b];
    let mut results = vec![vec![0.0; 2]; 2];
    batch_gather(&signals, &[0, 2], &mut results, 2).unwrap();
    assert_eq!(results, vec![vec![1.0, 3.0], vec![5.0, 7.0]]);
}

#[test]
fn batch_gather_fills_num_batches_times_count() {
    let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
    let b: Vec<f64> = (0..20).map(|i| i as f64 + 100.0).collect();
    let c: Vec<f64> = (0..15).map(|i| i as f64 - 50.0).collect();
    let signals: [&[f64]; 3] = [&a, &b, &c];
    let indices = [9, 0, 4, 2];
    let mut results = vec![vec![f64::NAN; 4]; 3];
    batch_gather(&signals, &indices, &mut results, 4).unwrap();
    for row in &results {
        assert_eq!(row.len(), 4);
        assert!(row.iter().all(|v| v.is_finite()));
    }
    assert_eq!(results[1], vec![109.0, 100.0, 104.0, 102.0]);
}

#[test]
fn batch_gather_ragged_batches_validate_against_each_length() {
    let long = [1.0; 16];
    let short = [2.0; 4];
    let signals: [&[f64]; 2] = [&long, &short];
    let mut results = vec![vec![0.0; 1]; 2];
    assert!(batch_gather(&signals, &[10], &mut results, 1).is_err());
    assert!(batch_gather(&signals, &[3], &mut results, 1).is_ok());
}

#[test]
fn batch_gather_error_leaves_results_untouched() {
    let a = [1.0, 2.0];
    let signals: [&[f64]; 1] = [&a];
    let mut results = vec![vec![42.0; 2]];
    assert!(batch_gather(&signals, &[0, 5], &mut results, 2).is_err());
    assert_eq!(results, vec![vec![42.0; 2]]);
}

// ── diagnostics ──────────────────────────────────────────────────────

#[test]
fn info_string_agrees_with_is_available() {
    let info = info_string();
    if is_available() {
        assert!(info.contains("Available"));
        assert!(!info.contains("Not Available"));
    } else {
        assert!(info.contains("Not Available"));
    }
}
