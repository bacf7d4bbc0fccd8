//! Temporal resampling of traces.
//!
//! Cubic (Catmull-Rom) interpolation, one trace per rayon task.
//! Traces are the columns of a column-major matrix so every trace is a
//! contiguous slice.

use crate::error::*;
use crate::records::TraceData;
use crate::util::SNAP_EPSILON;
use rayon::prelude::*;

/// Value of `trace` at fractional sample `s`.
/// Neighbours are clamped at the ends, zero outside the trace.
pub fn sample_cubic(trace: &[f64], s: f64) -> f64 {
    let n = trace.len();
    if n == 0 || s < -SNAP_EPSILON || s > (n - 1) as f64 + SNAP_EPSILON {
        return 0.0;
    }
    let s = s.clamp(0.0, (n - 1) as f64);
    let i = s.floor() as usize;
    let t = s - i as f64;
    if t == 0.0 {
        return trace[i];
    }
    let at = |k: isize| trace[k.clamp(0, n as isize - 1) as usize];
    let i = i as isize;
    let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Linear interpolation of `trace` at fractional sample `s`, samples
/// outside the trace count as zero. Being a sum of hat functions it is
/// its own transpose: shifting by `+a` is the adjoint of shifting by `-a`.
pub fn sample_linear(trace: &[f64], s: f64) -> f64 {
    let i0 = s.floor();
    let f = s - i0;
    let at = |i: f64| {
        if i >= 0.0 && i < trace.len() as f64 {
            trace[i as usize]
        } else {
            0.0
        }
    };
    (1.0 - f) * at(i0) + f * at(i0 + 1.0)
}

/// Resample one trace from interval `dt_in` to `dt_out`, `nt_out` samples.
pub fn resample_trace(trace: &[f64], dt_in: f64, dt_out: f64, out: &mut [f64]) {
    let ratio = dt_out / dt_in;
    for (j, v) in out.iter_mut().enumerate() {
        *v = sample_cubic(trace, j as f64 * ratio);
    }
}

/// Resample every trace (column) of `data` onto `nt_out` samples spaced `dt_out`.
pub fn time_resample(
    data: &TraceData,
    dt_in: f64,
    dt_out: f64,
    nt_out: usize,
) -> Result<TraceData> {
    profiling::scope!("resample::time_resample");
    if !(dt_in > 0.0) || !(dt_out > 0.0) {
        return Err(SeisError::geometry(format!(
            "cannot resample from dt = {dt_in} to dt = {dt_out}"
        )));
    }
    let (nt_in, n_traces) = data.shape();
    if nt_out == nt_in && (dt_in - dt_out).abs() <= SNAP_EPSILON * dt_in {
        return Ok(data.clone());
    }

    let mut result = TraceData::zeros(nt_out, n_traces);
    if nt_in == 0 || nt_out == 0 {
        return Ok(result);
    }
    result
        .as_mut_slice()
        .par_chunks_mut(nt_out)
        .zip(data.as_slice().par_chunks(nt_in))
        .for_each(|(out, trace)| resample_trace(trace, dt_in, dt_out, out));
    Ok(result)
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn sine(nt: usize, dt: f64, period: f64, n_traces: usize) -> TraceData {
        TraceData::from_fn(nt, n_traces, |i, j| {
            (2.0 * std::f64::consts::PI * i as f64 * dt / period + j as f64).sin()
        })
    }

    #[test]
    fn exact_on_grid_points_test() {
        let trace = [0.0, 1.0, 4.0, 9.0, 16.0];
        assert_eq!(sample_cubic(&trace, 2.0), 4.0);
        assert_eq!(sample_cubic(&trace, 4.0), 16.0);
        assert_eq!(sample_cubic(&trace, 5.5), 0.0);
        // Catmull-Rom reproduces quadratics away from the ends.
        assert_approx_eq!(f64, sample_cubic(&trace, 1.5), 2.25, epsilon = 1e-12);
    }

    #[test]
    fn linear_shift_is_self_adjoint_test() {
        let a = [1.0, -2.0, 0.5, 3.0, 0.0, 1.5];
        let b = [0.3, 0.7, -1.0, 2.0, 0.25, -0.5];
        let shift = 1.3;
        let lhs: f64 = (0..a.len())
            .map(|t| sample_linear(&a, t as f64 - shift) * b[t])
            .sum();
        let rhs: f64 = (0..b.len())
            .map(|k| a[k] * sample_linear(&b, k as f64 + shift))
            .sum();
        assert_approx_eq!(f64, lhs, rhs, epsilon = 1e-12);
        assert_eq!(sample_linear(&a, -1.0), 0.0);
        assert_approx_eq!(f64, sample_linear(&a, 0.5), -0.5);
    }

    #[test]
    fn identity_test() {
        let data = sine(50, 1.0, 20.0, 3);
        let same = time_resample(&data, 1.0, 1.0, 50).unwrap();
        assert_eq!(same, data);
    }

    #[test]
    fn decimation_picks_samples_test() {
        let data = sine(101, 0.5, 40.0, 2);
        let coarse = time_resample(&data, 0.5, 2.0, 26).unwrap();
        assert_eq!(coarse.shape(), (26, 2));
        for j in 0..2 {
            for i in 0..26 {
                assert_approx_eq!(f64, coarse[(i, j)], data[(4 * i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn down_then_up_test() {
        let dt = 0.5;
        let data = sine(401, dt, 100.0, 4);
        let coarse = time_resample(&data, dt, 2.0, 101).unwrap();
        let back = time_resample(&coarse, 2.0, dt, 401).unwrap();
        let max_err = (&back - &data).amax();
        // End samples only see clamped neighbours.
        assert!(max_err < 2e-2, "max error {max_err}");
    }

    #[test]
    fn bad_interval_test() {
        let data = sine(10, 1.0, 5.0, 1);
        assert!(time_resample(&data, 0.0, 1.0, 10).is_err());
    }
}
