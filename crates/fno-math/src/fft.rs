//! Real 3D FFT pair around rustfft.
//!
//! Convention matches `numpy.fft.rfftn` / `irfftn` over all three axes:
//! - Forward (rfft3): unnormalized, half spectrum on the last axis
//! - Inverse (irfft3): normalized by 1/(n1*n2*n3), Hermitian along the last axis

use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Array3, ArrayView3, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Length of the half spectrum kept for a real signal of length `n`.
pub fn half_len(n: usize) -> usize {
    n / 2 + 1
}

fn process_lanes(data: &mut Array3<Complex64>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let mut buf = vec![Complex64::new(0.0, 0.0); data.len_of(axis)];
    for mut lane in data.lanes_mut(axis) {
        for (b, v) in buf.iter_mut().zip(lane.iter()) {
            *b = *v;
        }
        fft.process(&mut buf);
        for (v, b) in lane.iter_mut().zip(buf.iter()) {
            *v = *b;
        }
    }
}

/// Forward real 3D FFT. Output shape is (n1, n2, n3/2 + 1).
pub fn rfft3(input: ArrayView3<'_, f64>) -> Array3<Complex64> {
    let (n1, n2, n3) = input.dim();
    let mut planner = FftPlanner::new();

    // Last axis first, then drop the redundant conjugate half.
    let mut full = input.mapv(|v| Complex64::new(v, 0.0));
    process_lanes(&mut full, Axis(2), &planner.plan_fft_forward(n3));
    let mut spectrum = full.slice(s![.., .., ..half_len(n3)]).to_owned();

    process_lanes(&mut spectrum, Axis(1), &planner.plan_fft_forward(n2));
    process_lanes(&mut spectrum, Axis(0), &planner.plan_fft_forward(n1));
    spectrum
}

/// Inverse real 3D FFT back to physical extents `shape`.
///
/// Imaginary parts that a real signal cannot carry (DC and Nyquist along the
/// last axis) are discarded, as `irfftn` does.
pub fn irfft3(spectrum: &Array3<Complex64>, shape: (usize, usize, usize)) -> FnoResult<Array3<f64>> {
    let (n1, n2, n3) = shape;
    let expected = (n1, n2, half_len(n3));
    if spectrum.dim() != expected {
        return Err(FnoError::ShapeMismatch(format!(
            "irfft3 spectrum {:?} does not match half spectrum {:?} of {:?}",
            spectrum.dim(),
            expected,
            shape
        )));
    }
    let mut planner = FftPlanner::new();
    let norm = 1.0 / (n1 * n2 * n3) as f64;

    let mut data = spectrum.clone();
    process_lanes(&mut data, Axis(0), &planner.plan_fft_inverse(n1));
    process_lanes(&mut data, Axis(1), &planner.plan_fft_inverse(n2));

    // Rebuild each Hermitian line along the last axis, then complex inverse.
    let ifft_t = planner.plan_fft_inverse(n3);
    let h = half_len(n3);
    let mut line = vec![Complex64::new(0.0, 0.0); n3];
    let mut out = Array3::zeros(shape);
    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n3 {
                line[k] = if k < h {
                    data[[i, j, k]]
                } else {
                    data[[i, j, n3 - k]].conj()
                };
            }
            ifft_t.process(&mut line);
            for k in 0..n3 {
                out[[i, j, k]] = line[k].re * norm;
            }
        }
    }
    Ok(out)
}
