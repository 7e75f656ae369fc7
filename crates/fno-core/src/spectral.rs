// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Spectral Convolution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! 3D spectral convolution: rfft3, per-mode channel contraction, irfft3.
//!
//! The half spectrum keeps frequencies 0..=n3/2 on the last axis, so only the
//! x and y axes have a high-frequency band. Each (x band, y band) corner of the
//! truncated cube carries its own complex weight tensor.

use fno_math::fft::{half_len, irfft3, rfft3};
use fno_types::constants::SPECTRAL_CORNERS;
use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Array3, Array5};
use num_complex::Complex64;
use rand::Rng;

/// Frequency band along one transformed axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// First `modes` indices (non-negative frequencies).
    Low,
    /// Last `modes` indices (negative frequencies).
    High,
}

impl Band {
    /// First spectral index covered by this band on an axis of length `n`.
    pub fn offset(self, n: usize, modes: usize) -> usize {
        match self {
            Band::Low => 0,
            Band::High => n - modes,
        }
    }
}

/// Corner of the truncated frequency cube (the time axis is always low).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Corner {
    pub x: Band,
    pub y: Band,
}

impl Corner {
    /// Write order. Later corners overwrite earlier ones where they overlap.
    pub const ALL: [Corner; SPECTRAL_CORNERS] = [
        Corner { x: Band::Low, y: Band::Low },
        Corner { x: Band::High, y: Band::Low },
        Corner { x: Band::Low, y: Band::High },
        Corner { x: Band::High, y: Band::High },
    ];

    /// Short archive tag, e.g. `hl` for high-x / low-y.
    pub fn tag(self) -> &'static str {
        match (self.x, self.y) {
            (Band::Low, Band::Low) => "ll",
            (Band::High, Band::Low) => "hl",
            (Band::Low, Band::High) => "lh",
            (Band::High, Band::High) => "hh",
        }
    }
}

/// Complex weights of one corner: [in_channels, out_channels, m1, m2, m3].
#[derive(Debug, Clone)]
pub struct CornerWeights {
    pub corner: Corner,
    pub weights: Array5<Complex64>,
}

#[derive(Debug, Clone)]
pub struct SpectralConv3d {
    in_channels: usize,
    out_channels: usize,
    modes: [usize; 3],
    corners: Vec<CornerWeights>,
}

impl SpectralConv3d {
    /// Real and imaginary parts uniform in [0, 1/(in*out)).
    pub fn random<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        modes: [usize; 3],
        rng: &mut R,
    ) -> Self {
        let scale = 1.0 / (in_channels * out_channels).max(1) as f64;
        let dim = (in_channels, out_channels, modes[0], modes[1], modes[2]);
        let corners = Corner::ALL
            .iter()
            .map(|&corner| CornerWeights {
                corner,
                weights: Array5::from_shape_fn(dim, |_| {
                    Complex64::new(scale * rng.gen::<f64>(), scale * rng.gen::<f64>())
                }),
            })
            .collect();
        Self {
            in_channels,
            out_channels,
            modes,
            corners,
        }
    }

    /// Build from explicit corner weights. Each corner may appear at most once;
    /// absent corners contribute nothing.
    pub fn from_corners(
        in_channels: usize,
        out_channels: usize,
        modes: [usize; 3],
        corners: Vec<CornerWeights>,
    ) -> FnoResult<Self> {
        let expected = (in_channels, out_channels, modes[0], modes[1], modes[2]);
        for (i, cw) in corners.iter().enumerate() {
            if cw.weights.dim() != expected {
                return Err(FnoError::ConfigError(format!(
                    "Spectral corner {} weight shape {:?}, expected {:?}",
                    cw.corner.tag(),
                    cw.weights.dim(),
                    expected
                )));
            }
            if corners[..i].iter().any(|other| other.corner == cw.corner) {
                return Err(FnoError::ConfigError(format!(
                    "Spectral corner {} given twice",
                    cw.corner.tag()
                )));
            }
        }
        Ok(Self {
            in_channels,
            out_channels,
            modes,
            corners,
        })
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn modes(&self) -> [usize; 3] {
        self.modes
    }

    pub fn corners(&self) -> &[CornerWeights] {
        &self.corners
    }

    pub fn corner(&self, corner: Corner) -> Option<&CornerWeights> {
        self.corners.iter().find(|cw| cw.corner == corner)
    }

    pub fn corner_mut(&mut self, corner: Corner) -> Option<&mut CornerWeights> {
        self.corners.iter_mut().find(|cw| cw.corner == corner)
    }

    /// Complex entries count twice.
    pub fn parameter_count(&self) -> usize {
        self.corners.iter().map(|cw| 2 * cw.weights.len()).sum()
    }

    /// Check `n_i >= 1` and `1 <= modes_i <= floor(n_i/2)+1` on each
    /// transformed axis.
    pub fn check_extents(&self, extents: [usize; 3]) -> FnoResult<()> {
        for (axis, (&m, &n)) in self.modes.iter().zip(extents.iter()).enumerate() {
            if n == 0 {
                return Err(FnoError::ShapeMismatch(format!(
                    "axis {} has zero extent",
                    axis + 1
                )));
            }
            if m == 0 || m > n / 2 + 1 {
                return Err(FnoError::ShapeMismatch(format!(
                    "modes{}={m} invalid for extent {n}: need 1 <= modes <= {}",
                    axis + 1,
                    n / 2 + 1
                )));
            }
        }
        Ok(())
    }

    /// (batch, in_channels, X, Y, T) -> (batch, out_channels, X, Y, T).
    pub fn forward(&self, x: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let (batch, c_in, n1, n2, n3) = x.dim();
        if c_in != self.in_channels {
            return Err(FnoError::ShapeMismatch(format!(
                "Spectral block expects {} input channels, got {c_in}",
                self.in_channels
            )));
        }
        self.check_extents([n1, n2, n3])?;
        let [m1, m2, m3] = self.modes;

        let mut out = Array5::zeros((batch, self.out_channels, n1, n2, n3));
        for b in 0..batch {
            let x_ft: Vec<Array3<Complex64>> = (0..c_in)
                .map(|i| rfft3(x.slice(s![b, i, .., .., ..])))
                .collect();

            for o in 0..self.out_channels {
                let mut out_ft = Array3::from_elem((n1, n2, half_len(n3)), Complex64::new(0.0, 0.0));
                for cw in &self.corners {
                    let x0 = cw.corner.x.offset(n1, m1);
                    let y0 = cw.corner.y.offset(n2, m2);
                    for p in 0..m1 {
                        for q in 0..m2 {
                            for r in 0..m3 {
                                let mut acc = Complex64::new(0.0, 0.0);
                                for (i, xf) in x_ft.iter().enumerate() {
                                    acc += xf[[x0 + p, y0 + q, r]] * cw.weights[[i, o, p, q, r]];
                                }
                                out_ft[[x0 + p, y0 + q, r]] = acc;
                            }
                        }
                    }
                }
                let field = irfft3(&out_ft, (n1, n2, n3))?;
                out.slice_mut(s![b, o, .., .., ..]).assign(&field);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::StandardNormal;

    fn random_input(shape: (usize, usize, usize, usize, usize), seed: u64) -> Array5<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array5::from_shape_fn(shape, |_| rng.sample::<f64, _>(StandardNormal))
    }

    fn identity_corners(channels: usize, modes: [usize; 3]) -> Vec<CornerWeights> {
        let dim = (channels, channels, modes[0], modes[1], modes[2]);
        Corner::ALL
            .iter()
            .map(|&corner| CornerWeights {
                corner,
                weights: Array5::from_shape_fn(dim, |(i, o, _, _, _)| {
                    if i == o {
                        Complex64::new(1.0, 0.0)
                    } else {
                        Complex64::new(0.0, 0.0)
                    }
                }),
            })
            .collect()
    }

    fn max_abs_diff(a: &Array5<f64>, b: &Array5<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_output_shape_for_valid_modes() {
        let mut rng = StdRng::seed_from_u64(0);
        for modes in [[1, 1, 1], [2, 3, 2], [5, 4, 5]] {
            let conv = SpectralConv3d::random(3, 2, modes, &mut rng);
            let x = random_input((2, 3, 8, 6, 9), 1);
            let y = conv.forward(&x).unwrap();
            assert_eq!(y.dim(), (2, 2, 8, 6, 9));
            assert!(y.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_identity_weights_full_coverage_reproduce_input() {
        let (n1, n2, n3) = (8, 6, 7);
        let modes = [n1 / 2 + 1, n2 / 2 + 1, n3 / 2 + 1];
        let conv = SpectralConv3d::from_corners(2, 2, modes, identity_corners(2, modes)).unwrap();
        let x = random_input((1, 2, n1, n2, n3), 5);
        let y = conv.forward(&x).unwrap();
        let err = max_abs_diff(&x, &y);
        assert!(err < 1e-10, "identity spectral block drifted: {err:.3e}");
    }

    #[test]
    fn test_truncation_removes_high_frequencies() {
        // A pure mid-band mode outside every corner is filtered to zero.
        let (n1, n2, n3) = (8, 8, 8);
        let modes = [2, 2, 2];
        let conv = SpectralConv3d::from_corners(1, 1, modes, identity_corners(1, modes)).unwrap();
        let x = Array5::from_shape_fn((1, 1, n1, n2, n3), |(_, _, _, _, k)| {
            (2.0 * std::f64::consts::PI * 3.0 * k as f64 / n3 as f64).cos()
        });
        let y = conv.forward(&x).unwrap();
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_corners_superpose_independently() {
        let modes = [2, 2, 2];
        let full = SpectralConv3d::random(2, 3, modes, &mut StdRng::seed_from_u64(9));
        let last = Corner { x: Band::High, y: Band::High };

        let mut without_last = full.clone();
        without_last
            .corner_mut(last)
            .unwrap()
            .weights
            .fill(Complex64::new(0.0, 0.0));

        let mut only_last = full.clone();
        for cw in only_last.corners.iter_mut().filter(|cw| cw.corner != last) {
            cw.weights.fill(Complex64::new(0.0, 0.0));
        }

        let x = random_input((1, 2, 6, 6, 6), 21);
        let y_full = full.forward(&x).unwrap();
        let y_rest = without_last.forward(&x).unwrap();
        let y_last = only_last.forward(&x).unwrap();

        let sum = &y_rest + &y_last;
        assert!(max_abs_diff(&y_full, &sum) < 1e-12);
        assert!(max_abs_diff(&y_full, &y_rest) > 1e-6);
    }

    #[test]
    fn test_modes_beyond_half_spectrum_rejected() {
        let conv = SpectralConv3d::random(1, 1, [2, 2, 5], &mut StdRng::seed_from_u64(0));
        let x = random_input((1, 1, 8, 8, 6), 0);
        let err = conv.forward(&x).unwrap_err();
        assert!(matches!(err, FnoError::ShapeMismatch(_)));
    }

    #[test]
    fn test_zero_extent_rejected() {
        let conv = SpectralConv3d::random(1, 1, [1, 1, 1], &mut StdRng::seed_from_u64(0));
        for shape in [(1, 1, 0, 4, 4), (1, 1, 4, 0, 4), (1, 1, 4, 4, 0)] {
            let err = conv.forward(&Array5::zeros(shape)).unwrap_err();
            assert!(matches!(err, FnoError::ShapeMismatch(_)), "{shape:?}");
        }
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let conv = SpectralConv3d::random(3, 1, [1, 1, 1], &mut StdRng::seed_from_u64(0));
        let x = random_input((1, 2, 4, 4, 4), 0);
        assert!(conv.forward(&x).is_err());
    }

    #[test]
    fn test_random_init_scale_and_count() {
        let conv = SpectralConv3d::random(2, 4, [2, 3, 2], &mut StdRng::seed_from_u64(4));
        assert_eq!(conv.corners().len(), 4);
        let bound = 1.0 / 8.0;
        for cw in conv.corners() {
            assert!(cw.weights.iter().all(|w| w.re >= 0.0 && w.re < bound && w.im >= 0.0 && w.im < bound));
        }
        assert_eq!(conv.parameter_count(), 4 * 2 * (2 * 4 * 2 * 3 * 2));
    }

    #[test]
    fn test_duplicate_corner_rejected() {
        let mut corners = identity_corners(1, [1, 1, 1]);
        corners[1].corner = corners[0].corner;
        assert!(SpectralConv3d::from_corners(1, 1, [1, 1, 1], corners).is_err());
    }

    #[test]
    fn test_corner_tags_unique() {
        let tags: Vec<&str> = Corner::ALL.iter().map(|c| c.tag()).collect();
        assert_eq!(tags, vec!["ll", "hl", "lh", "hh"]);
    }
}
