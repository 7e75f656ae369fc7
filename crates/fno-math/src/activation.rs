//! Pointwise nonlinearities.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// GELU, exact form `x·Φ(x)` with the Gaussian CDF via `erf`.
pub fn gelu(x: f64) -> f64 {
    0.5 * x * (1.0 + libm::erf(x * FRAC_1_SQRT_2))
}

/// GELU, tanh approximation. Within ~1e-3 of [`gelu`].
pub fn gelu_tanh(x: f64) -> f64 {
    0.5 * x * (1.0 + ((2.0 / PI).sqrt() * (x + 0.044_715 * x.powi(3))).tanh())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gelu_fixed_points() {
        assert_eq!(gelu(0.0), 0.0);
        // Φ(1) = 0.841344746..., Φ(-1) = 0.158655253...
        assert!((gelu(1.0) - 0.841_344_746).abs() < 1e-9);
        assert!((gelu(-1.0) + 0.158_655_254).abs() < 1e-9);
    }

    #[test]
    fn test_gelu_asymptotes() {
        assert!((gelu(10.0) - 10.0).abs() < 1e-9);
        assert!(gelu(-10.0).abs() < 1e-9);
    }

    #[test]
    fn test_tanh_form_tracks_exact_form() {
        assert!((gelu_tanh(1.0) - 0.841_192).abs() < 1e-5);
        for i in -60..=60 {
            let x = i as f64 * 0.1;
            assert!((gelu(x) - gelu_tanh(x)).abs() < 1e-3, "x={x}");
        }
    }
}
