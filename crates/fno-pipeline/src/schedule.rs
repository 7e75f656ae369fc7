//! Learning-rate schedule.

use std::f64::consts::PI;

/// Cosine annealing from `base_lr` at step 0 to `eta_min` at `t_max`.
///
/// Past `t_max` the cosine keeps its period, rising again toward `base_lr`.
#[derive(Debug, Clone, Copy)]
pub struct CosineAnnealing {
    pub base_lr: f64,
    pub eta_min: f64,
    pub t_max: usize,
}

impl CosineAnnealing {
    pub fn new(base_lr: f64, t_max: usize) -> Self {
        Self {
            base_lr,
            eta_min: 0.0,
            t_max,
        }
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        if self.t_max == 0 {
            return self.base_lr;
        }
        let phase = PI * step as f64 / self.t_max as f64;
        self.eta_min + 0.5 * (self.base_lr - self.eta_min) * (1.0 + phase.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_and_midpoint() {
        let sched = CosineAnnealing::new(1e-3, 100);
        assert!((sched.lr_at(0) - 1e-3).abs() < 1e-18);
        assert!((sched.lr_at(50) - 5e-4).abs() < 1e-15);
        assert!(sched.lr_at(100).abs() < 1e-15);
    }

    #[test]
    fn test_monotone_within_half_period() {
        let sched = CosineAnnealing::new(0.1, 40);
        for step in 0..40 {
            assert!(sched.lr_at(step + 1) <= sched.lr_at(step));
        }
    }

    #[test]
    fn test_zero_horizon_is_constant() {
        let sched = CosineAnnealing::new(0.2, 0);
        assert_eq!(sched.lr_at(7), 0.2);
    }
}
