//! Losses between predicted and target windows.

use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array, Axis, Dimension, RemoveAxis};

/// A scalar discrepancy between equally shaped tensors.
pub trait Loss {
    fn evaluate<D>(&self, pred: &Array<f64, D>, target: &Array<f64, D>) -> FnoResult<f64>
    where
        D: Dimension + RemoveAxis;
}

fn check_shapes<D: Dimension>(pred: &Array<f64, D>, target: &Array<f64, D>) -> FnoResult<()> {
    if pred.shape() != target.shape() {
        return Err(FnoError::ShapeMismatch(format!(
            "prediction {:?} vs target {:?}",
            pred.shape(),
            target.shape()
        )));
    }
    if pred.is_empty() {
        return Err(FnoError::ShapeMismatch(
            "loss of an empty tensor".to_string(),
        ));
    }
    Ok(())
}

/// Mean squared error over every element.
#[derive(Debug, Clone, Copy, Default)]
pub struct MseLoss;

impl Loss for MseLoss {
    fn evaluate<D>(&self, pred: &Array<f64, D>, target: &Array<f64, D>) -> FnoResult<f64>
    where
        D: Dimension + RemoveAxis,
    {
        check_shapes(pred, target)?;
        let sum: f64 = pred
            .iter()
            .zip(target.iter())
            .map(|(p, t)| (p - t) * (p - t))
            .sum();
        Ok(sum / pred.len() as f64)
    }
}

/// Relative L2 error per sample (axis 0), summed over the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeL2Loss;

impl Loss for RelativeL2Loss {
    fn evaluate<D>(&self, pred: &Array<f64, D>, target: &Array<f64, D>) -> FnoResult<f64>
    where
        D: Dimension + RemoveAxis,
    {
        check_shapes(pred, target)?;
        let mut total = 0.0;
        for (p, t) in pred.axis_iter(Axis(0)).zip(target.axis_iter(Axis(0))) {
            let diff: f64 = p
                .iter()
                .zip(t.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            let norm: f64 = t.iter().map(|v| v * v).sum::<f64>().sqrt();
            total += if norm > 0.0 { diff / norm } else { diff };
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    #[test]
    fn test_mse_known_value() {
        let p = array![[1.0, 2.0], [3.0, 4.0]];
        let t = array![[1.0, 0.0], [3.0, 0.0]];
        assert!((MseLoss.evaluate(&p, &t).unwrap() - 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_relative_l2_sums_over_samples() {
        let t = array![[3.0, 4.0], [0.0, 2.0]];
        let p = array![[3.0, 9.0], [0.0, 1.0]];
        // Sample 0: 5/5 = 1, sample 1: 1/2.
        assert!((RelativeL2Loss.evaluate(&p, &t).unwrap() - 1.5).abs() < 1e-15);
    }

    #[test]
    fn test_zero_loss_on_identical() {
        let x = Array4::from_shape_fn((2, 2, 2, 3), |(a, b, c, d)| (a + b * c + d) as f64 + 0.5);
        assert_eq!(MseLoss.evaluate(&x, &x).unwrap(), 0.0);
        assert_eq!(RelativeL2Loss.evaluate(&x, &x).unwrap(), 0.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = Array4::<f64>::zeros((1, 2, 2, 2));
        let b = Array4::<f64>::zeros((1, 2, 2, 3));
        assert!(matches!(
            MseLoss.evaluate(&a, &b),
            Err(FnoError::ShapeMismatch(_))
        ));
    }
}
