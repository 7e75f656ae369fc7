//! Per-point unit-Gaussian normalization fitted over the sample axis.
//!
//! Statistics are taken over axis 0 of the training tensor; every later
//! tensor whose trailing shape matches is encoded with the same frozen
//! mean and standard deviation.

use fno_types::archive::{ArchiveReader, ArchiveWriter};
use fno_types::constants::NORMALIZER_EPS;
use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array, ArrayD, Axis, Dimension, IxDyn, RemoveAxis, Zip};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct UnitGaussianNormalizer {
    pub mean: ArrayD<f64>,
    pub std: ArrayD<f64>,
    pub eps: f64,
}

impl UnitGaussianNormalizer {
    /// Fit mean and sample standard deviation (ddof = 1) along axis 0.
    ///
    /// A single sample yields a zero deviation, leaving `eps` as the scale.
    pub fn fit<D>(x: &Array<f64, D>) -> FnoResult<Self>
    where
        D: Dimension + RemoveAxis,
    {
        let n = x.len_of(Axis(0));
        if n == 0 {
            return Err(FnoError::ConfigError(
                "Normalizer fit requires at least one sample".to_string(),
            ));
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(FnoError::ConfigError(
                "Normalizer fit received non-finite values".to_string(),
            ));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| FnoError::ConfigError("Normalizer fit on empty axis".to_string()))?
            .into_dyn();
        let std = if n > 1 {
            x.std_axis(Axis(0), 1.0).into_dyn()
        } else {
            ArrayD::zeros(mean.raw_dim())
        };
        info!(samples = n, shape = ?mean.shape(), "fitted normalizer");
        Ok(Self {
            mean,
            std,
            eps: NORMALIZER_EPS,
        })
    }

    /// Shape of one sample, i.e. the fitted statistics.
    pub fn sample_shape(&self) -> &[usize] {
        self.mean.shape()
    }

    /// `(x - mean) / (std + eps)`.
    pub fn encode<D: Dimension>(&self, x: &Array<f64, D>) -> FnoResult<Array<f64, D>> {
        let eps = self.eps;
        self.apply(x, |v, m, s| (v - m) / (s + eps))
    }

    /// `x * (std + eps) + mean`.
    pub fn decode<D: Dimension>(&self, x: &Array<f64, D>) -> FnoResult<Array<f64, D>> {
        let eps = self.eps;
        self.apply(x, |v, m, s| v * (s + eps) + m)
    }

    fn apply<D, F>(&self, x: &Array<f64, D>, f: F) -> FnoResult<Array<f64, D>>
    where
        D: Dimension,
        F: Fn(f64, f64, f64) -> f64,
    {
        let mismatch = || {
            FnoError::ShapeMismatch(format!(
                "Normalizer fitted on sample shape {:?} cannot broadcast to {:?}",
                self.mean.shape(),
                x.shape()
            ))
        };
        let mean = self.mean.broadcast(x.raw_dim()).ok_or_else(mismatch)?;
        let std = self.std.broadcast(x.raw_dim()).ok_or_else(mismatch)?;
        Ok(Zip::from(x)
            .and(&mean)
            .and(&std)
            .map_collect(|&v, &m, &s| f(v, m, s)))
    }

    pub fn save_npz(&self, path: &Path) -> FnoResult<()> {
        let mut npz = ArchiveWriter::create(path)?;
        npz.array("mean", &self.mean)?;
        npz.array("std", &self.std)?;
        npz.scalar_f64("eps", self.eps)?;
        npz.finish()?;
        info!(path = %path.display(), "saved normalizer");
        Ok(())
    }

    pub fn load_npz(path: &Path) -> FnoResult<Self> {
        let mut npz = ArchiveReader::open(path)?;
        let mean = npz.array::<IxDyn>("mean")?;
        let std = npz.array::<IxDyn>("std")?;
        let eps = npz.scalar_f64("eps")?;
        if mean.shape() != std.shape() {
            return Err(FnoError::ConfigError(format!(
                "Normalizer archive '{}' has mean {:?} but std {:?}",
                npz.path(),
                mean.shape(),
                std.shape()
            )));
        }
        info!(path = %path.display(), shape = ?mean.shape(), "loaded normalizer");
        Ok(Self { mean, std, eps })
    }
}
