//! Pointwise (1×1×1) linear map over the channel axis.

use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Array1, Array2, Array5};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

#[derive(Debug, Clone)]
pub struct Pointwise {
    /// Weight matrix: [out_channels, in_channels].
    pub weight: Array2<f64>,
    /// Bias: [out_channels].
    pub bias: Array1<f64>,
}

impl Pointwise {
    /// Uniform init in ±1/sqrt(in_channels) for weight and bias.
    pub fn random<R: Rng + ?Sized>(in_channels: usize, out_channels: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_channels.max(1) as f64).sqrt();
        let dist = Uniform::new(-bound, bound);
        let weight = Array2::from_shape_fn((out_channels, in_channels), |_| dist.sample(rng));
        let bias = Array1::from_shape_fn(out_channels, |_| dist.sample(rng));
        Self { weight, bias }
    }

    pub fn from_parts(weight: Array2<f64>, bias: Array1<f64>) -> FnoResult<Self> {
        if bias.len() != weight.nrows() {
            return Err(FnoError::ConfigError(format!(
                "Pointwise bias length {} does not match weight rows {}",
                bias.len(),
                weight.nrows()
            )));
        }
        Ok(Self { weight, bias })
    }

    pub fn identity(channels: usize) -> Self {
        Self {
            weight: Array2::eye(channels),
            bias: Array1::zeros(channels),
        }
    }

    pub fn in_channels(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_channels(&self) -> usize {
        self.weight.nrows()
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }

    /// Apply to a channel-first tensor (batch, in_channels, x, y, t).
    pub fn forward(&self, x: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let (batch, c_in, nx, ny, nt) = x.dim();
        if c_in != self.in_channels() {
            return Err(FnoError::ShapeMismatch(format!(
                "Pointwise expects {} input channels, got {c_in}",
                self.in_channels()
            )));
        }
        let c_out = self.out_channels();
        let mut out = Array5::zeros((batch, c_out, nx, ny, nt));
        for b in 0..batch {
            for o in 0..c_out {
                let mut dst = out.slice_mut(s![b, o, .., .., ..]);
                dst.fill(self.bias[o]);
                for i in 0..c_in {
                    dst.scaled_add(self.weight[[o, i]], &x.slice(s![b, i, .., .., ..]));
                }
            }
        }
        Ok(out)
    }
}
