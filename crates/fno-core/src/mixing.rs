//! Feature mixing block: two pointwise maps with GELU in between.

use crate::pointwise::Pointwise;
use fno_math::activation::gelu;
use fno_types::error::{FnoError, FnoResult};
use ndarray::Array5;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct FeatureMixing {
    /// in_channels -> mid_channels.
    pub expand: Pointwise,
    /// mid_channels -> out_channels.
    pub project: Pointwise,
}

impl FeatureMixing {
    pub fn random<R: Rng + ?Sized>(
        in_channels: usize,
        out_channels: usize,
        mid_channels: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            expand: Pointwise::random(in_channels, mid_channels, rng),
            project: Pointwise::random(mid_channels, out_channels, rng),
        }
    }

    pub fn from_parts(expand: Pointwise, project: Pointwise) -> FnoResult<Self> {
        if expand.out_channels() != project.in_channels() {
            return Err(FnoError::ConfigError(format!(
                "Feature mixing hidden width mismatch: expand out={}, project in={}",
                expand.out_channels(),
                project.in_channels()
            )));
        }
        Ok(Self { expand, project })
    }

    pub fn in_channels(&self) -> usize {
        self.expand.in_channels()
    }

    pub fn mid_channels(&self) -> usize {
        self.expand.out_channels()
    }

    pub fn out_channels(&self) -> usize {
        self.project.out_channels()
    }

    pub fn parameter_count(&self) -> usize {
        self.expand.parameter_count() + self.project.parameter_count()
    }

    pub fn forward(&self, x: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let mut hidden = self.expand.forward(x)?;
        hidden.mapv_inplace(gelu);
        self.project.forward(&hidden)
    }
}
