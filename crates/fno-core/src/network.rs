//! 3D Fourier neural operator: lift, Fourier layers, projection head.
//!
//! Input:  (batch, x, y, t, in_channels), e.g. the first `t_in` timesteps of
//!         each latent grid point replicated along t.
//! Output: (batch, x, y, t, 1).

use crate::mixing::FeatureMixing;
use crate::pointwise::Pointwise;
use crate::spectral::SpectralConv3d;
use fno_math::activation::gelu;
use fno_types::config::FnoConfig;
use fno_types::constants::{GRID_CHANNELS, PROJECTION_EXPANSION};
use fno_types::error::{FnoError, FnoResult};
use ndarray::{concatenate, s, Array1, Array5, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Architecture hyperparameters fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkShape {
    /// Channels of the raw input, before coordinate channels are appended.
    pub in_channels: usize,
    /// Hidden channel width.
    pub width: usize,
    pub modes: [usize; 3],
    pub n_layers: usize,
    /// Zero padding appended to the temporal axis.
    pub padding: usize,
}

impl NetworkShape {
    pub fn from_config(config: &FnoConfig) -> Self {
        let m = config.model.modes;
        Self {
            in_channels: config.data.t_in,
            width: config.model.width,
            modes: [m, m, m],
            n_layers: config.model.n_layers,
            padding: config.model.padding,
        }
    }
}

/// One repetition: spectral block -> feature mixing, plus a pointwise skip.
#[derive(Debug, Clone)]
pub struct FourierLayer {
    pub spectral: SpectralConv3d,
    pub mixer: FeatureMixing,
    pub skip: Pointwise,
}

impl FourierLayer {
    pub fn random<R: Rng + ?Sized>(width: usize, modes: [usize; 3], rng: &mut R) -> Self {
        Self {
            spectral: SpectralConv3d::random(width, width, modes, rng),
            mixer: FeatureMixing::random(width, width, width, rng),
            skip: Pointwise::random(width, width, rng),
        }
    }

    fn parameter_count(&self) -> usize {
        self.spectral.parameter_count() + self.mixer.parameter_count() + self.skip.parameter_count()
    }

    fn forward(&self, h: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let mut out = self.mixer.forward(&self.spectral.forward(h)?)?;
        out += &self.skip.forward(h)?;
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct Fno3d {
    shape: NetworkShape,
    lift: Pointwise,
    layers: Vec<FourierLayer>,
    head: FeatureMixing,
}

impl Fno3d {
    /// Fresh parameters drawn from a caller-seeded RNG.
    pub fn random<R: Rng + ?Sized>(shape: NetworkShape, rng: &mut R) -> Self {
        let lift = Pointwise::random(shape.in_channels + GRID_CHANNELS, shape.width, rng);
        let layers = (0..shape.n_layers)
            .map(|_| FourierLayer::random(shape.width, shape.modes, rng))
            .collect();
        let head = FeatureMixing::random(shape.width, 1, shape.width * PROJECTION_EXPANSION, rng);
        Self {
            shape,
            lift,
            layers,
            head,
        }
    }

    /// Fresh parameters for `config`, drawn from an RNG seeded with `config.seed`.
    pub fn seeded(config: &FnoConfig) -> Self {
        Self::random(
            NetworkShape::from_config(config),
            &mut StdRng::seed_from_u64(config.seed),
        )
    }

    /// Assemble from explicit parameters, validating every shape against `shape`.
    pub fn from_parts(
        shape: NetworkShape,
        lift: Pointwise,
        layers: Vec<FourierLayer>,
        head: FeatureMixing,
    ) -> FnoResult<Self> {
        let w = shape.width;
        if lift.in_channels() != shape.in_channels + GRID_CHANNELS || lift.out_channels() != w {
            return Err(FnoError::ConfigError(format!(
                "Invalid lift shape {:?}, expected ({w}, {})",
                lift.weight.dim(),
                shape.in_channels + GRID_CHANNELS
            )));
        }
        if layers.len() != shape.n_layers {
            return Err(FnoError::ConfigError(format!(
                "Layer count mismatch: got {}, expected {}",
                layers.len(),
                shape.n_layers
            )));
        }
        for (i, layer) in layers.iter().enumerate() {
            let spectral = &layer.spectral;
            if spectral.in_channels() != w
                || spectral.out_channels() != w
                || spectral.modes() != shape.modes
            {
                return Err(FnoError::ConfigError(format!(
                    "Layer {i} spectral shape mismatch: {}->{} modes {:?}, expected {w}->{w} modes {:?}",
                    spectral.in_channels(),
                    spectral.out_channels(),
                    spectral.modes(),
                    shape.modes
                )));
            }
            if layer.mixer.in_channels() != w || layer.mixer.out_channels() != w {
                return Err(FnoError::ConfigError(format!(
                    "Layer {i} mixer shape mismatch: {}->{}, expected {w}->{w}",
                    layer.mixer.in_channels(),
                    layer.mixer.out_channels()
                )));
            }
            if layer.skip.in_channels() != w || layer.skip.out_channels() != w {
                return Err(FnoError::ConfigError(format!(
                    "Layer {i} skip shape mismatch: {:?}, expected ({w}, {w})",
                    layer.skip.weight.dim()
                )));
            }
        }
        if head.in_channels() != w || head.out_channels() != 1 {
            return Err(FnoError::ConfigError(format!(
                "Invalid head shape {}->{}, expected {w}->1",
                head.in_channels(),
                head.out_channels()
            )));
        }
        Ok(Self {
            shape,
            lift,
            layers,
            head,
        })
    }

    pub fn shape(&self) -> &NetworkShape {
        &self.shape
    }

    pub fn lift(&self) -> &Pointwise {
        &self.lift
    }

    pub fn layers(&self) -> &[FourierLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [FourierLayer] {
        &mut self.layers
    }

    pub fn head(&self) -> &FeatureMixing {
        &self.head
    }

    /// Learnable scalars; complex spectral weights count twice.
    pub fn parameter_count(&self) -> usize {
        self.lift.parameter_count()
            + self.layers.iter().map(FourierLayer::parameter_count).sum::<usize>()
            + self.head.parameter_count()
    }

    /// (batch, x, y, t, in_channels) -> (batch, x, y, t, 1).
    pub fn forward(&self, x: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let (batch, nx, ny, nt, channels) = x.dim();
        if channels != self.shape.in_channels {
            return Err(FnoError::ShapeMismatch(format!(
                "Network expects {} input channels, got {channels}",
                self.shape.in_channels
            )));
        }

        let grid = coordinate_grid(batch, nx, ny, nt);
        let input = concatenate(Axis(4), &[x.view(), grid.view()])
            .map_err(|e| FnoError::ShapeMismatch(format!("Grid concatenation failed: {e}")))?;
        let input = input
            .permuted_axes([0, 4, 1, 2, 3])
            .as_standard_layout()
            .into_owned();

        let mut h = self.lift.forward(&input)?;
        let pad = self.shape.padding;
        if pad > 0 {
            let mut padded = Array5::zeros((batch, self.shape.width, nx, ny, nt + pad));
            padded.slice_mut(s![.., .., .., .., ..nt]).assign(&h);
            h = padded;
        }
        debug!(shape = ?h.dim(), "lifted and padded");

        let n_layers = self.layers.len();
        for (idx, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if idx + 1 < n_layers {
                h.mapv_inplace(gelu);
            }
        }

        let h = h.slice(s![.., .., .., .., ..nt]).to_owned();
        let out = self.head.forward(&h)?;
        debug!(shape = ?out.dim(), "projected");
        Ok(out
            .permuted_axes([0, 2, 3, 4, 1])
            .as_standard_layout()
            .into_owned())
    }
}

/// Normalized coordinates in [0, 1] along x, y, t, broadcast over batch:
/// shape (batch, nx, ny, nt, 3).
pub fn coordinate_grid(batch: usize, nx: usize, ny: usize, nt: usize) -> Array5<f64> {
    let gx = unit_linspace(nx);
    let gy = unit_linspace(ny);
    let gt = unit_linspace(nt);
    Array5::from_shape_fn((batch, nx, ny, nt, GRID_CHANNELS), |(_, i, j, k, c)| match c {
        0 => gx[i],
        1 => gy[j],
        _ => gt[k],
    })
}

fn unit_linspace(n: usize) -> Array1<f64> {
    if n <= 1 {
        Array1::zeros(n)
    } else {
        Array1::linspace(0.0, 1.0, n)
    }
}
