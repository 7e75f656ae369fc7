//! Network parameter persistence as a NumPy `.npz` archive.
//!
//! Layout:
//! - `in_channels`, `width`, `n_layers`, `padding`, `modes1..3` (scalars)
//! - `lift_w` [width, in+3], `lift_b` [width]
//! - `layer{i}_spectral_{ll,hl,lh,hh}_re/_im` [width, width, m1, m2, m3]
//! - `layer{i}_mlp1_w/_b`, `layer{i}_mlp2_w/_b`, `layer{i}_skip_w/_b`
//! - `head_mlp1_w/_b`, `head_mlp2_w/_b`

use crate::mixing::FeatureMixing;
use crate::network::{Fno3d, FourierLayer, NetworkShape};
use crate::pointwise::Pointwise;
use crate::spectral::{Corner, CornerWeights, SpectralConv3d};
use fno_types::archive::{ArchiveReader, ArchiveWriter};
use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array5, Ix1, Ix2, Ix5, Zip};
use num_complex::Complex64;
use std::path::Path;
use tracing::info;

impl Fno3d {
    pub fn save_npz(&self, path: &Path) -> FnoResult<()> {
        let shape = self.shape();
        let mut npz = ArchiveWriter::create(path)?;
        npz.scalar_usize("in_channels", shape.in_channels)?;
        npz.scalar_usize("width", shape.width)?;
        npz.scalar_usize("n_layers", shape.n_layers)?;
        npz.scalar_usize("padding", shape.padding)?;
        for (i, m) in shape.modes.iter().enumerate() {
            npz.scalar_usize(&format!("modes{}", i + 1), *m)?;
        }

        write_pointwise(&mut npz, "lift", self.lift())?;
        for (i, layer) in self.layers().iter().enumerate() {
            for cw in layer.spectral.corners() {
                let key = format!("layer{i}_spectral_{}", cw.corner.tag());
                npz.array(&format!("{key}_re"), &cw.weights.mapv(|c| c.re))?;
                npz.array(&format!("{key}_im"), &cw.weights.mapv(|c| c.im))?;
            }
            write_pointwise(&mut npz, &format!("layer{i}_mlp1"), &layer.mixer.expand)?;
            write_pointwise(&mut npz, &format!("layer{i}_mlp2"), &layer.mixer.project)?;
            write_pointwise(&mut npz, &format!("layer{i}_skip"), &layer.skip)?;
        }
        write_pointwise(&mut npz, "head_mlp1", &self.head().expand)?;
        write_pointwise(&mut npz, "head_mlp2", &self.head().project)?;
        npz.finish()?;

        info!(path = %path.display(), parameters = self.parameter_count(), "saved network");
        Ok(())
    }

    pub fn load_npz(path: &Path) -> FnoResult<Self> {
        let mut npz = ArchiveReader::open(path)?;
        let shape = NetworkShape {
            in_channels: npz.scalar_usize("in_channels")?,
            width: npz.scalar_usize("width")?,
            n_layers: npz.scalar_usize("n_layers")?,
            padding: npz.scalar_usize("padding")?,
            modes: [
                npz.scalar_usize("modes1")?,
                npz.scalar_usize("modes2")?,
                npz.scalar_usize("modes3")?,
            ],
        };

        let lift = read_pointwise(&mut npz, "lift")?;
        let mut layers = Vec::with_capacity(shape.n_layers);
        for i in 0..shape.n_layers {
            let mut corners = Vec::with_capacity(Corner::ALL.len());
            for corner in Corner::ALL {
                let key = format!("layer{i}_spectral_{}", corner.tag());
                let re = npz.array::<Ix5>(&format!("{key}_re"))?;
                let im = npz.array::<Ix5>(&format!("{key}_im"))?;
                corners.push(CornerWeights {
                    corner,
                    weights: complex_from_parts(&re, &im, &key)?,
                });
            }
            let spectral = SpectralConv3d::from_corners(shape.width, shape.width, shape.modes, corners)?;
            let mixer = FeatureMixing::from_parts(
                read_pointwise(&mut npz, &format!("layer{i}_mlp1"))?,
                read_pointwise(&mut npz, &format!("layer{i}_mlp2"))?,
            )?;
            let skip = read_pointwise(&mut npz, &format!("layer{i}_skip"))?;
            layers.push(FourierLayer {
                spectral,
                mixer,
                skip,
            });
        }
        let head = FeatureMixing::from_parts(
            read_pointwise(&mut npz, "head_mlp1")?,
            read_pointwise(&mut npz, "head_mlp2")?,
        )?;

        let net = Fno3d::from_parts(shape, lift, layers, head)?;
        info!(path = %path.display(), parameters = net.parameter_count(), "loaded network");
        Ok(net)
    }
}

fn write_pointwise(npz: &mut ArchiveWriter, key: &str, layer: &Pointwise) -> FnoResult<()> {
    npz.array(&format!("{key}_w"), &layer.weight)?;
    npz.array(&format!("{key}_b"), &layer.bias)
}

fn read_pointwise(npz: &mut ArchiveReader, key: &str) -> FnoResult<Pointwise> {
    let weight = npz.array::<Ix2>(&format!("{key}_w"))?;
    let bias = npz.array::<Ix1>(&format!("{key}_b"))?;
    Pointwise::from_parts(weight, bias)
}

fn complex_from_parts(re: &Array5<f64>, im: &Array5<f64>, key: &str) -> FnoResult<Array5<Complex64>> {
    if re.dim() != im.dim() {
        return Err(FnoError::ConfigError(format!(
            "{key}: real part {:?} and imaginary part {:?} differ in shape",
            re.dim(),
            im.dim()
        )));
    }
    Ok(Zip::from(re).and(im).map_collect(|&r, &i| Complex64::new(r, i)))
}
