// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Temporal Windowing
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Snapshot sequences to (input window, target window) tensors.
//!
//! A snapshot matrix (n_snapshots, n_features) is PCA-compressed to one
//! coefficient per latent grid point, cut into consecutive blocks of `T`
//! steps and split into alternating input/target windows. The transforms
//! fitted here are frozen and persisted for inference.

use crate::normalizer::UnitGaussianNormalizer;
use crate::pca::Pca;
use fno_types::config::{ArtifactConfig, FnoConfig};
use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Array2, Array4, Array5};
use tracing::info;

/// Paired windows, both shaped (samples, W, H, T).
#[derive(Debug, Clone)]
pub struct Windows {
    pub inputs: Array4<f64>,
    pub targets: Array4<f64>,
}

impl Windows {
    pub fn len(&self) -> usize {
        self.inputs.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Compress snapshots with a fitted PCA and cut them into windows.
///
/// Coefficients of the first `floor(n/T)·T` rows are laid out row-major as
/// (T, W, H, n/T); even entries of the last axis become inputs, odd ones
/// targets, and a trailing unpaired input is dropped.
pub fn preprocess(pca: &Pca, snapshots: &Array2<f64>, config: &FnoConfig) -> FnoResult<Windows> {
    let t = config.data.t;
    let (w, h) = (config.grid_width(), config.grid_height());
    let latent = w * h;
    if pca.n_components < latent {
        return Err(FnoError::ConfigError(format!(
            "PCA keeps {} components but the {w}x{h} latent grid needs {latent}",
            pca.n_components
        )));
    }
    if t == 0 || snapshots.nrows() < t {
        return Err(FnoError::ConfigError(format!(
            "{} snapshots cannot fill a window of T={t}",
            snapshots.nrows()
        )));
    }

    let coeffs = pca.transform(snapshots)?;
    let rows = coeffs.nrows() / t * t;
    let blocks = rows / t;
    let samples = blocks / 2;
    if samples == 0 {
        return Err(FnoError::ConfigError(format!(
            "{} snapshots form {blocks} block(s) of T={t}; an input/target pair needs two",
            snapshots.nrows()
        )));
    }

    let kept = coeffs
        .slice(s![..rows, ..latent])
        .as_standard_layout()
        .into_owned();
    let grid = kept
        .into_shape((t, w, h, blocks))
        .map_err(|e| FnoError::ShapeMismatch(format!("window reshape failed: {e}")))?;

    let to_samples = |view: ndarray::ArrayView4<f64>| {
        view.permuted_axes([3, 1, 2, 0])
            .as_standard_layout()
            .into_owned()
    };
    let inputs = to_samples(grid.slice(s![.., .., .., 0..2 * samples;2]));
    let targets = to_samples(grid.slice(s![.., .., .., 1..2 * samples;2]));

    info!(
        snapshots = snapshots.nrows(),
        samples,
        width = w,
        height = h,
        window = t,
        "windowed snapshots"
    );
    Ok(Windows { inputs, targets })
}

/// Repeat each (W, H) field across a new temporal axis: (S, W, H, T) to
/// (S, W, H, T, T) with `out[s, x, y, t, c] = a[s, x, y, c]`.
pub fn replicate_along_time(a: &Array4<f64>) -> Array5<f64> {
    let (s, w, h, t) = a.dim();
    Array5::from_shape_fn((s, w, h, t, t), |(i, x, y, _, c)| a[[i, x, y, c]])
}

/// Repeat each (W, H, T) window across a new channel axis: (B, W, H, T) to
/// (B, W, H, T, T) with `out[b, x, y, t, c] = a[b, x, y, t]`.
///
/// This is how a rollout feeds a predicted window back into the network.
pub fn replicate_along_channels(a: &Array4<f64>) -> Array5<f64> {
    let (b, w, h, t) = a.dim();
    Array5::from_shape_fn((b, w, h, t, t), |(i, x, y, k, _)| a[[i, x, y, k]])
}

/// The frozen PCA and normalizers shared by training and inference.
#[derive(Debug, Clone)]
pub struct Transforms {
    pub pca: Pca,
    pub input_normalizer: UnitGaussianNormalizer,
    pub target_normalizer: UnitGaussianNormalizer,
}

impl Transforms {
    /// Fit PCA (one component per latent grid point) and both normalizers on
    /// training snapshots.
    pub fn fit(train_snapshots: &Array2<f64>, config: &FnoConfig) -> FnoResult<Self> {
        let pca = Pca::fit(train_snapshots, config.latent_size())?;
        let windows = preprocess(&pca, train_snapshots, config)?;
        let input_normalizer = UnitGaussianNormalizer::fit(&windows.inputs)?;
        let target_normalizer = UnitGaussianNormalizer::fit(&windows.targets)?;
        Ok(Self {
            pca,
            input_normalizer,
            target_normalizer,
        })
    }

    /// All three artifacts present on disk.
    pub fn exists(artifacts: &ArtifactConfig) -> bool {
        artifacts.pca_path.exists()
            && artifacts.input_normalizer_path.exists()
            && artifacts.target_normalizer_path.exists()
    }

    pub fn save(&self, artifacts: &ArtifactConfig) -> FnoResult<()> {
        self.pca.save_npz(&artifacts.pca_path)?;
        self.input_normalizer
            .save_npz(&artifacts.input_normalizer_path)?;
        self.target_normalizer
            .save_npz(&artifacts.target_normalizer_path)
    }

    pub fn load(artifacts: &ArtifactConfig) -> FnoResult<Self> {
        Ok(Self {
            pca: Pca::load_npz(&artifacts.pca_path)?,
            input_normalizer: UnitGaussianNormalizer::load_npz(&artifacts.input_normalizer_path)?,
            target_normalizer: UnitGaussianNormalizer::load_npz(
                &artifacts.target_normalizer_path,
            )?,
        })
    }
}

/// Model-ready train/test tensors.
///
/// Inputs are encoded and replicated to (S, W, H, T, T); train targets are
/// encoded; test targets stay in physical latent units for evaluation.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub train_inputs: Array5<f64>,
    pub train_targets: Array4<f64>,
    pub test_inputs: Array5<f64>,
    pub test_targets: Array4<f64>,
}

impl Dataset {
    pub fn prepare(
        transforms: &Transforms,
        train_snapshots: &Array2<f64>,
        test_snapshots: &Array2<f64>,
        config: &FnoConfig,
    ) -> FnoResult<Self> {
        let train = preprocess(&transforms.pca, train_snapshots, config)?;
        let test = preprocess(&transforms.pca, test_snapshots, config)?;

        let (_, w, h, _) = train.targets.dim();
        if (w, h) != (config.grid_width(), config.grid_height()) {
            return Err(FnoError::ShapeMismatch(format!(
                "windowed grid {w}x{h} differs from configured {}x{}",
                config.grid_width(),
                config.grid_height()
            )));
        }

        let train_inputs = replicate_along_time(&transforms.input_normalizer.encode(&train.inputs)?);
        let train_targets = transforms.target_normalizer.encode(&train.targets)?;
        let test_inputs = replicate_along_time(&transforms.input_normalizer.encode(&test.inputs)?);

        info!(
            train_samples = train.len(),
            test_samples = test.len(),
            "prepared dataset"
        );
        Ok(Self {
            train_inputs,
            train_targets,
            test_inputs,
            test_targets: test.targets,
        })
    }

    pub fn n_train(&self) -> usize {
        self.train_inputs.dim().0
    }

    pub fn n_test(&self) -> usize {
        self.test_inputs.dim().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn small_config(t: usize) -> FnoConfig {
        let mut cfg = FnoConfig::default();
        cfg.data.base_width = 2;
        cfg.data.base_height = 2;
        cfg.data.sub = 1;
        cfg.data.t = t;
        cfg.data.t_in = t;
        cfg
    }

    fn snapshots(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen::<f64>())
    }

    #[test]
    fn test_window_layout_matches_row_major_split() {
        let cfg = small_config(3);
        // Identity-like PCA: 4 features, all 4 components kept.
        let x = snapshots(14, 4, 0);
        let pca = Pca::fit(&x, 4).unwrap();
        let windows = preprocess(&pca, &x, &cfg).unwrap();

        // 14 rows -> 12 kept -> 4 blocks -> 2 (input, target) pairs.
        assert_eq!(windows.inputs.dim(), (2, 2, 2, 3));
        assert_eq!(windows.targets.dim(), (2, 2, 2, 3));

        let coeffs = pca.transform(&x).unwrap();
        let flat: Vec<f64> = coeffs.slice(s![..12, ..4]).iter().copied().collect();
        // grid[t, i, j, b] = flat[((t * 2 + i) * 2 + j) * 4 + b]
        let grid = |t: usize, i: usize, j: usize, b: usize| flat[((t * 2 + i) * 2 + j) * 4 + b];
        for s_ in 0..2 {
            for i in 0..2 {
                for j in 0..2 {
                    for t in 0..3 {
                        assert_eq!(windows.inputs[[s_, i, j, t]], grid(t, i, j, 2 * s_));
                        assert_eq!(windows.targets[[s_, i, j, t]], grid(t, i, j, 2 * s_ + 1));
                    }
                }
            }
        }
    }

    #[test]
    fn test_trailing_unpaired_input_dropped() {
        let cfg = small_config(2);
        let x = snapshots(10, 4, 1);
        let pca = Pca::fit(&x, 4).unwrap();
        // 5 blocks: inputs 0, 2, 4 and targets 1, 3; block 4 is dropped.
        let windows = preprocess(&pca, &x, &cfg).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows.targets.dim().0, 2);
    }

    #[test]
    fn test_too_few_components_rejected() {
        let cfg = small_config(2);
        let x = snapshots(8, 4, 2);
        let pca = Pca::fit(&x, 3).unwrap();
        assert!(matches!(
            preprocess(&pca, &x, &cfg),
            Err(FnoError::ConfigError(_))
        ));
    }

    #[test]
    fn test_too_few_rows_rejected() {
        let cfg = small_config(5);
        let x = snapshots(4, 4, 3);
        let pca = Pca::fit(&x, 4).unwrap();
        assert!(preprocess(&pca, &x, &cfg).is_err());
    }

    #[test]
    fn test_replicate_along_time() {
        let a = Array4::from_shape_fn((2, 2, 3, 4), |(s_, i, j, c)| (s_ * 100 + i * 10 + j + c * 1000) as f64);
        let r = replicate_along_time(&a);
        assert_eq!(r.dim(), (2, 2, 3, 4, 4));
        for t in 0..4 {
            assert_eq!(r[[1, 1, 2, t, 3]], a[[1, 1, 2, 3]]);
        }
    }

    #[test]
    fn test_replicate_along_channels() {
        let a = Array4::from_shape_fn((1, 2, 2, 3), |(_, i, j, t)| (i * 100 + j * 10 + t) as f64);
        let r = replicate_along_channels(&a);
        assert_eq!(r.dim(), (1, 2, 2, 3, 3));
        for t in 0..3 {
            for c in 0..3 {
                assert_eq!(r[[0, 1, 0, t, c]], a[[0, 1, 0, t]]);
            }
        }
        // The two layouts are transposes of each other on the last two axes.
        let by_time = replicate_along_time(&a);
        assert_eq!(r.view().permuted_axes([0, 1, 2, 4, 3]), by_time.view());
    }

    #[test]
    fn test_dataset_prepare_shapes_and_encoding() {
        let cfg = small_config(2);
        let train = snapshots(16, 6, 4);
        let test = snapshots(8, 6, 5);
        let transforms = Transforms::fit(&train, &cfg).unwrap();
        let ds = Dataset::prepare(&transforms, &train, &test, &cfg).unwrap();

        assert_eq!(ds.train_inputs.dim(), (4, 2, 2, 2, 2));
        assert_eq!(ds.train_targets.dim(), (4, 2, 2, 2));
        assert_eq!(ds.test_inputs.dim(), (2, 2, 2, 2, 2));
        assert_eq!(ds.test_targets.dim(), (2, 2, 2, 2));

        // Test targets remain physical: they match the raw windowing.
        let raw = preprocess(&transforms.pca, &test, &cfg).unwrap();
        assert_eq!(ds.test_targets, raw.targets);

        // Encoded train targets decode back to the raw windows.
        let raw_train = preprocess(&transforms.pca, &train, &cfg).unwrap();
        let decoded = transforms.target_normalizer.decode(&ds.train_targets).unwrap();
        for (a, b) in decoded.iter().zip(raw_train.targets.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_transforms_persist() {
        let cfg = small_config(2);
        let train = snapshots(12, 5, 6);
        let transforms = Transforms::fit(&train, &cfg).unwrap();

        let dir = std::env::temp_dir().join(format!("fno_transforms_{}", std::process::id()));
        let artifacts = ArtifactConfig {
            pca_path: dir.join("pca.npz"),
            input_normalizer_path: dir.join("in.npz"),
            target_normalizer_path: dir.join("out.npz"),
            ..ArtifactConfig::default()
        };
        assert!(!Transforms::exists(&artifacts));
        transforms.save(&artifacts).unwrap();
        assert!(Transforms::exists(&artifacts));

        let loaded = Transforms::load(&artifacts).unwrap();
        let a = preprocess(&transforms.pca, &train, &cfg).unwrap();
        let b = preprocess(&loaded.pca, &train, &cfg).unwrap();
        assert_eq!(a.inputs, b.inputs);
        assert_eq!(loaded.input_normalizer.mean, transforms.input_normalizer.mean);

        std::fs::remove_dir_all(dir).ok();
    }
}
