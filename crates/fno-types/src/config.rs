// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{FnoError, FnoResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level run configuration.
/// Every field is optional in JSON; omitted fields take the defaults below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FnoConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub rollout: RolloutConfig,
    #[serde(default)]
    pub artifacts: ArtifactConfig,
    /// Seed for every component that samples (parameter init, loader shuffling).
    #[serde(default)]
    pub seed: u64,
}

/// Dataset location, resolution and temporal windowing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,
    #[serde(default = "default_val_path")]
    pub val_path: PathBuf,
    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,
    /// Number of training windows.
    #[serde(default = "default_ntrain")]
    pub ntrain: usize,
    /// Number of test windows scored per evaluation.
    #[serde(default = "default_ntest")]
    pub ntest: usize,
    /// Spatial subsampling factor applied to the base resolution.
    #[serde(default = "default_sub")]
    pub sub: usize,
    /// Latent grid width before subsampling.
    #[serde(default = "default_base_extent")]
    pub base_width: usize,
    /// Latent grid height before subsampling.
    #[serde(default = "default_base_extent")]
    pub base_height: usize,
    /// Input window length (timesteps fed as channels).
    #[serde(default = "default_window")]
    pub t_in: usize,
    /// Output window length (temporal extent of every sample).
    #[serde(default = "default_window")]
    pub t: usize,
}

fn default_train_path() -> PathBuf {
    PathBuf::from("data/train_p.npy")
}
fn default_val_path() -> PathBuf {
    PathBuf::from("data/val_p.npy")
}
fn default_test_path() -> PathBuf {
    PathBuf::from("data/test_p.npy")
}
fn default_ntrain() -> usize {
    23
}
fn default_ntest() -> usize {
    400 / 13 + 1
}
fn default_sub() -> usize {
    1
}
fn default_base_extent() -> usize {
    24
}
fn default_window() -> usize {
    13
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            train_path: default_train_path(),
            val_path: default_val_path(),
            test_path: default_test_path(),
            ntrain: default_ntrain(),
            ntest: default_ntest(),
            sub: default_sub(),
            base_width: default_base_extent(),
            base_height: default_base_extent(),
            t_in: default_window(),
            t: default_window(),
        }
    }
}

/// Network hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Fourier modes retained per axis.
    #[serde(default = "default_modes")]
    pub modes: usize,
    /// Hidden channel width.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Number of Fourier layers.
    #[serde(default = "default_n_layers")]
    pub n_layers: usize,
    /// Zero padding appended to the temporal axis inside the network.
    #[serde(default = "default_padding")]
    pub padding: usize,
}

fn default_modes() -> usize {
    2
}
fn default_width() -> usize {
    2
}
fn default_n_layers() -> usize {
    4
}
fn default_padding() -> usize {
    6
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            modes: default_modes(),
            width: default_width(),
            n_layers: default_n_layers(),
            padding: default_padding(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
}

fn default_batch_size() -> usize {
    8
}
fn default_learning_rate() -> f64 {
    1e-4
}
fn default_weight_decay() -> f64 {
    1e-1
}
fn default_epochs() -> usize {
    3000
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            weight_decay: default_weight_decay(),
            epochs: default_epochs(),
        }
    }
}

/// Autoregressive inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Free-running windows generated per test window before evaluation.
    #[serde(default = "default_windows_per_test")]
    pub windows_per_test: usize,
    /// Re-encode fed-back predictions with the input normalizer.
    #[serde(default)]
    pub reencode_feedback: bool,
    /// Axis along which a predicted window is copied to form the next input.
    #[serde(default)]
    pub feedback_layout: FeedbackLayout,
}

/// How a predicted window (B, W, H, T) becomes a (B, W, H, T, T) input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLayout {
    /// Time stays on the t axis; T copies fill the channel axis.
    #[default]
    Channels,
    /// Window steps become channels, copied along t (training-input layout).
    Time,
}

fn default_windows_per_test() -> usize {
    2
}

impl Default for RolloutConfig {
    fn default() -> Self {
        RolloutConfig {
            windows_per_test: default_windows_per_test(),
            reencode_feedback: false,
            feedback_layout: FeedbackLayout::default(),
        }
    }
}

/// Where persisted artifacts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_pca_path")]
    pub pca_path: PathBuf,
    #[serde(default = "default_input_normalizer_path")]
    pub input_normalizer_path: PathBuf,
    #[serde(default = "default_target_normalizer_path")]
    pub target_normalizer_path: PathBuf,
    #[serde(default = "default_prediction_path")]
    pub prediction_path: PathBuf,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("model")
}
fn default_pca_path() -> PathBuf {
    PathBuf::from("pca.npz")
}
fn default_input_normalizer_path() -> PathBuf {
    PathBuf::from("unit_gaussian_normalizer.npz")
}
fn default_target_normalizer_path() -> PathBuf {
    PathBuf::from("target_normalizer.npz")
}
fn default_prediction_path() -> PathBuf {
    PathBuf::from("pred/pred.npz")
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        ArtifactConfig {
            model_dir: default_model_dir(),
            pca_path: default_pca_path(),
            input_normalizer_path: default_input_normalizer_path(),
            target_normalizer_path: default_target_normalizer_path(),
            prediction_path: default_prediction_path(),
        }
    }
}

impl FnoConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> FnoResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Latent grid width after subsampling.
    pub fn grid_width(&self) -> usize {
        self.data.base_width / self.data.sub.max(1)
    }

    /// Latent grid height after subsampling.
    pub fn grid_height(&self) -> usize {
        self.data.base_height / self.data.sub.max(1)
    }

    /// Number of PCA components kept: one per latent grid point.
    pub fn latent_size(&self) -> usize {
        self.grid_width() * self.grid_height()
    }

    /// Optimizer steps over the whole run (cosine schedule horizon).
    pub fn iterations(&self) -> usize {
        self.training.epochs * (self.data.ntrain / self.training.batch_size.max(1))
    }

    /// Run identifier encoding the hyperparameters, used to key artifact files.
    pub fn run_name(&self) -> String {
        format!(
            "ns_fourier_3d_N{}_ep{}_m{}_w{}_lr{}",
            self.data.ntrain,
            self.training.epochs,
            self.model.modes,
            self.model.width,
            self.training.learning_rate
        )
    }

    /// Path of the persisted network parameters for this run.
    pub fn model_path(&self) -> PathBuf {
        self.artifacts
            .model_dir
            .join(format!("{}.npz", self.run_name()))
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> FnoResult<()> {
        let d = &self.data;
        let m = &self.model;
        if d.t != d.t_in {
            return Err(FnoError::ConfigError(format!(
                "Output window t={} must equal input window t_in={}",
                d.t, d.t_in
            )));
        }
        if d.t == 0 {
            return Err(FnoError::ConfigError(
                "Temporal window must be non-empty".to_string(),
            ));
        }
        if d.sub == 0 || d.base_width % d.sub != 0 || d.base_height % d.sub != 0 {
            return Err(FnoError::ConfigError(format!(
                "Subsampling factor {} must divide base grid {}x{}",
                d.sub, d.base_width, d.base_height
            )));
        }
        if self.grid_width() == 0 || self.grid_height() == 0 {
            return Err(FnoError::ConfigError(
                "Latent grid must be non-empty".to_string(),
            ));
        }
        if m.width == 0 || m.n_layers == 0 || m.modes == 0 {
            return Err(FnoError::ConfigError(format!(
                "Invalid model shape width={}, n_layers={}, modes={}",
                m.width, m.n_layers, m.modes
            )));
        }
        let extents = [
            ("x", self.grid_width()),
            ("y", self.grid_height()),
            ("t", d.t + m.padding),
        ];
        for (axis, n) in extents {
            if m.modes > n / 2 + 1 {
                return Err(FnoError::ConfigError(format!(
                    "modes={} exceeds floor({n}/2)+1 along {axis}",
                    m.modes
                )));
            }
        }
        if self.training.batch_size == 0 {
            return Err(FnoError::ConfigError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if d.ntest == 0 {
            return Err(FnoError::ConfigError(
                "ntest must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
