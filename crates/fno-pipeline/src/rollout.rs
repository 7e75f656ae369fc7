// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Autoregressive Rollout
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Autoregressive rollout: the network's decoded output window becomes its
//! next input, extending predictions past the training horizon.
//!
//! Each [`Rollout`] owns its running prediction, so independent rollouts
//! never observe each other's state.

use crate::loss::{Loss, MseLoss};
use fno_core::network::Fno3d;
use fno_data::windowing::{replicate_along_channels, replicate_along_time, Transforms};
use fno_types::config::{FeedbackLayout, FnoConfig};
use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Array3, Array4, Array5, Axis};
use tracing::{debug, info};

/// One rollout step.
#[derive(Debug, Clone)]
pub struct RolloutWindow {
    /// Decoded latent prediction: (batch, W, H, T).
    pub latent: Array4<f64>,
    /// PCA-inverted prediction in physical space: (batch, T, n_features).
    pub physical: Array3<f64>,
}

/// Continuation of a rollout over known targets.
#[derive(Debug, Clone)]
pub struct RolloutReport {
    /// MSE of each predicted window against its target.
    pub window_mse: Vec<f64>,
    pub total_mse: f64,
    /// Square root of `total_mse`.
    pub root_total_mse: f64,
    pub windows: Vec<RolloutWindow>,
}

pub struct Rollout<'a> {
    transforms: &'a Transforms,
    width: usize,
    height: usize,
    window: usize,
    reencode_feedback: bool,
    layout: FeedbackLayout,
    pred: Option<Array4<f64>>,
}

impl<'a> Rollout<'a> {
    pub fn new(transforms: &'a Transforms, config: &FnoConfig) -> Self {
        Self {
            transforms,
            width: config.grid_width(),
            height: config.grid_height(),
            window: config.data.t,
            reencode_feedback: config.rollout.reencode_feedback,
            layout: config.rollout.feedback_layout,
            pred: None,
        }
    }

    /// Latest decoded prediction, if any step has run.
    pub fn prediction(&self) -> Option<&Array4<f64>> {
        self.pred.as_ref()
    }

    /// Forget the running prediction; the next step starts from its seed.
    pub fn reset(&mut self) {
        self.pred = None;
    }

    /// Next network input: the seed on the first step, afterwards the running
    /// prediction copied per [`FeedbackLayout`]. The default layout gives
    /// `in[b, x, y, t, c] = pred[b, x, y, t]`.
    fn next_input(&self, seed_input: &Array5<f64>) -> FnoResult<Array5<f64>> {
        let Some(pred) = &self.pred else {
            return Ok(seed_input.clone());
        };
        let encoded;
        let pred = if self.reencode_feedback {
            encoded = self.transforms.input_normalizer.encode(pred)?;
            &encoded
        } else {
            pred
        };
        Ok(match self.layout {
            FeedbackLayout::Channels => replicate_along_channels(pred),
            FeedbackLayout::Time => replicate_along_time(pred),
        })
    }

    pub fn step(&mut self, model: &Fno3d, seed_input: &Array5<f64>) -> FnoResult<RolloutWindow> {
        let input = self.next_input(seed_input)?;
        let out = model.forward(&input)?;
        let latent = out.index_axis_move(Axis(4), 0);
        let (batch, w, h, t) = latent.dim();
        if (w, h, t) != (self.width, self.height, self.window) {
            return Err(FnoError::ShapeMismatch(format!(
                "rollout expects {}x{}x{} windows, network produced {w}x{h}x{t}",
                self.width, self.height, self.window
            )));
        }
        let latent = self.transforms.target_normalizer.decode(&latent)?;

        let pca = &self.transforms.pca;
        let mut physical = Array3::zeros((batch, t, pca.n_features()));
        for (b, sample) in latent.axis_iter(Axis(0)).enumerate() {
            // (W, H, T) -> (W·H, T) row-major -> (T, W·H).
            let coeffs = sample
                .as_standard_layout()
                .into_owned()
                .into_shape((w * h, t))
                .map_err(|e| FnoError::ShapeMismatch(format!("window flatten failed: {e}")))?
                .reversed_axes();
            let fields = pca.inverse_transform(&coeffs.as_standard_layout().into_owned())?;
            physical.index_axis_mut(Axis(0), b).assign(&fields);
        }

        debug!(batch, "rollout step");
        self.pred = Some(latent.clone());
        Ok(RolloutWindow { latent, physical })
    }

    /// Advance `steps` windows; returns exactly `steps` predictions.
    pub fn run(
        &mut self,
        model: &Fno3d,
        seed_input: &Array5<f64>,
        steps: usize,
    ) -> FnoResult<Vec<RolloutWindow>> {
        let mut windows = Vec::with_capacity(steps);
        for _ in 0..steps {
            windows.push(self.step(model, seed_input)?);
        }
        info!(steps, "rollout finished");
        Ok(windows)
    }

    /// Continue the rollout once per target window (targets: (N, W, H, T),
    /// physical latent units), scoring each prediction by MSE.
    ///
    /// The seed is used only when no step has run yet.
    pub fn evaluate(
        &mut self,
        model: &Fno3d,
        seed_input: &Array5<f64>,
        targets: &Array4<f64>,
    ) -> FnoResult<RolloutReport> {
        let n = targets.len_of(Axis(0));
        let mut window_mse = Vec::with_capacity(n);
        let mut windows = Vec::with_capacity(n);
        for i in 0..n {
            let window = self.step(model, seed_input)?;
            let target = targets.slice(s![i..i + 1, .., .., ..]).to_owned();
            let mse = MseLoss.evaluate(&window.latent, &target)?;
            debug!(window = i, mse, "scored rollout window");
            window_mse.push(mse);
            windows.push(window);
        }
        let total_mse: f64 = window_mse.iter().sum();
        let root_total_mse = total_mse.sqrt();
        info!(windows = n, total_mse, root_total_mse, "rollout evaluated");
        Ok(RolloutReport {
            window_mse,
            total_mse,
            root_total_mse,
            windows,
        })
    }
}
