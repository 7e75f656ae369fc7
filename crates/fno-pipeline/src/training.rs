//! Training loop around an external optimizer.
//!
//! Gradients and parameter updates are the [`Optimizer`]'s business; this
//! module owns epoch iteration, the learning-rate schedule, test evaluation
//! and checkpointing of the best model.

use crate::loss::{Loss, MseLoss};
use crate::schedule::CosineAnnealing;
use fno_core::network::Fno3d;
use fno_data::loader::{Batch, DataLoader};
use fno_data::windowing::{Dataset, Transforms};
use fno_types::config::FnoConfig;
use fno_types::error::{FnoError, FnoResult};
use ndarray::{s, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

/// Hyperparameters handed to the optimizer for a single update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Scheduled learning rate for this step.
    pub learning_rate: f64,
    /// Decoupled (AdamW-style) weight decay coefficient.
    pub weight_decay: f64,
}

/// One parameter update on a batch of encoded inputs/targets.
pub trait Optimizer {
    /// Returns the training loss of `batch` before the update.
    fn step(&mut self, model: &mut Fno3d, batch: &Batch, params: &StepParams) -> FnoResult<f64>;
}

/// Tracks the lowest test MSE seen.
#[derive(Debug, Clone, Default)]
pub struct CheckpointTracker {
    best: Option<f64>,
}

impl CheckpointTracker {
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    /// Record `test_mse`; true when it strictly improves on the best so far.
    pub fn update(&mut self, test_mse: f64) -> bool {
        let improved = match self.best {
            None => test_mse.is_finite(),
            Some(best) => test_mse < best,
        };
        if improved {
            self.best = Some(test_mse);
        }
        improved
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    pub epoch: usize,
    /// Mean optimizer loss over the epoch's batches.
    pub train_mse: f64,
    /// Summed per-batch MSE of decoded predictions, divided by scored test windows.
    pub test_mse: f64,
    pub learning_rate: f64,
    pub improved: bool,
}

pub struct Trainer<'a, O: Optimizer> {
    config: &'a FnoConfig,
    transforms: &'a Transforms,
    optimizer: O,
    schedule: CosineAnnealing,
    tracker: CheckpointTracker,
    checkpoint_path: PathBuf,
    step: usize,
}

impl<'a, O: Optimizer> Trainer<'a, O> {
    pub fn new(config: &'a FnoConfig, transforms: &'a Transforms, optimizer: O) -> Self {
        Self {
            config,
            transforms,
            optimizer,
            schedule: CosineAnnealing::new(config.training.learning_rate, config.iterations()),
            tracker: CheckpointTracker::default(),
            checkpoint_path: config.model_path(),
            step: 0,
        }
    }

    pub fn tracker(&self) -> &CheckpointTracker {
        &self.tracker
    }

    pub fn into_optimizer(self) -> O {
        self.optimizer
    }

    /// Test MSE of decoded predictions against physical targets.
    ///
    /// Scores the first `data.ntest` test windows (fewer if the dataset is
    /// shorter) and divides the summed batch MSE by that count.
    pub fn evaluate(&self, model: &Fno3d, dataset: &Dataset) -> FnoResult<f64> {
        let n = self.config.data.ntest.min(dataset.n_test());
        if n == 0 {
            return Err(FnoError::ConfigError(
                "no test windows to evaluate".to_string(),
            ));
        }
        let inputs = dataset.test_inputs.slice(s![..n, .., .., .., ..]).to_owned();
        let targets = dataset.test_targets.slice(s![..n, .., .., ..]).to_owned();
        let loader = DataLoader::new(&inputs, &targets, self.config.training.batch_size)?;
        let mut total = 0.0;
        for batch in loader.iter() {
            let out = model.forward(&batch.inputs)?.index_axis_move(Axis(4), 0);
            let decoded = self.transforms.target_normalizer.decode(&out)?;
            total += MseLoss.evaluate(&decoded, &batch.targets)?;
        }
        Ok(total / n as f64)
    }

    /// [`Trainer::fit`] with loader shuffling seeded from `config.seed`.
    pub fn fit_seeded(
        &mut self,
        model: &mut Fno3d,
        dataset: &Dataset,
    ) -> FnoResult<Vec<EpochReport>> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        self.fit(model, dataset, &mut rng)
    }

    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        model: &mut Fno3d,
        dataset: &Dataset,
        rng: &mut R,
    ) -> FnoResult<Vec<EpochReport>> {
        let mut loader = DataLoader::new(
            &dataset.train_inputs,
            &dataset.train_targets,
            self.config.training.batch_size,
        )?;
        let mut reports = Vec::with_capacity(self.config.training.epochs);
        for epoch in 0..self.config.training.epochs {
            loader.shuffle(rng);
            let mut train_total = 0.0;
            let mut lr = self.schedule.lr_at(self.step);
            for batch in loader.iter() {
                lr = self.schedule.lr_at(self.step);
                let params = StepParams {
                    learning_rate: lr,
                    weight_decay: self.config.training.weight_decay,
                };
                train_total += self.optimizer.step(model, &batch, &params)?;
                self.step += 1;
            }
            let train_mse = train_total / loader.n_batches().max(1) as f64;
            let test_mse = self.evaluate(model, dataset)?;

            let improved = self.tracker.update(test_mse);
            if improved {
                model.save_npz(&self.checkpoint_path)?;
            }
            info!(epoch, train_mse, test_mse, lr, improved, "epoch finished");
            reports.push(EpochReport {
                epoch,
                train_mse,
                test_mse,
                learning_rate: lr,
                improved,
            });
        }
        Ok(reports)
    }
}
