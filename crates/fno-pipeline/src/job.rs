//! End-to-end inference job: snapshots in, rolled-out predictions out.

use crate::rollout::{Rollout, RolloutReport, RolloutWindow};
use fno_core::network::Fno3d;
use fno_data::windowing::{Dataset, Transforms};
use fno_types::archive::ArchiveWriter;
use fno_types::config::FnoConfig;
use fno_types::error::{FnoError, FnoResult};
use ndarray::{concatenate, s, Array2, Axis};
use ndarray_npy::read_npy;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InferenceSummary {
    /// Windows produced by the free rollout before evaluation.
    pub rollout_windows: usize,
    pub report: RolloutReport,
}

/// Snapshot matrix (n_snapshots, n_features) from a `.npy` file.
pub fn load_snapshots(path: &Path) -> FnoResult<Array2<f64>> {
    let data: Array2<f64> = read_npy(path).map_err(|e| FnoError::Artifact {
        path: path.display().to_string(),
        message: format!("cannot read snapshot matrix: {e}"),
    })?;
    info!(path = %path.display(), rows = data.nrows(), cols = data.ncols(), "loaded snapshots");
    Ok(data)
}

/// Reuse persisted transforms when all three artifacts exist; otherwise fit
/// them on `train` and persist.
pub fn load_or_fit_transforms(train: &Array2<f64>, config: &FnoConfig) -> FnoResult<Transforms> {
    if Transforms::exists(&config.artifacts) {
        info!("reusing persisted PCA and normalizers");
        return Transforms::load(&config.artifacts);
    }
    let transforms = Transforms::fit(train, config)?;
    transforms.save(&config.artifacts)?;
    Ok(transforms)
}

/// Physical windows in rollout order as `pred_{i}` entries plus `count`.
pub fn save_predictions<'a, I>(path: &Path, windows: I) -> FnoResult<usize>
where
    I: IntoIterator<Item = &'a RolloutWindow>,
{
    let mut npz = ArchiveWriter::create(path)?;
    let mut count = 0;
    for window in windows {
        npz.array(&format!("pred_{count}"), &window.physical)?;
        count += 1;
    }
    npz.scalar_usize("count", count)?;
    npz.finish()?;
    info!(path = %path.display(), count, "saved predictions");
    Ok(count)
}

pub fn run_inference(config: &FnoConfig) -> FnoResult<InferenceSummary> {
    let train = load_snapshots(&config.data.train_path)?;
    let val = load_snapshots(&config.data.val_path)?;
    let train = concatenate(Axis(0), &[train.view(), val.view()]).map_err(|e| {
        FnoError::ShapeMismatch(format!("train and validation snapshots differ: {e}"))
    })?;
    let test = load_snapshots(&config.data.test_path)?;

    let transforms = load_or_fit_transforms(&train, config)?;
    let dataset = Dataset::prepare(&transforms, &train, &test, config)?;

    let model = Fno3d::load_npz(&config.model_path())?;
    if model.shape().in_channels != config.data.t_in {
        return Err(FnoError::ConfigError(format!(
            "model expects {} input channels but the window is {}",
            model.shape().in_channels,
            config.data.t_in
        )));
    }

    let seed_input = dataset
        .test_inputs
        .slice(s![0..1, .., .., .., ..])
        .to_owned();
    let steps = config.rollout.windows_per_test * dataset.n_test();
    let mut rollout = Rollout::new(&transforms, config);
    let windows = rollout.run(&model, &seed_input, steps)?;
    let report = rollout.evaluate(&model, &seed_input, &dataset.test_targets)?;

    save_predictions(
        &config.artifacts.prediction_path,
        windows.iter().chain(report.windows.iter()),
    )?;
    info!(
        rollout_windows = steps,
        evaluated_windows = report.window_mse.len(),
        total_mse = report.total_mse,
        root_total_mse = report.root_total_mse,
        "inference complete"
    );
    Ok(InferenceSummary {
        rollout_windows: steps,
        report,
    })
}
