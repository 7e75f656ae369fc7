// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Rollout Job
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `fno-rollout [config.json]`: prepare data, load the trained network,
//! roll out predictions and report their error against the test windows.

use fno_pipeline::job::run_inference;
use fno_pipeline::telemetry::init_tracing;
use fno_types::config::FnoConfig;
use fno_types::error::FnoResult;
use std::process::ExitCode;
use tracing::{error, info};

fn load_config() -> FnoResult<FnoConfig> {
    match std::env::args().nth(1) {
        Some(path) => FnoConfig::from_file(&path),
        None => {
            let config = FnoConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match load_config().and_then(|config| run_inference(&config)) {
        Ok(summary) => {
            info!(
                rollout_windows = summary.rollout_windows,
                evaluated_windows = summary.report.window_mse.len(),
                root_total_mse = summary.report.root_total_mse,
                "inference finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "inference failed");
            ExitCode::FAILURE
        }
    }
}
