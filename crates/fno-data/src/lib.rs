// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Fno Data
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Data pipeline: snapshots -> PCA latent grid -> normalized windows -> batches.

pub mod loader;
pub mod normalizer;
pub mod pca;
pub mod windowing;
