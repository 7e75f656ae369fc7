// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Number of coordinate channels (x, y, t) appended to the network input.
pub const GRID_CHANNELS: usize = 3;

/// Number of corners of the truncated frequency cube.
/// Low/high along x and y, low-only along t (half spectrum).
pub const SPECTRAL_CORNERS: usize = 4;

/// Stabiliser added to the standard deviation by the unit-Gaussian normalizer.
pub const NORMALIZER_EPS: f64 = 1e-5;

/// Expansion factor of the projection head's hidden layer relative to `width`.
pub const PROJECTION_EXPANSION: usize = 4;

/// Eigenvalues below this fraction of the largest are treated as zero by PCA.
pub const PCA_RANK_TOL: f64 = 1e-12;
