// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Fno Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fourier neural operator building blocks.
//!
//! Tensors inside the network are channel-first: (batch, channel, x, y, t).
//! The network boundary is channel-last: (batch, x, y, t, channel).

pub mod mixing;
pub mod network;
pub mod pointwise;
pub mod spectral;
pub mod weights;
