// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — Spectral Block Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use fno_core::network::{Fno3d, NetworkShape};
use fno_core::spectral::SpectralConv3d;
use ndarray::Array5;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Benchmark: one spectral block at the reference resolution.
///
/// 24x24 latent grid, 13 timesteps + 6 padding, width 8, 4 modes per axis.
fn bench_spectral_forward(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let conv = SpectralConv3d::random(8, 8, [4, 4, 4], &mut rng);
    let x = Array5::from_shape_fn((1, 8, 24, 24, 19), |(_, ch, i, j, k)| {
        ((ch * 13 + i * 7 + j * 3 + k) as f64 * 0.01).sin()
    });

    c.bench_function("bench_spectral_forward_24x24x19_w8", |b| {
        b.iter(|| std::hint::black_box(conv.forward(&x)))
    });
}

/// Benchmark: full network forward for one window.
fn bench_network_forward(c: &mut Criterion) {
    let shape = NetworkShape {
        in_channels: 13,
        width: 8,
        modes: [4, 4, 4],
        n_layers: 4,
        padding: 6,
    };
    let net = Fno3d::random(shape, &mut StdRng::seed_from_u64(1));
    let x = Array5::from_shape_fn((1, 24, 24, 13, 13), |(_, i, j, k, ch)| {
        ((i + 2 * j + 3 * k + ch) as f64 * 0.02).cos()
    });

    c.bench_function("bench_network_forward_24x24x13", |b| {
        b.iter(|| std::hint::black_box(net.forward(&x)))
    });
}

criterion_group!(benches, bench_spectral_forward, bench_network_forward);
criterion_main!(benches);
