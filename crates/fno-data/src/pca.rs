// ─────────────────────────────────────────────────────────────────────
// FNO3D Core — PCA
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Principal component analysis compressing field snapshots to a latent grid.
//!
//! Fitted once on training snapshots, persisted, and reused unchanged for
//! train/test encoding and for mapping predictions back to physical space.

use fno_math::linalg::symmetric_eigen;
use fno_types::archive::{ArchiveReader, ArchiveWriter};
use fno_types::constants::PCA_RANK_TOL;
use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array1, Array2, Axis, Ix1, Ix2};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Pca {
    /// Number of retained components.
    pub n_components: usize,
    /// Mean of training data: (n_features,).
    pub mean: Array1<f64>,
    /// Principal components: (n_components, n_features), orthonormal rows.
    pub components: Array2<f64>,
    /// Explained variance per component, descending.
    pub explained_variance: Array1<f64>,
}

impl Pca {
    /// Fit from data matrix X: (n_samples, n_features).
    ///
    /// Diagonalises the covariance (p×p) when p <= n, otherwise the Gram
    /// matrix (n×n) and maps its eigenvectors back to feature space.
    pub fn fit(x: &Array2<f64>, n_components: usize) -> FnoResult<Self> {
        let (n, p) = x.dim();
        if n == 0 || p == 0 {
            return Err(FnoError::ConfigError(
                "PCA fit requires a non-empty data matrix".to_string(),
            ));
        }
        if n_components == 0 || n_components > n.min(p) {
            return Err(FnoError::ConfigError(format!(
                "PCA n_components={n_components} must lie in 1..={} for data {n}x{p}",
                n.min(p)
            )));
        }
        if !x.iter().all(|v| v.is_finite()) {
            return Err(FnoError::ConfigError(
                "PCA fit received non-finite values".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| FnoError::ConfigError("PCA fit on empty axis".to_string()))?;
        let centered = x - &mean;

        let mut components = Array2::zeros((n_components, p));
        let eigenvalues = if p <= n {
            let cov = centered.t().dot(&centered);
            let (vals, vecs) = symmetric_eigen(&cov)?;
            for j in 0..n_components {
                components.row_mut(j).assign(&vecs.column(j));
            }
            vals
        } else {
            let gram = centered.dot(&centered.t());
            let (vals, vecs) = symmetric_eigen(&gram)?;
            let cutoff = PCA_RANK_TOL * vals[0].max(0.0);
            for j in 0..n_components {
                if vals[j] > cutoff && vals[j] > 0.0 {
                    let v_j = centered.t().dot(&vecs.column(j));
                    components.row_mut(j).assign(&(&v_j / vals[j].sqrt()));
                }
            }
            vals
        };

        // Deterministic sign: largest-magnitude loading positive.
        for mut row in components.rows_mut() {
            let pivot = row
                .iter()
                .copied()
                .fold(0.0_f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
            if pivot < 0.0 {
                row.mapv_inplace(|v| -v);
            }
        }

        let denom = if n > 1 { (n - 1) as f64 } else { 1.0 };
        let explained_variance = Array1::from_iter(
            eigenvalues
                .iter()
                .take(n_components)
                .map(|&ev| ev.max(0.0) / denom),
        );

        info!(
            samples = n,
            features = p,
            n_components,
            retained_variance = explained_variance.sum(),
            "fitted PCA"
        );
        Ok(Pca {
            n_components,
            mean,
            components,
            explained_variance,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Transform data to PCA space: (n, n_features) -> (n, n_components).
    pub fn transform(&self, x: &Array2<f64>) -> FnoResult<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(FnoError::ShapeMismatch(format!(
                "PCA transform expects {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        Ok((x - &self.mean).dot(&self.components.t()))
    }

    /// Inverse transform: (n, n_components) -> (n, n_features).
    pub fn inverse_transform(&self, coeffs: &Array2<f64>) -> FnoResult<Array2<f64>> {
        if coeffs.ncols() != self.n_components {
            return Err(FnoError::ShapeMismatch(format!(
                "PCA inverse_transform expects {} components, got {}",
                self.n_components,
                coeffs.ncols()
            )));
        }
        Ok(coeffs.dot(&self.components) + &self.mean)
    }

    pub fn save_npz(&self, path: &Path) -> FnoResult<()> {
        let mut npz = ArchiveWriter::create(path)?;
        npz.scalar_usize("n_components", self.n_components)?;
        npz.array("mean", &self.mean)?;
        npz.array("components", &self.components)?;
        npz.array("explained_variance", &self.explained_variance)?;
        npz.finish()?;
        info!(path = %path.display(), "saved PCA");
        Ok(())
    }

    pub fn load_npz(path: &Path) -> FnoResult<Self> {
        let mut npz = ArchiveReader::open(path)?;
        let n_components = npz.scalar_usize("n_components")?;
        let mean = npz.array::<Ix1>("mean")?;
        let components = npz.array::<Ix2>("components")?;
        let explained_variance = npz.array::<Ix1>("explained_variance")?;
        if components.dim() != (n_components, mean.len()) || explained_variance.len() != n_components
        {
            return Err(FnoError::ConfigError(format!(
                "PCA archive '{}' inconsistent: components {:?}, mean {}, variance {}, n_components {}",
                npz.path(),
                components.dim(),
                mean.len(),
                explained_variance.len(),
                n_components
            )));
        }
        info!(path = %path.display(), n_components, "loaded PCA");
        Ok(Pca {
            n_components,
            mean,
            components,
            explained_variance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn random_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen::<f64>())
    }

    fn sq_norm(a: &Array2<f64>) -> f64 {
        a.mapv(|v| v * v).sum()
    }

    #[test]
    fn test_pca_fit_components() {
        let x = random_matrix(10, 50, 0);
        let pca = Pca::fit(&x, 5).unwrap();
        assert_eq!(pca.n_components, 5);
        assert_eq!(pca.components.dim(), (5, 50));
        let gram = pca.components.dot(&pca.components.t());
        for ((i, j), &g) in gram.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((g - expected).abs() < 1e-8, "components not orthonormal at ({i}, {j})");
        }
    }

    #[test]
    fn test_full_rank_roundtrip_exact() {
        let x = random_matrix(30, 8, 1);
        let pca = Pca::fit(&x, 8).unwrap();
        let recon = pca.inverse_transform(&pca.transform(&x).unwrap()).unwrap();
        let err = (&x - &recon).iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(err < 1e-10, "full-rank PCA not exact: {err:.3e}");
    }

    #[test]
    fn test_low_rank_roundtrip_wide_data() {
        // Rank-3 data with more features than samples uses the Gram path.
        let a = random_matrix(20, 3, 2);
        let b = random_matrix(3, 100, 3);
        let x = a.dot(&b);

        let pca = Pca::fit(&x, 3).unwrap();
        let recon = pca.inverse_transform(&pca.transform(&x).unwrap()).unwrap();
        let rel = sq_norm(&(&x - &recon)) / sq_norm(&x).max(1e-15);
        assert!(rel < 1e-10, "PCA roundtrip error too high: {rel:.3e}");
    }

    #[test]
    fn test_truncation_error_equals_discarded_variance() {
        let x = random_matrix(40, 6, 4);
        let full = Pca::fit(&x, 6).unwrap();
        let truncated = Pca::fit(&x, 4).unwrap();

        let recon = truncated
            .inverse_transform(&truncated.transform(&x).unwrap())
            .unwrap();
        let err = sq_norm(&(&x - &recon));
        let discarded: f64 = full.explained_variance.iter().skip(4).sum::<f64>() * 39.0;
        assert!(
            (err - discarded).abs() < 1e-9 * (1.0 + discarded),
            "truncation error {err:.6e} vs discarded variance {discarded:.6e}"
        );
    }

    #[test]
    fn test_explained_variance_descending() {
        let pca = Pca::fit(&random_matrix(25, 7, 5), 7).unwrap();
        for w in pca.explained_variance.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_invalid_component_count_rejected() {
        let x = random_matrix(4, 6, 6);
        assert!(Pca::fit(&x, 0).is_err());
        assert!(Pca::fit(&x, 5).is_err());
        assert!(Pca::fit(&x, 4).is_ok());
    }

    #[test]
    fn test_feature_mismatch_rejected() {
        let pca = Pca::fit(&random_matrix(10, 4, 7), 2).unwrap();
        assert!(matches!(
            pca.transform(&random_matrix(3, 5, 8)),
            Err(FnoError::ShapeMismatch(_))
        ));
        assert!(pca.inverse_transform(&random_matrix(3, 3, 9)).is_err());
    }

    #[test]
    fn test_pca_persistence_roundtrip() {
        let pca = Pca::fit(&random_matrix(12, 9, 10), 4).unwrap();
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("fno_pca_{}_{}.npz", std::process::id(), ts));
        pca.save_npz(&path).unwrap();
        let loaded = Pca::load_npz(&path).unwrap();

        let x = random_matrix(3, 9, 11);
        assert_eq!(pca.transform(&x).unwrap(), loaded.transform(&x).unwrap());

        std::fs::remove_file(path).ok();
    }
}
