//! Linear algebra utilities.
//!
//! Deterministic symmetric eigendecomposition by cyclic Jacobi rotations,
//! used by PCA on covariance and Gram matrices.

use fno_types::error::{FnoError, FnoResult};
use ndarray::{Array1, Array2};

const MAX_SWEEPS: usize = 100;
const OFF_DIAG_TOL: f64 = 1e-14;

/// Eigendecomposition of a symmetric matrix.
///
/// Returns (eigenvalues, eigenvectors) with eigenvalues sorted descending and
/// eigenvectors as orthonormal columns in matching order.
pub fn symmetric_eigen(a: &Array2<f64>) -> FnoResult<(Array1<f64>, Array2<f64>)> {
    let (n, m) = a.dim();
    if n != m {
        return Err(FnoError::LinAlg(format!(
            "symmetric_eigen requires a square matrix, got {n}x{m}"
        )));
    }
    if !a.iter().all(|v| v.is_finite()) {
        return Err(FnoError::LinAlg(
            "symmetric_eigen received non-finite entries".to_string(),
        ));
    }

    let mut d = a.clone();
    let mut v: Array2<f64> = Array2::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().sqrt().max(1.0);

    for _ in 0..MAX_SWEEPS {
        let mut off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += d[[i, j]].abs();
            }
        }
        if off_diag < OFF_DIAG_TOL * scale {
            break;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if d[[i, j]].abs() < 1e-300 {
                    continue;
                }
                let tau = (d[[j, j]] - d[[i, i]]) / (2.0 * d[[i, j]]);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cos = 1.0 / (1.0 + t * t).sqrt();
                let sin = t * cos;

                let dii = d[[i, i]];
                let djj = d[[j, j]];
                let dij = d[[i, j]];
                d[[i, i]] = cos * cos * dii - 2.0 * sin * cos * dij + sin * sin * djj;
                d[[j, j]] = sin * sin * dii + 2.0 * sin * cos * dij + cos * cos * djj;
                d[[i, j]] = 0.0;
                d[[j, i]] = 0.0;

                for r in 0..n {
                    if r == i || r == j {
                        continue;
                    }
                    let ri = d[[r, i]];
                    let rj = d[[r, j]];
                    d[[r, i]] = cos * ri - sin * rj;
                    d[[i, r]] = d[[r, i]];
                    d[[r, j]] = sin * ri + cos * rj;
                    d[[j, r]] = d[[r, j]];
                }

                for r in 0..n {
                    let vi = v[[r, i]];
                    let vj = v[[r, j]];
                    v[[r, i]] = cos * vi - sin * vj;
                    v[[r, j]] = sin * vi + cos * vj;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        d[[j, j]]
            .partial_cmp(&d[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues = Array1::from_iter(order.iter().map(|&k| d[[k, k]]));
    let mut eigenvectors: Array2<f64> = Array2::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        eigenvectors.column_mut(dst).assign(&v.column(src));
    }
    Ok((eigenvalues, eigenvectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_eigen_diagonal_sorted_descending() {
        let a = array![[3.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 1.0]];
        let (vals, vecs) = symmetric_eigen(&a).unwrap();
        assert!((vals[0] - 5.0).abs() < 1e-12);
        assert!((vals[1] - 3.0).abs() < 1e-12);
        assert!((vals[2] - 1.0).abs() < 1e-12);
        assert!((vecs[[1, 0]].abs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_eigen_symmetric_2x2() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let (vals, _vecs) = symmetric_eigen(&a).unwrap();
        assert!((vals[0] - 3.0).abs() < 1e-10);
        assert!((vals[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_eigen_reconstructs_matrix() {
        let a = array![
            [4.0, 1.0, -2.0, 0.5],
            [1.0, 3.0, 0.0, 1.0],
            [-2.0, 0.0, 5.0, -1.0],
            [0.5, 1.0, -1.0, 2.0]
        ];
        let (vals, vecs) = symmetric_eigen(&a).unwrap();
        let recon = vecs.dot(&Array2::from_diag(&vals)).dot(&vecs.t());
        for ((i, j), &x) in a.indexed_iter() {
            assert!(
                (recon[[i, j]] - x).abs() < 1e-10,
                "Reconstruction failed at ({i}, {j})"
            );
        }
        let gram = vecs.t().dot(&vecs);
        for ((i, j), &g) in gram.indexed_iter() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((g - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_eigen_rejects_non_square() {
        let a = Array2::<f64>::zeros((2, 3));
        assert!(matches!(symmetric_eigen(&a), Err(FnoError::LinAlg(_))));
    }
}
