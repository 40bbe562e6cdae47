//! Seeded randomized truncated SVD over a row-sparse matrix.
//!
//! Range finder with a Gaussian test matrix and QR-normalized power
//! iterations, followed by an exact SVD of the small projected matrix via a
//! Jacobi eigen-decomposition of `B·Bᵀ`.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::tfidf::SparseRows;

/// Relative threshold below which a singular value is treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;
const MAX_JACOBI_SWEEPS: usize = 100;

#[derive(Debug, Clone)]
pub struct Factorization {
    /// `k × n_cols` right singular vectors; rows past the numerical rank are zero.
    pub components: Array2<f64>,
    pub singular_values: Vec<f64>,
}

/// Top-`k` right singular vectors of `x`.
///
/// The output always has exactly `k` component rows. When `x` supports fewer
/// than `k` non-degenerate directions the remainder is zero-filled.
pub fn randomized_svd(
    x: &SparseRows,
    k: usize,
    n_oversamples: usize,
    n_iter: usize,
    seed: u64,
) -> Factorization {
    let n_cols = x.n_cols;
    let sketch = (k + n_oversamples).min(x.n_rows()).min(n_cols);

    let mut components = Array2::<f64>::zeros((k, n_cols));
    let mut singular_values = vec![0.0; k];
    if sketch == 0 {
        return Factorization {
            components,
            singular_values,
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let omega = Array2::from_shape_simple_fn((n_cols, sketch), || rng.sample(StandardNormal));

    let mut q = orthonormalize(&x.dot(&omega));
    for _ in 0..n_iter {
        let z = orthonormalize(&x.t_dot(&q));
        q = orthonormalize(&x.dot(&z));
    }

    // B = Qᵀ·X, stored transposed as Xᵀ·Q (n_cols × sketch).
    let bt = x.t_dot(&q);
    let gram = bt.t().dot(&bt);
    let (eigenvalues, eigenvectors) = symmetric_eigen(&gram);

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));

    let top = eigenvalues[order[0]].max(0.0).sqrt();
    for (slot, &idx) in order.iter().take(k).enumerate() {
        let sigma = eigenvalues[idx].max(0.0).sqrt();
        if top == 0.0 || sigma <= RANK_TOLERANCE * top {
            break;
        }
        let w = eigenvectors.column(idx);
        let mut v: Array1<f64> = bt.dot(&w) / sigma;

        // Deterministic sign: the largest-magnitude loading is positive.
        let pivot = v
            .iter()
            .enumerate()
            .fold((0usize, 0.0f64), |best, (j, &val)| {
                if val.abs() > best.1 {
                    (j, val.abs())
                } else {
                    best
                }
            })
            .0;
        if v[pivot] < 0.0 {
            v.mapv_inplace(|e| -e);
        }

        components.row_mut(slot).assign(&v);
        singular_values[slot] = sigma;
    }

    Factorization {
        components,
        singular_values,
    }
}

/// Modified Gram-Schmidt with one re-orthogonalization pass. Columns that are
/// numerically dependent on earlier ones come back as zero columns.
pub fn orthonormalize(a: &Array2<f64>) -> Array2<f64> {
    let mut q = a.clone();
    for j in 0..q.ncols() {
        let original = q.column(j).dot(&q.column(j)).sqrt();
        for _pass in 0..2 {
            for i in 0..j {
                let proj = q.column(i).dot(&q.column(j));
                if proj != 0.0 {
                    let qi = q.column(i).to_owned();
                    q.column_mut(j).scaled_add(-proj, &qi);
                }
            }
        }
        let norm = q.column(j).dot(&q.column(j)).sqrt();
        if original == 0.0 || norm <= RANK_TOLERANCE * original {
            q.column_mut(j).fill(0.0);
        } else {
            q.column_mut(j).mapv_inplace(|e| e / norm);
        }
    }
    q
}

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix.
///
/// Returns eigenvalues (unordered) and the matching eigenvectors as columns.
pub fn symmetric_eigen(m: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = m.nrows();
    let mut a = m.clone();
    let mut v = Array2::<f64>::eye(n);

    let scale: f64 = a.iter().map(|e| e * e).sum();
    for _sweep in 0..MAX_JACOBI_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off <= 1e-24 * scale || off == 0.0 {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta == 0.0 {
                    1.0
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = a.diag().to_vec();
    (eigenvalues, v)
}

/// Population variance of every column.
pub fn column_variance(m: &Array2<f64>) -> Array1<f64> {
    let n = m.nrows();
    if n == 0 {
        return Array1::zeros(m.ncols());
    }
    let mean = m.sum_axis(Axis(0)) / n as f64;
    let mut var = Array1::<f64>::zeros(m.ncols());
    for row in m.rows() {
        let diff = &row - &mean;
        var += &(&diff * &diff);
    }
    var / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sparse(dense: &Array2<f64>) -> SparseRows {
        SparseRows {
            n_cols: dense.ncols(),
            rows: dense
                .rows()
                .into_iter()
                .map(|r| {
                    r.iter()
                        .enumerate()
                        .filter(|(_, v)| **v != 0.0)
                        .map(|(j, v)| (j, *v))
                        .collect()
                })
                .collect(),
        }
    }

    #[test]
    fn jacobi_diagonalizes_symmetric_matrix() {
        let m = array![[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let (vals, vecs) = symmetric_eigen(&m);
        for (i, &lambda) in vals.iter().enumerate() {
            let v = vecs.column(i);
            let mv = m.dot(&v);
            for k in 0..3 {
                assert!((mv[k] - lambda * v[k]).abs() < 1e-9);
            }
        }
        let trace: f64 = vals.iter().sum();
        assert!((trace - 9.0).abs() < 1e-9);
    }

    #[test]
    fn orthonormalize_zeroes_dependent_columns() {
        let a = array![[1.0, 2.0, 0.0], [0.0, 0.0, 1.0], [1.0, 2.0, 0.0]];
        let q = orthonormalize(&a);
        assert!(q.column(1).iter().all(|v| *v == 0.0));
        let qtq = q.t().dot(&q);
        assert!((qtq[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((qtq[[2, 2]] - 1.0).abs() < 1e-12);
        assert!(qtq[[0, 2]].abs() < 1e-12);
    }

    #[test]
    fn recovers_singular_values_of_small_matrix() {
        // Diagonal matrix: singular values are the absolute diagonal entries.
        let dense = array![
            [3.0, 0.0, 0.0, 0.0],
            [0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0]
        ];
        let f = randomized_svd(&sparse(&dense), 2, 10, 5, 42);
        assert!((f.singular_values[0] - 3.0).abs() < 1e-9);
        assert!((f.singular_values[1] - 2.0).abs() < 1e-9);
        assert!((f.components[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((f.components[[1, 1]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pads_components_beyond_rank() {
        let dense = array![[1.0, 1.0, 0.0], [2.0, 2.0, 0.0]];
        let f = randomized_svd(&sparse(&dense), 3, 10, 5, 42);
        assert_eq!(f.components.dim(), (3, 3));
        assert!(f.singular_values[0] > 0.0);
        assert_eq!(f.singular_values[1], 0.0);
        assert!(f.components.row(1).iter().all(|v| *v == 0.0));
        assert!(f.components.row(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn same_seed_same_factorization() {
        let dense = array![
            [0.5, 0.2, 0.0, 0.1],
            [0.0, 0.7, 0.3, 0.0],
            [0.4, 0.0, 0.6, 0.2],
            [0.1, 0.1, 0.1, 0.9]
        ];
        let a = randomized_svd(&sparse(&dense), 2, 2, 3, 7);
        let b = randomized_svd(&sparse(&dense), 2, 2, 3, 7);
        assert_eq!(a.components, b.components);
        assert_eq!(a.singular_values, b.singular_values);
    }

    #[test]
    fn column_variance_is_population_variance() {
        let m = array![[1.0, 5.0], [3.0, 5.0]];
        assert_eq!(column_variance(&m), array![1.0, 0.0]);
    }
}
