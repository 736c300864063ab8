//! Rank-based permutation p-values.
//!
//! For every feature the observed statistic `t` and its `numperm` null draws `u` form a
//! pool of `N = numperm + 1` values. Each value `v` in the pool gets the p-value
//! `#{w in pool : w >= v} / N`, i.e. `1 - (r - 1) / N` with `r` its ascending rank when
//! ties share the minimum rank. P-values lie in `(0, 1]`; tied statistics share a
//! p-value.

use crate::testing::utils::is_close;
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip};

#[derive(Debug, Clone)]
pub struct PermutationPValues {
    /// P-value of the observed statistic per feature
    pub pvals: Array1<f64>,
    /// P-values of the null draws, features × permutations
    pub null_pvals: Array2<f64>,
}

/// Force null draws within floating point tolerance of the observed statistic to equal it.
pub fn snap_ties(observed: ArrayView1<f64>, null: &mut Array2<f64>) {
    Zip::from(null.rows_mut())
        .and(observed)
        .for_each(|mut row, &t| {
            row.mapv_inplace(|u| if is_close(t, u) { t } else { u });
        });
}

/// P-values of every value in `values` against the whole pool.
///
/// `NaN` ranks below every other value, so a `NaN` statistic never looks extreme.
pub fn rank_pvalues(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let key = |v: f64| if v.is_nan() { f64::NEG_INFINITY } else { v };

    // Descending order, equal keys form one block
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| key(values[b]).total_cmp(&key(values[a])));

    let mut pvals = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let current = key(values[order[i]]);
        let mut j = i + 1;
        while j < n && key(values[order[j]]) == current {
            j += 1;
        }
        // j values are >= current
        let p = j as f64 / n as f64;
        for &idx in &order[i..j] {
            pvals[idx] = p;
        }
        i = j;
    }
    pvals
}

/// Observed and null p-values of every feature. `null` must already be tie-snapped.
pub fn permutation_pvalues(observed: ArrayView1<f64>, null: &Array2<f64>) -> PermutationPValues {
    let n_features = observed.len();
    let numperm = null.ncols();

    let mut pvals = Array1::<f64>::zeros(n_features);
    let mut null_pvals = Array2::<f64>::zeros((n_features, numperm));

    for (feature, (null_row, mut null_pval_row)) in null
        .axis_iter(Axis(0))
        .zip(null_pvals.axis_iter_mut(Axis(0)))
        .enumerate()
    {
        let mut pool = Vec::with_capacity(numperm + 1);
        pool.push(observed[feature]);
        pool.extend(null_row.iter().copied());

        let ranked = rank_pvalues(&pool);
        pvals[feature] = ranked[0];
        for (dst, &p) in null_pval_row.iter_mut().zip(&ranked[1..]) {
            *dst = p;
        }
    }

    PermutationPValues { pvals, null_pvals }
}
