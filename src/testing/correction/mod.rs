//! Multiple testing correction of permutation p-values across features.

use anyhow::{Result, anyhow};
use ndarray::{Array1, Array2, ArrayView1};
use std::cmp::Ordering;

pub mod discrete;

/// Frequentist permutation p-values `(#{u >= t} + 1) / (numperm + 1)` per feature.
///
/// `null` must be tie-snapped against `observed` so that near-ties count as `u >= t`.
/// A `NaN` observed statistic is the least extreme value and gets p = 1.
pub fn frequentist_pvalues(observed: ArrayView1<f64>, null: &Array2<f64>) -> Array1<f64> {
    let denominator = (null.ncols() + 1) as f64;
    null.rows()
        .into_iter()
        .zip(observed.iter())
        .map(|(row, &t)| {
            if t.is_nan() {
                return 1.0;
            }
            (row.iter().filter(|&&u| u >= t).count() + 1) as f64 / denominator
        })
        .collect()
}

/// Reject every hypothesis whose adjusted p-value is at most `alpha`.
pub fn reject_adjusted(adjusted_p_values: &[f64], alpha: f64) -> Vec<bool> {
    adjusted_p_values.iter().map(|&q| q <= alpha).collect()
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(anyhow!("Empty p-value array"));
    }

    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(anyhow!("Invalid p-value at index {}: {}", i, p));
        }
    }
    Ok(())
}

/// Step-up adjustment shared by BH and BY: `q[i] = min(p[i] * scale * n / rank[i], q[i+1])`.
fn step_up_adjust(p_values: &[f64], scale: f64) -> Vec<f64> {
    let n = p_values.len();

    // Create index-value pairs and sort by p-value in ascending order
    let mut indexed_p_values: Vec<(usize, f64)> =
        p_values.iter().enumerate().map(|(i, &p)| (i, p)).collect();
    indexed_p_values.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut adjusted_p_values = vec![0.0; n];
    let mut current_min = 1.0;

    // Process from largest to smallest p-value
    for i in (0..n).rev() {
        let (orig_idx, p_val) = indexed_p_values[i];
        let rank = i + 1;

        let adjustment = (p_val * scale * n as f64 / rank as f64).min(1.0);
        current_min = adjustment.min(current_min);
        adjusted_p_values[orig_idx] = current_min;
    }

    adjusted_p_values
}

/// Benjamini-Hochberg step-up adjustment of per-feature permutation p-values.
///
/// Used by the `bhfdr` rule on the output of [`frequentist_pvalues`]. Rejecting where the
/// adjusted value is at most `alpha` controls the FDR across features when the tests are
/// independent or positively dependent.
///
/// Errors on an empty slice or on values outside `[0, 1]`.
///
/// # Example
/// ```
/// use discrete_fdr::testing::correction::benjamini_hochberg_correction;
///
/// // p-values from 99 permutations
/// let p_values = vec![0.01, 0.03, 0.05];
/// let adjusted = benjamini_hochberg_correction(&p_values).unwrap();
/// assert_eq!(adjusted.len(), 3);
/// ```
pub fn benjamini_hochberg_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    Ok(step_up_adjust(p_values, 1.0))
}

/// Benjamini-Yekutieli adjustment, the `byfdr` rule.
///
/// The BH adjustment scaled by `c(n) = 1 + 1/2 + ... + 1/n`, which keeps FDR control
/// under arbitrary dependence between features, such as correlated taxa sharing one
/// label permutation.
///
/// # Example
/// ```
/// use discrete_fdr::testing::correction::benjamini_yekutieli_correction;
///
/// let p_values = vec![0.01, 0.03, 0.05];
/// let adjusted = benjamini_yekutieli_correction(&p_values).unwrap();
/// assert!(adjusted.iter().all(|&q| q >= 0.01));
/// ```
pub fn benjamini_yekutieli_correction(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;

    // Calculate the correction factor
    let c_n: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();

    Ok(step_up_adjust(p_values, c_n))
}
