//! Discrete FDR threshold search.
//!
//! The false discovery proportion at a p-value threshold `cp` is estimated directly from
//! the permutation null instead of a parametric p-value model:
//!
//! ```text
//! fdr(cp) = (#{pvals <= cp} + #{null_pvals <= cp}) / (#{pvals <= cp} * (numperm + 1))
//! ```
//!
//! Candidate thresholds are the distinct observed p-values. They are visited from the
//! largest to the smallest and the first one with `fdr(cp) <= alpha` is accepted.

use log::{debug, info, warn};
use ndarray::{ArrayView1, ArrayView2};

#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteThreshold {
    /// Accepted p-value threshold, `None` when no candidate reaches `alpha`
    pub threshold: Option<f64>,
    /// Visited `(threshold, estimated fdr)` pairs in search order
    pub fdr_curve: Vec<(f64, f64)>,
}

impl DiscreteThreshold {
    /// Reject every feature whose p-value is at or below the accepted threshold.
    pub fn reject(&self, pvals: ArrayView1<f64>) -> Vec<bool> {
        match self.threshold {
            Some(cp) => pvals.iter().map(|&p| p <= cp).collect(),
            None => vec![false; pvals.len()],
        }
    }
}

/// Number of entries of an ascending slice that are `<= cp`.
fn count_at_most(sorted: &[f64], cp: f64) -> usize {
    sorted.partition_point(|&p| p <= cp)
}

pub fn dsfdr_threshold(
    pvals: ArrayView1<f64>,
    null_pvals: ArrayView2<f64>,
    alpha: f64,
) -> DiscreteThreshold {
    let numperm = null_pvals.ncols();

    let mut sorted_pvals: Vec<f64> = pvals.to_vec();
    sorted_pvals.sort_by(f64::total_cmp);
    let mut sorted_null: Vec<f64> = null_pvals.iter().copied().collect();
    sorted_null.sort_by(f64::total_cmp);

    let mut candidates = sorted_pvals.clone();
    candidates.dedup();
    candidates.reverse();

    let mut fdr_curve = Vec::with_capacity(candidates.len());
    for cp in candidates {
        let realnum = count_at_most(&sorted_pvals, cp);
        let nullnum = count_at_most(&sorted_null, cp);
        let fdr = (realnum + nullnum) as f64 / (realnum * (numperm + 1)) as f64;
        fdr_curve.push((cp, fdr));

        if fdr <= alpha {
            info!(
                "dsfdr threshold {} accepted with estimated FDR {} ({} discoveries)",
                cp, fdr, realnum
            );
            return DiscreteThreshold {
                threshold: Some(cp),
                fdr_curve,
            };
        }
        debug!("dsfdr threshold {} rejected with estimated FDR {}", cp, fdr);
    }

    warn!("No dsfdr threshold reaches alpha {}, nothing is rejected", alpha);
    DiscreteThreshold {
        threshold: None,
        fdr_curve,
    }
}

/// Reject vector of the discrete FDR rule together with its search diagnostics.
pub fn dsfdr_reject(
    pvals: ArrayView1<f64>,
    null_pvals: ArrayView2<f64>,
    alpha: f64,
) -> (Vec<bool>, DiscreteThreshold) {
    let threshold = dsfdr_threshold(pvals, null_pvals, alpha);
    (threshold.reject(pvals), threshold)
}
