//! Permutation null distributions for the per-feature statistics.
//!
//! Under the null hypothesis the distribution of a statistic does not change when the
//! labels are reassigned to samples at random. The null matrix holds, for every feature,
//! the two-sided magnitude (see `Statistic::magnitude`) of the statistic under
//! `numperm` uniformly random relabelings.
//!
//! Three strategies are used depending on [`NullMode`](crate::testing::inference::NullMode):
//!
//! - **Vectorized** (`meandiff`, `pearson`, `spearman`): the permuted labelings are
//!   written into a samples × permutations weight matrix and every null statistic comes
//!   out of a matrix product.
//! - **Loop** (all other statistics): the labels are shuffled and the statistic is
//!   recomputed once per permutation.
//! - **PerFeature** (`nonzerospearman`, `nonzeropearson`): every feature shuffles only
//!   the labels of its own non-zero samples, see [`NonZeroSubset`].

use crate::testing::inference::nonzero::NonZeroSubset;
use crate::testing::inference::parametric::{center_rows, mean_diff};
use crate::testing::inference::Statistic;
use crate::testing::transform::rank_data;
use crate::testing::utils::{average_ranks, center};
use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone)]
pub struct PermutationNull {
    /// Signed observed statistic per feature
    pub statistics: Array1<f64>,
    /// Two-sided magnitude of the observed statistic per feature
    pub observed: Array1<f64>,
    /// Null magnitudes, features × permutations
    pub null: Array2<f64>,
}

impl PermutationNull {
    fn from_signed(statistics: Array1<f64>, null: Array2<f64>) -> Self {
        let observed = statistics.mapv(f64::abs);
        PermutationNull {
            statistics,
            observed,
            null,
        }
    }

    pub fn n_features(&self) -> usize {
        self.observed.len()
    }

    pub fn n_permutations(&self) -> usize {
        self.null.ncols()
    }
}

/// Observed statistics and their permutation null for `data` (features × samples).
///
/// `rng` is the only source of randomness; a seeded generator makes the result
/// reproducible.
pub fn permutation_null<R>(
    statistic: &Statistic,
    data: ArrayView2<f64>,
    labels: &[f64],
    numperm: usize,
    rng: &mut R,
) -> anyhow::Result<PermutationNull>
where
    R: Rng + ?Sized,
{
    if labels.len() != data.ncols() {
        return Err(anyhow::anyhow!(
            "Label vector length {} does not match sample count {}",
            labels.len(),
            data.ncols()
        ));
    }

    let mode = statistic.null_mode();
    debug!(
        "Generating {} permutations for {} ({:?} mode) over {} features",
        numperm,
        statistic,
        mode,
        data.nrows()
    );

    match statistic {
        Statistic::MeanDiff => Ok(mean_diff_null(data, labels, numperm, rng)),
        Statistic::Spearman => Ok(correlation_null(data, labels, true, numperm, rng)),
        Statistic::Pearson => Ok(correlation_null(data, labels, false, numperm, rng)),
        Statistic::NonZeroSpearman => Ok(non_zero_null(data, labels, true, numperm, rng)),
        Statistic::NonZeroPearson => Ok(non_zero_null(data, labels, false, numperm, rng)),
        _ => loop_null(statistic, data, labels, numperm, rng),
    }
}

/// Mean difference null via `|X W0 - X W1|`, where column `c` of `W0` (`W1`) carries
/// `1/n0` (`1/n1`) on the samples permutation `c` assigns to group 0 (1).
fn mean_diff_null<R>(
    data: ArrayView2<f64>,
    labels: &[f64],
    numperm: usize,
    rng: &mut R,
) -> PermutationNull
where
    R: Rng + ?Sized,
{
    let statistics = mean_diff(data, labels);

    let n_samples = labels.len();
    let k0 = 1.0 / labels.iter().filter(|&&l| l == 0.0).count() as f64;
    let k1 = 1.0 / labels.iter().filter(|&&l| l == 1.0).count() as f64;

    let mut weights0 = Array2::<f64>::zeros((n_samples, numperm));
    let mut weights1 = Array2::<f64>::zeros((n_samples, numperm));
    let mut permuted = labels.to_vec();
    for perm in 0..numperm {
        permuted.shuffle(rng);
        for (sample, &label) in permuted.iter().enumerate() {
            if label == 0.0 {
                weights0[[sample, perm]] = k0;
            } else if label == 1.0 {
                weights1[[sample, perm]] = k1;
            }
        }
    }

    let null = (data.dot(&weights0) - data.dot(&weights1)).mapv(f64::abs);
    PermutationNull::from_signed(statistics, null)
}

/// Correlation null via `|Xc L|`, the columns of `L` being shuffled centred labels.
fn correlation_null<R>(
    data: ArrayView2<f64>,
    labels: &[f64],
    ranked: bool,
    numperm: usize,
    rng: &mut R,
) -> PermutationNull
where
    R: Rng + ?Sized,
{
    let (centered, centered_labels) = if ranked {
        let ranked_data = rank_data(data);
        (center_rows(ranked_data.view()), center(&average_ranks(labels)))
    } else {
        (center_rows(data), center(labels))
    };

    let statistics = centered.dot(&Array1::from(centered_labels.clone()));

    let mut permuted_labels = Array2::<f64>::zeros((labels.len(), numperm));
    let mut permuted = centered_labels;
    for perm in 0..numperm {
        permuted.shuffle(rng);
        for (sample, &label) in permuted.iter().enumerate() {
            permuted_labels[[sample, perm]] = label;
        }
    }

    let null = centered.dot(&permuted_labels).mapv(f64::abs);
    PermutationNull::from_signed(statistics, null)
}

fn non_zero_null<R>(
    data: ArrayView2<f64>,
    labels: &[f64],
    ranked: bool,
    numperm: usize,
    rng: &mut R,
) -> PermutationNull
where
    R: Rng + ?Sized,
{
    let n_features = data.nrows();
    let mut statistics = Array1::<f64>::zeros(n_features);
    let mut null = Array2::<f64>::zeros((n_features, numperm));

    for (feature, row) in data.rows().into_iter().enumerate() {
        let subset = NonZeroSubset::from_row(row, labels, ranked);
        statistics[feature] = subset.statistic();
        for (perm, value) in subset.null_statistics(numperm, rng).into_iter().enumerate() {
            null[[feature, perm]] = value;
        }
    }

    PermutationNull::from_signed(statistics, null)
}

fn loop_null<R>(
    statistic: &Statistic,
    data: ArrayView2<f64>,
    labels: &[f64],
    numperm: usize,
    rng: &mut R,
) -> anyhow::Result<PermutationNull>
where
    R: Rng + ?Sized,
{
    let statistics = statistic.compute(data, labels)?;
    let observed = statistic.magnitude(&statistics, labels);

    let mut null = Array2::<f64>::zeros((data.nrows(), numperm));
    let mut permuted = labels.to_vec();
    for perm in 0..numperm {
        permuted.shuffle(rng);
        let permuted_statistics = statistic.compute(data, &permuted)?;
        null.column_mut(perm)
            .assign(&statistic.magnitude(&permuted_statistics, &permuted));
    }

    Ok(PermutationNull {
        statistics,
        observed,
        null,
    })
}
