use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, ArrayView2};

use crate::testing::utils::extract_unique_groups;

pub mod nonparametric;

pub mod nonzero;

pub mod parametric;

/// A user supplied statistic, evaluated once on the observed labels and once per permutation.
pub trait CustomStatistic: Send + Sync {
    /// One statistic per feature (row) of `data`.
    fn compute(&self, data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64>;
}

impl<F> CustomStatistic for F
where
    F: Fn(ArrayView2<'_, f64>, &[f64]) -> Array1<f64> + Send + Sync,
{
    fn compute(&self, data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
        self(data, labels)
    }
}

/// Test statistic computed per feature.
#[derive(Clone)]
pub enum Statistic {
    /// mean(group 1) - mean(group 0)
    MeanDiff,
    /// (mean(group 1) - mean(group 0)) / (sd(group 1) + sd(group 0))
    StdMeanDiff,
    /// Mann-Whitney U of group 0, ranked by its distance from `n0 * n1 / 2`
    MannWhitney,
    /// Kruskal-Wallis H across any number of groups
    KruWallis,
    /// Rank correlation against numeric labels
    Spearman,
    /// Linear correlation against numeric labels
    Pearson,
    /// Spearman restricted to each feature's non-zero samples
    NonZeroSpearman,
    /// Pearson restricted to each feature's non-zero samples
    NonZeroPearson,
    Custom(Arc<dyn CustomStatistic>),
}

/// How the permutation null of a statistic is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullMode {
    /// All permutations at once through matrix products
    Vectorized,
    /// One full re-evaluation per permutation
    Loop,
    /// Independent permutations per feature
    PerFeature,
}

impl Statistic {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(ArrayView2<'_, f64>, &[f64]) -> Array1<f64> + Send + Sync + 'static,
    {
        Statistic::Custom(Arc::new(f))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::MeanDiff => "meandiff",
            Statistic::StdMeanDiff => "stdmeandiff",
            Statistic::MannWhitney => "mannwhitney",
            Statistic::KruWallis => "kruwallis",
            Statistic::Spearman => "spearman",
            Statistic::Pearson => "pearson",
            Statistic::NonZeroSpearman => "nonzerospearman",
            Statistic::NonZeroPearson => "nonzeropearson",
            Statistic::Custom(_) => "custom",
        }
    }

    pub fn null_mode(&self) -> NullMode {
        match self {
            Statistic::MeanDiff | Statistic::Spearman | Statistic::Pearson => NullMode::Vectorized,
            Statistic::NonZeroSpearman | Statistic::NonZeroPearson => NullMode::PerFeature,
            _ => NullMode::Loop,
        }
    }

    /// Statistics that compare label 0 against label 1.
    pub fn is_two_group(&self) -> bool {
        matches!(
            self,
            Statistic::MeanDiff | Statistic::StdMeanDiff | Statistic::MannWhitney
        )
    }

    /// Check that the labels fit the statistic family.
    pub fn validate_labels(&self, labels: &[f64]) -> anyhow::Result<()> {
        if self.is_two_group() {
            let groups = extract_unique_groups(labels);
            if groups != [0.0, 1.0] {
                return Err(anyhow::anyhow!(
                    "{} requires labels with exactly the groups 0 and 1, got {:?}",
                    self.name(),
                    groups
                ));
            }
        }
        if let Statistic::KruWallis = self {
            let groups = extract_unique_groups(labels);
            if groups.len() < 2 {
                return Err(anyhow::anyhow!(
                    "kruwallis requires at least 2 groups, got {}",
                    groups.len()
                ));
            }
        }
        Ok(())
    }

    /// Two-sided extremeness of `statistics`, the quantity the permutation null ranks.
    ///
    /// Mann-Whitney U is measured from its null mean `n0 * n1 / 2`; every other
    /// statistic is symmetric around zero and uses its absolute value.
    pub fn magnitude(&self, statistics: &Array1<f64>, labels: &[f64]) -> Array1<f64> {
        match self {
            Statistic::MannWhitney => {
                let n0 = labels.iter().filter(|&&l| l == 0.0).count();
                let n1 = labels.iter().filter(|&&l| l == 1.0).count();
                let mean_u = (n0 * n1) as f64 / 2.0;
                statistics.mapv(|u| (u - mean_u).abs())
            }
            _ => statistics.mapv(f64::abs),
        }
    }

    /// Signed statistic of every feature for one labelling.
    pub fn compute(&self, data: ArrayView2<f64>, labels: &[f64]) -> anyhow::Result<Array1<f64>> {
        let statistics = match self {
            Statistic::MeanDiff => parametric::mean_diff(data, labels),
            Statistic::StdMeanDiff => parametric::std_mean_diff(data, labels),
            Statistic::MannWhitney => nonparametric::mann_whitney(data, labels),
            Statistic::KruWallis => nonparametric::kruskal_wallis(data, labels),
            Statistic::Spearman => nonparametric::spearman(data, labels),
            Statistic::Pearson => parametric::pearson(data, labels),
            Statistic::NonZeroSpearman => nonzero::non_zero_correlation(data, labels, true),
            Statistic::NonZeroPearson => nonzero::non_zero_correlation(data, labels, false),
            Statistic::Custom(custom) => {
                let statistics = custom.compute(data, labels);
                if statistics.len() != data.nrows() {
                    return Err(anyhow::anyhow!(
                        "Custom statistic returned {} values for {} features",
                        statistics.len(),
                        data.nrows()
                    ));
                }
                statistics
            }
        };
        Ok(statistics)
    }
}

impl fmt::Debug for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Custom(_) => f.write_str("Custom(..)"),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Statistic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meandiff" => Ok(Statistic::MeanDiff),
            "stdmeandiff" => Ok(Statistic::StdMeanDiff),
            "mannwhitney" => Ok(Statistic::MannWhitney),
            "kruwallis" => Ok(Statistic::KruWallis),
            "spearman" => Ok(Statistic::Spearman),
            "pearson" => Ok(Statistic::Pearson),
            "nonzerospearman" => Ok(Statistic::NonZeroSpearman),
            "nonzeropearson" => Ok(Statistic::NonZeroPearson),
            other => Err(anyhow::anyhow!("unsupported method {}", other)),
        }
    }
}
