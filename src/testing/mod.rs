use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use nalgebra_sparse::CsrMatrix;
use ndarray::{Array2, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use single_utilities::traits::FloatOpsTS;

use crate::testing::correction::discrete::{DiscreteThreshold, dsfdr_reject};
use crate::testing::correction::{
    benjamini_hochberg_correction, benjamini_yekutieli_correction, frequentist_pvalues,
    reject_adjusted,
};
use crate::testing::permutation::permutation_null;
use crate::testing::pvalue::{permutation_pvalues, snap_ties};
use crate::testing::utils::csr_to_dense;

pub mod correction;
pub mod inference;
pub mod permutation;
pub mod pvalue;
pub mod transform;

pub mod utils;

pub use inference::{CustomStatistic, Statistic};
pub use transform::Transform;

/// Rule turning permutation p-values into reject decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FdrMethod {
    /// Discrete FDR threshold search over the permutation null
    #[default]
    DsFdr,
    /// Benjamini-Hochberg on frequentist permutation p-values
    BhFdr,
    /// Benjamini-Yekutieli on frequentist permutation p-values
    ByFdr,
}

impl FdrMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FdrMethod::DsFdr => "dsfdr",
            FdrMethod::BhFdr => "bhfdr",
            FdrMethod::ByFdr => "byfdr",
        }
    }
}

impl fmt::Display for FdrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FdrMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dsfdr" => Ok(FdrMethod::DsFdr),
            "bhfdr" => Ok(FdrMethod::BhFdr),
            "byfdr" => Ok(FdrMethod::ByFdr),
            other => Err(anyhow::anyhow!("unsupported FDR method {}", other)),
        }
    }
}

/// Configuration of one discrete FDR run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DsFdrConfig {
    /// Transformation applied to the data before the statistic
    pub transform: Transform,
    /// Target FDR level, in (0, 1]
    pub alpha: f64,
    /// Number of label permutations
    pub numperm: usize,
    /// Decision rule applied to the permutation p-values
    pub fdr_method: FdrMethod,
    /// Seed for the permutation draws, a fresh random seed is used when absent
    pub seed: Option<u64>,
}

impl Default for DsFdrConfig {
    fn default() -> Self {
        Self {
            transform: Transform::RankData,
            alpha: 0.1,
            numperm: 1000,
            fdr_method: FdrMethod::DsFdr,
            seed: None,
        }
    }
}

impl DsFdrConfig {
    /// Fewer permutations, for exploration and tests.
    pub fn quick() -> Self {
        Self {
            numperm: 100,
            ..Default::default()
        }
    }

    /// More permutations, for final analyses.
    pub fn thorough() -> Self {
        Self {
            numperm: 10000,
            ..Default::default()
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_numperm(mut self, numperm: usize) -> Self {
        self.numperm = numperm;
        self
    }

    pub fn with_fdr_method(mut self, fdr_method: FdrMethod) -> Self {
        self.fdr_method = fdr_method;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.numperm == 0 {
            return Err(anyhow::anyhow!("Number of permutations must be positive"));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(anyhow::anyhow!(
                "Alpha must be in (0, 1], got {}",
                self.alpha
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DsFdrResult {
    /// True where the null hypothesis is rejected
    pub reject: Vec<bool>,
    /// Signed observed statistic per feature (effect size)
    pub statistics: Vec<f64>,
    /// Permutation p-value per feature
    pub p_values: Vec<f64>,
    /// Rule that produced `reject`
    pub fdr_method: FdrMethod,
    /// Accepted p-value threshold of the discrete rule
    pub threshold: Option<f64>,
    /// `(threshold, estimated fdr)` pairs visited by the discrete rule
    pub fdr_curve: Vec<(f64, f64)>,
    /// Global metadata about the run
    pub global_metadata: HashMap<String, String>,
}

impl DsFdrResult {
    pub fn new(
        reject: Vec<bool>,
        statistics: Vec<f64>,
        p_values: Vec<f64>,
        fdr_method: FdrMethod,
    ) -> Self {
        DsFdrResult {
            reject,
            statistics,
            p_values,
            fdr_method,
            threshold: None,
            fdr_curve: Vec::new(),
            global_metadata: HashMap::new(),
        }
    }

    /// Attach the discrete threshold search outcome
    pub fn with_threshold(mut self, threshold: DiscreteThreshold) -> Self {
        self.threshold = threshold.threshold;
        self.fdr_curve = threshold.fdr_curve;
        self
    }

    pub fn with_global_metadata(mut self, key: &str, value: &str) -> Self {
        self.global_metadata
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn n_features(&self) -> usize {
        self.reject.len()
    }

    /// Indices of the rejected features
    pub fn discoveries(&self) -> Vec<usize> {
        self.reject
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| if r { Some(i) } else { None })
            .collect()
    }

    pub fn num_discoveries(&self) -> usize {
        self.reject.iter().filter(|&&r| r).count()
    }

    /// Get top n features by p-value, tied features keep their input order
    pub fn top_features(&self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.p_values.len()).collect();
        indices.sort_by(|&a, &b| self.p_values[a].total_cmp(&self.p_values[b]));
        indices.truncate(n);
        indices
    }
}

/// Discrete FDR test of every feature (row) of `data` against the sample `labels`.
///
/// Permutations are drawn from a `ChaCha8Rng` seeded with `config.seed`, or from a
/// randomly seeded one when no seed is set.
pub fn dsfdr(
    data: ArrayView2<f64>,
    labels: &[f64],
    statistic: &Statistic,
    config: &DsFdrConfig,
) -> anyhow::Result<DsFdrResult> {
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    };
    dsfdr_with_rng(data, labels, statistic, config, &mut rng)
}

/// [`dsfdr`] with an explicit random source; `config.seed` is ignored.
pub fn dsfdr_with_rng<R>(
    data: ArrayView2<f64>,
    labels: &[f64],
    statistic: &Statistic,
    config: &DsFdrConfig,
    rng: &mut R,
) -> anyhow::Result<DsFdrResult>
where
    R: Rng + ?Sized,
{
    config.validate()?;
    if labels.len() != data.ncols() {
        return Err(anyhow::anyhow!(
            "Label vector length {} does not match sample count {}",
            labels.len(),
            data.ncols()
        ));
    }
    statistic.validate_labels(labels)?;

    let n_features = data.nrows();
    let transformed = config.transform.apply(data);

    let mut null = permutation_null(statistic, transformed.view(), labels, config.numperm, rng)?;

    let non_finite = null.statistics.iter().filter(|s| !s.is_finite()).count();
    if non_finite > 0 {
        warn!(
            "{} of {} features have a non-finite {} statistic",
            non_finite, n_features, statistic
        );
    }

    snap_ties(null.observed.view(), &mut null.null);
    let statistics = null.statistics.to_vec();

    let result = match config.fdr_method {
        FdrMethod::DsFdr => {
            debug!("Ranking {} permutation statistics per feature", config.numperm + 1);
            let pvalues = permutation_pvalues(null.observed.view(), &null.null);
            let (reject, threshold) =
                dsfdr_reject(pvalues.pvals.view(), pvalues.null_pvals.view(), config.alpha);
            DsFdrResult::new(reject, statistics, pvalues.pvals.to_vec(), config.fdr_method)
                .with_threshold(threshold)
        }
        FdrMethod::BhFdr | FdrMethod::ByFdr => {
            let p_values = frequentist_pvalues(null.observed.view(), &null.null).to_vec();
            let reject = if p_values.is_empty() {
                Vec::new()
            } else {
                let adjusted = match config.fdr_method {
                    FdrMethod::ByFdr => benjamini_yekutieli_correction(&p_values)?,
                    _ => benjamini_hochberg_correction(&p_values)?,
                };
                reject_adjusted(&adjusted, config.alpha)
            };
            DsFdrResult::new(reject, statistics, p_values, config.fdr_method)
        }
    };

    info!(
        "{} with {} statistic rejected {} of {} features at alpha {}",
        config.fdr_method,
        statistic,
        result.num_discoveries(),
        n_features,
        config.alpha
    );

    Ok(result
        .with_global_metadata("statistic", statistic.name())
        .with_global_metadata("transform", config.transform.name())
        .with_global_metadata("numperm", &config.numperm.to_string()))
}

/// Discrete FDR testing on a features × samples matrix.
pub trait MatrixDsFdr {
    fn dsfdr(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
    ) -> anyhow::Result<DsFdrResult>;

    fn dsfdr_with_rng<R>(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
        rng: &mut R,
    ) -> anyhow::Result<DsFdrResult>
    where
        R: Rng + ?Sized;
}

impl MatrixDsFdr for Array2<f64> {
    fn dsfdr(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
    ) -> anyhow::Result<DsFdrResult> {
        dsfdr(self.view(), labels, statistic, config)
    }

    fn dsfdr_with_rng<R>(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
        rng: &mut R,
    ) -> anyhow::Result<DsFdrResult>
    where
        R: Rng + ?Sized,
    {
        dsfdr_with_rng(self.view(), labels, statistic, config, rng)
    }
}

impl<T> MatrixDsFdr for CsrMatrix<T>
where
    T: FloatOpsTS,
{
    fn dsfdr(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
    ) -> anyhow::Result<DsFdrResult> {
        let dense = csr_to_dense(self)?;
        dsfdr(dense.view(), labels, statistic, config)
    }

    fn dsfdr_with_rng<R>(
        &self,
        labels: &[f64],
        statistic: &Statistic,
        config: &DsFdrConfig,
        rng: &mut R,
    ) -> anyhow::Result<DsFdrResult>
    where
        R: Rng + ?Sized,
    {
        let dense = csr_to_dense(self)?;
        dsfdr_with_rng(dense.view(), labels, statistic, config, rng)
    }
}
