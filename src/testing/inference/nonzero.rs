//! Correlation statistics restricted to the samples in which a feature is present.
//!
//! Each feature becomes its own sub-problem: the samples where it is zero are dropped,
//! together with their labels, and its permutation null only shuffles the labels that
//! remain. Features therefore have different effective sample sizes and never share
//! permutation draws.

use crate::testing::utils::{average_ranks, center};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::Rng;
use rand::seq::SliceRandom;

#[derive(Debug, Clone, PartialEq)]
pub struct NonZeroSubset {
    /// Centred feature values on its non-zero samples
    values: Vec<f64>,
    /// Centred labels of the same samples
    labels: Vec<f64>,
}

impl NonZeroSubset {
    /// Build the sub-problem for one feature row. With `ranked`, values and labels are
    /// rank transformed within the subset before centring.
    pub fn from_row(row: ArrayView1<f64>, labels: &[f64], ranked: bool) -> Self {
        let (values, subset_labels): (Vec<f64>, Vec<f64>) = row
            .iter()
            .zip(labels.iter())
            .filter(|&(&value, _)| value != 0.0)
            .map(|(&value, &label)| (value, label))
            .unzip();

        let (values, subset_labels) = if ranked {
            (average_ranks(&values), average_ranks(&subset_labels))
        } else {
            (values, subset_labels)
        };

        NonZeroSubset {
            values: center(&values),
            labels: center(&subset_labels),
        }
    }

    /// Number of non-zero samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Signed centred dot product. Zero for a feature without non-zero samples.
    pub fn statistic(&self) -> f64 {
        dot(&self.values, &self.labels)
    }

    /// Absolute statistics of `numperm` independent shuffles of the subset labels.
    pub fn null_statistics<R>(&self, numperm: usize, rng: &mut R) -> Vec<f64>
    where
        R: Rng + ?Sized,
    {
        let mut shuffled = self.labels.clone();
        (0..numperm)
            .map(|_| {
                shuffled.shuffle(rng);
                dot(&self.values, &shuffled).abs()
            })
            .collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Observed non-zero correlation statistic of every feature.
pub fn non_zero_correlation(data: ArrayView2<f64>, labels: &[f64], ranked: bool) -> Array1<f64> {
    data.rows()
        .into_iter()
        .map(|row| NonZeroSubset::from_row(row, labels, ranked).statistic())
        .collect()
}
