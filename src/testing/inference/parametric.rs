//! Mean- and moment-based statistics.
//!
//! `mean_diff` and `pearson` are linear in the labelling, which is what lets the
//! permutation null for them be computed with matrix products instead of one
//! re-evaluation per permutation.

use crate::testing::utils::{center, get_group_indices};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use statrs::statistics::Statistics;

fn group_means(data: ArrayView2<f64>, labels: &[f64], group: f64) -> Array1<f64> {
    let indices = get_group_indices(labels, group);
    data.select(Axis(1), &indices)
        .mean_axis(Axis(1))
        .unwrap_or_else(|| Array1::from_elem(data.nrows(), f64::NAN))
}

/// `mean(group 1) - mean(group 0)` for every feature.
pub fn mean_diff(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let mean0 = group_means(data, labels, 0.0);
    let mean1 = group_means(data, labels, 1.0);
    mean1 - mean0
}

/// Mean difference scaled by the sum of the two sample standard deviations.
///
/// Features without spread in both groups yield `inf` or `NaN`.
pub fn std_mean_diff(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let group0 = data.select(Axis(1), &get_group_indices(labels, 0.0));
    let group1 = data.select(Axis(1), &get_group_indices(labels, 1.0));

    let statistics: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let x0 = group0.row(row);
            let x1 = group1.row(row);
            let mean_diff = x1.iter().mean() - x0.iter().mean();
            mean_diff / (x1.iter().std_dev() + x0.iter().std_dev())
        })
        .collect();

    Array1::from(statistics)
}

/// Subtract each row's mean from the row.
pub fn center_rows(data: ArrayView2<f64>) -> Array2<f64> {
    let mut centered = data.to_owned();
    let n_samples = centered.ncols();
    if n_samples == 0 {
        return centered;
    }
    for mut row in centered.rows_mut() {
        let mean = row.sum() / n_samples as f64;
        row -= mean;
    }
    centered
}

/// Centred dot product `(x - mean(x)) . (y - mean(y))` of every row against the labels.
pub fn centered_dot(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let centered_labels = Array1::from(center(labels));
    center_rows(data).dot(&centered_labels)
}

pub fn pearson(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    centered_dot(data, labels)
}
