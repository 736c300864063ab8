use std::cmp::Ordering;

use nalgebra_sparse::CsrMatrix;
use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

const REL_TOL: f64 = 1e-5;
const ABS_TOL: f64 = 1e-8;

pub fn extract_unique_groups(labels: &[f64]) -> Vec<f64> {
    let mut unique_groups = labels.to_vec();
    unique_groups.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    unique_groups.dedup();
    unique_groups
}

/// Get sample indices carrying the given label
pub fn get_group_indices(labels: &[f64], group: f64) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter_map(|(i, &g)| if g == group { Some(i) } else { None })
        .collect()
}

/// Average ranks (1-based) of `values`, tied values share the mean of their ranks.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let val = values[order[i]];
        let mut j = i + 1;

        // Find tied values
        while j < order.len() && values[order[j]] == val {
            j += 1;
        }

        let rank = (i + j - 1) as f64 / 2.0 + 1.0;
        for &idx in &order[i..j] {
            ranks[idx] = rank;
        }

        i = j;
    }

    ranks
}

/// Sizes of the runs of equal values, used for rank tie corrections.
pub fn tie_counts(values: &[f64]) -> Vec<usize> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut counts = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        counts.push(j - i);
        i = j;
    }
    counts
}

/// Subtract the mean from every value.
pub fn center(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|&v| v - mean).collect()
}

/// Floating point closeness with numpy's default tolerances.
pub fn is_close(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= ABS_TOL + REL_TOL * b.abs()
}

/// Densify a features × samples sparse matrix.
pub fn csr_to_dense<T>(matrix: &CsrMatrix<T>) -> anyhow::Result<Array2<f64>>
where
    T: FloatOpsTS,
{
    let mut dense = Array2::zeros((matrix.nrows(), matrix.ncols()));
    for (row, col, value) in matrix.triplet_iter() {
        dense[[row, col]] = num_traits::ToPrimitive::to_f64(value).ok_or_else(|| {
            anyhow::anyhow!("Value at row {}, column {} is not representable as f64", row, col)
        })?;
    }
    Ok(dense)
}
