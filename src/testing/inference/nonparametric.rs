use crate::testing::inference::parametric::centered_dot;
use crate::testing::transform::rank_data;
use crate::testing::utils::{average_ranks, extract_unique_groups, get_group_indices, tie_counts};
use ndarray::{Array1, ArrayView2};
use rayon::iter::IntoParallelIterator;
use rayon::iter::ParallelIterator;

/// Mann-Whitney U statistic of group 0 against group 1 for every feature.
pub fn mann_whitney(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let group0_indices = get_group_indices(labels, 0.0);
    let group1_indices = get_group_indices(labels, 1.0);

    let statistics: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let values = data.row(row);
            let x: Vec<f64> = group0_indices.iter().map(|&col| values[col]).collect();
            let y: Vec<f64> = group1_indices.iter().map(|&col| values[col]).collect();
            mann_whitney_u(&x, &y)
        })
        .collect();

    Array1::from(statistics)
}

/// U statistic of `x` over the pooled sample: `R_x - nx * (nx + 1) / 2`.
///
/// Ranges over `[0, nx * ny]` with null mean `nx * ny / 2`; low when `x` ranks below `y`.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> f64 {
    let nx = x.len();
    let ny = y.len();

    if nx == 0 || ny == 0 {
        return f64::NAN; // Insufficient data
    }

    let mut combined: Vec<f64> = Vec::with_capacity(nx + ny);
    combined.extend_from_slice(x);
    combined.extend_from_slice(y);

    // Ranks with ties averaged, x occupies the head
    let ranks = average_ranks(&combined);
    let rank_sum_x: f64 = ranks[..nx].iter().sum();

    rank_sum_x - (nx * (nx + 1)) as f64 / 2.0
}

/// Kruskal-Wallis H statistic of every feature across all label groups.
pub fn kruskal_wallis(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let groups: Vec<Vec<usize>> = extract_unique_groups(labels)
        .into_iter()
        .map(|group| get_group_indices(labels, group))
        .collect();

    let statistics: Vec<f64> = (0..data.nrows())
        .into_par_iter()
        .map(|row| {
            let values = data.row(row);
            let samples: Vec<Vec<f64>> = groups
                .iter()
                .map(|indices| indices.iter().map(|&col| values[col]).collect())
                .collect();
            kruskal_wallis_h(&samples)
        })
        .collect();

    Array1::from(statistics)
}

/// Tie-corrected Kruskal-Wallis H. `NaN` when every value is tied.
pub fn kruskal_wallis_h(groups: &[Vec<f64>]) -> f64 {
    let pooled: Vec<f64> = groups.concat();
    let n = pooled.len() as f64;
    if pooled.len() < 2 {
        return f64::NAN;
    }

    let ranks = average_ranks(&pooled);
    let mut offset = 0;
    let mut weighted = 0.0;
    for group in groups {
        if !group.is_empty() {
            let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
            weighted += rank_sum * rank_sum / group.len() as f64;
        }
        offset += group.len();
    }

    let h = 12.0 / (n * (n + 1.0)) * weighted - 3.0 * (n + 1.0);

    let ties: f64 = tie_counts(&pooled)
        .into_iter()
        .map(|t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();
    let correction = 1.0 - ties / (n * n * n - n);
    if correction <= 0.0 {
        return f64::NAN;
    }

    h / correction
}

/// Spearman-type statistic: centred dot product of row ranks against label ranks.
pub fn spearman(data: ArrayView2<f64>, labels: &[f64]) -> Array1<f64> {
    let ranked = rank_data(data);
    centered_dot(ranked.view(), &average_ranks(labels))
}
