//! Data transformations applied to the feature matrix before any statistic is computed.
//!
//! Every transform returns a new matrix of the same shape; the input view is never
//! modified.

use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::testing::utils::average_ranks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Rank each feature across samples
    #[default]
    RankData,
    /// log2 with values below 2 clipped to 2
    Log2Data,
    /// Presence/absence
    BinaryData,
    /// Constant sum per sample
    NormData,
    None,
}

impl Transform {
    pub fn apply(&self, data: ArrayView2<f64>) -> Array2<f64> {
        debug!(
            "Applying {} transform to {} features x {} samples",
            self,
            data.nrows(),
            data.ncols()
        );
        match self {
            Transform::RankData => rank_data(data),
            Transform::Log2Data => log2_data(data),
            Transform::BinaryData => binary_data(data),
            Transform::NormData => norm_data(data),
            Transform::None => data.to_owned(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::RankData => "rankdata",
            Transform::Log2Data => "log2data",
            Transform::BinaryData => "binarydata",
            Transform::NormData => "normdata",
            Transform::None => "none",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rankdata" => Ok(Transform::RankData),
            "log2data" => Ok(Transform::Log2Data),
            "binarydata" => Ok(Transform::BinaryData),
            "normdata" => Ok(Transform::NormData),
            "none" | "" => Ok(Transform::None),
            other => Err(anyhow::anyhow!("unsupported transform {}", other)),
        }
    }
}

/// Replace every row with its average ranks.
pub fn rank_data(data: ArrayView2<f64>) -> Array2<f64> {
    let mut ranked = Array2::zeros(data.raw_dim());
    Zip::from(ranked.rows_mut())
        .and(data.rows())
        .par_for_each(|mut out, row| {
            let ranks = average_ranks(&row.to_vec());
            for (dst, rank) in out.iter_mut().zip(ranks) {
                *dst = rank;
            }
        });
    ranked
}

pub fn log2_data(data: ArrayView2<f64>) -> Array2<f64> {
    data.mapv(|v| (if v < 2.0 { 2.0 } else { v }).log2())
}

pub fn binary_data(data: ArrayView2<f64>) -> Array2<f64> {
    data.mapv(|v| if v != 0.0 { 1.0 } else { 0.0 })
}

/// Divide each sample (column) by its total. All-zero columns become `NaN`.
pub fn norm_data(data: ArrayView2<f64>) -> Array2<f64> {
    let totals = data.sum_axis(Axis(0));
    let mut normed = data.to_owned();
    for (mut column, &total) in normed.axis_iter_mut(Axis(1)).zip(totals.iter()) {
        column.mapv_inplace(|v| v / total);
    }
    normed
}
