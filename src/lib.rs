//! # discrete-fdr
//!
//! Discrete false discovery rate control for sparse count data such as microbiome
//! abundance tables or single-cell expression matrices.
//!
//! Every feature (row) of a features × samples matrix is tested for association with
//! a per-sample label vector. The null distribution of the test statistic is built by
//! permuting the labels, and the discrete FDR (dsFDR) rule picks a p-value threshold
//! from that permutation null directly, which keeps power on data whose p-values can
//! only take a few distinct values.
//!
//! ## Core Features
//!
//! - **Transforms**: ranking, log2, binary presence and column normalisation
//! - **Statistics**: mean difference, standardised mean difference, Mann-Whitney,
//!   Kruskal-Wallis, Spearman, Pearson, their non-zero variants and custom closures
//! - **FDR rules**: discrete FDR plus Benjamini-Hochberg and Benjamini-Yekutieli on
//!   frequentist permutation p-values
//! - **Sparse Matrix Support**: `CsrMatrix` from nalgebra-sparse through the
//!   [`testing::MatrixDsFdr`] trait
//!
//! ## Quick Start
//!
//! ```
//! use discrete_fdr::testing::{DsFdrConfig, MatrixDsFdr, Statistic};
//! use ndarray::array;
//!
//! let data = array![
//!     [0.0, 1.0, 0.0, 2.0, 9.0, 8.0, 7.0, 9.0],
//!     [3.0, 0.0, 2.0, 1.0, 1.0, 2.0, 0.0, 3.0],
//! ];
//! let labels = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
//!
//! let config = DsFdrConfig::quick().with_seed(7);
//! let result = data.dsfdr(&labels, &Statistic::MeanDiff, &config).unwrap();
//! assert_eq!(result.reject.len(), 2);
//! ```
//!
//! ## Module Organization
//!
//! - **[`testing`]**: transforms, statistics, permutation nulls, p-values and FDR rules

pub mod testing;
