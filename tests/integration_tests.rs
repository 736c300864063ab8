// End-to-end tests of the dsfdr pipeline on small, fully controlled matrices.

#[cfg(test)]
mod integration_tests {
    use approx::assert_relative_eq;
    use discrete_fdr::testing::permutation::permutation_null;
    use discrete_fdr::testing::{
        DsFdrConfig, FdrMethod, MatrixDsFdr, Statistic, Transform, dsfdr, dsfdr_with_rng,
    };
    use ndarray::{Array1, Array2, ArrayView2, array};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_group_labels(n0: usize, n1: usize) -> Vec<f64> {
        let mut labels = vec![0.0; n0];
        labels.extend(vec![1.0; n1]);
        labels
    }

    /// Features 0..n_signal shift with the group, the rest are group independent.
    fn mixed_matrix(n_signal: usize, n_noise: usize, n_per_group: usize) -> Array2<f64> {
        let n_samples = 2 * n_per_group;
        Array2::from_shape_fn((n_signal + n_noise, n_samples), |(feature, sample)| {
            let base = ((feature * 7 + sample * 3) % 5) as f64;
            if feature < n_signal && sample >= n_per_group {
                base + 20.0
            } else {
                base
            }
        })
    }

    #[test]
    fn test_single_feature_mean_diff() {
        let data = array![[1.0, 1.0, 1.0, 5.0, 5.0, 5.0]];
        let labels = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let config = DsFdrConfig::default()
            .with_transform(Transform::None)
            .with_numperm(100)
            .with_alpha(1.0);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result =
            dsfdr_with_rng(data.view(), &labels, &Statistic::MeanDiff, &config, &mut rng).unwrap();
        assert_relative_eq!(result.statistics[0], 4.0);

        // Same draws again to count the permutations matching the observed shift
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let null =
            permutation_null(&Statistic::MeanDiff, data.view(), &labels, 100, &mut rng).unwrap();
        let at_least = null
            .null
            .iter()
            .filter(|&&u| u >= 4.0 - 1e-6)
            .count();
        let expected_p = (at_least + 1) as f64 / 101.0;
        assert_relative_eq!(result.p_values[0], expected_p, epsilon = 1e-12);
        assert!(result.reject[0]);

        // A single feature is rejected exactly when alpha reaches its p-value
        let strict = config.clone().with_alpha(expected_p * 0.99);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result =
            dsfdr_with_rng(data.view(), &labels, &Statistic::MeanDiff, &strict, &mut rng).unwrap();
        assert!(!result.reject[0]);

        let lenient = config.with_alpha(expected_p);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let result =
            dsfdr_with_rng(data.view(), &labels, &Statistic::MeanDiff, &lenient, &mut rng).unwrap();
        assert!(result.reject[0]);
    }

    #[test]
    fn test_extreme_feature_gets_minimum_pvalue() {
        let labels = two_group_labels(15, 15);
        let row: Vec<f64> = labels.iter().map(|&l| if l == 0.0 { 1.0 } else { 5.0 }).collect();
        let data = Array2::from_shape_vec((1, 30), row).unwrap();
        let config = DsFdrConfig::quick()
            .with_transform(Transform::None)
            .with_seed(5);

        let result = dsfdr(data.view(), &labels, &Statistic::MeanDiff, &config).unwrap();
        assert_relative_eq!(result.statistics[0], 4.0);
        assert_relative_eq!(result.p_values[0], 1.0 / 101.0);
        assert!(result.reject[0]);
    }

    #[test]
    fn test_constant_feature_is_not_rejected() {
        let mut data = mixed_matrix(4, 0, 8);
        data.row_mut(0).fill(3.0);
        let labels = two_group_labels(8, 8);

        for statistic in [Statistic::MeanDiff, Statistic::MannWhitney, Statistic::StdMeanDiff] {
            let config = DsFdrConfig::quick().with_seed(2).with_alpha(0.5);
            let result = data.dsfdr(&labels, &statistic, &config).unwrap();
            assert_eq!(result.p_values[0], 1.0, "{}", statistic);
            assert!(!result.reject[0], "{}", statistic);
        }
    }

    #[test]
    fn test_nan_statistic_is_never_rejected() {
        let labels = two_group_labels(8, 8);
        // Feature 0 is constant (stdmeandiff 0 / 0), feature 1 fully separated
        let separated: Vec<f64> = (0..16)
            .map(|i| if i < 8 { i as f64 } else { 50.0 + i as f64 })
            .collect();
        let mut data = Array2::<f64>::from_elem((2, 16), 4.0);
        data.row_mut(1).assign(&Array1::from(separated));

        for fdr_method in [FdrMethod::DsFdr, FdrMethod::BhFdr, FdrMethod::ByFdr] {
            let config = DsFdrConfig::default()
                .with_numperm(200)
                .with_alpha(0.5)
                .with_fdr_method(fdr_method)
                .with_seed(1);
            let result = data.dsfdr(&labels, &Statistic::StdMeanDiff, &config).unwrap();
            assert!(result.statistics[0].is_nan(), "{}", fdr_method);
            assert_eq!(result.p_values[0], 1.0, "{}", fdr_method);
            assert!(!result.reject[0], "{}", fdr_method);
            assert!(result.reject[1], "{}", fdr_method);
        }
    }

    #[test]
    fn test_output_shapes_and_pvalue_range() {
        let data = mixed_matrix(3, 7, 6);
        let labels = two_group_labels(6, 6);
        let numeric: Vec<f64> = (0..12).map(|i| i as f64).collect();

        let cases = [
            (Statistic::MeanDiff, labels.clone()),
            (Statistic::StdMeanDiff, labels.clone()),
            (Statistic::MannWhitney, labels.clone()),
            (Statistic::KruWallis, labels.clone()),
            (Statistic::Spearman, numeric.clone()),
            (Statistic::Pearson, numeric.clone()),
            (Statistic::NonZeroSpearman, numeric.clone()),
            (Statistic::NonZeroPearson, numeric),
        ];

        for (statistic, labels) in cases {
            for fdr_method in [FdrMethod::DsFdr, FdrMethod::BhFdr, FdrMethod::ByFdr] {
                let config = DsFdrConfig::quick()
                    .with_numperm(50)
                    .with_fdr_method(fdr_method)
                    .with_seed(9);
                let result = data.dsfdr(&labels, &statistic, &config).unwrap();
                assert_eq!(result.reject.len(), 10);
                assert_eq!(result.statistics.len(), 10);
                assert_eq!(result.p_values.len(), 10);
                assert!(
                    result.p_values.iter().all(|&p| p > 0.0 && p <= 1.0),
                    "{} {}",
                    statistic,
                    fdr_method
                );
            }
        }
    }

    #[test]
    fn test_signal_features_are_discovered() {
        let data = mixed_matrix(5, 20, 10);
        let labels = two_group_labels(10, 10);
        let config = DsFdrConfig::default().with_numperm(200).with_seed(3);

        let result = data.dsfdr(&labels, &Statistic::MeanDiff, &config).unwrap();
        for feature in 0..5 {
            assert!(result.reject[feature], "feature {} missed", feature);
            assert!(result.statistics[feature] > 0.0);
        }
        assert!(result.threshold.is_some());
        assert!(!result.fdr_curve.is_empty());
        assert_eq!(&result.top_features(5)[..], &result.discoveries()[..5]);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let data = mixed_matrix(3, 10, 6);
        let labels = two_group_labels(6, 6);
        let config = DsFdrConfig::quick().with_seed(123);

        let a = data.dsfdr(&labels, &Statistic::MannWhitney, &config).unwrap();
        let b = data.dsfdr(&labels, &Statistic::MannWhitney, &config).unwrap();
        assert_eq!(a.p_values, b.p_values);
        assert_eq!(a.reject, b.reject);
        assert_eq!(a.statistics, b.statistics);
    }

    #[test]
    fn test_discoveries_grow_with_alpha() {
        let data = mixed_matrix(4, 16, 5);
        let labels = two_group_labels(5, 5);

        let mut previous: Option<Vec<bool>> = None;
        for alpha in [0.01, 0.05, 0.1, 0.25, 0.5, 1.0] {
            let config = DsFdrConfig::quick().with_alpha(alpha).with_seed(77);
            let result = data.dsfdr(&labels, &Statistic::MeanDiff, &config).unwrap();
            if let Some(previous) = previous {
                for (before, now) in previous.iter().zip(result.reject.iter()) {
                    assert!(!before || *now);
                }
            }
            previous = Some(result.reject);
        }
    }

    #[test]
    fn test_alpha_one_rejects_everything() {
        let data = mixed_matrix(2, 6, 6);
        let labels = two_group_labels(6, 6);
        let config = DsFdrConfig::quick().with_alpha(1.0).with_seed(4);

        let result = data.dsfdr(&labels, &Statistic::MeanDiff, &config).unwrap();
        assert!(result.reject.iter().all(|&r| r));
    }

    #[test]
    fn test_zero_permutations_is_an_error() {
        let data = mixed_matrix(1, 1, 3);
        let labels = two_group_labels(3, 3);
        let config = DsFdrConfig::default().with_numperm(0);

        let err = data
            .dsfdr(&labels, &Statistic::MeanDiff, &config)
            .unwrap_err();
        assert_eq!(err.to_string(), "Number of permutations must be positive");
    }

    #[test]
    fn test_empty_matrix() {
        let data = Array2::<f64>::zeros((0, 6));
        let labels = two_group_labels(3, 3);
        for fdr_method in [FdrMethod::DsFdr, FdrMethod::BhFdr] {
            let config = DsFdrConfig::quick().with_fdr_method(fdr_method).with_seed(1);
            let result = data.dsfdr(&labels, &Statistic::MeanDiff, &config).unwrap();
            assert_eq!(result.n_features(), 0);
            assert_eq!(result.num_discoveries(), 0);
        }
    }

    #[test]
    fn test_frequentist_rules() {
        let data = mixed_matrix(3, 5, 8);
        let labels = two_group_labels(8, 8);

        let bh = DsFdrConfig::quick().with_fdr_method(FdrMethod::BhFdr).with_seed(8);
        let by = bh.clone().with_fdr_method(FdrMethod::ByFdr);
        let bh = data.dsfdr(&labels, &Statistic::MeanDiff, &bh).unwrap();
        let by = data.dsfdr(&labels, &Statistic::MeanDiff, &by).unwrap();

        // Same draws give the same frequentist p-values under both rules
        assert_eq!(bh.p_values, by.p_values);
        assert!(bh.p_values.iter().all(|&p| p >= 1.0 / 101.0));
        assert!(by.num_discoveries() <= bh.num_discoveries());
        assert!(bh.threshold.is_none());
        for feature in 0..3 {
            assert!(bh.reject[feature]);
        }
    }

    #[test]
    fn test_custom_statistic() {
        let data = mixed_matrix(2, 4, 6);
        let labels = two_group_labels(6, 6);
        let statistic = Statistic::custom(|data: ArrayView2<'_, f64>, labels: &[f64]| {
            Array1::from_iter(data.rows().into_iter().map(|row| {
                row.iter()
                    .zip(labels)
                    .map(|(&v, &l)| if l == 1.0 { v } else { -v })
                    .sum::<f64>()
            }))
        });
        let config = DsFdrConfig::quick()
            .with_transform(Transform::None)
            .with_seed(6);

        let result = data.dsfdr(&labels, &statistic, &config).unwrap();
        assert_eq!(result.global_metadata["statistic"], "custom");
        assert!(result.statistics[0] > 100.0);
        assert!(result.reject[0] && result.reject[1]);
    }

    #[test]
    fn test_custom_statistic_with_wrong_length() {
        let data = mixed_matrix(2, 2, 3);
        let labels = two_group_labels(3, 3);
        let statistic = Statistic::custom(|_: ArrayView2<'_, f64>, _: &[f64]| Array1::zeros(1));

        let err = data
            .dsfdr(&labels, &statistic, &DsFdrConfig::quick().with_seed(1))
            .unwrap_err();
        assert!(err.to_string().contains("Custom statistic returned 1 values for 4 features"));
    }

    #[test]
    fn test_kruskal_wallis_three_groups() {
        let labels = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0];
        let data = array![
            [1.0, 2.0, 1.0, 0.0, 10.0, 11.0, 12.0, 10.0, 30.0, 31.0, 29.0, 33.0],
            [1.0, 5.0, 2.0, 4.0, 3.0, 2.0, 5.0, 1.0, 4.0, 1.0, 3.0, 2.0],
        ];
        let config = DsFdrConfig::quick().with_numperm(200).with_seed(21);

        let result = data.dsfdr(&labels, &Statistic::KruWallis, &config).unwrap();
        assert!(result.statistics[0] > result.statistics[1]);
        assert!(result.p_values[0] < 0.05);
        assert!(result.p_values[1] > 0.05);
    }

    #[test]
    fn test_config_round_trip_through_json() {
        let config = DsFdrConfig::thorough()
            .with_transform(Transform::NormData)
            .with_fdr_method(FdrMethod::BhFdr)
            .with_alpha(0.05)
            .with_seed(10);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"normdata\""));
        assert!(json.contains("\"bhfdr\""));
        let parsed: DsFdrConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let data = mixed_matrix(2, 3, 4);
        let labels = two_group_labels(4, 4);
        let data_before = data.clone();
        let labels_before = labels.clone();

        data.dsfdr(&labels, &Statistic::Spearman, &DsFdrConfig::quick().with_seed(1))
            .unwrap();
        assert_eq!(data, data_before);
        assert_eq!(labels, labels_before);
    }
}
