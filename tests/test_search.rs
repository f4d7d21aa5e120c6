//! Integration test: randomized search end-to-end

use metamodel::prelude::*;
use metamodel::search::{best_trial_index, SearchSpaceConfig};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Two separable blobs with a little overlap-free jitter, 20 samples per class
fn blobs() -> (Array2<f64>, Array1<f64>) {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..20 {
        let t = i as f64 * 0.1;
        rows.extend_from_slice(&[1.0 + t, 1.0 + (t * 1.7) % 1.0]);
        labels.push(0.0);
        rows.extend_from_slice(&[4.0 + t, 4.0 + (t * 1.3) % 1.0]);
        labels.push(1.0);
    }
    (
        Array2::from_shape_vec((40, 2), rows).unwrap(),
        Array1::from_vec(labels),
    )
}

fn small_space() -> Vec<SearchSpaceEntry> {
    vec![
        SearchSpaceEntry::new("knn", Box::new(KNeighborsClassifier::new()))
            .with_param("n_neighbors", ParamDistribution::sampler(RandInt::new(1, 8)))
            .with_param("weights", ParamDistribution::values(["uniform", "distance"])),
        SearchSpaceEntry::new("tree", Box::new(DecisionTreeClassifier::new()))
            .with_param("max_depth", ParamDistribution::values([Some(1usize), Some(3), None]))
            .with_param("criterion", ParamDistribution::values(["gini", "entropy"])),
        SearchSpaceEntry::new("nb", Box::new(GaussianNB::new()))
            .with_param("var_smoothing", ParamDistribution::sampler(LogUniform::new(1e-12, 1e-6))),
    ]
}

#[test]
fn test_history_has_n_iter_trials() {
    let (x, y) = blobs();
    let config = SearchConfig::new().with_n_iter(12).with_random_state(1);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap();

    assert_eq!(outcome.trials().len(), 12);
    for (i, trial) in outcome.trials().iter().enumerate() {
        assert_eq!(trial.trial, i);
        assert_eq!(trial.fold_scores.len(), 5);
        assert!(trial.configuration.entry_index < 3);
    }
}

#[test]
fn test_best_trial_is_first_maximum() {
    let (x, y) = blobs();
    let config = SearchConfig::new().with_n_iter(15).with_random_state(2).with_refit(false);
    let outcome = randomized_search_cv(&x, &y, &small_space(), config).unwrap();

    let best = outcome.best_score();
    for trial in outcome.trials() {
        assert!(best >= trial.mean_score);
    }
    let first_max = outcome
        .trials()
        .iter()
        .position(|t| t.mean_score == best)
        .unwrap();
    assert_eq!(outcome.best_index(), first_max);
    assert_eq!(best_trial_index(outcome.trials()), Some(first_max));
}

#[test]
fn test_empty_space_is_config_error() {
    let (x, y) = blobs();
    let err = RandomizedSearchCV::new(SearchConfig::new()).fit(&x, &y, &[]).unwrap_err();
    assert!(matches!(err, MetaModelError::ConfigError(_)));
}

#[test]
fn test_zero_iterations_is_config_error() {
    let (x, y) = blobs();
    let config = SearchConfig::new().with_n_iter(0);
    let err = RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap_err();
    assert!(matches!(err, MetaModelError::ConfigError(_)));
}

#[test]
fn test_fewer_samples_than_folds_is_config_error() {
    let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 3.0]).unwrap();
    let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
    let err = RandomizedSearchCV::new(SearchConfig::new().with_n_iter(1))
        .fit(&x, &y, &small_space())
        .unwrap_err();
    assert!(matches!(err, MetaModelError::ConfigError(_)));
}

#[test]
fn test_no_refit_leaves_estimator_empty() {
    let (x, y) = blobs();
    let config = SearchConfig::new().with_n_iter(6).with_refit(false).with_random_state(3);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap();

    assert_eq!(outcome.trials().len(), 6);
    assert!(outcome.best_estimator().is_none());
    assert!(!outcome.summary().refitted);
}

#[test]
fn test_refit_uses_best_params() {
    let (x, y) = blobs();
    let config = SearchConfig::new().with_n_iter(10).with_random_state(4);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap();

    let model = outcome.best_estimator().expect("refit requested");
    let fitted_params = model.get_params();
    for (name, value) in outcome.best_params() {
        assert_eq!(&fitted_params[name], value, "param {}", name);
    }
    // Refit model is usable on the full data
    assert!(model.score(&x, &y).unwrap() >= 0.9);
}

#[test]
fn test_singleton_enumeration_repeats_configuration() {
    let (x, y) = blobs();
    let space = vec![SearchSpaceEntry::new("knn", Box::new(KNeighborsClassifier::new()))
        .with_param("n_neighbors", ParamDistribution::values([1i64]))];
    let config = SearchConfig::new().with_n_iter(10).with_scoring(ScoringMetric::Accuracy);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &space).unwrap();

    assert_eq!(outcome.trials().len(), 10);
    for trial in outcome.trials() {
        assert_eq!(trial.configuration.entry_id, "knn");
        assert_eq!(trial.configuration.params["n_neighbors"], ParamValue::Int(1));
        assert!(trial.mean_score >= 0.9);
    }
}

#[test]
fn test_same_seed_same_history() {
    let (x, y) = blobs();
    let run = || {
        let config = SearchConfig::new().with_n_iter(8).with_random_state(99).with_refit(false);
        RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap()
    };
    let a = run();
    let b = run();

    for (ta, tb) in a.trials().iter().zip(b.trials()) {
        assert_eq!(ta.configuration, tb.configuration);
        assert_eq!(ta.fold_scores, tb.fold_scores);
    }
    assert_eq!(a.best_index(), b.best_index());
}

#[test]
fn test_parallel_folds_match_sequential() {
    let (x, y) = blobs();
    let run = |n_jobs| {
        let config = SearchConfig::new()
            .with_n_iter(5)
            .with_random_state(5)
            .with_n_jobs(n_jobs)
            .with_refit(false);
        RandomizedSearchCV::new(config).fit(&x, &y, &small_space()).unwrap()
    };
    let seq = run(1);
    let par = run(3);
    for (a, b) in seq.trials().iter().zip(par.trials()) {
        assert_eq!(a.fold_scores, b.fold_scores);
    }
}

#[test]
fn test_bad_configuration_aborts_search() {
    let (x, y) = blobs();
    let space = vec![SearchSpaceEntry::new("knn", Box::new(KNeighborsClassifier::new()))
        .with_param("n_neighbors", ParamDistribution::values([0i64]))];
    let err = RandomizedSearchCV::new(SearchConfig::new().with_n_iter(5))
        .fit(&x, &y, &space)
        .unwrap_err();

    match err {
        MetaModelError::EvaluationError { trial, estimator, source } => {
            assert_eq!(trial, 0);
            assert_eq!(estimator, "knn");
            assert!(matches!(*source, MetaModelError::InvalidParameter { .. }));
        }
        other => panic!("expected EvaluationError, got {:?}", other),
    }
}

#[test]
fn test_unknown_hyperparameter_aborts_search() {
    let (x, y) = blobs();
    let space = vec![SearchSpaceEntry::new("nb", Box::new(GaussianNB::new()))
        .with_param("n_estimators", ParamDistribution::values([10i64]))];
    let err = RandomizedSearchCV::new(SearchConfig::new().with_n_iter(3))
        .fit(&x, &y, &space)
        .unwrap_err();
    assert!(err.is_evaluation());
}

#[test]
fn test_mlp_layer_widths_from_int_vector() {
    let (x, y) = blobs();
    let space = vec![SearchSpaceEntry::new("mlp", Box::new(MLPClassifier::new().with_random_state(0)))
        .with_param("hidden_layer_sizes", ParamDistribution::sampler(BoundedIntVector::new(2, 6, 2)))
        .with_param("max_iter", ParamDistribution::values([30i64]))];
    let config = SearchConfig::new().with_n_iter(4).with_random_state(6);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &space).unwrap();

    for trial in outcome.trials() {
        let widths = trial.configuration.params["hidden_layer_sizes"].as_int_vec().unwrap();
        assert_eq!(widths.len(), 2);
        assert!(widths.iter().all(|&w| (2..=6).contains(&w)));
    }
    assert!(outcome.best_estimator().is_some());
}

#[test]
fn test_search_from_json_space_and_dataframe() {
    let (x, y) = blobs();
    let df = df!(
        "a" => x.column(0).to_vec(),
        "b" => x.column(1).to_vec(),
        "label" => y.to_vec()
    )
    .unwrap();
    let ds = Dataset::from_dataframe(&df, "label").unwrap();

    let space = SearchSpaceConfig::from_json_str(
        r#"{"entries": [
            {"id": "lr", "estimator": "logistic_regression",
             "params": [{"name": "alpha", "distribution": {"kind": "log_uniform", "low": 0.001, "high": 0.1}}]},
            {"id": "knn", "estimator": "k_neighbors",
             "params": [{"name": "n_neighbors", "distribution": {"kind": "randint", "low": 1, "high": 6}}]}
        ]}"#,
    )
    .unwrap()
    .build()
    .unwrap();

    let config = SearchConfig::new().with_n_iter(6).with_random_state(8);
    let outcome = RandomizedSearchCV::new(config).fit(&ds.features, &ds.target, &space).unwrap();
    assert!(outcome.best_score() > 0.9);

    let summary = serde_json::to_value(outcome.summary()).unwrap();
    assert_eq!(summary["n_trials"], 6);
    assert_eq!(summary["trials"].as_array().unwrap().len(), 6);
}

#[test]
fn test_non_binary_labels_rejected_before_trials() {
    let (x, mut y) = blobs();
    y[0] = 2.0;
    let err = RandomizedSearchCV::new(SearchConfig::new().with_n_iter(2))
        .fit(&x, &y, &small_space())
        .unwrap_err();
    assert!(matches!(err, MetaModelError::DataError(_)));
}

#[test]
fn test_recorded_params_match_refit_estimator() {
    let (x, y) = blobs();
    let space = vec![
        SearchSpaceEntry::new("lr", Box::new(LogisticRegression::new()))
            .with_param("alpha", ParamDistribution::values([1i64])),
        SearchSpaceEntry::new("mlp", Box::new(MLPClassifier::new().with_random_state(0)))
            .with_param("hidden_layer_sizes", ParamDistribution::values([8i64]))
            .with_param("max_iter", ParamDistribution::values([20i64])),
    ];

    for seed in 0..4 {
        let config = SearchConfig::new().with_n_iter(4).with_random_state(seed);
        let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &space).unwrap();

        for trial in outcome.trials() {
            match trial.configuration.entry_id.as_str() {
                "lr" => assert_eq!(trial.configuration.params["alpha"], ParamValue::Float(1.0)),
                _ => assert_eq!(
                    trial.configuration.params["hidden_layer_sizes"],
                    ParamValue::IntVec(vec![8])
                ),
            }
        }

        let fitted = outcome.best_estimator().unwrap().get_params();
        for (name, value) in outcome.best_params() {
            assert_eq!(&fitted[name], value, "seed {} param {}", seed, name);
        }
    }
}

#[test]
fn test_entries_are_drawn_uniformly() {
    let (x, y) = blobs();
    let space: Vec<SearchSpaceEntry> = ["a", "b", "c"]
        .into_iter()
        .map(|id| {
            SearchSpaceEntry::new(id, Box::new(GaussianNB::new()))
                .with_param("var_smoothing", ParamDistribution::values([1e-9]))
        })
        .collect();
    let n_iter = 3000;
    let config = SearchConfig::new()
        .with_n_iter(n_iter)
        .with_cv(CVStrategy::KFold { n_splits: 2, shuffle: false })
        .with_scoring(ScoringMetric::Accuracy)
        .with_refit(false)
        .with_random_state(11);
    let outcome = RandomizedSearchCV::new(config).fit(&x, &y, &space).unwrap();

    let mut counts = [0usize; 3];
    for trial in outcome.trials() {
        counts[trial.configuration.entry_index] += 1;
    }
    for (idx, &count) in counts.iter().enumerate() {
        let freq = count as f64 / n_iter as f64;
        assert!((freq - 1.0 / 3.0).abs() < 0.04, "entry {} drawn with frequency {}", idx, freq);
    }
}
