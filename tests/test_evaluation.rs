//! Integration test: loading files and evaluating classifiers

use metamodel::prelude::*;
use polars::prelude::*;

fn split_frames() -> (DataFrame, DataFrame) {
    let train = df!(
        "f1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
                   1.5, 2.5, 3.5, 4.5, 5.5, 6.5, 7.5, 8.5, 9.5, 10.5],
        "f2" => &[10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0,
                   9.5, 8.5, 7.5, 6.5, 5.5, 4.5, 3.5, 2.5, 1.5, 0.5],
        "target" => &[0i64, 0, 0, 0, 0, 1, 1, 1, 1, 1,
                      0, 0, 0, 0, 0, 1, 1, 1, 1, 1]
    )
    .unwrap();
    let val = df!(
        "f1" => &[1.2, 2.2, 3.2, 4.2, 7.2, 8.2, 9.2, 10.2],
        "f2" => &[9.8, 8.8, 7.8, 6.8, 3.8, 2.8, 1.8, 0.8],
        "target" => &[0i64, 0, 0, 0, 1, 1, 1, 1]
    )
    .unwrap();
    (train, val)
}

fn write_csv(df: &mut DataFrame) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    file
}

#[test]
fn test_load_csv_roundtrip() {
    let (mut train, _) = split_frames();
    let file = write_csv(&mut train);

    let ds = Dataset::load(file.path(), "target").unwrap();
    assert_eq!(ds.n_samples(), 20);
    assert_eq!(ds.feature_names, vec!["f1".to_string(), "f2".to_string()]);
    assert_eq!(ds.features[[3, 0]], 4.0);
    assert!((ds.positive_rate() - 0.5).abs() < 1e-12);
}

#[test]
fn test_load_missing_target_column() {
    let (mut train, _) = split_frames();
    let file = write_csv(&mut train);
    assert!(matches!(
        Dataset::load(file.path(), "label"),
        Err(MetaModelError::FeatureNotFound(_))
    ));
}

#[test]
fn test_train_and_validate_every_estimator_kind() {
    let (train, val) = split_frames();
    let train = Dataset::from_dataframe(&train, "target").unwrap();
    let val = Dataset::from_dataframe(&val, "target").unwrap();

    let mut classifiers: Vec<(String, Box<dyn Classifier>)> = [
        EstimatorKind::LogisticRegression,
        EstimatorKind::DecisionTree,
        EstimatorKind::KNeighbors,
        EstimatorKind::GaussianNb,
        EstimatorKind::Mlp,
    ]
    .into_iter()
    .map(|kind| {
        let model = kind.build();
        (model.name().to_string(), model)
    })
    .collect();

    let results = train_and_validate_classifiers(
        &train.features,
        &train.target,
        &val.features,
        &val.target,
        &mut classifiers,
    )
    .unwrap();

    assert_eq!(results.len(), 5);
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["LogisticRegression", "DecisionTreeClassifier", "KNeighborsClassifier", "GaussianNB", "MLPClassifier"]
    );
    for r in &results {
        for m in [r.training, r.validation] {
            assert!((0.0..=1.0).contains(&m.accuracy));
            assert!((0.0..=1.0).contains(&m.auroc));
            assert!((0.0..=1.0).contains(&m.recall));
            assert!((0.0..=1.0).contains(&m.f1));
            assert!(m.log_loss >= 0.0);
        }
    }

    let json = serde_json::to_string(&results).unwrap();
    let back: Vec<ClassifierEvaluation> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 5);
}

#[test]
fn test_cross_val_score_on_loaded_data() {
    let (train, _) = split_frames();
    let ds = Dataset::from_dataframe(&train, "target").unwrap();
    let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 4, shuffle: true }).with_random_state(0);

    let results = cross_val_score(
        &DecisionTreeClassifier::new(),
        &ds.features,
        &ds.target,
        &cv,
        ScoringMetric::Accuracy,
        2,
    )
    .unwrap();
    assert_eq!(results.n_folds, 4);
    assert_eq!(results.scores.len(), 4);
}
