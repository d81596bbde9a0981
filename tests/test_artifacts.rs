//! Integration test: persisted transforms and models survive a round trip

use ndarray::{array, Array1, Array2};
use phishguard::artifact::{ArtifactStore, WriteMode};
use phishguard::error::PipelineError;
use phishguard::imputation::{KnnImputer, Preprocessor, Transform};
use phishguard::training::{
    default_catalog, Estimator, ModelFamily, ParamSet, TrainedModel,
};
use polars::prelude::*;
use tempfile::tempdir;

fn training_data() -> (Array2<f64>, Array1<f64>) {
    let n = 24;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| ((i * 5 + j * 3) % 7) as f64 - 3.0);
    let y = Array1::from_shape_fn(n, |i| if x[[i, 0]] + x[[i, 2]] > 0.0 { 1.0 } else { 0.0 });
    (x, y)
}

#[test]
fn test_every_family_round_trips_bytes() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new();
    let (x, y) = training_data();

    for candidate in default_catalog() {
        let mut model = candidate.family.build(&ParamSet::new(), 42).unwrap();
        model.fit(&x, &y).unwrap();

        let path = dir.path().join(format!("{}.bin", candidate.family.name()));
        store.save_object(&model, &path).unwrap();
        let loaded: TrainedModel = store.load_object(&path).unwrap();

        let again = dir.path().join(format!("{}-again.bin", candidate.family.name()));
        store.save_object(&loaded, &again).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            std::fs::read(&again).unwrap(),
            "{} bytes changed",
            candidate.family
        );
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}

#[test]
fn test_preprocessor_round_trip_and_idempotence() {
    let dir = tempdir().unwrap();
    let store = ArtifactStore::new();
    let df = df! {
        "a" => [Some(1.0f64), None, Some(3.0), Some(4.0)],
        "b" => [Some(2.0f64), Some(2.5), None, Some(1.0)],
        "Result" => [1i64, -1, 1, -1],
    }
    .unwrap();

    let (pre, x) = Preprocessor::fit_knn(&df, "Result", 2).unwrap();
    assert!(x.iter().all(|v| !v.is_nan()));
    // a complete matrix passes through unchanged
    assert_eq!(pre.transform(&x).unwrap(), x);

    let path = dir.path().join("preprocessor.bin");
    store.save_object(&pre, &path).unwrap();
    let loaded: Preprocessor = store.load_object(&path).unwrap();
    assert_eq!(loaded.transform_frame(&df).unwrap(), x);
    assert_eq!(loaded.feature_names(), pre.feature_names());
}

#[test]
fn test_unfitted_imputer_rejects_transform() {
    let imputer = KnnImputer::new(3);
    assert!(imputer.transform(&array![[1.0, f64::NAN]]).is_err());
}

#[test]
fn test_no_clobber_refuses_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let store = ArtifactStore::new().with_mode(WriteMode::NoClobber);
    let model = ModelFamily::DecisionTree.build(&ParamSet::new(), 0).unwrap();

    store.save_object(&model, &path).unwrap();
    match store.save_object(&model, &path) {
        Err(PipelineError::Persistence { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected persistence error, got {:?}", other),
    }
}

#[test]
fn test_corrupted_object_is_persistence_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");
    std::fs::write(&path, b"not an artifact").unwrap();

    let result: Result<TrainedModel, _> = ArtifactStore::new().load_object(&path);
    assert!(matches!(result, Err(PipelineError::Persistence { .. })));
}
