//! Integration test: model-training stage end-to-end

use netguard::config::{DataTransformationArtifact, ModelTrainerConfig};
use netguard::error::NetguardError;
use netguard::bundle::NetworkModel;
use netguard::preprocessing::KnnImputer;
use netguard::tracking::{Experiment, ExperimentTracker};
use netguard::trainer::ModelTrainer;
use netguard::utils::save_object;
use ndarray::Array2;
use std::fs;
use std::path::Path;

/// Write a transformed array CSV with 4 features + label. Class 1 rows sit
/// well apart from class 0 rows so every candidate family can separate
/// them.
fn write_array_csv(path: &Path, n_rows: usize) {
    let mut csv = String::from("f0,f1,f2,f3,label\n");
    for i in 0..n_rows {
        let label = if i % 2 == 0 { 0.0 } else { 1.0 };
        let row: Vec<String> = (0..4)
            .map(|j| {
                let jitter = ((i * (j + 3)) % 7) as f64 * 0.05;
                format!("{:.4}", label * 2.0 + jitter)
            })
            .collect();
        csv.push_str(&format!("{},{}\n", row.join(","), label));
    }
    fs::write(path, csv).unwrap();
}

/// Fit a preprocessor on the training features and persist it the way the
/// data-transformation stage would.
fn write_preprocessor(path: &Path, train_csv: &Path) {
    let (x, _) = netguard::data::load_transformed_array(train_csv).unwrap();
    let mut imputer = KnnImputer::new(3);
    imputer.fit(&x).unwrap();
    save_object(path, &imputer).unwrap();
}

fn stage_inputs(dir: &Path) -> DataTransformationArtifact {
    let train = dir.join("train.csv");
    let test = dir.join("test.csv");
    let preprocessor = dir.join("preprocessor.json");

    write_array_csv(&train, 100);
    write_array_csv(&test, 20);
    write_preprocessor(&preprocessor, &train);

    DataTransformationArtifact {
        transformed_train_file_path: train,
        transformed_test_file_path: test,
        transformed_object_file_path: preprocessor,
    }
}

#[test]
fn test_full_pipeline_produces_artifact() {
    let dir = tempfile::tempdir().unwrap();
    // The bare winning model is published at a fixed relative path, so run
    // the stage from inside the temp dir
    std::env::set_current_dir(dir.path()).unwrap();

    let artifact = stage_inputs(dir.path());
    let tracking_dir = dir.path().join("experiments");
    let model_path = dir.path().join("out").join("model.json");

    let config = ModelTrainerConfig {
        trained_model_file_path: model_path.clone(),
        expected_score: 0.6,
    };
    let tracker = ExperimentTracker::with_dir(&tracking_dir);
    let trainer = ModelTrainer::new(config, artifact, tracker);

    let result = trainer.initiate().unwrap();

    // Result record is populated
    assert!(!result.trained_model_file_path.as_os_str().is_empty());
    for metric in [result.train_metric, result.test_metric] {
        for v in [metric.f1_score, metric.precision_score, metric.recall_score] {
            assert!((0.0..=1.0).contains(&v), "metric out of range: {}", v);
        }
    }
    // Cleanly separable classes: the winner should do well on both splits
    assert!(result.train_metric.f1_score > 0.8);
    assert!(result.test_metric.f1_score > 0.8);

    // Both output artifacts exist
    assert!(model_path.exists());
    assert!(dir.path().join("final_model").join("model.json").exists());

    // The persisted bundle predicts on a fresh sample
    let bundle = NetworkModel::load(&model_path).unwrap();
    let sample = Array2::from_shape_vec(
        (2, 4),
        vec![0.0, 0.05, 0.1, 0.0, 2.0, 2.05, 2.1, 2.0],
    )
    .unwrap();
    let preds = bundle.predict(&sample).unwrap();
    assert_eq!(preds.len(), 2);
    assert!(preds[0] < 0.5);
    assert!(preds[1] > 0.5);

    // Both splits were tracked as separate runs
    let experiments: Vec<Experiment> =
        serde_json::from_str(&fs::read_to_string(tracking_dir.join("experiments.json")).unwrap())
            .unwrap();
    assert_eq!(experiments.len(), 1);
    assert_eq!(experiments[0].runs.len(), 2);
    let run_names: Vec<&str> = experiments[0]
        .runs
        .iter()
        .map(|r| r.run_name.as_str())
        .collect();
    assert!(run_names.contains(&"train-metrics"));
    assert!(run_names.contains(&"test-metrics"));
    for run in &experiments[0].runs {
        assert_eq!(run.metrics.len(), 3);
        assert_eq!(run.artifacts.len(), 1);
    }
}

#[test]
fn test_missing_input_array_fails_without_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("out").join("model.json");

    let artifact = DataTransformationArtifact {
        transformed_train_file_path: dir.path().join("does_not_exist.csv"),
        transformed_test_file_path: dir.path().join("also_missing.csv"),
        transformed_object_file_path: dir.path().join("preprocessor.json"),
    };
    let config = ModelTrainerConfig {
        trained_model_file_path: model_path.clone(),
        expected_score: 0.6,
    };
    let tracker = ExperimentTracker::with_dir(dir.path().join("experiments"));
    let trainer = ModelTrainer::new(config, artifact, tracker);

    let err = trainer.initiate().unwrap_err();
    assert!(matches!(err, NetguardError::DataError(_)));
    assert!(err.to_string().contains("does_not_exist.csv"));

    // No partial output was written
    assert!(!model_path.exists());
    assert!(!model_path.parent().unwrap().exists());
}
