//! NetGuard trainer entry point
//!
//! Runs the model-training stage against transformed arrays produced by
//! the upstream data-transformation stage.

use clap::Parser;
use netguard::config::{DataTransformationArtifact, ModelTrainerConfig};
use netguard::tracking::{ExperimentConfig, ExperimentTracker};
use netguard::trainer::ModelTrainer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netguard", about = "NetGuard model-training stage")]
struct Cli {
    /// Transformed training array (CSV, last column is the label)
    #[arg(long)]
    train_data: PathBuf,

    /// Transformed test array (CSV, last column is the label)
    #[arg(long)]
    test_data: PathBuf,

    /// Fitted preprocessing transform (JSON)
    #[arg(long)]
    preprocessor: PathBuf,

    /// Where to persist the trained model/preprocessor bundle
    #[arg(long, default_value = "artifacts/model_trainer/model.json")]
    model_out: PathBuf,

    /// Directory for experiment tracking output
    #[arg(long, default_value = "./experiments")]
    tracking_dir: PathBuf,

    /// Experiment name under which runs are recorded
    #[arg(long, default_value = "netguard-training")]
    experiment_name: String,

    /// Minimum acceptable test F1 before a warning is emitted
    #[arg(long, default_value_t = 0.6)]
    expected_score: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netguard=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = ModelTrainerConfig {
        trained_model_file_path: cli.model_out,
        expected_score: cli.expected_score,
    };
    let artifact = DataTransformationArtifact {
        transformed_train_file_path: cli.train_data,
        transformed_test_file_path: cli.test_data,
        transformed_object_file_path: cli.preprocessor,
    };
    let tracker = ExperimentTracker::new(ExperimentConfig {
        output_dir: cli.tracking_dir,
        experiment_name: cli.experiment_name,
    });

    let trainer = ModelTrainer::new(config, artifact, tracker);
    let result = trainer.initiate()?;

    println!(
        "trained model: {}",
        result.trained_model_file_path.display()
    );
    println!(
        "train: f1={:.4} precision={:.4} recall={:.4}",
        result.train_metric.f1_score,
        result.train_metric.precision_score,
        result.train_metric.recall_score
    );
    println!(
        "test:  f1={:.4} precision={:.4} recall={:.4}",
        result.test_metric.f1_score,
        result.test_metric.precision_score,
        result.test_metric.recall_score
    );

    Ok(())
}
