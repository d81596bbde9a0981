//! phishguard CLI
//!
//! `train` runs the full pipeline, `validate` checks a pair of splits
//! against the schema and reports drift, `predict` scores a CSV with an
//! exported model directory.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::ArtifactStore;
use crate::config::{PipelineSettings, TrainingPipelineConfig};
use crate::drift::{DatasetDriftDetector, KolmogorovSmirnovTest};
use crate::inference::InferenceContext;
use crate::pipeline::{check_splits, CsvSource, TrainingPipeline};
use crate::schema::{Schema, SchemaValidator};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "phishguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve a phishing website classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the training pipeline
    Train {
        /// Pre-split training CSV
        #[arg(long, requires = "test", conflicts_with = "data")]
        train: Option<PathBuf>,

        /// Pre-split test CSV
        #[arg(long, requires = "train")]
        test: Option<PathBuf>,

        /// Single raw CSV, split during ingestion
        #[arg(short, long, required_unless_present = "train")]
        data: Option<PathBuf>,

        /// Pipeline settings (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check train and test CSVs against the schema and report drift
    Validate {
        #[arg(long)]
        train: PathBuf,

        #[arg(long)]
        test: PathBuf,

        /// Schema file, defaults to the configured schema path
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// Score a CSV with an exported model directory
    Predict {
        /// Directory holding preprocessor.bin and model.bin
        #[arg(short, long, default_value = "final_model")]
        model_dir: PathBuf,

        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV
        #[arg(short, long, default_value = "predictions.csv")]
        output: PathBuf,
    },
}

fn load_settings(config: Option<&Path>) -> anyhow::Result<PipelineSettings> {
    Ok(match config {
        Some(path) => PipelineSettings::load(path)?,
        None => PipelineSettings::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    train: Option<&Path>,
    test: Option<&Path>,
    data: Option<&Path>,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let settings = load_settings(config)?;
    let source = match (train, test, data) {
        (Some(train), Some(test), _) => CsvSource::split(train, test),
        (_, _, Some(data)) => CsvSource::raw(data),
        _ => anyhow::bail!("pass either --train and --test, or --data"),
    };

    let pipeline_config = TrainingPipelineConfig::now(settings);
    kv("Run directory", &pipeline_config.run_dir.display().to_string());
    kv(
        "Families",
        &pipeline_config
            .settings
            .catalog
            .iter()
            .map(|c| c.family.name())
            .collect::<Vec<_>>()
            .join(", "),
    );
    println!();

    step_run("Running pipeline");
    let start = Instant::now();
    let mut pipeline = TrainingPipeline::new(pipeline_config);
    let run = pipeline.run(&source)?;
    step_done(&format!("{:.1?}", start.elapsed()));

    println!();
    kv("Best family", &run.trainer.best_family.name().cyan().to_string());
    let train_m = &run.trainer.train_metric_artifact;
    let test_m = &run.trainer.test_metric_artifact;
    kv("Train F1", &format!("{:.4}", train_m.f1_score));
    kv(
        "Test F1",
        &format!("{:.4}", test_m.f1_score).as_str().bold().to_string(),
    );
    kv("Test precision", &format!("{:.4}", test_m.precision_score));
    kv("Test recall", &format!("{:.4}", test_m.recall_score));
    if run.validation.drift_detected {
        kv("Drift", &"detected".yellow().to_string());
    }
    kv("Model", &run.final_model_dir.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_validate(train: &Path, test: &Path, schema: Option<&Path>) -> anyhow::Result<()> {
    section("Validate");

    let settings = PipelineSettings::default();
    let schema_path = schema.unwrap_or(settings.schema_path.as_path());
    let store = ArtifactStore::new();

    step_run("Loading data");
    let train_df = store.load_table(train)?;
    let test_df = store.load_table(test)?;
    step_done(&format!(
        "train {} rows, test {} rows",
        train_df.height(),
        test_df.height()
    ));

    step_run("Checking schema");
    let validator = SchemaValidator::new(Schema::load(schema_path)?);
    check_splits(&validator, &train_df, &test_df)?;
    step_done(&format!("{} columns", validator.schema().column_count()));

    step_run("Measuring drift");
    let report = DatasetDriftDetector::with_test(
        KolmogorovSmirnovTest::new(settings.ks_method),
        settings.drift_threshold,
    )
    .detect(&train_df, &test_df)?;
    step_done(&format!("{} columns tested", report.len()));

    println!();
    let drifted = report.drifted_columns();
    if drifted.is_empty() {
        kv("Drift", &ok("none").to_string());
    } else {
        kv("Drift", &format!("{} column(s)", drifted.len()).as_str().yellow().to_string());
        for name in drifted {
            if let Some(col) = report.get(name) {
                kv(&format!("  {}", name), &format!("p = {:.4}", col.p_value));
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_predict(model_dir: &Path, data: &Path, output: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let ctx = InferenceContext::load(model_dir)?;
    step_done(&ctx.bundle().family().to_string());

    step_run("Scoring");
    let start = Instant::now();
    let scored = ctx.predict_csv(data, output)?;
    step_done(&format!("{} rows in {:.1?}", scored.height(), start.elapsed()));

    println!();
    kv("Output", &output.display().to_string());
    println!();
    Ok(())
}
