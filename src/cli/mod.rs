//! Visibility CLI Module
//!
//! Runs the batch stages individually or end to end, and makes one-off
//! predictions with the trained artifacts.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

use crate::config::ArtifactPaths;
use crate::evaluation::EvaluationMetrics;
use crate::inference::{InferenceConfig, PredictionResult, VisibilityPredictor};
use crate::ingestion::JsonFileStore;
use crate::pipeline::Pipeline;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

fn print_metrics(metrics: &EvaluationMetrics) {
    println!();
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", metrics.r2).white().bold());
    println!("  {:<16} {}", muted("MSE"), format!("{:.4}", metrics.mse).white());
    println!("  {:<16} {}", muted("MAE"), format!("{:.4}", metrics.mae).white());
    println!("  {:<16} {}", muted("Samples"), metrics.n_samples.to_string().white());
    println!();
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "visibility")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Visibility prediction: batch training pipeline and live inference")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Configuration files and artifact root shared by the batch stages
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Pipeline parameters
    #[arg(long, default_value = "config/params.yaml")]
    pub params: PathBuf,

    /// Columns dropped before modeling
    #[arg(long, default_value = "config/schema.yaml")]
    pub schema: PathBuf,

    /// Root directory for data/, models/ and reports/
    #[arg(long, default_value = ".")]
    pub base: PathBuf,
}

impl PipelineArgs {
    fn pipeline(&self) -> anyhow::Result<Pipeline> {
        Pipeline::from_files(&self.params, &self.schema, &self.base).with_context(|| {
            format!(
                "loading {} and {}",
                self.params.display(),
                self.schema.display()
            )
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch records, drop schema columns and write the train/test split
    Ingest {
        #[command(flatten)]
        args: PipelineArgs,

        /// Directory holding `<collection>.json` or `<collection>.jsonl`
        #[arg(long, default_value = "data/store")]
        store: PathBuf,
    },

    /// Fit the scaler on the training split and scale both splits
    Transform {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Train the configured model on the processed training matrix
    Train {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Score the trained model on the processed test matrix
    Evaluate {
        #[command(flatten)]
        args: PipelineArgs,
    },

    /// Run ingest, transform, train and evaluate in order
    Run {
        #[command(flatten)]
        args: PipelineArgs,

        /// Directory holding `<collection>.json` or `<collection>.jsonl`
        #[arg(long, default_value = "data/store")]
        store: PathBuf,
    },

    /// Predict visibility in meters for a location or an observation file
    Predict {
        /// Latitude (requires OPENWEATHER_API_KEY)
        #[arg(long, requires = "lon", conflicts_with = "observation", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Current-conditions JSON document
        #[arg(long)]
        observation: Option<PathBuf>,

        /// Root directory holding models/
        #[arg(long, default_value = ".")]
        base: PathBuf,

        /// Value reported when prediction fails
        #[arg(long, default_value = "0.0")]
        fallback: f64,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_ingest(args: &PipelineArgs, store: &Path) -> anyhow::Result<()> {
    section("Ingest");
    let pipeline = args.pipeline()?;

    step_run(&format!("Reading {}", pipeline.params().data_ingestion.collection_name.cyan()));
    let start = Instant::now();
    let (train, test) = pipeline
        .run_ingestion(JsonFileStore::new(store))
        .context("ingestion stage failed")?;
    step_done(&format!("{} train / {} test rows in {:?}", train.height(), test.height(), start.elapsed()));
    println!();
    Ok(())
}

pub fn cmd_transform(args: &PipelineArgs) -> anyhow::Result<()> {
    section("Transform");
    let pipeline = args.pipeline()?;

    step_run("Scaling features");
    let start = Instant::now();
    let (train, test) = pipeline
        .run_transformation()
        .context("transformation stage failed")?;
    step_done(&format!(
        "{} features, {} train / {} test rows in {:?}",
        train.feature_names.len(),
        train.n_samples(),
        test.n_samples(),
        start.elapsed()
    ));
    println!();
    Ok(())
}

pub fn cmd_train(args: &PipelineArgs) -> anyhow::Result<()> {
    section("Train");
    let pipeline = args.pipeline()?;

    step_run(&format!("Training {}", pipeline.params().model_trainer.chosen_model.cyan()));
    let start = Instant::now();
    let artifact = pipeline.run_training().context("training stage failed")?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    if let Some(score) = artifact.model.cv_score() {
        println!("  {:<16} {}", muted("CV R²"), format!("{:.4}", score).white().bold());
    }
    for (name, value) in artifact.model.params() {
        println!("  {:<16} {}", muted(name), value.to_string().white());
    }
    println!();
    Ok(())
}

pub fn cmd_evaluate(args: &PipelineArgs) -> anyhow::Result<()> {
    section("Evaluate");
    let pipeline = args.pipeline()?;

    step_run("Scoring test split");
    let metrics = pipeline.run_evaluation().context("evaluation stage failed")?;
    step_done(&pipeline.paths().metrics.display().to_string());
    print_metrics(&metrics);
    Ok(())
}

pub fn cmd_run(args: &PipelineArgs, store: &Path) -> anyhow::Result<()> {
    section("Pipeline");
    let pipeline = args.pipeline()?;

    step_run("Running all stages");
    let report = pipeline
        .run_all(JsonFileStore::new(store))
        .context("pipeline run failed")?;
    step_done(&format!("{:.2}s", report.elapsed_secs));

    println!();
    println!("  {:<16} {}", muted("Model"), report.model_name.white().bold());
    println!("  {:<16} {} / {}", muted("Rows"), report.train_rows, report.test_rows);
    print_metrics(&report.metrics);
    Ok(())
}

pub async fn cmd_predict(
    lat: Option<f64>,
    lon: Option<f64>,
    observation: Option<&Path>,
    base: &Path,
    fallback: f64,
) -> anyhow::Result<()> {
    section("Predict");

    let config = InferenceConfig::from_paths(&ArtifactPaths::rooted_at(base)).with_fallback(fallback);
    let predictor = VisibilityPredictor::load(config);
    if let Some(reason) = predictor.degraded_reason() {
        println!("  {} {}", "degraded".yellow(), dim(&reason));
    }

    let result = match (lat, lon, observation) {
        (Some(lat), Some(lon), _) => predictor.predict_from_openweather(lat, lon).await,
        (_, _, Some(path)) => match std::fs::read_to_string(path) {
            Ok(json) => predictor.predict_json(&json),
            Err(err) => {
                warn!(error = %err, path = %path.display(), "Observation file unreadable");
                PredictionResult::Fallback(predictor.config().fallback)
            }
        },
        _ => anyhow::bail!("either --lat/--lon or --observation is required"),
    };

    println!();
    match result {
        PredictionResult::Visibility(meters) => {
            println!("  {:<16} {}", muted("Visibility"), format!("{:.1} m", meters).white().bold());
        }
        PredictionResult::Fallback(value) => {
            println!("  {:<16} {} {}", muted("Visibility"), format!("{:.1}", value).yellow(), dim("(fallback)"));
        }
    }
    println!();
    Ok(())
}
