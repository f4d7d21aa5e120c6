//! metamodel CLI Module
//!
//! Command-line interface for randomized search, classifier evaluation and
//! data inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::classifiers::{Classifier, EstimatorKind};
use crate::data::{load_frame, Dataset};
use crate::evaluation::{train_and_validate_classifiers, ClassifierEvaluation};
use crate::metrics::ScoringMetric;
use crate::model_selection::CVStrategy;
use crate::search::{default_search_space, format_assignment, RandomizedSearchCV, SearchConfig, SearchSpaceConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<14} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
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

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "metamodel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Randomized model and hyperparameter search for binary classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a randomized search over classifiers and hyperparameters
    Search {
        /// Input data file (CSV, TSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name (labels 0/1)
        #[arg(short, long)]
        target: String,

        /// Search space JSON file; a built-in space over every classifier when omitted
        #[arg(short, long)]
        space: Option<PathBuf>,

        /// Number of sampled configurations
        #[arg(short = 'n', long, default_value = "100")]
        n_iter: usize,

        /// Scoring metric (accuracy, roc_auc, precision, recall, f1, neg_log_loss)
        #[arg(long, default_value = "roc_auc")]
        scoring: String,

        /// Number of stratified cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Random seed for a reproducible search
        #[arg(long)]
        seed: Option<u64>,

        /// Folds evaluated in parallel
        #[arg(long, default_value = "1")]
        n_jobs: usize,

        /// Skip refitting the best configuration
        #[arg(long)]
        no_refit: bool,

        /// Log every trial
        #[arg(short, long)]
        verbose: bool,

        /// Write the search summary as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit classifiers on a training file and report train/validation metrics
    Evaluate {
        /// Training data file
        #[arg(long)]
        train: PathBuf,

        /// Validation data file
        #[arg(long)]
        val: PathBuf,

        /// Target column name (labels 0/1)
        #[arg(short, long)]
        target: String,

        /// Comma-separated estimators (logistic_regression, decision_tree, k_neighbors, gaussian_nb, mlp)
        #[arg(short, long, value_delimiter = ',')]
        models: Option<Vec<String>>,

        /// Write the metrics as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

const ALL_KINDS: [EstimatorKind; 5] = [
    EstimatorKind::LogisticRegression,
    EstimatorKind::DecisionTree,
    EstimatorKind::KNeighbors,
    EstimatorKind::GaussianNb,
    EstimatorKind::Mlp,
];

fn load_dataset(path: &Path, target: &str) -> anyhow::Result<Dataset> {
    step_run(&format!("Loading {}", path.display()));
    let start = Instant::now();
    let ds = Dataset::load(path, target)?;
    step_done(&format!(
        "{} rows × {} features in {:?}",
        ds.n_samples(),
        ds.n_features(),
        start.elapsed()
    ));
    Ok(ds)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    step_ok(&format!("Wrote {}", path.display()));
    Ok(())
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_search(
    data_path: &Path,
    target: &str,
    space_path: Option<&Path>,
    n_iter: usize,
    scoring: &str,
    cv_folds: usize,
    seed: Option<u64>,
    n_jobs: usize,
    refit: bool,
    verbose: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Randomized Search");

    let ds = load_dataset(data_path, target)?;
    let space = match space_path {
        Some(path) => SearchSpaceConfig::load(path)?.build()?,
        None => default_search_space(),
    };
    step_ok(&format!("{} search space entries", space.len()));

    let mut config = SearchConfig::new()
        .with_n_iter(n_iter)
        .with_scoring(scoring.parse::<ScoringMetric>()?)
        .with_cv(CVStrategy::StratifiedKFold { n_splits: cv_folds, shuffle: true })
        .with_n_jobs(n_jobs)
        .with_refit(refit)
        .with_verbose(verbose);
    if let Some(seed) = seed {
        config = config.with_random_state(seed);
    }

    step_run(&format!("Running {} trials", n_iter));
    let outcome = RandomizedSearchCV::new(config).fit(&ds.features, &ds.target, &space)?;
    step_done(&format!("{:.2}s", outcome.total_duration_secs()));

    let best = outcome.best_trial();
    println!();
    kv("Best trial", &best.trial.to_string());
    kv("Estimator", &best.configuration.entry_id);
    kv("Params", &format_assignment(&best.configuration.params));
    kv(scoring, &format!("{:.4} ± {:.4}", best.mean_score, best.std_score));
    if let Some(model) = outcome.best_estimator() {
        let train_score = model.score(&ds.features, &ds.target)?;
        kv("Refit acc.", &format!("{:.4}", train_score));
    }

    if let Some(path) = output {
        write_json(path, &outcome.summary())?;
    }
    println!();
    Ok(())
}

pub fn cmd_evaluate(
    train_path: &Path,
    val_path: &Path,
    target: &str,
    models: Option<&[String]>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Evaluate");

    let train = load_dataset(train_path, target)?;
    let val = load_dataset(val_path, target)?;
    if train.feature_names != val.feature_names {
        anyhow::bail!("training and validation files have different feature columns");
    }

    let kinds: Vec<EstimatorKind> = match models {
        Some(names) => names.iter().map(|n| n.trim().parse()).collect::<Result<_, _>>()?,
        None => ALL_KINDS.to_vec(),
    };
    let mut classifiers: Vec<(String, Box<dyn Classifier>)> = kinds
        .into_iter()
        .map(|kind| {
            let model = kind.build();
            (model.name().to_string(), model)
        })
        .collect();

    let results =
        train_and_validate_classifiers(&train.features, &train.target, &val.features, &val.target, &mut classifiers)?;
    print_evaluations(&results);

    if let Some(path) = output {
        write_json(path, &results)?;
    }
    println!();
    Ok(())
}

fn print_evaluations(results: &[ClassifierEvaluation]) {
    println!();
    println!(
        "  {:<24} {:>9} {:>9} {:>9} {:>9}",
        muted("Classifier"),
        muted("Train acc"),
        muted("Val acc"),
        muted("Val AUROC"),
        muted("Val F1")
    );
    println!("  {}", dim(&"─".repeat(64)));
    for r in results {
        println!(
            "  {:<24} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
            r.name, r.training.accuracy, r.validation.accuracy, r.validation.auroc, r.validation.f1
        );
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = load_frame(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    println!();
    Ok(())
}
