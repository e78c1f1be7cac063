//! Microbiome Age Pipeline - Main Entry Point

use age_pipeline::{
    age_prediction_with_train_data, age_prediction_with_trained_model, align_batch,
    init_logging, microbiome_age_registry, train_age_model, PipelineConfig, PluginInfo,
    PredictionOutcome,
};
use age_regressor::{RandomForestRegressor, TrainedModel};
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use feature_table::{read_feature_table, read_metadata, write_feature_table, Orientation};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Predict host age from microbiome feature tables
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./microbiome-age.toml if present)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level, overriding the configuration
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Tables store samples as rows instead of features as rows
    #[arg(long, global = true)]
    samples_as_rows: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pad test tables to the feature axis of a training table
    Pad {
        /// Training table defining the feature axis
        #[arg(long)]
        train_table: PathBuf,
        /// Test tables to align
        #[arg(long, required = true, num_args = 1..)]
        test_table: Vec<PathBuf>,
        /// Directory receiving `<name>.padded.tsv` for each test table
        #[arg(long)]
        output_dir: PathBuf,
    },

    /// Train an age regressor and save it
    Train {
        #[arg(long)]
        train_table: PathBuf,
        #[arg(long)]
        train_metadata: PathBuf,
        /// Model output path
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Predict ages with a saved model
    Predict {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        test_table: PathBuf,
        #[arg(long)]
        test_metadata: PathBuf,
        /// Updated metadata output path
        #[arg(long)]
        output: PathBuf,
    },

    /// Train on one table and predict ages for another
    TrainPredict {
        #[arg(long)]
        train_table: PathBuf,
        #[arg(long)]
        train_metadata: PathBuf,
        #[arg(long)]
        test_table: PathBuf,
        #[arg(long)]
        test_metadata: PathBuf,
        /// Updated metadata output path
        #[arg(long)]
        output: PathBuf,
        /// Also save the trained model here
        #[arg(long)]
        model_output: Option<PathBuf>,
        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Print the plugin and its action signatures as JSON
    Describe,
}

/// Command-line overrides for forest hyperparameters
#[derive(Args)]
struct ForestArgs {
    /// Metadata column holding the known age
    #[arg(long)]
    target_field: Option<String>,
    #[arg(long)]
    n_estimators: Option<usize>,
    /// Worker threads (0 = all cores)
    #[arg(long)]
    n_jobs: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_depth: Option<usize>,
}

impl ForestArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(field) = &self.target_field {
            config.target_field = field.clone();
        }
        let params = &mut config.hyperparameters;
        if let Some(n) = self.n_estimators {
            params.n_estimators = n;
        }
        if let Some(n) = self.n_jobs {
            params.n_jobs = n;
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        if self.max_depth.is_some() {
            params.max_depth = self.max_depth;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.json_logs {
        config.log_json = true;
    }
    if cli.samples_as_rows {
        config.orientation = Orientation::SamplesAsRows;
    }
    init_logging(&config.log_level, config.log_json)?;

    info!("=== Microbiome Age v{} ===", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Pad {
            train_table,
            test_table,
            output_dir,
        } => {
            let train = read_feature_table(&train_table, config.orientation)?;
            let tests = test_table
                .iter()
                .map(|path| read_feature_table(path, config.orientation))
                .collect::<Result<Vec<_>, _>>()?;

            let outputs = padded_paths(&output_dir, &test_table)?;
            fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;

            let results = align_batch(train.feature_ids(), &tests);
            let mut reports = Vec::with_capacity(tests.len());
            for ((path, out), result) in test_table.iter().zip(&outputs).zip(results) {
                let alignment = result.with_context(|| format!("aligning {}", path.display()))?;
                for warning in alignment.report.warnings() {
                    warn!("{}: {}", path.display(), warning);
                }
                write_feature_table(&alignment.matrix, out, config.orientation)?;
                reports.push(json!({
                    "input": path,
                    "output": out,
                    "report": alignment.report,
                    "warnings": alignment.report.warnings().iter().map(ToString::to_string).collect::<Vec<_>>(),
                }));
            }
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }

        Commands::Train {
            train_table,
            train_metadata,
            output,
            forest,
        } => {
            forest.apply(&mut config);
            let regressor = RandomForestRegressor::new(config.hyperparameters.clone())?;
            let table = read_feature_table(&train_table, config.orientation)?;
            let metadata = read_metadata(&train_metadata)?;

            let model = train_age_model(&regressor, &table, &metadata, &config.target_field)?;
            model.save(&output)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "model": output,
                    "n_trees": model.n_trees(),
                    "n_features": model.feature_ids().len(),
                    "n_training_samples": model.n_training_samples(),
                }))?
            );
        }

        Commands::Predict {
            model,
            test_table,
            test_metadata,
            output,
        } => {
            let model = TrainedModel::load(&model)?;
            let table = read_feature_table(&test_table, config.orientation)?;
            let metadata = read_metadata(&test_metadata)?;

            let outcome = age_prediction_with_trained_model(&model, &table, &metadata, &config)?;
            finish(&outcome, &output)?;
        }

        Commands::TrainPredict {
            train_table,
            train_metadata,
            test_table,
            test_metadata,
            output,
            model_output,
            forest,
        } => {
            forest.apply(&mut config);
            let regressor = RandomForestRegressor::new(config.hyperparameters.clone())?;
            let train = read_feature_table(&train_table, config.orientation)?;
            let train_meta = read_metadata(&train_metadata)?;
            let test = read_feature_table(&test_table, config.orientation)?;
            let test_meta = read_metadata(&test_metadata)?;

            let outcome = age_prediction_with_train_data(
                &regressor,
                &train,
                &train_meta,
                &test,
                &test_meta,
                &config,
            )?;
            if let Some(path) = model_output {
                match &outcome.model {
                    Some(model) => model.save(&path)?,
                    None => bail!("no model was trained"),
                }
            }
            finish(&outcome, &output)?;
        }

        Commands::Describe => {
            let registry = microbiome_age_registry(PluginInfo::microbiome_age())?;
            println!("{}", serde_json::to_string_pretty(&registry)?);
        }
    }

    Ok(())
}

/// Write the updated metadata and print the outcome summary
fn finish(outcome: &PredictionOutcome, output: &Path) -> anyhow::Result<()> {
    outcome.updated_metadata.write_tsv(output)?;
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// `<output_dir>/<stem>.padded.tsv`
fn padded_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    output_dir.join(format!("{}.padded.tsv", stem))
}

/// Output path for every input; inputs sharing a file stem are rejected
fn padded_paths(output_dir: &Path, inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::new();
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let out = padded_path(output_dir, input);
        if let Some(previous) = seen.insert(out.clone(), input.as_path()) {
            bail!(
                "{} and {} would both be written to {}; rename one of them",
                previous.display(),
                input.display(),
                out.display()
            );
        }
        outputs.push(out);
    }
    Ok(outputs)
}
