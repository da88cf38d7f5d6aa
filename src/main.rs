use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use fm_oracle::{DpllOracle, Oracle as _};
use fmmerge::config::{CONFIG_FILE, FmMergeConfig};
use fmmerge::model::Model;
use fmmerge::{compile, merge_models, validate_merge};

/// Merge feature models without losing or inventing configurations
///
/// Input models are JSON files, each tagged with a source region (A..I).
/// The merged model accepts exactly the configurations of its inputs, each
/// extended with its region marker (`REGION_<label>`).
///
/// LOGGING:
///
///   FM_MERGE_LOG=fmmerge=debug        per-phase detail on stderr
///   FM_MERGE_LOG_FORMAT=json          JSON log events
#[derive(Parser)]
#[command(name = "fm-merge")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "FM_MERGE_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two to nine models
    Merge {
        /// Input models, in merge order
        #[arg(required = true, num_args = 2..=9)]
        inputs: Vec<PathBuf>,

        /// Where to write the merged model (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the merge report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip validation even if enabled in the config
        #[arg(long)]
        no_validate: bool,
    },

    /// Check a merged model against its sources
    Validate {
        /// The merged model
        merged: PathBuf,

        /// Source models, in the order they were merged
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },

    /// Count the configurations a model accepts
    Count {
        /// The model
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fmmerge::telemetry::init();

    let config = FmMergeConfig::load(&cli.config)?;
    let mut oracle = DpllOracle::with_limits(config.oracle.limits());

    match cli.command {
        Commands::Merge {
            inputs,
            output,
            report,
            no_validate,
        } => {
            let models = inputs
                .iter()
                .map(|p| read_model(p))
                .collect::<Result<Vec<_>>>()?;
            let outcome = merge_models(&models, &mut oracle, &config.merge)?;

            if config.validate.enabled && !no_validate {
                let verdict = validate_merge(&outcome.merged, &models, &mut oracle)?;
                if !verdict.is_passed() {
                    bail!("merged model failed validation: {verdict:?}");
                }
            }

            let json = serde_json::to_string_pretty(&outcome.merged)?;
            write_output(output.as_deref(), &json)?;
            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&outcome.report)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            eprintln!(
                "merged {} models: {} features, {} constraints ({} decontextualized, {} removed)",
                outcome.report.inputs,
                outcome.report.features,
                outcome.report.merged_constraints,
                outcome.report.decontextualized,
                outcome.report.removed_redundant,
            );
        }
        Commands::Validate { merged, sources } => {
            let merged = read_model(&merged)?;
            let sources = sources
                .iter()
                .map(|p| read_model(p))
                .collect::<Result<Vec<_>>>()?;
            let verdict = validate_merge(&merged, &sources, &mut oracle)?;
            println!("{}", serde_json::to_string(&verdict)?);
            if !verdict.is_passed() {
                bail!("validation failed");
            }
        }
        Commands::Count { model } => {
            let model = read_model(&model)?;
            let compiled = compile(&model)?;
            println!("{}", oracle.count_solutions(&compiled)?);
        }
    }
    Ok(())
}

fn read_model(path: &Path) -> Result<Model> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing model {}", path.display()))
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{contents}")?;
            Ok(())
        }
    }
}
