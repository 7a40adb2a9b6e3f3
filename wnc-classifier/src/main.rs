//! wnc-classifier - Web-novel filename parser and genre classifier
//!
//! Subcommands:
//! - `parse`: structured fields of one filename
//! - `classify`: genre of one or more filenames, with the decision trace
//! - `batch`: classify a list file and write JSON Lines
//! - `keywords`: keyword-classifier ranking for a text
//! - `init-config`: write default configuration and data files

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wnc_classifier::keywords::{KeywordClassifier, KeywordTable};
use wnc_classifier::vocabulary::GenreVocabulary;
use wnc_classifier::{parse, BatchClassifier, Classifier, ClassifierConfig};

/// Command-line arguments for wnc-classifier
#[derive(Parser, Debug)]
#[command(name = "wnc-classifier")]
#[command(about = "Web-novel filename parser and genre classifier")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(long, global = true, env = "WNC_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the cache, vocabulary and keyword files
    #[arg(long, global = true, env = "WNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Skip external sources; use cache, keywords and authors only
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the structured fields of a filename
    Parse {
        name: String,
    },

    /// Classify filenames
    Classify {
        #[arg(required = true)]
        names: Vec<String>,

        /// Print the decision trace
        #[arg(long)]
        trace: bool,
    },

    /// Classify every line of a list file
    Batch {
        /// One filename per line
        input: PathBuf,

        /// JSON Lines output (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Concurrent workers (configuration value when omitted)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Rank genres for a text with the keyword classifier
    Keywords {
        text: String,
    },

    /// Write a default configuration file and data files
    InitConfig {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wnc_classifier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = ClassifierConfig::load(args.config.as_deref());
    let data_dir = config.data_dir(args.data_dir.as_deref());

    match args.command {
        Command::Parse { name } => {
            let parsed = parse(&name);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }

        Command::Classify { names, trace } => {
            let classifier = build_classifier(&config, &data_dir, args.offline);
            for name in &names {
                let outcome = classifier.classify(name).await;
                let shown = if trace {
                    serde_json::to_string_pretty(&outcome)?
                } else {
                    serde_json::to_string_pretty(&serde_json::json!({
                        "name": name,
                        "display_name": outcome.display_name(),
                        "result": outcome.result,
                    }))?
                };
                println!("{}", shown);
            }
            classifier.flush_cache();
        }

        Command::Batch {
            input,
            output,
            workers,
        } => {
            let names = read_list(&input)?;
            let classifier = Arc::new(build_classifier(&config, &data_dir, args.offline));
            let report = BatchClassifier::new(classifier)
                .run(names, workers.unwrap_or(config.batch.workers))
                .await;

            let sink: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout()),
            };
            let mut writer = BufWriter::new(sink);
            for record in report.records() {
                writeln!(writer, "{}", serde_json::to_string(&record)?)?;
            }
            writer.flush().context("Failed to write batch output")?;

            info!(summary = %serde_json::to_string(&report.summary)?, "Batch summary");
        }

        Command::Keywords { text } => {
            let table = KeywordTable::load_or_default(Some(&config.keywords_path(&data_dir)));
            let verdict = KeywordClassifier::new(table).classify_with_confidence(&text);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }

        Command::InitConfig { force } => init_config(&config, args.config.as_deref(), &data_dir, force),
    }

    Ok(())
}

fn build_classifier(config: &ClassifierConfig, data_dir: &Path, offline: bool) -> Classifier {
    if offline {
        info!("Offline mode: external sources disabled");
        Classifier::offline(config, data_dir)
    } else {
        Classifier::from_config(config, data_dir)
    }
}

/// Non-empty, trimmed lines of a list file
fn read_list(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut names = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        let line = line.trim();
        if !line.is_empty() {
            names.push(line.to_string());
        }
    }
    Ok(names)
}

/// Write defaults; each failure is logged and the rest still written
fn init_config(config: &ClassifierConfig, cli_path: Option<&Path>, data_dir: &Path, force: bool) {
    let config_path = wnc_common::config::resolve_config_path(cli_path, wnc_classifier::config::CONFIG_ENV);
    match config_path {
        Some(path) if force || !path.exists() => {
            match wnc_common::config::write_toml_config(&ClassifierConfig::default(), &path) {
                Ok(()) => info!(path = %path.display(), "Wrote default configuration"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to write configuration"),
            }
        }
        Some(path) => info!(path = %path.display(), "Configuration exists, leaving it unchanged"),
        None => warn!("No configuration directory on this platform; pass --config"),
    }

    let keywords_path = config.keywords_path(data_dir);
    if force || !keywords_path.exists() {
        match KeywordTable::builtin().save(&keywords_path) {
            Ok(()) => info!(path = %keywords_path.display(), "Wrote default keyword table"),
            Err(e) => warn!(path = %keywords_path.display(), error = %e, "Failed to write keyword table"),
        }
    }

    let vocabulary_path = config.vocabulary_path(data_dir);
    if force || !vocabulary_path.exists() {
        match GenreVocabulary::builtin().save(&vocabulary_path) {
            Ok(()) => info!(path = %vocabulary_path.display(), "Wrote default genre vocabulary"),
            Err(e) => warn!(path = %vocabulary_path.display(), error = %e, "Failed to write genre vocabulary"),
        }
    }
}
