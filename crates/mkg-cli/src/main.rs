//! MKG CLI - Command-line interface
//!
//! Usage:
//!   mkg build [--config <file>] [--output <dir>]
//!   mkg normalize --kind <numeric type> <text>
//!   mkg facts <documents.jsonl>

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mkg_core::{AppConfig, Document, LoggingConfig, NumericKind};
use mkg_extractor::corpus::parse_json_lines;
use mkg_extractor::pipeline::{document_facts, flatten};
use mkg_extractor::{normalize, synthesize, write_graph, RawCatalog};

#[derive(Parser)]
#[command(name = "mkg")]
#[command(about = "Medication knowledge graph synthesis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the graph tables from the annotated corpus
    Build {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output directory (overrides the configured one)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the quantity record of a numeric entity
    Normalize {
        /// Numeric entity type (体重, 年龄, 时期/时长, 用药疗程, 用药剂量, 用药频率)
        #[arg(long)]
        kind: String,
        /// Raw entity text
        text: String,
    },
    /// Print the fact-tuples matched for each document
    Facts {
        /// Documents (JSON lines)
        path: PathBuf,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_documents(path: &Path) -> anyhow::Result<Vec<Document>> {
    let text = read_text(path).await?;
    Ok(parse_json_lines(&text, path)?)
}

async fn build(config: AppConfig) -> anyhow::Result<()> {
    let input = &config.input;

    let mut documents = read_documents(&input.labeled_data).await?;
    if let Some(predicted) = &input.predicted_data {
        documents.extend(read_documents(predicted).await?);
    }
    let raw_text = read_text(&input.cleaned_data).await?;
    let raw = RawCatalog::parse(&raw_text, &input.cleaned_data)?;
    info!(
        documents = documents.len(),
        raw_records = raw.len(),
        "Loaded corpus"
    );

    let synthesis = config.synthesis.clone();
    let (graph, report) =
        tokio::task::spawn_blocking(move || synthesize(&documents, &raw, &synthesis)).await?;

    let output = config.output.clone();
    tokio::fs::create_dir_all(&output.dir)
        .await
        .with_context(|| format!("failed to create {}", output.dir.display()))?;
    let (entities, relations) = tokio::task::spawn_blocking(move || {
        write_graph(&graph, &output.entity_path(), &output.relation_path())
    })
    .await??;

    info!(
        entities,
        relations,
        dir = %config.output.dir.display(),
        "Wrote graph tables"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn numeric_kind(kind: &str) -> anyhow::Result<NumericKind> {
    match NumericKind::from_entity_type(kind).or_else(|| NumericKind::from_node_label(kind)) {
        Some(kind) => Ok(kind),
        None => bail!("not a numeric entity type: {kind}"),
    }
}

async fn facts(path: &Path, parallel: bool) -> anyhow::Result<()> {
    let documents = read_documents(path).await?;

    for (i, (document, matched)) in documents
        .iter()
        .zip(document_facts(&documents, parallel))
        .enumerate()
    {
        println!("[{}] {} {:?}", i + 1, document.folder, document.file);
        match matched {
            Some(matched) => {
                for (group, fact) in flatten(&matched) {
                    println!("  {group}\t{fact}");
                }
            }
            None => println!("  (unknown folder)"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, output } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(output) = output {
                config.output.dir = output;
            }
            init_tracing(&config.logging);
            build(config).await?;
        }
        Commands::Normalize { kind, text } => {
            init_tracing(&LoggingConfig::default());
            let record = normalize(numeric_kind(&kind)?, &text);
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Facts { path } => {
            let config = AppConfig::from_env()?;
            init_tracing(&config.logging);
            facts(&path, config.synthesis.parallel).await?;
        }
    }

    Ok(())
}
