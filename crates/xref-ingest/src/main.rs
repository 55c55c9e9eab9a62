//! Xref Ingest - populate the xref database from upstream files

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use xref_common::logging::{init_logging, LogConfig, LogLevel};
use xref_ingest::config::IngestConfig;
use xref_ingest::uniprot::{self, IngestOptions, LoadTarget, SourceAssignment, SourceIdMap};

#[derive(Parser, Debug)]
#[command(name = "xref-ingest")]
#[command(author, version, about = "Ensembl xref ingestion tool")]
struct Cli {
    /// Data source to ingest
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Source {
    /// Load UniProt Swiss-Prot/TrEMBL primary xrefs
    Uniprot(UniprotArgs),
}

#[derive(Args, Debug)]
struct UniprotArgs {
    /// UniProt flat file (.dat or .dat.gz)
    #[arg(short, long)]
    file: PathBuf,

    /// Ensembl species ID to load xrefs for
    #[arg(short, long)]
    species_id: u32,

    /// reldate.txt recording the UniProt release
    #[arg(short, long)]
    release_file: Option<PathBuf>,

    /// Nodes per database batch
    #[arg(short, long, env = "XREF_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Stop after this many entries
    #[arg(short, long)]
    limit: Option<usize>,

    /// Xref database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Write xrefs to this JSON-lines file instead of the database
    #[arg(long, value_name = "OUTPUT")]
    dry_run: Option<PathBuf>,

    /// Extra NCBI taxonomy ID mapping to the species (dry run)
    #[arg(long = "taxon", value_name = "TAXONOMY_ID")]
    taxa: Vec<u32>,

    /// Source ID assignment FAMILY:PRIORITY=ID (dry run)
    #[arg(long = "source", value_name = "ASSIGNMENT")]
    sources: Vec<SourceAssignment>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("xref-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.source {
        Source::Uniprot(args) => {
            info!("Ingesting UniProt data");
            run_uniprot(args).await?;
        },
    }

    info!("Ingestion complete");
    Ok(())
}

async fn run_uniprot(args: UniprotArgs) -> Result<()> {
    let mut config = IngestConfig::load()?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    config.validate().context("Invalid configuration")?;

    let target = match args.dry_run {
        Some(output) => LoadTarget::DryRun {
            output,
            taxa: args.taxa,
            sources: args.sources.into_iter().collect::<SourceIdMap>(),
        },
        None => LoadTarget::Database,
    };

    let options = IngestOptions {
        file: args.file,
        species_id: args.species_id,
        release_file: args.release_file,
        limit: args.limit,
        target,
    };

    let stats = uniprot::ingest(&options, &config).await?;
    info!(
        loaded = stats.loaded,
        skipped = stats.skipped(),
        malformed = stats.malformed,
        "UniProt xrefs loaded"
    );
    Ok(())
}
