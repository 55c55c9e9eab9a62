//! UniProt flat-file xref ingestion
//!
//! Reads a UniProtKB flat file (`uniprot_sprot.dat`, `uniprot_trembl.dat`,
//! optionally gzipped) and loads one primary xref per entry that belongs to
//! the target species.
//!
//! The work is split into three stages:
//!
//! - [`extractor::UniProtExtractor`] turns `//`-terminated entries into
//!   [`models::ExtractedRecord`] values
//! - [`transformer::Transformer`] filters records by species and review
//!   status, and resolves their xref source
//! - [`pipeline::UniProtPipeline`] batches the resulting nodes into an
//!   [`XrefLoader`](crate::loader::XrefLoader)
//!
//! # Example
//!
//! ```no_run
//! use xref_ingest::config::IngestConfig;
//! use xref_ingest::uniprot::{self, IngestOptions, LoadTarget};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let options = IngestOptions::new("uniprot_sprot.dat.gz", 9606, LoadTarget::Database);
//!     let stats = uniprot::ingest(&options, &config).await?;
//!     println!("loaded {} xrefs", stats.loaded);
//!     Ok(())
//! }
//! ```

pub mod extractor;
pub mod models;
pub mod pipeline;
pub mod release;
pub mod transformer;

pub use extractor::UniProtExtractor;
pub use models::{
    ExtractedRecord, ReviewStatus, SourceAssignment, SourceFamily, SourceIdMap, SourcePriority,
    TaxonomyMap,
};
pub use pipeline::{PipelineStats, UniProtPipeline};
pub use release::UniProtRelease;
pub use transformer::{SkipReason, Transformed, Transformer};

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::db::XrefDatabase;
use crate::loader::{JsonLinesLoader, XrefLoader};

/// Where transformed nodes go
#[derive(Debug, Clone)]
pub enum LoadTarget {
    /// The xref database from [`IngestConfig`]; source and taxonomy maps are read from it
    Database,
    /// A JSON-lines file, with the lookup maps supplied by the caller
    DryRun {
        output: PathBuf,
        taxa: Vec<u32>,
        sources: SourceIdMap,
    },
}

/// Options for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// UniProt flat file
    pub file: PathBuf,
    pub species_id: u32,
    /// `reldate.txt` to record against the loaded sources
    pub release_file: Option<PathBuf>,
    /// Stop after this many entries
    pub limit: Option<usize>,
    pub target: LoadTarget,
}

impl IngestOptions {
    pub fn new(file: impl Into<PathBuf>, species_id: u32, target: LoadTarget) -> Self {
        Self {
            file: file.into(),
            species_id,
            release_file: None,
            limit: None,
            target,
        }
    }
}

/// Run a full ingestion
pub async fn ingest(options: &IngestOptions, config: &IngestConfig) -> Result<PipelineStats> {
    let release = options
        .release_file
        .as_deref()
        .map(UniProtRelease::parse_file)
        .transpose()?;

    match &options.target {
        LoadTarget::Database => {
            let db = XrefDatabase::connect(&config.database).await?;
            let sources = db.source_id_map().await?;
            let taxonomy = db.taxonomy_map(options.species_id).await?;

            run(options, config, release.as_ref(), taxonomy, sources, db).await
        },
        LoadTarget::DryRun {
            output,
            taxa,
            sources,
        } => {
            info!(output = %output.display(), "Dry run, writing xrefs to file");
            let taxonomy = TaxonomyMap::for_species(options.species_id, taxa.iter().copied());
            let loader = JsonLinesLoader::create(output)?;

            run(options, config, release.as_ref(), taxonomy, sources.clone(), loader).await
        },
    }
}

async fn run<L: XrefLoader>(
    options: &IngestOptions,
    config: &IngestConfig,
    release: Option<&UniProtRelease>,
    taxonomy: TaxonomyMap,
    sources: SourceIdMap,
    loader: L,
) -> Result<PipelineStats> {
    if sources.is_empty() {
        warn!("No UniProt source IDs configured, every in-species record will fail to resolve");
    }

    let transformer = Transformer::new(options.species_id, taxonomy, sources);
    let mut pipeline = UniProtPipeline::new(transformer, loader)
        .with_batch_size(config.batch_size)
        .with_limit(options.limit);

    let stats = pipeline.run(&options.file).await?;

    if let Some(release) = release {
        pipeline.apply_release(release).await?;
    }

    Ok(stats)
}
