//! UniProt xref ingestion pipeline
//!
//! Streams records from the extractor through the transformer and hands the
//! resulting nodes to a loader in fixed-size batches. Batches are flushed one
//! at a time; the next record is not read until the previous flush returned.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info};

use super::extractor::UniProtExtractor;
use super::models::{ExtractedRecord, SourceFamily};
use super::release::UniProtRelease;
use super::transformer::{SkipReason, Transformed, Transformer};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::loader::XrefLoader;
use xref_common::types::XrefNode;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Records yielded by the extractor
    pub records_read: usize,
    /// Entries the extractor could not parse
    pub malformed: usize,
    pub skipped_species: usize,
    pub skipped_status: usize,
    pub skipped_sentinel: usize,
    pub skipped_no_accession: usize,
    /// Nodes accepted by the loader
    pub loaded: usize,
    pub batches: usize,
}

impl PipelineStats {
    /// Records read but not turned into nodes
    pub fn skipped(&self) -> usize {
        self.skipped_species + self.skipped_status + self.skipped_sentinel + self.skipped_no_accession
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::SpeciesMismatch => self.skipped_species += 1,
            SkipReason::UnrecognizedStatus => self.skipped_status += 1,
            SkipReason::SentinelAccession => self.skipped_sentinel += 1,
            SkipReason::MissingAccession => self.skipped_no_accession += 1,
        }
    }
}

/// UniProt ingestion pipeline
pub struct UniProtPipeline<L> {
    transformer: Transformer,
    loader: L,
    batch_size: usize,
    limit: Option<usize>,
}

impl<L: XrefLoader> UniProtPipeline<L> {
    pub fn new(transformer: Transformer, loader: L) -> Self {
        Self {
            transformer,
            loader,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: None,
        }
    }

    /// Nodes per loader call (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Read at most `limit` entries from the file
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn into_loader(self) -> L {
        self.loader
    }

    /// Store the release line of each family on all of that family's sources
    pub async fn apply_release(&mut self, release: &UniProtRelease) -> Result<()> {
        for family in SourceFamily::ALL {
            let Some(line) = release.for_family(family) else {
                debug!(family = %family, "No release line for source family");
                continue;
            };

            for source_id in self.transformer.sources().source_ids(family) {
                self.loader
                    .set_release(source_id, &line.text)
                    .await
                    .with_context(|| format!("Failed to set release for source {}", source_id))?;
            }
        }
        Ok(())
    }

    /// Run the pipeline over a flat file (plain or gzipped)
    pub async fn run(&mut self, path: &Path) -> Result<PipelineStats> {
        info!(
            path = %path.display(),
            species_id = self.transformer.species_id(),
            batch_size = self.batch_size,
            "Starting UniProt ingestion"
        );

        let extractor = UniProtExtractor::open(path)?.with_limit(self.limit);
        self.run_extractor(extractor).await
    }

    /// Run the pipeline over an already opened extractor
    pub async fn run_extractor<R: BufRead>(
        &mut self,
        mut extractor: UniProtExtractor<R>,
    ) -> Result<PipelineStats> {
        let mut stats = self.process(extractor.by_ref()).await?;
        stats.malformed = extractor.skipped();

        info!(
            read = stats.records_read,
            loaded = stats.loaded,
            batches = stats.batches,
            malformed = stats.malformed,
            skipped_species = stats.skipped_species,
            skipped_status = stats.skipped_status,
            skipped_sentinel = stats.skipped_sentinel,
            skipped_no_accession = stats.skipped_no_accession,
            "UniProt ingestion complete"
        );

        Ok(stats)
    }

    /// Transform and load a stream of records
    ///
    /// Fails on the first read error, configuration error or loader error;
    /// batches flushed before the failure stay loaded.
    pub async fn process<I>(&mut self, records: I) -> Result<PipelineStats>
    where
        I: IntoIterator<Item = Result<ExtractedRecord>>,
    {
        let mut stats = PipelineStats::default();
        let mut batch: Vec<XrefNode> = Vec::with_capacity(self.batch_size);

        for record in records {
            let record = record?;
            stats.records_read += 1;

            let accession = record.primary_accession().unwrap_or("-").to_string();
            match self
                .transformer
                .evaluate(record)
                .with_context(|| format!("Failed to transform UniProt entry {}", accession))?
            {
                Transformed::Node(node) => batch.push(node),
                Transformed::Skipped(reason) => {
                    debug!(accession = %accession, reason = reason.as_str(), "Skipped record");
                    stats.record_skip(reason);
                },
            }

            if batch.len() >= self.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.batch_size));
                self.flush(full, &mut stats).await?;
            }
        }

        if !batch.is_empty() {
            self.flush(batch, &mut stats).await?;
        }

        Ok(stats)
    }

    async fn flush(&mut self, batch: Vec<XrefNode>, stats: &mut PipelineStats) -> Result<()> {
        let size = batch.len();
        let loaded = self
            .loader
            .load_batch(batch)
            .await
            .with_context(|| format!("Failed to load batch {} ({} xrefs)", stats.batches + 1, size))?;

        stats.batches += 1;
        stats.loaded += loaded;
        info!(batch = stats.batches, size, total = stats.loaded, "Flushed batch");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::uniprot::models::{
        ReviewStatus, SourceIdMap, SourcePriority, TaxonCode, TaxonomyMap,
    };
    use async_trait::async_trait;

    #[derive(Default)]
    struct RecordingLoader {
        batches: Vec<Vec<String>>,
        releases: Vec<(u32, String)>,
        fail_on_batch: Option<usize>,
    }

    #[async_trait]
    impl XrefLoader for RecordingLoader {
        async fn load_batch(&mut self, batch: Vec<XrefNode>) -> Result<usize> {
            if self.fail_on_batch == Some(self.batches.len() + 1) {
                anyhow::bail!("database went away");
            }
            let n = batch.len();
            self.batches.push(batch.into_iter().map(|n| n.accession).collect());
            Ok(n)
        }

        async fn set_release(&mut self, source_id: u32, release: &str) -> Result<()> {
            self.releases.push((source_id, release.to_string()));
            Ok(())
        }
    }

    fn transformer() -> Transformer {
        Transformer::new(
            9606,
            TaxonomyMap::for_species(9606, []),
            SourceIdMap::new()
                .with(SourceFamily::SwissProt, SourcePriority::SequenceMapped, 139)
                .with(SourceFamily::SpTrembl, SourcePriority::SequenceMapped, 140)
                .with(SourceFamily::SpTrembl, SourcePriority::ProteinEvidenceGt2, 141),
        )
    }

    fn record(accession: &str, taxon: u32) -> Result<ExtractedRecord> {
        Ok(ExtractedRecord {
            accessions: vec![accession.to_string()],
            status: Some(ReviewStatus::Reviewed),
            evidence_level: 1,
            sequence: "MKT".to_string(),
            taxon_codes: vec![TaxonCode::ncbi(taxon)],
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_flushes_full_batches_and_remainder() {
        let mut pipeline =
            UniProtPipeline::new(transformer(), RecordingLoader::default()).with_batch_size(2);

        let records = (1..=5).map(|i| record(&format!("P{i}"), 9606));
        let stats = pipeline.process(records).await.unwrap();

        assert_eq!(stats.records_read, 5);
        assert_eq!(stats.loaded, 5);
        assert_eq!(stats.batches, 3);
        assert_eq!(
            pipeline.loader().batches,
            vec![vec!["P1", "P2"], vec!["P3", "P4"], vec!["P5"]]
        );
    }

    #[tokio::test]
    async fn test_skipped_records_never_reach_loader() {
        let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default());

        let records = vec![
            record("P1", 9606),
            record("M1", 10090),
            record("unreviewed", 9606),
            record("P2", 9606),
        ];
        let stats = pipeline.process(records).await.unwrap();

        assert_eq!(stats.skipped_species, 1);
        assert_eq!(stats.skipped_sentinel, 1);
        assert_eq!(stats.skipped(), 2);
        assert_eq!(pipeline.loader().batches, vec![vec!["P1", "P2"]]);
    }

    #[tokio::test]
    async fn test_accessionless_record_is_counted() {
        let mut empty = record("P2", 9606).unwrap();
        empty.accessions.clear();

        let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default());
        let stats = pipeline.process(vec![record("P1", 9606), Ok(empty)]).await.unwrap();

        assert_eq!(stats.skipped_no_accession, 1);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(pipeline.loader().batches, vec![vec!["P1"]]);
    }

    #[tokio::test]
    async fn test_no_records_means_no_loader_call() {
        let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default());
        let stats = pipeline.process(vec![record("M1", 10090)]).await.unwrap();

        assert_eq!(stats.batches, 0);
        assert!(pipeline.loader().batches.is_empty());
    }

    #[tokio::test]
    async fn test_loader_failure_aborts_run() {
        let loader = RecordingLoader {
            fail_on_batch: Some(2),
            ..Default::default()
        };
        let mut pipeline = UniProtPipeline::new(transformer(), loader).with_batch_size(1);

        let records = (1..=4).map(|i| record(&format!("P{i}"), 9606));
        let err = pipeline.process(records).await.unwrap_err();

        assert!(format!("{err:#}").contains("database went away"));
        assert_eq!(pipeline.loader().batches, vec![vec!["P1"]]);
    }

    #[tokio::test]
    async fn test_configuration_error_aborts_run() {
        let mut bad = record("P2", 9606).unwrap();
        bad.taxon_codes = vec![TaxonCode::new("Unknown_TaxID", "1")];

        let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default());
        let result = pipeline.process(vec![record("P1", 9606), Ok(bad)]).await;

        assert!(result.is_err());
        assert!(pipeline.loader().batches.is_empty());
    }

    #[tokio::test]
    async fn test_apply_release_sets_every_family_source() {
        let release = UniProtRelease::parse_str(
            "UniProtKB/Swiss-Prot Release 2024_01 of 24-Jan-2024\n\
             UniProtKB/TrEMBL Release 2024_01 of 24-Jan-2024\n",
        )
        .unwrap();

        let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default());
        pipeline.apply_release(&release).await.unwrap();

        let releases = &pipeline.loader().releases;
        assert_eq!(releases.len(), 3);
        assert_eq!(releases[0], (139, "UniProtKB/Swiss-Prot Release 2024_01 of 24-Jan-2024".to_string()));
        assert!(releases[1..].iter().all(|(_, r)| r.starts_with("UniProtKB/TrEMBL")));
    }

    proptest::proptest! {
        #[test]
        fn prop_batch_count_is_ceiling(n in 0usize..60, batch_size in 1usize..15) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (stats, batches) = rt.block_on(async {
                let mut pipeline = UniProtPipeline::new(transformer(), RecordingLoader::default())
                    .with_batch_size(batch_size);
                let records = (0..n).map(|i| record(&format!("P{i}"), 9606));
                let stats = pipeline.process(records).await.unwrap();
                (stats, pipeline.into_loader().batches)
            });

            proptest::prop_assert_eq!(stats.batches, n.div_ceil(batch_size));
            proptest::prop_assert_eq!(stats.loaded, n);
            proptest::prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= batch_size));

            let flat: Vec<String> = batches.into_iter().flatten().collect();
            let expected: Vec<String> = (0..n).map(|i| format!("P{i}")).collect();
            proptest::prop_assert_eq!(flat, expected);
        }
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let pipeline =
            UniProtPipeline::new(transformer(), RecordingLoader::default()).with_batch_size(0);
        assert_eq!(pipeline.batch_size, 1);
    }
}
