//! Xref loaders
//!
//! A loader receives nodes in ordered batches. Each batch is the unit of
//! persistence: it is written completely or not at all, and a failed batch
//! ends the run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use serde_jsonlines::JsonLinesWriter;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use xref_common::types::XrefNode;

/// Destination for batches of xref nodes
#[async_trait]
pub trait XrefLoader: Send {
    /// Persist one batch, returning the number of nodes written
    async fn load_batch(&mut self, batch: Vec<XrefNode>) -> Result<usize>;

    /// Record the upstream release a source was loaded from
    async fn set_release(&mut self, source_id: u32, release: &str) -> Result<()>;
}

/// Dry-run loader writing nodes to a JSON-lines file
///
/// A batch is serialised in memory and appended with a single write, so the
/// file only ever holds whole batches.
pub struct JsonLinesLoader {
    path: PathBuf,
    written: usize,
    releases: BTreeMap<u32, String>,
}

impl JsonLinesLoader {
    /// Create (or truncate) the output file
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        Ok(Self {
            path,
            written: 0,
            releases: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Nodes written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Releases recorded per source ID
    pub fn releases(&self) -> &BTreeMap<u32, String> {
        &self.releases
    }
}

#[async_trait]
impl XrefLoader for JsonLinesLoader {
    async fn load_batch(&mut self, batch: Vec<XrefNode>) -> Result<usize> {
        let count = batch.len();

        let mut writer = JsonLinesWriter::new(Vec::new());
        writer
            .write_all(&batch)
            .context("Failed to serialize xref batch")?;
        let buf = writer.into_inner();

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(&buf)
            .and_then(|()| file.sync_data())
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;

        self.written += count;
        debug!(count, total = self.written, path = %self.path.display(), "Wrote batch");
        Ok(count)
    }

    async fn set_release(&mut self, source_id: u32, release: &str) -> Result<()> {
        info!(source_id, release, "Source release (dry run)");
        self.releases.insert(source_id, release.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_lines_loader_appends_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrefs.jsonl");

        let mut loader = JsonLinesLoader::create(&path).unwrap();
        loader
            .load_batch(vec![XrefNode::new("P1", 139, 9606), XrefNode::new("P2", 139, 9606)])
            .await
            .unwrap();
        loader.load_batch(vec![XrefNode::new("P3", 140, 9606)]).await.unwrap();
        assert_eq!(loader.written(), 3);

        let nodes: Vec<XrefNode> = serde_jsonlines::json_lines::<XrefNode, _>(&path)
            .unwrap()
            .collect::<std::io::Result<_>>()
            .unwrap();
        let accessions: Vec<_> = nodes.iter().map(|n| n.accession.as_str()).collect();
        assert_eq!(accessions, ["P1", "P2", "P3"]);
    }

    #[tokio::test]
    async fn test_each_call_appends_one_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrefs.jsonl");
        let mut loader = JsonLinesLoader::create(&path).unwrap();

        let mut node = XrefNode::new("P1", 139, 9606);
        node.sequence = "MTMDKSELVQ".repeat(2_000);
        let batch = vec![node; 50];

        let mut expected = 0;
        for _ in 0..3 {
            let before = std::fs::metadata(&path).unwrap().len();
            loader.load_batch(batch.clone()).await.unwrap();
            expected += batch.len();

            let text = std::fs::read_to_string(&path).unwrap();
            assert!(std::fs::metadata(&path).unwrap().len() > before);
            assert!(text.ends_with('\n'));
            assert_eq!(text.lines().count(), expected);
        }
    }

    #[tokio::test]
    async fn test_failed_append_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrefs.jsonl");
        let mut loader = JsonLinesLoader::create(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(loader.load_batch(vec![XrefNode::new("P1", 139, 9606)]).await.is_err());
        assert_eq!(loader.written(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_create_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xrefs.jsonl");
        std::fs::write(&path, "stale\n").unwrap();

        let loader = JsonLinesLoader::create(&path).unwrap();
        assert_eq!(std::fs::read_to_string(loader.path()).unwrap(), "");
    }

    #[tokio::test]
    async fn test_releases_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = JsonLinesLoader::create(dir.path().join("x.jsonl")).unwrap();
        loader.set_release(139, "UniProtKB/Swiss-Prot Release 2024_01").await.unwrap();
        assert_eq!(loader.releases().get(&139).map(String::as_str), Some("UniProtKB/Swiss-Prot Release 2024_01"));
    }
}
