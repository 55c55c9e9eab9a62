//! Xref Ingest Library
//!
//! Parsers and loaders that populate the Ensembl xref database from
//! upstream data files.
//!
//! # Supported Data Sources
//!
//! - **UniProt**: Swiss-Prot and TrEMBL flat files
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
//!     let mut options = IngestOptions::new("./data/uniprot_sprot.dat", 9606, LoadTarget::Database);
//!     options.release_file = Some("./data/reldate.txt".into());
//!     uniprot::ingest(&options, &config).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod db;
pub mod loader;
pub mod uniprot;
