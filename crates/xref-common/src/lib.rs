//! Xref Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging and error handling for the xref ingestion tools.
//!
//! # Overview
//!
//! - **Error Handling**: [`XrefError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: the cross-reference graph node handed from parsers to loaders
//!
//! # Example
//!
//! ```no_run
//! use xref_common::logging::{init_logging, LogConfig};
//! use xref_common::types::{XrefNode, SequenceType};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let node = XrefNode::new("P31946", 139, 9606);
//!     assert_eq!(node.sequence_type, SequenceType::Peptide);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, XrefError};
