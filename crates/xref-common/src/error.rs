//! Error types for xref ingestion

use thiserror::Error;

/// Result type alias for xref operations
pub type Result<T> = std::result::Result<T, XrefError>;

/// Main error type for xref ingestion
///
/// Every variant is fatal for a run. Malformed input records are not errors;
/// they are skipped and counted by the pipeline.
#[derive(Error, Debug)]
pub enum XrefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A taxon code carries a qualifier with no registered mapper.
    #[error("No mapper registered for taxon qualifier '{0}'")]
    UnknownTaxonQualifier(String),

    /// The source-ID map lacks the family/priority combination a record needs.
    #[error("No source ID loaded for {family} with priority '{priority}'")]
    MissingSource { family: String, priority: String },
}
