//! Cross-reference graph types shared by parsers and loaders
//!
//! A parser produces [`XrefNode`] values; a loader takes ownership of them in
//! batches and persists them into the xref schema. The enums mirror the enum
//! columns of that schema, so their `as_str` values are what gets stored.

use serde::{Deserialize, Serialize};

/// Kind of sequence stored with a primary xref (`primary_xref.sequence_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    Dna,
    #[default]
    Peptide,
}

impl SequenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceType::Dna => "dna",
            SequenceType::Peptide => "peptide",
        }
    }
}

impl std::fmt::Display for SequenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a primary xref sequence (`primary_xref.status`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum XrefStatus {
    #[default]
    Experimental,
    Predicted,
}

impl XrefStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            XrefStatus::Experimental => "experimental",
            XrefStatus::Predicted => "predicted",
        }
    }
}

impl std::fmt::Display for XrefStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ensembl feature a direct xref attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnsemblFeatureType {
    Gene,
    Transcript,
    Translation,
}

impl EnsemblFeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsemblFeatureType::Gene => "gene",
            EnsemblFeatureType::Transcript => "transcript",
            EnsemblFeatureType::Translation => "translation",
        }
    }

    /// Table holding direct xrefs for this feature type
    pub fn direct_xref_table(&self) -> &'static str {
        match self {
            EnsemblFeatureType::Gene => "gene_direct_xref",
            EnsemblFeatureType::Transcript => "transcript_direct_xref",
            EnsemblFeatureType::Translation => "translation_direct_xref",
        }
    }
}

impl std::str::FromStr for EnsemblFeatureType {
    type Err = crate::XrefError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gene" => Ok(EnsemblFeatureType::Gene),
            "transcript" => Ok(EnsemblFeatureType::Transcript),
            "translation" => Ok(EnsemblFeatureType::Translation),
            _ => Err(crate::XrefError::Parse(format!(
                "Invalid Ensembl feature type: {}",
                s
            ))),
        }
    }
}

/// How a direct xref was linked to its feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkageType {
    #[default]
    Direct,
}

impl LinkageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkageType::Direct => "DIRECT",
        }
    }
}

/// Xref reachable only through its master xref's accession
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentXref {
    /// Source name (e.g. "EMBL", "RefSeq_peptide")
    pub source_name: String,
    /// Source ID of the dependent xref itself
    pub source_id: u32,
    /// Source ID of the master xref that provides the linkage
    pub linkage_source_id: u32,
    pub accession: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

/// Xref mapped straight onto an Ensembl stable ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectXref {
    /// Ensembl stable ID (e.g. "ENSG00000166913")
    pub stable_id: String,
    pub feature_type: EnsemblFeatureType,
    #[serde(default)]
    pub linkage_type: LinkageType,
}

/// Primary xref with its sequence, synonyms and attached xrefs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefNode {
    /// Primary accession (e.g. "P31946")
    pub accession: String,
    /// Display label
    pub label: String,
    pub description: String,
    pub sequence: String,
    pub sequence_type: SequenceType,
    pub status: XrefStatus,
    /// Resolved `source.source_id`
    pub source_id: u32,
    pub species_id: u32,
    /// Secondary accessions, in file order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    /// Number of taxon codes that resolved to the species (diagnostic only)
    pub taxon_matches: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_xrefs: Vec<DependentXref>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub direct_xrefs: Vec<DirectXref>,
}

impl XrefNode {
    /// Create a peptide node labelled with its accession
    pub fn new(accession: impl Into<String>, source_id: u32, species_id: u32) -> Self {
        let accession = accession.into();
        Self {
            label: accession.clone(),
            accession,
            description: String::new(),
            sequence: String::new(),
            sequence_type: SequenceType::Peptide,
            status: XrefStatus::Experimental,
            source_id,
            species_id,
            synonyms: Vec::new(),
            taxon_matches: 0,
            dependent_xrefs: Vec::new(),
            direct_xrefs: Vec::new(),
        }
    }
}
