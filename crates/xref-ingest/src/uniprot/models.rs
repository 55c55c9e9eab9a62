//! UniProt record and lookup-table models

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use xref_common::{Result, XrefError};

/// Literal some malformed distributions carry in place of a primary accession
pub const SENTINEL_ACCESSION: &str = "unreviewed";

/// Review tier from the `ID` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewStatus {
    /// Manually curated (Swiss-Prot)
    Reviewed,
    /// Automatically annotated (TrEMBL)
    Unreviewed,
}

impl ReviewStatus {
    /// Source family records of this tier are loaded under
    pub fn source_family(self) -> SourceFamily {
        match self {
            ReviewStatus::Reviewed => SourceFamily::SwissProt,
            ReviewStatus::Unreviewed => SourceFamily::SpTrembl,
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = XrefError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Reviewed" => Ok(ReviewStatus::Reviewed),
            "Unreviewed" => Ok(ReviewStatus::Unreviewed),
            _ => Err(XrefError::Parse(format!("Unrecognised review status: {}", s))),
        }
    }
}

/// UniProt source families in the xref `source` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceFamily {
    SwissProt,
    SpTrembl,
}

impl SourceFamily {
    pub const ALL: [SourceFamily; 2] = [SourceFamily::SwissProt, SourceFamily::SpTrembl];

    /// Value of `source.name`
    pub fn name(self) -> &'static str {
        match self {
            SourceFamily::SwissProt => "Uniprot/SWISSPROT",
            SourceFamily::SpTrembl => "Uniprot/SPTREMBL",
        }
    }

    /// Priority tag for a record with the given protein evidence level
    ///
    /// Swiss-Prot entries are always sequence mapped. TrEMBL entries above
    /// evidence level 2 (transcript-level evidence) go to a lower-priority
    /// source.
    pub fn priority(self, evidence_level: u8) -> SourcePriority {
        match self {
            SourceFamily::SwissProt => SourcePriority::SequenceMapped,
            SourceFamily::SpTrembl if evidence_level <= 2 => SourcePriority::SequenceMapped,
            SourceFamily::SpTrembl => SourcePriority::ProteinEvidenceGt2,
        }
    }
}

impl std::fmt::Display for SourceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceFamily {
    type Err = XrefError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SourceFamily::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| XrefError::Config(format!("Unknown UniProt source family: {}", s)))
    }
}

/// Value of `source.priority_description`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourcePriority {
    SequenceMapped,
    ProteinEvidenceGt2,
}

impl SourcePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            SourcePriority::SequenceMapped => "sequence_mapped",
            SourcePriority::ProteinEvidenceGt2 => "protein_evidence_gt_2",
        }
    }
}

impl std::fmt::Display for SourcePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourcePriority {
    type Err = XrefError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sequence_mapped" => Ok(SourcePriority::SequenceMapped),
            "protein_evidence_gt_2" => Ok(SourcePriority::ProteinEvidenceGt2),
            _ => Err(XrefError::Config(format!("Unknown source priority: {}", s))),
        }
    }
}

/// Taxonomy database named on the left of an `OX` assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxonQualifier {
    /// `NCBI_TaxID=9606`
    NcbiTaxId,
}

impl TaxonQualifier {
    /// Look up the mapper for a raw qualifier
    ///
    /// A qualifier without a mapper means the run cannot interpret the file
    /// at all, so this is a configuration error rather than a skip.
    pub fn from_qualifier(qualifier: &str) -> Result<Self> {
        match qualifier {
            "NCBI_TaxID" => Ok(TaxonQualifier::NcbiTaxId),
            other => Err(XrefError::UnknownTaxonQualifier(other.to_string())),
        }
    }

    /// Numeric taxonomy ID for a code, if it is well formed
    pub fn taxonomy_id(self, code: &str) -> Option<u32> {
        match self {
            TaxonQualifier::NcbiTaxId => code.trim().parse().ok(),
        }
    }
}

/// One `qualifier=code` pair from an `OX` line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonCode {
    pub qualifier: String,
    pub code: String,
}

impl TaxonCode {
    pub fn new(qualifier: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            code: code.into(),
        }
    }

    pub fn ncbi(taxonomy_id: u32) -> Self {
        Self::new("NCBI_TaxID", taxonomy_id.to_string())
    }
}

/// Raw fields of one flat-file entry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Accessions in file order; the first is the primary accession
    pub accessions: Vec<String>,
    /// Entry name from the `ID` line (e.g. "143B_HUMAN")
    pub entry_name: Option<String>,
    /// `None` when the `ID` line names a tier this parser does not know
    pub status: Option<ReviewStatus>,
    /// Protein existence level from the `PE` line (1 = protein level)
    pub evidence_level: u8,
    /// `DE` line bodies, tag stripped
    pub description_lines: Vec<String>,
    /// Amino acids with whitespace removed
    pub sequence: String,
    pub taxon_codes: Vec<TaxonCode>,
    /// `DR` line bodies
    pub cross_reference_lines: Vec<String>,
    /// `GN` line bodies
    pub gene_name_lines: Vec<String>,
    /// `CC` line bodies
    pub comment_lines: Vec<String>,
}

impl ExtractedRecord {
    pub fn primary_accession(&self) -> Option<&str> {
        self.accessions.first().map(String::as_str)
    }

    /// Secondary accessions, in file order
    pub fn synonyms(&self) -> &[String] {
        self.accessions.get(1..).unwrap_or_default()
    }

    /// Whether the primary accession is the malformed-file sentinel
    pub fn has_sentinel_accession(&self) -> bool {
        self.primary_accession()
            .is_some_and(|acc| acc.eq_ignore_ascii_case(SENTINEL_ACCESSION))
    }
}

/// Taxonomy ID → species ID for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyMap {
    species: HashMap<u32, u32>,
}

impl TaxonomyMap {
    /// Map the species' recognised taxa, and the species ID itself, to the species
    pub fn for_species(species_id: u32, taxonomy_ids: impl IntoIterator<Item = u32>) -> Self {
        let mut species: HashMap<u32, u32> = taxonomy_ids
            .into_iter()
            .map(|taxonomy_id| (taxonomy_id, species_id))
            .collect();
        species.insert(species_id, species_id);
        Self { species }
    }

    pub fn species_for(&self, taxonomy_id: u32) -> Option<u32> {
        self.species.get(&taxonomy_id).copied()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

/// One `FAMILY:PRIORITY=ID` assignment, as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceAssignment {
    pub family: SourceFamily,
    pub priority: SourcePriority,
    pub source_id: u32,
}

impl std::str::FromStr for SourceAssignment {
    type Err = XrefError;

    /// Parse `Uniprot/SWISSPROT:sequence_mapped=139`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || {
            XrefError::Config(format!(
                "Invalid source assignment '{}', expected FAMILY:PRIORITY=ID",
                s
            ))
        };

        let (key, id) = s.split_once('=').ok_or_else(invalid)?;
        let (family, priority) = key.rsplit_once(':').ok_or_else(invalid)?;

        Ok(Self {
            family: family.trim().parse()?,
            priority: priority.trim().parse()?,
            source_id: id.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// (family, priority) → `source.source_id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIdMap {
    ids: BTreeMap<(SourceFamily, SourcePriority), u32>,
}

impl SourceIdMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: SourceFamily, priority: SourcePriority, source_id: u32) {
        self.ids.insert((family, priority), source_id);
    }

    pub fn with(mut self, family: SourceFamily, priority: SourcePriority, source_id: u32) -> Self {
        self.insert(family, priority, source_id);
        self
    }

    pub fn get(&self, family: SourceFamily, priority: SourcePriority) -> Option<u32> {
        self.ids.get(&(family, priority)).copied()
    }

    /// Source ID for a family/priority pair, failing if it was never loaded
    pub fn resolve(&self, family: SourceFamily, priority: SourcePriority) -> Result<u32> {
        self.get(family, priority).ok_or_else(|| XrefError::MissingSource {
            family: family.name().to_string(),
            priority: priority.as_str().to_string(),
        })
    }

    /// Every source ID loaded for a family
    pub fn source_ids(&self, family: SourceFamily) -> Vec<u32> {
        self.ids
            .iter()
            .filter(|((f, _), _)| *f == family)
            .map(|(_, &id)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<SourceAssignment> for SourceIdMap {
    fn from_iter<I: IntoIterator<Item = SourceAssignment>>(iter: I) -> Self {
        let mut map = SourceIdMap::new();
        for a in iter {
            map.insert(a.family, a.priority, a.source_id);
        }
        map
    }
}
