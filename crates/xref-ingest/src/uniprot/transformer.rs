//! Turns extracted UniProt records into xref graph nodes
//!
//! A record becomes a node only when one of its taxon codes belongs to the
//! run's species and its review status is known. The source ID comes from the
//! record's review tier and protein evidence level.

use regex::Regex;
use std::sync::LazyLock;
use xref_common::types::{DependentXref, DirectXref, SequenceType, XrefNode, XrefStatus};
use xref_common::Result;

use super::models::{ExtractedRecord, SourceIdMap, TaxonQualifier, TaxonomyMap};

/// `{ECO:...}` evidence attributions inside DE lines
#[allow(clippy::expect_used)]
static EVIDENCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{[^}]*\}").expect("valid evidence pattern"));

/// Why a record produced no node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No taxon code resolved to the run's species
    SpeciesMismatch,
    /// The `ID` line named a review tier other than Reviewed/Unreviewed
    UnrecognizedStatus,
    /// Primary accession is the literal "unreviewed"
    SentinelAccession,
    MissingAccession,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SpeciesMismatch => "species_mismatch",
            SkipReason::UnrecognizedStatus => "unrecognized_status",
            SkipReason::SentinelAccession => "sentinel_accession",
            SkipReason::MissingAccession => "missing_accession",
        }
    }
}

/// Result of evaluating one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    Node(XrefNode),
    Skipped(SkipReason),
}

impl Transformed {
    pub fn into_node(self) -> Option<XrefNode> {
        match self {
            Transformed::Node(node) => Some(node),
            Transformed::Skipped(_) => None,
        }
    }
}

/// Record-to-node conversion for one species run
///
/// Both lookup tables are fixed at construction and only read afterwards.
#[derive(Debug, Clone)]
pub struct Transformer {
    species_id: u32,
    taxonomy: TaxonomyMap,
    sources: SourceIdMap,
}

impl Transformer {
    pub fn new(species_id: u32, taxonomy: TaxonomyMap, sources: SourceIdMap) -> Self {
        Self {
            species_id,
            taxonomy,
            sources,
        }
    }

    pub fn species_id(&self) -> u32 {
        self.species_id
    }

    pub fn sources(&self) -> &SourceIdMap {
        &self.sources
    }

    /// Convert a record into a node, or `None` if it does not belong in this run
    ///
    /// Errors are configuration defects (unknown taxon qualifier, missing
    /// source ID) and should end the run.
    pub fn transform(&self, record: ExtractedRecord) -> Result<Option<XrefNode>> {
        Ok(self.evaluate(record)?.into_node())
    }

    /// Like [`Transformer::transform`], keeping the reason a record was skipped
    pub fn evaluate(&self, record: ExtractedRecord) -> Result<Transformed> {
        let taxon_matches = self.count_species_matches(&record)?;
        if taxon_matches == 0 {
            return Ok(Transformed::Skipped(SkipReason::SpeciesMismatch));
        }

        let Some(status) = record.status else {
            return Ok(Transformed::Skipped(SkipReason::UnrecognizedStatus));
        };

        // Only the sentinel rejects; an Unreviewed status on its own is loaded
        // under SPTREMBL.
        if record.has_sentinel_accession() {
            return Ok(Transformed::Skipped(SkipReason::SentinelAccession));
        }

        let Some(accession) = record.primary_accession() else {
            return Ok(Transformed::Skipped(SkipReason::MissingAccession));
        };

        let family = status.source_family();
        let priority = family.priority(record.evidence_level);
        let source_id = self.sources.resolve(family, priority)?;

        let (dependent_xrefs, direct_xrefs) = extract_cross_references(&record);

        Ok(Transformed::Node(XrefNode {
            accession: accession.to_string(),
            label: accession.to_string(),
            description: assemble_description(&record.description_lines),
            synonyms: record.synonyms().to_vec(),
            sequence: record.sequence,
            sequence_type: SequenceType::Peptide,
            status: XrefStatus::Experimental,
            source_id,
            species_id: self.species_id,
            taxon_matches,
            dependent_xrefs,
            direct_xrefs,
        }))
    }

    /// Number of taxon codes that map to the run's species
    fn count_species_matches(&self, record: &ExtractedRecord) -> Result<usize> {
        let mut matches = 0;
        for taxon in &record.taxon_codes {
            let qualifier = TaxonQualifier::from_qualifier(&taxon.qualifier)?;
            let species = qualifier
                .taxonomy_id(&taxon.code)
                .and_then(|taxonomy_id| self.taxonomy.species_for(taxonomy_id));

            if species == Some(self.species_id) {
                matches += 1;
            }
        }
        Ok(matches)
    }
}

/// Dependent and direct xrefs carried by an entry's `DR` lines
///
/// Not implemented yet: no DR database is mapped to a dependent or direct
/// source, so both collections are always empty. Loaders already persist
/// whatever a node carries.
pub fn extract_cross_references(_record: &ExtractedRecord) -> (Vec<DependentXref>, Vec<DirectXref>) {
    (Vec::new(), Vec::new())
}

/// Build a one-line description from `DE` line bodies
///
/// The entry's own `Full=` names are used, RecName/SubName first and AltNames
/// after, joined with "; ". Names inside `Contains:`/`Includes:` sections
/// describe other chains or domains and are left out.
pub fn assemble_description(lines: &[String]) -> String {
    let mut names = Vec::new();

    for line in lines {
        let line = line.trim_start();
        if line.starts_with("Contains:") || line.starts_with("Includes:") {
            break;
        }
        let Some((_, name)) = line.split_once("Full=") else {
            continue;
        };
        let name = EVIDENCE_TAG.replace_all(name, "");
        let name = name.trim().trim_end_matches(';').trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }

    names.join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::uniprot::models::{
        ReviewStatus, SourceFamily, SourcePriority, TaxonCode,
    };
    use xref_common::XrefError;

    const HUMAN: u32 = 9606;

    fn transformer() -> Transformer {
        let sources = SourceIdMap::new()
            .with(SourceFamily::SwissProt, SourcePriority::SequenceMapped, 139)
            .with(SourceFamily::SpTrembl, SourcePriority::SequenceMapped, 140)
            .with(SourceFamily::SpTrembl, SourcePriority::ProteinEvidenceGt2, 141);
        Transformer::new(HUMAN, TaxonomyMap::for_species(HUMAN, [63221]), sources)
    }

    fn record(accessions: &[&str], status: ReviewStatus, evidence_level: u8) -> ExtractedRecord {
        ExtractedRecord {
            accessions: accessions.iter().map(|s| s.to_string()).collect(),
            entry_name: Some("TEST_HUMAN".to_string()),
            status: Some(status),
            evidence_level,
            description_lines: vec!["RecName: Full=Test protein;".to_string()],
            sequence: "MKT".to_string(),
            taxon_codes: vec![TaxonCode::ncbi(HUMAN)],
            ..Default::default()
        }
    }

    #[test]
    fn test_reviewed_record_becomes_swissprot_node() {
        let node = transformer()
            .transform(record(&["P12345", "Q99999"], ReviewStatus::Reviewed, 1))
            .unwrap()
            .expect("node");

        assert_eq!(node.accession, "P12345");
        assert_eq!(node.label, "P12345");
        assert_eq!(node.synonyms, vec!["Q99999"]);
        assert_eq!(node.source_id, 139);
        assert_eq!(node.species_id, HUMAN);
        assert_eq!(node.description, "Test protein");
        assert_eq!(node.sequence, "MKT");
        assert_eq!(node.sequence_type, SequenceType::Peptide);
        assert_eq!(node.status, XrefStatus::Experimental);
        assert_eq!(node.taxon_matches, 1);
    }

    #[test]
    fn test_reviewed_ignores_evidence_level() {
        let t = transformer();
        for level in 1..=5 {
            let node = t
                .transform(record(&["P12345"], ReviewStatus::Reviewed, level))
                .unwrap()
                .unwrap();
            assert_eq!(node.source_id, 139);
        }
    }

    #[test]
    fn test_unreviewed_evidence_split() {
        let t = transformer();
        let low = t.transform(record(&["A0A000"], ReviewStatus::Unreviewed, 2)).unwrap().unwrap();
        assert_eq!(low.source_id, 140);

        let high = t.transform(record(&["A0A000"], ReviewStatus::Unreviewed, 4)).unwrap().unwrap();
        assert_eq!(high.source_id, 141);
    }

    #[test]
    fn test_other_species_is_skipped() {
        let mut mouse = record(&["P12345"], ReviewStatus::Reviewed, 1);
        mouse.taxon_codes = vec![TaxonCode::ncbi(10090)];

        assert_eq!(
            transformer().evaluate(mouse).unwrap(),
            Transformed::Skipped(SkipReason::SpeciesMismatch)
        );
    }

    #[test]
    fn test_no_taxon_codes_is_skipped() {
        let mut r = record(&["P12345"], ReviewStatus::Reviewed, 1);
        r.taxon_codes.clear();
        assert!(transformer().transform(r).unwrap().is_none());
    }

    #[test]
    fn test_recognised_subspecies_taxon_counts() {
        let mut r = record(&["P12345"], ReviewStatus::Reviewed, 1);
        r.taxon_codes = vec![TaxonCode::ncbi(63221), TaxonCode::ncbi(HUMAN), TaxonCode::ncbi(10090)];

        let node = transformer().transform(r).unwrap().unwrap();
        assert_eq!(node.taxon_matches, 2);
    }

    #[test]
    fn test_sentinel_accession_rejected_for_any_status() {
        let t = transformer();
        for status in [ReviewStatus::Reviewed, ReviewStatus::Unreviewed] {
            let r = record(&["UNREVIEWED", "Q99999"], status, 1);
            assert_eq!(
                t.evaluate(r).unwrap(),
                Transformed::Skipped(SkipReason::SentinelAccession)
            );
        }
    }

    #[test]
    fn test_sentinel_without_species_match_is_none() {
        let mut r = record(&["unreviewed"], ReviewStatus::Unreviewed, 1);
        r.taxon_codes = vec![TaxonCode::ncbi(10090)];
        assert!(transformer().transform(r).unwrap().is_none());
    }

    #[test]
    fn test_unrecognised_status_is_skipped() {
        let mut r = record(&["P12345"], ReviewStatus::Reviewed, 1);
        r.status = None;
        assert_eq!(
            transformer().evaluate(r).unwrap(),
            Transformed::Skipped(SkipReason::UnrecognizedStatus)
        );
    }

    #[test]
    fn test_unknown_qualifier_is_fatal() {
        let mut r = record(&["P12345"], ReviewStatus::Reviewed, 1);
        r.taxon_codes.push(TaxonCode::new("GTDB_TaxID", "123"));

        let err = transformer().transform(r).unwrap_err();
        assert!(matches!(err, XrefError::UnknownTaxonQualifier(_)));
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let t = Transformer::new(
            HUMAN,
            TaxonomyMap::for_species(HUMAN, []),
            SourceIdMap::new().with(SourceFamily::SwissProt, SourcePriority::SequenceMapped, 139),
        );

        let err = t
            .transform(record(&["A0A000"], ReviewStatus::Unreviewed, 3))
            .unwrap_err();
        match err {
            XrefError::MissingSource { family, priority } => {
                assert_eq!(family, "Uniprot/SPTREMBL");
                assert_eq!(priority, "protein_evidence_gt_2");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_accession_is_skipped_before_source_lookup() {
        let t = Transformer::new(HUMAN, TaxonomyMap::for_species(HUMAN, []), SourceIdMap::new());

        let result = t.evaluate(record(&[], ReviewStatus::Unreviewed, 3)).unwrap();
        assert_eq!(result, Transformed::Skipped(SkipReason::MissingAccession));
    }

    #[test]
    fn test_cross_reference_hook_is_empty() {
        let mut r = record(&["P12345"], ReviewStatus::Reviewed, 1);
        r.cross_reference_lines = vec!["EMBL; X57346; CAA40621.1; -; mRNA.".to_string()];

        let node = transformer().transform(r).unwrap().unwrap();
        assert!(node.dependent_xrefs.is_empty());
        assert!(node.direct_xrefs.is_empty());
    }

    #[test]
    fn test_assemble_description() {
        let lines: Vec<String> = [
            "RecName: Full=Alpha-amylase {ECO:0000269|PubMed:123};",
            "         Short=AMY;",
            "         EC=3.2.1.1;",
            "AltName: Full=1,4-alpha-D-glucan glucanohydrolase;",
            "Contains:",
            "  RecName: Full=Some peptide;",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(
            assemble_description(&lines),
            "Alpha-amylase; 1,4-alpha-D-glucan glucanohydrolase"
        );
        assert_eq!(assemble_description(&[]), "");
    }

    #[test]
    fn test_submitted_name_description() {
        let lines = vec!["SubName: Full=Uncharacterized protein {ECO:0000313|EMBL:X};".to_string()];
        assert_eq!(assemble_description(&lines), "Uncharacterized protein");
    }
}
