//! UniProt flat-file (DAT) extractor
//!
//! Streams `//`-terminated entries out of a Swiss-Prot/TrEMBL flat file and
//! yields one [`ExtractedRecord`] per entry. Only the line types the xref
//! pipeline consumes are kept; everything else is ignored.
//! See: https://web.expasy.org/docs/userman.html
//!
//! Entries missing an accession, a protein existence level or a sequence are
//! skipped and counted, as are entries containing bytes that are not UTF-8.
//! Read errors end the stream with an error.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::string::FromUtf8Error;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::models::{ExtractedRecord, ReviewStatus, TaxonCode};

/// `qualifier=code` inside an `OX` line, evidence tags excluded
#[allow(clippy::expect_used)]
static TAXON_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_]+)=([^;\s{]+)").expect("valid OX pattern"));

/// Lazy reader of UniProt entries
pub struct UniProtExtractor<R> {
    reader: R,
    buf: Vec<u8>,
    limit: Option<usize>,
    line_number: usize,
    emitted: usize,
    skipped: usize,
    finished: bool,
}

impl UniProtExtractor<Box<dyn BufRead + Send>> {
    /// Open a flat file, decompressing it when the name ends in `.gz`
    ///
    /// The file handle is owned by the extractor and closed when it is dropped.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open UniProt file: {}", path.display()))?;

        let reader: Box<dyn BufRead + Send> =
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                Box::new(BufReader::new(MultiGzDecoder::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };

        Ok(Self::new(reader))
    }
}

impl<R: BufRead> UniProtExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            limit: None,
            line_number: 0,
            emitted: 0,
            skipped: 0,
            finished: false,
        }
    }

    /// Stop after `limit` records have been yielded
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Malformed entries skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Records yielded so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Next line without its terminator, or the undecodable line as an inner error
    fn next_line(&mut self) -> std::io::Result<Option<std::result::Result<String, FromUtf8Error>>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8(std::mem::take(&mut self.buf))))
    }

    fn skip(&mut self, builder: &EntryBuilder, reason: &str) {
        self.skipped += 1;
        warn!(
            line = self.line_number,
            accession = builder.accessions.first().map(String::as_str).unwrap_or("-"),
            reason,
            "Skipping malformed UniProt entry"
        );
    }
}

impl<R: BufRead> Iterator for UniProtExtractor<R> {
    type Item = Result<ExtractedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.limit.is_some_and(|limit| self.emitted >= limit) {
            return None;
        }

        let mut builder = EntryBuilder::default();

        loop {
            let line = match self.next_line() {
                Ok(Some(Ok(line))) => line,
                Ok(Some(Err(_))) => {
                    self.line_number += 1;
                    debug!(line = self.line_number, "Line is not valid UTF-8");
                    builder.mark_error("invalid UTF-8");
                    continue;
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e).with_context(|| {
                        format!("Failed to read UniProt file at line {}", self.line_number + 1)
                    }));
                },
                Ok(None) => {
                    self.finished = true;
                    if !builder.is_empty() {
                        self.skip(&builder, "entry not terminated by //");
                    }
                    return None;
                },
            };
            self.line_number += 1;

            if line.trim_end() == "//" {
                match builder.build() {
                    Ok(record) => {
                        self.emitted += 1;
                        return Some(Ok(record));
                    },
                    Err((partial, reason)) => {
                        self.skip(&partial, reason);
                        builder = EntryBuilder::default();
                        continue;
                    },
                }
            }

            builder.push_line(&line);
        }
    }
}

/// Accumulates the lines of one entry
#[derive(Debug, Default)]
struct EntryBuilder {
    accessions: Vec<String>,
    entry_name: Option<String>,
    status: Option<ReviewStatus>,
    evidence_level: Option<u8>,
    description_lines: Vec<String>,
    taxon_codes: Vec<TaxonCode>,
    cross_reference_lines: Vec<String>,
    gene_name_lines: Vec<String>,
    comment_lines: Vec<String>,
    sequence: String,
    in_sequence: bool,
    seen_lines: usize,
    error: Option<&'static str>,
}

impl EntryBuilder {
    fn is_empty(&self) -> bool {
        self.seen_lines == 0
    }

    /// Keep the entry's lines counted but reject it at `//`
    fn mark_error(&mut self, reason: &'static str) {
        self.seen_lines += 1;
        self.error.get_or_insert(reason);
    }

    fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.seen_lines += 1;

        // Sequence data lines start with blanks instead of a tag
        if self.in_sequence && line.starts_with("  ") {
            self.parse_sequence_line(line);
            return;
        }

        let Some(tag) = line.get(..2) else {
            return;
        };
        let body = line.get(5..).unwrap_or("").trim_end();

        match tag {
            "ID" => self.parse_id_line(body),
            "AC" => self.parse_ac_line(body),
            "DE" => self.description_lines.push(body.to_string()),
            "PE" => self.parse_pe_line(body),
            "OX" => self.parse_ox_line(body),
            "GN" => self.gene_name_lines.push(body.to_string()),
            "DR" => self.cross_reference_lines.push(body.to_string()),
            "CC" => self.comment_lines.push(body.to_string()),
            "SQ" => self.in_sequence = true,
            _ => {},
        }
    }

    /// ID   143B_HUMAN              Reviewed;         246 AA.
    fn parse_id_line(&mut self, body: &str) {
        let mut parts = body.split_whitespace();
        self.entry_name = parts.next().map(str::to_string);
        self.status = parts
            .next()
            .and_then(|status| status.trim_end_matches(';').parse().ok());

        if self.status.is_none() {
            debug!(entry_name = ?self.entry_name, "Unrecognised review status on ID line");
        }
    }

    /// AC   P31946; A8K9K2; E1P616;
    fn parse_ac_line(&mut self, body: &str) {
        self.accessions.extend(
            body.split(';')
                .map(str::trim)
                .filter(|acc| !acc.is_empty())
                .map(str::to_string),
        );
    }

    /// PE   1: Evidence at protein level;
    fn parse_pe_line(&mut self, body: &str) {
        let level = body
            .split(':')
            .next()
            .and_then(|level| level.trim().parse::<u8>().ok())
            .filter(|&level| level > 0);

        match level {
            Some(level) => self.evidence_level = Some(level),
            None => self.error = Some("unparseable PE line"),
        }
    }

    /// OX   NCBI_TaxID=9606;
    fn parse_ox_line(&mut self, body: &str) {
        for caps in TAXON_CODE.captures_iter(body) {
            self.taxon_codes.push(TaxonCode::new(&caps[1], &caps[2]));
        }
    }

    /// Sequence lines hold blocks of ten residues separated by blanks
    fn parse_sequence_line(&mut self, line: &str) {
        self.sequence
            .extend(line.chars().filter(|c| !c.is_whitespace()));
    }

    fn build(self) -> std::result::Result<ExtractedRecord, (EntryBuilder, &'static str)> {
        let reason = if let Some(error) = self.error {
            error
        } else if self.accessions.is_empty() {
            "missing AC line"
        } else if self.evidence_level.is_none() {
            "missing PE line"
        } else if self.sequence.is_empty() {
            "missing sequence"
        } else {
            let evidence_level = self.evidence_level.unwrap_or_default();
            return Ok(ExtractedRecord {
                accessions: self.accessions,
                entry_name: self.entry_name,
                status: self.status,
                evidence_level,
                description_lines: self.description_lines,
                sequence: self.sequence,
                taxon_codes: self.taxon_codes,
                cross_reference_lines: self.cross_reference_lines,
                gene_name_lines: self.gene_name_lines,
                comment_lines: self.comment_lines,
            });
        };

        Err((self, reason))
    }
}
