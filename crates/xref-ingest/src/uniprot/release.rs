//! UniProt release metadata (`reldate.txt`)
//!
//! ```text
//! UniProt Knowledgebase Release 2024_01 consists of:
//! UniProtKB/Swiss-Prot Release 2024_01 of 24-Jan-2024
//! UniProtKB/TrEMBL Release 2024_01 of 24-Jan-2024
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::models::SourceFamily;

#[allow(clippy::expect_used)]
static RELEASE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(UniProtKB/(Swiss-Prot|TrEMBL) Release (\S+) of (\S+))")
        .expect("valid release pattern")
});

/// One database line of the release file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLine {
    /// Full line, stored as the source release string
    pub text: String,
    /// Release version (e.g. "2024_01")
    pub version: String,
    pub date: Option<NaiveDate>,
}

/// Release lines for the two UniProtKB sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniProtRelease {
    pub swissprot: Option<ReleaseLine>,
    pub trembl: Option<ReleaseLine>,
}

impl UniProtRelease {
    pub fn parse_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read release file: {}", path.display()))?;
        Self::parse_str(&text)
            .with_context(|| format!("Invalid release file: {}", path.display()))
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut release = Self::default();

        for caps in RELEASE_LINE.captures_iter(text) {
            let line = ReleaseLine {
                text: caps[1].to_string(),
                version: caps[3].to_string(),
                date: NaiveDate::parse_from_str(&caps[4], "%d-%b-%Y").ok(),
            };

            match &caps[2] {
                "Swiss-Prot" => release.swissprot.get_or_insert(line),
                _ => release.trembl.get_or_insert(line),
            };
        }

        anyhow::ensure!(
            release.swissprot.is_some() || release.trembl.is_some(),
            "No UniProtKB release line found"
        );

        Ok(release)
    }

    /// Release line that applies to a source family
    pub fn for_family(&self, family: SourceFamily) -> Option<&ReleaseLine> {
        match family {
            SourceFamily::SwissProt => self.swissprot.as_ref(),
            SourceFamily::SpTrembl => self.trembl.as_ref(),
        }
    }
}
