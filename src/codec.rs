//! Stable, versioned compact form of a report for persistence.
//!
//! Field order is fixed by the serde structs and every map is a `BTreeMap`,
//! so the encoding never depends on in-memory iteration order: re-encoding
//! a decoded report is byte-identical. File insertion order is carried by
//! each index entry rather than by key order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CovrepError, Result};
use crate::file::ReportFile;
use crate::line::{Complexity, CoverageValue, LineSession, ReportLine};
use crate::report::Report;
use crate::session::Session;
use crate::totals::ReportTotals;

/// Bump when the persisted schema changes shape.
pub const FORMAT_VERSION: u32 = 1;

/// Index entry for one file: its insertion position and cached totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIndexEntry {
    pub index: u32,
    pub totals: ReportTotals,
}

/// One archived line:
/// `(line_no, coverage, type, sessions, messages, complexity)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveLine(
    pub u32,
    pub CoverageValue,
    pub Option<String>,
    pub Vec<LineSession>,
    pub Option<Vec<String>>,
    pub Option<Complexity>,
);

/// The complete persisted representation of a [`Report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedForm {
    pub version: u32,
    pub totals: ReportTotals,
    pub files: BTreeMap<String, FileIndexEntry>,
    pub sessions: BTreeMap<u32, Session>,
    /// Per-file line archive, absent lines omitted.
    pub archive: BTreeMap<String, Vec<ArchiveLine>>,
}

#[must_use]
pub fn to_persisted_form(report: &Report) -> PersistedForm {
    let mut files = BTreeMap::new();
    let mut archive = BTreeMap::new();
    for (position, file) in report.files().enumerate() {
        files.insert(
            file.name().to_string(),
            FileIndexEntry {
                index: position as u32,
                totals: file.totals(),
            },
        );
        let lines = file
            .lines()
            .map(|(line_no, line)| {
                ArchiveLine(
                    line_no,
                    line.coverage.clone(),
                    line.line_type.clone(),
                    line.sessions.clone(),
                    line.messages.clone(),
                    line.complexity,
                )
            })
            .collect();
        archive.insert(file.name().to_string(), lines);
    }
    PersistedForm {
        version: FORMAT_VERSION,
        totals: report.totals(),
        files,
        sessions: report.sessions().clone(),
        archive,
    }
}

/// Rebuild a report from its persisted form, restoring file insertion
/// order from the index entries and validating session references.
pub fn from_persisted_form(form: &PersistedForm) -> Result<Report> {
    if form.version != FORMAT_VERSION {
        return Err(CovrepError::UnsupportedVersion(form.version));
    }

    let mut report = Report::new();
    for (id, session) in &form.sessions {
        report.insert_session(*id, session.clone());
    }

    let mut ordered: Vec<(&String, &FileIndexEntry)> = form.files.iter().collect();
    ordered.sort_by_key(|(_, entry)| entry.index);
    for (path, _) in ordered {
        let mut file = ReportFile::new(path.clone());
        for archived in form.archive.get(path).into_iter().flatten() {
            let ArchiveLine(line_no, coverage, line_type, sessions, messages, complexity) =
                archived.clone();
            file.append(
                line_no,
                ReportLine {
                    coverage,
                    line_type,
                    sessions,
                    messages,
                    complexity,
                },
            )?;
        }
        report.append(file)?;
    }
    report.validate()?;
    Ok(report)
}

pub fn encode(report: &Report) -> Result<String> {
    Ok(serde_json::to_string(&to_persisted_form(report))?)
}

pub fn decode(encoded: &str) -> Result<Report> {
    let form: PersistedForm = serde_json::from_str(encoded)?;
    from_persisted_form(&form)
}
