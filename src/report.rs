//! Top-level aggregate: an ordered set of files plus the session registry.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::OnceCell;

use crate::error::{CovrepError, Result};
use crate::file::ReportFile;
use crate::session::Session;
use crate::totals::ReportTotals;

/// All coverage known for one commit.
///
/// Files keep their insertion order; sessions are keyed by the integer ids
/// handed out at append time. Mutation goes through `&mut` methods, so a
/// built report can be shared across threads for reading.
#[derive(Debug, Clone, Default)]
pub struct Report {
    files: Vec<ReportFile>,
    index: HashMap<String, usize>,
    sessions: BTreeMap<u32, Session>,
    totals: OnceCell<ReportTotals>,
}

impl Report {
    #[must_use]
    pub fn new() -> Self {
        Report::default()
    }

    /// File paths in insertion order.
    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(ReportFile::name)
    }

    pub fn files(&self) -> impl Iterator<Item = &ReportFile> {
        self.files.iter()
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn sessions(&self) -> &BTreeMap<u32, Session> {
        &self.sessions
    }

    #[must_use]
    pub fn get_session(&self, id: u32) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Insert a file, preserving insertion order. Paths are unique.
    pub fn append(&mut self, file: ReportFile) -> Result<()> {
        if self.index.contains_key(file.name()) {
            return Err(CovrepError::DuplicatePath(file.name().to_string()));
        }
        self.index.insert(file.name().to_string(), self.files.len());
        self.files.push(file);
        self.invalidate();
        Ok(())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&ReportFile> {
        let index = *self.index.get(path)?;
        self.files.get(index)
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut ReportFile> {
        // the caller may mutate the file, so the cached totals cannot be trusted
        self.invalidate();
        let index = *self.index.get(path)?;
        self.files.get_mut(index)
    }

    /// Register a session and return its id: max existing + 1, or 0.
    pub fn add_session(&mut self, session: Session) -> u32 {
        let id = self.sessions.keys().next_back().map_or(0, |max| max + 1);
        self.sessions.insert(id, session);
        self.invalidate();
        id
    }

    /// Restore a session under an explicit id (codec use only).
    pub(crate) fn insert_session(&mut self, id: u32, session: Session) {
        self.sessions.insert(id, session);
        self.invalidate();
    }

    /// Fold `other` into this report. Sessions already present under the
    /// same id with identical metadata are reused; any other session is
    /// appended under a fresh id, and every migrated line contribution is
    /// rewritten through the resulting renumbering table. Files are merged
    /// by path, deep-copied when absent here.
    pub fn merge(&mut self, other: &Report) {
        let mut remap: BTreeMap<u32, u32> = BTreeMap::new();
        for (old_id, session) in &other.sessions {
            if self.sessions.get(old_id) == Some(session) {
                remap.insert(*old_id, *old_id);
            } else {
                let new_id = self.add_session(session.clone());
                remap.insert(*old_id, new_id);
            }
        }
        log::debug!(
            "merging report: {} files, {} sessions",
            other.files.len(),
            remap.len()
        );
        for file in &other.files {
            let mut incoming = file.clone();
            incoming.remap_session_ids(&remap);
            match self.index.get(file.name()).copied() {
                Some(position) => {
                    self.files[position].merge(&incoming);
                }
                None => {
                    self.index.insert(file.name().to_string(), self.files.len());
                    self.files.push(incoming);
                }
            }
        }
        self.invalidate();
    }

    /// Global totals: file totals summed, plus file and session counts.
    /// Cached until the next mutation.
    #[must_use]
    pub fn totals(&self) -> ReportTotals {
        self.totals
            .get_or_init(|| {
                let mut totals = ReportTotals::default();
                for file in &self.files {
                    totals.add(&file.totals());
                    totals.files += 1;
                }
                totals.sessions = self.sessions.len() as u64;
                totals
            })
            .clone()
    }

    /// Check that every line contribution references a registered session.
    pub fn validate(&self) -> Result<()> {
        for file in &self.files {
            for (_, line) in file.lines() {
                for session in &line.sessions {
                    if !self.sessions.contains_key(&session.session_id) {
                        return Err(CovrepError::UnknownSession(session.session_id));
                    }
                }
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.totals = OnceCell::new();
    }
}
