//! A sparse, line-number-indexed coverage container for one source path.
//!
//! Line numbers are 1-based; absent slots are untracked lines. Ignore rules
//! are applied on write (a suppressed write is skipped entirely), the line
//! projection on read. Totals are computed lazily and cached until the next
//! mutation.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::OnceCell;

use crate::diff::FileDiff;
use crate::error::{CovrepError, Result};
use crate::line::{CoverageKind, ReportLine};
use crate::merge::merge_line;
use crate::totals::{ratio, ReportTotals};

/// Write-side suppression rules: an optional end-of-file boundary plus an
/// explicit set of line numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRules {
    /// Lines strictly beyond this boundary are not tracked.
    pub eof: Option<u32>,
    pub lines: BTreeSet<u32>,
}

impl IgnoreRules {
    #[must_use]
    pub fn suppresses(&self, line_no: u32) -> bool {
        self.eof.is_some_and(|eof| line_no > eof) || self.lines.contains(&line_no)
    }
}

/// Read-side projection: a data-only predicate that can hide a line based
/// on external filter state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineProjection {
    /// Hide lines with no contribution from any of the given sessions.
    RequireSessions(BTreeSet<u32>),
}

impl LineProjection {
    #[must_use]
    pub fn admits(&self, line: &ReportLine) -> bool {
        match self {
            LineProjection::RequireSessions(ids) => {
                line.sessions.iter().any(|s| ids.contains(&s.session_id))
            }
        }
    }
}

/// Per-line coverage for one source path.
#[derive(Debug, Clone)]
pub struct ReportFile {
    name: String,
    /// Slot `i` holds line `i + 1`.
    lines: Vec<Option<ReportLine>>,
    ignore: Option<IgnoreRules>,
    projection: Option<LineProjection>,
    totals: OnceCell<ReportTotals>,
}

impl PartialEq for ReportFile {
    fn eq(&self, other: &Self) -> bool {
        // the totals cache is derived state
        self.name == other.name
            && self.lines == other.lines
            && self.ignore == other.ignore
            && self.projection == other.projection
    }
}

impl ReportFile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ReportFile {
            name: name.into(),
            lines: Vec::new(),
            ignore: None,
            projection: None,
            totals: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_ignore(&mut self, ignore: Option<IgnoreRules>) {
        self.ignore = ignore;
    }

    pub fn set_projection(&mut self, projection: Option<LineProjection>) {
        self.projection = projection;
        self.invalidate();
    }

    /// One past the highest line slot ever stored.
    #[must_use]
    pub fn eof(&self) -> u32 {
        self.lines.len() as u32 + 1
    }

    /// Number of visible tracked lines; absent slots do not count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines().next().is_none()
    }

    /// Whether `line_no` holds a visible tracked line.
    #[must_use]
    pub fn contains(&self, line_no: u32) -> bool {
        line_no > 0
            && self
                .slot(line_no)
                .is_some_and(|line| self.admits(line))
    }

    /// Iterate visible tracked lines as `(line_no, line)` in line order.
    pub fn lines(&self) -> impl Iterator<Item = (u32, &ReportLine)> {
        self.lines.iter().enumerate().filter_map(move |(i, slot)| {
            slot.as_ref()
                .filter(|line| self.admits(line))
                .map(|line| (i as u32 + 1, line))
        })
    }

    pub fn get(&self, line_no: u32) -> Result<Option<&ReportLine>> {
        let _ = Self::slot_index(line_no)?;
        Ok(self.slot(line_no).filter(|line| self.admits(line)))
    }

    /// Store `line` at `line_no`, extending the backing sequence as needed.
    /// Returns `false` (and skips storage) when the ignore rules suppress
    /// the line number.
    pub fn set(&mut self, line_no: u32, line: ReportLine) -> Result<bool> {
        let index = Self::slot_index(line_no)?;
        if line.is_empty() {
            return Err(CovrepError::InvalidLineValue(
                "a line with no sessions and no content is equivalent to no line".to_string(),
            ));
        }
        if self.ignore.as_ref().is_some_and(|rules| rules.suppresses(line_no)) {
            return Ok(false);
        }
        if self.lines.len() <= index {
            self.lines.resize(index + 1, None);
        }
        self.lines[index] = Some(line);
        self.invalidate();
        Ok(true)
    }

    /// Like [`set`](Self::set), for initial population: an already-tracked
    /// line number is an error rather than an overwrite.
    pub fn append(&mut self, line_no: u32, line: ReportLine) -> Result<bool> {
        let _ = Self::slot_index(line_no)?;
        if self.slot(line_no).is_some() {
            return Err(CovrepError::DuplicateLine(line_no));
        }
        self.set(line_no, line)
    }

    /// Remove the line at `line_no`; an absent slot is a no-op.
    pub fn delete(&mut self, line_no: u32) -> Result<()> {
        let index = Self::slot_index(line_no)?;
        if let Some(slot) = self.lines.get_mut(index) {
            if slot.take().is_some() {
                self.invalidate();
            }
        }
        Ok(())
    }

    /// Visible totals, recomputed on demand and cached until a mutation.
    #[must_use]
    pub fn totals(&self) -> ReportTotals {
        self.totals.get_or_init(|| self.compute_totals()).clone()
    }

    /// Fold `other`'s lines into this file. Returns `true` when anything
    /// changed; merging an empty file is a no-op.
    pub fn merge(&mut self, other: &ReportFile) -> bool {
        let mut changed = false;
        for (line_no, theirs) in other.lines() {
            if self.ignore.as_ref().is_some_and(|rules| rules.suppresses(line_no)) {
                continue;
            }
            let index = (line_no - 1) as usize;
            let merged = match self.slot(line_no) {
                Some(ours) => merge_line(ours, theirs),
                None => theirs.clone(),
            };
            if self.slot(line_no) != Some(&merged) {
                if self.lines.len() <= index {
                    self.lines.resize(index + 1, None);
                }
                self.lines[index] = Some(merged);
                changed = true;
            }
        }
        if changed {
            self.invalidate();
        }
        changed
    }

    /// Whether applying `diff` would move or drop any tracked line: a
    /// removed line that is tracked here, or an added line that is tracked
    /// in the file as it exists after the change.
    #[must_use]
    pub fn does_diff_adjust_tracked_lines(
        &self,
        diff: &FileDiff,
        future_file: &ReportFile,
    ) -> bool {
        for segment in &diff.segments {
            let mut pos = segment.new_start.max(1);
            for raw in &segment.lines {
                match raw.as_bytes().first() {
                    Some(b'-') => {
                        if self.contains(pos) {
                            return true;
                        }
                    }
                    Some(b'+') => {
                        if future_file.contains(pos) {
                            return true;
                        }
                        pos += 1;
                    }
                    _ => pos += 1,
                }
            }
        }
        false
    }

    /// Remap line numbers to the new commit's numbering by replaying the
    /// diff: context lines carry their coverage across, removed lines drop
    /// it, added lines open an untracked gap. No coverage is fabricated for
    /// inserted lines.
    ///
    /// Segments must be sorted and non-overlapping in old-file coordinates;
    /// validation happens before any mutation.
    pub fn shift_lines_by_diff(&mut self, diff: &FileDiff) -> Result<()> {
        let mut previous_end: u32 = 0;
        for segment in &diff.segments {
            if segment.old_start < previous_end {
                return Err(CovrepError::OverlappingSegments(segment.old_start));
            }
            previous_end = segment.old_start + segment.old_len;
        }

        let before = self.lines.len();
        let mut source = std::mem::take(&mut self.lines).into_iter();
        let mut shifted: Vec<Option<ReportLine>> = Vec::new();
        for segment in &diff.segments {
            let seek = segment.new_start.saturating_sub(1) as usize;
            while shifted.len() < seek {
                shifted.push(source.next().flatten());
            }
            for raw in &segment.lines {
                match raw.as_bytes().first() {
                    Some(b'-') => {
                        source.next();
                    }
                    Some(b'+') => shifted.push(None),
                    _ => shifted.push(source.next().flatten()),
                }
            }
        }
        shifted.extend(source);
        log::debug!(
            "shifted {} by diff: {} slots -> {}",
            self.name,
            before,
            shifted.len()
        );
        self.lines = shifted;
        self.invalidate();
        Ok(())
    }

    /// Rewrite session ids through `map`; ids absent from the map are left
    /// alone. Used when a report is merged into another and its sessions
    /// are renumbered.
    pub(crate) fn remap_session_ids(&mut self, map: &BTreeMap<u32, u32>) {
        for line in self.lines.iter_mut().flatten() {
            for session in &mut line.sessions {
                if let Some(new_id) = map.get(&session.session_id) {
                    session.session_id = *new_id;
                }
            }
        }
        self.invalidate();
    }

    fn slot(&self, line_no: u32) -> Option<&ReportLine> {
        self.lines.get((line_no - 1) as usize).and_then(Option::as_ref)
    }

    fn slot_index(line_no: u32) -> Result<usize> {
        if line_no == 0 {
            return Err(CovrepError::InvalidLineNumber(line_no));
        }
        Ok((line_no - 1) as usize)
    }

    fn admits(&self, line: &ReportLine) -> bool {
        self.projection.as_ref().map_or(true, |p| p.admits(line))
    }

    fn invalidate(&mut self) {
        self.totals = OnceCell::new();
    }

    fn compute_totals(&self) -> ReportTotals {
        let mut totals = ReportTotals::default();
        for (_, line) in self.lines() {
            match line.coverage.kind() {
                CoverageKind::Hit => totals.hits += 1,
                CoverageKind::Miss => totals.misses += 1,
                CoverageKind::Partial => totals.partials += 1,
            }
            match line.line_type.as_deref() {
                Some("b") => totals.branches += 1,
                Some("m") => totals.methods += 1,
                _ => {}
            }
            totals.messages += line.messages.as_ref().map_or(0, |m| m.len() as u64);
            if let Some(complexity) = line.complexity {
                totals.complexity += complexity.covered;
                totals.complexity_total += complexity.total;
            }
        }
        totals.lines = totals.hits + totals.misses + totals.partials;
        totals.coverage = ratio(totals.hits, totals.lines);
        totals
    }
}
