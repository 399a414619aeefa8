//! Combination algebra used when two uploads contribute to the same line.
//!
//! Merging is associative and commutative at the coverage-value level (the
//! maximum under miss < partial < hit wins) but ordered at the session
//! level: a later contribution for the same session id replaces the earlier
//! one, which is how a re-upload overrides stale data.

use crate::line::{Complexity, CoverageValue, LineSession, ReportLine};

/// Combine two coverage values, keeping the better one.
#[must_use]
pub fn merge_coverage(a: &CoverageValue, b: &CoverageValue) -> CoverageValue {
    if a >= b {
        a.clone()
    } else {
        b.clone()
    }
}

/// Combine complexity pairs component-wise by maximum.
#[must_use]
pub fn merge_complexity(a: Option<Complexity>, b: Option<Complexity>) -> Option<Complexity> {
    match (a, b) {
        (Some(a), Some(b)) => Some(Complexity {
            covered: a.covered.max(b.covered),
            total: a.total.max(b.total),
        }),
        (a, b) => a.or(b),
    }
}

/// Concatenate session contributions, de-duplicating by session id. A later
/// occurrence replaces the earlier one in place.
#[must_use]
pub fn merge_sessions(first: &[LineSession], second: &[LineSession]) -> Vec<LineSession> {
    let mut merged: Vec<LineSession> = Vec::with_capacity(first.len() + second.len());
    for session in first.iter().chain(second) {
        match merged.iter_mut().find(|s| s.session_id == session.session_id) {
            Some(slot) => *slot = session.clone(),
            None => merged.push(session.clone()),
        }
    }
    merged
}

/// The line coverage implied by a set of contributions: the best among them.
#[must_use]
pub fn coverage_from_sessions(sessions: &[LineSession]) -> Option<CoverageValue> {
    sessions.iter().map(|s| &s.coverage).max().cloned()
}

/// Combine two tracked lines for the same line number.
#[must_use]
pub fn merge_line(ours: &ReportLine, theirs: &ReportLine) -> ReportLine {
    let sessions = merge_sessions(&ours.sessions, &theirs.sessions);
    let coverage = coverage_from_sessions(&sessions)
        .unwrap_or_else(|| merge_coverage(&ours.coverage, &theirs.coverage));
    ReportLine {
        coverage,
        line_type: ours.line_type.clone().or_else(|| theirs.line_type.clone()),
        sessions,
        messages: merge_messages(&ours.messages, &theirs.messages),
        complexity: merge_complexity(ours.complexity, theirs.complexity),
    }
}

fn merge_messages(a: &Option<Vec<String>>, b: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.iter().chain(b).cloned().collect()),
        (a, b) => a.clone().or_else(|| b.clone()),
    }
}
