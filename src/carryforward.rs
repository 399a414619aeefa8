//! Derive a filtered report when some sessions were not re-uploaded on a
//! new commit: keep only the files and line contributions belonging to the
//! requested flags, and attach a single synthesized session recording the
//! carryforward.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CovrepError, Result};
use crate::file::ReportFile;
use crate::line::{LineSession, ReportLine};
use crate::merge::{merge_complexity, merge_coverage};
use crate::report::Report;
use crate::session::{Session, SessionExtras, SessionState};

static CF_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^CF\[(\d+)\] - ").unwrap());

/// Display name for a session carried forward from `original`.
///
/// `None` or an empty name yields `"Carriedforward"`. An existing
/// `CF[k] - ` prefix is bumped to `CF[k+1] - `; a run of bare `CF ` tokens
/// is collapsed into a counted prefix.
#[must_use]
pub fn carriedforward_session_name(original: Option<&str>) -> String {
    let name = match original {
        None | Some("") => return "Carriedforward".to_string(),
        Some(name) => name,
    };
    if let Some(caps) = CF_PREFIX.captures(name) {
        let prefix_end = caps.get(0).map_or(0, |m| m.end());
        if let Ok(count) = caps[1].parse::<u64>() {
            return format!("CF[{}] - {}", count + 1, &name[prefix_end..]);
        }
    }
    if name.starts_with("CF ") {
        let count = name.matches("CF ").count();
        let mut base = name;
        while let Some(rest) = base.strip_prefix("CF ") {
            base = rest;
        }
        return format!("CF[{}] - {}", count + 1, base);
    }
    format!("CF[1] - {}", name)
}

/// Build a new report restricted to `flags` and (optionally) to paths
/// matching one of `paths`.
///
/// Patterns are regular expressions matched from the start of the full
/// file path. Lines keep only the contributions of flag-matching sessions,
/// rewritten to the synthesized session's id, and their coverage is
/// recomputed from what remains; lines (and then files) left with nothing
/// are dropped. A pattern list matching no file still yields the
/// synthesized session and zero totals; nothing to carry forward is a
/// normal outcome, not an error.
pub fn generate_carryforward_report(
    report: &Report,
    flags: &[String],
    paths: Option<&[String]>,
    session_extras: SessionExtras,
) -> Result<Report> {
    let matchers = compile_patterns(paths)?;
    let wanted: BTreeSet<&str> = flags.iter().map(String::as_str).collect();

    let retained: BTreeSet<u32> = report
        .sessions()
        .iter()
        .filter(|(_, session)| session.flags.iter().any(|flag| wanted.contains(flag.as_str())))
        .map(|(id, _)| *id)
        .collect();

    let base_name = retained
        .iter()
        .next()
        .and_then(|id| report.get_session(*id))
        .and_then(|session| session.name.as_deref());

    let mut carried = Report::new();
    let mut session = Session::new(flags.iter().cloned());
    session.name = Some(carriedforward_session_name(base_name));
    session.state = SessionState::Carriedforward;
    session.extras = session_extras;
    let new_id = carried.add_session(session);

    for file in report.files() {
        if !matches_any(&matchers, file.name()) {
            continue;
        }
        let mut carried_file = ReportFile::new(file.name());
        for (line_no, line) in file.lines() {
            if let Some(carried_line) = carry_line(line, &retained, new_id) {
                carried_file.set(line_no, carried_line)?;
            }
        }
        if carried_file.is_empty() {
            continue;
        }
        carried.append(carried_file)?;
    }
    Ok(carried)
}

fn compile_patterns(paths: Option<&[String]>) -> Result<Option<Vec<Regex>>> {
    let Some(paths) = paths else {
        return Ok(None);
    };
    paths
        .iter()
        .map(|pattern| {
            Regex::new(&format!(r"\A(?:{pattern})")).map_err(|source| {
                CovrepError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn matches_any(matchers: &Option<Vec<Regex>>, path: &str) -> bool {
    match matchers {
        None => true,
        Some(list) => list.iter().any(|re| re.is_match(path)),
    }
}

/// One line's carried-forward form: the retained contributions folded into
/// the synthesized session, or `None` when nothing survives the filter.
fn carry_line(line: &ReportLine, retained: &BTreeSet<u32>, new_id: u32) -> Option<ReportLine> {
    let mut survivors = line
        .sessions
        .iter()
        .filter(|s| retained.contains(&s.session_id));
    let first = survivors.next()?;
    let mut folded = LineSession {
        session_id: new_id,
        ..first.clone()
    };
    for extra in survivors {
        folded.coverage = merge_coverage(&folded.coverage, &extra.coverage);
        folded.complexity = merge_complexity(folded.complexity, extra.complexity);
        // branch and column detail is only meaningful for a single upload
        folded.branches = None;
        folded.partials = None;
    }
    Some(ReportLine {
        coverage: folded.coverage.clone(),
        line_type: line.line_type.clone(),
        sessions: vec![folded],
        messages: None,
        complexity: line.complexity,
    })
}
