//! Parse unified diff text into per-file segment structures.
//!
//! The raw text is supplied by the git-provider-adapter layer; nothing is
//! fetched from here. A section that fails to parse is a local failure:
//! it is reported per path and every other section still parses.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CovrepError;

/// How a file changed between the two commits of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    New,
    Modified,
    Deleted,
    Binary,
    Renamed,
}

impl DiffType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffType::New => "new",
            DiffType::Modified => "modified",
            DiffType::Deleted => "deleted",
            DiffType::Binary => "binary",
            DiffType::Renamed => "renamed",
        }
    }
}

/// One `@@` hunk: the parsed header plus its verbatim prefixed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    /// Content lines, keeping the leading `-`/`+`/context prefix.
    pub lines: Vec<String>,
}

/// Added/removed line counts for one file section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffLineCounts {
    pub added: u32,
    pub removed: u32,
}

/// Parsed diff for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub diff_type: DiffType,
    /// Previous path, when it differs from the current one.
    pub before: Option<String>,
    pub segments: Vec<DiffSegment>,
    pub totals: DiffLineCounts,
}

/// Result of parsing a multi-file diff.
#[derive(Debug, Default)]
pub struct ParsedDiff {
    pub files: HashMap<String, FileDiff>,
    /// Sections that could not be parsed, by path.
    pub failures: Vec<(String, CovrepError)>,
}

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

/// Split raw diff text on `diff --git` boundaries and parse each section.
#[must_use]
pub fn parse(raw: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let text = format!("\n{raw}");
    for section in text.split("\ndiff --git a/").skip(1) {
        match parse_section(section) {
            Ok((path, file_diff)) => {
                parsed.files.insert(path, file_diff);
            }
            Err((path, err)) => {
                log::warn!("skipping unparseable diff section for {path}: {err}");
                parsed.failures.push((path, err));
            }
        }
    }
    parsed
}

/// Parse one `diff --git a/...` section (with the marker already stripped,
/// so the first line reads `<before> b/<after>`).
fn parse_section(section: &str) -> Result<(String, FileDiff), (String, CovrepError)> {
    let header = section.lines().next().unwrap_or("");
    let Some((before, after)) = header.split_once(" b/") else {
        return Err((
            header.to_string(),
            CovrepError::MalformedDiff("section header lacks ` b/` separator".to_string()),
        ));
    };
    let path = after.trim_end().to_string();
    match parse_section_body(before, &path, section) {
        Ok(file_diff) => Ok((path, file_diff)),
        Err(err) => Err((path, err)),
    }
}

fn parse_section_body(before: &str, path: &str, section: &str) -> Result<FileDiff, CovrepError> {
    let mut file = FileDiff {
        diff_type: if before == "/dev/null" {
            DiffType::New
        } else {
            DiffType::Modified
        },
        before: if before == path || before == "/dev/null" {
            None
        } else {
            Some(before.to_string())
        },
        segments: Vec::new(),
        totals: DiffLineCounts::default(),
    };

    for source in section.lines().skip(1) {
        if source == r"\ No newline at end of file" {
            // diff metadata, not a content line
            continue;
        }
        // first four bytes classify the line; shorter (or non-ASCII-prefixed)
        // lines can only be content
        match source.get(..4).unwrap_or(source) {
            "dele" => {
                // deleted file mode 100644
                file.diff_type = DiffType::Deleted;
                file.before = Some(path.to_string());
                file.segments.clear();
                break;
            }
            "new " => file.diff_type = DiffType::New,
            "Bina" => {
                file.diff_type = DiffType::Binary;
                file.before = None;
                file.segments.clear();
                break;
            }
            "rena" | "simi" => file.diff_type = DiffType::Renamed,
            "--- " | "+++ " | "inde" | "diff" => {}
            "" => {}
            _ if source.starts_with("@@ -") => {
                let caps = HUNK_HEADER.captures(source).ok_or_else(|| {
                    CovrepError::MalformedDiff(format!("bad hunk header: {source}"))
                })?;
                file.segments.push(DiffSegment {
                    old_start: hunk_value(caps.get(1), 0)?,
                    old_len: hunk_value(caps.get(2), 1)?,
                    new_start: hunk_value(caps.get(3), 0)?,
                    new_len: hunk_value(caps.get(4), 1)?,
                    lines: Vec::new(),
                });
            }
            _ => match file.segments.last_mut() {
                Some(segment) => segment.lines.push(source.to_string()),
                None => {
                    return Err(CovrepError::MalformedDiff(format!(
                        "content before first hunk header: {source}"
                    )))
                }
            },
        }
    }

    for segment in &file.segments {
        for line in &segment.lines {
            match line.as_bytes().first() {
                Some(b'-') => file.totals.removed += 1,
                Some(b'+') => file.totals.added += 1,
                _ => {}
            }
        }
    }

    Ok(file)
}

fn hunk_value(capture: Option<regex::Match<'_>>, default: u32) -> Result<u32, CovrepError> {
    match capture {
        None => Ok(default),
        Some(m) => m.as_str().parse().map_err(|_| {
            CovrepError::MalformedDiff(format!("hunk bound out of range: {}", m.as_str()))
        }),
    }
}
