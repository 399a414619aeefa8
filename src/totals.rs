//! Aggregate statistics over a file or report.

use serde::{Deserialize, Serialize};

/// Snapshot aggregate over a `ReportFile` or `Report`.
///
/// Derived, never hand-edited: containers recompute these lazily and cache
/// the result until the next mutation. `coverage` is a fixed-precision
/// percentage string (see [`ratio`]). The field order is part of the
/// persisted schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub files: u64,
    pub lines: u64,
    pub hits: u64,
    pub misses: u64,
    pub partials: u64,
    pub coverage: String,
    pub branches: u64,
    pub methods: u64,
    pub messages: u64,
    pub sessions: u64,
    pub complexity: u64,
    pub complexity_total: u64,
    /// Sub-total restricted to the lines touched by a diff, when a
    /// comparison feature has computed one.
    pub diff: Option<Box<ReportTotals>>,
}

impl Default for ReportTotals {
    fn default() -> Self {
        ReportTotals {
            files: 0,
            lines: 0,
            hits: 0,
            misses: 0,
            partials: 0,
            coverage: "0".to_string(),
            branches: 0,
            methods: 0,
            messages: 0,
            sessions: 0,
            complexity: 0,
            complexity_total: 0,
            diff: None,
        }
    }
}

impl ReportTotals {
    /// Fold `other` into `self`: counters sum arithmetically and the
    /// coverage percentage is recomputed from the combined line counts.
    /// Diff sub-totals do not combine; they belong to a single comparison.
    pub fn add(&mut self, other: &ReportTotals) {
        self.files += other.files;
        self.lines += other.lines;
        self.hits += other.hits;
        self.misses += other.misses;
        self.partials += other.partials;
        self.branches += other.branches;
        self.methods += other.methods;
        self.messages += other.messages;
        self.sessions += other.sessions;
        self.complexity += other.complexity;
        self.complexity_total += other.complexity_total;
        self.coverage = ratio(self.hits, self.hits + self.misses + self.partials);
    }
}

/// Percentage of `part` over `total` formatted the way persisted totals
/// expect: the literal `"0"` when either side is zero, `"100"` when they
/// are equal, five decimal places otherwise.
#[must_use]
pub fn ratio(part: u64, total: u64) -> String {
    if part == 0 || total == 0 {
        "0".to_string()
    } else if part == total {
        "100".to_string()
    } else {
        format!("{:.5}", part as f64 / total as f64 * 100.0)
    }
}
