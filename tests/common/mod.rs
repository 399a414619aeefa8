// not every test binary uses every helper
#![allow(dead_code)]

use covrep::file::ReportFile;
use covrep::line::{CoverageValue, LineSession, ReportLine};
use covrep::report::Report;
use covrep::session::Session;

pub fn hit(n: u64) -> CoverageValue {
    CoverageValue::Hit(n)
}

pub fn line(coverage: CoverageValue, sessions: Vec<(u32, CoverageValue)>) -> ReportLine {
    ReportLine::new(
        coverage,
        sessions
            .into_iter()
            .map(|(id, cov)| LineSession::new(id, cov))
            .collect(),
    )
}

/// Two files and two flagged sessions: five lines
/// in `file_1.go` covered by sessions 0 (`simple`) and 1 (`complex`), two
/// lines in `file_2.py` covered by session 0 only.
pub fn sample_report() -> Report {
    let mut first_file = ReportFile::new("file_1.go");
    first_file
        .append(1, line(hit(1), vec![(0, hit(1)), (1, hit(1))]))
        .unwrap();
    first_file
        .append(2, line(hit(1), vec![(0, hit(0)), (1, hit(1))]))
        .unwrap();
    first_file
        .append(3, line(hit(1), vec![(0, hit(1)), (1, hit(0))]))
        .unwrap();
    first_file
        .append(5, line(hit(0), vec![(0, hit(0)), (1, hit(0))]))
        .unwrap();
    first_file
        .append(
            6,
            line(
                CoverageValue::Fraction(1, 2),
                vec![(0, CoverageValue::Fraction(1, 2)), (1, hit(0))],
            ),
        )
        .unwrap();

    let mut second_file = ReportFile::new("file_2.py");
    second_file.append(12, line(hit(1), vec![(0, hit(1))])).unwrap();
    let mut branch_line = line(CoverageValue::Fraction(1, 2), vec![(0, hit(1))]);
    branch_line.line_type = Some("b".to_string());
    second_file.append(51, branch_line).unwrap();

    let mut report = Report::new();
    report.append(first_file).unwrap();
    report.append(second_file).unwrap();
    report.add_session(Session::new(["simple"]));
    report.add_session(Session::new(["complex"]));
    report
}
