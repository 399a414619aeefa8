mod common;

use covrep::carryforward::generate_carryforward_report;
use covrep::line::CoverageValue;
use covrep::session::{SessionExtras, SessionState};

use common::{hit, sample_report};

fn flags(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn carryforward_keeps_only_flagged_contributions() {
    let report = sample_report();
    let carried =
        generate_carryforward_report(&report, &flags(&["simple"]), None, SessionExtras::new())
            .unwrap();

    let paths: Vec<&str> = carried.file_paths().collect();
    assert_eq!(paths, vec!["file_1.go", "file_2.py"]);

    // session 0's contributions survive, rewritten to the synthesized id
    let first = carried.get("file_1.go").unwrap();
    let expected = [
        (1, hit(1)),
        (2, hit(0)),
        (3, hit(1)),
        (5, hit(0)),
        (6, CoverageValue::Fraction(1, 2)),
    ];
    let lines: Vec<(u32, CoverageValue)> = first
        .lines()
        .map(|(no, line)| (no, line.coverage.clone()))
        .collect();
    assert_eq!(lines.as_slice(), expected.as_slice());
    for (_, line) in first.lines() {
        assert_eq!(line.sessions.len(), 1);
        assert_eq!(line.sessions[0].session_id, 0);
    }

    let first_totals = first.totals();
    assert_eq!(first_totals.lines, 5);
    assert_eq!(first_totals.hits, 2);
    assert_eq!(first_totals.misses, 2);
    assert_eq!(first_totals.partials, 1);
    assert_eq!(first_totals.coverage, "40.00000");

    // file_2's line 51 was "1/2" at the line level but session 0 reported a
    // plain hit, so the recomputed coverage becomes 1
    let second = carried.get("file_2.py").unwrap();
    let line_51 = second.get(51).unwrap().unwrap();
    assert_eq!(line_51.coverage, hit(1));
    assert_eq!(line_51.line_type.as_deref(), Some("b"));
    let second_totals = second.totals();
    assert_eq!(second_totals.hits, 2);
    assert_eq!(second_totals.branches, 1);
    assert_eq!(second_totals.coverage, "100");

    let totals = carried.totals();
    assert_eq!(totals.files, 2);
    assert_eq!(totals.lines, 7);
    assert_eq!(totals.hits, 4);
    assert_eq!(totals.misses, 2);
    assert_eq!(totals.partials, 1);
    assert_eq!(totals.branches, 1);
    assert_eq!(totals.sessions, 1);
    assert_eq!(totals.coverage, "57.14286");

    assert_eq!(carried.sessions().len(), 1);
    let session = carried.get_session(0).unwrap();
    assert_eq!(session.name.as_deref(), Some("Carriedforward"));
    assert_eq!(session.state, SessionState::Carriedforward);
    assert!(session.flags.contains("simple"));
    assert!(session.extras.is_empty());
}

#[test]
fn carryforward_with_path_pattern() {
    let report = sample_report();
    let carried = generate_carryforward_report(
        &report,
        &flags(&["simple"]),
        Some(&patterns(&["file_1.*"])),
        SessionExtras::new(),
    )
    .unwrap();

    let paths: Vec<&str> = carried.file_paths().collect();
    assert_eq!(paths, vec!["file_1.go"]);
    let totals = carried.totals();
    assert_eq!(totals.files, 1);
    assert_eq!(totals.lines, 5);
    assert_eq!(totals.coverage, "40.00000");
    assert_eq!(totals.sessions, 1);
}

#[test]
fn carryforward_with_no_matching_path() {
    let report = sample_report();
    let carried = generate_carryforward_report(
        &report,
        &flags(&["simple"]),
        Some(&patterns(&[r"file_\W.*"])),
        SessionExtras::new(),
    )
    .unwrap();

    assert_eq!(carried.file_count(), 0);
    let totals = carried.totals();
    assert_eq!(totals.files, 0);
    assert_eq!(totals.lines, 0);
    assert_eq!(totals.hits, 0);
    assert_eq!(totals.coverage, "0");
    assert_eq!(totals.sessions, 1);
    assert_eq!(carried.sessions().len(), 1);
}

#[test]
fn carryforward_with_multiple_patterns() {
    let report = sample_report();
    let carried = generate_carryforward_report(
        &report,
        &flags(&["simple"]),
        Some(&patterns(&[r".*\.cpp", r".*_2\..*"])),
        SessionExtras::new(),
    )
    .unwrap();

    let paths: Vec<&str> = carried.file_paths().collect();
    assert_eq!(paths, vec!["file_2.py"]);
    let totals = carried.totals();
    assert_eq!(totals.lines, 2);
    assert_eq!(totals.hits, 2);
    assert_eq!(totals.branches, 1);
    assert_eq!(totals.coverage, "100");
}

#[test]
fn carryforward_drops_files_with_no_surviving_lines() {
    let report = sample_report();
    let carried =
        generate_carryforward_report(&report, &flags(&["complex"]), None, SessionExtras::new())
            .unwrap();

    // file_2 only has session 0 (simple) contributions
    let paths: Vec<&str> = carried.file_paths().collect();
    assert_eq!(paths, vec!["file_1.go"]);

    let first = carried.get("file_1.go").unwrap();
    let lines: Vec<(u32, CoverageValue)> = first
        .lines()
        .map(|(no, line)| (no, line.coverage.clone()))
        .collect();
    // line coverage now reflects only session 1's contributions
    let expected = [
        (1, hit(1)),
        (2, hit(1)),
        (3, hit(0)),
        (5, hit(0)),
        (6, hit(0)),
    ];
    assert_eq!(lines.as_slice(), expected.as_slice());

    let totals = carried.totals();
    assert_eq!(totals.hits, 2);
    assert_eq!(totals.misses, 3);
    assert_eq!(totals.partials, 0);
    assert_eq!(totals.coverage, "40.00000");
}

#[test]
fn carryforward_carries_session_extras() {
    let report = sample_report();
    let mut extras = SessionExtras::new();
    extras.insert(
        "cfed_parent".to_string(),
        serde_json::json!("0f9ab1fe6c879bc49a9e559b23f49fd033daadb0"),
    );
    let carried =
        generate_carryforward_report(&report, &flags(&["complex"]), None, extras.clone()).unwrap();
    assert_eq!(carried.get_session(0).unwrap().extras, extras);
}

#[test]
fn carryforward_name_counter_increments() {
    let report = sample_report();
    assert!(report.get_session(0).unwrap().name.is_none());
    // name the simple session and carry forward twice
    let mut named = covrep::session::Session::new(["simple"]);
    named.name = Some("Dude".to_string());
    let mut renamed = covrep::report::Report::new();
    for file in report.files() {
        renamed.append(file.clone()).unwrap();
    }
    renamed.add_session(named);

    let once =
        generate_carryforward_report(&renamed, &flags(&["simple"]), None, SessionExtras::new())
            .unwrap();
    assert_eq!(
        once.get_session(0).unwrap().name.as_deref(),
        Some("CF[1] - Dude")
    );

    let twice =
        generate_carryforward_report(&once, &flags(&["simple"]), None, SessionExtras::new())
            .unwrap();
    assert_eq!(
        twice.get_session(0).unwrap().name.as_deref(),
        Some("CF[2] - Dude")
    );
}
