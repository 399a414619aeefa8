mod common;

use covrep::codec;
use covrep::error::CovrepError;
use covrep::line::CoverageValue;

use common::sample_report;

#[test]
fn round_trip_preserves_structure() {
    let report = sample_report();
    let encoded = codec::encode(&report).unwrap();
    let decoded = codec::decode(&encoded).unwrap();

    let paths: Vec<&str> = decoded.file_paths().collect();
    assert_eq!(paths, vec!["file_1.go", "file_2.py"]);
    assert_eq!(decoded.sessions(), report.sessions());
    assert_eq!(decoded.totals(), report.totals());

    for (original, restored) in report.files().zip(decoded.files()) {
        assert_eq!(original, restored);
    }
}

#[test]
fn encode_is_idempotent_after_round_trip() {
    let report = sample_report();
    let encoded = codec::encode(&report).unwrap();
    let re_encoded = codec::encode(&codec::decode(&encoded).unwrap()).unwrap();
    assert_eq!(re_encoded, encoded);
}

#[test]
fn archive_uses_fixed_wire_shapes() {
    let report = sample_report();
    let form = codec::to_persisted_form(&report);
    let value = serde_json::to_value(&form).unwrap();

    assert_eq!(value["version"], serde_json::json!(codec::FORMAT_VERSION));
    // (line_no, coverage, type, sessions, messages, complexity) tuples with
    // the historical coverage encodings
    assert_eq!(
        value["archive"]["file_1.go"][4],
        serde_json::json!([6, "1/2", null, [[0, "1/2", null, null, null], [1, 0, null, null, null]], null, null])
    );
    assert_eq!(
        value["archive"]["file_2.py"][1][2],
        serde_json::json!("b")
    );
    assert_eq!(value["files"]["file_1.go"]["index"], serde_json::json!(0));
    assert_eq!(value["files"]["file_2.py"]["index"], serde_json::json!(1));
    assert_eq!(
        value["files"]["file_1.go"]["totals"]["coverage"],
        serde_json::json!("60.00000")
    );
}

#[test]
fn file_order_survives_even_when_paths_sort_differently() {
    let mut report = covrep::report::Report::new();
    report.add_session(covrep::session::Session::new(["unit"]));
    for name in ["z.rs", "a.rs"] {
        let mut file = covrep::file::ReportFile::new(name);
        file.append(
            1,
            covrep::line::ReportLine::new(
                CoverageValue::Hit(1),
                vec![covrep::line::LineSession::new(0, CoverageValue::Hit(1))],
            ),
        )
        .unwrap();
        report.append(file).unwrap();
    }

    let decoded = codec::decode(&codec::encode(&report).unwrap()).unwrap();
    let paths: Vec<&str> = decoded.file_paths().collect();
    assert_eq!(paths, vec!["z.rs", "a.rs"]);
}

#[test]
fn decode_rejects_unknown_version() {
    let report = sample_report();
    let encoded = codec::encode(&report).unwrap();
    let bumped = encoded.replacen("{\"version\":1", "{\"version\":2", 1);
    let err = codec::decode(&bumped).unwrap_err();
    assert!(matches!(err, CovrepError::UnsupportedVersion(2)));
}

#[test]
fn decode_rejects_unknown_session_reference() {
    let raw = r#"{
        "version": 1,
        "totals": {"files":1,"lines":1,"hits":1,"misses":0,"partials":0,"coverage":"100","branches":0,"methods":0,"messages":0,"sessions":0,"complexity":0,"complexity_total":0,"diff":null},
        "files": {"a.rs": {"index": 0, "totals": {"files":0,"lines":1,"hits":1,"misses":0,"partials":0,"coverage":"100","branches":0,"methods":0,"messages":0,"sessions":0,"complexity":0,"complexity_total":0,"diff":null}}},
        "sessions": {},
        "archive": {"a.rs": [[1, 1, null, [[9, 1, null, null, null]], null, null]]}
    }"#;
    let err = codec::decode(raw).unwrap_err();
    assert!(matches!(err, CovrepError::UnknownSession(9)));
}

#[test]
fn persisted_form_survives_disk() {
    let report = sample_report();
    let encoded = codec::encode(&report).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(&path, &encoded).unwrap();
    let read_back = std::fs::read_to_string(&path).unwrap();

    let decoded = codec::decode(&read_back).unwrap();
    assert_eq!(decoded.totals(), report.totals());
}
