use pretty_assertions::assert_eq;

use super::*;
use crate::Location;

#[test]
fn files_keep_first_seen_order() {
    let mut report = DiagnosticsReport::new();
    report.push("B.kt", DiagnosticEntry::error("b1"));
    report.push("A.kt", DiagnosticEntry::warning("a1"));
    report.push("B.kt", DiagnosticEntry::info("b2"));

    assert_eq!(report.files().collect::<Vec<_>>(), ["B.kt", "A.kt"]);
    let b: Vec<&str> = report.entries("B.kt").iter().map(|e| e.message.as_str()).collect();
    assert_eq!(b, ["b1", "b2"]);
}

#[test]
fn counts_by_severity() {
    let mut report = DiagnosticsReport::new();
    report.push("A.kt", DiagnosticEntry::error("e"));
    report.push("A.kt", DiagnosticEntry::warning("w1"));
    report.push(PROJECT_KEY, DiagnosticEntry::warning("w2"));

    assert!(report.has_errors());
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.warning_count(), 2);
}

#[test]
fn touched_files_are_present_but_empty() {
    let mut report = DiagnosticsReport::new();
    report.touch("Main.kt");

    assert!(report.is_empty());
    assert_eq!(report.files().collect::<Vec<_>>(), ["Main.kt"]);
    assert!(report.entries("Main.kt").is_empty());
    assert!(report.entries("Other.kt").is_empty());
}

#[test]
fn merge_appends_in_order() {
    let mut left = DiagnosticsReport::new();
    left.push("A.kt", DiagnosticEntry::error("1"));
    let mut right = DiagnosticsReport::new();
    right.push("B.kt", DiagnosticEntry::error("2"));
    right.push("A.kt", DiagnosticEntry::error("3"));

    left.merge(right);

    let all: Vec<(&str, &str)> = left.iter().map(|(f, e)| (f, e.message.as_str())).collect();
    assert_eq!(all, [("A.kt", "1"), ("A.kt", "3"), ("B.kt", "2")]);
}

#[test]
fn single_error_is_project_level() {
    let report = DiagnosticsReport::single_error("boom");
    assert_eq!(report.entries(PROJECT_KEY).len(), 1);
    assert!(report.entries(PROJECT_KEY)[0].location.is_none());
}

#[test]
fn serializes_as_ordered_object() {
    let mut report = DiagnosticsReport::new();
    report.push(
        "Main.kt",
        DiagnosticEntry::error("Unresolved reference: Bar").at(Location::new("Main.kt", 1, 12)),
    );
    report.touch("Util.kt");

    let json = serde_json::to_string(&report).unwrap();
    assert_eq!(
        json,
        r#"{"Main.kt":[{"severity":"ERROR","message":"Unresolved reference: Bar","location":{"file":"Main.kt","line":1,"column":12}}],"Util.kt":[]}"#
    );
}

#[test]
fn deserializes_in_document_order() {
    let json = r#"{"B.kt":[{"severity":"WARNING","message":"w"}],"A.kt":[],"":[{"severity":"ERROR","message":"e"}]}"#;
    let report: DiagnosticsReport = serde_json::from_str(json).unwrap();
    assert_eq!(report.files().collect::<Vec<_>>(), ["B.kt", "A.kt", PROJECT_KEY]);
    assert_eq!(report.warning_count(), 1);
    assert_eq!(report.error_count(), 1);
    assert_eq!(serde_json::to_string(&report).unwrap(), json);
}
