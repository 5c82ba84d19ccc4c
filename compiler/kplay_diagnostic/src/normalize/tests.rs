use pretty_assertions::assert_eq;

use super::*;

fn at(path: &str, line: u32, severity: CompilerMessageSeverity, text: &str) -> RawMessage {
    RawMessage::new(severity, text, Some(RawLocation::new(path, line, 1)))
}

#[test]
fn interleaved_files_are_grouped_in_order() {
    use CompilerMessageSeverity::{Error, Warning};
    let raw = vec![
        at("A.kt", 1, Error, "a1"),
        at("B.kt", 1, Warning, "b1"),
        at("A.kt", 2, Warning, "a2"),
        at("B.kt", 3, Error, "b2"),
        at("A.kt", 5, Error, "a3"),
    ];

    let report = normalize(&raw);

    assert_eq!(report.files().collect::<Vec<_>>(), ["A.kt", "B.kt"]);
    let a: Vec<&str> = report.entries("A.kt").iter().map(|e| e.message.as_str()).collect();
    let b: Vec<&str> = report.entries("B.kt").iter().map(|e| e.message.as_str()).collect();
    assert_eq!(a, ["a1", "a2", "a3"]);
    assert_eq!(b, ["b1", "b2"]);
}

#[test]
fn ignored_severities_are_dropped() {
    let raw = vec![
        at("A.kt", 1, CompilerMessageSeverity::Logging, "chatter"),
        at("A.kt", 1, CompilerMessageSeverity::Output, "out"),
        at("A.kt", 1, CompilerMessageSeverity::Info, "kept"),
    ];

    let report = normalize(&raw);

    assert_eq!(report.entries("A.kt").len(), 1);
    assert_eq!(report.entries("A.kt")[0].severity, Severity::Info);
}

#[test]
fn severity_mapping_is_total() {
    use CompilerMessageSeverity::*;
    assert_eq!(normalize_severity(Exception), Some(Severity::Error));
    assert_eq!(normalize_severity(Error), Some(Severity::Error));
    assert_eq!(normalize_severity(StrongWarning), Some(Severity::Warning));
    assert_eq!(normalize_severity(Warning), Some(Severity::Warning));
    assert_eq!(normalize_severity(Info), Some(Severity::Info));
    assert_eq!(normalize_severity(Logging), None);
    assert_eq!(normalize_severity(Output), None);
}

#[test]
fn project_level_messages_have_no_location() {
    let raw = vec![
        RawMessage::new(CompilerMessageSeverity::Error, "no location", None),
        RawMessage::new(
            CompilerMessageSeverity::Warning,
            "empty path",
            Some(RawLocation::default()),
        ),
    ];

    let report = normalize(&raw);

    assert_eq!(report.files().collect::<Vec<_>>(), [PROJECT_KEY]);
    assert!(report.entries(PROJECT_KEY).iter().all(|e| e.location.is_none()));
}

#[test]
fn unknown_line_keeps_file_but_drops_location() {
    let raw = vec![RawMessage::new(
        CompilerMessageSeverity::Error,
        "somewhere in the file",
        Some(RawLocation::new("Main.kt", 0, 0)),
    )];

    let report = normalize(&raw);

    assert_eq!(report.entries("Main.kt").len(), 1);
    assert!(report.entries("Main.kt")[0].location.is_none());
}

#[test]
fn end_positions_are_carried() {
    let raw = vec![RawMessage::new(
        CompilerMessageSeverity::Error,
        "range",
        Some(RawLocation::new("Main.kt", 2, 5).with_end(2, 9)),
    )];

    let report = normalize(&raw);
    let location = report.entries("Main.kt")[0].location.clone();

    assert_eq!(location, Some(Location::new("Main.kt", 2, 5).with_end(2, 9)));
}

#[test]
fn empty_input_gives_empty_report() {
    let report = normalize(&Vec::<RawMessage>::new());
    assert!(report.is_empty());
    assert_eq!(report.files().count(), 0);
}
