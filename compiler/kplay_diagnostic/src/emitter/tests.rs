use pretty_assertions::assert_eq;

use super::*;
use crate::{Location, PROJECT_KEY};

fn render(report: &DiagnosticsReport, colors: ColorMode) -> String {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), colors, false);
    emitter.emit_report(report);
    String::from_utf8(emitter.into_inner()).unwrap()
}

#[test]
fn plain_rendering() {
    let mut report = DiagnosticsReport::new();
    report.push(
        "Main.kt",
        DiagnosticEntry::error("Unresolved reference: Bar").at(Location::new("Main.kt", 1, 12)),
    );
    report.push("Main.kt", DiagnosticEntry::warning("file-level"));
    report.push(PROJECT_KEY, DiagnosticEntry::warning("Flag is not supported"));

    assert_eq!(
        render(&report, ColorMode::Never),
        "Main.kt:1:12: error: Unresolved reference: Bar\n\
         Main.kt: warning: file-level\n\
         warning: Flag is not supported\n\
         1 error, 2 warnings\n"
    );
}

#[test]
fn empty_report_prints_nothing() {
    assert_eq!(render(&DiagnosticsReport::new(), ColorMode::Never), "");
}

#[test]
fn colors_wrap_the_severity() {
    let mut report = DiagnosticsReport::new();
    report.push(PROJECT_KEY, DiagnosticEntry::error("x"));

    let out = render(&report, ColorMode::Always);
    assert!(out.starts_with("\x1b[1;31merror\x1b[0m: x"));
}

#[test]
fn auto_follows_tty() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
    assert!(!ColorMode::Never.should_use_colors(true));
}
