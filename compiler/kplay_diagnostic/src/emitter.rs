//! Human-readable rendering of a [`DiagnosticsReport`].
//!
//! JSON output for tooling goes through `serde` on the report itself; this
//! module only covers the terminal form used by the CLI.

use std::io::{self, Write};

use crate::{DiagnosticEntry, DiagnosticsReport, Severity};

mod colors {
    pub const ERROR: &str = "\x1b[1;31m";
    pub const WARNING: &str = "\x1b[1;33m";
    pub const INFO: &str = "\x1b[1;36m";
    pub const RESET: &str = "\x1b[0m";
}

#[inline]
fn plural_s(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Color output mode for the terminal emitter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// For `Auto`, `is_tty` decides.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Sink for normalized diagnostics.
pub trait DiagnosticEmitter {
    /// Emit one entry belonging to `file`.
    fn emit(&mut self, file: &str, entry: &DiagnosticEntry);

    /// Emit a whole report in order, followed by a summary line.
    fn emit_report(&mut self, report: &DiagnosticsReport) {
        for (file, entry) in report.iter() {
            self.emit(file, entry);
        }
        self.emit_summary(report.error_count(), report.warning_count());
        self.flush();
    }

    fn flush(&mut self);

    fn emit_summary(&mut self, error_count: usize, warning_count: usize);
}

/// `file:line:col: severity: message` lines with optional ANSI colors.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colors: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn with_color_mode(writer: W, mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter {
            writer,
            colors: mode.should_use_colors(is_tty),
        }
    }

    /// Consume the emitter, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.colors {
            return severity.to_string();
        }
        let color = match severity {
            Severity::Error => colors::ERROR,
            Severity::Warning => colors::WARNING,
            Severity::Info => colors::INFO,
        };
        format!("{color}{severity}{}", colors::RESET)
    }
}

impl TerminalEmitter<io::Stderr> {
    pub fn stderr(mode: ColorMode, is_tty: bool) -> Self {
        TerminalEmitter::with_color_mode(io::stderr(), mode, is_tty)
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, file: &str, entry: &DiagnosticEntry) {
        let label = self.severity_label(entry.severity);
        let _ = match &entry.location {
            Some(location) => writeln!(self.writer, "{location}: {label}: {}", entry.message),
            None if file.is_empty() => writeln!(self.writer, "{label}: {}", entry.message),
            None => writeln!(self.writer, "{file}: {label}: {}", entry.message),
        };
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }

    fn emit_summary(&mut self, error_count: usize, warning_count: usize) {
        if error_count == 0 && warning_count == 0 {
            return;
        }
        let _ = writeln!(
            self.writer,
            "{error_count} error{}, {warning_count} warning{}",
            plural_s(error_count),
            plural_s(warning_count)
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
