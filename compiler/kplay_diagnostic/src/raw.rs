//! Backend-native message records.
//!
//! Pipelines report through a [`MessageCollector`] using the wide
//! [`CompilerMessageSeverity`] scale. Nothing here is shown to callers
//! directly; [`crate::normalize`] folds it into a report.

use std::fmt;

/// Severity scale used inside the pipelines.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompilerMessageSeverity {
    /// An internal fault surfaced as a message.
    Exception,
    Error,
    /// A warning that survives `-nowarn`.
    StrongWarning,
    Warning,
    Info,
    /// Compiler chatter, never user-facing.
    Logging,
    /// Output produced by the compiler itself (file lists etc.).
    Output,
}

impl CompilerMessageSeverity {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            CompilerMessageSeverity::Exception | CompilerMessageSeverity::Error
        )
    }

    pub fn is_warning(self) -> bool {
        matches!(
            self,
            CompilerMessageSeverity::StrongWarning | CompilerMessageSeverity::Warning
        )
    }
}

impl fmt::Display for CompilerMessageSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompilerMessageSeverity::Exception => "exception",
            CompilerMessageSeverity::Error => "error",
            CompilerMessageSeverity::StrongWarning => "strong warning",
            CompilerMessageSeverity::Warning => "warning",
            CompilerMessageSeverity::Info => "info",
            CompilerMessageSeverity::Logging => "logging",
            CompilerMessageSeverity::Output => "output",
        };
        f.write_str(s)
    }
}

/// Location as a backend reports it.
///
/// An empty `path` means the message is not tied to a file. A `line` of 0
/// means the file is known but the position is not.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct RawLocation {
    pub path: String,
    pub line: u32,
    pub column: u32,
    pub line_end: u32,
    pub column_end: u32,
}

impl RawLocation {
    pub fn new(path: impl Into<String>, line: u32, column: u32) -> Self {
        RawLocation {
            path: path.into(),
            line,
            column,
            line_end: 0,
            column_end: 0,
        }
    }

    #[must_use]
    pub fn with_end(mut self, line_end: u32, column_end: u32) -> Self {
        self.line_end = line_end;
        self.column_end = column_end;
        self
    }
}

/// A message as emitted by a pipeline.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RawMessage {
    pub severity: CompilerMessageSeverity,
    pub message: String,
    pub location: Option<RawLocation>,
}

impl RawMessage {
    pub fn new(
        severity: CompilerMessageSeverity,
        message: impl Into<String>,
        location: Option<RawLocation>,
    ) -> Self {
        RawMessage {
            severity,
            message: message.into(),
            location,
        }
    }
}

/// Append-only sink for raw messages.
///
/// Severity rewriting (`-Werror`, `-nowarn`) happens here so the normalizer
/// stays a pure function of its input.
#[derive(Clone, Debug, Default)]
pub struct MessageCollector {
    messages: Vec<RawMessage>,
    warnings_as_errors: bool,
    suppress_warnings: bool,
}

impl MessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the warning policy. `suppress` wins over `as_errors`.
    #[must_use]
    pub fn with_warning_policy(mut self, as_errors: bool, suppress: bool) -> Self {
        self.warnings_as_errors = as_errors;
        self.suppress_warnings = suppress;
        self
    }

    pub fn report(
        &mut self,
        severity: CompilerMessageSeverity,
        message: impl Into<String>,
        location: Option<RawLocation>,
    ) {
        let severity = match severity {
            CompilerMessageSeverity::Warning if self.suppress_warnings => {
                CompilerMessageSeverity::Logging
            }
            CompilerMessageSeverity::Warning | CompilerMessageSeverity::StrongWarning
                if self.warnings_as_errors =>
            {
                CompilerMessageSeverity::Error
            }
            other => other,
        };
        self.messages.push(RawMessage::new(severity, message, location));
    }

    pub fn error(&mut self, message: impl Into<String>, location: Option<RawLocation>) {
        self.report(CompilerMessageSeverity::Error, message, location);
    }

    pub fn warning(&mut self, message: impl Into<String>, location: Option<RawLocation>) {
        self.report(CompilerMessageSeverity::Warning, message, location);
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity.is_error())
    }

    pub fn messages(&self) -> &[RawMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<RawMessage> {
        self.messages
    }
}
