//! Folding backend messages into a [`DiagnosticsReport`].

use crate::{
    CompilerMessageSeverity, DiagnosticEntry, DiagnosticsReport, Location, RawLocation,
    RawMessage, Severity, PROJECT_KEY,
};

/// Map a backend severity onto the report scale.
///
/// `None` means the message is ignored and never reaches callers.
pub fn normalize_severity(severity: CompilerMessageSeverity) -> Option<Severity> {
    match severity {
        CompilerMessageSeverity::Exception | CompilerMessageSeverity::Error => {
            Some(Severity::Error)
        }
        CompilerMessageSeverity::StrongWarning | CompilerMessageSeverity::Warning => {
            Some(Severity::Warning)
        }
        CompilerMessageSeverity::Info => Some(Severity::Info),
        CompilerMessageSeverity::Logging | CompilerMessageSeverity::Output => None,
    }
}

/// Group raw messages by file, preserving emission order. Never fails.
pub fn normalize<'a, I>(messages: I) -> DiagnosticsReport
where
    I: IntoIterator<Item = &'a RawMessage>,
{
    let mut report = DiagnosticsReport::new();
    for message in messages {
        let Some(severity) = normalize_severity(message.severity) else {
            continue;
        };
        let (file, location) = resolve(message.location.as_ref());
        let entry = DiagnosticEntry {
            severity,
            message: message.message.clone(),
            location,
        };
        report.push(file, entry);
    }
    report
}

fn resolve(raw: Option<&RawLocation>) -> (&str, Option<Location>) {
    let Some(raw) = raw else {
        return (PROJECT_KEY, None);
    };
    if raw.path.is_empty() {
        return (PROJECT_KEY, None);
    }
    if raw.line == 0 {
        return (raw.path.as_str(), None);
    }
    let mut location = Location::new(raw.path.clone(), raw.line, raw.column.max(1));
    if raw.line_end != 0 {
        location = location.with_end(raw.line_end, raw.column_end.max(1));
    }
    (raw.path.as_str(), Some(location))
}

#[cfg(test)]
mod tests;
