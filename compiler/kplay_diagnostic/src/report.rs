//! Per-file, order-preserving collection of normalized diagnostics.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, Serializer};

use crate::{DiagnosticEntry, Severity};

/// Key under which project-level (location-less) entries are stored.
pub const PROJECT_KEY: &str = "";

/// Diagnostics grouped by file name.
///
/// Files are kept in first-seen order; entries within a file keep insertion
/// order. Serializes as a JSON object `{ "<file>": [entries...] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsReport {
    files: Vec<(String, Vec<DiagnosticEntry>)>,
    index: FxHashMap<String, usize>,
}

impl DiagnosticsReport {
    /// An empty report (no files, no entries).
    pub fn new() -> Self {
        Self::default()
    }

    /// A report holding a single project-level error.
    pub fn single_error(message: impl Into<String>) -> Self {
        let mut report = Self::new();
        report.push(PROJECT_KEY, DiagnosticEntry::error(message));
        report
    }

    /// Append an entry to `file`, creating the group if needed.
    pub fn push(&mut self, file: &str, entry: DiagnosticEntry) {
        self.group_mut(file).push(entry);
    }

    /// Make sure `file` is present, even with no entries.
    ///
    /// Analysis-only callers use this so every source file shows up.
    pub fn touch(&mut self, file: &str) {
        let _ = self.group_mut(file);
    }

    fn group_mut(&mut self, file: &str) -> &mut Vec<DiagnosticEntry> {
        let idx = match self.index.get(file) {
            Some(&idx) => idx,
            None => {
                let idx = self.files.len();
                self.files.push((file.to_string(), Vec::new()));
                self.index.insert(file.to_string(), idx);
                idx
            }
        };
        &mut self.files[idx].1
    }

    /// Append every group of `other`, preserving its order.
    pub fn merge(&mut self, other: DiagnosticsReport) {
        for (file, entries) in other.files {
            let group = self.group_mut(&file);
            group.extend(entries);
        }
    }

    /// Entries recorded for `file` (empty slice if unknown).
    pub fn entries(&self, file: &str) -> &[DiagnosticEntry] {
        match self.index.get(file) {
            Some(&idx) => &self.files[idx].1,
            None => &[],
        }
    }

    /// File names in first-seen order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    /// All `(file, entry)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DiagnosticEntry)> {
        self.files
            .iter()
            .flat_map(|(name, entries)| entries.iter().map(move |e| (name.as_str(), e)))
    }

    /// True if no entries were recorded (touched files do not count).
    pub fn is_empty(&self) -> bool {
        self.files.iter().all(|(_, entries)| entries.is_empty())
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.iter().filter(|(_, e)| e.severity == severity).count()
    }
}

impl Serialize for DiagnosticsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.files.iter().map(|(name, entries)| (name, entries)))
    }
}

impl<'de> Deserialize<'de> for DiagnosticsReport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ReportVisitor;

        impl<'de> Visitor<'de> for ReportVisitor {
            type Value = DiagnosticsReport;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from file name to diagnostic entries")
            }

            // Map order is file order; duplicate keys append.
            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut report = DiagnosticsReport::new();
                while let Some((file, entries)) = map.next_entry::<String, Vec<DiagnosticEntry>>()? {
                    report.group_mut(&file).extend(entries);
                }
                Ok(report)
            }
        }

        deserializer.deserialize_map(ReportVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
