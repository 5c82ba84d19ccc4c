//! Normalized diagnostics for every compilation pipeline.
//!
//! Backends speak their own dialect of compiler messages (the
//! [`CompilerMessageSeverity`] scale, optional locations, project-level
//! messages). Callers only ever see a [`DiagnosticsReport`]: entries grouped
//! by file name, emission order preserved per file, severities folded onto
//! error / warning / info.
//!
//! ```text
//! MessageCollector ──► Vec<RawMessage> ──► normalize() ──► DiagnosticsReport
//! ```

mod diagnostic;
pub mod emitter;
mod normalize;
pub mod raw;
mod report;

pub use diagnostic::{DiagnosticEntry, Location, Severity};
pub use normalize::{normalize, normalize_severity};
pub use raw::{CompilerMessageSeverity, MessageCollector, RawLocation, RawMessage};
pub use report::{DiagnosticsReport, PROJECT_KEY};
