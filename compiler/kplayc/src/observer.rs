//! Post-execution observability hook.

use kplay_analysis::ProjectType;
use kplay_backend::{PipelineFamily, PipelineResult};
use kplay_diagnostic::DiagnosticsReport;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dispatch::Operation;

/// What an observer learns about one finished execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub operation: Operation,
    pub family: PipelineFamily,
    pub success: bool,
    pub errors: usize,
    pub warnings: usize,
    /// Failure reason; `None` on success.
    pub reason: Option<String>,
}

impl ExecutionSummary {
    pub fn of<A>(operation: Operation, family: PipelineFamily, result: &PipelineResult<A>) -> Self {
        let diagnostics = result.diagnostics();
        ExecutionSummary {
            operation,
            family,
            success: result.is_success(),
            errors: diagnostics.error_count(),
            warnings: diagnostics.warning_count(),
            reason: result.reason().map(str::to_string),
        }
    }
}

/// Called after every compiling operation with the same diagnostics the
/// response carries.
///
/// Implementations may fail or panic; the executor contains both and the
/// response is unaffected.
pub trait ExecutionObserver: Send + Sync {
    fn observe(
        &self,
        summary: &ExecutionSummary,
        diagnostics: &DiagnosticsReport,
        target: ProjectType,
        version: &str,
    );
}

/// Logs one `info` event per execution.
#[derive(Copy, Clone, Debug, Default)]
pub struct TracingObserver;

impl ExecutionObserver for TracingObserver {
    fn observe(
        &self,
        summary: &ExecutionSummary,
        diagnostics: &DiagnosticsReport,
        target: ProjectType,
        version: &str,
    ) {
        tracing::info!(
            operation = %summary.operation,
            family = %summary.family,
            %target,
            version,
            success = summary.success,
            errors = summary.errors,
            warnings = summary.warnings,
            reason = summary.reason.as_deref().unwrap_or(""),
            "execution finished"
        );
        for file in diagnostics.files() {
            for entry in diagnostics.entries(file) {
                tracing::debug!(
                    file,
                    severity = ?entry.severity,
                    message = %entry.message,
                    "diagnostic"
                );
            }
        }
    }
}

/// One call seen by a [`RecordingObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub summary: ExecutionSummary,
    pub diagnostics: DiagnosticsReport,
    pub target: ProjectType,
    pub version: String,
}

/// Keeps every observation in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<Observation>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot in call order.
    pub fn observations(&self) -> Vec<Observation> {
        self.seen.lock().clone()
    }
}

impl ExecutionObserver for RecordingObserver {
    fn observe(
        &self,
        summary: &ExecutionSummary,
        diagnostics: &DiagnosticsReport,
        target: ProjectType,
        version: &str,
    ) {
        self.seen.lock().push(Observation {
            summary: summary.clone(),
            diagnostics: diagnostics.clone(),
            target,
            version: version.to_string(),
        });
    }
}
