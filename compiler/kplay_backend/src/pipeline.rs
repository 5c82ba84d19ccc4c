//! The pipeline seam and its failure-containment boundary.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use kplay_analysis::{check_typed, AnalysisContext, InferredTypes};
use kplay_diagnostic::{normalize, DiagnosticsReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How browser script is produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JsStrategy {
    /// Print straight from the syntax tree.
    Direct,
    /// Lower first, then print the lowered module.
    Ir,
}

/// Closed set of backend pipelines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineFamily {
    Jvm,
    Js { strategy: JsStrategy },
    Wasm,
    ComposeWasm,
    ComposeIr,
    SwiftExport,
}

impl fmt::Display for PipelineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineFamily::Jvm => "jvm",
            PipelineFamily::Js {
                strategy: JsStrategy::Direct,
            } => "js",
            PipelineFamily::Js {
                strategy: JsStrategy::Ir,
            } => "js-ir",
            PipelineFamily::Wasm => "wasm",
            PipelineFamily::ComposeWasm => "compose-wasm",
            PipelineFamily::ComposeIr => "compose-ir",
            PipelineFamily::SwiftExport => "swift-export",
        };
        f.write_str(name)
    }
}

/// Reason carried by failures caused by analysis errors.
pub const COMPILATION_FAILED: &str = "compilation failed";

/// Outcome of one pipeline invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PipelineResult<A> {
    /// May still carry warnings (and errors, for the Swift export).
    Success {
        artifacts: A,
        diagnostics: DiagnosticsReport,
    },
    Failure {
        diagnostics: DiagnosticsReport,
        reason: String,
    },
}

impl<A> PipelineResult<A> {
    pub fn success(artifacts: A, diagnostics: DiagnosticsReport) -> Self {
        PipelineResult::Success {
            artifacts,
            diagnostics,
        }
    }

    pub fn failure(diagnostics: DiagnosticsReport, reason: impl Into<String>) -> Self {
        PipelineResult::Failure {
            diagnostics,
            reason: reason.into(),
        }
    }

    /// A failure whose report holds a single project-level error.
    pub fn internal(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        PipelineResult::Failure {
            diagnostics: DiagnosticsReport::single_error(reason.clone()),
            reason,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success { .. })
    }

    pub fn diagnostics(&self) -> &DiagnosticsReport {
        match self {
            PipelineResult::Success { diagnostics, .. }
            | PipelineResult::Failure { diagnostics, .. } => diagnostics,
        }
    }

    pub fn artifacts(&self) -> Option<&A> {
        match self {
            PipelineResult::Success { artifacts, .. } => Some(artifacts),
            PipelineResult::Failure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PipelineResult::Success { .. } => None,
            PipelineResult::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> PipelineResult<B> {
        match self {
            PipelineResult::Success {
                artifacts,
                diagnostics,
            } => PipelineResult::Success {
                artifacts: f(artifacts),
                diagnostics,
            },
            PipelineResult::Failure {
                diagnostics,
                reason,
            } => PipelineResult::Failure {
                diagnostics,
                reason,
            },
        }
    }
}

/// Internal pipeline failure. Never crosses [`contain`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{family} produced invalid output: {message}")]
    InvalidOutput {
        family: PipelineFamily,
        message: String,
    },

    #[error("{family} cannot handle {what}")]
    Unsupported {
        family: PipelineFamily,
        what: String,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

/// A backend family behind the executor.
pub trait Pipeline: Send + Sync {
    type Artifact;

    fn family(&self) -> PipelineFamily;

    /// Diagnostics only; no artifacts are produced.
    fn analyze(&self, ctx: &AnalysisContext) -> DiagnosticsReport {
        diagnose(ctx)
    }

    fn compile(
        &self,
        ctx: &AnalysisContext,
    ) -> Result<PipelineResult<Self::Artifact>, PipelineError>;
}

/// Normalized checker output; every source file gets a (possibly empty)
/// group so callers see the whole project.
pub fn diagnose(ctx: &AnalysisContext) -> DiagnosticsReport {
    diagnose_typed(ctx).0
}

/// [`diagnose`], also returning the types the checker inferred.
pub(crate) fn diagnose_typed(ctx: &AnalysisContext) -> (DiagnosticsReport, InferredTypes) {
    let checked = check_typed(ctx);
    let mut report = DiagnosticsReport::new();
    for file in &ctx.files {
        report.touch(&file.name);
    }
    report.merge(normalize(&checked.messages));
    (report, checked.inferred)
}

/// Run `compile` so that neither an error nor a panic escapes.
///
/// Both become a [`PipelineResult::Failure`] whose report carries the
/// message as a project-level error.
pub fn contain<A>(
    family: PipelineFamily,
    compile: impl FnOnce() -> Result<PipelineResult<A>, PipelineError>,
) -> PipelineResult<A> {
    match catch_unwind(AssertUnwindSafe(compile)) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            tracing::warn!(%family, error = %err, "pipeline failed");
            PipelineResult::internal(err.to_string())
        }
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else {
                "unknown panic".to_string()
            };
            tracing::warn!(%family, panic = %message, "pipeline panicked");
            PipelineResult::internal(format!("internal compiler error: {message}"))
        }
    }
}

/// [`Pipeline::compile`] inside [`contain`].
pub fn run_contained<P>(pipeline: &P, ctx: &AnalysisContext) -> PipelineResult<P::Artifact>
where
    P: Pipeline + ?Sized,
{
    let family = pipeline.family();
    let result = contain(family, || pipeline.compile(ctx));
    tracing::debug!(
        %family,
        success = result.is_success(),
        errors = result.diagnostics().error_count(),
        "pipeline finished"
    );
    result
}
