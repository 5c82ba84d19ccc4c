//! The orchestrator: target dispatch, containment and observation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use kplay_analysis::{
    acquire, acquire_with, complete, AnalysisContext, CompletionCandidate, ConfigurationError,
    Environment, Project, ProjectType,
};
use kplay_backend::{
    run_contained, Backends, ComposeIr, DefaultBackends, JsCode, JvmClasses, Pipeline,
    PipelineFamily, PipelineResult, SwiftCode, WasmOutput,
};
use kplay_diagnostic::DiagnosticsReport;
use serde::{Deserialize, Serialize};

use crate::dispatch::Operation;
use crate::observer::{ExecutionObserver, ExecutionSummary, TracingObserver};

/// Version reported to observers and by [`ProjectExecutor::version`].
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub stdlib_version: String,
}

/// Routes projects to pipelines.
///
/// Every compiling operation yields exactly one [`PipelineResult`] or a
/// [`ConfigurationError`]; the latter is raised before any source is parsed.
/// Backend errors and panics come back as failures.
pub struct ProjectExecutor<'e> {
    env: &'e Environment,
    backends: Box<dyn Backends>,
    observer: Arc<dyn ExecutionObserver>,
}

impl<'e> ProjectExecutor<'e> {
    pub fn new(env: &'e Environment) -> Self {
        ProjectExecutor {
            env,
            backends: Box::new(DefaultBackends),
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_backends(mut self, backends: impl Backends + 'static) -> Self {
        self.backends = Box::new(backends);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn environment(&self) -> &'e Environment {
        self.env
    }

    /// Compile for the JVM; a project without `fun main()` fails.
    pub fn run(&self, project: &Project) -> Result<PipelineResult<JvmClasses>, ConfigurationError> {
        let family = self.resolve(Operation::Run, project)?;
        let ctx = acquire(self.env, project, project.conf_type)?;
        let result = run_contained(&*self.backends.jvm(true), &ctx);
        self.notify(Operation::Run, family, project.conf_type, &result);
        Ok(result)
    }

    /// Class files only; `main` is optional and nothing is observed.
    pub fn compile_to_jvm(
        &self,
        project: &Project,
    ) -> Result<PipelineResult<JvmClasses>, ConfigurationError> {
        self.resolve(Operation::CompileToJvm, project)?;
        let ctx = acquire(self.env, project, project.conf_type)?;
        Ok(run_contained(&*self.backends.jvm(false), &ctx))
    }

    pub fn translate_js(
        &self,
        project: &Project,
    ) -> Result<PipelineResult<JsCode>, ConfigurationError> {
        let family = self.resolve(Operation::TranslateJs, project)?;
        let PipelineFamily::Js { strategy } = family else {
            return Err(unsupported(Operation::TranslateJs, project));
        };
        let pipeline = self.backends.js(strategy);
        self.execute(Operation::TranslateJs, family, project, &*pipeline)
    }

    pub fn translate_wasm(
        &self,
        project: &Project,
        debug_info: bool,
    ) -> Result<PipelineResult<WasmOutput>, ConfigurationError> {
        let family = self.resolve(Operation::TranslateWasm, project)?;
        let compose = family == PipelineFamily::ComposeWasm;
        let pipeline = self.backends.wasm(compose, debug_info);
        self.execute(Operation::TranslateWasm, family, project, &*pipeline)
    }

    pub fn translate_swift(
        &self,
        project: &Project,
    ) -> Result<PipelineResult<SwiftCode>, ConfigurationError> {
        let family = self.resolve(Operation::TranslateSwift, project)?;
        let pipeline = self.backends.swift_export();
        self.execute(Operation::TranslateSwift, family, project, &*pipeline)
    }

    /// Compose IR dump, under the derived configuration of
    /// [`Environment::compose_ir_template`].
    pub fn generate_compose_ir(
        &self,
        project: &Project,
    ) -> Result<PipelineResult<ComposeIr>, ConfigurationError> {
        let family = self.resolve(Operation::GenerateComposeIr, project)?;
        let config = self.env.compose_ir_template().ok_or_else(|| {
            ConfigurationError::InvalidEnvironment("no compose-wasm configuration template".into())
        })?;
        let ctx = acquire_with(self.env, project, project.conf_type, config)?;
        let result = run_contained(&*self.backends.compose_ir(), &ctx);
        self.notify(Operation::GenerateComposeIr, family, project.conf_type, &result);
        Ok(result)
    }

    /// Analysis-only diagnostics. Never fails: any error or panic yields an
    /// empty report.
    pub fn highlight(&self, project: &Project) -> DiagnosticsReport {
        let analyzed = catch_unwind(AssertUnwindSafe(|| {
            let family = self.resolve(Operation::Highlight, project)?;
            let ctx = acquire(self.env, project, project.conf_type)?;
            Ok::<_, ConfigurationError>(self.analyze(family, &ctx))
        }));
        match analyzed {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "highlight rejected");
                DiagnosticsReport::new()
            }
            Err(_) => {
                tracing::warn!(target = %project.conf_type, "highlight panicked");
                DiagnosticsReport::new()
            }
        }
    }

    /// Candidates at a 0-based position in the project's first file.
    ///
    /// Swift export projects complete as `compose-wasm`. Never fails: any
    /// error or panic yields no candidates.
    pub fn complete(&self, project: &Project, line: u32, column: u32) -> Vec<CompletionCandidate> {
        let target = match project.conf_type {
            ProjectType::SwiftExport => ProjectType::ComposeWasm,
            target => target,
        };
        let Some(file) = project.files.first() else {
            return Vec::new();
        };
        let candidates = catch_unwind(AssertUnwindSafe(|| {
            Operation::Complete.family(target)?;
            let ctx = acquire(self.env, project, target).ok()?;
            complete(&ctx, &file.name, line, column, target).ok()
        }));
        match candidates {
            Ok(candidates) => candidates.unwrap_or_default(),
            Err(_) => {
                tracing::warn!(%target, "completion panicked");
                Vec::new()
            }
        }
    }

    pub fn version(&self) -> VersionInfo {
        VersionInfo {
            version: VERSION.to_string(),
            stdlib_version: self.env.stdlib_version().to_string(),
        }
    }

    fn resolve(
        &self,
        operation: Operation,
        project: &Project,
    ) -> Result<PipelineFamily, ConfigurationError> {
        let family = operation
            .family(project.conf_type)
            .ok_or_else(|| unsupported(operation, project))?;
        tracing::debug!(%operation, target = %project.conf_type, %family, "dispatching");
        Ok(family)
    }

    fn execute<A>(
        &self,
        operation: Operation,
        family: PipelineFamily,
        project: &Project,
        pipeline: &dyn Pipeline<Artifact = A>,
    ) -> Result<PipelineResult<A>, ConfigurationError> {
        let ctx = acquire(self.env, project, project.conf_type)?;
        let result = run_contained(pipeline, &ctx);
        self.notify(operation, family, project.conf_type, &result);
        Ok(result)
    }

    fn analyze(&self, family: PipelineFamily, ctx: &AnalysisContext) -> DiagnosticsReport {
        match family {
            PipelineFamily::Jvm => self.backends.jvm(false).analyze(ctx),
            PipelineFamily::Js { strategy } => self.backends.js(strategy).analyze(ctx),
            PipelineFamily::Wasm => self.backends.wasm(false, false).analyze(ctx),
            PipelineFamily::ComposeWasm => self.backends.wasm(true, false).analyze(ctx),
            PipelineFamily::ComposeIr => self.backends.compose_ir().analyze(ctx),
            PipelineFamily::SwiftExport => self.backends.swift_export().analyze(ctx),
        }
    }

    fn notify<A>(
        &self,
        operation: Operation,
        family: PipelineFamily,
        target: ProjectType,
        result: &PipelineResult<A>,
    ) {
        let summary = ExecutionSummary::of(operation, family, result);
        let observed = catch_unwind(AssertUnwindSafe(|| {
            self.observer
                .observe(&summary, result.diagnostics(), target, VERSION);
        }));
        if observed.is_err() {
            tracing::warn!(%operation, %target, "execution observer panicked");
        }
    }
}

fn unsupported(operation: Operation, project: &Project) -> ConfigurationError {
    ConfigurationError::UnsupportedTarget {
        target: project.conf_type,
        operation: operation.name(),
    }
}
