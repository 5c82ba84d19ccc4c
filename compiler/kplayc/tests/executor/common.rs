//! Stub backends and observers.

use std::marker::PhantomData;
use std::sync::Arc;

use kplay_analysis::{AnalysisContext, Environment, Project, ProjectType};
use kplay_backend::{
    ComposeIr, JsCode, JsStrategy, JvmClasses, Pipeline, PipelineError, PipelineFamily,
    PipelineResult, SwiftCode, WasmOutput,
};
use kplay_diagnostic::DiagnosticsReport;
use kplayc::{ExecutionObserver, ExecutionSummary, ProjectExecutor, RecordingObserver};

pub const HELLO: &str = "fun main() {\n    println(\"Hello\")\n}";

pub fn project(target: ProjectType, source: &str) -> Project {
    Project::single(target, "Main.kt", source)
}

pub fn hello(target: ProjectType) -> Project {
    project(target, HELLO)
}

pub fn java(source: &str) -> Project {
    project(ProjectType::Java, source)
}

/// Executor over `env` that records every observation.
pub fn recording(env: &Environment) -> (ProjectExecutor<'_>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let executor = ProjectExecutor::new(env).with_observer(observer.clone());
    (executor, observer)
}

/// How a stub pipeline misbehaves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    Panic,
    Error,
}

pub const STUB_PANIC: &str = "stub backend exploded";

pub struct StubPipeline<A> {
    family: PipelineFamily,
    fault: Fault,
    artifact: PhantomData<fn() -> A>,
}

impl<A> StubPipeline<A> {
    fn boxed(family: PipelineFamily, fault: Fault) -> Box<Self> {
        Box::new(StubPipeline {
            family,
            fault,
            artifact: PhantomData,
        })
    }
}

impl<A> Pipeline for StubPipeline<A> {
    type Artifact = A;

    fn family(&self) -> PipelineFamily {
        self.family
    }

    fn analyze(&self, _ctx: &AnalysisContext) -> DiagnosticsReport {
        panic!("{STUB_PANIC}");
    }

    fn compile(&self, _ctx: &AnalysisContext) -> Result<PipelineResult<A>, PipelineError> {
        match self.fault {
            Fault::Panic => panic!("{STUB_PANIC}"),
            Fault::Error => Err(PipelineError::Internal("stub backend failed".into())),
        }
    }
}

/// Backends whose every pipeline fails the same way.
pub struct FaultyBackends(pub Fault);

impl kplay_backend::Backends for FaultyBackends {
    fn jvm(&self, _require_main: bool) -> Box<dyn Pipeline<Artifact = JvmClasses>> {
        StubPipeline::<JvmClasses>::boxed(PipelineFamily::Jvm, self.0)
    }

    fn js(&self, strategy: JsStrategy) -> Box<dyn Pipeline<Artifact = JsCode>> {
        StubPipeline::<JsCode>::boxed(PipelineFamily::Js { strategy }, self.0)
    }

    fn wasm(&self, compose: bool, _debug_info: bool) -> Box<dyn Pipeline<Artifact = WasmOutput>> {
        let family = if compose {
            PipelineFamily::ComposeWasm
        } else {
            PipelineFamily::Wasm
        };
        StubPipeline::<WasmOutput>::boxed(family, self.0)
    }

    fn compose_ir(&self) -> Box<dyn Pipeline<Artifact = ComposeIr>> {
        StubPipeline::<ComposeIr>::boxed(PipelineFamily::ComposeIr, self.0)
    }

    fn swift_export(&self) -> Box<dyn Pipeline<Artifact = SwiftCode>> {
        StubPipeline::<SwiftCode>::boxed(PipelineFamily::SwiftExport, self.0)
    }
}

/// Observer that always panics.
pub struct PanickingObserver;

impl ExecutionObserver for PanickingObserver {
    fn observe(
        &self,
        _summary: &ExecutionSummary,
        _diagnostics: &DiagnosticsReport,
        _target: ProjectType,
        _version: &str,
    ) {
        panic!("observer exploded");
    }
}
