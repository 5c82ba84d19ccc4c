//! The set of pipelines an executor dispatches to.
//!
//! Executors never construct pipelines directly; they ask a [`Backends`]
//! value, so tests can substitute recording stubs for the real families.

use crate::artifact::{ComposeIr, JsCode, JvmClasses, SwiftCode, WasmOutput};
use crate::compose::ComposeIrPipeline;
use crate::js::JsPipeline;
use crate::jvm::JvmPipeline;
use crate::pipeline::{JsStrategy, Pipeline};
use crate::swift::SwiftExportPipeline;
use crate::wasm::WasmPipeline;

/// Factory for each pipeline family.
pub trait Backends: Send + Sync {
    /// `require_main` makes a project without `fun main()` a failure.
    fn jvm(&self, require_main: bool) -> Box<dyn Pipeline<Artifact = JvmClasses>>;

    fn js(&self, strategy: JsStrategy) -> Box<dyn Pipeline<Artifact = JsCode>>;

    fn wasm(&self, compose: bool, debug_info: bool) -> Box<dyn Pipeline<Artifact = WasmOutput>>;

    fn compose_ir(&self) -> Box<dyn Pipeline<Artifact = ComposeIr>>;

    fn swift_export(&self) -> Box<dyn Pipeline<Artifact = SwiftCode>>;
}

/// The in-tree backends.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultBackends;

impl Backends for DefaultBackends {
    fn jvm(&self, require_main: bool) -> Box<dyn Pipeline<Artifact = JvmClasses>> {
        Box::new(JvmPipeline::new(require_main))
    }

    fn js(&self, strategy: JsStrategy) -> Box<dyn Pipeline<Artifact = JsCode>> {
        Box::new(JsPipeline::new(strategy))
    }

    fn wasm(&self, compose: bool, debug_info: bool) -> Box<dyn Pipeline<Artifact = WasmOutput>> {
        Box::new(WasmPipeline::new(compose, debug_info))
    }

    fn compose_ir(&self) -> Box<dyn Pipeline<Artifact = ComposeIr>> {
        Box::new(ComposeIrPipeline)
    }

    fn swift_export(&self) -> Box<dyn Pipeline<Artifact = SwiftCode>> {
        Box::new(SwiftExportPipeline)
    }
}
