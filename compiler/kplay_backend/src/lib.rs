//! Backend pipelines: from an analysis context to target artifacts.
//!
//! # Main Entry Points
//!
//! - [`Pipeline`]: one backend family, `analyze` plus `compile`
//! - [`Backends`] / [`DefaultBackends`]: where executors get pipelines from
//! - [`run_contained`]: compile so that neither errors nor panics escape
//!
//! # Module Organization
//!
//! - `pipeline`: the trait, results, errors and the containment boundary
//! - `lower`: target-neutral lowering shared by the JS IR and wasm backends
//! - `jvm`, `js`, `wasm`, `compose`, `swift`: one module per family
//! - `artifact`: what successful pipelines return

pub mod artifact;
mod backends;
mod compose;
mod js;
mod jvm;
mod lower;
mod pipeline;
mod swift;
mod wasm;
mod writer;

pub use artifact::{ClassFile, ComposeIr, JsCode, JvmClasses, SwiftCode, WasmOutput};
pub use backends::{Backends, DefaultBackends};
pub use jvm::NO_MAIN;
pub use pipeline::{
    contain, diagnose, run_contained, JsStrategy, Pipeline, PipelineError, PipelineFamily,
    PipelineResult, COMPILATION_FAILED,
};
pub use swift::ERROR_TYPE;
pub use wasm::{MODULE_FILE, SOURCE_MAP_FILE};
