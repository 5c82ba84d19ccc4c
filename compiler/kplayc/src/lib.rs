//! Orchestration layer: routes playground projects to backend pipelines.
//!
//! # Main Entry Points
//!
//! - [`ProjectExecutor`]: one method per operation, each returning a
//!   [`PipelineResult`](kplay_backend::PipelineResult) or a
//!   [`ConfigurationError`](kplay_analysis::ConfigurationError)
//! - [`WorkerPool`]: runs batches of independent requests in parallel
//! - [`ExecutionObserver`]: post-execution hook, [`TracingObserver`] by default
//!
//! # Module Organization
//!
//! - `dispatch`: which family serves which target, per operation
//! - `executor`: acquisition, containment and observation
//! - `cli`: the `kplay` binary's arguments and JSON transport

pub mod cli;
mod dispatch;
mod executor;
mod logging;
mod observer;
mod pool;

pub use dispatch::Operation;
pub use executor::{ProjectExecutor, VersionInfo, VERSION};
pub use logging::{init_tracing, LOG_TREE_VAR};
pub use observer::{
    ExecutionObserver, ExecutionSummary, Observation, RecordingObserver, TracingObserver,
};
pub use pool::WorkerPool;
