//! Everything between a request and a backend.
//!
//! # Main Entry Points
//!
//! - [`Environment`]: process-wide library set and configuration templates
//! - [`acquire`]: build a request-scoped [`AnalysisContext`]
//! - [`check`]: front-end diagnostics for a context
//! - [`complete`]: completion candidates at a cursor
//!
//! # Module Organization
//!
//! - `project`: request payload and target tags
//! - `config`: compiler configuration and argument handling
//! - `environment`: library discovery and templates
//! - `index`: project-wide declaration index and type resolution
//! - `checker`: name, type and declaration rules

pub mod checker;
pub mod completion;
pub mod config;
mod context;
pub mod environment;
mod error;
pub mod index;
mod project;
pub mod stdlib;
pub mod types;

pub use checker::{check, check_typed, Checked, InferredTypes};
pub use completion::{complete, CompletionCandidate, CompletionKind};
pub use config::{
    CompilerConfiguration, ExplicitApiMode, KotlinVersion, LanguageFeatures, Platform,
    WarningPolicy,
};
pub use context::{acquire, acquire_with, AnalysisContext};
pub use environment::{Environment, EnvironmentConfig};
pub use error::{CompletionError, ConfigurationError, EnvironmentError};
pub use index::ProjectIndex;
pub use project::{Project, ProjectType, SourceFile};
pub use types::Ty;
