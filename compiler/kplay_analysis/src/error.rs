//! Error types for environment setup, context acquisition and completion.

use std::path::PathBuf;

use thiserror::Error;

use crate::project::ProjectType;

/// The only error that crosses the executor boundary.
///
/// Raised before any source file is parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown target type '{0}'")]
    UnknownTarget(String),

    #[error("target '{target}' is not supported by {operation}")]
    UnsupportedTarget {
        target: ProjectType,
        operation: &'static str,
    },

    #[error("library '{library}' required by target '{target}' is not available")]
    MissingLibrary { target: ProjectType, library: String },

    #[error("duplicate file name '{0}' in project")]
    DuplicateFile(String),

    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("cannot read libraries directory {}: {source}", path.display())]
    LibrariesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    InvalidVar { var: &'static str, value: String },
}

impl From<&EnvironmentError> for ConfigurationError {
    fn from(err: &EnvironmentError) -> Self {
        ConfigurationError::InvalidEnvironment(err.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    #[error("project has no files")]
    NoFiles,

    #[error("file '{0}' is not part of the project")]
    UnknownFile(String),

    #[error("position {line}:{column} is outside of '{file}'")]
    OutOfRange { file: String, line: u32, column: u32 },
}
