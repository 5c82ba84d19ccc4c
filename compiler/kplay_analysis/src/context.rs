//! Request-scoped analysis contexts.

use kplay_diagnostic::RawMessage;
use kplay_syntax::{parse_file, ParsedFile};

use crate::config::CompilerConfiguration;
use crate::environment::Environment;
use crate::error::ConfigurationError;
use crate::project::{Project, ProjectType};

/// Parsed sources plus the configuration they are compiled under.
///
/// Owned by exactly one request; nothing in here is shared.
#[derive(Clone, Debug)]
pub struct AnalysisContext {
    pub target: ProjectType,
    pub files: Vec<ParsedFile>,
    pub configuration: CompilerConfiguration,
    /// Project-level messages produced while applying compiler arguments.
    pub argument_messages: Vec<RawMessage>,
}

impl AnalysisContext {
    pub fn file(&self, name: &str) -> Option<&ParsedFile> {
        self.files.iter().find(|f| f.name == name)
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.files.iter().any(ParsedFile::has_errors)
    }
}

/// Build a fresh context for `project` compiled as `target`.
///
/// Copies the environment's template for `target`; the template itself is
/// never touched.
pub fn acquire(
    env: &Environment,
    project: &Project,
    target: ProjectType,
) -> Result<AnalysisContext, ConfigurationError> {
    let template = env.template(target).ok_or_else(|| {
        ConfigurationError::InvalidEnvironment(format!("no configuration template for '{target}'"))
    })?;
    acquire_with(env, project, target, template.clone())
}

/// Like [`acquire`] but with a caller-provided configuration (derived
/// templates such as the Compose IR one).
pub fn acquire_with(
    env: &Environment,
    project: &Project,
    target: ProjectType,
    mut configuration: CompilerConfiguration,
) -> Result<AnalysisContext, ConfigurationError> {
    if let Some(name) = project.duplicate_file() {
        return Err(ConfigurationError::DuplicateFile(name.to_string()));
    }
    if let Some(library) = env.missing_library(&configuration) {
        return Err(ConfigurationError::MissingLibrary {
            target,
            library: library.to_string(),
        });
    }

    let argument_messages = configuration.apply_arguments(&project.args);
    let files = project
        .files
        .iter()
        .map(|file| parse_file(&file.name, &file.text))
        .collect();

    tracing::debug!(
        conf_type = %target,
        files = project.files.len(),
        platform = %configuration.platform,
        "acquired analysis context"
    );

    Ok(AnalysisContext {
        target,
        files,
        configuration,
        argument_messages,
    })
}
