//! Process-wide, read-only compilation environment.
//!
//! An [`Environment`] knows which library artifacts are available and holds
//! one configuration template per target. It is built once (see
//! [`Environment::global`]) or explicitly, and only ever read afterwards, so
//! any number of requests can share it without locking.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use crate::config::{CompilerConfiguration, KotlinVersion, LanguageFeatures};
use crate::error::{ConfigurationError, EnvironmentError};
use crate::project::ProjectType;
use crate::stdlib::{self, KNOWN_LIBRARIES};

/// Version of the bundled standard library.
pub const STDLIB_VERSION: &str = "2.1.0";

pub const LIBRARIES_DIR_VAR: &str = "KPLAY_LIBRARIES_DIR";
pub const WORKERS_VAR: &str = "KPLAY_WORKERS";

/// Settings the environment is built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Directory of `*.klib` / `*.jar` artifacts. `None` uses the bundled set.
    pub libraries_dir: Option<PathBuf>,
    /// Worker pool size; `None` lets the pool decide.
    pub workers: Option<usize>,
}

impl EnvironmentConfig {
    /// Read `KPLAY_LIBRARIES_DIR` and `KPLAY_WORKERS`.
    pub fn from_env() -> Result<Self, EnvironmentError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EnvironmentError> {
        let libraries_dir = lookup(LIBRARIES_DIR_VAR)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        let workers = match lookup(WORKERS_VAR) {
            None => None,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    return Err(EnvironmentError::InvalidVar {
                        var: WORKERS_VAR,
                        value,
                    })
                }
            },
        };
        Ok(EnvironmentConfig {
            libraries_dir,
            workers,
        })
    }
}

/// An available library artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    /// `None` for bundled libraries.
    pub path: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Environment {
    libraries: FxHashMap<String, Library>,
    templates: FxHashMap<ProjectType, CompilerConfiguration>,
    workers: Option<usize>,
}

static GLOBAL: OnceLock<Result<Environment, EnvironmentError>> = OnceLock::new();

impl Environment {
    /// Build from settings, scanning the libraries directory if one is set.
    pub fn new(config: &EnvironmentConfig) -> Result<Self, EnvironmentError> {
        let libraries = match &config.libraries_dir {
            Some(dir) => scan_libraries(dir)?,
            None => KNOWN_LIBRARIES
                .iter()
                .map(|name| Library {
                    name: (*name).to_string(),
                    path: None,
                })
                .collect(),
        };
        let mut env = Self::from_libraries(libraries);
        env.workers = config.workers;
        Ok(env)
    }

    /// Every known library, bundled.
    pub fn bundled() -> Self {
        Self::with_libraries(KNOWN_LIBRARIES)
    }

    /// Only the named libraries; handy for tests.
    pub fn with_libraries<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_libraries(
            names
                .into_iter()
                .map(|name| Library {
                    name: name.into(),
                    path: None,
                })
                .collect(),
        )
    }

    fn from_libraries(libraries: Vec<Library>) -> Self {
        let templates = ProjectType::ALL
            .into_iter()
            .map(|target| (target, target_template(target)))
            .collect();
        let libraries: FxHashMap<String, Library> = libraries
            .into_iter()
            .map(|lib| (lib.name.clone(), lib))
            .collect();
        tracing::debug!(libraries = libraries.len(), "environment ready");
        Environment {
            libraries,
            templates,
            workers: None,
        }
    }

    /// The shared environment, initialized from the process environment on
    /// first use. A failed initialization is remembered and reported to every
    /// caller.
    pub fn global() -> Result<&'static Environment, ConfigurationError> {
        GLOBAL
            .get_or_init(|| EnvironmentConfig::from_env().and_then(|c| Environment::new(&c)))
            .as_ref()
            .map_err(ConfigurationError::from)
    }

    pub fn template(&self, target: ProjectType) -> Option<&CompilerConfiguration> {
        self.templates.get(&target)
    }

    /// Template for the Compose IR dump: the `compose-wasm` template with the
    /// latest stable versions and the Compose code generation flags.
    pub fn compose_ir_template(&self) -> Option<CompilerConfiguration> {
        let mut config = self.template(ProjectType::ComposeWasm)?.clone();
        config.language_version = KotlinVersion::LATEST_STABLE;
        config.api_version = KotlinVersion::LATEST_STABLE;
        Some(config.with_features(
            LanguageFeatures::STRONG_SKIPPING | LanguageFeatures::SOURCE_INFORMATION,
        ))
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    pub fn library(&self, name: &str) -> Option<&Library> {
        self.libraries.get(name)
    }

    /// First library of `config` that this environment lacks.
    pub fn missing_library<'c>(&self, config: &'c CompilerConfiguration) -> Option<&'c str> {
        config
            .libraries
            .iter()
            .map(String::as_str)
            .find(|name| !self.has_library(name))
    }

    pub fn workers(&self) -> Option<usize> {
        self.workers
    }

    pub fn stdlib_version(&self) -> &'static str {
        STDLIB_VERSION
    }
}

fn target_template(target: ProjectType) -> CompilerConfiguration {
    let config = CompilerConfiguration::new(target.platform(), stdlib::libraries_for(target));
    match target {
        ProjectType::ComposeWasm => config.with_features(LanguageFeatures::COMPOSE),
        _ => config,
    }
}

/// Map artifact files onto known library names.
///
/// `kotlin-stdlib-jvm.jar` and `kotlin-stdlib-jvm-2.1.0.jar` both provide
/// `kotlin-stdlib-jvm`; anything else is ignored.
fn scan_libraries(dir: &Path) -> Result<Vec<Library>, EnvironmentError> {
    let io_err = |source| EnvironmentError::LibrariesDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut found: Vec<Library> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_artifact = path
            .extension()
            .is_some_and(|ext| ext == "klib" || ext == "jar");
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_artifact {
            continue;
        }
        match library_name(stem) {
            Some(name) if !found.iter().any(|l| l.name == name) => found.push(Library {
                name: name.to_string(),
                path: Some(path.clone()),
            }),
            Some(_) => {}
            None => tracing::debug!(path = %path.display(), "ignoring unknown artifact"),
        }
    }
    // read_dir order is platform dependent.
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(found)
}

fn library_name(stem: &str) -> Option<&'static str> {
    KNOWN_LIBRARIES.into_iter().find(|name| {
        stem == *name
            || stem
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('-'))
                .is_some_and(|version| version.starts_with(|c: char| c.is_ascii_digit()))
    })
}
