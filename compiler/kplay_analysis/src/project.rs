//! Request payload: source files, compiler arguments and the target tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Platform;
use crate::error::ConfigurationError;

/// Target type tag carried by every project.
///
/// Serialized as its wire tag (`"java"`, `"js-ir"`, ...). Unknown tags fail
/// with [`ConfigurationError::UnknownTarget`], both through [`FromStr`] and
/// through serde.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProjectType {
    /// Native JVM bytecode.
    Java,
    /// Browser script, direct translation.
    Js,
    /// Browser script through the IR backend.
    JsIr,
    Wasm,
    /// WebAssembly with the Compose runtime.
    ComposeWasm,
    /// Swift source export.
    SwiftExport,
}

impl ProjectType {
    pub const ALL: [ProjectType; 6] = [
        ProjectType::Java,
        ProjectType::Js,
        ProjectType::JsIr,
        ProjectType::Wasm,
        ProjectType::ComposeWasm,
        ProjectType::SwiftExport,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ProjectType::Java => "java",
            ProjectType::Js => "js",
            ProjectType::JsIr => "js-ir",
            ProjectType::Wasm => "wasm",
            ProjectType::ComposeWasm => "compose-wasm",
            ProjectType::SwiftExport => "swift-export",
        }
    }

    pub fn platform(self) -> Platform {
        match self {
            ProjectType::Java => Platform::Jvm,
            ProjectType::Js | ProjectType::JsIr => Platform::Js,
            ProjectType::Wasm | ProjectType::ComposeWasm => Platform::WasmJs,
            ProjectType::SwiftExport => Platform::Native,
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProjectType {
    type Err = ConfigurationError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| ConfigurationError::UnknownTarget(tag.to_string()))
    }
}

impl TryFrom<String> for ProjectType {
    type Error = ConfigurationError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl From<ProjectType> for String {
    fn from(target: ProjectType) -> Self {
        target.tag().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// One compilation request. Never mutated once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub files: Vec<SourceFile>,
    /// Free-form compiler arguments, split on whitespace.
    #[serde(default)]
    pub args: String,
    #[serde(default = "default_target")]
    pub conf_type: ProjectType,
}

fn default_target() -> ProjectType {
    ProjectType::Java
}

impl Project {
    pub fn new(conf_type: ProjectType) -> Self {
        Project {
            files: Vec::new(),
            args: String::new(),
            conf_type,
        }
    }

    /// Single-file project, the common playground shape.
    pub fn single(conf_type: ProjectType, name: &str, text: &str) -> Self {
        Project::new(conf_type).with_file(name, text)
    }

    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.push(SourceFile::new(name, text));
        self
    }

    #[must_use]
    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }

    /// The first repeated file name, if any.
    pub fn duplicate_file(&self) -> Option<&str> {
        let mut seen = rustc_hash::FxHashSet::default();
        self.files
            .iter()
            .map(|f| f.name.as_str())
            .find(|name| !seen.insert(*name))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
