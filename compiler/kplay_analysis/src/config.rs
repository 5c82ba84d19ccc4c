//! Per-request compiler configuration.
//!
//! Templates live in the [`Environment`](crate::Environment); a request copies
//! one and applies its argument string with
//! [`CompilerConfiguration::apply_arguments`].

use std::fmt;

use bitflags::bitflags;
use kplay_diagnostic::{CompilerMessageSeverity, MessageCollector, RawMessage};

/// `major.minor` language or API version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KotlinVersion {
    pub major: u8,
    pub minor: u8,
}

impl KotlinVersion {
    pub const OLDEST_SUPPORTED: KotlinVersion = KotlinVersion::new(1, 8);
    pub const LATEST_STABLE: KotlinVersion = KotlinVersion::new(2, 1);

    pub const fn new(major: u8, minor: u8) -> Self {
        KotlinVersion { major, minor }
    }

    /// Parse `"1.9"`; anything outside the supported range is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let (major, minor) = text.split_once('.')?;
        let version = KotlinVersion::new(major.parse().ok()?, minor.parse().ok()?);
        (Self::OLDEST_SUPPORTED..=Self::LATEST_STABLE)
            .contains(&version)
            .then_some(version)
    }
}

impl fmt::Display for KotlinVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

bitflags! {
    /// Optional language and plugin features.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct LanguageFeatures: u32 {
        /// `-Xcontext-receivers`.
        const CONTEXT_RECEIVERS = 1 << 0;
        /// Compose compiler plugin is active.
        const COMPOSE = 1 << 1;
        /// Compose strong skipping mode.
        const STRONG_SKIPPING = 1 << 2;
        /// Compose source information markers in generated code.
        const SOURCE_INFORMATION = 1 << 3;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ExplicitApiMode {
    #[default]
    Disabled,
    Warning,
    Strict,
}

/// Target platform of a configuration template.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Platform {
    Jvm,
    Js,
    WasmJs,
    Native,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Jvm => "jvm",
            Platform::Js => "js",
            Platform::WasmJs => "wasm-js",
            Platform::Native => "native",
        };
        f.write_str(name)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct WarningPolicy {
    /// `-Werror`.
    pub as_errors: bool,
    /// `-nowarn`.
    pub suppress: bool,
}

impl WarningPolicy {
    /// A collector that applies this policy.
    pub fn collector(self) -> MessageCollector {
        MessageCollector::new().with_warning_policy(self.as_errors, self.suppress)
    }
}

/// Resolved settings for one compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfiguration {
    pub module_name: String,
    pub platform: Platform,
    pub language_version: KotlinVersion,
    pub api_version: KotlinVersion,
    pub features: LanguageFeatures,
    /// Library artifact names, in dependency order.
    pub libraries: Vec<String>,
    pub explicit_api: ExplicitApiMode,
    pub warnings: WarningPolicy,
    /// `-opt-in` markers, recorded as given.
    pub opt_ins: Vec<String>,
}

impl CompilerConfiguration {
    pub fn new(platform: Platform, libraries: &[&str]) -> Self {
        CompilerConfiguration {
            module_name: "playground".to_string(),
            platform,
            language_version: KotlinVersion::LATEST_STABLE,
            api_version: KotlinVersion::LATEST_STABLE,
            features: LanguageFeatures::empty(),
            libraries: libraries.iter().map(|l| (*l).to_string()).collect(),
            explicit_api: ExplicitApiMode::Disabled,
            warnings: WarningPolicy::default(),
            opt_ins: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_features(mut self, features: LanguageFeatures) -> Self {
        self.features |= features;
        self
    }

    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.iter().any(|l| l == name)
    }

    /// Apply a free-form argument string.
    ///
    /// Returns project-level messages for flags that were rejected or
    /// ignored. Never fails: a bad flag is a diagnostic, not an error.
    pub fn apply_arguments(&mut self, args: &str) -> Vec<RawMessage> {
        let mut messages = MessageCollector::new();
        let mut words = args.split_whitespace();
        let mut api_explicit = false;

        while let Some(flag) = words.next() {
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (flag, None),
            };
            match name {
                "-language-version" | "-api-version" => {
                    let value = inline_value.or_else(|| words.next()).unwrap_or("");
                    match KotlinVersion::parse(value) {
                        Some(version) if name == "-language-version" => {
                            self.language_version = version;
                        }
                        Some(version) => {
                            self.api_version = version;
                            api_explicit = true;
                        }
                        None => messages.error(format!("Unknown {name} value: {value}"), None),
                    }
                }
                "-Werror" => self.warnings.as_errors = true,
                "-nowarn" => self.warnings.suppress = true,
                "-Xexplicit-api" => match inline_value {
                    Some("strict") => self.explicit_api = ExplicitApiMode::Strict,
                    Some("warning") => self.explicit_api = ExplicitApiMode::Warning,
                    Some("disable") => self.explicit_api = ExplicitApiMode::Disabled,
                    other => messages.error(
                        format!("Wrong value for -Xexplicit-api: {}", other.unwrap_or("")),
                        None,
                    ),
                },
                "-Xcontext-receivers" => self.features |= LanguageFeatures::CONTEXT_RECEIVERS,
                "-opt-in" => match inline_value.or_else(|| words.next()) {
                    Some(marker) if !marker.is_empty() => self.opt_ins.push(marker.to_string()),
                    _ => messages.error("No value passed for -opt-in", None),
                },
                // Strong: still shown under -nowarn.
                _ => messages.report(
                    CompilerMessageSeverity::StrongWarning,
                    format!("Flag is not supported by this version of the compiler: {flag}"),
                    None,
                ),
            }
        }

        if self.api_version > self.language_version {
            // The API version follows the language version unless given.
            if api_explicit {
                messages.error(
                    format!(
                        "-api-version ({}) cannot be greater than -language-version ({})",
                        self.api_version, self.language_version
                    ),
                    None,
                );
            }
            self.api_version = self.language_version;
        }

        messages.into_messages()
    }
}

#[cfg(test)]
mod tests;
