use pretty_assertions::assert_eq;

use super::*;

fn jvm() -> CompilerConfiguration {
    CompilerConfiguration::new(Platform::Jvm, &["kotlin-stdlib-jvm"])
}

fn texts(messages: &[RawMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.message.as_str()).collect()
}

#[test]
fn version_parsing() {
    assert_eq!(KotlinVersion::parse("1.9"), Some(KotlinVersion::new(1, 9)));
    assert_eq!(KotlinVersion::parse("2.1"), Some(KotlinVersion::LATEST_STABLE));
    assert_eq!(KotlinVersion::parse("1.4"), None);
    assert_eq!(KotlinVersion::parse("9.9"), None);
    assert_eq!(KotlinVersion::parse("two"), None);
    assert_eq!(KotlinVersion::new(1, 9).to_string(), "1.9");
}

#[test]
fn empty_arguments_change_nothing() {
    let mut config = jvm();
    assert!(config.apply_arguments("").is_empty());
    assert_eq!(config, jvm());
}

#[test]
fn warning_policy_flags() {
    let mut config = jvm();
    assert!(config.apply_arguments("-Werror  -nowarn").is_empty());
    assert!(config.warnings.as_errors);
    assert!(config.warnings.suppress);
}

#[test]
fn language_version_drags_api_version_down() {
    let mut config = jvm();
    assert!(config.apply_arguments("-language-version 1.9").is_empty());
    assert_eq!(config.language_version, KotlinVersion::new(1, 9));
    assert_eq!(config.api_version, KotlinVersion::new(1, 9));
}

#[test]
fn explicit_api_version_above_language_version_is_an_error() {
    let mut config = jvm();
    let messages = config.apply_arguments("-language-version=1.9 -api-version=2.0");
    assert_eq!(
        texts(&messages),
        ["-api-version (2.0) cannot be greater than -language-version (1.9)"]
    );
    assert!(messages[0].severity.is_error());
    assert_eq!(config.api_version, KotlinVersion::new(1, 9));
}

#[test]
fn bad_version_value() {
    let mut config = jvm();
    let messages = config.apply_arguments("-language-version 0.1");
    assert_eq!(texts(&messages), ["Unknown -language-version value: 0.1"]);
}

#[test]
fn explicit_api_and_features() {
    let mut config = jvm();
    let messages =
        config.apply_arguments("-Xexplicit-api=strict -Xcontext-receivers -opt-in=kotlin.ExperimentalStdlibApi");
    assert!(messages.is_empty());
    assert_eq!(config.explicit_api, ExplicitApiMode::Strict);
    assert!(config.features.contains(LanguageFeatures::CONTEXT_RECEIVERS));
    assert_eq!(config.opt_ins, ["kotlin.ExperimentalStdlibApi"]);

    let messages = config.apply_arguments("-Xexplicit-api=loose");
    assert_eq!(texts(&messages), ["Wrong value for -Xexplicit-api: loose"]);
}

#[test]
fn unknown_flags_are_strong_warnings() {
    let mut config = jvm();
    let messages = config.apply_arguments("-Xsomething hello");
    assert_eq!(
        texts(&messages),
        [
            "Flag is not supported by this version of the compiler: -Xsomething",
            "Flag is not supported by this version of the compiler: hello",
        ]
    );
    assert!(messages
        .iter()
        .all(|m| m.severity == CompilerMessageSeverity::StrongWarning && m.location.is_none()));
}

#[test]
fn collector_follows_policy() {
    let policy = WarningPolicy {
        as_errors: true,
        suppress: false,
    };
    let mut collector = policy.collector();
    collector.warning("w", None);
    assert!(collector.has_errors());
}
