use kplay_analysis::stdlib::{STDLIB_JS, STDLIB_JVM};
use kplay_analysis::{ConfigurationError, Environment, Project, ProjectType};
use kplay_backend::{JsStrategy, PipelineFamily, COMPILATION_FAILED, NO_MAIN};
use kplay_diagnostic::PROJECT_KEY;
use kplayc::{Operation, ProjectExecutor};
use pretty_assertions::assert_eq;

use crate::common::{hello, java, project, recording};

#[test]
fn each_operation_reaches_its_family() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);

    assert!(executor.run(&hello(ProjectType::Java)).unwrap().is_success());
    assert!(executor.translate_js(&hello(ProjectType::Js)).unwrap().is_success());
    assert!(executor.translate_js(&hello(ProjectType::JsIr)).unwrap().is_success());
    assert!(executor
        .translate_wasm(&hello(ProjectType::Wasm), false)
        .unwrap()
        .is_success());
    assert!(executor
        .translate_wasm(&hello(ProjectType::ComposeWasm), false)
        .unwrap()
        .is_success());
    assert!(executor
        .translate_swift(&hello(ProjectType::SwiftExport))
        .unwrap()
        .is_success());
    assert!(executor
        .generate_compose_ir(&hello(ProjectType::ComposeWasm))
        .unwrap()
        .is_success());

    let routed: Vec<(Operation, PipelineFamily)> = observer
        .observations()
        .into_iter()
        .map(|o| (o.summary.operation, o.summary.family))
        .collect();
    assert_eq!(
        routed,
        vec![
            (Operation::Run, PipelineFamily::Jvm),
            (
                Operation::TranslateJs,
                PipelineFamily::Js {
                    strategy: JsStrategy::Direct
                }
            ),
            (
                Operation::TranslateJs,
                PipelineFamily::Js {
                    strategy: JsStrategy::Ir
                }
            ),
            (Operation::TranslateWasm, PipelineFamily::Wasm),
            (Operation::TranslateWasm, PipelineFamily::ComposeWasm),
            (Operation::TranslateSwift, PipelineFamily::SwiftExport),
            (Operation::GenerateComposeIr, PipelineFamily::ComposeIr),
        ]
    );
}

#[test]
fn unsupported_targets_fail_before_parsing() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let unsupported = |target, operation| ConfigurationError::UnsupportedTarget { target, operation };

    // Unparseable sources prove nothing was parsed.
    let garbage = |target| project(target, "}}} not kotlin {{{");

    assert_eq!(
        executor.run(&garbage(ProjectType::Js)).unwrap_err(),
        unsupported(ProjectType::Js, "run")
    );
    assert_eq!(
        executor.compile_to_jvm(&garbage(ProjectType::Wasm)).unwrap_err(),
        unsupported(ProjectType::Wasm, "compile-to-jvm")
    );
    assert_eq!(
        executor.translate_js(&garbage(ProjectType::Java)).unwrap_err(),
        unsupported(ProjectType::Java, "translate-js")
    );
    assert_eq!(
        executor
            .translate_wasm(&garbage(ProjectType::SwiftExport), true)
            .unwrap_err(),
        unsupported(ProjectType::SwiftExport, "translate-wasm")
    );
    assert_eq!(
        executor.translate_swift(&garbage(ProjectType::JsIr)).unwrap_err(),
        unsupported(ProjectType::JsIr, "translate-swift")
    );
    assert_eq!(
        executor
            .generate_compose_ir(&garbage(ProjectType::Wasm))
            .unwrap_err(),
        unsupported(ProjectType::Wasm, "generate-compose-ir")
    );
    assert!(observer.observations().is_empty());
}

#[test]
fn unknown_tags_are_rejected() {
    assert_eq!(
        "kotlin-native".parse::<ProjectType>().unwrap_err(),
        ConfigurationError::UnknownTarget("kotlin-native".into())
    );
    let json = r#"{"files":[],"args":"","confType":"kotlin-native"}"#;
    let err = serde_json::from_str::<Project>(json).unwrap_err();
    assert!(err.to_string().contains("unknown target type 'kotlin-native'"));
}

#[test]
fn duplicate_file_names_are_rejected() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let project = Project::new(ProjectType::Js)
        .with_file("Main.kt", HELLO_JS)
        .with_file("Util.kt", "fun util() = 1")
        .with_file("Main.kt", HELLO_JS);
    assert_eq!(
        executor.translate_js(&project).unwrap_err(),
        ConfigurationError::DuplicateFile("Main.kt".into())
    );
    assert!(observer.observations().is_empty());
}

const HELLO_JS: &str = "fun main() {}";

#[test]
fn missing_libraries_are_configuration_errors() {
    let env = Environment::with_libraries([STDLIB_JVM]);
    let executor = ProjectExecutor::new(&env);
    assert!(executor.run(&hello(ProjectType::Java)).is_ok());
    assert_eq!(
        executor.translate_js(&hello(ProjectType::JsIr)).unwrap_err(),
        ConfigurationError::MissingLibrary {
            target: ProjectType::JsIr,
            library: STDLIB_JS.into(),
        }
    );
}

#[test]
fn run_requires_main_but_compile_does_not() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let library = java("fun add(a: Int, b: Int) = a + b");

    let run = executor.run(&library).unwrap();
    assert_eq!(run.reason(), Some(NO_MAIN));
    assert_eq!(run.diagnostics().entries(PROJECT_KEY).len(), 1);

    let compiled = executor.compile_to_jvm(&library).unwrap();
    assert!(compiled.is_success());
    assert_eq!(compiled.artifacts().unwrap().main_class, None);

    assert_eq!(observer.observations().len(), 1);
}

#[test]
fn analysis_errors_are_failures_with_diagnostics() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let result = executor
        .run(&java("fun main() {\n    missing()\n}"))
        .unwrap();
    assert_eq!(result.reason(), Some(COMPILATION_FAILED));
    assert!(result.artifacts().is_none());
    let messages: Vec<&str> = result
        .diagnostics()
        .entries("Main.kt")
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(messages, ["Unresolved reference: missing"]);
}

#[test]
fn arguments_reach_the_configuration() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let project = java("fun main() {}").with_args("-Xno-such-flag");
    let result = executor.compile_to_jvm(&project).unwrap();
    assert!(result.is_success());
    assert_eq!(result.diagnostics().warning_count(), 1);
}

#[test]
fn documented_sources_compile() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let source = "/**\n * Entry point.\n * Prints a * b.\n */\nfun main() {\n    /* a * b /* nested */ */\n    println(\"done\")\n}";
    let result = executor.run(&java(source)).unwrap();
    assert!(result.is_success(), "{:?}", result.diagnostics());
    assert_eq!(result.diagnostics().error_count(), 0);

    let js = executor.translate_js(&project(ProjectType::Js, source)).unwrap();
    assert!(js.is_success());
}
