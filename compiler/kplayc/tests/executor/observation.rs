use std::sync::Arc;

use kplay_analysis::{Environment, ProjectType};
use kplay_backend::PipelineFamily;
use kplayc::{ExecutionSummary, Observation, Operation, ProjectExecutor, VERSION};
use pretty_assertions::assert_eq;

use crate::common::{hello, java, recording, PanickingObserver};

#[test]
fn observer_sees_summary_target_and_version() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let result = executor
        .translate_wasm(&hello(ProjectType::Wasm), true)
        .unwrap();

    assert_eq!(
        observer.observations(),
        vec![Observation {
            summary: ExecutionSummary {
                operation: Operation::TranslateWasm,
                family: PipelineFamily::Wasm,
                success: true,
                errors: 0,
                warnings: 0,
                reason: None,
            },
            diagnostics: result.diagnostics().clone(),
            target: ProjectType::Wasm,
            version: VERSION.to_string(),
        }]
    );
}

#[test]
fn observer_sees_the_response_diagnostics() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let result = executor
        .run(&java("fun main() {\n    missing()\n}"))
        .unwrap();

    let observations = observer.observations();
    assert_eq!(observations.len(), 1);
    let seen = &observations[0].diagnostics;
    assert_eq!(seen, result.diagnostics());
    let messages: Vec<&str> = seen
        .entries("Main.kt")
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(messages, ["Unresolved reference: missing"]);
    assert_eq!(observations[0].summary.errors, 1);
}

#[test]
fn derived_operations_are_not_observed() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    executor.highlight(&hello(ProjectType::Java));
    executor.complete(&hello(ProjectType::Java), 1, 4);
    executor.compile_to_jvm(&hello(ProjectType::Java)).unwrap();
    assert!(observer.observations().is_empty());
}

#[test]
fn a_panicking_observer_does_not_change_the_response() {
    let env = Environment::bundled();
    let plain = ProjectExecutor::new(&env);
    let observed = ProjectExecutor::new(&env).with_observer(Arc::new(PanickingObserver));

    let project = java("fun main() {\n    val x: Int = \"no\"\n}");
    assert_eq!(observed.run(&project), plain.run(&project));
    assert_eq!(
        observed.translate_swift(&hello(ProjectType::SwiftExport)),
        plain.translate_swift(&hello(ProjectType::SwiftExport))
    );
}
