use kplay_analysis::{Environment, ProjectType};
use kplay_diagnostic::{Severity, PROJECT_KEY};
use kplayc::ProjectExecutor;
use pretty_assertions::assert_eq;

use crate::common::{hello, recording, Fault, FaultyBackends, STUB_PANIC};

#[test]
fn panicking_backends_become_failures() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env).with_backends(FaultyBackends(Fault::Panic));
    let expected = format!("internal compiler error: {STUB_PANIC}");

    let reasons = [
        executor.run(&hello(ProjectType::Java)).unwrap().reason().map(str::to_string),
        executor
            .translate_js(&hello(ProjectType::Js))
            .unwrap()
            .reason()
            .map(str::to_string),
        executor
            .translate_wasm(&hello(ProjectType::ComposeWasm), true)
            .unwrap()
            .reason()
            .map(str::to_string),
        executor
            .translate_swift(&hello(ProjectType::SwiftExport))
            .unwrap()
            .reason()
            .map(str::to_string),
        executor
            .generate_compose_ir(&hello(ProjectType::ComposeWasm))
            .unwrap()
            .reason()
            .map(str::to_string),
    ];
    for reason in reasons {
        assert_eq!(reason.as_deref(), Some(expected.as_str()));
    }
}

#[test]
fn contained_failures_carry_a_project_level_error() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env).with_backends(FaultyBackends(Fault::Error));
    let result = executor.translate_js(&hello(ProjectType::JsIr)).unwrap();

    assert_eq!(result.reason(), Some("internal error: stub backend failed"));
    let entries = result.diagnostics().entries(PROJECT_KEY);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, Severity::Error);
    assert_eq!(entries[0].message, "internal error: stub backend failed");
    assert_eq!(entries[0].location, None);
}

#[test]
fn failures_are_still_observed() {
    let env = Environment::bundled();
    let (executor, observer) = recording(&env);
    let executor = executor.with_backends(FaultyBackends(Fault::Panic));
    let result = executor.run(&hello(ProjectType::Java)).unwrap();
    assert!(!result.is_success());

    let observations = observer.observations();
    assert_eq!(observations.len(), 1);
    let summary = &observations[0].summary;
    assert!(!summary.success);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.reason.as_deref(), result.reason());
}

#[test]
fn the_executor_survives_a_panic() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env).with_backends(FaultyBackends(Fault::Panic));
    for _ in 0..3 {
        assert!(executor.run(&hello(ProjectType::Java)).is_ok());
    }
}
