use kplay_analysis::stdlib::STDLIB_JVM;
use kplay_analysis::{Environment, Project, ProjectType};
use kplayc::{ProjectExecutor, WorkerPool, VERSION};
use pretty_assertions::assert_eq;

use crate::common::{hello, java, project, Fault, FaultyBackends};

fn labels(executor: &ProjectExecutor<'_>, project: &Project, line: u32, column: u32) -> Vec<String> {
    executor
        .complete(project, line, column)
        .into_iter()
        .map(|c| c.label)
        .collect()
}

#[test]
fn highlight_reports_every_file() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let project = Project::new(ProjectType::Js)
        .with_file("Main.kt", "fun main() {\n    helper()\n}")
        .with_file("Clean.kt", "fun ok() = 1");
    let report = executor.highlight(&project);

    assert_eq!(report.files().collect::<Vec<_>>(), ["Main.kt", "Clean.kt"]);
    assert_eq!(report.error_count(), 1);
    assert!(report.entries("Clean.kt").is_empty());
    let location = report.entries("Main.kt")[0].location.as_ref().unwrap();
    assert_eq!((location.line, location.column), (2, 5));
}

#[test]
fn highlight_collapses_errors_to_an_empty_report() {
    let env = Environment::with_libraries([STDLIB_JVM]);
    let executor = ProjectExecutor::new(&env);

    let duplicate = java("fun main() {}").with_file("Main.kt", "");
    assert_eq!(executor.highlight(&duplicate).files().count(), 0);
    assert_eq!(executor.highlight(&hello(ProjectType::Wasm)).files().count(), 0);

    let panicking = ProjectExecutor::new(&env).with_backends(FaultyBackends(Fault::Panic));
    assert_eq!(panicking.highlight(&hello(ProjectType::Java)).files().count(), 0);
}

#[test]
fn completion_uses_the_first_file() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let project = Project::new(ProjectType::Java)
        .with_file("Main.kt", "fun greet() {}\nfun main() {\n    gre\n}")
        .with_file("Other.kt", "fun greetAll() {}");
    assert_eq!(labels(&executor, &project, 2, 7), ["greet", "greetAll"]);
}

#[test]
fn swift_export_completes_as_compose() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let source = "fun main() {\n    Tex\n}";
    let swift = labels(&executor, &project(ProjectType::SwiftExport, source), 1, 7);
    let compose = labels(&executor, &project(ProjectType::ComposeWasm, source), 1, 7);
    assert!(swift.contains(&"Text".to_string()));
    assert_eq!(swift, compose);
}

#[test]
fn completion_collapses_errors_to_nothing() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    assert!(executor.complete(&Project::new(ProjectType::Java), 0, 0).is_empty());
    assert!(executor.complete(&java("fun main() {}"), 40, 0).is_empty());

    let duplicate = java("val abc = 1\nval x = ab").with_file("Main.kt", "");
    assert!(executor.complete(&duplicate, 1, 10).is_empty());

    let missing = Environment::with_libraries([STDLIB_JVM]);
    let executor = ProjectExecutor::new(&missing);
    assert!(executor
        .complete(&project(ProjectType::Js, "val x = li"), 0, 10)
        .is_empty());
}

#[test]
fn version_reports_both_versions() {
    let env = Environment::bundled();
    let info = ProjectExecutor::new(&env).version();
    assert_eq!(info.version, VERSION);
    assert_eq!(info.stdlib_version, env.stdlib_version());
}

#[test]
fn concurrent_requests_match_sequential_ones() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let projects: Vec<Project> = (0..24)
        .map(|i| {
            let target = if i % 2 == 0 { ProjectType::Js } else { ProjectType::JsIr };
            project(target, &format!("fun value() = {i}\nfun main() {{\n    println(value())\n}}"))
        })
        .collect();

    let sequential: Vec<_> = projects
        .iter()
        .map(|p| executor.translate_js(p).unwrap())
        .collect();
    let parallel = WorkerPool::new(Some(4)).run(&projects, |p| executor.translate_js(p).unwrap());
    assert_eq!(parallel, sequential);
}

#[test]
fn highlight_columns_count_characters() {
    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let report = executor.highlight(&java("fun main() {\n    val s = \"é😀\"; helper()\n}"));
    let location = report.entries("Main.kt")[0].location.as_ref().unwrap();
    assert_eq!((location.line, location.column), (2, 20));
}
