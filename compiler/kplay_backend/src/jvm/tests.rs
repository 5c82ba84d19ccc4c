use kplay_analysis::{acquire, Environment, Project, ProjectType};
use pretty_assertions::assert_eq;

use super::*;

fn compile(project: &Project, require_main: bool) -> PipelineResult<JvmClasses> {
    let env = Environment::bundled();
    let ctx = acquire(&env, project, ProjectType::Java).unwrap();
    JvmPipeline::new(require_main).compile(&ctx).unwrap()
}

fn single(source: &str) -> Project {
    Project::single(ProjectType::Java, "Main.kt", source)
}

fn contains(bytes: &[u8], text: &str) -> bool {
    bytes
        .windows(text.len())
        .any(|window| window == text.as_bytes())
}

#[test]
fn empty_main_runs_cleanly() {
    let result = compile(&single("fun main() {}"), true);
    assert!(result.is_success());
    assert!(result.diagnostics().is_empty());
    let classes = result.artifacts().unwrap();
    assert_eq!(classes.main_class.as_deref(), Some("MainKt"));
    let facade = classes.class("MainKt").unwrap();
    assert_eq!(facade.path(), "MainKt.class");
    assert_eq!(&facade.bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    assert!(contains(&facade.bytes, "([Ljava/lang/String;)V"));
    assert!(contains(&facade.bytes, "Main.kt"));
}

#[test]
fn missing_main_fails_only_when_required() {
    let project = single("fun helper(): Int = 1");
    let run = compile(&project, true);
    assert_eq!(run.reason(), Some(NO_MAIN));
    assert_eq!(run.diagnostics().entries(PROJECT_KEY).len(), 1);

    let compiled = compile(&project, false);
    assert!(compiled.is_success());
    assert_eq!(compiled.artifacts().unwrap().main_class, None);
}

#[test]
fn analysis_errors_stop_generation() {
    let result = compile(&single("fun main() {\n    val x: Int = \"text\"\n}"), true);
    assert_eq!(result.reason(), Some(COMPILATION_FAILED));
    assert!(result.diagnostics().has_errors());
    assert!(result.artifacts().is_none());
}

#[test]
fn packages_shape_class_names() {
    let project = Project::single(
        ProjectType::Java,
        "Main.kt",
        "package foo.bar\n\nclass Point(val x: Int, val label: String?)\nfun main() {}",
    );
    let result = compile(&project, true);
    let classes = result.artifacts().unwrap();
    let names: Vec<&str> = classes.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["foo/bar/MainKt", "foo/bar/Point"]);
    assert_eq!(classes.main_class.as_deref(), Some("foo.bar.MainKt"));

    let point = classes.class("foo/bar/Point").unwrap();
    assert!(contains(&point.bytes, "label"));
    assert!(contains(&point.bytes, "Ljava/lang/String;"));
}

#[test]
fn descriptors_follow_types() {
    let source = "class Box(val size: Long)\nfun scale(b: Box, factor: Double?, flag: Boolean): Box = b\nfun count() = 3\nfun main() {}";
    let result = compile(&single(source), true);
    let facade = result.artifacts().unwrap().class("MainKt").unwrap().clone();
    assert!(contains(&facade.bytes, "(LBox;Ljava/lang/Double;Z)LBox;"));
    assert!(contains(&facade.bytes, "()I"));
}

#[test]
fn files_without_top_level_code_have_no_facade() {
    let project = single("fun main() {}").with_file("Shapes.kt", "interface Shape {\n    fun area(): Double\n}\nobject Origin");
    let result = compile(&project, true);
    let names: Vec<String> = result
        .artifacts()
        .unwrap()
        .classes
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(names, ["MainKt", "Shape", "Origin"]);
}
