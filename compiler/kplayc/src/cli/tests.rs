use std::fs;

use kplay_analysis::Environment;
use pretty_assertions::assert_eq;

use super::*;

fn args(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

fn options(line: &str) -> Options {
    match parse_args(&args(line)).unwrap() {
        Invocation::Execute(options) => options,
        other => panic!("expected an executable invocation, got {other:?}"),
    }
}

#[test]
fn no_arguments_prints_help() {
    assert_eq!(parse_args(&[]).unwrap(), Invocation::Help);
    assert_eq!(parse_args(&args("--help")).unwrap(), Invocation::Help);
    assert_eq!(parse_args(&args("version")).unwrap(), Invocation::Version);
}

#[test]
fn commands_and_options() {
    let parsed = options("wasm --target compose-wasm --debug-info --color never Main.kt Util.kt");
    assert_eq!(parsed.operation, Operation::TranslateWasm);
    assert_eq!(parsed.target, Some(ProjectType::ComposeWasm));
    assert!(parsed.debug_info);
    assert_eq!(parsed.color, ColorMode::Never);
    assert_eq!(
        parsed.source,
        ProjectSource::Files(vec![PathBuf::from("Main.kt"), PathBuf::from("Util.kt")])
    );

    let parsed = options("complete --line 3 --column 7 --project p.json");
    assert_eq!(parsed.operation, Operation::Complete);
    assert_eq!((parsed.line, parsed.column), (3, 7));
    assert_eq!(parsed.source, ProjectSource::Json(PathBuf::from("p.json")));
}

#[test]
fn unknown_target_tags_are_configuration_errors() {
    let err = parse_args(&args("js --target kotlin Main.kt")).unwrap_err();
    assert!(matches!(
        err,
        CliError::Configuration(ConfigurationError::UnknownTarget(ref tag)) if tag == "kotlin"
    ));
}

#[test]
fn usage_errors() {
    for line in [
        "transpile Main.kt",
        "run",
        "run --line x Main.kt",
        "run --bogus Main.kt",
        "run --project p.json Main.kt",
        "run --target",
        "batch",
    ] {
        assert!(
            matches!(parse_args(&args(line)), Err(CliError::Usage(_))),
            "{line}"
        );
    }
}

#[test]
fn files_become_a_project_named_by_file() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("Main.kt");
    fs::write(&main, "fun main() {}").unwrap();

    let mut parsed = options("swift --args -Xexplicit-api=strict Main.kt");
    parsed.source = ProjectSource::Files(vec![main]);
    let request = load_request(&parsed).unwrap();

    assert_eq!(request.operation, Operation::TranslateSwift);
    assert_eq!(
        request.project,
        Project::single(ProjectType::SwiftExport, "Main.kt", "fun main() {}")
            .with_args("-Xexplicit-api=strict")
    );
}

#[test]
fn json_projects_keep_their_target_unless_overridden() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.json");
    fs::write(
        &path,
        r#"{"files":[{"name":"A.kt","text":"fun a() = 1"}],"args":"","confType":"js-ir"}"#,
    )
    .unwrap();

    let mut parsed = options("js --project project.json");
    parsed.source = ProjectSource::Json(path.clone());
    assert_eq!(load_request(&parsed).unwrap().project.conf_type, ProjectType::JsIr);

    parsed.target = Some(ProjectType::Js);
    assert_eq!(load_request(&parsed).unwrap().project.conf_type, ProjectType::Js);
}

#[test]
fn missing_and_malformed_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut parsed = options("run --project missing.json");
    parsed.source = ProjectSource::Json(dir.path().join("missing.json"));
    assert!(matches!(load_request(&parsed), Err(CliError::Io { .. })));

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{").unwrap();
    assert!(matches!(read_batch(&bad), Err(CliError::Json { .. })));

    let unknown = dir.path().join("unknown.json");
    fs::write(
        &unknown,
        r#"[{"operation":"run","project":{"files":[],"confType":"kotlin"}}]"#,
    )
    .unwrap();
    assert!(matches!(read_batch(&unknown), Err(CliError::Json { .. })));
}

#[test]
fn batches_answer_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("requests.json");
    fs::write(
        &path,
        r#"[
            {"operation":"translate-js","project":{"files":[{"name":"Main.kt","text":"fun main() {}"}],"confType":"js"}},
            {"operation":"run","project":{"files":[{"name":"Main.kt","text":"fun main() {}"}],"confType":"js"}},
            {"operation":"highlight","project":{"files":[{"name":"Main.kt","text":"fun main() {}"}],"confType":"wasm"}}
        ]"#,
    )
    .unwrap();

    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let requests = read_batch(&path).unwrap();
    let responses = execute_batch(&executor, &WorkerPool::new(Some(2)), &requests);

    assert_eq!(responses.len(), 3);
    assert!(matches!(&responses[0], Response::Js(r) if r.is_success()));
    assert_eq!(
        responses[1],
        Response::Rejected {
            error: "target 'js' is not supported by run".into()
        }
    );
    assert!(matches!(&responses[2], Response::Highlight(r) if !r.has_errors()));
    assert_eq!(
        responses.iter().map(Response::is_ok).collect::<Vec<_>>(),
        vec![true, false, true]
    );
}

#[test]
fn responses_serialize_with_kind_and_result() {
    let rejected = Response::Rejected {
        error: "unknown target type 'x'".into(),
    };
    assert_eq!(
        serde_json::to_value(&rejected).unwrap(),
        serde_json::json!({"kind": "rejected", "result": {"error": "unknown target type 'x'"}})
    );

    let env = Environment::bundled();
    let executor = ProjectExecutor::new(&env);
    let version = serde_json::to_value(Response::Version(executor.version())).unwrap();
    assert_eq!(version["kind"], "version");
    assert_eq!(version["result"]["stdlibVersion"], "2.1.0");

    let request = Request {
        operation: Operation::TranslateJs,
        project: Project::single(ProjectType::Js, "Main.kt", "fun main() {}"),
        debug_info: false,
        line: 0,
        column: 0,
    };
    let json = serde_json::to_value(execute(&executor, &request)).unwrap();
    assert_eq!(json["kind"], "js");
    assert_eq!(json["result"]["status"], "success");
    assert!(json["result"]["artifacts"]["code"].is_string());
    assert_eq!(json["result"]["diagnostics"], serde_json::json!({"Main.kt": []}));
}
