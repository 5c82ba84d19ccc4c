use pretty_assertions::assert_eq;

use super::*;
use crate::context::acquire;
use crate::environment::Environment;
use crate::project::Project;

fn complete_at(
    target: ProjectType,
    source: &str,
    line: u32,
    column: u32,
) -> Result<Vec<CompletionCandidate>, CompletionError> {
    let env = Environment::bundled();
    let project = Project::single(target, "Main.kt", source);
    let ctx = acquire(&env, &project, target).unwrap();
    complete(&ctx, "Main.kt", line, column, target)
}

fn labels(candidates: &[CompletionCandidate]) -> Vec<&str> {
    candidates.iter().map(|c| c.label.as_str()).collect()
}

#[test]
fn locals_come_first() {
    let source = "fun main() {\n    val message = \"hi\"\n    mes\n}";
    let candidates = complete_at(ProjectType::Java, source, 2, 7).unwrap();
    assert_eq!(labels(&candidates), ["message"]);
    assert_eq!(candidates[0].kind, CompletionKind::Variable);
    assert_eq!(candidates[0].rank, 0);
}

#[test]
fn exact_case_matches_rank_above_others() {
    let candidates = complete_at(ProjectType::Java, "val x = li", 0, 10).unwrap();
    assert_eq!(labels(&candidates), ["listOf", "List"]);
    assert_eq!(candidates[0].insert_text, "listOf(");
    assert_eq!(candidates[1].rank, 1);
}

#[test]
fn only_locals_declared_before_the_cursor() {
    let source = "fun main() {\n    val early = 1\n    e\n    val late = 2\n}";
    let candidates = complete_at(ProjectType::Java, source, 2, 4).unwrap();
    let names = labels(&candidates);
    assert_eq!(names[0], "early");
    assert!(names.contains(&"main"));
    assert!(names.contains(&"fun"));
    assert!(!names.contains(&"late"));
}

#[test]
fn project_functions_show_signatures() {
    let source = "fun greet(name: String): String = name\nfun ping() {}\nfun main() {\n    g\n}";
    let candidates = complete_at(ProjectType::Java, source, 3, 5).unwrap();
    let greet = candidates.iter().find(|c| c.label == "greet").unwrap();
    assert_eq!(greet.kind, CompletionKind::Function);
    assert_eq!(greet.insert_text, "greet(");
    assert_eq!(greet.tail, "(name: String): String");

    let all = complete_at(ProjectType::Java, source, 3, 4).unwrap();
    let ping = all.iter().find(|c| c.label == "ping").unwrap();
    assert_eq!(ping.insert_text, "ping()");
    assert_eq!(ping.tail, "(): Unit");
}

#[test]
fn members_after_a_dot() {
    let source = "class Point(val x: Int, val y: Int) {\n    fun norm(): Int = x\n}\nfun main() {\n    val p = Point(1, 2)\n    p.n\n}";
    let candidates = complete_at(ProjectType::Java, source, 5, 7).unwrap();
    assert_eq!(labels(&candidates), ["norm"]);
    assert_eq!(candidates[0].insert_text, "norm()");
    assert_eq!(candidates[0].tail, "(): Int");
}

#[test]
fn object_members() {
    let source = "object Config {\n    val debug = true\n}\nfun main() {\n    Config.d\n}";
    let candidates = complete_at(ProjectType::Java, source, 4, 12).unwrap();
    assert_eq!(labels(&candidates), ["debug"]);
    assert_eq!(candidates[0].kind, CompletionKind::Property);
}

#[test]
fn annotations_after_at() {
    let source = "@Comp\nfun App() {}";
    let candidates = complete_at(ProjectType::ComposeWasm, source, 0, 5).unwrap();
    assert_eq!(labels(&candidates), ["Composable"]);

    let jvm = complete_at(ProjectType::Java, source, 0, 5).unwrap();
    assert!(jvm.is_empty());
}

#[test]
fn library_symbols_follow_the_target() {
    let js = complete_at(ProjectType::Js, "val c = cons", 0, 12).unwrap();
    assert_eq!(labels(&js), ["console", "Console"]);
    assert_eq!(js[1].kind, CompletionKind::Class);
    let jvm = complete_at(ProjectType::Java, "val c = cons", 0, 12).unwrap();
    assert!(jvm.is_empty());
}

#[test]
fn bad_positions_are_errors() {
    let source = "fun main() {}";
    assert_eq!(
        complete_at(ProjectType::Java, source, 3, 0).unwrap_err(),
        CompletionError::OutOfRange {
            file: "Main.kt".to_string(),
            line: 3,
            column: 0,
        }
    );
    assert!(complete_at(ProjectType::Java, source, 0, 14).is_err());
    assert!(complete_at(ProjectType::Java, source, 0, 13).is_ok());

    let env = Environment::bundled();
    let project = Project::single(ProjectType::Java, "Main.kt", source);
    let ctx = acquire(&env, &project, ProjectType::Java).unwrap();
    assert_eq!(
        complete(&ctx, "Other.kt", 0, 0, ProjectType::Java).unwrap_err(),
        CompletionError::UnknownFile("Other.kt".to_string())
    );
}

#[test]
fn candidates_serialize_in_camel_case() {
    let candidates = complete_at(ProjectType::Java, "val x = listO", 0, 13).unwrap();
    let json = serde_json::to_value(&candidates[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "label": "listOf",
            "kind": "function",
            "insertText": "listOf(",
            "tail": "List",
            "rank": 0,
        })
    );
}

#[test]
fn cursor_columns_count_characters() {
    let source = "fun main() {\n    val greeting = \"héllo wörld\"; gre\n}";
    let candidates = complete_at(ProjectType::Java, source, 1, 37).unwrap();
    assert_eq!(labels(&candidates), ["greeting"]);
    assert!(complete_at(ProjectType::Java, source, 1, 38).is_err());
}
