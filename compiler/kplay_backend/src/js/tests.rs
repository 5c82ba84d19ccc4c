use kplay_analysis::{acquire, Environment, Project, ProjectType};
use pretty_assertions::assert_eq;

use super::*;

fn translate(strategy: JsStrategy, source: &str) -> PipelineResult<JsCode> {
    let env = Environment::bundled();
    let target = match strategy {
        JsStrategy::Direct => ProjectType::Js,
        JsStrategy::Ir => ProjectType::JsIr,
    };
    let project = Project::single(target, "Main.kt", source);
    let ctx = acquire(&env, &project, target).unwrap();
    JsPipeline::new(strategy).compile(&ctx).unwrap()
}

fn code(strategy: JsStrategy, source: &str) -> String {
    let result = translate(strategy, source);
    assert!(result.is_success(), "{:?}", result.diagnostics());
    result.artifacts().unwrap().code.clone()
}

#[test]
fn module_wrapper_and_entry_call() {
    for strategy in [JsStrategy::Direct, JsStrategy::Ir] {
        let code = code(strategy, "fun main() {}");
        assert!(code.starts_with("(function (_) {\n  'use strict';\n"));
        assert!(code.ends_with(
            "  main();\n  return _;\n}(typeof playground === 'undefined' ? {} : playground));\n"
        ));
        assert!(code.contains("  function main() {\n  }\n  _.main = main;\n"));
        assert!(code.contains("  function println(message) {\n"));
    }
}

#[test]
fn libraries_without_main_are_not_invoked() {
    let code = code(JsStrategy::Direct, "fun helper(): Int = 1");
    assert!(code.contains("  function helper() {\n    return 1;\n  }\n"));
    assert!(!code.contains("main("));
}

#[test]
fn output_is_deterministic() {
    let source = "class A(val x: Int)\nfun main() {\n    val a = A(1)\n    println(a.x)\n}";
    for strategy in [JsStrategy::Direct, JsStrategy::Ir] {
        assert_eq!(code(strategy, source), code(strategy, source));
    }
}

#[test]
fn analysis_errors_fail() {
    let result = translate(JsStrategy::Ir, "fun main() {\n    undefinedCall()\n}");
    assert_eq!(result.reason(), Some(COMPILATION_FAILED));
    assert!(result.diagnostics().has_errors());
}

#[test]
fn templates_per_strategy() {
    let source = "fun greet(name: String) = \"Hello, $name!\"";
    assert!(code(JsStrategy::Direct, source).contains("return `Hello, ${name}!`;"));
    assert!(code(JsStrategy::Ir, source).contains("return '' + 'Hello, ' + name + '!';"));
}

#[test]
fn template_expressions_per_strategy() {
    let source = "fun label(count: Int) = \"next: ${count + 1}, half: ${count / 2}\"";
    assert!(code(JsStrategy::Direct, source)
        .contains("return `next: ${count + 1}, half: ${(count / 2 | 0)}`;"));
    assert!(code(JsStrategy::Ir, source)
        .contains("return '' + 'next: ' + (count + 1) + ', half: ' + (count / 2 | 0);"));
}

#[test]
fn range_loops_per_strategy() {
    let source = "fun main() {\n    for (i in 1..3) {\n        println(i)\n    }\n}";
    let direct = code(JsStrategy::Direct, source);
    assert!(direct.contains("for (let i = 1, i$last = 3; i <= i$last; i++) {\n      println(i);\n    }"));

    let ir = code(JsStrategy::Ir, source);
    assert!(ir.contains("var i = 1;"));
    assert!(ir.contains("while (i <= i$last) {\n        println(i);\n        i = i + 1;\n      }"));
}

#[test]
fn classes_and_objects() {
    let source = "class Point(val x: Int, val y: Int) {\n    fun sum(): Int = x + y\n}\nobject Config {\n    val debug = true\n}\nfun main() {\n    println(Point(1, 2).sum())\n}";
    for strategy in [JsStrategy::Direct, JsStrategy::Ir] {
        let code = code(strategy, source);
        assert!(code.contains("  function Point(x, y) {\n    this.x = x;\n    this.y = y;\n  }\n"));
        assert!(code.contains(
            "  Point.prototype.sum = function () {\n    return this.x + this.y;\n  };\n"
        ));
        assert!(code.contains("  function Config$Object() {\n    this.debug = true;\n  }\n"));
        assert!(code.contains("  var Config = new Config$Object();\n"));
        assert!(code.contains("println(new Point(1, 2).sum());"));
    }
}

#[test]
fn if_expressions_become_conditionals() {
    let source = "fun pick(flag: Boolean): Int = if (flag) { 1 } else { 2 }";
    for strategy in [JsStrategy::Direct, JsStrategy::Ir] {
        assert!(code(strategy, source).contains("return flag ? 1 : 2;"));
    }
}

#[test]
fn identifiers_and_strings_are_escaped() {
    assert_eq!(ident("delete"), "delete_0");
    assert_eq!(ident("count"), "count");
    assert_eq!(quote("it's\n"), "'it\\'s\\n'");
}

#[test]
fn integer_division_truncates() {
    let source = "fun half(n: Int): Int = n / 2\nfun scaled(a: Int, b: Int): Int = a / b * 2\nfun ratio(x: Double): Double = x / 2\nfun wide(a: Long, b: Int): Long = a / b";
    for strategy in [JsStrategy::Direct, JsStrategy::Ir] {
        let code = code(strategy, source);
        assert!(code.contains("    return (n / 2 | 0);\n"), "{code}");
        assert!(code.contains("    return (a / b | 0) * 2;\n"), "{code}");
        assert!(code.contains("    return x / 2;\n"), "{code}");
        assert!(code.contains("    return Math.trunc(a / b);\n"), "{code}");
    }
}
