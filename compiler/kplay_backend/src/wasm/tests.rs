use kplay_analysis::{acquire, Environment, Project, ProjectType};
use pretty_assertions::assert_eq;
use wasmparser::{Operator, Parser, Payload};

use super::*;

fn translate(source: &str, compose: bool, debug_info: bool) -> PipelineResult<WasmOutput> {
    let env = Environment::bundled();
    let target = if compose {
        ProjectType::ComposeWasm
    } else {
        ProjectType::Wasm
    };
    let project = Project::single(target, "Main.kt", source);
    let ctx = acquire(&env, &project, target).unwrap();
    WasmPipeline::new(compose, debug_info).compile(&ctx).unwrap()
}

fn output(source: &str, compose: bool, debug_info: bool) -> WasmOutput {
    let result = translate(source, compose, debug_info);
    assert!(result.is_success(), "{:?}", result.diagnostics());
    result.artifacts().unwrap().clone()
}

fn exports(bytes: &[u8]) -> Vec<(String, u32)> {
    let mut out = Vec::new();
    for payload in Parser::new(0).parse_all(bytes) {
        if let Payload::ExportSection(reader) = payload.unwrap() {
            for export in reader {
                let export = export.unwrap();
                out.push((export.name.to_string(), export.index));
            }
        }
    }
    out
}

/// For each defined function, whether its body is a bare trap.
fn traps(bytes: &[u8]) -> Vec<bool> {
    let mut out = Vec::new();
    for payload in Parser::new(0).parse_all(bytes) {
        if let Payload::CodeSectionEntry(body) = payload.unwrap() {
            let mut ops = body.get_operators_reader().unwrap();
            out.push(matches!(ops.read().unwrap(), Operator::Unreachable));
        }
    }
    out
}

fn custom_sections(bytes: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    for payload in Parser::new(0).parse_all(bytes) {
        if let Payload::CustomSection(reader) = payload.unwrap() {
            out.push(reader.name().to_string());
        }
    }
    out
}

#[test]
fn functions_are_exported_in_order() {
    let out = output("fun add(a: Int, b: Int): Int = a + b\nfun main() {}", false, false);
    assert_eq!(&out.wasm[..4], b"\0asm");
    assert_eq!(
        exports(&out.wasm),
        [("add".to_string(), 0), ("main".to_string(), 1)]
    );
    assert_eq!(traps(&out.wasm), [false, false]);
    assert!(out.js_code.contains("export const exportNames = ['add', 'main'];"));
    assert!(out.js_code.contains("  const exports = await instantiate(wasm);\n  exports.main();\n"));
    assert_eq!(out.source_map, None);
    assert!(custom_sections(&out.wasm).is_empty());
}

#[test]
fn non_numeric_bodies_trap() {
    let source = "fun greet(): String = \"hi\"\nfun twice(x: Int) = x * 2\nfun shout() {\n    println(\"hey\")\n}";
    let out = output(source, false, false);
    assert_eq!(traps(&out.wasm), [true, false, true]);
    assert!(!out.js_code.contains("main"));
}

#[test]
fn trapping_main_is_exported_but_not_run() {
    let out = output("fun main() {\n    println(\"Hello\")\n}", false, false);
    assert_eq!(exports(&out.wasm), [("main".to_string(), 0)]);
    assert_eq!(traps(&out.wasm), [true]);
    assert!(out.js_code.contains("export const exportNames = ['main'];"));
    assert!(!out.js_code.contains("exports.main()"));
}

#[test]
fn loops_locals_and_widening_compile() {
    let source = "fun sum(n: Int): Int {\n    var total = 0\n    for (i in 1..n) {\n        total += i\n    }\n    return total\n}\nfun big(x: Int): Long = x + 1L\nfun pick(flag: Boolean): Int = if (flag && sum(2) > 1) { 1 } else { -1 }";
    let out = output(source, false, false);
    assert_eq!(traps(&out.wasm), [false, false, false]);
}

#[test]
fn debug_info_adds_a_source_map() {
    let out = output("fun main() {}\n\nfun helper(): Int = 2", false, true);
    assert_eq!(custom_sections(&out.wasm), ["sourceMappingURL"]);
    let map: serde_json::Value = serde_json::from_str(out.source_map.as_deref().unwrap()).unwrap();
    assert_eq!(
        map,
        serde_json::json!({
            "version": 3,
            "file": "playground.wasm",
            "sources": ["Main.kt"],
            "functions": [
                {"index": 0, "name": "main", "source": 0, "line": 1},
                {"index": 1, "name": "helper", "source": 0, "line": 3},
            ],
        })
    );
}

#[test]
fn compose_modules_import_the_runtime() {
    let out = output("fun main() {}", true, false);
    assert_eq!(exports(&out.wasm), [("main".to_string(), 1)]);
    assert!(out
        .js_code
        .starts_with("import * as composeRuntime from './compose-runtime-wasm-js.mjs';"));
    assert!(out.js_code.contains("imports = { compose: composeRuntime, ...imports };"));
}

#[test]
fn analysis_errors_fail() {
    let result = translate("fun main() {\n    val x: Int = true\n}", false, false);
    assert_eq!(result.reason(), Some(COMPILATION_FAILED));
    assert!(result.artifacts().is_none());
}

#[test]
fn overloads_export_once() {
    let out = output("fun f(x: Int): Int = x\nfun f(x: Long): Long = x", false, false);
    assert_eq!(exports(&out.wasm), [("f".to_string(), 0)]);
    assert_eq!(traps(&out.wasm).len(), 2);
}
