//! Browser script generation.
//!
//! Both strategies wrap their output in the same module function and share
//! a small runtime prelude; they differ in what they print from:
//!
//! - [`JsStrategy::Direct`] prints straight from the declaration trees
//! - [`JsStrategy::Ir`] prints the lowered module from [`crate::lower`]
//!
//! Output is a pure function of the sources, so identical requests produce
//! byte-identical scripts.

mod direct;
mod ir;

use kplay_analysis::{AnalysisContext, ProjectIndex};

use crate::artifact::JsCode;
use crate::lower::lower;
use crate::pipeline::{
    diagnose_typed, JsStrategy, Pipeline, PipelineError, PipelineFamily, PipelineResult,
    COMPILATION_FAILED,
};
use crate::writer::CodeWriter;

#[derive(Copy, Clone, Debug)]
pub struct JsPipeline {
    strategy: JsStrategy,
}

impl JsPipeline {
    pub fn new(strategy: JsStrategy) -> Self {
        JsPipeline { strategy }
    }
}

impl Pipeline for JsPipeline {
    type Artifact = JsCode;

    fn family(&self) -> PipelineFamily {
        PipelineFamily::Js {
            strategy: self.strategy,
        }
    }

    fn compile(&self, ctx: &AnalysisContext) -> Result<PipelineResult<JsCode>, PipelineError> {
        let (report, inferred) = diagnose_typed(ctx);
        if report.has_errors() {
            return Ok(PipelineResult::failure(report, COMPILATION_FAILED));
        }

        let mut w = JsWriter::new(INDENT);
        w.line("(function (_) {");
        w.indent();
        w.line("'use strict';");
        for line in PRELUDE {
            w.line(line);
        }
        let entry = match self.strategy {
            JsStrategy::Direct => {
                let index = ProjectIndex::new(ctx);
                direct::print(ctx, &index, &inferred, &mut w)
            }
            JsStrategy::Ir => ir::print(&lower(ctx, &inferred), &mut w),
        };
        match entry {
            Entry::NoArgs => w.line("main();"),
            Entry::Args => w.line("main([]);"),
            Entry::None => {}
        }
        w.line("return _;");
        w.dedent();
        w.line("}(typeof playground === 'undefined' ? {} : playground));");

        let code = w.finish();
        tracing::debug!(strategy = ?self.strategy, bytes = code.len(), "generated js");
        Ok(PipelineResult::success(JsCode { code }, report))
    }
}

/// How the module calls into the program once declarations are set up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Entry {
    None,
    NoArgs,
    Args,
}

/// Runtime support for the library calls the printers pass through.
const PRELUDE: &[&str] = &[
    "var $buffer = '';",
    "function print(message) {",
    "  $buffer += String(message);",
    "}",
    "function println(message) {",
    "  console.log($buffer + (message === undefined ? '' : String(message)));",
    "  $buffer = '';",
    "}",
    "function listOf() {",
    "  return Array.prototype.slice.call(arguments);",
    "}",
    "function repeat(times, action) {",
    "  for (var i = 0; i < times; i++) action(i);",
    "}",
    "function error(message) {",
    "  throw new Error(String(message));",
    "}",
    "function TODO(reason) {",
    "  throw new Error('An operation is not implemented' + (reason === undefined ? '.' : ': ' + reason));",
    "}",
    "function $rangeTo(from, to) {",
    "  var range = [];",
    "  for (var i = from; i <= to; i++) range.push(i);",
    "  return range;",
    "}",
];

/// Script output, two spaces per level.
type JsWriter = CodeWriter;

const INDENT: &str = "  ";

const RESERVED: &[&str] = &[
    "arguments", "await", "case", "catch", "const", "debugger", "default", "delete", "enum",
    "eval", "export", "extends", "finally", "function", "implements", "import", "instanceof",
    "let", "new", "package", "private", "protected", "public", "static", "super", "switch",
    "throw", "try", "typeof", "var", "void", "with", "yield",
];

/// Kotlin identifier as a JS identifier.
fn ident(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{name}_0")
    } else {
        name.to_string()
    }
}

/// Single-quoted JS string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn comma_separated(items: impl IntoIterator<Item = String>) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
