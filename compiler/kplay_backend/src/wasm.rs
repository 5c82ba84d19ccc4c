//! WebAssembly generation.
//!
//! Every lowered top-level function becomes an exported wasm function.
//! Numeric code (integer arithmetic, comparisons, locals, loops and calls
//! between compiled functions) is translated; a function that needs
//! anything else gets an `unreachable` body, so the module always
//! validates and traps only when such a function actually runs.
//!
//! The module is checked with `wasmparser` before it is returned. Alongside
//! it comes a small ES module loader and, on request, a JSON source map
//! from function index to declaring file and line.

mod body;

use std::borrow::Cow;

use kplay_analysis::stdlib::COMPOSE_RUNTIME;
use kplay_analysis::AnalysisContext;
use rustc_hash::FxHashMap;
use serde::Serialize;
use wasm_encoder::{
    CodeSection, CustomSection, Encode, EntityType, ExportKind, ExportSection, FunctionSection,
    ImportSection, Module, TypeSection, ValType,
};

use crate::artifact::WasmOutput;
use crate::lower::{lower, LoweredFunction, LoweredModule, ValueKind};
use crate::pipeline::{
    diagnose_typed, Pipeline, PipelineError, PipelineFamily, PipelineResult, COMPILATION_FAILED,
};

pub const MODULE_FILE: &str = "playground.wasm";
pub const SOURCE_MAP_FILE: &str = "playground.wasm.map";

/// Host functions Compose modules import; none for plain wasm.
const COMPOSE_IMPORTS: &[&str] = &["recompose"];

#[derive(Copy, Clone, Debug)]
pub struct WasmPipeline {
    compose: bool,
    debug_info: bool,
}

impl WasmPipeline {
    pub fn new(compose: bool, debug_info: bool) -> Self {
        WasmPipeline {
            compose,
            debug_info,
        }
    }
}

impl Pipeline for WasmPipeline {
    type Artifact = WasmOutput;

    fn family(&self) -> PipelineFamily {
        if self.compose {
            PipelineFamily::ComposeWasm
        } else {
            PipelineFamily::Wasm
        }
    }

    fn compile(&self, ctx: &AnalysisContext) -> Result<PipelineResult<WasmOutput>, PipelineError> {
        let (report, inferred) = diagnose_typed(ctx);
        if report.has_errors() {
            return Ok(PipelineResult::failure(report, COMPILATION_FAILED));
        }

        let module = lower(ctx, &inferred);
        let emitted = self.emit(&module)?;
        let source_map = if self.debug_info {
            Some(source_map(&module, &emitted)?)
        } else {
            None
        };
        tracing::debug!(
            family = %self.family(),
            bytes = emitted.bytes.len(),
            compiled = emitted.compiled,
            functions = emitted.functions.len(),
            "generated wasm"
        );
        Ok(PipelineResult::success(
            WasmOutput {
                wasm: emitted.bytes,
                js_code: loader(self.compose, &emitted.exports, emitted.runnable_main),
                source_map,
            },
            report,
        ))
    }
}

/// A finished module plus what the loader and source map need.
struct Emitted {
    bytes: Vec<u8>,
    /// Export names in function order.
    exports: Vec<String>,
    /// `(wasm function index, lowered function index)`.
    functions: Vec<(u32, usize)>,
    /// Functions with a real body.
    compiled: usize,
    /// A parameterless `main` exists and does not trap.
    runnable_main: bool,
}

impl WasmPipeline {
    fn emit(&self, module: &LoweredModule) -> Result<Emitted, PipelineError> {
        let imports: &[&str] = if self.compose { COMPOSE_IMPORTS } else { &[] };
        let import_count = u32::try_from(imports.len()).unwrap_or(u32::MAX);

        let mut signatures = Signatures::default();
        let host_type = signatures.index(Vec::new(), Vec::new());

        // Overloads share a name; only the first is callable and exported.
        let mut callable: body::Callable<'_> = FxHashMap::default();
        let mut functions = Vec::with_capacity(module.functions.len());
        for (idx, function) in module.functions.iter().enumerate() {
            let wasm_idx = import_count + u32::try_from(idx).unwrap_or(u32::MAX);
            functions.push((wasm_idx, idx));
            callable.entry(function.name.as_str()).or_insert((wasm_idx, function));
        }

        let mut import_section = ImportSection::new();
        for name in imports {
            import_section.import("compose", name, EntityType::Function(host_type));
        }

        let mut function_section = FunctionSection::new();
        let mut code_section = CodeSection::new();
        let mut compiled = 0;
        let mut traps = Vec::with_capacity(module.functions.len());
        for function in &module.functions {
            let (params, results) = signature(function);
            function_section.function(signatures.index(params, results));
            let code = body::compile(function, &callable);
            traps.push(code.is_none());
            match code {
                Some(code) => {
                    compiled += 1;
                    code_section.function(&code);
                }
                None => {
                    code_section.function(&body::unreachable());
                }
            }
        }
        let runnable_main = module.has_main()
            && module.functions.iter().zip(&traps).any(|(f, trap)| {
                f.name == "main" && f.params.is_empty() && !trap
            });

        let mut exported: Vec<(&str, u32)> = callable
            .iter()
            .map(|(name, (idx, _))| (*name, *idx))
            .collect();
        exported.sort_by_key(|&(_, idx)| idx);
        let mut exports = Vec::with_capacity(exported.len());
        let mut export_section = ExportSection::new();
        for (name, idx) in exported {
            export_section.export(name, ExportKind::Func, idx);
            exports.push(name.to_string());
        }

        let mut wasm = Module::new();
        wasm.section(&signatures.section);
        if !imports.is_empty() {
            wasm.section(&import_section);
        }
        wasm.section(&function_section);
        wasm.section(&export_section);
        wasm.section(&code_section);
        if self.debug_info {
            let mut data = Vec::new();
            SOURCE_MAP_FILE.encode(&mut data);
            wasm.section(&CustomSection {
                name: Cow::Borrowed("sourceMappingURL"),
                data: Cow::Owned(data),
            });
        }
        let bytes = wasm.finish();

        wasmparser::validate(&bytes).map_err(|e| PipelineError::InvalidOutput {
            family: self.family(),
            message: e.to_string(),
        })?;

        Ok(Emitted {
            bytes,
            exports,
            functions,
            compiled,
            runnable_main,
        })
    }
}

/// Deduplicated function types.
#[derive(Default)]
struct Signatures {
    section: TypeSection,
    index: FxHashMap<(Vec<ValType>, Vec<ValType>), u32>,
}

impl Signatures {
    fn index(&mut self, params: Vec<ValType>, results: Vec<ValType>) -> u32 {
        let next = u32::try_from(self.index.len()).unwrap_or(u32::MAX);
        let section = &mut self.section;
        *self
            .index
            .entry((params, results))
            .or_insert_with_key(|(params, results)| {
                section
                    .ty()
                    .function(params.iter().copied(), results.iter().copied());
                next
            })
    }
}

pub(crate) fn val_type(kind: ValueKind) -> Option<ValType> {
    match kind {
        ValueKind::Unit => None,
        ValueKind::I64 => Some(ValType::I64),
        ValueKind::F32 => Some(ValType::F32),
        ValueKind::F64 => Some(ValType::F64),
        // References are passed as i32 handles.
        ValueKind::I32 | ValueKind::Ref => Some(ValType::I32),
    }
}

fn signature(function: &LoweredFunction) -> (Vec<ValType>, Vec<ValType>) {
    let params = function
        .params
        .iter()
        .filter_map(|p| val_type(p.kind))
        .collect();
    let results = val_type(function.result).into_iter().collect();
    (params, results)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'m> {
    version: u32,
    file: &'static str,
    sources: Vec<&'m str>,
    functions: Vec<MappedFunction<'m>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MappedFunction<'m> {
    index: u32,
    name: &'m str,
    source: usize,
    line: u32,
}

fn source_map(module: &LoweredModule, emitted: &Emitted) -> Result<String, PipelineError> {
    let mut sources: Vec<&str> = Vec::new();
    let mut functions = Vec::with_capacity(emitted.functions.len());
    for &(index, lowered) in &emitted.functions {
        let Some(function) = module.functions.get(lowered) else {
            continue;
        };
        let source = match sources.iter().position(|s| *s == function.file) {
            Some(pos) => pos,
            None => {
                sources.push(&function.file);
                sources.len() - 1
            }
        };
        functions.push(MappedFunction {
            index,
            name: &function.name,
            source,
            line: function.line,
        });
    }
    let map = SourceMap {
        version: 3,
        file: MODULE_FILE,
        sources,
        functions,
    };
    serde_json::to_string(&map).map_err(|e| PipelineError::Internal(e.to_string()))
}

/// ES module that instantiates the binary; `run` also calls a
/// parameterless `main`, unless its body was compiled to a trap.
fn loader(compose: bool, exports: &[String], call_main: bool) -> String {
    let mut js = String::new();
    if compose {
        js.push_str(&format!(
            "import * as composeRuntime from './{COMPOSE_RUNTIME}.mjs';\n\n"
        ));
    }
    let names: Vec<String> = exports.iter().map(|name| format!("'{name}'")).collect();
    js.push_str(&format!(
        "export const exportNames = [{}];\n\n",
        names.join(", ")
    ));
    js.push_str("export async function instantiate(wasm, imports = {}) {\n");
    if compose {
        js.push_str("  imports = { compose: composeRuntime, ...imports };\n");
    }
    js.push_str("  const { instance } = await WebAssembly.instantiate(wasm, imports);\n");
    js.push_str("  return instance.exports;\n");
    js.push_str("}\n\n");
    js.push_str("export async function run(wasm) {\n");
    js.push_str("  const exports = await instantiate(wasm);\n");
    if call_main {
        js.push_str("  exports.main();\n");
    }
    js.push_str("  return exports;\n");
    js.push_str("}\n");
    js
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
