//! Command-line transport: argument parsing, request loading and JSON
//! responses.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use kplay_analysis::{CompletionCandidate, ConfigurationError, Project, ProjectType};
use kplay_backend::{ComposeIr, JsCode, JvmClasses, PipelineResult, SwiftCode, WasmOutput};
use kplay_diagnostic::emitter::{ColorMode, DiagnosticEmitter, TerminalEmitter};
use kplay_diagnostic::DiagnosticsReport;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::Operation;
use crate::executor::{ProjectExecutor, VersionInfo};
use crate::pool::WorkerPool;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize response: {0}")]
    Output(#[source] serde_json::Error),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// One executor call, as read from a batch file or built from arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub operation: Operation,
    pub project: Project,
    #[serde(default)]
    pub debug_info: bool,
    /// 0-based cursor line, for completion.
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
}

/// What the `kplay` binary prints on stdout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "camelCase")]
pub enum Response {
    Jvm(PipelineResult<JvmClasses>),
    Js(PipelineResult<JsCode>),
    Wasm(PipelineResult<WasmOutput>),
    Swift(PipelineResult<SwiftCode>),
    ComposeIr(PipelineResult<ComposeIr>),
    Highlight(DiagnosticsReport),
    Completions(Vec<CompletionCandidate>),
    Version(VersionInfo),
    /// The request never reached a pipeline.
    Rejected { error: String },
}

impl Response {
    pub fn diagnostics(&self) -> Option<&DiagnosticsReport> {
        match self {
            Response::Jvm(r) => Some(r.diagnostics()),
            Response::Js(r) => Some(r.diagnostics()),
            Response::Wasm(r) => Some(r.diagnostics()),
            Response::Swift(r) => Some(r.diagnostics()),
            Response::ComposeIr(r) => Some(r.diagnostics()),
            Response::Highlight(report) => Some(report),
            Response::Completions(_) | Response::Version(_) | Response::Rejected { .. } => None,
        }
    }

    /// `false` for rejected requests and failed pipelines.
    pub fn is_ok(&self) -> bool {
        match self {
            Response::Jvm(r) => r.is_success(),
            Response::Js(r) => r.is_success(),
            Response::Wasm(r) => r.is_success(),
            Response::Swift(r) => r.is_success(),
            Response::ComposeIr(r) => r.is_success(),
            Response::Rejected { .. } => false,
            Response::Highlight(_) | Response::Completions(_) | Response::Version(_) => true,
        }
    }

    fn rejected(err: &ConfigurationError) -> Self {
        Response::Rejected {
            error: err.to_string(),
        }
    }
}

/// Where the project comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectSource {
    /// Source files; each file's name is its final path component.
    Files(Vec<PathBuf>),
    /// A JSON-serialized [`Project`].
    Json(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub operation: Operation,
    /// Overrides the project's own target.
    pub target: Option<ProjectType>,
    pub args: Option<String>,
    pub line: u32,
    pub column: u32,
    pub debug_info: bool,
    pub color: ColorMode,
    pub source: ProjectSource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Execute(Options),
    Batch { path: PathBuf, color: ColorMode },
    Version,
    Help,
}

pub fn usage() -> &'static str {
    "Usage: kplay <command> [options] (<file.kt>... | --project <project.json>)

Commands:
  run           Compile for the JVM, requiring fun main()
  compile       Compile for the JVM
  js            Translate to JavaScript (targets js, js-ir)
  wasm          Translate to WebAssembly (targets wasm, compose-wasm)
  swift         Export Swift declarations
  compose-ir    Dump the Compose IR (target compose-wasm)
  highlight     Diagnostics only
  complete      Completion candidates at --line/--column in the first file
  batch <file>  Execute a JSON array of requests on the worker pool
  version       Print version information

Options:
  --target <tag>     java, js, js-ir, wasm, compose-wasm, swift-export
  --args <args>      Compiler arguments
  --line <n>         0-based cursor line
  --column <n>       0-based cursor column
  --debug-info       Emit a source map (wasm)
  --color <mode>     auto, always, never
  --project <file>   Read the project from JSON
"
}

/// Parse arguments, program name excluded.
pub fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let Some((command, rest)) = args.split_first() else {
        return Ok(Invocation::Help);
    };

    let operation = match command.as_str() {
        "help" | "--help" | "-h" => return Ok(Invocation::Help),
        "version" | "--version" | "-V" => return Ok(Invocation::Version),
        "batch" => return parse_batch(rest),
        "run" => Operation::Run,
        "compile" => Operation::CompileToJvm,
        "js" => Operation::TranslateJs,
        "wasm" => Operation::TranslateWasm,
        "swift" => Operation::TranslateSwift,
        "compose-ir" => Operation::GenerateComposeIr,
        "highlight" => Operation::Highlight,
        "complete" => Operation::Complete,
        other => return Err(CliError::Usage(format!("unknown command '{other}'"))),
    };

    let mut options = Options {
        operation,
        target: None,
        args: None,
        line: 0,
        column: 0,
        debug_info: false,
        color: ColorMode::Auto,
        source: ProjectSource::Files(Vec::new()),
    };
    let mut files = Vec::new();
    let mut project_json = None;

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--target" => options.target = Some(value(&mut iter, arg)?.parse()?),
            "--args" => options.args = Some(value(&mut iter, arg)?.to_string()),
            "--line" => options.line = number(&mut iter, arg)?,
            "--column" => options.column = number(&mut iter, arg)?,
            "--debug-info" => options.debug_info = true,
            "--color" => options.color = color_mode(value(&mut iter, arg)?)?,
            "--project" => project_json = Some(PathBuf::from(value(&mut iter, arg)?)),
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option '{flag}'")));
            }
            file => files.push(PathBuf::from(file)),
        }
    }

    options.source = match (project_json, files.is_empty()) {
        (Some(path), true) => ProjectSource::Json(path),
        (None, false) => ProjectSource::Files(files),
        (Some(_), false) => {
            return Err(CliError::Usage(
                "--project cannot be combined with source files".into(),
            ))
        }
        (None, true) => return Err(CliError::Usage("missing source files".into())),
    };
    Ok(Invocation::Execute(options))
}

fn parse_batch(rest: &[String]) -> Result<Invocation, CliError> {
    let mut path = None;
    let mut color = ColorMode::Auto;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--color" => color = color_mode(value(&mut iter, arg)?)?,
            flag if flag.starts_with("--") => {
                return Err(CliError::Usage(format!("unknown option '{flag}'")));
            }
            file if path.is_none() => path = Some(PathBuf::from(file)),
            extra => return Err(CliError::Usage(format!("unexpected argument '{extra}'"))),
        }
    }
    let path = path.ok_or_else(|| CliError::Usage("missing requests file".into()))?;
    Ok(Invocation::Batch { path, color })
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<&'a str, CliError> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("{flag} expects a value")))
}

fn number<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<u32, CliError> {
    let raw = value(iter, flag)?;
    raw.parse()
        .map_err(|_| CliError::Usage(format!("{flag} expects a number, got '{raw}'")))
}

fn color_mode(raw: &str) -> Result<ColorMode, CliError> {
    match raw {
        "auto" => Ok(ColorMode::Auto),
        "always" => Ok(ColorMode::Always),
        "never" => Ok(ColorMode::Never),
        other => Err(CliError::Usage(format!("unknown color mode '{other}'"))),
    }
}

/// Target used for plain source files when `--target` is absent.
fn default_target(operation: Operation) -> ProjectType {
    match operation {
        Operation::TranslateJs => ProjectType::Js,
        Operation::TranslateWasm => ProjectType::Wasm,
        Operation::TranslateSwift => ProjectType::SwiftExport,
        Operation::GenerateComposeIr => ProjectType::ComposeWasm,
        Operation::Run
        | Operation::CompileToJvm
        | Operation::Highlight
        | Operation::Complete => ProjectType::Java,
    }
}

/// Read the project the options point at.
pub fn load_request(options: &Options) -> Result<Request, CliError> {
    let mut project = match &options.source {
        ProjectSource::Json(path) => read_json::<Project>(path)?,
        ProjectSource::Files(paths) => {
            let mut project = Project::new(default_target(options.operation));
            for path in paths {
                let text = fs::read_to_string(path).map_err(|source| CliError::Io {
                    path: path.clone(),
                    source,
                })?;
                let name = path
                    .file_name()
                    .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
                project = project.with_file(name, text);
            }
            project
        }
    };
    if let Some(target) = options.target {
        project.conf_type = target;
    }
    if let Some(args) = &options.args {
        project.args.clone_from(args);
    }
    Ok(Request {
        operation: options.operation,
        project,
        debug_info: options.debug_info,
        line: options.line,
        column: options.column,
    })
}

pub fn read_batch(path: &Path) -> Result<Vec<Request>, CliError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Execute one request. Configuration errors become [`Response::Rejected`].
pub fn execute(executor: &ProjectExecutor<'_>, request: &Request) -> Response {
    let project = &request.project;
    let response = match request.operation {
        Operation::Run => executor.run(project).map(Response::Jvm),
        Operation::CompileToJvm => executor.compile_to_jvm(project).map(Response::Jvm),
        Operation::TranslateJs => executor.translate_js(project).map(Response::Js),
        Operation::TranslateWasm => executor
            .translate_wasm(project, request.debug_info)
            .map(Response::Wasm),
        Operation::TranslateSwift => executor.translate_swift(project).map(Response::Swift),
        Operation::GenerateComposeIr => executor
            .generate_compose_ir(project)
            .map(Response::ComposeIr),
        Operation::Highlight => Ok(Response::Highlight(executor.highlight(project))),
        Operation::Complete => Ok(Response::Completions(executor.complete(
            project,
            request.line,
            request.column,
        ))),
    };
    response.unwrap_or_else(|err| {
        tracing::debug!(operation = %request.operation, error = %err, "request rejected");
        Response::rejected(&err)
    })
}

/// Execute a batch on `pool`; responses come back in request order.
pub fn execute_batch(
    executor: &ProjectExecutor<'_>,
    pool: &WorkerPool,
    requests: &[Request],
) -> Vec<Response> {
    tracing::debug!(requests = requests.len(), workers = ?pool.workers(), "executing batch");
    pool.run(requests, |request| execute(executor, request))
}

pub fn to_json(value: &impl Serialize) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(CliError::Output)
}

/// Render the response's diagnostics (or rejection) on stderr.
pub fn emit_diagnostics(response: &Response, color: ColorMode) {
    if let Response::Rejected { error } = response {
        eprintln!("error: {error}");
        return;
    }
    if let Some(report) = response.diagnostics() {
        let mut emitter = TerminalEmitter::stderr(color, std::io::stderr().is_terminal());
        emitter.emit_report(report);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
