//! Which pipeline family serves which target, per operation.

use std::fmt;

use kplay_analysis::ProjectType;
use kplay_backend::{JsStrategy, PipelineFamily};
use serde::{Deserialize, Serialize};

/// Executor entry points.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Run,
    CompileToJvm,
    TranslateJs,
    TranslateWasm,
    TranslateSwift,
    GenerateComposeIr,
    Highlight,
    Complete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Run => "run",
            Operation::CompileToJvm => "compile-to-jvm",
            Operation::TranslateJs => "translate-js",
            Operation::TranslateWasm => "translate-wasm",
            Operation::TranslateSwift => "translate-swift",
            Operation::GenerateComposeIr => "generate-compose-ir",
            Operation::Highlight => "highlight",
            Operation::Complete => "complete",
        }
    }

    /// The family serving `target`, or `None` when this operation does not
    /// accept it.
    pub fn family(self, target: ProjectType) -> Option<PipelineFamily> {
        use PipelineFamily as F;
        use ProjectType as T;

        let family = match (self, target) {
            (Operation::Run | Operation::CompileToJvm, T::Java) => F::Jvm,
            (Operation::TranslateJs, T::Js) => F::Js {
                strategy: JsStrategy::Direct,
            },
            (Operation::TranslateJs, T::JsIr) => F::Js {
                strategy: JsStrategy::Ir,
            },
            (Operation::TranslateWasm, T::Wasm) => F::Wasm,
            (Operation::TranslateWasm, T::ComposeWasm) => F::ComposeWasm,
            (Operation::TranslateSwift, T::SwiftExport) => F::SwiftExport,
            (Operation::GenerateComposeIr, T::ComposeWasm) => F::ComposeIr,
            (Operation::Highlight | Operation::Complete, target) => analysis_family(target),
            _ => return None,
        };
        Some(family)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Family whose front end analyzes `target` for highlighting.
fn analysis_family(target: ProjectType) -> PipelineFamily {
    match target {
        ProjectType::Java => PipelineFamily::Jvm,
        ProjectType::Js => PipelineFamily::Js {
            strategy: JsStrategy::Direct,
        },
        ProjectType::JsIr => PipelineFamily::Js {
            strategy: JsStrategy::Ir,
        },
        ProjectType::Wasm => PipelineFamily::Wasm,
        ProjectType::ComposeWasm => PipelineFamily::ComposeWasm,
        ProjectType::SwiftExport => PipelineFamily::SwiftExport,
    }
}
