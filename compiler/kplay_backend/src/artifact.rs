//! What successful pipelines hand back.

use serde::{Deserialize, Serialize};

/// One `.class` file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFile {
    /// Internal name, `foo/bar/MainKt`.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ClassFile {
    /// Path inside a jar: `foo/bar/MainKt.class`.
    pub fn path(&self) -> String {
        format!("{}.class", self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JvmClasses {
    pub classes: Vec<ClassFile>,
    /// Dotted name of the facade that declares `fun main`.
    pub main_class: Option<String>,
}

impl JvmClasses {
    pub fn class(&self, name: &str) -> Option<&ClassFile> {
        self.classes.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsCode {
    pub code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmOutput {
    pub wasm: Vec<u8>,
    /// Loader that instantiates the module and calls `main` when its body
    /// compiled to real code.
    pub js_code: String,
    /// JSON source map, present when debug info was requested.
    pub source_map: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposeIr {
    pub ir: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwiftCode {
    pub code: String,
}
