//! Symbols provided by library artifacts.
//!
//! The tables are deliberately small: enough for name resolution, arity
//! checks, the Compose call rule and completion on typical playground code.

use crate::project::ProjectType;

pub const STDLIB_JVM: &str = "kotlin-stdlib-jvm";
pub const STDLIB_JS: &str = "kotlin-stdlib-js";
pub const STDLIB_WASM_JS: &str = "kotlin-stdlib-wasm-js";
pub const STDLIB_NATIVE: &str = "kotlin-stdlib-native";
pub const COMPOSE_RUNTIME: &str = "compose-runtime-wasm-js";

/// Every library the service knows how to load.
pub const KNOWN_LIBRARIES: [&str; 5] = [
    STDLIB_JVM,
    STDLIB_JS,
    STDLIB_WASM_JS,
    STDLIB_NATIVE,
    COMPOSE_RUNTIME,
];

/// Libraries a target depends on, in dependency order.
pub fn libraries_for(target: ProjectType) -> &'static [&'static str] {
    match target {
        ProjectType::Java => &[STDLIB_JVM],
        ProjectType::Js | ProjectType::JsIr => &[STDLIB_JS],
        ProjectType::Wasm => &[STDLIB_WASM_JS],
        ProjectType::ComposeWasm => &[STDLIB_WASM_JS, COMPOSE_RUNTIME],
        ProjectType::SwiftExport => &[STDLIB_NATIVE],
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Class,
    Property,
    Annotation,
}

/// A declaration exported by a library.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LibrarySymbol {
    pub name: &'static str,
    pub kind: SymbolKind,
    pub min_args: usize,
    /// `None` for vararg functions.
    pub max_args: Option<usize>,
    /// Result type name; empty when it depends on type arguments.
    pub returns: &'static str,
    pub composable: bool,
}

impl LibrarySymbol {
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

const fn function(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    returns: &'static str,
) -> LibrarySymbol {
    LibrarySymbol {
        name,
        kind: SymbolKind::Function,
        min_args,
        max_args,
        returns,
        composable: false,
    }
}

const fn composable(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
) -> LibrarySymbol {
    LibrarySymbol {
        name,
        kind: SymbolKind::Function,
        min_args,
        max_args,
        returns: "Unit",
        composable: true,
    }
}

const fn class(name: &'static str, min_args: usize, max_args: Option<usize>) -> LibrarySymbol {
    LibrarySymbol {
        name,
        kind: SymbolKind::Class,
        min_args,
        max_args,
        returns: name,
        composable: false,
    }
}

const fn property(name: &'static str, returns: &'static str) -> LibrarySymbol {
    LibrarySymbol {
        name,
        kind: SymbolKind::Property,
        min_args: 0,
        max_args: Some(0),
        returns,
        composable: false,
    }
}

const fn annotation(name: &'static str) -> LibrarySymbol {
    LibrarySymbol {
        name,
        kind: SymbolKind::Annotation,
        min_args: 0,
        max_args: None,
        returns: "",
        composable: false,
    }
}

/// Shared by every `kotlin-stdlib-*` flavour.
const COMMON: &[LibrarySymbol] = &[
    function("println", 0, Some(1), "Unit"),
    function("print", 1, Some(1), "Unit"),
    function("error", 1, Some(1), "Nothing"),
    function("TODO", 0, Some(1), "Nothing"),
    function("require", 1, Some(2), "Unit"),
    function("check", 1, Some(2), "Unit"),
    function("requireNotNull", 1, Some(2), ""),
    function("listOf", 0, None, "List"),
    function("mutableListOf", 0, None, "MutableList"),
    function("emptyList", 0, Some(0), "List"),
    function("arrayOf", 0, None, "Array"),
    function("intArrayOf", 0, None, "IntArray"),
    function("setOf", 0, None, "Set"),
    function("mutableSetOf", 0, None, "MutableSet"),
    function("mapOf", 0, None, "Map"),
    function("mutableMapOf", 0, None, "MutableMap"),
    function("maxOf", 2, None, ""),
    function("minOf", 2, None, ""),
    function("repeat", 2, Some(2), "Unit"),
    function("run", 1, Some(1), ""),
    function("with", 2, Some(2), ""),
    function("lazy", 1, Some(1), "Lazy"),
    function("buildString", 1, Some(1), "String"),
    function("buildList", 1, Some(1), "List"),
    function("sequenceOf", 0, None, "Sequence"),
    function("readln", 0, Some(0), "String"),
    class("List", 0, Some(0)),
    class("MutableList", 0, Some(0)),
    class("Set", 0, Some(0)),
    class("MutableSet", 0, Some(0)),
    class("Map", 0, Some(0)),
    class("MutableMap", 0, Some(0)),
    class("Array", 2, Some(2)),
    class("IntArray", 1, Some(2)),
    class("Sequence", 0, Some(0)),
    class("Lazy", 0, Some(0)),
    class("IntRange", 2, Some(2)),
    class("Pair", 2, Some(2)),
    class("Triple", 3, Some(3)),
    class("Comparable", 0, Some(0)),
    class("StringBuilder", 0, Some(1)),
    class("Regex", 1, Some(2)),
    class("Throwable", 0, Some(2)),
    class("Exception", 0, Some(2)),
    class("RuntimeException", 0, Some(2)),
    class("IllegalStateException", 0, Some(2)),
    class("IllegalArgumentException", 0, Some(2)),
    annotation("Suppress"),
    annotation("Deprecated"),
    annotation("OptIn"),
    annotation("Throws"),
];

const JVM: &[LibrarySymbol] = &[
    class("Thread", 0, Some(1)),
    class("System", 0, Some(0)),
    annotation("JvmStatic"),
    annotation("JvmName"),
    annotation("JvmOverloads"),
    annotation("Synchronized"),
];

const JS: &[LibrarySymbol] = &[
    property("console", "Console"),
    property("window", "Window"),
    property("document", "Document"),
    function("js", 1, Some(1), ""),
    class("Console", 0, Some(0)),
    class("Window", 0, Some(0)),
    class("Document", 0, Some(0)),
    annotation("JsName"),
    annotation("JsExport"),
];

const WASM_JS: &[LibrarySymbol] = &[
    property("window", "Window"),
    property("document", "Document"),
    class("Window", 0, Some(0)),
    class("Document", 0, Some(0)),
    class("JsAny", 0, Some(0)),
    annotation("JsExport"),
    annotation("JsFun"),
];

const NATIVE: &[LibrarySymbol] = &[
    function("memScoped", 1, Some(1), ""),
    annotation("CName"),
    annotation("ThreadLocal"),
];

const COMPOSE: &[LibrarySymbol] = &[
    annotation("Composable"),
    function("remember", 1, Some(2), ""),
    function("mutableStateOf", 1, Some(2), "MutableState"),
    function("derivedStateOf", 1, Some(1), "State"),
    class("MutableState", 0, Some(0)),
    class("State", 0, Some(0)),
    composable("LaunchedEffect", 2, Some(2)),
    composable("SideEffect", 1, Some(1)),
    composable("DisposableEffect", 2, Some(2)),
    composable("key", 2, Some(2)),
    composable("Text", 1, Some(2)),
    composable("Button", 2, Some(3)),
    composable("Column", 1, Some(2)),
    composable("Row", 1, Some(2)),
    composable("Box", 1, Some(2)),
];

/// Symbols exported by `library`, empty for unknown names.
pub fn symbols(library: &str) -> impl Iterator<Item = &'static LibrarySymbol> {
    let (common, specific): (&[LibrarySymbol], &[LibrarySymbol]) = match library {
        STDLIB_JVM => (COMMON, JVM),
        STDLIB_JS => (COMMON, JS),
        STDLIB_WASM_JS => (COMMON, WASM_JS),
        STDLIB_NATIVE => (COMMON, NATIVE),
        COMPOSE_RUNTIME => (&[], COMPOSE),
        _ => (&[], &[]),
    };
    common.iter().chain(specific)
}

/// Keywords offered by completion.
pub const KEYWORDS: &[&str] = &[
    "fun",
    "val",
    "var",
    "class",
    "object",
    "interface",
    "typealias",
    "return",
    "if",
    "else",
    "while",
    "for",
    "true",
    "false",
    "null",
    "package",
    "import",
    "private",
    "public",
    "internal",
    "override",
    "open",
    "data",
];
