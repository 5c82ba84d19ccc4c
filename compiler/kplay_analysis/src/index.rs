//! Project-wide symbol index and type resolution.

use kplay_syntax::ast::{
    ClassDecl, ClassKind, Declaration, FunctionDecl, PropertyDecl, TypeAliasDecl, TypeRef,
};
use kplay_syntax::ParsedFile;
use rustc_hash::FxHashMap;

use crate::context::AnalysisContext;
use crate::stdlib::{self, LibrarySymbol, SymbolKind};
use crate::types::{Prim, Ty};

/// Something a call expression can target.
#[derive(Clone, Debug)]
pub enum Callable<'a> {
    /// Overloads of a top-level project function.
    Functions(&'a [&'a FunctionDecl]),
    Constructor(&'a ClassDecl),
    Library(&'static LibrarySymbol),
}

/// Top-level declarations of every file, plus library symbols.
///
/// Declarations are indexed by simple name; packages are not separate
/// namespaces.
#[derive(Debug)]
pub struct ProjectIndex<'a> {
    functions: FxHashMap<&'a str, Vec<&'a FunctionDecl>>,
    classes: FxHashMap<&'a str, &'a ClassDecl>,
    properties: FxHashMap<&'a str, &'a PropertyDecl>,
    aliases: FxHashMap<&'a str, &'a TypeAliasDecl>,
    library: FxHashMap<&'static str, &'static LibrarySymbol>,
}

impl<'a> ProjectIndex<'a> {
    pub fn new(ctx: &'a AnalysisContext) -> Self {
        Self::build(&ctx.files, ctx.configuration.libraries.iter().map(String::as_str))
    }

    pub fn build<'l>(files: &'a [ParsedFile], libraries: impl Iterator<Item = &'l str>) -> Self {
        let mut index = ProjectIndex {
            functions: FxHashMap::default(),
            classes: FxHashMap::default(),
            properties: FxHashMap::default(),
            aliases: FxHashMap::default(),
            library: FxHashMap::default(),
        };
        for file in files {
            for decl in &file.declarations {
                match decl {
                    Declaration::Function(f) if f.receiver.is_none() => {
                        index.functions.entry(f.name.as_str()).or_default().push(f);
                    }
                    Declaration::Function(_) => {}
                    Declaration::Class(c) => {
                        index.classes.entry(c.name.as_str()).or_insert(c);
                    }
                    Declaration::Property(p) => {
                        index.properties.entry(p.name.as_str()).or_insert(p);
                    }
                    Declaration::TypeAlias(t) => {
                        index.aliases.entry(t.name.as_str()).or_insert(t);
                    }
                }
            }
        }
        for library in libraries {
            for symbol in stdlib::symbols(library) {
                index.library.entry(symbol.name).or_insert(symbol);
            }
        }
        index
    }

    pub fn functions(&self, name: &str) -> &[&'a FunctionDecl] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn class(&self, name: &str) -> Option<&'a ClassDecl> {
        self.classes.get(name).copied()
    }

    pub fn property(&self, name: &str) -> Option<&'a PropertyDecl> {
        self.properties.get(name).copied()
    }

    pub fn library_symbol(&self, name: &str) -> Option<&'static LibrarySymbol> {
        self.library.get(name).copied()
    }

    /// All library symbols, in no particular order.
    pub fn library_symbols(&self) -> impl Iterator<Item = &'static LibrarySymbol> + '_ {
        self.library.values().copied()
    }

    /// What `name(...)` calls. Project declarations shadow library ones.
    pub fn callable(&self, name: &str) -> Option<Callable<'_>> {
        if let Some(overloads) = self.functions.get(name) {
            return Some(Callable::Functions(overloads));
        }
        if let Some(class) = self.class(name) {
            return Some(Callable::Constructor(class));
        }
        match self.library_symbol(name) {
            Some(symbol) if matches!(symbol.kind, SymbolKind::Function | SymbolKind::Class) => {
                Some(Callable::Library(symbol))
            }
            _ => None,
        }
    }

    /// Whether `name` is an annotation class in scope.
    pub fn is_annotation(&self, name: &str) -> bool {
        self.library_symbol(name)
            .is_some_and(|s| s.kind == SymbolKind::Annotation)
            || self
                .class(name)
                .is_some_and(|c| c.modifiers.has("annotation"))
    }

    /// Whether calling `name` requires a composable context.
    pub fn is_composable(&self, name: &str) -> bool {
        match self.callable(name) {
            Some(Callable::Functions(overloads)) => overloads
                .iter()
                .any(|f| f.modifiers.has_annotation("Composable")),
            Some(Callable::Library(symbol)) => symbol.composable,
            _ => false,
        }
    }

    /// Resolve a written type. Unknown names become [`Ty::Error`].
    pub fn resolve_type(&self, ty: &TypeRef, type_params: &[&str]) -> Ty {
        let resolved = self.resolve_name(&ty.name, type_params, 0);
        if ty.nullable {
            resolved.nullable()
        } else {
            resolved
        }
    }

    fn resolve_name(&self, name: &str, type_params: &[&str], depth: usize) -> Ty {
        let short = name.rsplit('.').next().unwrap_or(name);
        if type_params.contains(&name) {
            return Ty::TypeParam(name.to_string());
        }
        if let Some(prim) = Prim::from_name(name) {
            return Ty::Prim(prim);
        }
        if let Some(class) = self.class(short) {
            return Ty::Class(class.name.clone());
        }
        if let Some(alias) = self.aliases.get(short) {
            // Cyclic aliases resolve to an error type.
            if depth > 16 {
                return Ty::Error;
            }
            let target = self.resolve_name(&alias.target.name, &[], depth + 1);
            return if alias.target.nullable {
                target.nullable()
            } else {
                target
            };
        }
        if let Some(arity) = name
            .strip_prefix("Function")
            .and_then(|n| n.parse::<usize>().ok())
        {
            return Ty::Function(arity);
        }
        match self.library_symbol(short) {
            Some(symbol) if symbol.kind == SymbolKind::Class => Ty::Library(symbol.name.to_string()),
            _ => Ty::Error,
        }
    }

    /// Type named by a library `returns` string.
    pub fn library_type(&self, name: &str) -> Ty {
        if name.is_empty() {
            return Ty::Unknown;
        }
        match self.resolve_name(name, &[], 0) {
            Ty::Error => Ty::Unknown,
            ty => ty,
        }
    }

    /// Type of `ClassName` used as a value (objects only).
    pub fn object_type(&self, name: &str) -> Option<Ty> {
        self.class(name)
            .filter(|c| c.kind == ClassKind::Object)
            .map(|c| Ty::Class(c.name.clone()))
    }
}
