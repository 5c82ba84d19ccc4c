//! Swift export.
//!
//! Public declarations are translated one by one into a small Swift
//! declaration tree, which is then printed with stub bodies. Nothing is
//! lowered and analysis errors do not stop the export: unresolved types
//! print as `ERROR_TYPE` and the errors travel in the diagnostics.
//!
//! Declarations without a package come first, in source order. Each package
//! then gets a `public extension Playground.<package>` block holding its
//! members as statics, and the package names are declared at the end as
//! nested `public enum` namespaces.

use std::collections::BTreeMap;

use kplay_analysis::types::Prim;
use kplay_analysis::{AnalysisContext, InferredTypes, ProjectIndex, Ty};
use kplay_syntax::ast::{
    ClassDecl, ClassKind, Declaration, FunctionBody, FunctionDecl, Modifiers, PropertyDecl,
    TypeAliasDecl, Visibility,
};
use kplay_syntax::ParsedFile;
use rustc_hash::FxHashMap;

use crate::artifact::SwiftCode;
use crate::pipeline::{diagnose_typed, Pipeline, PipelineError, PipelineFamily, PipelineResult};
use crate::writer::CodeWriter;

/// Printed for types the export cannot express.
pub const ERROR_TYPE: &str = "ERROR_TYPE";

const MODULE: &str = "Playground";
const KOTLIN_BASE: &str = "KotlinRuntime.KotlinBase";
const INDENT: &str = "    ";

#[derive(Copy, Clone, Debug, Default)]
pub struct SwiftExportPipeline;

impl Pipeline for SwiftExportPipeline {
    type Artifact = SwiftCode;

    fn family(&self) -> PipelineFamily {
        PipelineFamily::SwiftExport
    }

    fn compile(&self, ctx: &AnalysisContext) -> Result<PipelineResult<SwiftCode>, PipelineError> {
        let (report, inferred) = diagnose_typed(ctx);
        let index = ProjectIndex::new(ctx);
        let exporter = Exporter::new(ctx, &index, &inferred);
        let module = exporter.export();
        let code = print(&module);
        tracing::debug!(
            bytes = code.len(),
            errors = report.error_count(),
            "exported swift"
        );
        Ok(PipelineResult::success(SwiftCode { code }, report))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum SwiftDecl {
    Func {
        name: String,
        params: Vec<(String, String)>,
        result: String,
        is_static: bool,
        is_override: bool,
    },
    Var {
        name: String,
        ty: String,
        is_static: bool,
        settable: bool,
    },
    TypeAlias {
        name: String,
        target: String,
    },
    Class {
        name: String,
        members: Vec<SwiftDecl>,
    },
    Init {
        public: bool,
        is_override: bool,
        params: Vec<(String, String)>,
    },
    Extension {
        target: String,
        members: Vec<SwiftDecl>,
    },
    Enum {
        name: String,
        members: Vec<SwiftDecl>,
    },
}

/// Everything the printer needs, in output order.
#[derive(Debug, Default)]
struct SwiftModule {
    decls: Vec<SwiftDecl>,
    has_classes: bool,
}

/// Package namespaces; sorted for stable output.
#[derive(Debug, Default)]
struct Namespace {
    children: BTreeMap<String, Namespace>,
}

impl Namespace {
    fn insert(&mut self, package: &str) {
        let mut node = self;
        for segment in package.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }

    fn into_decls(self) -> Vec<SwiftDecl> {
        self.children
            .into_iter()
            .map(|(name, child)| SwiftDecl::Enum {
                name,
                members: child.into_decls(),
            })
            .collect()
    }
}

struct Exporter<'e, 'a> {
    ctx: &'a AnalysisContext,
    index: &'e ProjectIndex<'a>,
    inferred: &'e InferredTypes,
    /// Simple class name to its Swift name.
    classes: FxHashMap<&'a str, String>,
}

impl<'e, 'a> Exporter<'e, 'a> {
    fn new(ctx: &'a AnalysisContext, index: &'e ProjectIndex<'a>, inferred: &'e InferredTypes) -> Self {
        let mut classes = FxHashMap::default();
        for file in ctx.files.iter().filter(|f| !f.has_errors()) {
            for decl in &file.declarations {
                if let Declaration::Class(class) = decl {
                    let name = match &file.package {
                        Some(package) => format!("{MODULE}.{package}.{}", class.name),
                        None => format!("{MODULE}.{}", class.name),
                    };
                    classes.entry(class.name.as_str()).or_insert(name);
                }
            }
        }
        Exporter {
            ctx,
            index,
            inferred,
            classes,
        }
    }

    fn export(&self) -> SwiftModule {
        let mut module = SwiftModule::default();
        let mut packages: BTreeMap<&str, Vec<SwiftDecl>> = BTreeMap::new();

        // Files that do not parse are not exported at all.
        for file in self.ctx.files.iter().filter(|f| !f.has_errors()) {
            let in_package = file.package.is_some();
            let mut decls = Vec::new();
            for decl in &file.declarations {
                if !is_public(decl.modifiers()) {
                    continue;
                }
                let exported = match decl {
                    Declaration::Function(f) => self.function(file, f, in_package),
                    Declaration::Property(p) => Some(self.property(file, p, in_package)),
                    Declaration::TypeAlias(t) => Some(self.type_alias(t)),
                    Declaration::Class(c) => self.class(file, c),
                };
                if let Some(exported) = exported {
                    module.has_classes |= matches!(exported, SwiftDecl::Class { .. });
                    decls.push(exported);
                }
            }
            match &file.package {
                Some(package) => packages.entry(package).or_default().extend(decls),
                None => module.decls.extend(decls),
            }
        }

        let mut namespaces = Namespace::default();
        for (package, members) in packages {
            namespaces.insert(package);
            module.decls.push(SwiftDecl::Extension {
                target: format!("{MODULE}.{package}"),
                members,
            });
        }
        module.decls.extend(namespaces.into_decls());
        module
    }

    fn function(&self, file: &ParsedFile, f: &FunctionDecl, is_static: bool) -> Option<SwiftDecl> {
        // Extensions have no Swift counterpart here.
        if f.receiver.is_some() {
            return None;
        }
        let type_params: Vec<&str> = f.type_params.iter().map(String::as_str).collect();
        let params = f
            .params
            .iter()
            .map(|p| {
                let ty = self.index.resolve_type(&p.ty, &type_params);
                (p.name.clone(), self.swift_type(&ty))
            })
            .collect();
        let result = match (&f.return_type, &f.body) {
            (Some(ty), _) => self.index.resolve_type(ty, &type_params),
            (None, Some(FunctionBody::Expression(_))) => self
                .inferred
                .get(&file.name, f.name_span)
                .cloned()
                .unwrap_or(Ty::Unknown),
            (None, _) => Ty::UNIT,
        };
        Some(SwiftDecl::Func {
            name: f.name.clone(),
            params,
            result: self.swift_type(&result),
            is_static,
            is_override: f.modifiers.has("override"),
        })
    }

    fn property(&self, file: &ParsedFile, p: &PropertyDecl, is_static: bool) -> SwiftDecl {
        let ty = match &p.ty {
            Some(ty) => self.index.resolve_type(ty, &[]),
            None => self
                .inferred
                .get(&file.name, p.name_span)
                .cloned()
                .unwrap_or(Ty::Unknown),
        };
        SwiftDecl::Var {
            name: p.name.clone(),
            ty: self.swift_type(&ty),
            is_static,
            settable: p.mutable,
        }
    }

    fn type_alias(&self, t: &TypeAliasDecl) -> SwiftDecl {
        SwiftDecl::TypeAlias {
            name: t.name.clone(),
            target: self.swift_type(&self.index.resolve_type(&t.target, &[])),
        }
    }

    fn class(&self, file: &ParsedFile, class: &ClassDecl) -> Option<SwiftDecl> {
        let type_params: Vec<&str> = class.type_params.iter().map(String::as_str).collect();
        let mut properties = Vec::new();
        let mut functions = Vec::new();
        let init = match class.kind {
            ClassKind::Interface => return None,
            ClassKind::Object => {
                let shared = self.classes.get(class.name.as_str()).cloned();
                properties.push(SwiftDecl::Var {
                    name: "shared".to_string(),
                    ty: shared.unwrap_or_else(|| ERROR_TYPE.to_string()),
                    is_static: true,
                    settable: false,
                });
                SwiftDecl::Init {
                    public: false,
                    is_override: true,
                    params: Vec::new(),
                }
            }
            ClassKind::Class => {
                let params: Vec<(String, String)> = class
                    .ctor_params
                    .iter()
                    .map(|p| {
                        let ty = self.index.resolve_type(&p.param.ty, &type_params);
                        (p.param.name.clone(), self.swift_type(&ty))
                    })
                    .collect();
                SwiftDecl::Init {
                    public: true,
                    is_override: params.is_empty(),
                    params,
                }
            }
        };

        for param in &class.ctor_params {
            let Some(mutable) = param.property else {
                continue;
            };
            if !is_public(&param.modifiers) {
                continue;
            }
            let ty = self.index.resolve_type(&param.param.ty, &type_params);
            properties.push(SwiftDecl::Var {
                name: param.param.name.clone(),
                ty: self.swift_type(&ty),
                is_static: false,
                settable: mutable,
            });
        }
        for member in &class.members {
            if !is_public(member.modifiers()) {
                continue;
            }
            match member {
                Declaration::Property(p) => properties.push(self.property(file, p, false)),
                Declaration::Function(f) => functions.extend(self.function(file, f, false)),
                Declaration::Class(_) | Declaration::TypeAlias(_) => {}
            }
        }

        let mut members = properties;
        members.push(init);
        members.extend(functions);
        Some(SwiftDecl::Class {
            name: class.name.clone(),
            members,
        })
    }

    fn swift_type(&self, ty: &Ty) -> String {
        match ty {
            Ty::Prim(prim) => prim_type(*prim).to_string(),
            Ty::Class(name) => self
                .classes
                .get(name.as_str())
                .cloned()
                .unwrap_or_else(|| ERROR_TYPE.to_string()),
            Ty::Nullable(inner) => format!("{}?", self.swift_type(inner)),
            Ty::Library(_) | Ty::TypeParam(_) | Ty::Function(_) | Ty::Error | Ty::Unknown => {
                ERROR_TYPE.to_string()
            }
        }
    }
}

fn prim_type(prim: Prim) -> &'static str {
    match prim {
        Prim::Int => "Swift.Int32",
        Prim::Long => "Swift.Int64",
        Prim::Short => "Swift.Int16",
        Prim::Byte => "Swift.Int8",
        Prim::UInt => "Swift.UInt32",
        Prim::ULong => "Swift.UInt64",
        Prim::UShort => "Swift.UInt16",
        Prim::UByte => "Swift.UInt8",
        Prim::Double => "Swift.Double",
        Prim::Float => "Swift.Float",
        Prim::Boolean => "Swift.Bool",
        Prim::Char => "Swift.Unicode.UTF16.CodeUnit",
        Prim::String => "Swift.String",
        Prim::Unit => "Swift.Void",
        Prim::Nothing => "Swift.Never",
        Prim::Any => KOTLIN_BASE,
    }
}

fn is_public(modifiers: &Modifiers) -> bool {
    modifiers.effective_visibility() == Visibility::Public
}

fn print(module: &SwiftModule) -> String {
    let mut w = CodeWriter::new(INDENT);
    if module.has_classes {
        w.line("import KotlinRuntime");
        w.line("");
    }
    for decl in &module.decls {
        print_decl(decl, &mut w);
    }
    w.finish()
}

fn params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(name, ty)| format!("{name}: {ty}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `head {`, a stub body, `}`.
fn stub(head: &str, w: &mut CodeWriter) {
    w.line(&format!("{head} {{"));
    w.indent();
    w.line("stub()");
    w.dedent();
    w.line("}");
}

fn members(head: &str, members: &[SwiftDecl], w: &mut CodeWriter) {
    w.line(&format!("{head} {{"));
    w.indent();
    for member in members {
        print_decl(member, w);
    }
    w.dedent();
    w.line("}");
}

fn print_decl(decl: &SwiftDecl, w: &mut CodeWriter) {
    match decl {
        SwiftDecl::Func {
            name,
            params: list,
            result,
            is_static,
            is_override,
        } => {
            let modifier = match (is_static, is_override) {
                (true, _) => "static ",
                (false, true) => "override ",
                (false, false) => "",
            };
            stub(
                &format!("public {modifier}func {name}({}) -> {result}", params(list)),
                w,
            );
        }
        SwiftDecl::Var {
            name,
            ty,
            is_static,
            settable,
        } => {
            let modifier = if *is_static { "static " } else { "" };
            w.line(&format!("public {modifier}var {name}: {ty} {{"));
            w.indent();
            stub("get", w);
            if *settable {
                stub("set", w);
            }
            w.dedent();
            w.line("}");
        }
        SwiftDecl::TypeAlias { name, target } => {
            w.line(&format!("public typealias {name} = {target}"));
        }
        SwiftDecl::Class { name, members: list } => {
            members(&format!("public class {name} : {KOTLIN_BASE}"), list, w);
        }
        SwiftDecl::Init {
            public,
            is_override,
            params: list,
        } => {
            let visibility = if *public { "public" } else { "private" };
            let modifier = if *is_override { " override" } else { "" };
            stub(&format!("{visibility}{modifier} init({})", params(list)), w);
        }
        SwiftDecl::Extension {
            target,
            members: list,
        } => members(&format!("public extension {target}"), list, w),
        SwiftDecl::Enum {
            name,
            members: list,
        } => members(&format!("public enum {name}"), list, w),
    }
}
