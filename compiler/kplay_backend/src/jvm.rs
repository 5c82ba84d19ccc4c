//! JVM class generation.
//!
//! Each source file with top-level functions or properties gets a facade
//! class (`Main.kt` becomes `MainKt`); each class, object and interface
//! gets its own class file. Classes live under the file's package path.

mod classfile;

use kplay_analysis::types::Prim;
use kplay_analysis::{AnalysisContext, InferredTypes, ProjectIndex, Ty};
use kplay_diagnostic::{DiagnosticEntry, PROJECT_KEY};
use kplay_syntax::ast::{ClassDecl, ClassKind, Declaration, FunctionBody, FunctionDecl, TypeRef};
use kplay_syntax::{ParsedFile, Span};
use rustc_hash::FxHashMap;

use crate::artifact::{ClassFile, JvmClasses};
use crate::pipeline::{
    diagnose_typed, Pipeline, PipelineError, PipelineFamily, PipelineResult, COMPILATION_FAILED,
};

use classfile::{access, ClassWriter};

/// Reported when a run is requested for a project without an entry point.
pub const NO_MAIN: &str = "No main method found in project";

const OBJECT: &str = "java/lang/Object";

#[derive(Copy, Clone, Debug)]
pub struct JvmPipeline {
    require_main: bool,
}

impl JvmPipeline {
    pub fn new(require_main: bool) -> Self {
        JvmPipeline { require_main }
    }
}

impl Pipeline for JvmPipeline {
    type Artifact = JvmClasses;

    fn family(&self) -> PipelineFamily {
        PipelineFamily::Jvm
    }

    fn compile(&self, ctx: &AnalysisContext) -> Result<PipelineResult<JvmClasses>, PipelineError> {
        let (mut report, inferred) = diagnose_typed(ctx);
        if report.has_errors() {
            return Ok(PipelineResult::failure(report, COMPILATION_FAILED));
        }

        let index = ProjectIndex::new(ctx);
        let generator = Generator::new(ctx, &index, &inferred);
        let classes = generator.generate();
        if self.require_main && classes.main_class.is_none() {
            report.push(PROJECT_KEY, DiagnosticEntry::error(NO_MAIN));
            return Ok(PipelineResult::failure(report, NO_MAIN));
        }
        tracing::debug!(
            classes = classes.classes.len(),
            main = ?classes.main_class,
            "generated jvm classes"
        );
        Ok(PipelineResult::success(classes, report))
    }
}

struct Generator<'g, 'a> {
    ctx: &'a AnalysisContext,
    index: &'g ProjectIndex<'a>,
    inferred: &'g InferredTypes,
    /// Simple class name to internal name.
    internal: FxHashMap<&'a str, String>,
}

impl<'g, 'a> Generator<'g, 'a> {
    fn new(
        ctx: &'a AnalysisContext,
        index: &'g ProjectIndex<'a>,
        inferred: &'g InferredTypes,
    ) -> Self {
        let mut internal = FxHashMap::default();
        for file in &ctx.files {
            for decl in &file.declarations {
                if let Declaration::Class(c) = decl {
                    internal
                        .entry(c.name.as_str())
                        .or_insert_with(|| qualify(file, &c.name));
                }
            }
        }
        Generator {
            ctx,
            index,
            inferred,
            internal,
        }
    }

    fn generate(&self) -> JvmClasses {
        let mut classes = Vec::new();
        let mut main_class = None;
        for file in &self.ctx.files {
            if let Some((facade, has_main)) = self.facade(file) {
                if has_main && main_class.is_none() {
                    main_class = Some(facade.name.replace('/', "."));
                }
                classes.push(facade);
            }
            for decl in &file.declarations {
                if let Declaration::Class(c) = decl {
                    classes.push(self.class(file, c));
                }
            }
        }
        JvmClasses {
            classes,
            main_class,
        }
    }

    /// The facade class, and whether it declares an entry point.
    fn facade(&self, file: &ParsedFile) -> Option<(ClassFile, bool)> {
        let top_level = file
            .declarations
            .iter()
            .any(|d| matches!(d, Declaration::Function(_) | Declaration::Property(_)));
        if !top_level {
            return None;
        }

        let name = qualify(file, &file.facade_name());
        let mut writer = ClassWriter::new(
            access::PUBLIC | access::FINAL | access::SUPER,
            &name,
            OBJECT,
        );
        let mut has_main = false;
        for decl in &file.declarations {
            match decl {
                Declaration::Property(p) => {
                    let ty = self.property_type(file, p.ty.as_ref(), p.name_span);
                    writer.field(
                        access::PRIVATE | access::STATIC,
                        &p.name,
                        &self.descriptor(&ty, false),
                    );
                }
                Declaration::Function(f) => {
                    let descriptor = if is_entry_point(f) {
                        has_main = true;
                        "([Ljava/lang/String;)V".to_string()
                    } else {
                        self.method_descriptor(file, f, &[])
                    };
                    writer.method(
                        access::PUBLIC | access::STATIC | access::NATIVE,
                        &f.name,
                        &descriptor,
                    );
                }
                Declaration::Class(_) | Declaration::TypeAlias(_) => {}
            }
        }
        writer.source_file(source_name(file));
        Some((
            ClassFile {
                name,
                bytes: writer.finish(),
            },
            has_main,
        ))
    }

    fn class(&self, file: &ParsedFile, c: &ClassDecl) -> ClassFile {
        let name = qualify(file, &c.name);
        let (class_access, method_access) = match c.kind {
            ClassKind::Interface => (
                access::PUBLIC | access::INTERFACE | access::ABSTRACT,
                access::PUBLIC | access::ABSTRACT,
            ),
            ClassKind::Class if c.modifiers.has("open") || c.modifiers.has("abstract") => {
                (access::PUBLIC | access::SUPER, access::PUBLIC | access::NATIVE)
            }
            ClassKind::Class | ClassKind::Object => (
                access::PUBLIC | access::FINAL | access::SUPER,
                access::PUBLIC | access::NATIVE,
            ),
        };
        let type_params: Vec<&str> = c.type_params.iter().map(String::as_str).collect();

        let mut writer = ClassWriter::new(class_access, &name, OBJECT);
        if c.kind == ClassKind::Object {
            writer.field(
                access::PUBLIC | access::STATIC | access::FINAL,
                "INSTANCE",
                &format!("L{name};"),
            );
        }
        for param in &c.ctor_params {
            if param.property.is_some() {
                let ty = self.index.resolve_type(&param.param.ty, &type_params);
                writer.field(
                    access::PRIVATE,
                    &param.param.name,
                    &self.descriptor(&ty, false),
                );
            }
        }
        for member in &c.members {
            match member {
                Declaration::Property(p) if c.kind != ClassKind::Interface => {
                    let ty = self.property_type(file, p.ty.as_ref(), p.name_span);
                    writer.field(access::PRIVATE, &p.name, &self.descriptor(&ty, false));
                }
                Declaration::Function(f) => {
                    let has_body = f.body.is_some() && c.kind != ClassKind::Interface;
                    let flags = if has_body {
                        method_access
                    } else {
                        access::PUBLIC | access::ABSTRACT
                    };
                    let descriptor = self.method_descriptor(file, f, &type_params);
                    writer.method(flags, &f.name, &descriptor);
                }
                _ => {}
            }
        }
        writer.source_file(source_name(file));
        ClassFile {
            name,
            bytes: writer.finish(),
        }
    }

    fn property_type(
        &self,
        file: &ParsedFile,
        written: Option<&TypeRef>,
        name_span: Span,
    ) -> Ty {
        match written {
            Some(ty) => self.index.resolve_type(ty, &[]),
            None => self
                .inferred
                .get(&file.name, name_span)
                .cloned()
                .unwrap_or(Ty::Unknown),
        }
    }

    fn method_descriptor(&self, file: &ParsedFile, f: &FunctionDecl, outer: &[&str]) -> String {
        let mut type_params: Vec<&str> = outer.to_vec();
        type_params.extend(f.type_params.iter().map(String::as_str));

        let mut descriptor = String::from("(");
        if let Some(receiver) = &f.receiver {
            let ty = self.index.resolve_type(receiver, &type_params);
            descriptor.push_str(&self.descriptor(&ty, false));
        }
        for param in &f.params {
            let ty = self.index.resolve_type(&param.ty, &type_params);
            let single = self.descriptor(&ty, false);
            if param.vararg {
                descriptor.push('[');
            }
            descriptor.push_str(&single);
        }
        descriptor.push(')');

        let result = match (&f.return_type, &f.body) {
            (Some(ty), _) => self.index.resolve_type(ty, &type_params),
            (None, Some(FunctionBody::Expression(_))) => self
                .inferred
                .get(&file.name, f.name_span)
                .cloned()
                .unwrap_or(Ty::Unknown),
            (None, _) => Ty::UNIT,
        };
        descriptor.push_str(&self.descriptor(&result, true));
        descriptor
    }

    /// Field descriptor of `ty`; `Unit` is `V` only in return position.
    fn descriptor(&self, ty: &Ty, is_return: bool) -> String {
        match ty {
            Ty::Prim(Prim::Unit) if is_return => "V".to_string(),
            Ty::Prim(prim) => prim_descriptor(*prim).to_string(),
            Ty::Class(name) => match self.internal.get(name.as_str()) {
                Some(internal) => format!("L{internal};"),
                None => format!("L{name};"),
            },
            Ty::Nullable(inner) => match inner.as_ref() {
                Ty::Prim(prim) => format!("L{};", boxed(*prim)),
                other => self.descriptor(other, false),
            },
            Ty::Function(arity) => format!("Lkotlin/jvm/functions/Function{arity};"),
            Ty::Library(name) => match name.as_str() {
                "List" => "Ljava/util/List;".to_string(),
                "Map" => "Ljava/util/Map;".to_string(),
                "Set" => "Ljava/util/Set;".to_string(),
                _ => format!("L{OBJECT};"),
            },
            Ty::TypeParam(_) | Ty::Error | Ty::Unknown => format!("L{OBJECT};"),
        }
    }
}

fn prim_descriptor(prim: Prim) -> &'static str {
    match prim {
        Prim::Int | Prim::UInt => "I",
        Prim::Long | Prim::ULong => "J",
        Prim::Short | Prim::UShort => "S",
        Prim::Byte | Prim::UByte => "B",
        Prim::Double => "D",
        Prim::Float => "F",
        Prim::Boolean => "Z",
        Prim::Char => "C",
        Prim::String => "Ljava/lang/String;",
        Prim::Unit => "Lkotlin/Unit;",
        Prim::Nothing => "Ljava/lang/Void;",
        Prim::Any => "Ljava/lang/Object;",
    }
}

fn boxed(prim: Prim) -> &'static str {
    match prim {
        Prim::Int | Prim::UInt => "java/lang/Integer",
        Prim::Long | Prim::ULong => "java/lang/Long",
        Prim::Short | Prim::UShort => "java/lang/Short",
        Prim::Byte | Prim::UByte => "java/lang/Byte",
        Prim::Double => "java/lang/Double",
        Prim::Float => "java/lang/Float",
        Prim::Boolean => "java/lang/Boolean",
        Prim::Char => "java/lang/Character",
        Prim::String => "java/lang/String",
        Prim::Unit => "kotlin/Unit",
        Prim::Nothing => "java/lang/Void",
        Prim::Any => OBJECT,
    }
}

/// `main()` or `main(args: Array<String>)`, at top level.
fn is_entry_point(f: &FunctionDecl) -> bool {
    f.name == "main"
        && f.receiver.is_none()
        && match f.params.as_slice() {
            [] => true,
            [param] => param.ty.short_name() == "Array",
            _ => false,
        }
}

/// `foo/bar/Name` for a file in `package foo.bar`.
fn qualify(file: &ParsedFile, name: &str) -> String {
    match &file.package {
        Some(package) => format!("{}/{name}", package.replace('.', "/")),
        None => name.to_string(),
    }
}

fn source_name(file: &ParsedFile) -> &str {
    file.name.rsplit('/').next().unwrap_or(&file.name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
