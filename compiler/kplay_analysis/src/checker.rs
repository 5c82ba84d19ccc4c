//! Semantic checks over an analysis context.
//!
//! The checker is intentionally shallow: names are resolved against the
//! project and the configured libraries, literal and call types are
//! inferred where that is cheap, and a handful of declaration rules are
//! enforced. Everything it finds is reported through the context's warning
//! policy, so `-Werror` and `-nowarn` apply uniformly.
//!
//! # Module Structure
//!
//! - `expr`: statements and expression inference
//! - `scope`: local variables and the per-function state guards

mod expr;
mod scope;

use kplay_diagnostic::{CompilerMessageSeverity, MessageCollector, RawLocation, RawMessage};
use kplay_syntax::ast::{
    ClassDecl, ClassKind, Declaration, FunctionBody, FunctionDecl, Modifiers, PropertyDecl,
    TypeRef, Visibility,
};
use kplay_syntax::{ParsedFile, Span};
use rustc_hash::FxHashMap;

use crate::config::{CompilerConfiguration, ExplicitApiMode};
use crate::context::AnalysisContext;
use crate::index::ProjectIndex;
use crate::types::{Prim, Ty};

use scope::Scopes;

pub(crate) const COMPOSABLE_CALL: &str =
    "@Composable invocations can only happen from the context of a @Composable function";

/// Check every file of `ctx`.
///
/// Returns syntax errors, argument messages and semantic findings with the
/// warning policy already applied.
pub fn check(ctx: &AnalysisContext) -> Vec<RawMessage> {
    check_typed(ctx).messages
}

/// Types inferred for declarations written without one, plus the
/// operand type of every division between integers.
///
/// Declarations are keyed by file name and name span; divisions by file
/// name and the byte range from the left operand's start to the right
/// operand's end.
#[derive(Clone, Debug, Default)]
pub struct InferredTypes {
    types: FxHashMap<(String, u32), Ty>,
    divisions: FxHashMap<(String, u32, u32), Prim>,
}

impl InferredTypes {
    pub fn get(&self, file: &str, name_span: Span) -> Option<&Ty> {
        self.types.get(&(file.to_string(), name_span.start))
    }

    /// Integer type of `lhs / rhs`, or `None` unless both sides are
    /// integers.
    pub fn integer_division(&self, file: &str, lhs: Span, rhs: Span) -> Option<Prim> {
        self.divisions
            .get(&(file.to_string(), lhs.start, rhs.end))
            .copied()
    }
}

/// Output of [`check_typed`].
#[derive(Clone, Debug)]
pub struct Checked {
    pub messages: Vec<RawMessage>,
    pub inferred: InferredTypes,
}

/// [`check`], also keeping the inferred result types of expression-bodied
/// functions and untyped properties.
pub fn check_typed(ctx: &AnalysisContext) -> Checked {
    let index = ProjectIndex::new(ctx);
    let mut sink = ctx.configuration.warnings.collector();
    for message in &ctx.argument_messages {
        sink.report(
            message.severity,
            message.message.clone(),
            message.location.clone(),
        );
    }

    let mut inferred = InferredTypes::default();
    for file in &ctx.files {
        let mut checker = Checker::new(&index, &ctx.configuration, file, &mut sink);
        checker.check_file();
        inferred.types.extend(
            checker
                .inferred
                .drain(..)
                .map(|(span, ty)| ((file.name.clone(), span.start), ty)),
        );
        inferred.divisions.extend(
            checker
                .divisions
                .drain(..)
                .map(|(span, prim)| ((file.name.clone(), span.start, span.end), prim)),
        );
    }
    check_redeclarations(&ctx.files, &mut sink);

    let messages = sink.into_messages();
    tracing::debug!(
        conf_type = %ctx.target,
        messages = messages.len(),
        "checked project"
    );
    Checked { messages, inferred }
}

/// Location of `span` inside `file`, end included.
pub(crate) fn location(file: &ParsedFile, span: Span) -> RawLocation {
    let (line, column) = file.line_index.line_col(span.start);
    let (line_end, column_end) = file.line_index.line_col(span.end);
    RawLocation::new(&file.name, line, column).with_end(line_end, column_end)
}

/// Per-file checking state.
pub(crate) struct Checker<'c, 'a> {
    index: &'c ProjectIndex<'a>,
    config: &'c CompilerConfiguration,
    file: &'a ParsedFile,
    sink: &'c mut MessageCollector,
    scopes: Scopes,
    type_params: Vec<&'a str>,
    /// Innermost class whose body is being checked.
    class: Option<&'a ClassDecl>,
    /// Declared result of the enclosing function; `None` outside functions.
    return_type: Option<Ty>,
    /// Receiver of the enclosing extension function.
    receiver: Option<Ty>,
    /// Inside a `@Composable` function or a lambda passed to one.
    composable: bool,
    inferred: Vec<(Span, Ty)>,
    /// Integer divisions, spanning both operands.
    divisions: Vec<(Span, Prim)>,
}

impl<'c, 'a> Checker<'c, 'a> {
    fn new(
        index: &'c ProjectIndex<'a>,
        config: &'c CompilerConfiguration,
        file: &'a ParsedFile,
        sink: &'c mut MessageCollector,
    ) -> Self {
        Checker {
            index,
            config,
            file,
            sink,
            scopes: Scopes::default(),
            type_params: Vec::new(),
            class: None,
            return_type: None,
            receiver: None,
            composable: false,
            inferred: Vec::new(),
            divisions: Vec::new(),
        }
    }

    fn check_file(&mut self) {
        let file = self.file;
        for error in &file.errors {
            self.error(error.span, error.message.clone());
        }
        for decl in &file.declarations {
            self.check_declaration(decl, None);
        }
    }

    pub(crate) fn report(
        &mut self,
        severity: CompilerMessageSeverity,
        span: Span,
        message: impl Into<String>,
    ) {
        let location = location(self.file, span);
        self.sink.report(severity, message, Some(location));
    }

    pub(crate) fn error(&mut self, span: Span, message: impl Into<String>) {
        self.report(CompilerMessageSeverity::Error, span, message);
    }

    pub(crate) fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.report(CompilerMessageSeverity::Warning, span, message);
    }

    fn check_declaration(&mut self, decl: &'a Declaration, owner: Option<&'a ClassDecl>) {
        self.check_annotations(decl.modifiers());
        self.check_explicit_api(decl, owner);
        match decl {
            Declaration::Function(f) => self.check_function(f, owner),
            Declaration::Class(c) => self.check_class(c),
            Declaration::Property(p) => self.check_property(p, owner),
            Declaration::TypeAlias(t) => {
                self.resolve(&t.target);
            }
        }
    }

    fn check_annotations(&mut self, modifiers: &Modifiers) {
        for annotation in &modifiers.annotations {
            if !self.index.is_annotation(&annotation.name) {
                self.error(
                    annotation.span,
                    format!("Unresolved reference: {}", annotation.name),
                );
            }
        }
    }

    fn check_explicit_api(&mut self, decl: &Declaration, owner: Option<&ClassDecl>) {
        let severity = match self.config.explicit_api {
            ExplicitApiMode::Disabled => return,
            ExplicitApiMode::Warning => CompilerMessageSeverity::Warning,
            ExplicitApiMode::Strict => CompilerMessageSeverity::Error,
        };
        let modifiers = decl.modifiers();
        let hidden_owner =
            owner.is_some_and(|c| c.modifiers.effective_visibility() != Visibility::Public);
        if modifiers.has("override") || hidden_owner {
            return;
        }
        if modifiers.visibility.is_none() {
            self.report(
                severity,
                decl.name_span(),
                "Visibility must be specified in explicit API mode",
            );
        }
        if modifiers.effective_visibility() != Visibility::Public {
            return;
        }
        let missing_type = match decl {
            Declaration::Function(f) => {
                f.return_type.is_none() && matches!(f.body, Some(FunctionBody::Expression(_)))
            }
            Declaration::Property(p) => p.ty.is_none(),
            Declaration::Class(_) | Declaration::TypeAlias(_) => false,
        };
        if missing_type {
            self.report(
                severity,
                decl.name_span(),
                "Return type must be specified in explicit API mode",
            );
        }
    }

    fn check_function(&mut self, f: &'a FunctionDecl, owner: Option<&'a ClassDecl>) {
        let saved_params = self.type_params.len();
        self.type_params
            .extend(f.type_params.iter().map(String::as_str));
        let receiver = f.receiver.as_ref().map(|ty| self.resolve(ty));
        let return_type = match (&f.return_type, &f.body) {
            (Some(ty), _) => self.resolve(ty),
            (None, Some(FunctionBody::Expression(_))) => Ty::Unknown,
            (None, _) => Ty::UNIT,
        };
        let composable = f.modifiers.has_annotation("Composable");

        self.with_scope(|this| {
            for param in &f.params {
                let ty = this.resolve(&param.ty);
                if let Some(default) = &param.default {
                    this.check_expr(default, &ty);
                }
                this.scopes.declare_param(&param.name, ty, param.span);
            }
            this.with_function(return_type.clone(), composable, receiver, |this| match &f.body {
                None => this.check_missing_body(f, owner),
                Some(FunctionBody::Expression(expr)) => {
                    if return_type == Ty::Unknown {
                        let ty = this.infer(expr, None);
                        this.inferred.push((f.name_span, ty));
                    } else {
                        this.check_expr(expr, &return_type);
                    }
                }
                Some(FunctionBody::Block(block)) => {
                    let result = this.check_block(block);
                    let needs_return = return_type != Ty::UNIT && return_type != Ty::Error;
                    if needs_return && result != Ty::NOTHING {
                        let end = Span::new(block.span.end.saturating_sub(1), block.span.end);
                        this.error(
                            end,
                            "A 'return' expression required in a function with a block body ('{...}')",
                        );
                    }
                }
            });
        });
        self.type_params.truncate(saved_params);
    }

    fn check_missing_body(&mut self, f: &FunctionDecl, owner: Option<&ClassDecl>) {
        if f.modifiers.has("external") || f.modifiers.has("abstract") {
            return;
        }
        match owner {
            Some(class) if class.kind == ClassKind::Interface => {}
            Some(_) => self.error(
                f.name_span,
                format!("Function '{}' without a body must be abstract", f.name),
            ),
            None => self.error(f.name_span, format!("Function '{}' must have a body", f.name)),
        }
    }

    fn check_class(&mut self, c: &'a ClassDecl) {
        let saved_params = self.type_params.len();
        self.type_params
            .extend(c.type_params.iter().map(String::as_str));
        for supertype in &c.supertypes {
            self.resolve(supertype);
        }
        let enclosing = self.class.replace(c);
        self.with_scope(|this| {
            for ctor in &c.ctor_params {
                this.check_annotations(&ctor.modifiers);
                let ty = this.resolve(&ctor.param.ty);
                if let Some(default) = &ctor.param.default {
                    this.check_expr(default, &ty);
                }
                this.scopes
                    .declare_param(&ctor.param.name, ty, ctor.param.span);
            }
            for member in &c.members {
                this.check_declaration(member, Some(c));
            }
        });
        self.class = enclosing;
        self.type_params.truncate(saved_params);
    }

    fn check_property(&mut self, p: &'a PropertyDecl, owner: Option<&'a ClassDecl>) {
        let declared = p.ty.as_ref().map(|ty| self.resolve(ty));
        let exempt = p.has_getter
            || p.modifiers.has("abstract")
            || p.modifiers.has("lateinit")
            || owner.is_some_and(|c| c.kind == ClassKind::Interface);
        match (&p.initializer, &declared) {
            (Some(init), Some(ty)) => self.check_expr(init, ty),
            (Some(init), None) => {
                let ty = self.infer(init, None);
                self.inferred.push((p.name_span, ty));
            }
            (None, _) if exempt => {}
            (None, None) => self.error(
                p.name_span,
                "This property must either have a type annotation, be initialized or be delegated",
            ),
            (None, Some(_)) => self.error(p.name_span, "Property must be initialized"),
        }
    }

    /// Resolve a written type, reporting every unresolved name in it.
    pub(crate) fn resolve(&mut self, ty: &TypeRef) -> Ty {
        for arg in &ty.args {
            self.resolve(arg);
        }
        let resolved = self.index.resolve_type(ty, &self.type_params);
        if resolved.contains_error() {
            self.error(
                ty.span,
                format!("Unresolved reference: {}", ty.short_name()),
            );
        }
        resolved
    }
}

/// Top-level names declared more than once across the project.
///
/// Classes and type aliases share one namespace, properties another;
/// functions conflict only when their parameter types match.
fn check_redeclarations(files: &[ParsedFile], sink: &mut MessageCollector) {
    type Places = Vec<(usize, Span)>;
    let mut classifiers: FxHashMap<&str, Places> = FxHashMap::default();
    let mut properties: FxHashMap<&str, Places> = FxHashMap::default();
    let mut signatures: FxHashMap<String, Places> = FxHashMap::default();

    for (file_idx, file) in files.iter().enumerate() {
        for decl in &file.declarations {
            let place = (file_idx, decl.name_span());
            match decl {
                Declaration::Class(_) | Declaration::TypeAlias(_) => {
                    classifiers.entry(decl.name()).or_default().push(place);
                }
                Declaration::Property(_) => {
                    properties.entry(decl.name()).or_default().push(place);
                }
                Declaration::Function(f) => {
                    signatures.entry(signature(f)).or_default().push(place);
                }
            }
        }
    }

    let named = classifiers
        .into_iter()
        .chain(properties)
        .map(|(name, places)| (format!("Redeclaration: {name}"), places));
    let overloads = signatures
        .into_iter()
        .map(|(signature, places)| (format!("Conflicting overloads: {signature}"), places));

    // Map iteration order is not stable; report in source order.
    let mut reports: Vec<(usize, Span, String)> = named
        .chain(overloads)
        .filter(|(_, places)| places.len() > 1)
        .flat_map(|(message, places)| {
            places
                .into_iter()
                .map(move |(file_idx, span)| (file_idx, span, message.clone()))
        })
        .collect();
    reports.sort_by_key(|(file_idx, span, _)| (*file_idx, span.start));
    for (file_idx, span, message) in reports {
        sink.error(message, Some(location(&files[file_idx], span)));
    }
}

/// `fun name(Int, String)` with the receiver, if any, in front.
fn signature(f: &FunctionDecl) -> String {
    let params: Vec<&str> = f.params.iter().map(|p| p.ty.name.as_str()).collect();
    match &f.receiver {
        Some(receiver) => format!("fun {}.{}({})", receiver.name, f.name, params.join(", ")),
        None => format!("fun {}({})", f.name, params.join(", ")),
    }
}
