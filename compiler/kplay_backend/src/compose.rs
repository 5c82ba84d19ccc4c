//! Compose IR dump.
//!
//! The checked project is printed back as source after the Compose
//! transform. Every `@Composable` function takes the composer and its change
//! flags, opens a group keyed by a stable hash and closes it on every exit.
//! Unit-returning functions are restartable: they may skip their body and
//! register an `updateScope` lambda that calls them again. Functions that
//! return a value use a replace group instead.

use std::hash::{Hash, Hasher};
use std::mem;

use kplay_analysis::{AnalysisContext, InferredTypes, LanguageFeatures, ProjectIndex};
use kplay_syntax::ast::{
    AssignOp, Block, ClassDecl, ClassKind, Declaration, Expr, ExprKind, FunctionBody,
    FunctionDecl, IntKind, Modifiers, Param, PropertyDecl, Stmt, StringPart, TypeRef, UnaryOp,
    Visibility,
};
use kplay_syntax::{ParsedFile, Span};
use rustc_hash::FxHasher;

use crate::artifact::ComposeIr;
use crate::pipeline::{
    diagnose_typed, Pipeline, PipelineError, PipelineFamily, PipelineResult, COMPILATION_FAILED,
};
use crate::writer::CodeWriter;

const INDENT: &str = "  ";

#[derive(Copy, Clone, Debug, Default)]
pub struct ComposeIrPipeline;

impl Pipeline for ComposeIrPipeline {
    type Artifact = ComposeIr;

    fn family(&self) -> PipelineFamily {
        PipelineFamily::ComposeIr
    }

    fn compile(&self, ctx: &AnalysisContext) -> Result<PipelineResult<ComposeIr>, PipelineError> {
        let (report, inferred) = diagnose_typed(ctx);
        if report.has_errors() {
            return Ok(PipelineResult::failure(report, COMPILATION_FAILED));
        }

        let index = ProjectIndex::new(ctx);
        let mut printer = Printer {
            index: &index,
            inferred: &inferred,
            features: ctx.configuration.features,
            w: CodeWriter::new(INDENT),
            file: "",
            composable: false,
            group: None,
        };
        for file in &ctx.files {
            printer.file(file);
        }
        let ir = printer.w.finish();
        tracing::debug!(
            bytes = ir.len(),
            features = ?ctx.configuration.features,
            "generated compose ir"
        );
        Ok(PipelineResult::success(ComposeIr { ir }, report))
    }
}

/// Group key: a 32-bit hash of where the function is declared.
pub(crate) fn group_key(file: &str, name: &str, offset: u32) -> i32 {
    let mut hasher = FxHasher::default();
    file.hash(&mut hasher);
    name.hash(&mut hasher);
    offset.hash(&mut hasher);
    let bytes = hasher.finish().to_le_bytes();
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// The group a composable function body is in.
#[derive(Clone, Debug)]
struct Group {
    restartable: bool,
    /// Call that re-runs the function from `updateScope`.
    restart_call: String,
    /// Temporaries for returned values.
    temps: usize,
}

struct Printer<'p, 'a> {
    index: &'p ProjectIndex<'a>,
    inferred: &'p InferredTypes,
    features: LanguageFeatures,
    w: CodeWriter,
    file: &'a str,
    /// `%composer` is in scope.
    composable: bool,
    group: Option<Group>,
}

impl<'a> Printer<'_, 'a> {
    /// Write possibly multi-line `text` at the current depth.
    fn emit(&mut self, text: &str) {
        for line in text.lines() {
            self.w.line(line);
        }
    }

    fn file(&mut self, file: &'a ParsedFile) {
        self.file = &file.name;
        self.w.line(&format!("// FILE: {}", file.name));
        if let Some(package) = &file.package {
            self.w.line(&format!("package {package}"));
        }
        for decl in &file.declarations {
            self.declaration(decl);
        }
    }

    fn declaration(&mut self, decl: &'a Declaration) {
        match decl {
            Declaration::Function(f) => self.function(f),
            Declaration::Class(c) => self.class(c),
            Declaration::Property(p) => self.property(p),
            Declaration::TypeAlias(t) => {
                let head = modifiers(&t.modifiers);
                self.w
                    .line(&format!("{head}typealias {} = {}", t.name, type_ref(&t.target)));
            }
        }
    }

    fn class(&mut self, class: &'a ClassDecl) {
        for annotation in &class.modifiers.annotations {
            self.w.line(&format!("@{}", annotation.name));
        }
        let keyword = match class.kind {
            ClassKind::Class => "class",
            ClassKind::Interface => "interface",
            ClassKind::Object => "object",
        };
        let mut head = format!("{}{keyword} {}", modifiers(&class.modifiers), class.name);
        if !class.type_params.is_empty() {
            head.push_str(&format!("<{}>", class.type_params.join(", ")));
        }
        if !class.ctor_params.is_empty() {
            let params: Vec<String> = class
                .ctor_params
                .iter()
                .map(|p| {
                    let binding = match p.property {
                        Some(true) => "var ",
                        Some(false) => "val ",
                        None => "",
                    };
                    format!("{}{binding}{}", modifiers(&p.modifiers), self.param(&p.param))
                })
                .collect();
            head.push_str(&format!("({})", params.join(", ")));
        }
        if !class.supertypes.is_empty() {
            let supertypes: Vec<String> = class.supertypes.iter().map(type_ref).collect();
            head.push_str(&format!(" : {}", supertypes.join(", ")));
        }
        if class.members.is_empty() {
            self.w.line(&head);
            return;
        }
        self.w.line(&format!("{head} {{"));
        self.w.indent();
        for member in &class.members {
            self.declaration(member);
        }
        self.w.dedent();
        self.w.line("}");
    }

    fn property(&mut self, p: &'a PropertyDecl) {
        let binding = if p.mutable { "var" } else { "val" };
        let mut line = format!("{}{binding} {}", modifiers(&p.modifiers), p.name);
        if let Some(ty) = self.declared_type(p.ty.as_ref(), p.name_span) {
            line.push_str(&format!(": {ty}"));
        }
        if let Some(init) = &p.initializer {
            line.push_str(&format!(" = {}", self.expr(init)));
        }
        self.emit(&line);
    }

    /// Written type, or the inferred one when it is known.
    fn declared_type(&self, ty: Option<&TypeRef>, name_span: Span) -> Option<String> {
        if let Some(ty) = ty {
            return Some(type_ref(ty));
        }
        self.inferred
            .get(self.file, name_span)
            .filter(|ty| !ty.is_opaque())
            .map(ToString::to_string)
    }

    fn param(&mut self, param: &'a Param) -> String {
        let vararg = if param.vararg { "vararg " } else { "" };
        let mut text = format!("{vararg}{}: {}", param.name, type_ref(&param.ty));
        if let Some(default) = &param.default {
            text.push_str(&format!(" = {}", self.expr(default)));
        }
        text
    }

    fn function(&mut self, f: &'a FunctionDecl) {
        for annotation in &f.modifiers.annotations {
            self.w.line(&format!("@{}", annotation.name));
        }
        let composable = f.modifiers.has_annotation("Composable");
        let result = self.declared_type(f.return_type.as_ref(), f.name_span);
        let returns_unit = result.as_deref().map_or(true, |ty| ty == "Unit");

        let mut head = format!("{}fun ", modifiers(&f.modifiers));
        if !f.type_params.is_empty() {
            head.push_str(&format!("<{}> ", f.type_params.join(", ")));
        }
        if let Some(receiver) = &f.receiver {
            head.push_str(&format!("{}.", type_ref(receiver)));
        }
        let mut params: Vec<String> = if composable {
            // Defaults move into the body behind `%default`.
            f.params
                .iter()
                .map(|p| format!("{}: {}", p.name, type_ref(&p.ty)))
                .collect()
        } else {
            f.params.iter().map(|p| self.param(p)).collect()
        };
        let has_defaults = f.params.iter().any(|p| p.default.is_some());
        if composable {
            params.push("%composer: Composer?".to_string());
            params.push("%changed: Int".to_string());
            if has_defaults {
                params.push("%default: Int".to_string());
            }
        }
        head.push_str(&format!("{}({})", f.name, params.join(", ")));
        if let Some(ty) = result.as_deref().filter(|_| !returns_unit) {
            head.push_str(&format!(": {ty}"));
        }

        let Some(body) = &f.body else {
            self.w.line(&head);
            return;
        };
        self.w.line(&format!("{head} {{"));
        self.w.indent();
        let outer = (self.composable, self.group.take());
        self.composable = composable;
        if composable {
            self.composable_body(f, body, returns_unit);
        } else {
            self.body(body, returns_unit);
        }
        (self.composable, self.group) = outer;
        self.w.dedent();
        self.w.line("}");
    }

    fn body(&mut self, body: &'a FunctionBody, returns_unit: bool) {
        match body {
            FunctionBody::Block(block) => self.statements(&block.statements),
            FunctionBody::Expression(value) if returns_unit => {
                let value = self.expr(value);
                self.emit(&value);
            }
            FunctionBody::Expression(value) => {
                let value = self.expr(value);
                self.emit(&format!("return {value}"));
            }
        }
    }

    fn composable_body(&mut self, f: &'a FunctionDecl, body: &'a FunctionBody, restartable: bool) {
        let key = group_key(self.file, &f.name, f.name_span.start);
        let mut args: Vec<String> = f.params.iter().map(|p| p.name.clone()).collect();
        args.push("%composer".to_string());
        args.push("updateChangedFlags(%changed or 0b0001)".to_string());
        if f.params.iter().any(|p| p.default.is_some()) {
            args.push("%default".to_string());
        }
        self.group = Some(Group {
            restartable,
            restart_call: format!("{}({})", f.name, args.join(", ")),
            temps: 0,
        });

        if restartable {
            self.w
                .line(&format!("%composer = %composer.startRestartGroup({key})"));
        } else {
            self.w.line(&format!("%composer.startReplaceGroup({key})"));
        }
        if self.features.contains(LanguageFeatures::SOURCE_INFORMATION) {
            self.w.line(&format!(
                "sourceInformation(%composer, \"C({}){}\")",
                f.name, self.file
            ));
        }

        // Without strong skipping only parameterless functions can skip
        // without comparing their arguments.
        let strong = self.features.contains(LanguageFeatures::STRONG_SKIPPING);
        let skipping = restartable && (strong || f.params.is_empty());
        if skipping {
            let condition = if strong {
                "%changed != 0"
            } else {
                "%changed and 0b0001 != 0"
            };
            self.w
                .line(&format!("if ({condition} || !%composer.skipping) {{"));
            self.w.indent();
        }
        for (bit, param) in f.params.iter().enumerate() {
            if let Some(default) = &param.default {
                let value = self.expr(default);
                self.emit(&format!(
                    "if (%default and 0b{:04b} != 0) {} = {value}",
                    1u64 << bit,
                    param.name
                ));
            }
        }
        match body {
            FunctionBody::Block(block) => self.statements(&block.statements),
            FunctionBody::Expression(value) if restartable => {
                let value = self.expr(value);
                self.emit(&value);
            }
            FunctionBody::Expression(value) => self.group_return(Some(value)),
        }
        if skipping {
            self.w.dedent();
            self.w.line("} else {");
            self.w.indent();
            self.w.line("%composer.skipToGroupEnd()");
            self.w.dedent();
            self.w.line("}");
        }
        if restartable {
            self.end_group();
        }
    }

    /// Close the current group.
    fn end_group(&mut self) {
        let Some(group) = &self.group else {
            return;
        };
        if group.restartable {
            let call = group.restart_call.clone();
            self.w.line(
                "%composer.endRestartGroup()?.updateScope { %composer: Composer?, %force: Int ->",
            );
            self.w.indent();
            self.w.line(&call);
            self.w.dedent();
            self.w.line("}");
        } else {
            self.w.line("%composer.endReplaceGroup()");
        }
    }

    /// `return` from inside a group: the group is closed first.
    fn group_return(&mut self, value: Option<&'a Expr>) {
        let temp = match self.group.as_mut() {
            Some(group) if !group.restartable => {
                group.temps += 1;
                Some(format!("tmp{}", group.temps - 1))
            }
            _ => None,
        };
        let returned = match (value, temp) {
            (Some(value), Some(temp)) => {
                let value = self.expr(value);
                self.emit(&format!("val {temp} = {value}"));
                Some(temp)
            }
            (Some(value), None) => Some(self.expr(value)),
            (None, _) => None,
        };
        self.end_group();
        match returned {
            Some(value) => self.emit(&format!("return {value}")),
            None => self.w.line("return"),
        }
    }

    fn statements(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Local(local) => {
                let binding = if local.mutable { "var" } else { "val" };
                let mut line = format!("{binding} {}", local.name);
                if let Some(ty) = &local.ty {
                    line.push_str(&format!(": {}", type_ref(ty)));
                }
                if let Some(init) = &local.initializer {
                    line.push_str(&format!(" = {}", self.expr(init)));
                }
                self.emit(&line);
            }
            Stmt::Expr(value) => {
                let value = self.expr(value);
                self.emit(&value);
            }
            Stmt::Return(value, _) if self.group.is_some() => self.group_return(value.as_ref()),
            Stmt::Return(Some(value), _) => {
                let value = self.expr(value);
                self.emit(&format!("return {value}"));
            }
            Stmt::Return(None, _) => self.w.line("return"),
            Stmt::Assign { target, op, value } => {
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::AddAssign => "+=",
                    AssignOp::SubAssign => "-=",
                };
                let line = format!("{} {op} {}", self.expr(target), self.expr(value));
                self.emit(&line);
            }
            Stmt::While { condition, body } => {
                let head = format!("while ({}) ", self.expr(condition));
                let body = self.block(body);
                self.emit(&format!("{head}{body}"));
            }
            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                let head = format!("for ({variable} in {}) ", self.expr(iterable));
                let body = self.block(body);
                self.emit(&format!("{head}{body}"));
            }
        }
    }

    /// `{ ... }` over several lines, indented relative to its first line.
    fn block(&mut self, block: &'a Block) -> String {
        self.block_with_head("{", block)
    }

    fn block_with_head(&mut self, head: &str, block: &'a Block) -> String {
        let outer = mem::replace(&mut self.w, CodeWriter::new(INDENT));
        self.w.indent();
        self.statements(&block.statements);
        let inner = mem::replace(&mut self.w, outer).finish();
        format!("{head}\n{inner}}}")
    }

    fn operand(&mut self, value: &'a Expr) -> String {
        let text = self.expr(value);
        match value.kind {
            ExprKind::Binary { .. } | ExprKind::If { .. } => format!("({text})"),
            _ => text,
        }
    }

    fn expr(&mut self, value: &'a Expr) -> String {
        match &value.kind {
            ExprKind::Int(v, kind) => match kind {
                IntKind::Int => v.to_string(),
                IntKind::Long => format!("{v}L"),
                IntKind::UInt => format!("{v}u"),
                IntKind::ULong => format!("{v}uL"),
            },
            ExprKind::Float(text) => text.clone(),
            ExprKind::Bool(v) => v.to_string(),
            ExprKind::Char(c) => format!("'{}'", escape(&c.to_string(), '\'')),
            ExprKind::Str(parts) => {
                let mut text = String::from("\"");
                for part in parts {
                    match part {
                        StringPart::Text(t) => text.push_str(&escape(t, '"')),
                        StringPart::Reference(name, _) => text.push_str(&format!("${{{name}}}")),
                        StringPart::Expression(inner) => {
                            let inner = self.expr(inner);
                            text.push_str(&format!("${{{inner}}}"));
                        }
                    }
                }
                text.push('"');
                text
            }
            ExprKind::Null => "null".to_string(),
            ExprKind::Name(name) => name.clone(),
            ExprKind::Call { callee, args } => {
                let mut values: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                if let ExprKind::Name(name) = &callee.kind {
                    if self.composable && self.index.is_composable(name) {
                        values.push("%composer".to_string());
                        values.push("0".to_string());
                    }
                }
                format!("{}({})", self.operand(callee), values.join(", "))
            }
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => {
                let dot = if *safe { "?." } else { "." };
                format!("{}{dot}{name}", self.operand(receiver))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                format!("{} {} {}", self.operand(lhs), op.symbol(), self.operand(rhs))
            }
            ExprKind::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::Plus => "+",
                };
                format!("{symbol}{}", self.operand(operand))
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.expr(condition);
                if let (Some(then_value), Some(else_value)) = (
                    single_expr(then_branch),
                    else_branch.as_ref().and_then(single_expr),
                ) {
                    return format!(
                        "if ({condition}) {} else {}",
                        self.expr(then_value),
                        self.expr(else_value)
                    );
                }
                let mut text = format!("if ({condition}) {}", self.block(then_branch));
                if let Some(else_branch) = else_branch {
                    text.push_str(&format!(" else {}", self.block(else_branch)));
                }
                text
            }
            ExprKind::Lambda { params, body } => {
                // A lambda body is not part of the enclosing group.
                let group = self.group.take();
                let arrow = if params.is_empty() {
                    String::new()
                } else {
                    format!(" {} ->", params.join(", "))
                };
                let text = match single_expr(body) {
                    Some(value) => {
                        let value = self.expr(value);
                        if arrow.is_empty() {
                            format!("{{ {value} }}")
                        } else {
                            format!("{{{arrow} {value} }}")
                        }
                    }
                    None => self.block_with_head(&format!("{{{arrow}"), body),
                };
                self.group = group;
                text
            }
        }
    }
}

fn single_expr(block: &Block) -> Option<&Expr> {
    match block.statements.as_slice() {
        [Stmt::Expr(value)] => Some(value),
        _ => None,
    }
}

/// Written modifiers as a prefix, each followed by a space.
fn modifiers(modifiers: &Modifiers) -> String {
    let mut out = String::new();
    if let Some(visibility) = modifiers.visibility {
        out.push_str(match visibility {
            Visibility::Public => "public ",
            Visibility::Internal => "internal ",
            Visibility::Protected => "protected ",
            Visibility::Private => "private ",
        });
    }
    for keyword in &modifiers.keywords {
        out.push_str(keyword);
        out.push(' ');
    }
    out
}

fn type_ref(ty: &TypeRef) -> String {
    let mut text = ty.name.clone();
    if !ty.args.is_empty() {
        let args: Vec<String> = ty.args.iter().map(type_ref).collect();
        text.push_str(&format!("<{}>", args.join(", ")));
    }
    if ty.nullable {
        text.push('?');
    }
    text
}

fn escape(text: &str, quote: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '$' => out.push_str("\\$"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}
