//! Script printed straight from the declaration trees.

use kplay_analysis::types::Prim;
use kplay_analysis::{AnalysisContext, InferredTypes, ProjectIndex};
use kplay_syntax::ast::{
    AssignOp, BinaryOp, Block, ClassDecl, ClassKind, Declaration, Expr, ExprKind, FunctionBody,
    FunctionDecl, Param, Stmt, StringPart, UnaryOp,
};
use rustc_hash::FxHashSet;

use super::{comma_separated, ident, quote, Entry, JsWriter};

pub(super) fn print(
    ctx: &AnalysisContext,
    index: &ProjectIndex<'_>,
    inferred: &InferredTypes,
    w: &mut JsWriter,
) -> Entry {
    let mut printer = Printer {
        index,
        inferred,
        file: String::new(),
        w,
        scopes: Vec::new(),
        members: FxHashSet::default(),
    };
    let mut entry = Entry::None;
    for file in &ctx.files {
        printer.file.clone_from(&file.name);
        for decl in &file.declarations {
            match decl {
                Declaration::Function(f) if f.receiver.is_none() => {
                    let name = ident(&f.name);
                    printer.function(&format!("function {name}"), f, "");
                    printer.w.line(&format!("_.{name} = {name};"));
                    if f.name == "main" && entry == Entry::None {
                        entry = match f.params.len() {
                            0 => Entry::NoArgs,
                            _ => Entry::Args,
                        };
                    }
                }
                Declaration::Class(c) if c.kind != ClassKind::Interface => printer.class(c),
                Declaration::Property(p) => {
                    let name = ident(&p.name);
                    match &p.initializer {
                        Some(init) => {
                            let value = printer.expr(init);
                            printer.w.line(&format!("var {name} = {value};"));
                        }
                        None => printer.w.line(&format!("var {name};")),
                    }
                }
                Declaration::Function(_) | Declaration::Class(_) | Declaration::TypeAlias(_) => {}
            }
        }
    }
    entry
}

struct Printer<'p, 'a> {
    index: &'p ProjectIndex<'a>,
    inferred: &'p InferredTypes,
    /// File whose declarations are being printed.
    file: String,
    w: &'p mut JsWriter,
    scopes: Vec<FxHashSet<String>>,
    /// Member names of the class being printed.
    members: FxHashSet<String>,
}

impl Printer<'_, '_> {
    fn class(&mut self, c: &ClassDecl) {
        let name = ident(&c.name);
        let ctor = if c.kind == ClassKind::Object {
            format!("{name}$Object")
        } else {
            name.clone()
        };

        self.members = c
            .ctor_params
            .iter()
            .filter(|p| p.property.is_some())
            .map(|p| p.param.name.clone())
            .chain(c.members.iter().filter_map(|m| match m {
                Declaration::Property(p) => Some(p.name.clone()),
                Declaration::Function(f) if f.receiver.is_none() => Some(f.name.clone()),
                _ => None,
            }))
            .collect();

        let params: Vec<String> = c.ctor_params.iter().map(|p| ident(&p.param.name)).collect();
        self.w
            .line(&format!("function {ctor}({}) {{", params.join(", ")));
        self.w.indent();
        self.scopes
            .push(c.ctor_params.iter().map(|p| p.param.name.clone()).collect());
        for param in &c.ctor_params {
            if param.property.is_some() {
                let field = ident(&param.param.name);
                self.w.line(&format!("this.{field} = {field};"));
            }
        }
        for member in &c.members {
            if let Declaration::Property(p) = member {
                let value = match &p.initializer {
                    Some(init) => self.expr(init),
                    None => "undefined".to_string(),
                };
                self.w.line(&format!("this.{} = {value};", ident(&p.name)));
            }
        }
        self.scopes.pop();
        self.w.dedent();
        self.w.line("}");

        for member in &c.members {
            if let Declaration::Function(f) = member {
                if f.receiver.is_none() && f.body.is_some() {
                    let head = format!("{ctor}.prototype.{} = function ", ident(&f.name));
                    self.function(&head, f, ";");
                }
            }
        }
        if c.kind == ClassKind::Object {
            self.w.line(&format!("var {name} = new {ctor}();"));
        }
        self.w.line(&format!("_.{name} = {name};"));
        self.members.clear();
    }

    fn function(&mut self, head: &str, f: &FunctionDecl, terminator: &str) {
        let params = comma_separated(f.params.iter().map(param));
        self.w.line(&format!("{head}({params}) {{"));
        self.w.indent();
        self.scopes
            .push(f.params.iter().map(|p| p.name.clone()).collect());
        for p in &f.params {
            if let Some(default) = &p.default {
                let value = self.expr(default);
                let name = ident(&p.name);
                self.w
                    .line(&format!("if ({name} === undefined) {name} = {value};"));
            }
        }
        match &f.body {
            Some(FunctionBody::Block(block)) => self.statements(&block.statements),
            Some(FunctionBody::Expression(expr)) => {
                let value = self.expr(expr);
                self.w.line(&format!("return {value};"));
            }
            None => {}
        }
        self.scopes.pop();
        self.w.dedent();
        self.w.line(&format!("}}{terminator}"));
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn block(&mut self, block: &Block) {
        self.w.indent();
        self.scopes.push(FxHashSet::default());
        self.statements(&block.statements);
        self.scopes.pop();
        self.w.dedent();
    }

    fn statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.statement(stmt);
        }
    }

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local(local) => {
                let keyword = if local.mutable { "let" } else { "const" };
                let name = ident(&local.name);
                let line = match &local.initializer {
                    Some(init) => format!("{keyword} {name} = {};", self.expr(init)),
                    // `const` needs an initializer.
                    None => format!("let {name};"),
                };
                self.declare(&local.name);
                self.w.line(&line);
            }
            Stmt::Expr(Expr {
                kind:
                    ExprKind::If {
                        condition,
                        then_branch,
                        else_branch,
                    },
                ..
            }) => {
                let condition = self.expr(condition);
                self.w.line(&format!("if ({condition}) {{"));
                self.block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.w.line("} else {");
                    self.block(else_branch);
                }
                self.w.line("}");
            }
            Stmt::Expr(expr) => {
                let value = self.expr(expr);
                self.w.line(&format!("{value};"));
            }
            Stmt::Return(Some(value), _) => {
                let value = self.expr(value);
                self.w.line(&format!("return {value};"));
            }
            Stmt::Return(None, _) => self.w.line("return;"),
            Stmt::Assign { target, op, value } => {
                let target = self.expr(target);
                let value = self.expr(value);
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::AddAssign => "+=",
                    AssignOp::SubAssign => "-=",
                };
                self.w.line(&format!("{target} {op} {value};"));
            }
            Stmt::While { condition, body } => {
                let condition = self.expr(condition);
                self.w.line(&format!("while ({condition}) {{"));
                self.block(body);
                self.w.line("}");
            }
            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                let name = ident(variable);
                let head = match &iterable.kind {
                    ExprKind::Binary {
                        op: BinaryOp::Range,
                        lhs,
                        rhs,
                    } => {
                        let from = self.expr(lhs);
                        let to = self.expr(rhs);
                        format!(
                            "for (let {name} = {from}, {name}$last = {to}; \
                             {name} <= {name}$last; {name}++) {{"
                        )
                    }
                    _ => format!("for (const {name} of {}) {{", self.expr(iterable)),
                };
                self.w.line(&head);
                self.scopes.push(std::iter::once(variable.clone()).collect());
                self.block(body);
                self.scopes.pop();
                self.w.line("}");
            }
        }
    }

    fn name(&self, name: &str) -> String {
        if name == "this" {
            "this".to_string()
        } else if !self.is_local(name) && self.members.contains(name) {
            format!("this.{}", ident(name))
        } else {
            ident(name)
        }
    }

    fn integer_division(&self, lhs: &Expr, rhs: &Expr) -> Option<Prim> {
        self.inferred
            .integer_division(&self.file, lhs.span, rhs.span)
    }

    /// `expr`, parenthesized when it would bind loosely as an operand.
    fn operand(&mut self, expr: &Expr) -> String {
        let text = self.expr(expr);
        match &expr.kind {
            ExprKind::Binary {
                op: BinaryOp::Div,
                lhs,
                rhs,
            } if self.integer_division(lhs, rhs).is_some() => text,
            ExprKind::Binary { .. } | ExprKind::If { .. } | ExprKind::Lambda { .. } => {
                format!("({text})")
            }
            _ => text,
        }
    }

    fn args(&mut self, args: &[Expr]) -> String {
        let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
        args.join(", ")
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Int(value, _) => value.to_string(),
            ExprKind::Float(text) => text.trim_end_matches(['f', 'F']).to_string(),
            ExprKind::Bool(value) => value.to_string(),
            ExprKind::Char(c) => quote(&c.to_string()),
            ExprKind::Str(parts) => self.template(parts),
            ExprKind::Null => "null".to_string(),
            ExprKind::Name(name) => self.name(name),
            ExprKind::Call { callee, args } => {
                let args = self.args(args);
                match &callee.kind {
                    ExprKind::Name(name) if !self.is_local(name) => match self.index.class(name) {
                        Some(class) if class.kind == ClassKind::Class => {
                            format!("new {}({args})", ident(name))
                        }
                        _ => format!("{}({args})", self.name(name)),
                    },
                    ExprKind::Member {
                        receiver,
                        name,
                        safe,
                    } => {
                        let receiver = self.operand(receiver);
                        let dot = if *safe { "?." } else { "." };
                        format!("{receiver}{dot}{}({args})", ident(name))
                    }
                    _ => format!("{}({args})", self.operand(callee)),
                }
            }
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => {
                let receiver = self.operand(receiver);
                let dot = if *safe { "?." } else { "." };
                format!("{receiver}{dot}{}", ident(name))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let division = match op {
                    BinaryOp::Div => self.integer_division(lhs, rhs),
                    _ => None,
                };
                let lhs = self.operand(lhs);
                let rhs = self.operand(rhs);
                match (op, division) {
                    (BinaryOp::Range, _) => format!("$rangeTo({lhs}, {rhs})"),
                    (_, Some(Prim::Long | Prim::ULong)) => format!("Math.trunc({lhs} / {rhs})"),
                    (_, Some(_)) => format!("({lhs} / {rhs} | 0)"),
                    (_, None) => format!("{lhs} {} {rhs}", binary_op(*op)),
                }
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.operand(operand);
                match op {
                    UnaryOp::Neg => format!("-{operand}"),
                    UnaryOp::Not => format!("!{operand}"),
                    UnaryOp::Plus => format!("+{operand}"),
                }
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.operand(condition);
                match (single_expr(then_branch), else_branch.as_ref().and_then(single_expr)) {
                    (Some(then_value), Some(else_value)) => {
                        let then_value = self.operand(then_value);
                        let else_value = self.operand(else_value);
                        format!("{condition} ? {then_value} : {else_value}")
                    }
                    _ => {
                        let then_body = self.value_block(then_branch);
                        let else_body = match else_branch {
                            Some(block) => self.value_block(block),
                            None => "{ }".to_string(),
                        };
                        format!("(() => {{ if ({condition}) {then_body} else {else_body} }})()")
                    }
                }
            }
            ExprKind::Lambda { params, body } => {
                let params: Vec<String> = if params.is_empty() {
                    vec!["it".to_string()]
                } else {
                    params.clone()
                };
                let names = comma_separated(params.iter().map(|p| ident(p)));
                self.scopes.push(params.into_iter().collect());
                let text = match single_expr(body) {
                    Some(value) => format!("({names}) => {}", self.operand(value)),
                    None => format!("({names}) => {}", self.value_block(body)),
                };
                self.scopes.pop();
                text
            }
        }
    }

    /// A block printed inline, returning its trailing expression.
    fn value_block(&mut self, block: &Block) -> String {
        let mut inner = JsWriter::new(super::INDENT);
        let mut nested = Printer {
            index: self.index,
            inferred: self.inferred,
            file: self.file.clone(),
            w: &mut inner,
            scopes: self.scopes.clone(),
            members: self.members.clone(),
        };
        nested.scopes.push(FxHashSet::default());
        match block.statements.split_last() {
            Some((Stmt::Expr(last), init)) => {
                nested.statements(init);
                let value = nested.expr(last);
                nested.w.line(&format!("return {value};"));
            }
            _ => nested.statements(&block.statements),
        }
        let body = inner.finish();
        let lines: Vec<&str> = body.lines().map(str::trim).collect();
        format!("{{ {} }}", lines.join(" "))
    }

    fn template(&mut self, parts: &[StringPart]) -> String {
        match parts {
            [] => quote(""),
            [StringPart::Text(text)] => quote(text),
            _ => {
                let mut out = String::from("`");
                for part in parts {
                    match part {
                        StringPart::Text(text) => {
                            for c in text.chars() {
                                match c {
                                    '`' => out.push_str("\\`"),
                                    '\\' => out.push_str("\\\\"),
                                    '$' => out.push_str("\\$"),
                                    c => out.push(c),
                                }
                            }
                        }
                        StringPart::Reference(name, _) => {
                            out.push_str("${");
                            out.push_str(&self.name(name));
                            out.push('}');
                        }
                        StringPart::Expression(value) => {
                            let value = self.expr(value);
                            out.push_str("${");
                            out.push_str(&value);
                            out.push('}');
                        }
                    }
                }
                out.push('`');
                out
            }
        }
    }
}

fn param(p: &Param) -> String {
    if p.vararg {
        format!("...{}", ident(&p.name))
    } else {
        ident(&p.name)
    }
}

/// The expression of a block that consists of exactly one.
fn single_expr(block: &Block) -> Option<&Expr> {
    match block.statements.as_slice() {
        [Stmt::Expr(expr)] => Some(expr),
        _ => None,
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Elvis => "??",
        other => other.symbol(),
    }
}
