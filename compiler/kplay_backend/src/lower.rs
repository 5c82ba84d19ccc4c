//! Lowering of checked declaration trees into a small target-neutral module.
//!
//! The lowered form has no string templates, no compound assignment and no
//! range loops: those are desugared here once, so the JS IR printer and the
//! wasm emitter only deal with plain statements and expressions. Names are
//! classified as locals, globals or fields of `this`.

use kplay_analysis::types::Prim;
use kplay_analysis::{AnalysisContext, InferredTypes, ProjectIndex};
use kplay_syntax::ast::{
    AssignOp, BinaryOp, Block, ClassDecl, ClassKind, Declaration, Expr, ExprKind, FunctionBody,
    FunctionDecl, IntKind, Stmt, StringPart, TypeRef, UnaryOp,
};
use kplay_syntax::ParsedFile;
use rustc_hash::FxHashSet;

/// Machine-level shape of a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Unit,
    I32,
    I64,
    F32,
    F64,
    /// Anything boxed: strings, objects, nullable values.
    Ref,
}

impl ValueKind {
    pub fn of(ty: Option<&TypeRef>) -> ValueKind {
        let Some(ty) = ty else {
            return ValueKind::Ref;
        };
        if ty.nullable {
            return ValueKind::Ref;
        }
        match ty.short_name() {
            "Unit" => ValueKind::Unit,
            "Int" | "Short" | "Byte" | "Char" | "Boolean" | "UInt" | "UShort" | "UByte" => {
                ValueKind::I32
            }
            "Long" | "ULong" => ValueKind::I64,
            "Float" => ValueKind::F32,
            "Double" => ValueKind::F64,
            _ => ValueKind::Ref,
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(self, ValueKind::I32 | ValueKind::I64)
    }

    fn of_integer(prim: Prim) -> ValueKind {
        match prim {
            Prim::Long | Prim::ULong => ValueKind::I64,
            _ => ValueKind::I32,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoweredParam {
    pub name: String,
    pub kind: ValueKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoweredFunction {
    pub name: String,
    pub params: Vec<LoweredParam>,
    pub result: ValueKind,
    pub body: Vec<LStmt>,
    /// Declaring file and 1-based line of the name.
    pub file: String,
    pub line: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoweredGlobal {
    pub name: String,
    pub init: Option<LExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoweredClass {
    pub name: String,
    pub is_object: bool,
    /// Primary constructor parameters, in order.
    pub params: Vec<String>,
    /// Parameters that are also properties.
    pub fields: Vec<String>,
    /// Body properties with their initializers.
    pub properties: Vec<LoweredGlobal>,
    pub methods: Vec<LoweredFunction>,
}

/// A whole project after lowering, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoweredModule {
    pub globals: Vec<LoweredGlobal>,
    pub classes: Vec<LoweredClass>,
    pub functions: Vec<LoweredFunction>,
}

impl LoweredModule {
    pub fn function(&self, name: &str) -> Option<&LoweredFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// A `main` without parameters exists.
    pub fn has_main(&self) -> bool {
        self.functions
            .iter()
            .any(|f| f.name == "main" && f.params.is_empty())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LBinOp {
    Add,
    Sub,
    Mul,
    Div,
    /// `lhs / rhs` between integers of the given kind, truncating toward
    /// zero.
    IntDiv(ValueKind),
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    /// `lhs ?: rhs`.
    Elvis,
    /// `lhs..rhs` outside of a loop header.
    Range,
}

impl LBinOp {
    fn from_ast(op: BinaryOp) -> LBinOp {
        match op {
            BinaryOp::Add => LBinOp::Add,
            BinaryOp::Sub => LBinOp::Sub,
            BinaryOp::Mul => LBinOp::Mul,
            BinaryOp::Div => LBinOp::Div,
            BinaryOp::Rem => LBinOp::Rem,
            BinaryOp::Eq => LBinOp::Eq,
            BinaryOp::NotEq => LBinOp::NotEq,
            BinaryOp::Lt => LBinOp::Lt,
            BinaryOp::Gt => LBinOp::Gt,
            BinaryOp::LtEq => LBinOp::LtEq,
            BinaryOp::GtEq => LBinOp::GtEq,
            BinaryOp::And => LBinOp::And,
            BinaryOp::Or => LBinOp::Or,
            BinaryOp::Range => LBinOp::Range,
            BinaryOp::Elvis => LBinOp::Elvis,
        }
    }
}

/// Statements plus an optional result value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LBlock {
    pub statements: Vec<LStmt>,
    pub value: Option<Box<LExpr>>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LExpr {
    Int(i64),
    Long(i64),
    /// Source text of the literal, suffix stripped.
    Float(String),
    Bool(bool),
    Char(char),
    Str(String),
    Null,
    Local(String),
    Global(String),
    This,
    /// Call of a top-level or library function.
    Call {
        callee: String,
        args: Vec<LExpr>,
    },
    /// Call of a function-typed value.
    Invoke {
        callee: Box<LExpr>,
        args: Vec<LExpr>,
    },
    New {
        class: String,
        args: Vec<LExpr>,
    },
    MethodCall {
        receiver: Box<LExpr>,
        name: String,
        args: Vec<LExpr>,
        safe: bool,
    },
    Field {
        receiver: Box<LExpr>,
        name: String,
        safe: bool,
    },
    Binary {
        op: LBinOp,
        lhs: Box<LExpr>,
        rhs: Box<LExpr>,
    },
    Not(Box<LExpr>),
    Neg(Box<LExpr>),
    /// String concatenation produced from templates.
    Concat(Vec<LExpr>),
    If {
        condition: Box<LExpr>,
        then_branch: LBlock,
        else_branch: LBlock,
    },
    Lambda {
        params: Vec<String>,
        body: LBlock,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LStmt {
    Let {
        name: String,
        value: Option<LExpr>,
    },
    Assign {
        target: LExpr,
        value: LExpr,
    },
    Expr(LExpr),
    Return(Option<LExpr>),
    If {
        condition: LExpr,
        then_branch: Vec<LStmt>,
        else_branch: Vec<LStmt>,
    },
    While {
        condition: LExpr,
        body: Vec<LStmt>,
    },
    ForEach {
        variable: String,
        iterable: LExpr,
        body: Vec<LStmt>,
    },
    /// Statements whose declarations do not leak out.
    Scope(Vec<LStmt>),
}

/// Lower every file of `ctx`. Extension functions and interfaces have no
/// lowered form and are skipped.
///
/// `inferred` comes from checking the same context and tells integer
/// division apart from floating point division.
pub fn lower(ctx: &AnalysisContext, inferred: &InferredTypes) -> LoweredModule {
    let index = ProjectIndex::new(ctx);
    let mut module = LoweredModule::default();
    for file in &ctx.files {
        let lowerer = Lowerer {
            index: &index,
            inferred,
            file,
            locals: Vec::new(),
            fields: FxHashSet::default(),
        };
        lowerer.lower_file(&mut module);
    }
    tracing::debug!(
        functions = module.functions.len(),
        classes = module.classes.len(),
        "lowered module"
    );
    module
}

struct Lowerer<'i, 'a> {
    index: &'i ProjectIndex<'a>,
    inferred: &'i InferredTypes,
    file: &'a ParsedFile,
    /// Innermost scope last.
    locals: Vec<FxHashSet<String>>,
    /// Members of the class whose methods are being lowered.
    fields: FxHashSet<String>,
}

impl Lowerer<'_, '_> {
    fn lower_file(mut self, module: &mut LoweredModule) {
        let file = self.file;
        for decl in &file.declarations {
            match decl {
                Declaration::Function(f) if f.receiver.is_none() => {
                    let lowered = self.lower_function(f);
                    module.functions.push(lowered);
                }
                Declaration::Class(c) if c.kind != ClassKind::Interface => {
                    let lowered = self.lower_class(c);
                    module.classes.push(lowered);
                }
                Declaration::Property(p) => {
                    let init = p.initializer.as_ref().map(|e| self.lower_expr(e));
                    module.globals.push(LoweredGlobal {
                        name: p.name.clone(),
                        init,
                    });
                }
                Declaration::Function(_) | Declaration::Class(_) | Declaration::TypeAlias(_) => {}
            }
        }
    }

    fn lower_class(&mut self, c: &ClassDecl) -> LoweredClass {
        let fields: Vec<String> = c
            .ctor_params
            .iter()
            .filter(|p| p.property.is_some())
            .map(|p| p.param.name.clone())
            .collect();
        self.fields = fields.iter().cloned().collect();
        for member in &c.members {
            match member {
                Declaration::Property(p) => {
                    self.fields.insert(p.name.clone());
                }
                Declaration::Function(f) if f.receiver.is_none() => {
                    self.fields.insert(f.name.clone());
                }
                _ => {}
            }
        }

        // Property initializers see constructor parameters.
        self.locals
            .push(c.ctor_params.iter().map(|p| p.param.name.clone()).collect());
        let properties = c
            .members
            .iter()
            .filter_map(|m| match m {
                Declaration::Property(p) => Some(LoweredGlobal {
                    name: p.name.clone(),
                    init: p.initializer.as_ref().map(|e| self.lower_expr(e)),
                }),
                _ => None,
            })
            .collect();
        self.locals.pop();

        let methods = c
            .members
            .iter()
            .filter_map(|m| match m {
                Declaration::Function(f) if f.receiver.is_none() => Some(self.lower_function(f)),
                _ => None,
            })
            .collect();
        self.fields.clear();

        LoweredClass {
            name: c.name.clone(),
            is_object: c.kind == ClassKind::Object,
            params: c.ctor_params.iter().map(|p| p.param.name.clone()).collect(),
            fields,
            properties,
            methods,
        }
    }

    fn lower_function(&mut self, f: &FunctionDecl) -> LoweredFunction {
        let params: Vec<LoweredParam> = f
            .params
            .iter()
            .map(|p| LoweredParam {
                name: p.name.clone(),
                kind: ValueKind::of(Some(&p.ty)),
            })
            .collect();
        let result = match (&f.return_type, &f.body) {
            (Some(ty), _) => ValueKind::of(Some(ty)),
            // Untyped expression bodies: only integer results are tracked.
            (None, Some(FunctionBody::Expression(expr))) => expression_kind(expr, &params),
            (None, _) => ValueKind::Unit,
        };

        self.locals
            .push(params.iter().map(|p| p.name.clone()).collect());
        let body = match &f.body {
            Some(FunctionBody::Block(block)) => self.lower_statements(&block.statements),
            Some(FunctionBody::Expression(expr)) => {
                let value = self.lower_expr(expr);
                if result == ValueKind::Unit {
                    vec![LStmt::Expr(value)]
                } else {
                    vec![LStmt::Return(Some(value))]
                }
            }
            None => Vec::new(),
        };
        self.locals.pop();

        let (line, _) = self.file.line_col(f.name_span);
        LoweredFunction {
            name: f.name.clone(),
            params,
            result,
            body,
            file: self.file.name.clone(),
            line,
        }
    }

    fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.locals.push(FxHashSet::default());
        let result = f(self);
        self.locals.pop();
        result
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|scope| scope.contains(name))
    }

    fn lower_block(&mut self, block: &Block) -> Vec<LStmt> {
        self.with_scope(|this| this.lower_statements(&block.statements))
    }

    /// A block used as a value: the trailing expression statement becomes
    /// the result.
    fn lower_value_block(&mut self, block: &Block) -> LBlock {
        self.with_scope(|this| match block.statements.split_last() {
            Some((Stmt::Expr(last), init)) => {
                let statements = this.lower_statements(init);
                let value = this.lower_expr(last);
                LBlock {
                    statements,
                    value: Some(Box::new(value)),
                }
            }
            _ => LBlock {
                statements: this.lower_statements(&block.statements),
                value: None,
            },
        })
    }

    fn lower_statements(&mut self, statements: &[Stmt]) -> Vec<LStmt> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.lower_statement(stmt, &mut out);
        }
        out
    }

    fn lower_statement(&mut self, stmt: &Stmt, out: &mut Vec<LStmt>) {
        match stmt {
            Stmt::Local(local) => {
                let value = local.initializer.as_ref().map(|e| self.lower_expr(e));
                self.declare(&local.name);
                out.push(LStmt::Let {
                    name: local.name.clone(),
                    value,
                });
            }
            Stmt::Expr(expr) => match &expr.kind {
                ExprKind::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let condition = self.lower_expr(condition);
                    let then_branch = self.lower_block(then_branch);
                    let else_branch = else_branch
                        .as_ref()
                        .map(|b| self.lower_block(b))
                        .unwrap_or_default();
                    out.push(LStmt::If {
                        condition,
                        then_branch,
                        else_branch,
                    });
                }
                _ => out.push(LStmt::Expr(self.lower_expr(expr))),
            },
            Stmt::Return(value, _) => {
                let value = value.as_ref().map(|e| self.lower_expr(e));
                out.push(LStmt::Return(value));
            }
            Stmt::Assign { target, op, value } => {
                let target = self.lower_expr(target);
                let rhs = self.lower_expr(value);
                let value = match op {
                    AssignOp::Assign => rhs,
                    AssignOp::AddAssign => binary(LBinOp::Add, target.clone(), rhs),
                    AssignOp::SubAssign => binary(LBinOp::Sub, target.clone(), rhs),
                };
                out.push(LStmt::Assign { target, value });
            }
            Stmt::While { condition, body } => {
                let condition = self.lower_expr(condition);
                let body = self.lower_block(body);
                out.push(LStmt::While { condition, body });
            }
            Stmt::For {
                variable,
                iterable,
                body,
            } => self.lower_for(variable, iterable, body, out),
        }
    }

    /// `for (i in a..b)` becomes a counting `while`; anything else stays a
    /// for-each over the iterable.
    fn lower_for(&mut self, variable: &str, iterable: &Expr, body: &Block, out: &mut Vec<LStmt>) {
        if let ExprKind::Binary {
            op: BinaryOp::Range,
            lhs,
            rhs,
        } = &iterable.kind
        {
            let start = self.lower_expr(lhs);
            let end = self.lower_expr(rhs);
            let last = format!("{variable}$last");
            let mut lowered = self.with_scope(|this| {
                this.declare(variable);
                this.declare(&last);
                this.lower_statements(&body.statements)
            });
            let counter = LExpr::Local(variable.to_string());
            lowered.push(LStmt::Assign {
                target: counter.clone(),
                value: binary(LBinOp::Add, counter.clone(), LExpr::Int(1)),
            });
            out.push(LStmt::Scope(vec![
                LStmt::Let {
                    name: variable.to_string(),
                    value: Some(start),
                },
                LStmt::Let {
                    name: last.clone(),
                    value: Some(end),
                },
                LStmt::While {
                    condition: binary(LBinOp::LtEq, counter, LExpr::Local(last)),
                    body: lowered,
                },
            ]));
            return;
        }

        let iterable = self.lower_expr(iterable);
        let body = self.with_scope(|this| {
            this.declare(variable);
            this.lower_statements(&body.statements)
        });
        out.push(LStmt::ForEach {
            variable: variable.to_string(),
            iterable,
            body,
        });
    }

    fn lower_name(&self, name: &str) -> LExpr {
        if self.is_local(name) {
            LExpr::Local(name.to_string())
        } else if self.fields.contains(name) {
            LExpr::Field {
                receiver: Box::new(LExpr::This),
                name: name.to_string(),
                safe: false,
            }
        } else {
            LExpr::Global(name.to_string())
        }
    }

    fn lower_exprs(&mut self, exprs: &[Expr]) -> Vec<LExpr> {
        exprs.iter().map(|e| self.lower_expr(e)).collect()
    }

    fn lower_expr(&mut self, expr: &Expr) -> LExpr {
        match &expr.kind {
            ExprKind::Int(value, IntKind::Int | IntKind::UInt) => LExpr::Int(*value),
            ExprKind::Int(value, IntKind::Long | IntKind::ULong) => LExpr::Long(*value),
            ExprKind::Float(text) => {
                LExpr::Float(text.trim_end_matches(['f', 'F']).to_string())
            }
            ExprKind::Bool(value) => LExpr::Bool(*value),
            ExprKind::Char(value) => LExpr::Char(*value),
            ExprKind::Str(parts) => self.lower_template(parts),
            ExprKind::Null => LExpr::Null,
            ExprKind::Name(name) if name == "this" => LExpr::This,
            ExprKind::Name(name) => self.lower_name(name),
            ExprKind::Call { callee, args } => self.lower_call(callee, args),
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => LExpr::Field {
                receiver: Box::new(self.lower_expr(receiver)),
                name: name.clone(),
                safe: *safe,
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let division = self
                    .inferred
                    .integer_division(&self.file.name, lhs.span, rhs.span);
                let op = match (op, division) {
                    (BinaryOp::Div, Some(prim)) => LBinOp::IntDiv(ValueKind::of_integer(prim)),
                    _ => LBinOp::from_ast(*op),
                };
                let lhs = self.lower_expr(lhs);
                let rhs = self.lower_expr(rhs);
                binary(op, lhs, rhs)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand);
                match op {
                    UnaryOp::Neg => LExpr::Neg(Box::new(operand)),
                    UnaryOp::Not => LExpr::Not(Box::new(operand)),
                    UnaryOp::Plus => operand,
                }
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => LExpr::If {
                condition: Box::new(self.lower_expr(condition)),
                then_branch: self.lower_value_block(then_branch),
                else_branch: else_branch
                    .as_ref()
                    .map(|b| self.lower_value_block(b))
                    .unwrap_or_default(),
            },
            ExprKind::Lambda { params, body } => {
                let params = if params.is_empty() {
                    vec!["it".to_string()]
                } else {
                    params.clone()
                };
                let body = self.with_scope(|this| {
                    for param in &params {
                        this.declare(param);
                    }
                    this.lower_value_block(body)
                });
                LExpr::Lambda { params, body }
            }
        }
    }

    fn lower_template(&mut self, parts: &[StringPart]) -> LExpr {
        match parts {
            [] => LExpr::Str(String::new()),
            [StringPart::Text(text)] => LExpr::Str(text.clone()),
            _ => LExpr::Concat(
                parts
                    .iter()
                    .map(|part| match part {
                        StringPart::Text(text) => LExpr::Str(text.clone()),
                        StringPart::Reference(name, _) => self.lower_name(name),
                        StringPart::Expression(value) => self.lower_expr(value),
                    })
                    .collect(),
            ),
        }
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Expr]) -> LExpr {
        let args = self.lower_exprs(args);
        match &callee.kind {
            ExprKind::Name(name) if self.is_local(name) => LExpr::Invoke {
                callee: Box::new(LExpr::Local(name.clone())),
                args,
            },
            ExprKind::Name(name) if self.fields.contains(name.as_str()) => LExpr::MethodCall {
                receiver: Box::new(LExpr::This),
                name: name.clone(),
                args,
                safe: false,
            },
            ExprKind::Name(name) => match self.index.class(name) {
                Some(class) if class.kind == ClassKind::Class => LExpr::New {
                    class: name.clone(),
                    args,
                },
                _ => LExpr::Call {
                    callee: name.clone(),
                    args,
                },
            },
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => LExpr::MethodCall {
                receiver: Box::new(self.lower_expr(receiver)),
                name: name.clone(),
                args,
                safe: *safe,
            },
            _ => LExpr::Invoke {
                callee: Box::new(self.lower_expr(callee)),
                args,
            },
        }
    }
}

fn binary(op: LBinOp, lhs: LExpr, rhs: LExpr) -> LExpr {
    LExpr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Result kind of an untyped expression body, as far as integer
/// arithmetic goes.
fn expression_kind(expr: &Expr, params: &[LoweredParam]) -> ValueKind {
    match &expr.kind {
        ExprKind::Int(_, IntKind::Int | IntKind::UInt) => ValueKind::I32,
        ExprKind::Int(_, IntKind::Long | IntKind::ULong) => ValueKind::I64,
        ExprKind::Name(name) => params
            .iter()
            .find(|p| &p.name == name)
            .map_or(ValueKind::Ref, |p| p.kind),
        ExprKind::Unary {
            op: UnaryOp::Neg | UnaryOp::Plus,
            operand,
        } => expression_kind(operand, params),
        ExprKind::Binary {
            op: BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem,
            lhs,
            rhs,
        } => match (expression_kind(lhs, params), expression_kind(rhs, params)) {
            (ValueKind::I64, k) | (k, ValueKind::I64) if k.is_integer() => ValueKind::I64,
            (ValueKind::I32, ValueKind::I32) => ValueKind::I32,
            _ => ValueKind::Ref,
        },
        _ => ValueKind::Ref,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
