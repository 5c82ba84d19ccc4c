//! Function bodies for the numeric subset.

use rustc_hash::FxHashMap;
use wasm_encoder::{BlockType, Function, Instruction, ValType};

use crate::lower::{LBinOp, LExpr, LStmt, LoweredFunction, ValueKind};

use super::val_type;

/// Functions a body may call, by name: wasm index and lowered signature.
pub(super) type Callable<'m> = FxHashMap<&'m str, (u32, &'m LoweredFunction)>;

/// A body that traps when called.
pub(super) fn unreachable() -> Function {
    let mut f = Function::new(Vec::new());
    f.instruction(&Instruction::Unreachable);
    f.instruction(&Instruction::End);
    f
}

/// Translate `function`, or `None` if it uses anything outside the
/// numeric subset.
pub(super) fn compile(function: &LoweredFunction, callable: &Callable<'_>) -> Option<Function> {
    let result = match function.result {
        ValueKind::Unit => None,
        kind if kind.is_integer() => Some(kind),
        _ => return None,
    };

    let mut body = Body {
        callable,
        result,
        locals: FxHashMap::default(),
        next_local: 0,
        extra: Vec::new(),
        code: Vec::new(),
    };
    for param in &function.params {
        if param.kind != ValueKind::Unit {
            body.locals
                .insert(param.name.clone(), (body.next_local, param.kind));
            body.next_local += 1;
        }
    }
    body.statements(&function.body)?;
    if result.is_some() {
        // Falling off the end of a value-returning body.
        body.code.push(Instruction::Unreachable);
    }
    body.code.push(Instruction::End);

    let mut f = Function::new(body.extra.iter().map(|ty| (1, *ty)));
    for instruction in &body.code {
        f.instruction(instruction);
    }
    Some(f)
}

struct Body<'c, 'm> {
    callable: &'c Callable<'m>,
    result: Option<ValueKind>,
    /// Visible locals: wasm index and kind.
    locals: FxHashMap<String, (u32, ValueKind)>,
    next_local: u32,
    /// Types of locals declared beyond the parameters.
    extra: Vec<ValType>,
    code: Vec<Instruction<'static>>,
}

impl Body<'_, '_> {
    fn emit(&mut self, instruction: Instruction<'static>) {
        self.code.push(instruction);
    }

    fn statements(&mut self, stmts: &[LStmt]) -> Option<()> {
        for stmt in stmts {
            self.statement(stmt)?;
        }
        Some(())
    }

    /// Statements whose locals go out of scope afterwards.
    fn nested(&mut self, stmts: &[LStmt]) -> Option<()> {
        let saved = self.locals.clone();
        let result = self.statements(stmts);
        self.locals = saved;
        result
    }

    fn statement(&mut self, stmt: &LStmt) -> Option<()> {
        match stmt {
            LStmt::Let {
                name,
                value: Some(value),
            } => {
                let kind = self.kind(value)?;
                self.expr(value, kind)?;
                let idx = self.next_local;
                self.next_local += 1;
                self.extra.push(val_type(kind)?);
                self.locals.insert(name.clone(), (idx, kind));
                self.emit(Instruction::LocalSet(idx));
            }
            LStmt::Assign {
                target: LExpr::Local(name),
                value,
            } => {
                let (idx, kind) = *self.locals.get(name)?;
                self.expr(value, kind)?;
                self.emit(Instruction::LocalSet(idx));
            }
            LStmt::Expr(LExpr::Call { callee, args }) => {
                if self.call(callee, args)?.is_some() {
                    self.emit(Instruction::Drop);
                }
            }
            LStmt::Expr(value) => {
                let kind = self.kind(value)?;
                self.expr(value, kind)?;
                self.emit(Instruction::Drop);
            }
            LStmt::Return(value) => {
                match (value, self.result) {
                    (Some(value), Some(kind)) => self.expr(value, kind)?,
                    (None, None) => {}
                    _ => return None,
                }
                self.emit(Instruction::Return);
            }
            LStmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expr(condition, ValueKind::I32)?;
                self.emit(Instruction::If(BlockType::Empty));
                self.nested(then_branch)?;
                if !else_branch.is_empty() {
                    self.emit(Instruction::Else);
                    self.nested(else_branch)?;
                }
                self.emit(Instruction::End);
            }
            LStmt::While { condition, body } => {
                self.emit(Instruction::Block(BlockType::Empty));
                self.emit(Instruction::Loop(BlockType::Empty));
                self.expr(condition, ValueKind::I32)?;
                self.emit(Instruction::I32Eqz);
                self.emit(Instruction::BrIf(1));
                self.nested(body)?;
                self.emit(Instruction::Br(0));
                self.emit(Instruction::End);
                self.emit(Instruction::End);
            }
            LStmt::Scope(inner) => self.nested(inner)?,
            LStmt::Let { value: None, .. } | LStmt::Assign { .. } | LStmt::ForEach { .. } => {
                return None;
            }
        }
        Some(())
    }

    /// Integer kind of `value`, if it has one.
    fn kind(&self, value: &LExpr) -> Option<ValueKind> {
        let kind = match value {
            LExpr::Int(_) | LExpr::Bool(_) | LExpr::Not(_) => ValueKind::I32,
            LExpr::Long(_) => ValueKind::I64,
            LExpr::Local(name) => self.locals.get(name)?.1,
            LExpr::Call { callee, .. } => self.callable.get(callee.as_str())?.1.result,
            LExpr::Neg(inner) => self.kind(inner)?,
            LExpr::Binary { op, lhs, rhs } => match op {
                LBinOp::Add
                | LBinOp::Sub
                | LBinOp::Mul
                | LBinOp::Div
                | LBinOp::IntDiv(_)
                | LBinOp::Rem => {
                    widen(self.kind(lhs)?, self.kind(rhs)?)
                }
                LBinOp::Eq
                | LBinOp::NotEq
                | LBinOp::Lt
                | LBinOp::Gt
                | LBinOp::LtEq
                | LBinOp::GtEq
                | LBinOp::And
                | LBinOp::Or => ValueKind::I32,
                LBinOp::Elvis | LBinOp::Range => return None,
            },
            LExpr::If { then_branch, .. } => self.kind(then_branch.value.as_deref()?)?,
            _ => return None,
        };
        kind.is_integer().then_some(kind)
    }

    /// Emit `value` converted to `want`.
    fn expr(&mut self, value: &LExpr, want: ValueKind) -> Option<()> {
        let have = self.kind(value)?;
        self.emit_as(value, have)?;
        match (have, want) {
            (have, want) if have == want => Some(()),
            (ValueKind::I32, ValueKind::I64) => {
                self.emit(Instruction::I64ExtendI32S);
                Some(())
            }
            _ => None,
        }
    }

    /// Emit `value` at its own kind `kind`.
    fn emit_as(&mut self, value: &LExpr, kind: ValueKind) -> Option<()> {
        let wide = kind == ValueKind::I64;
        match value {
            LExpr::Int(v) if wide => self.emit(Instruction::I64Const(*v)),
            LExpr::Int(v) => self.emit(Instruction::I32Const(i32::try_from(*v).ok()?)),
            LExpr::Long(v) => self.emit(Instruction::I64Const(*v)),
            LExpr::Bool(b) => self.emit(Instruction::I32Const(i32::from(*b))),
            LExpr::Local(name) => {
                let (idx, _) = *self.locals.get(name)?;
                self.emit(Instruction::LocalGet(idx));
            }
            LExpr::Call { callee, args } => {
                self.call(callee, args)??;
            }
            LExpr::Neg(inner) => {
                self.emit(if wide {
                    Instruction::I64Const(0)
                } else {
                    Instruction::I32Const(0)
                });
                self.expr(inner, kind)?;
                self.emit(if wide {
                    Instruction::I64Sub
                } else {
                    Instruction::I32Sub
                });
            }
            LExpr::Not(inner) => {
                self.expr(inner, ValueKind::I32)?;
                self.emit(Instruction::I32Eqz);
            }
            LExpr::Binary {
                op: LBinOp::And,
                lhs,
                rhs,
            } => {
                self.expr(lhs, ValueKind::I32)?;
                self.emit(Instruction::If(BlockType::Result(ValType::I32)));
                self.expr(rhs, ValueKind::I32)?;
                self.emit(Instruction::Else);
                self.emit(Instruction::I32Const(0));
                self.emit(Instruction::End);
            }
            LExpr::Binary {
                op: LBinOp::Or,
                lhs,
                rhs,
            } => {
                self.expr(lhs, ValueKind::I32)?;
                self.emit(Instruction::If(BlockType::Result(ValType::I32)));
                self.emit(Instruction::I32Const(1));
                self.emit(Instruction::Else);
                self.expr(rhs, ValueKind::I32)?;
                self.emit(Instruction::End);
            }
            LExpr::Binary { op, lhs, rhs } => {
                // Comparisons work at the operands' kind, arithmetic at ours.
                let operands = if is_arithmetic(*op) {
                    kind
                } else {
                    widen(self.kind(lhs)?, self.kind(rhs)?)
                };
                self.expr(lhs, operands)?;
                self.expr(rhs, operands)?;
                self.emit(binary(*op, operands == ValueKind::I64)?);
            }
            LExpr::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if !then_branch.statements.is_empty() || !else_branch.statements.is_empty() {
                    return None;
                }
                let then_value = then_branch.value.as_deref()?;
                let else_value = else_branch.value.as_deref()?;
                self.expr(condition, ValueKind::I32)?;
                self.emit(Instruction::If(BlockType::Result(val_type(kind)?)));
                self.expr(then_value, kind)?;
                self.emit(Instruction::Else);
                self.expr(else_value, kind)?;
                self.emit(Instruction::End);
            }
            _ => return None,
        }
        Some(())
    }

    /// Emit a call; the inner option is the result kind, `None` for `Unit`.
    fn call(&mut self, callee: &str, args: &[LExpr]) -> Option<Option<ValueKind>> {
        let (idx, function) = *self.callable.get(callee)?;
        let params: Vec<ValueKind> = function
            .params
            .iter()
            .map(|p| p.kind)
            .filter(|k| *k != ValueKind::Unit)
            .collect();
        if params.len() != args.len() {
            return None;
        }
        for (arg, param) in args.iter().zip(params) {
            if !param.is_integer() {
                return None;
            }
            self.expr(arg, param)?;
        }
        self.emit(Instruction::Call(idx));
        match function.result {
            ValueKind::Unit => Some(None),
            kind if kind.is_integer() => Some(Some(kind)),
            _ => None,
        }
    }
}

fn is_arithmetic(op: LBinOp) -> bool {
    matches!(
        op,
        LBinOp::Add | LBinOp::Sub | LBinOp::Mul | LBinOp::Div | LBinOp::IntDiv(_) | LBinOp::Rem
    )
}

fn widen(a: ValueKind, b: ValueKind) -> ValueKind {
    if a == ValueKind::I64 || b == ValueKind::I64 {
        ValueKind::I64
    } else {
        a
    }
}

fn binary(op: LBinOp, wide: bool) -> Option<Instruction<'static>> {
    use Instruction as I;
    let instruction = match (op, wide) {
        (LBinOp::Add, false) => I::I32Add,
        (LBinOp::Sub, false) => I::I32Sub,
        (LBinOp::Mul, false) => I::I32Mul,
        (LBinOp::Div | LBinOp::IntDiv(_), false) => I::I32DivS,
        (LBinOp::Rem, false) => I::I32RemS,
        (LBinOp::Eq, false) => I::I32Eq,
        (LBinOp::NotEq, false) => I::I32Ne,
        (LBinOp::Lt, false) => I::I32LtS,
        (LBinOp::Gt, false) => I::I32GtS,
        (LBinOp::LtEq, false) => I::I32LeS,
        (LBinOp::GtEq, false) => I::I32GeS,
        (LBinOp::Add, true) => I::I64Add,
        (LBinOp::Sub, true) => I::I64Sub,
        (LBinOp::Mul, true) => I::I64Mul,
        (LBinOp::Div | LBinOp::IntDiv(_), true) => I::I64DivS,
        (LBinOp::Rem, true) => I::I64RemS,
        (LBinOp::Eq, true) => I::I64Eq,
        (LBinOp::NotEq, true) => I::I64Ne,
        (LBinOp::Lt, true) => I::I64LtS,
        (LBinOp::Gt, true) => I::I64GtS,
        (LBinOp::LtEq, true) => I::I64LeS,
        (LBinOp::GtEq, true) => I::I64GeS,
        (LBinOp::And | LBinOp::Or | LBinOp::Elvis | LBinOp::Range, _) => return None,
    };
    Some(instruction)
}
