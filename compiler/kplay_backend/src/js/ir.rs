//! Script printed from the lowered module.

use crate::lower::{
    LBinOp, LBlock, LExpr, LStmt, LoweredClass, LoweredFunction, LoweredModule, ValueKind,
};

use super::{comma_separated, ident, quote, Entry, JsWriter};

pub(super) fn print(module: &LoweredModule, w: &mut JsWriter) -> Entry {
    // Objects first so property initializers can read them.
    for class in &module.classes {
        print_class(class, w);
    }
    for global in &module.globals {
        let name = ident(&global.name);
        match &global.init {
            Some(init) => w.line(&format!("var {name} = {};", expr(init))),
            None => w.line(&format!("var {name};")),
        }
    }
    for function in &module.functions {
        let name = ident(&function.name);
        print_function(&format!("function {name}"), function, "", w);
        w.line(&format!("_.{name} = {name};"));
    }

    match module.function("main") {
        Some(main) if main.params.is_empty() => Entry::NoArgs,
        Some(_) => Entry::Args,
        None => Entry::None,
    }
}

fn print_class(class: &LoweredClass, w: &mut JsWriter) {
    let name = ident(&class.name);
    let ctor = if class.is_object {
        format!("{name}$Object")
    } else {
        name.clone()
    };
    let params = comma_separated(class.params.iter().map(|p| ident(p)));
    w.line(&format!("function {ctor}({params}) {{"));
    w.indent();
    for field in &class.fields {
        let field = ident(field);
        w.line(&format!("this.{field} = {field};"));
    }
    for property in &class.properties {
        let value = property
            .init
            .as_ref()
            .map_or_else(|| "undefined".to_string(), expr);
        w.line(&format!("this.{} = {value};", ident(&property.name)));
    }
    w.dedent();
    w.line("}");
    for method in &class.methods {
        let head = format!("{ctor}.prototype.{} = function ", ident(&method.name));
        print_function(&head, method, ";", w);
    }
    if class.is_object {
        w.line(&format!("var {name} = new {ctor}();"));
    }
    w.line(&format!("_.{name} = {name};"));
}

fn print_function(head: &str, function: &LoweredFunction, terminator: &str, w: &mut JsWriter) {
    let params = comma_separated(function.params.iter().map(|p| ident(&p.name)));
    w.line(&format!("{head}({params}) {{"));
    w.indent();
    statements(&function.body, w);
    w.dedent();
    w.line(&format!("}}{terminator}"));
}

fn statements(stmts: &[LStmt], w: &mut JsWriter) {
    for stmt in stmts {
        statement(stmt, w);
    }
}

fn nested(stmts: &[LStmt], w: &mut JsWriter) {
    w.indent();
    statements(stmts, w);
    w.dedent();
}

fn statement(stmt: &LStmt, w: &mut JsWriter) {
    match stmt {
        LStmt::Let { name, value } => match value {
            Some(value) => w.line(&format!("var {} = {};", ident(name), expr(value))),
            None => w.line(&format!("var {};", ident(name))),
        },
        LStmt::Assign { target, value } => {
            w.line(&format!("{} = {};", expr(target), expr(value)));
        }
        LStmt::Expr(value) => w.line(&format!("{};", expr(value))),
        LStmt::Return(Some(value)) => w.line(&format!("return {};", expr(value))),
        LStmt::Return(None) => w.line("return;"),
        LStmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            w.line(&format!("if ({}) {{", expr(condition)));
            nested(then_branch, w);
            if !else_branch.is_empty() {
                w.line("} else {");
                nested(else_branch, w);
            }
            w.line("}");
        }
        LStmt::While { condition, body } => {
            w.line(&format!("while ({}) {{", expr(condition)));
            nested(body, w);
            w.line("}");
        }
        LStmt::ForEach {
            variable,
            iterable,
            body,
        } => {
            w.line(&format!(
                "for (var {} of {}) {{",
                ident(variable),
                expr(iterable)
            ));
            nested(body, w);
            w.line("}");
        }
        LStmt::Scope(inner) => {
            w.line("{");
            nested(inner, w);
            w.line("}");
        }
    }
}

fn operand(value: &LExpr) -> String {
    let text = expr(value);
    match value {
        LExpr::Binary {
            op: LBinOp::IntDiv(_),
            ..
        } => text,
        LExpr::Binary { .. } | LExpr::If { .. } | LExpr::Lambda { .. } | LExpr::Concat(_) => {
            format!("({text})")
        }
        _ => text,
    }
}

fn args(values: &[LExpr]) -> String {
    comma_separated(values.iter().map(expr))
}

fn expr(value: &LExpr) -> String {
    match value {
        LExpr::Int(v) | LExpr::Long(v) => v.to_string(),
        LExpr::Float(text) => text.clone(),
        LExpr::Bool(v) => v.to_string(),
        LExpr::Char(c) => quote(&c.to_string()),
        LExpr::Str(text) => quote(text),
        LExpr::Null => "null".to_string(),
        LExpr::Local(name) | LExpr::Global(name) => ident(name),
        LExpr::This => "this".to_string(),
        LExpr::Call { callee, args: values } => format!("{}({})", ident(callee), args(values)),
        LExpr::Invoke { callee, args: values } => format!("{}({})", operand(callee), args(values)),
        LExpr::New { class, args: values } => format!("new {}({})", ident(class), args(values)),
        LExpr::MethodCall {
            receiver,
            name,
            args: values,
            safe,
        } => {
            let dot = if *safe { "?." } else { "." };
            format!("{}{dot}{}({})", operand(receiver), ident(name), args(values))
        }
        LExpr::Field {
            receiver,
            name,
            safe,
        } => {
            let dot = if *safe { "?." } else { "." };
            format!("{}{dot}{}", operand(receiver), ident(name))
        }
        LExpr::Binary { op, lhs, rhs } => match op {
            LBinOp::Range => format!("$rangeTo({}, {})", expr(lhs), expr(rhs)),
            LBinOp::IntDiv(ValueKind::I64) => {
                format!("Math.trunc({} / {})", operand(lhs), operand(rhs))
            }
            LBinOp::IntDiv(_) => format!("({} / {} | 0)", operand(lhs), operand(rhs)),
            _ => format!("{} {} {}", operand(lhs), binary_op(*op), operand(rhs)),
        },
        LExpr::Not(inner) => format!("!{}", operand(inner)),
        LExpr::Neg(inner) => format!("-{}", operand(inner)),
        // A leading empty string forces string concatenation.
        LExpr::Concat(parts) => {
            let mut pieces = vec![quote("")];
            pieces.extend(parts.iter().map(operand));
            pieces.join(" + ")
        }
        LExpr::If {
            condition,
            then_branch,
            else_branch,
        } => {
            if then_branch.statements.is_empty() && else_branch.statements.is_empty() {
                if let (Some(then_value), Some(else_value)) = (&then_branch.value, &else_branch.value) {
                    return format!(
                        "{} ? {} : {}",
                        operand(condition),
                        operand(then_value),
                        operand(else_value)
                    );
                }
            }
            format!(
                "(() => {{ if ({}) {} else {} }})()",
                expr(condition),
                inline_block(then_branch),
                inline_block(else_branch)
            )
        }
        LExpr::Lambda { params, body } => {
            let params = comma_separated(params.iter().map(|p| ident(p)));
            match (&body.value, body.statements.is_empty()) {
                (Some(value), true) => format!("({params}) => {}", operand(value)),
                _ => format!("({params}) => {}", inline_block(body)),
            }
        }
    }
}

/// `{ stmts; return value; }` on one line.
fn inline_block(block: &LBlock) -> String {
    let mut w = JsWriter::new(super::INDENT);
    statements(&block.statements, &mut w);
    if let Some(value) = &block.value {
        w.line(&format!("return {};", expr(value)));
    }
    let body = w.finish();
    let lines: Vec<&str> = body.lines().map(str::trim).collect();
    if lines.is_empty() {
        "{ }".to_string()
    } else {
        format!("{{ {} }}", lines.join(" "))
    }
}

fn binary_op(op: LBinOp) -> &'static str {
    match op {
        LBinOp::Add => "+",
        LBinOp::Sub => "-",
        LBinOp::Mul => "*",
        LBinOp::Div | LBinOp::IntDiv(_) => "/",
        LBinOp::Rem => "%",
        LBinOp::Eq => "===",
        LBinOp::NotEq => "!==",
        LBinOp::Lt => "<",
        LBinOp::Gt => ">",
        LBinOp::LtEq => "<=",
        LBinOp::GtEq => ">=",
        LBinOp::And => "&&",
        LBinOp::Or => "||",
        LBinOp::Elvis => "??",
        LBinOp::Range => "..",
    }
}
