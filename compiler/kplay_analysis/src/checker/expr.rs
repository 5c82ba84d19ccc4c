//! Statement checking and expression type inference.

use kplay_syntax::ast::{
    AssignOp, BinaryOp, Block, ClassDecl, ClassKind, Declaration, Expr, ExprKind, FunctionBody,
    FunctionDecl, IntKind, LocalDecl, Param, PropertyDecl, Stmt, StringPart, UnaryOp,
};
use kplay_syntax::Span;

use super::{signature, Checker, COMPOSABLE_CALL};
use crate::config::LanguageFeatures;
use crate::index::Callable;
use crate::stdlib::{LibrarySymbol, SymbolKind};
use crate::types::{Prim, Ty};

/// A member found on a project class.
enum Member<'a> {
    Property { ty: Ty, mutable: bool },
    Function(&'a FunctionDecl),
    /// May be inherited from a type outside the project.
    Unknown,
}

/// Common type of two branches.
fn join(a: Ty, b: Ty) -> Ty {
    if a == Ty::NOTHING {
        b
    } else if b == Ty::NOTHING || a == b {
        a
    } else {
        Ty::Unknown
    }
}

fn accepts_count(f: &FunctionDecl, count: usize) -> bool {
    let required = f.params.iter().filter(|p| p.default.is_none() && !p.vararg).count();
    count >= required && (count <= f.params.len() || f.params.iter().any(|p| p.vararg))
}

/// Type of a literal initializer, without reporting anything.
fn literal_type(expr: &Expr) -> Ty {
    match &expr.kind {
        ExprKind::Int(_, kind) => Ty::Prim(int_prim(*kind)),
        ExprKind::Float(text) => Ty::Prim(float_prim(text)),
        ExprKind::Bool(_) => Ty::BOOLEAN,
        ExprKind::Char(_) => Ty::Prim(Prim::Char),
        ExprKind::Str(_) => Ty::STRING,
        _ => Ty::Unknown,
    }
}

fn int_prim(kind: IntKind) -> Prim {
    match kind {
        IntKind::Int => Prim::Int,
        IntKind::Long => Prim::Long,
        IntKind::UInt => Prim::UInt,
        IntKind::ULong => Prim::ULong,
    }
}

fn float_prim(text: &str) -> Prim {
    if text.ends_with(['f', 'F']) {
        Prim::Float
    } else {
        Prim::Double
    }
}

impl<'a> Checker<'_, 'a> {
    /// Check `block` in its own scope.
    ///
    /// Returns `Nothing` when the block always exits, otherwise the type of
    /// its last statement.
    pub(super) fn check_block(&mut self, block: &'a Block) -> Ty {
        self.with_scope(|this| this.check_statements(&block.statements))
    }

    fn check_statements(&mut self, statements: &'a [Stmt]) -> Ty {
        let mut result = Ty::UNIT;
        let mut exits = false;
        for stmt in statements {
            result = self.check_statement(stmt);
            exits |= result == Ty::NOTHING;
        }
        if exits {
            Ty::NOTHING
        } else {
            result
        }
    }

    fn check_statement(&mut self, stmt: &'a Stmt) -> Ty {
        match stmt {
            Stmt::Local(local) => {
                self.check_local(local);
                Ty::UNIT
            }
            Stmt::Expr(expr) => self.infer(expr, None),
            Stmt::Return(value, span) => {
                self.check_return(value.as_ref(), *span);
                Ty::NOTHING
            }
            Stmt::Assign { target, op, value } => {
                self.check_assign(target, *op, value);
                Ty::UNIT
            }
            Stmt::While { condition, body } => {
                self.check_expr(condition, &Ty::BOOLEAN);
                self.check_block(body);
                Ty::UNIT
            }
            Stmt::For {
                variable,
                iterable,
                body,
            } => {
                self.infer(iterable, None);
                self.with_scope(|this| {
                    this.scopes
                        .declare_param(variable, Ty::Unknown, iterable.span);
                    this.check_statements(&body.statements);
                });
                Ty::UNIT
            }
        }
    }

    fn check_local(&mut self, local: &'a LocalDecl) {
        let declared = local.ty.as_ref().map(|ty| self.resolve(ty));
        let ty = match (declared, &local.initializer) {
            (Some(ty), Some(init)) => {
                self.check_expr(init, &ty);
                ty
            }
            (Some(ty), None) => ty,
            (None, Some(init)) => self.infer(init, None),
            (None, None) => {
                self.error(
                    local.span,
                    "This variable must either have a type annotation or be initialized",
                );
                Ty::Error
            }
        };
        if !self
            .scopes
            .declare_local(&local.name, ty, local.mutable, local.span)
        {
            let keyword = if local.mutable { "var" } else { "val" };
            self.error(
                local.span,
                format!("Conflicting declarations: {keyword} {}", local.name),
            );
        }
    }

    fn check_return(&mut self, value: Option<&'a Expr>, span: Span) {
        let expected = self.return_type.clone();
        match (value, expected) {
            (Some(expr), Some(ty)) if ty != Ty::Unknown => self.check_expr(expr, &ty),
            (Some(expr), _) => {
                self.infer(expr, None);
            }
            (None, Some(ty)) if ty != Ty::UNIT && !ty.is_opaque() => {
                self.error(span, format!("This function must return a value of type {ty}"));
            }
            (None, _) => {}
        }
    }

    fn check_assign(&mut self, target: &'a Expr, op: AssignOp, value: &'a Expr) {
        let target_ty = match &target.kind {
            ExprKind::Name(name) => self.assign_to_name(name, target.span),
            ExprKind::Member { .. } | ExprKind::Call { .. } => self.infer(target, None),
            _ => {
                self.error(target.span, "Variable expected");
                Ty::Error
            }
        };
        match op {
            AssignOp::Assign => self.check_expr(value, &target_ty),
            AssignOp::AddAssign | AssignOp::SubAssign => {
                self.infer(value, None);
            }
        }
    }

    /// Type of the assigned variable; reports writes to `val`s.
    fn assign_to_name(&mut self, name: &str, span: Span) -> Ty {
        let (ty, mutable) = if let Some(local) = self.scopes.lookup_mut(name) {
            local.assigned = true;
            (local.ty.clone(), local.mutable)
        } else if let Some(member) = self.implicit_member(name) {
            match member {
                Member::Property { ty, mutable } => (ty, mutable),
                Member::Function(_) | Member::Unknown => (Ty::Unknown, true),
            }
        } else if let Some(property) = self.index.property(name) {
            (self.property_type(property), property.mutable)
        } else if self.has_opaque_receiver() {
            (Ty::Unknown, true)
        } else {
            self.error(span, format!("Unresolved reference: {name}"));
            return Ty::Error;
        };
        if !mutable {
            self.error(span, "Val cannot be reassigned");
        }
        ty
    }

    /// Check `expr` against an expected type.
    pub(super) fn check_expr(&mut self, expr: &'a Expr, expected: &Ty) {
        let actual = self.infer(expr, Some(expected));
        if expected.accepts(&actual) {
            return;
        }
        if actual == Ty::null() {
            self.error(
                expr.span,
                format!("Null can not be a value of a non-null type {expected}"),
            );
        } else {
            self.error(
                expr.span,
                format!("Type mismatch: inferred type is {actual} but {expected} was expected"),
            );
        }
    }

    /// Infer the type of `expr`, reporting what is wrong inside it.
    ///
    /// `expected` only steers literals; callers compare the result.
    pub(super) fn infer(&mut self, expr: &'a Expr, expected: Option<&Ty>) -> Ty {
        match &expr.kind {
            ExprKind::Int(_, kind) => self.int_literal(*kind, expected, expr.span),
            ExprKind::Float(text) => self.float_literal(text, expected, expr.span),
            ExprKind::Bool(_) => Ty::BOOLEAN,
            ExprKind::Char(_) => Ty::Prim(Prim::Char),
            ExprKind::Str(parts) => {
                for part in parts {
                    match part {
                        StringPart::Text(_) => {}
                        StringPart::Reference(name, span) => {
                            self.name_type(name, *span);
                        }
                        StringPart::Expression(value) => {
                            self.infer(value, None);
                        }
                    }
                }
                Ty::STRING
            }
            ExprKind::Null => Ty::null(),
            ExprKind::Name(name) => self.name_type(name, expr.span),
            ExprKind::Call { callee, args } => self.call_type(callee, args, expr.span),
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => {
                let receiver_ty = self.infer(receiver, None);
                self.member_access(&receiver_ty, name, *safe, expr.span, false)
            }
            ExprKind::Binary { op, lhs, rhs } => self.binary_type(*op, lhs, rhs),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.check_expr(operand, &Ty::BOOLEAN);
                    Ty::BOOLEAN
                }
                UnaryOp::Neg | UnaryOp::Plus => self.infer(operand, expected),
            },
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition, &Ty::BOOLEAN);
                let then_ty = self.check_block(then_branch);
                match else_branch {
                    Some(block) => {
                        let else_ty = self.check_block(block);
                        join(then_ty, else_ty)
                    }
                    None => Ty::UNIT,
                }
            }
            ExprKind::Lambda { params, body } => {
                let arity = match expected.map(Ty::non_null) {
                    // `it` stands in for a single parameter.
                    Some(Ty::Function(n)) if params.is_empty() && *n <= 1 => *n,
                    _ => params.len(),
                };
                let composable = self.composable;
                self.lambda(params, body, composable);
                Ty::Function(arity)
            }
        }
    }

    fn int_literal(&mut self, kind: IntKind, expected: Option<&Ty>, span: Span) -> Ty {
        let literal = int_prim(kind);
        let Some(target) = expected.map(Ty::non_null).and_then(Ty::prim) else {
            return Ty::Prim(literal);
        };
        match kind {
            IntKind::Int if target.is_signed_integer() => Ty::Prim(target),
            IntKind::UInt if target.is_unsigned_integer() => Ty::Prim(target),
            IntKind::Int if target.is_numeric() => {
                self.error(
                    span,
                    format!(
                        "The integer literal does not conform to the expected type {}",
                        target.name()
                    ),
                );
                Ty::Error
            }
            _ => Ty::Prim(literal),
        }
    }

    fn float_literal(&mut self, text: &str, expected: Option<&Ty>, span: Span) -> Ty {
        let literal = float_prim(text);
        let target = expected.map(Ty::non_null).and_then(Ty::prim);
        if literal == Prim::Double && target == Some(Prim::Float) {
            self.error(
                span,
                "The floating-point literal does not conform to the expected type Float",
            );
            return Ty::Error;
        }
        Ty::Prim(literal)
    }

    fn lambda(&mut self, params: &'a [String], body: &'a Block, composable: bool) {
        self.with_composable(composable, |this| {
            this.with_scope(|this| {
                if params.is_empty() {
                    this.scopes.declare_param("it", Ty::Unknown, body.span);
                }
                for param in params {
                    this.scopes.declare_param(param, Ty::Unknown, body.span);
                }
                this.check_statements(&body.statements);
            });
        });
    }

    fn name_type(&mut self, name: &str, span: Span) -> Ty {
        if let Some(local) = self.scopes.lookup_mut(name) {
            local.used = true;
            return local.ty.clone();
        }
        if name == "this" {
            return match (&self.receiver, self.class) {
                (Some(receiver), _) => receiver.clone(),
                (None, Some(class)) => Ty::Class(class.name.clone()),
                (None, None) => Ty::Unknown,
            };
        }
        if let Some(member) = self.implicit_member(name) {
            return match member {
                Member::Property { ty, .. } => ty,
                Member::Function(_) | Member::Unknown => Ty::Unknown,
            };
        }
        let index = self.index;
        if let Some(property) = index.property(name) {
            return self.property_type(property);
        }
        if let Some(ty) = index.object_type(name) {
            return ty;
        }
        // Class names as values (companions) and function references.
        if index.class(name).is_some() || !index.functions(name).is_empty() {
            return Ty::Unknown;
        }
        if let Some(symbol) = index.library_symbol(name) {
            return match symbol.kind {
                SymbolKind::Property => index.library_type(symbol.returns),
                SymbolKind::Function | SymbolKind::Class | SymbolKind::Annotation => Ty::Unknown,
            };
        }
        if self.has_opaque_receiver() {
            return Ty::Unknown;
        }
        self.error(span, format!("Unresolved reference: {name}"));
        Ty::Error
    }

    fn call_type(&mut self, callee: &'a Expr, args: &'a [Expr], span: Span) -> Ty {
        match &callee.kind {
            ExprKind::Name(name) => self.call_by_name(name, callee.span, args, span),
            ExprKind::Member {
                receiver,
                name,
                safe,
            } => {
                let receiver_ty = self.infer(receiver, None);
                let result = self.member_access(&receiver_ty, name, *safe, callee.span, true);
                self.infer_args(args, false);
                result
            }
            _ => {
                self.infer(callee, None);
                self.infer_args(args, false);
                Ty::Unknown
            }
        }
    }

    fn call_by_name(&mut self, name: &str, name_span: Span, args: &'a [Expr], span: Span) -> Ty {
        if let Some(local) = self.scopes.lookup_mut(name) {
            local.used = true;
            self.infer_args(args, false);
            return Ty::Unknown;
        }
        if let Some(member) = self.implicit_member(name) {
            self.infer_args(args, false);
            return match member {
                Member::Function(f) => self.function_result(f),
                Member::Property { .. } | Member::Unknown => Ty::Unknown,
            };
        }

        let index = self.index;
        let composable = index.is_composable(name);
        if composable
            && self.config.features.contains(LanguageFeatures::COMPOSE)
            && !self.composable
        {
            self.error(name_span, COMPOSABLE_CALL);
        }

        match index.callable(name) {
            Some(Callable::Functions(overloads)) => {
                self.call_function(overloads, args, span, composable)
            }
            Some(Callable::Constructor(class)) => self.call_constructor(class, args, span),
            Some(Callable::Library(symbol)) => {
                self.call_library(symbol, args, span, composable)
            }
            None => {
                self.infer_args(args, false);
                if self.has_opaque_receiver() {
                    return Ty::Unknown;
                }
                self.error(name_span, format!("Unresolved reference: {name}"));
                Ty::Error
            }
        }
    }

    fn call_function(
        &mut self,
        overloads: &[&FunctionDecl],
        args: &'a [Expr],
        span: Span,
        composable: bool,
    ) -> Ty {
        let count = args.len();
        let mut matching = overloads.iter().filter(|f| accepts_count(f, count));
        match (matching.next(), matching.next()) {
            (Some(f), None) => {
                let params: Vec<&Param> = f.params.iter().collect();
                let type_params: Vec<&str> = f.type_params.iter().map(String::as_str).collect();
                self.check_args(&params, &type_params, args, composable);
                self.function_result(f)
            }
            (Some(f), Some(_)) => {
                // Overloads differing only in types are not ranked.
                self.infer_args(args, composable);
                self.function_result(f)
            }
            (None, _) => {
                match overloads {
                    [f] => self.report_arity(f, count, span),
                    _ => self.error(
                        span,
                        "None of the following functions can be called with the arguments supplied",
                    ),
                }
                self.infer_args(args, composable);
                Ty::Error
            }
        }
    }

    fn report_arity(&mut self, f: &FunctionDecl, count: usize, span: Span) {
        let missing = f
            .params
            .iter()
            .skip(count)
            .find(|p| p.default.is_none() && !p.vararg);
        match missing {
            Some(param) => self.error(
                span,
                format!("No value passed for parameter '{}'", param.name),
            ),
            None => self.error(span, format!("Too many arguments for {}", signature(f))),
        }
    }

    fn call_constructor(&mut self, class: &ClassDecl, args: &'a [Expr], span: Span) -> Ty {
        match class.kind {
            ClassKind::Interface => {
                self.error(
                    span,
                    format!("Interface {} does not have constructors", class.name),
                );
                self.infer_args(args, false);
                return Ty::Error;
            }
            ClassKind::Object => {
                self.error(
                    span,
                    format!(
                        "Expression '{0}' of type {0} cannot be invoked as a function",
                        class.name
                    ),
                );
                self.infer_args(args, false);
                return Ty::Error;
            }
            ClassKind::Class => {}
        }

        let params: Vec<&Param> = class.ctor_params.iter().map(|c| &c.param).collect();
        let count = args.len();
        let required = params.iter().filter(|p| p.default.is_none()).count();
        if count < required {
            if let Some(param) = params.iter().skip(count).find(|p| p.default.is_none()) {
                self.error(
                    span,
                    format!("No value passed for parameter '{}'", param.name),
                );
            }
            self.infer_args(args, false);
        } else if count > params.len() {
            self.error(span, format!("Too many arguments for constructor {}", class.name));
            self.infer_args(args, false);
        } else {
            let type_params: Vec<&str> = class.type_params.iter().map(String::as_str).collect();
            self.check_args(&params, &type_params, args, false);
        }
        Ty::Class(class.name.clone())
    }

    fn call_library(
        &mut self,
        symbol: &LibrarySymbol,
        args: &'a [Expr],
        span: Span,
        composable: bool,
    ) -> Ty {
        let count = args.len();
        if count < symbol.min_args {
            self.error(
                span,
                format!("No value passed for parameter of '{}'", symbol.name),
            );
        } else if !symbol.accepts_arity(count) {
            self.error(span, format!("Too many arguments for '{}'", symbol.name));
        }
        self.infer_args(args, composable);
        self.index.library_type(symbol.returns)
    }

    /// Check arguments positionally against `params`.
    fn check_args(
        &mut self,
        params: &[&Param],
        type_params: &[&str],
        args: &'a [Expr],
        composable: bool,
    ) {
        for (i, arg) in args.iter().enumerate() {
            let param = params
                .get(i)
                .or_else(|| params.last().filter(|p| p.vararg));
            match (&arg.kind, param) {
                (ExprKind::Lambda { params, body }, _) => {
                    self.lambda(params, body, self.composable || composable);
                }
                (_, Some(param)) => {
                    let expected = self.index.resolve_type(&param.ty, type_params);
                    self.check_expr(arg, &expected);
                }
                (_, None) => {
                    self.infer(arg, None);
                }
            }
        }
    }

    /// Infer arguments without expected types. Lambdas handed to a
    /// composable callee are composable themselves.
    fn infer_args(&mut self, args: &'a [Expr], composable: bool) {
        for arg in args {
            match &arg.kind {
                ExprKind::Lambda { params, body } => {
                    self.lambda(params, body, self.composable || composable);
                }
                _ => {
                    self.infer(arg, None);
                }
            }
        }
    }

    fn member_access(&mut self, receiver: &Ty, name: &str, safe: bool, span: Span, call: bool) -> Ty {
        let (nullable, base) = match receiver {
            Ty::Nullable(inner) => (true, inner.as_ref()),
            other => (false, other),
        };
        if nullable && !safe && !base.is_opaque() {
            self.error(
                span,
                format!(
                    "Only safe (?.) or non-null asserted (!!.) calls are allowed on a nullable receiver of type {receiver}"
                ),
            );
        }
        let result = match base {
            Ty::Class(class_name) => {
                let index = self.index;
                match index.class(class_name).map(|c| self.find_member(c, name, 0)) {
                    Some(Some(Member::Property { ty, .. })) => ty,
                    Some(Some(Member::Function(f))) if call => self.function_result(f),
                    Some(Some(Member::Function(_) | Member::Unknown)) | None => Ty::Unknown,
                    Some(None) => {
                        self.error(span, format!("Unresolved reference: {name}"));
                        Ty::Error
                    }
                }
            }
            Ty::Prim(Prim::String) if name == "length" => Ty::Prim(Prim::Int),
            _ => Ty::Unknown,
        };
        if safe {
            result.nullable()
        } else {
            result
        }
    }

    fn binary_type(&mut self, op: BinaryOp, lhs: &'a Expr, rhs: &'a Expr) -> Ty {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.check_expr(lhs, &Ty::BOOLEAN);
                self.check_expr(rhs, &Ty::BOOLEAN);
                Ty::BOOLEAN
            }
            BinaryOp::Elvis => {
                let left = self.infer(lhs, None).non_null().clone();
                let right = self.infer(rhs, None);
                join(left, right)
            }
            _ => {
                let left = self.infer(lhs, None);
                let right = self.infer(rhs, None);
                if op.is_comparison() {
                    return Ty::BOOLEAN;
                }
                if op == BinaryOp::Range {
                    return Ty::Library("IntRange".to_string());
                }
                match (left.prim(), right.prim()) {
                    (Some(Prim::String), _) if op == BinaryOp::Add => Ty::STRING,
                    (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                        let result = a.widen(b);
                        if op == BinaryOp::Div && is_integer(a) && is_integer(b) {
                            self.divisions
                                .push((Span::new(lhs.span.start, rhs.span.end), result));
                        }
                        Ty::Prim(result)
                    }
                    _ => Ty::Unknown,
                }
            }
        }
    }

    /// Member of the extension receiver or the enclosing class.
    fn implicit_member(&self, name: &str) -> Option<Member<'a>> {
        if let Some(Ty::Class(class_name)) = self.receiver.as_ref().map(Ty::non_null) {
            if let Some(member) = self
                .index
                .class(class_name)
                .and_then(|c| self.find_member(c, name, 0))
            {
                return Some(member);
            }
        }
        self.find_member(self.class?, name, 0)
    }

    /// Inside an extension on a type whose members are not known.
    fn has_opaque_receiver(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|r| !matches!(r.non_null(), Ty::Class(_)))
    }

    fn find_member(&self, class: &'a ClassDecl, name: &str, depth: usize) -> Option<Member<'a>> {
        for ctor in &class.ctor_params {
            let Some(mutable) = ctor.property else {
                continue;
            };
            if ctor.param.name == name {
                let type_params: Vec<&str> = class.type_params.iter().map(String::as_str).collect();
                let ty = self.index.resolve_type(&ctor.param.ty, &type_params);
                return Some(Member::Property { ty, mutable });
            }
        }
        for member in &class.members {
            match member {
                Declaration::Property(p) if p.name == name => {
                    return Some(Member::Property {
                        ty: self.property_type(p),
                        mutable: p.mutable,
                    });
                }
                Declaration::Function(f) if f.name == name && f.receiver.is_none() => {
                    return Some(Member::Function(f));
                }
                _ => {}
            }
        }
        if depth > 8 {
            return Some(Member::Unknown);
        }
        for supertype in &class.supertypes {
            match self.index.class(supertype.short_name()) {
                Some(parent) => {
                    if let Some(found) = self.find_member(parent, name, depth + 1) {
                        return Some(found);
                    }
                }
                None => return Some(Member::Unknown),
            }
        }
        None
    }

    /// Declared type of a property, or the type of a literal initializer.
    fn property_type(&self, property: &PropertyDecl) -> Ty {
        match (&property.ty, &property.initializer) {
            (Some(ty), _) => self.index.resolve_type(ty, &self.type_params),
            (None, Some(init)) => literal_type(init),
            (None, None) => Ty::Unknown,
        }
    }

    /// Result type of calling `f`. Expression bodies without a written type
    /// are only inferred for literals.
    fn function_result(&self, f: &FunctionDecl) -> Ty {
        match (&f.return_type, &f.body) {
            (Some(ty), _) => {
                let type_params: Vec<&str> = f.type_params.iter().map(String::as_str).collect();
                self.index.resolve_type(ty, &type_params)
            }
            (None, Some(FunctionBody::Expression(expr))) => literal_type(expr),
            (None, _) => Ty::UNIT,
        }
    }
}

fn is_integer(prim: Prim) -> bool {
    prim.is_signed_integer() || prim.is_unsigned_integer()
}
