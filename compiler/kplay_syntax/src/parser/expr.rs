//! Statements and expressions inside function bodies.

use super::{with_stack, PResult, Parser, Recovered};
use crate::ast::{
    AssignOp, BinaryOp, Block, Expr, ExprKind, IntKind, LocalDecl, Stmt, StringPart, UnaryOp,
};
use crate::lexer::{lex, TokenKind};
use crate::Span;

impl Parser<'_> {
    /// Statements up to and including the closing `}`.
    pub(super) fn parse_statements_until_rbrace(&mut self) -> PResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_semis();
            match self.peek() {
                None => {
                    self.error_here("Expecting '}'".to_string());
                    return Err(Recovered);
                }
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(statements);
                }
                _ => {}
            }

            let from = self.pos;
            match self.parse_statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    if !self.at_statement_end() {
                        self.error_here(
                            "Unexpected tokens (use ';' to separate expressions on the same line)"
                                .to_string(),
                        );
                        self.recover_statement(from);
                    }
                }
                Err(Recovered) => self.recover_statement(from),
            }
        }
    }

    fn at_statement_end(&self) -> bool {
        self.is_at_end()
            || self.at_newline()
            || self.at(TokenKind::Semi)
            || self.at(TokenKind::RBrace)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.peek() {
            Some(TokenKind::Val | TokenKind::Var) => self.parse_local().map(Stmt::Local),
            Some(TokenKind::Return) => {
                let span = self.current_span();
                self.pos += 1;
                if self.at_statement_end() {
                    Ok(Stmt::Return(None, span))
                } else {
                    let value = self.parse_expr()?;
                    let span = span.to(value.span);
                    Ok(Stmt::Return(Some(value), span))
                }
            }
            Some(TokenKind::While) => {
                self.pos += 1;
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_branch()?;
                Ok(Stmt::While { condition, body })
            }
            Some(TokenKind::For) => {
                self.pos += 1;
                self.expect(TokenKind::LParen)?;
                let (variable, _) = self.expect_ident()?;
                self.expect(TokenKind::In)?;
                let iterable = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_branch()?;
                Ok(Stmt::For {
                    variable,
                    iterable,
                    body,
                })
            }
            _ => {
                let target = self.parse_expr()?;
                let op = match self.peek() {
                    Some(TokenKind::Eq) => AssignOp::Assign,
                    Some(TokenKind::PlusEq) => AssignOp::AddAssign,
                    Some(TokenKind::MinusEq) => AssignOp::SubAssign,
                    _ => return Ok(Stmt::Expr(target)),
                };
                self.pos += 1;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign { target, op, value })
            }
        }
    }

    fn parse_local(&mut self) -> PResult<LocalDecl> {
        let start = self.current_span();
        let mutable = self.at(TokenKind::Var);
        self.pos += 1;
        let (name, _) = self.expect_ident()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(LocalDecl {
            name,
            mutable,
            ty,
            initializer,
            span: start.to(self.previous_span()),
        })
    }

    /// Body of `if`/`while`/`for`: a block or a single statement.
    fn parse_branch(&mut self) -> PResult<Block> {
        if self.at(TokenKind::LBrace) {
            return self.parse_block();
        }
        let start = self.current_span();
        let stmt = self.parse_statement()?;
        Ok(Block {
            statements: vec![stmt],
            span: start.to(self.previous_span()),
        })
    }

    pub(super) fn parse_expr(&mut self) -> PResult<Expr> {
        with_stack(|| self.parse_binary(0))
    }

    /// Next binary operator with its precedence, if it continues the
    /// current expression.
    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let (op, prec, allows_newline) = match self.peek()? {
            TokenKind::OrOr => (BinaryOp::Or, 1, true),
            TokenKind::AndAnd => (BinaryOp::And, 2, true),
            TokenKind::EqEq => (BinaryOp::Eq, 3, false),
            TokenKind::NotEq => (BinaryOp::NotEq, 3, false),
            TokenKind::Lt => (BinaryOp::Lt, 4, false),
            TokenKind::Gt => (BinaryOp::Gt, 4, false),
            TokenKind::LtEq => (BinaryOp::LtEq, 4, false),
            TokenKind::GtEq => (BinaryOp::GtEq, 4, false),
            TokenKind::Elvis => (BinaryOp::Elvis, 5, true),
            TokenKind::DotDot => (BinaryOp::Range, 6, false),
            TokenKind::Plus => (BinaryOp::Add, 7, false),
            TokenKind::Minus => (BinaryOp::Sub, 7, false),
            TokenKind::Star => (BinaryOp::Mul, 8, false),
            TokenKind::Slash => (BinaryOp::Div, 8, false),
            TokenKind::Percent => (BinaryOp::Rem, 8, false),
            _ => return None,
        };
        if self.at_newline() && !allows_newline {
            return None;
        }
        Some((op, prec))
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.parse_prefix()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Plus,
            Some(TokenKind::Bang) => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        let start = self.current_span();
        self.pos += 1;
        let operand = with_stack(|| self.parse_prefix())?;
        let span = start.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(TokenKind::Dot | TokenKind::SafeDot) => {
                    let safe = self.at(TokenKind::SafeDot);
                    self.pos += 1;
                    let (name, name_span) = self.expect_ident()?;
                    let span = expr.span.to(name_span);
                    expr = Expr::new(
                        ExprKind::Member {
                            receiver: Box::new(expr),
                            name,
                            safe,
                        },
                        span,
                    );
                }
                Some(TokenKind::LParen) if !self.at_newline() => {
                    let mut args = self.parse_call_args()?;
                    if self.at_same_line(TokenKind::LBrace) {
                        args.push(self.parse_lambda()?);
                    }
                    let span = expr.span.to(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                Some(TokenKind::LBrace)
                    if !self.at_newline()
                        && matches!(expr.kind, ExprKind::Name(_) | ExprKind::Member { .. }) =>
                {
                    let lambda = self.parse_lambda()?;
                    let span = expr.span.to(lambda.span);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args: vec![lambda],
                        },
                        span,
                    );
                }
                Some(TokenKind::LBracket) if !self.at_newline() => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect_kind(TokenKind::RBracket, "']'")?;
                    let span = expr.span.to(self.previous_span());
                    let getter = Expr::new(
                        ExprKind::Member {
                            receiver: Box::new(expr),
                            name: "get".to_string(),
                            safe: false,
                        },
                        span,
                    );
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(getter),
                            args: vec![index],
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `(a, b, name = c)`; argument names are dropped.
    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            if self.at(TokenKind::Ident) && self.peek_at(1) == Some(TokenKind::Eq) {
                self.pos += 2;
            }
            args.push(self.parse_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn expect_kind(&mut self, kind: TokenKind, shown: &str) -> PResult<Span> {
        if self.at(kind) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            self.error_here(format!("Expecting {shown}"));
            Err(Recovered)
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.current_span();
        let kind = match self.peek() {
            Some(TokenKind::IntLit) => {
                self.pos += 1;
                self.int_literal(span)
            }
            Some(TokenKind::FloatLit) => {
                self.pos += 1;
                ExprKind::Float(self.text(span).to_string())
            }
            Some(TokenKind::StringLit) => {
                self.pos += 1;
                ExprKind::Str(self.string_parts(span))
            }
            Some(TokenKind::CharLit) => {
                self.pos += 1;
                self.char_literal(span)
            }
            Some(TokenKind::True) => {
                self.pos += 1;
                ExprKind::Bool(true)
            }
            Some(TokenKind::False) => {
                self.pos += 1;
                ExprKind::Bool(false)
            }
            Some(TokenKind::Null) => {
                self.pos += 1;
                ExprKind::Null
            }
            Some(TokenKind::Ident) => {
                self.pos += 1;
                ExprKind::Name(self.text(span).to_string())
            }
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                return Ok(Expr::new(inner.kind, span.to(self.previous_span())));
            }
            Some(TokenKind::If) => return self.parse_if(),
            Some(TokenKind::LBrace) => return self.parse_lambda(),
            _ => {
                self.error_here("Expecting an element".to_string());
                return Err(Recovered);
            }
        };
        Ok(Expr::new(kind, span))
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.parse_branch()?;

        // `else` may sit on the next line after a `}`.
        let else_branch = if self.eat(TokenKind::Else) {
            Some(self.parse_branch()?)
        } else {
            None
        };
        Ok(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                then_branch,
                else_branch,
            },
            start.to(self.previous_span()),
        ))
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let start = self.expect(TokenKind::LBrace)?;
        let params = self.lambda_params();
        let statements = self.parse_statements_until_rbrace()?;
        let span = start.to(self.previous_span());
        Ok(Expr::new(
            ExprKind::Lambda {
                params,
                body: Block { statements, span },
            },
            span,
        ))
    }

    /// `a, b ->` at the start of a lambda; consumed only if the arrow is there.
    fn lambda_params(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = self.pos;
        loop {
            let Some(token) = self.tokens.get(cursor) else {
                return Vec::new();
            };
            match token.kind {
                TokenKind::Ident => {
                    names.push(self.text(token.span).to_string());
                    cursor += 1;
                }
                TokenKind::Arrow if names.is_empty() => {
                    self.pos = cursor + 1;
                    return names;
                }
                _ => return Vec::new(),
            }
            match self.tokens.get(cursor).map(|t| t.kind) {
                Some(TokenKind::Comma) => cursor += 1,
                Some(TokenKind::Arrow) => {
                    self.pos = cursor + 1;
                    return names;
                }
                _ => return Vec::new(),
            }
        }
    }

    // Literals

    fn int_literal(&mut self, span: Span) -> ExprKind {
        let text = self.text(span);
        let digits = text.trim_end_matches(['l', 'L', 'u', 'U']);
        let suffix = &text[digits.len()..];
        let unsigned = suffix.contains(['u', 'U']);
        let long = suffix.contains(['l', 'L']);

        let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
        let parsed = match cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
        {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => cleaned.parse::<i64>(),
        };
        let Ok(value) = parsed else {
            self.error_at("The value is out of range".to_string(), span);
            return ExprKind::Int(0, IntKind::Long);
        };

        let kind = match (unsigned, long) {
            (true, true) => IntKind::ULong,
            (true, false) if value > i64::from(u32::MAX) => IntKind::ULong,
            (true, false) => IntKind::UInt,
            (false, true) => IntKind::Long,
            (false, false) if value > i64::from(i32::MAX) => IntKind::Long,
            (false, false) => IntKind::Int,
        };
        ExprKind::Int(value, kind)
    }

    fn char_literal(&mut self, span: Span) -> ExprKind {
        let text = self.text(span);
        let inner = text
            .strip_prefix('\'')
            .and_then(|t| t.strip_suffix('\''))
            .unwrap_or("");
        let mut chars = inner.chars();
        let value = match (chars.next(), chars.next()) {
            (Some('\\'), Some(escaped)) => unescape(escaped),
            (Some(c), None) => Some(c),
            _ => None,
        };
        match value {
            Some(c) => ExprKind::Char(c),
            None => {
                self.error_at(format!("Illegal escape: '{inner}'"), span);
                ExprKind::Char('?')
            }
        }
    }

    /// Split a string literal into text and `$name`/`${name}` references.
    fn string_parts(&mut self, span: Span) -> Vec<StringPart> {
        let text = self.text(span);
        let body_start = span.start + 1;
        let body = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or("");

        let mut parts = Vec::new();
        let mut current = String::new();
        let mut iter = body.char_indices().peekable();
        while let Some((idx, c)) = iter.next() {
            match c {
                '\\' => {
                    let Some((_, escaped)) = iter.next() else {
                        break;
                    };
                    match unescape(escaped) {
                        Some(ch) => current.push(ch),
                        None => {
                            let at = offset(body_start, idx);
                            self.error_at(
                                format!("Illegal escape: '\\{escaped}'"),
                                Span::new(at, at + 2),
                            );
                        }
                    }
                }
                '$' if iter.peek().is_some_and(|&(_, n)| n == '{') => {
                    iter.next();
                    let start = idx + 2;
                    let mut depth = 0usize;
                    let mut end = None;
                    for (i, n) in iter.by_ref() {
                        match n {
                            '{' => depth += 1,
                            '}' if depth == 0 => {
                                end = Some(i);
                                break;
                            }
                            '}' => depth -= 1,
                            _ => {}
                        }
                    }
                    let Some(end) = end else {
                        let at = offset(body_start, idx);
                        self.error_at(
                            "Unclosed string template expression".to_string(),
                            Span::new(at, at + 2),
                        );
                        break;
                    };
                    if let Some(part) =
                        self.template_expression(&body[start..end], offset(body_start, start))
                    {
                        if !current.is_empty() {
                            parts.push(StringPart::Text(std::mem::take(&mut current)));
                        }
                        parts.push(part);
                    }
                }
                '$' => {
                    let name_start = iter.peek().map_or(body.len(), |&(i, _)| i);
                    let mut name_end = name_start;
                    while let Some(&(i, n)) = iter.peek() {
                        let valid = if i == name_start {
                            n.is_ascii_alphabetic() || n == '_'
                        } else {
                            n.is_ascii_alphanumeric() || n == '_'
                        };
                        if !valid {
                            break;
                        }
                        name_end = i + n.len_utf8();
                        iter.next();
                    }
                    if name_end == name_start {
                        current.push('$');
                        continue;
                    }
                    if !current.is_empty() {
                        parts.push(StringPart::Text(std::mem::take(&mut current)));
                    }
                    let name = body[name_start..name_end].to_string();
                    let name_span =
                        Span::new(offset(body_start, name_start), offset(body_start, name_end));
                    parts.push(StringPart::Reference(name, name_span));
                }
                _ => current.push(c),
            }
        }
        if !current.is_empty() || parts.is_empty() {
            parts.push(StringPart::Text(current));
        }
        parts
    }

    /// Parse the inside of `${...}`, which starts at byte `start` of the
    /// file. A lone identifier stays a plain reference.
    fn template_expression(&mut self, text: &str, start: u32) -> Option<StringPart> {
        let (mut tokens, lex_errors) = lex(text);
        for error in lex_errors {
            self.error_at(
                format!("Unexpected character '{}'", error.text),
                error.span.shift(start),
            );
        }
        for token in &mut tokens {
            token.span = token.span.shift(start);
        }

        match tokens.as_slice() {
            [] => {
                let at = start.saturating_sub(2);
                self.error_at(
                    "Expecting an expression".to_string(),
                    Span::new(at, start.saturating_add(1)),
                );
                return None;
            }
            [token] if token.kind == TokenKind::Ident => {
                let name = self.text(token.span).to_string();
                return Some(StringPart::Reference(name, token.span));
            }
            _ => {}
        }

        let mut inner = Parser::new(self.source, tokens);
        let expr = inner.parse_expr();
        if expr.is_ok() && !inner.is_at_end() {
            inner.error_here("Unexpected tokens in string template".to_string());
        }
        self.errors.append(&mut inner.errors);
        expr.ok().map(StringPart::Expression)
    }
}

fn offset(base: u32, idx: usize) -> u32 {
    base.saturating_add(u32::try_from(idx).unwrap_or(u32::MAX))
}

fn unescape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'b' => Some('\u{8}'),
        '\\' | '\'' | '"' | '$' => Some(c),
        _ => None,
    }
}
