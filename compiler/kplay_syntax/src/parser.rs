//! Recursive descent parser.
//!
//! Parsing never fails as a whole: syntax errors are collected on the
//! [`ParsedFile`] and the parser resynchronizes at the next declaration or
//! statement boundary, so the pipelines always get a (possibly partial)
//! declaration tree.

mod expr;
mod items;

use crate::ast::{Declaration, Import};
use crate::lexer::{lex, Token, TokenKind};
use crate::{LineIndex, Span};

/// A syntax error with its byte range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

/// One parsed source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedFile {
    pub name: String,
    pub text: String,
    /// `package a.b.c`, if present.
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub declarations: Vec<Declaration>,
    pub errors: Vec<SyntaxError>,
    pub line_index: LineIndex,
}

impl ParsedFile {
    /// 1-based line and column of a span start.
    pub fn line_col(&self, span: Span) -> (u32, u32) {
        self.line_index.line_col(span.start)
    }

    /// JVM facade class name: `Main.kt` → `MainKt`.
    pub fn facade_name(&self) -> String {
        let stem = self.name.rsplit('/').next().unwrap_or(&self.name);
        let stem = stem.strip_suffix(".kt").unwrap_or(stem);
        let mut facade: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if let Some(first) = facade.get(..1) {
            let upper = first.to_ascii_uppercase();
            facade.replace_range(..1, &upper);
        }
        facade.push_str("Kt");
        facade
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse one source file.
pub fn parse_file(name: &str, text: &str) -> ParsedFile {
    let (tokens, lex_errors) = lex(text);
    let mut parser = Parser::new(text, tokens);
    for error in lex_errors {
        parser.error_at(format!("Unexpected character '{}'", error.text), error.span);
    }

    let package = parser.parse_package();
    let imports = parser.parse_imports();
    let declarations = parser.parse_top_level();

    let mut errors = parser.errors;
    errors.sort_by_key(|e| e.span.start);
    tracing::debug!(
        file = name,
        declarations = declarations.len(),
        errors = errors.len(),
        "parsed"
    );

    ParsedFile {
        name: name.to_string(),
        text: text.to_string(),
        package,
        imports,
        declarations,
        errors,
        line_index: LineIndex::new(text),
    }
}

/// Words that act as modifiers in front of a declaration keyword.
const MODIFIER_WORDS: &[&str] = &[
    "public",
    "private",
    "internal",
    "protected",
    "open",
    "final",
    "abstract",
    "override",
    "data",
    "enum",
    "sealed",
    "inline",
    "suspend",
    "operator",
    "infix",
    "const",
    "lateinit",
    "companion",
    "external",
    "tailrec",
    "vararg",
    "annotation",
];

/// Marker for "an error was reported here, resynchronize".
pub(crate) struct Recovered;

pub(crate) type PResult<T> = Result<T, Recovered>;

pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    // Cursor

    #[inline]
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    #[inline]
    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// The current token starts a new line.
    #[inline]
    fn at_newline(&self) -> bool {
        self.tokens.get(self.pos).is_some_and(|t| t.newline_before)
    }

    /// `kind` is next and on the same line.
    #[inline]
    fn at_same_line(&self, kind: TokenKind) -> bool {
        self.at(kind) && !self.at_newline()
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some(token) => token.span,
            None => {
                let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
                Span::new(end, end)
            }
        }
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map_or(Span::default(), |t| t.span)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).copied();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Span> {
        if self.at(kind) {
            let span = self.current_span();
            self.pos += 1;
            Ok(span)
        } else {
            self.error_here(format!("Expecting {}", kind.describe()));
            Err(Recovered)
        }
    }

    fn expect_ident(&mut self) -> PResult<(String, Span)> {
        if self.at(TokenKind::Ident) {
            let span = self.current_span();
            self.pos += 1;
            Ok((self.text(span).to_string(), span))
        } else {
            self.error_here("Expecting an identifier".to_string());
            Err(Recovered)
        }
    }

    #[inline]
    fn text(&self, span: Span) -> &'a str {
        self.source
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
    }

    /// Text of the current token if it is an identifier.
    fn current_ident(&self) -> Option<&'a str> {
        match self.tokens.get(self.pos) {
            Some(token) if token.kind == TokenKind::Ident => Some(self.text(token.span)),
            _ => None,
        }
    }

    fn skip_semis(&mut self) {
        while self.eat(TokenKind::Semi) {}
    }

    /// Skip a balanced `open ... close` group starting at the current token.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        if !self.eat(open) {
            return;
        }
        let mut depth = 1usize;
        while let Some(token) = self.advance() {
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    // Errors

    fn error_at(&mut self, message: String, span: Span) {
        self.errors.push(SyntaxError { message, span });
    }

    fn error_here(&mut self, message: String) {
        let span = self.current_span();
        self.error_at(message, span);
    }

    // File header

    fn parse_package(&mut self) -> Option<String> {
        self.skip_semis();
        if !self.eat(TokenKind::Package) {
            return None;
        }
        let name = self.qualified_name().ok();
        self.skip_semis();
        name
    }

    fn parse_imports(&mut self) -> Vec<Import> {
        let mut imports = Vec::new();
        while self.at(TokenKind::Import) {
            let from = self.pos;
            let start = self.current_span();
            self.pos += 1;
            let Ok(path) = self.qualified_name() else {
                self.recover_statement(from);
                continue;
            };
            let mut star = false;
            if self.at(TokenKind::Dot) && self.peek_at(1) == Some(TokenKind::Star) {
                self.pos += 2;
                star = true;
            }
            let mut alias = None;
            if self.current_ident() == Some("as") {
                self.pos += 1;
                alias = self.expect_ident().ok().map(|(name, _)| name);
            }
            imports.push(Import {
                path,
                alias,
                star,
                span: start.to(self.previous_span()),
            });
            self.skip_semis();
        }
        imports
    }

    fn qualified_name(&mut self) -> PResult<String> {
        let (mut name, _) = self.expect_ident()?;
        while self.at(TokenKind::Dot) && self.peek_at(1) == Some(TokenKind::Ident) {
            self.pos += 1;
            let (segment, _) = self.expect_ident()?;
            name.push('.');
            name.push_str(&segment);
        }
        Ok(name)
    }

    // Recovery

    /// True if the current token can start a declaration.
    fn at_declaration_start(&self) -> bool {
        match self.peek() {
            Some(
                TokenKind::Fun
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Object
                | TokenKind::Val
                | TokenKind::Var
                | TokenKind::TypeAlias
                | TokenKind::At,
            ) => true,
            Some(TokenKind::Ident) => self.at_modifier(),
            _ => false,
        }
    }

    /// Current identifier is a modifier word followed by more declaration.
    fn at_modifier(&self) -> bool {
        let Some(word) = self.current_ident() else {
            return false;
        };
        if !MODIFIER_WORDS.contains(&word) {
            return false;
        }
        match self.peek_at(1) {
            Some(
                TokenKind::Fun
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Object
                | TokenKind::Val
                | TokenKind::Var
                | TokenKind::TypeAlias
                | TokenKind::At,
            ) => true,
            Some(TokenKind::Ident) => {
                let next = self.tokens[self.pos + 1].span;
                MODIFIER_WORDS.contains(&self.text(next))
            }
            _ => false,
        }
    }

    /// Skip to the next declaration start (or `}` when nested).
    ///
    /// `from` is where the failed declaration began; recovery always moves
    /// past it.
    fn recover_declaration(&mut self, from: usize, nested: bool) {
        while !self.is_at_end() {
            if self.pos > from && self.at_declaration_start() {
                return;
            }
            match self.peek() {
                Some(TokenKind::RBrace) if nested => return,
                Some(TokenKind::LBrace) => self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace),
                _ => self.pos += 1,
            }
        }
    }

    /// Skip to the next line, `;` or closing `}` of the enclosing block.
    fn recover_statement(&mut self, from: usize) {
        while !self.is_at_end() {
            if self.pos > from && self.at_newline() {
                return;
            }
            match self.peek() {
                Some(TokenKind::RBrace) => return,
                Some(TokenKind::Semi) => {
                    self.pos += 1;
                    return;
                }
                Some(TokenKind::LBrace) => self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace),
                _ => self.pos += 1,
            }
        }
    }
}

/// Grow the stack before deep recursion on native targets.
#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 64 * 1024;
    const GROW_BY: usize = 1024 * 1024;
    stacker::maybe_grow(RED_ZONE, GROW_BY, f)
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
