//! Tokenizer built on `logos`.
//!
//! Comments are dropped, newlines are folded into the `newline_before` flag
//! of the following token (Kotlin statements are newline-terminated, so the
//! parser needs to know, but never wants a token for it).

use logos::Logos;

use crate::Span;

/// Token kinds produced by the lexer.
#[derive(Logos, Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,
    #[token("\n")]
    Newline,

    // Hard keywords
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("fun")]
    Fun,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("object")]
    Object,
    #[token("val")]
    Val,
    #[token("var")]
    Var,
    #[token("typealias")]
    TypeAlias,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Literals and names
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
    #[regex(r"[0-9][0-9_]*[lLuU]*")]
    #[regex(r"0[xX][0-9a-fA-F_]+[lLuU]*")]
    IntLit,
    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fF]?")]
    FloatLit,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLit,
    #[regex(r"'([^'\\\n]|\\.)'")]
    CharLit,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("?.")]
    SafeDot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("->")]
    Arrow,
    #[token("?")]
    Question,
    #[token("?:")]
    Elvis,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,
    #[token("@")]
    At,
}

/// Consume a block comment after its opening `/*`. Comments nest, as in
/// Kotlin. An unterminated comment swallows the rest of the input and is
/// reported as an error.
fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    let rest = lex.remainder();
    let mut depth = 1usize;
    let mut pos = 0;
    while let Some(offset) = rest[pos..].find(['/', '*']) {
        let at = pos + offset;
        if rest[at..].starts_with("*/") {
            depth -= 1;
            pos = at + 2;
            if depth == 0 {
                lex.bump(pos);
                return true;
            }
        } else if rest[at..].starts_with("/*") {
            depth += 1;
            pos = at + 2;
        } else {
            pos = at + 1;
        }
    }
    lex.bump(rest.len());
    false
}

impl TokenKind {
    /// Human-readable token description for error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::IntLit | TokenKind::FloatLit => "number",
            TokenKind::StringLit => "string literal",
            TokenKind::CharLit => "character literal",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Colon => "':'",
            TokenKind::Eq => "'='",
            TokenKind::Comma => "','",
            TokenKind::Gt => "'>'",
            _ => "token",
        }
    }
}

/// A lexed token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

/// Characters the lexer could not make sense of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
    pub text: String,
}

/// Lex `source` into tokens plus any unrecognized input.
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut newline_before = false;
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        match result {
            Ok(TokenKind::Newline) => newline_before = true,
            Ok(TokenKind::LineComment) => {}
            Ok(TokenKind::BlockComment) => {
                newline_before |= lexer.slice().contains('\n');
            }
            Ok(kind) => {
                tokens.push(Token {
                    kind,
                    span,
                    newline_before,
                });
                newline_before = false;
            }
            Err(()) => errors.push(LexError {
                span,
                text: lexer.slice().to_string(),
            }),
        }
    }

    (tokens, errors)
}
