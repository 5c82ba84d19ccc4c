//! Declaration tree produced by the parser.
//!
//! Only the shapes the pipelines care about are modelled: declarations in
//! full, bodies as a small statement/expression language.

use crate::Span;

/// Declared visibility. `None` in [`Modifiers`] means "not written".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Internal,
    Protected,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub span: Span,
}

/// Modifier keywords and annotations in front of a declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub annotations: Vec<Annotation>,
    /// Remaining modifier words (`open`, `override`, `data`, ...), in order.
    pub keywords: Vec<String>,
    pub span: Option<Span>,
}

impl Modifiers {
    pub fn has(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Visibility with Kotlin's default applied.
    pub fn effective_visibility(&self) -> Visibility {
        self.visibility.unwrap_or(Visibility::Public)
    }
}

/// A type as written: `Int`, `List<String>?`, `kotlin.Int`, `(Int) -> Unit`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeRef {
    /// Dotted name; function types use `Function<N>`.
    pub name: String,
    pub args: Vec<TypeRef>,
    pub nullable: bool,
    pub span: Span,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        TypeRef {
            name: name.into(),
            args: Vec::new(),
            nullable: false,
            span,
        }
    }

    /// Last segment of the dotted name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expr>,
    pub vararg: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionBody {
    Block(Block),
    Expression(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub name_span: Span,
    pub modifiers: Modifiers,
    /// `<T, R>` names; bounds are not modelled.
    pub type_params: Vec<String>,
    pub receiver: Option<TypeRef>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: Option<FunctionBody>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
}

/// Primary constructor parameter; `val`/`var` ones are also properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CtorParam {
    pub param: Param,
    pub modifiers: Modifiers,
    /// `Some(mutable)` when declared with `val`/`var`.
    pub property: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDecl {
    pub kind: ClassKind,
    pub name: String,
    pub name_span: Span,
    pub modifiers: Modifiers,
    pub type_params: Vec<String>,
    pub ctor_params: Vec<CtorParam>,
    pub supertypes: Vec<TypeRef>,
    pub members: Vec<Declaration>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: String,
    pub name_span: Span,
    pub modifiers: Modifiers,
    pub mutable: bool,
    pub ty: Option<TypeRef>,
    pub initializer: Option<Expr>,
    /// A custom getter was written.
    pub has_getter: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub name: String,
    pub name_span: Span,
    pub modifiers: Modifiers,
    pub target: TypeRef,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Declaration {
    Function(FunctionDecl),
    Class(ClassDecl),
    Property(PropertyDecl),
    TypeAlias(TypeAliasDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Function(f) => &f.name,
            Declaration::Class(c) => &c.name,
            Declaration::Property(p) => &p.name,
            Declaration::TypeAlias(t) => &t.name,
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        match self {
            Declaration::Function(f) => &f.modifiers,
            Declaration::Class(c) => &c.modifiers,
            Declaration::Property(p) => &p.modifiers,
            Declaration::TypeAlias(t) => &t.modifiers,
        }
    }

    pub fn name_span(&self) -> Span {
        match self {
            Declaration::Function(f) => f.name_span,
            Declaration::Class(c) => c.name_span,
            Declaration::Property(p) => p.name_span,
            Declaration::TypeAlias(t) => t.name_span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Declaration::Function(f) => f.span,
            Declaration::Class(c) => c.span,
            Declaration::Property(p) => p.span,
            Declaration::TypeAlias(t) => t.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    pub star: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalDecl {
    pub name: String,
    pub mutable: bool,
    pub ty: Option<TypeRef>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stmt {
    Local(LocalDecl),
    Expr(Expr),
    Return(Option<Expr>, Span),
    Assign {
        target: Expr,
        op: AssignOp,
        value: Expr,
    },
    While {
        condition: Expr,
        body: Block,
    },
    For {
        variable: String,
        iterable: Expr,
        body: Block,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    Range,
    Elvis,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Range => "..",
            BinaryOp::Elvis => "?:",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::LtEq
                | BinaryOp::GtEq
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Plus,
}

/// Integer literal suffix.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int,
    Long,
    UInt,
    ULong,
}

/// Piece of a string literal; `$name` and `${name}` become references,
/// any other `${...}` an expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StringPart {
    Text(String),
    Reference(String, Span),
    Expression(Expr),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    Int(i64, IntKind),
    /// Float literals keep their source text.
    Float(String),
    Bool(bool),
    Char(char),
    Str(Vec<StringPart>),
    Null,
    Name(String),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        receiver: Box<Expr>,
        name: String,
        safe: bool,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    Lambda {
        params: Vec<String>,
        body: Block,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}
