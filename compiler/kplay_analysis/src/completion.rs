//! Code completion at a cursor position.
//!
//! Candidates come from four places, ranked in this order: locals visible
//! at the cursor, project declarations, library symbols of the target, and
//! keywords. After a `.` only members of the receiver are offered, after an
//! `@` only annotations.

use kplay_syntax::ast::{
    Block, ClassDecl, ClassKind, Declaration, Expr, ExprKind, FunctionBody, FunctionDecl, Stmt,
    StringPart, TypeRef,
};
use kplay_syntax::ParsedFile;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::context::AnalysisContext;
use crate::error::CompletionError;
use crate::index::ProjectIndex;
use crate::project::ProjectType;
use crate::stdlib::{self, LibrarySymbol, SymbolKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Variable,
    Property,
    Function,
    Class,
    Keyword,
}

/// One completion proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionCandidate {
    pub label: String,
    pub kind: CompletionKind,
    /// Text inserted in place of the typed prefix.
    pub insert_text: String,
    /// Signature or type shown next to the label.
    pub tail: String,
    /// Position in the returned list, best first.
    pub rank: u32,
}

/// Where a candidate comes from; lower sorts first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Origin {
    Local,
    Project,
    Library,
    Keyword,
}

struct Proposal {
    origin: Origin,
    candidate: CompletionCandidate,
}

/// A name bound inside a function body, with what is known of its type.
struct Binding<'a> {
    name: &'a str,
    ty: Option<&'a TypeRef>,
    init: Option<&'a Expr>,
}

/// Candidates for the cursor at 0-based `line`/`column` of `file`.
///
/// Library symbols are those of `target`'s libraries; the context decides
/// everything else.
pub fn complete(
    ctx: &AnalysisContext,
    file: &str,
    line: u32,
    column: u32,
    target: ProjectType,
) -> Result<Vec<CompletionCandidate>, CompletionError> {
    let parsed = ctx
        .file(file)
        .ok_or_else(|| CompletionError::UnknownFile(file.to_string()))?;
    let out_of_range = || CompletionError::OutOfRange {
        file: file.to_string(),
        line,
        column,
    };
    let offset = parsed
        .line_index
        .offset(line as usize, column as usize)
        .ok_or_else(out_of_range)?;
    let offset_usize = offset as usize;
    if !parsed.text.is_char_boundary(offset_usize) {
        return Err(out_of_range());
    }

    let index = ProjectIndex::build(&ctx.files, stdlib::libraries_for(target).iter().copied());
    let before = &parsed.text[..offset_usize];
    let prefix_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(offset_usize, |(idx, _)| idx);
    let prefix = &before[prefix_start..];
    let head = &before[..prefix_start];

    let scope = Scope::at(parsed, offset);
    let proposals = if let Some(receiver_text) = head.strip_suffix('.') {
        let receiver_text = receiver_text.strip_suffix('?').unwrap_or(receiver_text);
        let receiver = trailing_identifier(receiver_text);
        member_proposals(&index, &scope, receiver)
    } else if head.ends_with('@') {
        annotation_proposals(&index, &ctx.files)
    } else {
        scope_proposals(&index, &scope, &ctx.files)
    };

    let candidates = rank(proposals, prefix);
    tracing::debug!(
        conf_type = %target,
        file,
        prefix,
        candidates = candidates.len(),
        "completed"
    );
    Ok(candidates)
}

fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(text.len(), |(idx, _)| idx);
    &text[start..]
}

/// Filter by `prefix`, dedupe by label and order best first.
///
/// Case-sensitive prefix matches beat case-insensitive ones; then origin,
/// then label.
fn rank(proposals: Vec<Proposal>, prefix: &str) -> Vec<CompletionCandidate> {
    let lower = prefix.to_lowercase();
    let mut scored: Vec<(u8, Origin, Proposal)> = proposals
        .into_iter()
        .filter_map(|p| {
            let label = &p.candidate.label;
            let quality = if label.starts_with(prefix) {
                0
            } else if label.to_lowercase().starts_with(&lower) {
                1
            } else {
                return None;
            };
            Some((quality, p.origin, p))
        })
        .collect();
    scored.sort_by(|(qa, oa, a), (qb, ob, b)| {
        (qa, oa, &a.candidate.label).cmp(&(qb, ob, &b.candidate.label))
    });

    let mut seen = FxHashSet::default();
    scored
        .into_iter()
        .filter(|(_, _, p)| seen.insert(p.candidate.label.clone()))
        .enumerate()
        .map(|(rank, (_, _, p))| CompletionCandidate {
            rank: u32::try_from(rank).unwrap_or(u32::MAX),
            ..p.candidate
        })
        .collect()
}

fn proposal(
    origin: Origin,
    kind: CompletionKind,
    label: &str,
    insert_text: String,
    tail: String,
) -> Proposal {
    Proposal {
        origin,
        candidate: CompletionCandidate {
            label: label.to_string(),
            kind,
            insert_text,
            tail,
            rank: 0,
        },
    }
}

fn call_text(name: &str, takes_args: bool) -> String {
    if takes_args {
        format!("{name}(")
    } else {
        format!("{name}()")
    }
}

fn function_proposal(origin: Origin, f: &FunctionDecl) -> Proposal {
    let params: Vec<String> = f
        .params
        .iter()
        .map(|p| format!("{}: {}", p.name, type_text(&p.ty)))
        .collect();
    // Expression bodies without a written type are not inferred here.
    let result = match (&f.return_type, &f.body) {
        (Some(ty), _) => format!(": {}", type_text(ty)),
        (None, Some(FunctionBody::Expression(_))) => String::new(),
        (None, _) => ": Unit".to_string(),
    };
    proposal(
        origin,
        CompletionKind::Function,
        &f.name,
        call_text(&f.name, !f.params.is_empty()),
        format!("({}){result}", params.join(", ")),
    )
}

fn type_text(ty: &TypeRef) -> String {
    let mut text = ty.short_name().to_string();
    if !ty.args.is_empty() {
        let args: Vec<String> = ty.args.iter().map(type_text).collect();
        text = format!("{text}<{}>", args.join(", "));
    }
    if ty.nullable {
        text.push('?');
    }
    text
}

fn declaration_proposal(origin: Origin, decl: &Declaration) -> Option<Proposal> {
    let found = match decl {
        Declaration::Function(f) if f.receiver.is_none() => function_proposal(origin, f),
        Declaration::Function(_) => return None,
        Declaration::Class(c) => proposal(
            origin,
            CompletionKind::Class,
            &c.name,
            c.name.clone(),
            class_tail(c).to_string(),
        ),
        Declaration::Property(p) => proposal(
            origin,
            CompletionKind::Property,
            &p.name,
            p.name.clone(),
            p.ty.as_ref().map(type_text).unwrap_or_default(),
        ),
        Declaration::TypeAlias(t) => proposal(
            origin,
            CompletionKind::Class,
            &t.name,
            t.name.clone(),
            type_text(&t.target),
        ),
    };
    Some(found)
}

fn class_tail(c: &ClassDecl) -> &'static str {
    match c.kind {
        ClassKind::Class => "class",
        ClassKind::Interface => "interface",
        ClassKind::Object => "object",
    }
}

fn library_proposal(symbol: &LibrarySymbol) -> Option<Proposal> {
    let (kind, insert_text) = match symbol.kind {
        SymbolKind::Function => (
            CompletionKind::Function,
            call_text(symbol.name, symbol.max_args != Some(0)),
        ),
        SymbolKind::Class => (CompletionKind::Class, symbol.name.to_string()),
        SymbolKind::Property => (CompletionKind::Property, symbol.name.to_string()),
        SymbolKind::Annotation => return None,
    };
    Some(proposal(
        Origin::Library,
        kind,
        symbol.name,
        insert_text,
        symbol.returns.to_string(),
    ))
}

fn scope_proposals(index: &ProjectIndex<'_>, scope: &Scope<'_>, files: &[ParsedFile]) -> Vec<Proposal> {
    let mut proposals: Vec<Proposal> = scope
        .bindings
        .iter()
        .map(|b| {
            proposal(
                Origin::Local,
                CompletionKind::Variable,
                b.name,
                b.name.to_string(),
                b.ty.map(type_text).unwrap_or_default(),
            )
        })
        .collect();
    if let Some(class) = scope.class {
        proposals.extend(class_members(class, Origin::Local));
    }
    proposals.extend(
        files
            .iter()
            .flat_map(|f| &f.declarations)
            .filter_map(|d| declaration_proposal(Origin::Project, d)),
    );
    proposals.extend(index.library_symbols().filter_map(library_proposal));
    proposals.extend(stdlib::KEYWORDS.iter().map(|k| {
        proposal(
            Origin::Keyword,
            CompletionKind::Keyword,
            k,
            (*k).to_string(),
            String::new(),
        )
    }));
    proposals
}

fn annotation_proposals(index: &ProjectIndex<'_>, files: &[ParsedFile]) -> Vec<Proposal> {
    let project = files
        .iter()
        .flat_map(|f| &f.declarations)
        .filter_map(|d| match d {
            Declaration::Class(c) if c.modifiers.has("annotation") => Some(proposal(
                Origin::Project,
                CompletionKind::Class,
                &c.name,
                c.name.clone(),
                "annotation".to_string(),
            )),
            _ => None,
        });
    let library = index
        .library_symbols()
        .filter(|s| s.kind == SymbolKind::Annotation)
        .map(|s| {
            proposal(
                Origin::Library,
                CompletionKind::Class,
                s.name,
                s.name.to_string(),
                "annotation".to_string(),
            )
        });
    project.chain(library).collect()
}

fn member_proposals(index: &ProjectIndex<'_>, scope: &Scope<'_>, receiver: &str) -> Vec<Proposal> {
    let class = if receiver == "this" {
        scope.class
    } else if let Some(binding) = scope.bindings.iter().rev().find(|b| b.name == receiver) {
        class_of(index, binding.ty, binding.init)
    } else if let Some(property) = index.property(receiver) {
        class_of(index, property.ty.as_ref(), property.initializer.as_ref())
    } else {
        index.class(receiver).filter(|c| c.kind == ClassKind::Object)
    };
    class.map_or_else(Vec::new, |c| class_members(c, Origin::Project).collect())
}

/// Project class a value of the given declared type or initializer has.
fn class_of<'a>(
    index: &ProjectIndex<'a>,
    ty: Option<&TypeRef>,
    init: Option<&Expr>,
) -> Option<&'a ClassDecl> {
    if let Some(ty) = ty {
        return index.class(ty.short_name());
    }
    match &init?.kind {
        ExprKind::Call { callee, .. } => match &callee.kind {
            ExprKind::Name(name) => index.class(name),
            _ => None,
        },
        ExprKind::Name(name) => index.class(name).filter(|c| c.kind == ClassKind::Object),
        _ => None,
    }
}

fn class_members(class: &ClassDecl, origin: Origin) -> impl Iterator<Item = Proposal> + '_ {
    let ctor = class
        .ctor_params
        .iter()
        .filter(|c| c.property.is_some())
        .map(move |c| {
            proposal(
                origin,
                CompletionKind::Property,
                &c.param.name,
                c.param.name.clone(),
                type_text(&c.param.ty),
            )
        });
    let members = class
        .members
        .iter()
        .filter_map(move |d| declaration_proposal(origin, d));
    ctor.chain(members)
}

/// What is visible at the cursor inside function bodies.
struct Scope<'a> {
    bindings: Vec<Binding<'a>>,
    class: Option<&'a ClassDecl>,
}

impl<'a> Scope<'a> {
    fn at(file: &'a ParsedFile, offset: u32) -> Self {
        let mut scope = Scope {
            bindings: Vec::new(),
            class: None,
        };
        scope.visit_declarations(&file.declarations, offset);
        scope
    }

    fn visit_declarations(&mut self, declarations: &'a [Declaration], offset: u32) {
        for decl in declarations {
            if !decl.span().contains(offset) {
                continue;
            }
            match decl {
                Declaration::Function(f) => self.visit_function(f, offset),
                Declaration::Class(c) => {
                    self.class = Some(c);
                    self.visit_declarations(&c.members, offset);
                }
                Declaration::Property(p) => {
                    if let Some(init) = &p.initializer {
                        self.visit_expr(init, offset);
                    }
                }
                Declaration::TypeAlias(_) => {}
            }
        }
    }

    fn visit_function(&mut self, f: &'a FunctionDecl, offset: u32) {
        for param in &f.params {
            self.bindings.push(Binding {
                name: &param.name,
                ty: Some(&param.ty),
                init: None,
            });
        }
        match &f.body {
            Some(FunctionBody::Block(block)) => self.visit_block(block, offset),
            Some(FunctionBody::Expression(expr)) => self.visit_expr(expr, offset),
            None => {}
        }
    }

    fn visit_block(&mut self, block: &'a Block, offset: u32) {
        for stmt in &block.statements {
            match stmt {
                Stmt::Local(local) => {
                    if let Some(init) = &local.initializer {
                        self.visit_expr(init, offset);
                    }
                    if local.span.end <= offset {
                        self.bindings.push(Binding {
                            name: &local.name,
                            ty: local.ty.as_ref(),
                            init: local.initializer.as_ref(),
                        });
                    }
                }
                Stmt::Expr(expr) | Stmt::Return(Some(expr), _) => self.visit_expr(expr, offset),
                Stmt::Return(None, _) => {}
                Stmt::Assign { target, value, .. } => {
                    self.visit_expr(target, offset);
                    self.visit_expr(value, offset);
                }
                Stmt::While { condition, body } => {
                    self.visit_expr(condition, offset);
                    if body.span.contains(offset) {
                        self.visit_block(body, offset);
                    }
                }
                Stmt::For {
                    variable,
                    iterable,
                    body,
                } => {
                    self.visit_expr(iterable, offset);
                    if body.span.contains(offset) {
                        self.bindings.push(Binding {
                            name: variable,
                            ty: None,
                            init: None,
                        });
                        self.visit_block(body, offset);
                    }
                }
            }
        }
    }

    fn visit_expr(&mut self, expr: &'a Expr, offset: u32) {
        if !expr.span.contains(offset) {
            return;
        }
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                self.visit_expr(callee, offset);
                for arg in args {
                    self.visit_expr(arg, offset);
                }
            }
            ExprKind::Member { receiver, .. } => self.visit_expr(receiver, offset),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs, offset);
                self.visit_expr(rhs, offset);
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand, offset),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(condition, offset);
                for block in std::iter::once(then_branch).chain(else_branch) {
                    if block.span.contains(offset) {
                        self.visit_block(block, offset);
                    }
                }
            }
            ExprKind::Lambda { params, body } => {
                if params.is_empty() {
                    self.bindings.push(Binding {
                        name: "it",
                        ty: None,
                        init: None,
                    });
                }
                for param in params {
                    self.bindings.push(Binding {
                        name: param,
                        ty: None,
                        init: None,
                    });
                }
                self.visit_block(body, offset);
            }
            ExprKind::Str(parts) => {
                for part in parts {
                    if let StringPart::Expression(value) = part {
                        self.visit_expr(value, offset);
                    }
                }
            }
            ExprKind::Int(..)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Char(_)
            | ExprKind::Null
            | ExprKind::Name(_) => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
