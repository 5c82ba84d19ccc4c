//! Declarations: functions, classes, objects, properties, type aliases.

use super::{PResult, Parser, Recovered, MODIFIER_WORDS};
use crate::ast::{
    Annotation, Block, ClassDecl, ClassKind, CtorParam, Declaration, FunctionBody, FunctionDecl,
    Modifiers, Param, PropertyDecl, TypeAliasDecl, TypeRef, Visibility,
};
use crate::lexer::TokenKind;
use crate::Span;

impl Parser<'_> {
    pub(super) fn parse_top_level(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            self.skip_semis();
            if self.is_at_end() {
                break;
            }
            let from = self.pos;
            match self.parse_declaration(false) {
                Ok(decl) => declarations.push(decl),
                Err(Recovered) => self.recover_declaration(from, false),
            }
        }
        declarations
    }

    fn parse_declaration(&mut self, member: bool) -> PResult<Declaration> {
        let modifiers = self.parse_modifiers()?;
        match self.peek() {
            Some(TokenKind::Fun) => self.parse_function(modifiers).map(Declaration::Function),
            Some(TokenKind::Class) => self
                .parse_class(modifiers, ClassKind::Class)
                .map(Declaration::Class),
            Some(TokenKind::Interface) => self
                .parse_class(modifiers, ClassKind::Interface)
                .map(Declaration::Class),
            Some(TokenKind::Object) => self
                .parse_class(modifiers, ClassKind::Object)
                .map(Declaration::Class),
            Some(TokenKind::Val | TokenKind::Var) => {
                self.parse_property(modifiers).map(Declaration::Property)
            }
            Some(TokenKind::TypeAlias) => {
                self.parse_type_alias(modifiers).map(Declaration::TypeAlias)
            }
            _ => {
                let message = if member {
                    "Expecting member declaration"
                } else {
                    "Expecting a top level declaration"
                };
                self.error_here(message.to_string());
                Err(Recovered)
            }
        }
    }

    pub(super) fn parse_modifiers(&mut self) -> PResult<Modifiers> {
        let mut modifiers = Modifiers::default();
        loop {
            if self.at(TokenKind::At) {
                let start = self.current_span();
                self.pos += 1;
                let name = self.qualified_name()?;
                if self.at_same_line(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                let span = start.to(self.previous_span());
                modifiers.span = Some(modifiers.span.map_or(span, |s| s.to(span)));
                let short = name.rsplit('.').next().unwrap_or(&name).to_string();
                modifiers.annotations.push(Annotation { name: short, span });
            } else if self.at_modifier() {
                let span = self.current_span();
                let word = self.text(span);
                self.pos += 1;
                modifiers.span = Some(modifiers.span.map_or(span, |s| s.to(span)));
                let visibility = match word {
                    "public" => Some(Visibility::Public),
                    "internal" => Some(Visibility::Internal),
                    "protected" => Some(Visibility::Protected),
                    "private" => Some(Visibility::Private),
                    _ => None,
                };
                match visibility {
                    Some(v) => modifiers.visibility = Some(v),
                    None => modifiers.keywords.push(word.to_string()),
                }
            } else {
                return Ok(modifiers);
            }
        }
    }

    fn decl_start(&self, modifiers: &Modifiers) -> Span {
        modifiers.span.unwrap_or_else(|| self.current_span())
    }

    fn parse_function(&mut self, modifiers: Modifiers) -> PResult<FunctionDecl> {
        let start = self.decl_start(&modifiers);
        self.expect(TokenKind::Fun)?;
        let type_params = self.parse_type_params()?;

        let (mut name, mut name_span) = self.expect_ident()?;
        let mut receiver = None;
        if self.at(TokenKind::Dot) {
            self.pos += 1;
            receiver = Some(TypeRef::simple(name, name_span));
            (name, name_span) = self.expect_ident()?;
        }

        let params = self.parse_params()?;
        let return_type = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = if self.at(TokenKind::LBrace) {
            Some(FunctionBody::Block(self.parse_block()?))
        } else if self.eat(TokenKind::Eq) {
            Some(FunctionBody::Expression(self.parse_expr()?))
        } else {
            None
        };

        Ok(FunctionDecl {
            name,
            name_span,
            modifiers,
            type_params,
            receiver,
            params,
            return_type,
            body,
            span: start.to(self.previous_span()),
        })
    }

    /// `<T, out R : Any>`; variance and bounds are skipped.
    fn parse_type_params(&mut self) -> PResult<Vec<String>> {
        let mut names = Vec::new();
        if !self.eat(TokenKind::Lt) {
            return Ok(names);
        }
        while !self.at(TokenKind::Gt) {
            if matches!(self.current_ident(), Some("in" | "out" | "reified"))
                && self.peek_at(1) == Some(TokenKind::Ident)
            {
                self.pos += 1;
            }
            if self.eat(TokenKind::In) {
                continue;
            }
            let (name, _) = self.expect_ident()?;
            names.push(name);
            if self.eat(TokenKind::Colon) {
                let _ = self.parse_type()?;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(names)
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            // Annotations first, then words such as `vararg`.
            let _ = self.parse_modifiers()?;
            let modifiers = self.parse_ctor_param_modifiers();
            let mut param = self.parse_param()?;
            param.vararg = modifiers.has("vararg");
            params.push(param);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let (name, span) = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let default = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Param {
            name,
            ty,
            default,
            vararg: false,
            span: span.to(self.previous_span()),
        })
    }

    fn parse_class(&mut self, modifiers: Modifiers, kind: ClassKind) -> PResult<ClassDecl> {
        let start = self.decl_start(&modifiers);
        self.pos += 1;
        let (name, name_span) = self.expect_ident()?;
        let type_params = self.parse_type_params()?;

        let mut ctor_params = Vec::new();
        if kind == ClassKind::Class {
            if self.current_ident() == Some("constructor") {
                self.pos += 1;
            }
            if self.at(TokenKind::LParen) {
                ctor_params = self.parse_ctor_params()?;
            }
        }

        let mut supertypes = Vec::new();
        if self.eat(TokenKind::Colon) {
            loop {
                supertypes.push(self.parse_type()?);
                if self.at(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let members = if self.at(TokenKind::LBrace) {
            self.parse_class_body()?
        } else {
            Vec::new()
        };

        Ok(ClassDecl {
            kind,
            name,
            name_span,
            modifiers,
            type_params,
            ctor_params,
            supertypes,
            members,
            span: start.to(self.previous_span()),
        })
    }

    fn parse_ctor_params(&mut self) -> PResult<Vec<CtorParam>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            let modifiers = self.parse_ctor_param_modifiers();
            let property = if self.eat(TokenKind::Val) {
                Some(false)
            } else if self.eat(TokenKind::Var) {
                Some(true)
            } else {
                None
            };
            let param = self.parse_param()?;
            params.push(CtorParam {
                param,
                modifiers,
                property,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    /// Visibility words before `val`/`var` in a constructor parameter.
    fn parse_ctor_param_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        while let Some(word) = self.current_ident() {
            let next_is_decl = matches!(
                self.peek_at(1),
                Some(TokenKind::Val | TokenKind::Var | TokenKind::Ident)
            );
            if !MODIFIER_WORDS.contains(&word) || !next_is_decl {
                break;
            }
            match word {
                "public" => modifiers.visibility = Some(Visibility::Public),
                "internal" => modifiers.visibility = Some(Visibility::Internal),
                "protected" => modifiers.visibility = Some(Visibility::Protected),
                "private" => modifiers.visibility = Some(Visibility::Private),
                other => modifiers.keywords.push(other.to_string()),
            }
            self.pos += 1;
        }
        modifiers
    }

    fn parse_class_body(&mut self) -> PResult<Vec<Declaration>> {
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        loop {
            self.skip_semis();
            match self.peek() {
                None => {
                    self.error_here("Expecting '}'".to_string());
                    return Err(Recovered);
                }
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(members);
                }
                _ => {}
            }
            if self.current_ident() == Some("init") && self.peek_at(1) == Some(TokenKind::LBrace) {
                self.pos += 1;
                let _ = self.parse_block()?;
                continue;
            }
            let from = self.pos;
            match self.parse_declaration(true) {
                Ok(decl) => members.push(decl),
                Err(Recovered) => self.recover_declaration(from, true),
            }
        }
    }

    fn parse_property(&mut self, modifiers: Modifiers) -> PResult<PropertyDecl> {
        let start = self.decl_start(&modifiers);
        let mutable = self.at(TokenKind::Var);
        self.pos += 1;
        let (name, name_span) = self.expect_ident()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let mut initializer = if self.eat(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        // Accessors: `get() = expr` / `get() { ... }`, `set(value) { ... }`.
        let mut has_getter = false;
        while matches!(self.current_ident(), Some("get" | "set"))
            && self.peek_at(1) == Some(TokenKind::LParen)
        {
            let getter = self.current_ident() == Some("get");
            has_getter |= getter;
            self.pos += 1;
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
            if self.eat(TokenKind::Colon) {
                let _ = self.parse_type()?;
            }
            if self.eat(TokenKind::Eq) {
                let expr = self.parse_expr()?;
                if getter && initializer.is_none() {
                    initializer = Some(expr);
                }
            } else if self.at(TokenKind::LBrace) {
                let _ = self.parse_block()?;
            }
        }

        Ok(PropertyDecl {
            name,
            name_span,
            modifiers,
            mutable,
            ty,
            initializer,
            has_getter,
            span: start.to(self.previous_span()),
        })
    }

    fn parse_type_alias(&mut self, modifiers: Modifiers) -> PResult<TypeAliasDecl> {
        let start = self.decl_start(&modifiers);
        self.expect(TokenKind::TypeAlias)?;
        let (name, name_span) = self.expect_ident()?;
        self.expect(TokenKind::Eq)?;
        let target = self.parse_type()?;
        Ok(TypeAliasDecl {
            name,
            name_span,
            modifiers,
            target,
            span: start.to(self.previous_span()),
        })
    }

    pub(super) fn parse_type(&mut self) -> PResult<TypeRef> {
        let start = self.current_span();
        if self.at(TokenKind::LParen) {
            return self.parse_function_type(start);
        }
        if self.eat(TokenKind::Star) {
            return Ok(TypeRef::simple("*", start));
        }

        let name = self.qualified_name()?;
        let mut args = Vec::new();
        if self.at_same_line(TokenKind::Lt) {
            self.pos += 1;
            loop {
                args.push(self.parse_type()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }
        let nullable = self.at_same_line(TokenKind::Question);
        if nullable {
            self.pos += 1;
        }
        Ok(TypeRef {
            name,
            args,
            nullable,
            span: start.to(self.previous_span()),
        })
    }

    fn parse_function_type(&mut self, start: Span) -> PResult<TypeRef> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            args.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Arrow)?;
        let arity = args.len();
        args.push(self.parse_type()?);
        Ok(TypeRef {
            name: format!("Function{arity}"),
            args,
            nullable: false,
            span: start.to(self.previous_span()),
        })
    }

    /// Block body `{ ... }` (shared with control flow).
    pub(super) fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect(TokenKind::LBrace)?;
        let statements = self.parse_statements_until_rbrace()?;
        Ok(Block {
            statements,
            span: start.to(self.previous_span()),
        })
    }
}
