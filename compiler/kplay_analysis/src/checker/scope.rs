//! Lexical scopes and closure-style state guards for the checker.
//!
//! Guards take a closure so the previous state is restored on every path,
//! including early returns inside the closure.

use kplay_syntax::Span;
use rustc_hash::FxHashMap;

use super::Checker;
use crate::types::Ty;

#[derive(Clone, Debug)]
pub(crate) struct Local {
    pub ty: Ty,
    pub mutable: bool,
    /// Parameters are never reported as unused.
    pub param: bool,
    pub used: bool,
    pub assigned: bool,
    pub span: Span,
}

/// Stack of frames, innermost last.
#[derive(Debug, Default)]
pub(crate) struct Scopes {
    frames: Vec<FxHashMap<String, Local>>,
}

impl Scopes {
    fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Drop the innermost frame, returning its locals in declaration order.
    fn pop(&mut self) -> Vec<(String, Local)> {
        let mut locals: Vec<(String, Local)> = self
            .frames
            .pop()
            .map(|frame| frame.into_iter().collect())
            .unwrap_or_default();
        locals.sort_by_key(|(_, local)| local.span.start);
        locals
    }

    pub(crate) fn declare_param(&mut self, name: &str, ty: Ty, span: Span) {
        self.insert(
            name,
            Local {
                ty,
                mutable: false,
                param: true,
                used: false,
                assigned: false,
                span,
            },
        );
    }

    /// Returns `false` when `name` already exists in the innermost frame.
    pub(crate) fn declare_local(&mut self, name: &str, ty: Ty, mutable: bool, span: Span) -> bool {
        let fresh = !self
            .frames
            .last()
            .is_some_and(|frame| frame.contains_key(name));
        self.insert(
            name,
            Local {
                ty,
                mutable,
                param: false,
                used: false,
                assigned: false,
                span,
            },
        );
        fresh
    }

    fn insert(&mut self, name: &str, local: Local) {
        if self.frames.is_empty() {
            self.push();
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), local);
        }
    }

    pub(crate) fn lookup_mut(&mut self, name: &str) -> Option<&mut Local> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
    }
}

impl Checker<'_, '_> {
    /// Run `f` in a fresh frame, then report locals that were never used.
    pub(crate) fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push();
        let result = f(self);
        for (name, local) in self.scopes.pop() {
            if local.param || name == "_" {
                continue;
            }
            if !local.used {
                self.warning(local.span, format!("Variable '{name}' is never used"));
            } else if local.mutable && !local.assigned {
                self.warning(
                    local.span,
                    "Variable is never modified, so it can be declared using 'val'",
                );
            }
        }
        result
    }

    /// Run `f` as the body of a function with the given result type.
    pub(crate) fn with_function<T>(
        &mut self,
        return_type: Ty,
        composable: bool,
        receiver: Option<Ty>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let prev_return = self.return_type.replace(return_type);
        let prev_receiver = std::mem::replace(&mut self.receiver, receiver);
        let prev_composable = std::mem::replace(&mut self.composable, composable);

        let result = f(self);

        self.return_type = prev_return;
        self.receiver = prev_receiver;
        self.composable = prev_composable;
        result
    }

    pub(crate) fn with_composable<T>(
        &mut self,
        composable: bool,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let prev = std::mem::replace(&mut self.composable, composable);
        let result = f(self);
        self.composable = prev;
        result
    }
}
