use crate::language::{
    ast::*,
    errors::{NameKind, SemaError, SemaResult},
    span::Span,
    symbols::{param_map, SymbolTable},
    types::{BorrowKind, CoreType, Mutability, TypeRef},
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct TypecheckOptions {
    /// Deref steps tried on a method receiver before giving up.
    pub autoderef_limit: usize,
    pub check_impl_methods: bool,
}

impl Default for TypecheckOptions {
    fn default() -> Self {
        Self {
            autoderef_limit: 64,
            check_impl_methods: true,
        }
    }
}

#[derive(Clone, Debug)]
struct LocalVar {
    mutability: Mutability,
    name: String,
    ty: TypeRef,
}

/// One lexical frame. Variables are kept in declaration order so that the
/// latest declaration of a name shadows the earlier ones.
#[derive(Clone, Debug, Default)]
struct Scope {
    vars: Vec<LocalVar>,
    types: Vec<(String, TypeRef)>,
    type_params: HashMap<String, TypeRef>,
    traits: Vec<Path>,
}

fn merge(target: &mut TypeRef, other: &TypeRef, span: Span) -> SemaResult<()> {
    target
        .merge_with(other)
        .map_err(|conflict| conflict.into_error(span))
}

fn literal_type(literal: &Literal) -> TypeRef {
    match literal {
        Literal::Integer { ty, .. } | Literal::Float { ty, .. } => {
            ty.clone().unwrap_or(TypeRef::Wildcard)
        }
        Literal::Bool(_) => TypeRef::Primitive(CoreType::Bool),
        Literal::Char(_) => TypeRef::Primitive(CoreType::Char),
        Literal::String(_) => {
            TypeRef::borrow(BorrowKind::Shared, TypeRef::Primitive(CoreType::Str))
        }
    }
}

/// Wraps the node in `count` explicit dereferences, each typed one borrow
/// layer shallower than its operand.
fn wrap_in_derefs(slot: &mut Box<ExprNode>, count: usize) {
    for _ in 0..count {
        let span = slot.span;
        let inner = std::mem::replace(slot, ExprNode::boxed(ExprKind::Tuple(Vec::new()), span));
        let mut res_type = inner.res_type.clone();
        res_type.deref();
        **slot = ExprNode {
            kind: ExprKind::Deref(inner),
            res_type,
            span,
        };
    }
}

/// Strips every reference layer, reporting the kind of the outermost one.
fn strip_references(ty: &TypeRef) -> (TypeRef, Option<BorrowKind>) {
    let outer = match ty {
        TypeRef::Borrow { kind, .. } => Some(*kind),
        _ => None,
    };
    let mut inner = ty.clone();
    while inner.deref() {}
    (inner, outer)
}

mod checker;
mod method;
mod pattern;
#[cfg(test)]
mod test_support;

pub use checker::ExprTypeChecker;

pub fn check_crate(krate: &mut Crate) -> SemaResult<()> {
    check_crate_with_options(krate, &TypecheckOptions::default())
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn check_crate_with_options(krate: &mut Crate, options: &TypecheckOptions) -> SemaResult<()> {
    let Crate { root, symbols } = krate;
    let mut checker = ExprTypeChecker::new(symbols, options);
    checker.check_module(root, &[])
}
