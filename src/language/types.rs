use crate::language::{
    ast::Path,
    errors::{SemaError, SemaResult},
    span::Span,
};
use std::{collections::HashMap, fmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoreType {
    Bool,
    Char,
    Str,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    F32,
    F64,
}

impl CoreType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => CoreType::Bool,
            "char" => CoreType::Char,
            "str" => CoreType::Str,
            "u8" => CoreType::U8,
            "u16" => CoreType::U16,
            "u32" => CoreType::U32,
            "u64" => CoreType::U64,
            "u128" => CoreType::U128,
            "usize" => CoreType::Usize,
            "i8" => CoreType::I8,
            "i16" => CoreType::I16,
            "i32" => CoreType::I32,
            "i64" => CoreType::I64,
            "i128" => CoreType::I128,
            "isize" => CoreType::Isize,
            "f32" => CoreType::F32,
            "f64" => CoreType::F64,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            CoreType::Bool => "bool",
            CoreType::Char => "char",
            CoreType::Str => "str",
            CoreType::U8 => "u8",
            CoreType::U16 => "u16",
            CoreType::U32 => "u32",
            CoreType::U64 => "u64",
            CoreType::U128 => "u128",
            CoreType::Usize => "usize",
            CoreType::I8 => "i8",
            CoreType::I16 => "i16",
            CoreType::I32 => "i32",
            CoreType::I64 => "i64",
            CoreType::I128 => "i128",
            CoreType::Isize => "isize",
            CoreType::F32 => "f32",
            CoreType::F64 => "f64",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BorrowKind {
    Shared,
    Unique,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutability {
    Immutable,
    Mutable,
}

impl Mutability {
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

/// A possibly partial type. `Wildcard` is an inference variable that any
/// other type can be merged into.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeRef {
    Wildcard,
    Unit,
    Primitive(CoreType),
    Generic(String),
    Borrow {
        kind: BorrowKind,
        inner: Box<TypeRef>,
    },
    Path(Path),
    Tuple(Vec<TypeRef>),
    Array {
        inner: Box<TypeRef>,
        size: Option<u64>,
    },
}

/// Two types that could not be unified, rendered for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflict {
    pub expected: String,
    pub found: String,
}

impl MergeConflict {
    pub fn new(expected: &TypeRef, found: &TypeRef) -> Self {
        Self {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn into_error(self, span: Span) -> SemaError {
        SemaError::mismatch(self.expected, self.found, span)
    }
}

impl TypeRef {
    pub fn primitive(name: &str) -> Option<Self> {
        CoreType::from_name(name).map(TypeRef::Primitive)
    }

    pub fn borrow(kind: BorrowKind, inner: TypeRef) -> Self {
        TypeRef::Borrow {
            kind,
            inner: Box::new(inner),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TypeRef::Wildcard)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeRef::Borrow { .. })
    }

    pub fn is_path(&self) -> bool {
        matches!(self, TypeRef::Path(_))
    }

    /// True when no wildcard appears anywhere in the type.
    pub fn is_concrete(&self) -> bool {
        match self {
            TypeRef::Wildcard => false,
            TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => true,
            TypeRef::Borrow { inner, .. } | TypeRef::Array { inner, .. } => inner.is_concrete(),
            TypeRef::Path(path) => path
                .nodes
                .iter()
                .all(|node| node.args.iter().all(TypeRef::is_concrete)),
            TypeRef::Tuple(items) => items.iter().all(TypeRef::is_concrete),
        }
    }

    /// Unifies `other` into `self`. Wildcards on either side are filled from
    /// the opposite side; two known but different types conflict.
    pub fn merge_with(&mut self, other: &TypeRef) -> Result<(), MergeConflict> {
        let before = self.clone();
        if self.merge_inner(other) {
            Ok(())
        } else {
            Err(MergeConflict::new(&before, other))
        }
    }

    fn merge_inner(&mut self, other: &TypeRef) -> bool {
        if other.is_wildcard() {
            return true;
        }
        if self.is_wildcard() {
            *self = other.clone();
            return true;
        }
        match (self, other) {
            (TypeRef::Unit, TypeRef::Unit) => true,
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
            (TypeRef::Generic(a), TypeRef::Generic(b)) => a == b,
            (
                TypeRef::Borrow { kind, inner },
                TypeRef::Borrow {
                    kind: other_kind,
                    inner: other_inner,
                },
            ) => *kind == *other_kind && inner.merge_inner(other_inner),
            (TypeRef::Path(a), TypeRef::Path(b)) => {
                if !a.same_item(b) {
                    return false;
                }
                a.nodes.iter_mut().zip(&b.nodes).all(|(node, other_node)| {
                    if node.args.is_empty() {
                        node.args = other_node.args.clone();
                        return true;
                    }
                    if other_node.args.is_empty() {
                        return true;
                    }
                    node.args.len() == other_node.args.len()
                        && node
                            .args
                            .iter_mut()
                            .zip(&other_node.args)
                            .all(|(arg, other_arg)| arg.merge_inner(other_arg))
                })
            }
            (TypeRef::Tuple(items), TypeRef::Tuple(other_items)) => {
                items.len() == other_items.len()
                    && items
                        .iter_mut()
                        .zip(other_items)
                        .all(|(item, other_item)| item.merge_inner(other_item))
            }
            (
                TypeRef::Array { inner, size },
                TypeRef::Array {
                    inner: other_inner,
                    size: other_size,
                },
            ) => {
                match (*size, *other_size) {
                    (Some(a), Some(b)) if a != b => return false,
                    (None, Some(b)) => *size = Some(b),
                    _ => {}
                }
                inner.merge_inner(other_inner)
            }
            _ => false,
        }
    }

    /// Strips one reference layer. Returns false when the type cannot be
    /// dereferenced any further.
    pub fn deref(&mut self) -> bool {
        match std::mem::replace(self, TypeRef::Wildcard) {
            TypeRef::Borrow { inner, .. } => {
                *self = *inner;
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Replaces every generic parameter reference with the type `lookup`
    /// yields for its name.
    pub fn resolve_args<F>(&mut self, lookup: &mut F) -> SemaResult<()>
    where
        F: FnMut(&str) -> SemaResult<TypeRef>,
    {
        match self {
            TypeRef::Generic(name) => {
                *self = lookup(name)?;
            }
            TypeRef::Borrow { inner, .. } | TypeRef::Array { inner, .. } => {
                inner.resolve_args(lookup)?;
            }
            TypeRef::Path(path) => {
                for node in &mut path.nodes {
                    for arg in &mut node.args {
                        arg.resolve_args(lookup)?;
                    }
                }
            }
            TypeRef::Tuple(items) => {
                for item in items {
                    item.resolve_args(lookup)?;
                }
            }
            TypeRef::Wildcard | TypeRef::Unit | TypeRef::Primitive(_) => {}
        }
        Ok(())
    }

    pub fn substitute(&self, map: &HashMap<String, TypeRef>) -> TypeRef {
        match self {
            TypeRef::Generic(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Borrow { kind, inner } => TypeRef::borrow(*kind, inner.substitute(map)),
            TypeRef::Array { inner, size } => TypeRef::Array {
                inner: Box::new(inner.substitute(map)),
                size: *size,
            },
            TypeRef::Path(path) => {
                let mut path = path.clone();
                for node in &mut path.nodes {
                    node.args = node.args.iter().map(|arg| arg.substitute(map)).collect();
                }
                TypeRef::Path(path)
            }
            TypeRef::Tuple(items) => {
                TypeRef::Tuple(items.iter().map(|item| item.substitute(map)).collect())
            }
            TypeRef::Wildcard | TypeRef::Unit | TypeRef::Primitive(_) => self.clone(),
        }
    }

    /// Structurally matches `self`, a template that may mention generic
    /// parameters, against `concrete`. Every generic met on the template
    /// side is recorded in `bindings` together with the type found at the
    /// same position. Wildcards on the concrete side match anything.
    pub fn match_template(
        &self,
        concrete: &TypeRef,
        bindings: &mut Vec<(String, TypeRef)>,
    ) -> Result<(), MergeConflict> {
        if self.match_template_inner(concrete, bindings) {
            Ok(())
        } else {
            Err(MergeConflict::new(self, concrete))
        }
    }

    fn match_template_inner(
        &self,
        concrete: &TypeRef,
        bindings: &mut Vec<(String, TypeRef)>,
    ) -> bool {
        if let TypeRef::Generic(name) = self {
            if !concrete.is_wildcard() {
                bindings.push((name.clone(), concrete.clone()));
            }
            return true;
        }
        if concrete.is_wildcard() || self.is_wildcard() {
            return true;
        }
        match (self, concrete) {
            (TypeRef::Unit, TypeRef::Unit) => true,
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
            (
                TypeRef::Borrow { kind, inner },
                TypeRef::Borrow {
                    kind: other_kind,
                    inner: other_inner,
                },
            ) => kind == other_kind && inner.match_template_inner(other_inner, bindings),
            (TypeRef::Path(a), TypeRef::Path(b)) => {
                a.same_item(b)
                    && a.nodes.iter().zip(&b.nodes).all(|(node, other_node)| {
                        other_node.args.is_empty()
                            || node.args.is_empty()
                            || (node.args.len() == other_node.args.len()
                                && node
                                    .args
                                    .iter()
                                    .zip(&other_node.args)
                                    .all(|(arg, other)| arg.match_template_inner(other, bindings)))
                    })
            }
            (TypeRef::Tuple(items), TypeRef::Tuple(other_items)) => {
                items.len() == other_items.len()
                    && items
                        .iter()
                        .zip(other_items)
                        .all(|(item, other)| item.match_template_inner(other, bindings))
            }
            (
                TypeRef::Array { inner, size },
                TypeRef::Array {
                    inner: other_inner,
                    size: other_size,
                },
            ) => {
                (size.is_none() || other_size.is_none() || size == other_size)
                    && inner.match_template_inner(other_inner, bindings)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Wildcard => write!(f, "_"),
            TypeRef::Unit => write!(f, "()"),
            TypeRef::Primitive(core) => write!(f, "{}", core.name()),
            TypeRef::Generic(name) => write!(f, "{name}"),
            TypeRef::Borrow { kind, inner } => match kind {
                BorrowKind::Shared => write!(f, "&{inner}"),
                BorrowKind::Unique => write!(f, "&mut {inner}"),
            },
            TypeRef::Path(path) => write!(f, "{path}"),
            TypeRef::Tuple(items) => {
                let rendered: Vec<String> = items.iter().map(|ty| ty.to_string()).collect();
                if items.len() == 1 {
                    write!(f, "({},)", rendered[0])
                } else {
                    write!(f, "({})", rendered.join(", "))
                }
            }
            TypeRef::Array { inner, size } => match size {
                Some(size) => write!(f, "[{inner}; {size}]"),
                None => write!(f, "[{inner}]"),
            },
        }
    }
}
