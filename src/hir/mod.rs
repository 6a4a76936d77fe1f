//! Typed high-level IR. Every expression node carries its final type; the
//! late expansion passes in this module rewrite bodies in place.

mod expr;
pub mod reborrow;

pub use crate::language::types::{BorrowKind, CoreType};
pub use expr::{ExprKind, ExprNode, ExprPtr, MatchArm, ValueUsage};
pub use reborrow::expand_reborrows;

use std::fmt;

/// Absolute item path with generic arguments on the final segment.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericPath {
    pub path: String,
    pub args: Vec<TypeRef>,
}

impl GenericPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for GenericPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if !self.args.is_empty() {
            let rendered: Vec<String> = self.args.iter().map(|arg| arg.to_string()).collect();
            write!(f, "<{}>", rendered.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeRef {
    Unit,
    Primitive(CoreType),
    Generic(String),
    Path(GenericPath),
    Borrow {
        kind: BorrowKind,
        inner: Box<TypeRef>,
    },
    Tuple(Vec<TypeRef>),
    Array {
        inner: Box<TypeRef>,
        size: Option<ExprPtr>,
    },
}

impl TypeRef {
    pub fn borrow(kind: BorrowKind, inner: TypeRef) -> Self {
        TypeRef::Borrow {
            kind,
            inner: Box::new(inner),
        }
    }

    pub fn unique(inner: TypeRef) -> Self {
        Self::borrow(BorrowKind::Unique, inner)
    }

    pub fn shared(inner: TypeRef) -> Self {
        Self::borrow(BorrowKind::Shared, inner)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit => write!(f, "()"),
            TypeRef::Primitive(core) => write!(f, "{}", core.name()),
            TypeRef::Generic(name) => write!(f, "{name}"),
            TypeRef::Path(path) => write!(f, "{path}"),
            TypeRef::Borrow { kind, inner } => match kind {
                BorrowKind::Shared => write!(f, "&{inner}"),
                BorrowKind::Unique => write!(f, "&mut {inner}"),
            },
            TypeRef::Tuple(items) => {
                let rendered: Vec<String> = items.iter().map(|ty| ty.to_string()).collect();
                write!(f, "({})", rendered.join(", "))
            }
            TypeRef::Array { inner, size } => match size {
                Some(_) => write!(f, "[{inner}; _]"),
                None => write!(f, "[{inner}]"),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub args: Vec<(String, TypeRef)>,
    pub ret: TypeRef,
    pub code: Option<ExprPtr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Static {
    pub ty: TypeRef,
    pub value: Option<ExprPtr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub ty: TypeRef,
    pub value: Option<ExprPtr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Struct {
    pub fields: Vec<(String, TypeRef)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnumVariant {
    Unit,
    /// Unit variant with an explicit discriminant expression.
    Value(ExprPtr),
    Tuple(Vec<TypeRef>),
    Struct(Vec<(String, TypeRef)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub variants: Vec<(String, EnumVariant)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAlias {
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TraitItem {
    Method(Function),
    Constant {
        ty: TypeRef,
        default: Option<ExprPtr>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trait {
    pub items: Vec<(String, TraitItem)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Impl {
    pub trait_path: Option<GenericPath>,
    pub self_ty: TypeRef,
    pub methods: Vec<(String, Function)>,
    pub constants: Vec<(String, Constant)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Function(Function),
    Static(Static),
    Constant(Constant),
    Struct(Struct),
    Enum(Enum),
    TypeAlias(TypeAlias),
    Trait(Trait),
    Module(Module),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub items: Vec<(String, Item)>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Crate {
    pub root: Module,
    pub impls: Vec<Impl>,
}
