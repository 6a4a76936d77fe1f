use super::{GenericPath, TypeRef};
use crate::language::{
    ast::{BinaryOp, Literal},
    span::Span,
    types::BorrowKind,
};

/// How the value produced by a node is consumed by its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueUsage {
    #[default]
    Unknown,
    Borrow,
    Mutate,
    Move,
}

pub type ExprPtr = Box<ExprNode>;

#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub span: Span,
    pub res_type: TypeRef,
    pub usage: ValueUsage,
    pub kind: ExprKind,
}

impl ExprNode {
    pub fn new(kind: ExprKind, res_type: TypeRef, span: Span) -> Self {
        Self {
            span,
            res_type,
            usage: ValueUsage::Unknown,
            kind,
        }
    }

    pub fn boxed(kind: ExprKind, res_type: TypeRef, span: Span) -> ExprPtr {
        Box::new(Self::new(kind, res_type, span))
    }

    pub fn with_usage(mut self, usage: ValueUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Nodes that name a storage location rather than compute a value.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Index { .. }
                | ExprKind::Variable { .. }
                | ExprKind::Field { .. }
                | ExprKind::Deref(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub guard: Option<ExprNode>,
    pub code: ExprNode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Block {
        statements: Vec<ExprNode>,
        tail: Option<ExprPtr>,
    },
    Let {
        name: String,
        ty: TypeRef,
        value: Option<ExprPtr>,
    },
    Assign {
        slot: ExprPtr,
        value: ExprPtr,
    },
    Return(Option<ExprPtr>),
    If {
        condition: ExprPtr,
        then_branch: ExprPtr,
        else_branch: Option<ExprPtr>,
    },
    Match {
        value: ExprPtr,
        arms: Vec<MatchArm>,
    },
    Borrow {
        kind: BorrowKind,
        value: ExprPtr,
    },
    Deref(ExprPtr),
    Index {
        value: ExprPtr,
        index: ExprPtr,
    },
    Field {
        value: ExprPtr,
        name: String,
    },
    Variable {
        name: String,
        slot: usize,
    },
    PathValue(GenericPath),
    Literal(Literal),
    Cast {
        value: ExprPtr,
        ty: TypeRef,
    },
    Tuple(Vec<ExprNode>),
    CallPath {
        path: GenericPath,
        args: Vec<ExprNode>,
    },
    CallValue {
        value: ExprPtr,
        args: Vec<ExprNode>,
    },
    CallMethod {
        value: ExprPtr,
        method: String,
        args: Vec<ExprNode>,
    },
    BinOp {
        op: BinaryOp,
        left: ExprPtr,
        right: ExprPtr,
    },
}
