use crate::language::{
    errors::SemaResult,
    resolve,
    span::Span,
    symbols::SymbolTable,
    types::{BorrowKind, Mutability, TypeRef},
};
use std::fmt;

/// Absolute, `::`-joined item path used as the key of every crate-level item.
pub type ItemKey = String;

/// What a path was resolved to before type checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathBinding {
    Unbound,
    Static(ItemKey),
    Struct(ItemKey),
    Enum(ItemKey),
    EnumVariant { enum_key: ItemKey, index: usize },
    Function(ItemKey),
    Trait(ItemKey),
    TypeAlias(ItemKey),
}

impl fmt::Display for PathBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathBinding::Unbound => write!(f, "nothing"),
            PathBinding::Static(key) => write!(f, "static `{key}`"),
            PathBinding::Struct(key) => write!(f, "struct `{key}`"),
            PathBinding::Enum(key) => write!(f, "enum `{key}`"),
            PathBinding::EnumVariant { enum_key, index } => {
                write!(f, "variant #{index} of enum `{enum_key}`")
            }
            PathBinding::Function(key) => write!(f, "function `{key}`"),
            PathBinding::Trait(key) => write!(f, "trait `{key}`"),
            PathBinding::TypeAlias(key) => write!(f, "type alias `{key}`"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PathNode {
    pub name: String,
    pub args: Vec<TypeRef>,
}

impl PathNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Path {
    pub absolute: bool,
    pub nodes: Vec<PathNode>,
    pub binding: PathBinding,
}

impl Path {
    pub fn absolute<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            absolute: true,
            nodes: segments.into_iter().map(PathNode::new).collect(),
            binding: PathBinding::Unbound,
        }
    }

    pub fn relative<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            absolute: false,
            ..Self::absolute(segments)
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::relative([name.into()])
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn last(&self) -> Option<&PathNode> {
        self.nodes.last()
    }

    /// The path with its final segment removed; the binding is dropped.
    pub fn parent(&self) -> Path {
        let mut nodes = self.nodes.clone();
        nodes.pop();
        Path {
            absolute: self.absolute,
            nodes,
            binding: PathBinding::Unbound,
        }
    }

    /// Segment names only, generic arguments ignored.
    pub fn key(&self) -> ItemKey {
        let names: Vec<&str> = self.nodes.iter().map(|node| node.name.as_str()).collect();
        if self.absolute {
            format!("::{}", names.join("::"))
        } else {
            names.join("::")
        }
    }

    pub fn same_item(&self, other: &Path) -> bool {
        self.absolute == other.absolute
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| a.name == b.name)
    }
}

// Bindings are derived data; two paths naming the same item with the same
// arguments are the same path.
impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute && self.nodes == other.nodes
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "::")?;
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if idx > 0 {
                write!(f, "::")?;
            }
            write!(f, "{}", node.name)?;
            if !node.args.is_empty() {
                let rendered: Vec<String> = node.args.iter().map(|arg| arg.to_string()).collect();
                write!(f, "<{}>", rendered.join(", "))?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Integer { value: u128, ty: Option<TypeRef> },
    Float { value: f64, ty: Option<TypeRef> },
    Bool(bool),
    Char(char),
    String(String),
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn yields_bool(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

/// An expression with its inferred result type. Children are owned by
/// their parent; rewrites replace a child slot wholesale.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub res_type: TypeRef,
    pub span: Span,
}

impl ExprNode {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            res_type: TypeRef::Wildcard,
            span,
        }
    }

    pub fn boxed(kind: ExprKind, span: Span) -> Box<Self> {
        Box::new(Self::new(kind, span))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Block(Block),
    LetBinding {
        pattern: Pattern,
        ty: TypeRef,
        value: Box<ExprNode>,
    },
    Assign {
        slot: Box<ExprNode>,
        value: Box<ExprNode>,
    },
    Return(Option<Box<ExprNode>>),
    If {
        condition: Box<ExprNode>,
        then_branch: Box<ExprNode>,
        else_branch: Option<Box<ExprNode>>,
    },
    Match {
        value: Box<ExprNode>,
        arms: Vec<MatchArm>,
    },
    CallPath {
        path: Path,
        args: Vec<ExprNode>,
    },
    CallMethod {
        value: Box<ExprNode>,
        method: PathNode,
        args: Vec<ExprNode>,
    },
    CallValue {
        value: Box<ExprNode>,
        args: Vec<ExprNode>,
    },
    NamedValue(Path),
    Field {
        object: Box<ExprNode>,
        name: String,
    },
    Index {
        value: Box<ExprNode>,
        index: Box<ExprNode>,
    },
    Deref(Box<ExprNode>),
    Borrow {
        kind: BorrowKind,
        value: Box<ExprNode>,
    },
    Cast {
        value: Box<ExprNode>,
        ty: TypeRef,
    },
    Tuple(Vec<ExprNode>),
    Literal(Literal),
    BinOp {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub statements: Vec<ExprNode>,
    pub tail: Option<Box<ExprNode>>,
    /// Traits brought into scope by `use` inside the block.
    pub traits: Vec<Path>,
    /// Block-local `type Name = ...;` aliases.
    pub aliases: Vec<(String, TypeRef)>,
}

impl Block {
    pub fn new(statements: Vec<ExprNode>, tail: Option<ExprNode>) -> Self {
        Self {
            statements,
            tail: tail.map(Box::new),
            traits: Vec::new(),
            aliases: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchArm {
    pub patterns: Vec<Pattern>,
    pub guard: Option<Box<ExprNode>>,
    pub code: Box<ExprNode>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Wildcard(Span),
    Identifier {
        name: String,
        mutability: Mutability,
        span: Span,
    },
    Literal(Literal, Span),
    Tuple(Vec<Pattern>, Span),
    Reference {
        pattern: Box<Pattern>,
        span: Span,
    },
    EnumVariant {
        path: Path,
        bindings: Vec<Pattern>,
        span: Span,
    },
    Struct {
        path: Path,
        fields: Vec<StructPatternField>,
        span: Span,
    },
}

impl Pattern {
    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Pattern::Identifier {
            name: name.into(),
            mutability: Mutability::Immutable,
            span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructPatternField {
    pub name: String,
    pub pattern: Pattern,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenericBound {
    IsTrait {
        ty: TypeRef,
        trait_path: Path,
        span: Span,
    },
    Lifetime {
        ty: TypeRef,
        lifetime: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenericParams {
    pub ty_params: Vec<TypeParam>,
    pub bounds: Vec<GenericBound>,
}

impl GenericParams {
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ty_params: names
                .into_iter()
                .map(|name| TypeParam {
                    name: name.into(),
                    span: Span::default(),
                })
                .collect(),
            bounds: Vec::new(),
        }
    }

    pub fn find_name(&self, name: &str) -> Option<usize> {
        self.ty_params.iter().position(|param| param.name == name)
    }

    pub fn len(&self) -> usize {
        self.ty_params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ty_params.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionArg {
    pub pattern: Pattern,
    pub ty: TypeRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: GenericParams,
    pub args: Vec<FunctionArg>,
    pub ret: TypeRef,
    pub code: Option<ExprNode>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub params: GenericParams,
    pub fields: Vec<StructField>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VariantData {
    /// Unit variant, optionally with an explicit discriminant.
    Value(Option<ExprNode>),
    Tuple(Vec<TypeRef>),
    Struct(Vec<StructField>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    pub data: VariantData,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub params: GenericParams,
    pub variants: Vec<EnumVariant>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraitDef {
    pub name: String,
    pub params: GenericParams,
    pub methods: Vec<Function>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImplItemKind {
    Function(Function),
    Const { ty: TypeRef, value: ExprNode },
    Type(TypeRef),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplItem {
    pub name: String,
    pub kind: ImplItemKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplBlock {
    pub params: GenericParams,
    pub trait_path: Option<Path>,
    pub self_ty: TypeRef,
    pub items: Vec<ImplItem>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StaticDef {
    pub name: String,
    pub mutability: Mutability,
    pub ty: TypeRef,
    pub value: ExprNode,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAliasDef {
    pub name: String,
    pub params: GenericParams,
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Function(Function),
    Struct(StructDef),
    Enum(EnumDef),
    Trait(TraitDef),
    Impl(ImplBlock),
    Static(StaticDef),
    TypeAlias(TypeAliasDef),
    Module(Module),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    pub name: String,
    /// `use` declarations; traits among them are in scope for every body.
    pub uses: Vec<Path>,
    pub items: Vec<Item>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uses: Vec::new(),
            items: Vec::new(),
        }
    }
}

/// The module tree together with the symbol table derived from it.
#[derive(Clone, Debug)]
pub struct Crate {
    pub root: Module,
    pub symbols: SymbolTable,
}

impl Crate {
    /// Binds every path in `root` and collects the crate-wide symbol table.
    pub fn new(mut root: Module) -> SemaResult<Self> {
        resolve::bind_crate(&mut root)?;
        let symbols = SymbolTable::collect(&root)?;
        Ok(Self { root, symbols })
    }
}
