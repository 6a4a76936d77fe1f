//! Small AST builders shared by the checker tests.

use super::*;
use crate::language::type_syntax::parse_type;

pub fn ty(source: &str) -> TypeRef {
    parse_type(source).expect("type")
}

fn sp() -> Span {
    Span::default()
}

pub fn module(items: Vec<Item>) -> Module {
    let mut root = Module::new("");
    root.items = items;
    root
}

pub fn check(root: Module) -> SemaResult<Crate> {
    let mut krate = Crate::new(root)?;
    check_crate(&mut krate)?;
    Ok(krate)
}

pub fn function(name: &str, args: &[(&str, &str)], ret: &str, body: ExprNode) -> Item {
    Item::Function(method_def(name, args, ret, Some(body)))
}

pub fn method_def(name: &str, args: &[(&str, &str)], ret: &str, body: Option<ExprNode>) -> Function {
    Function {
        name: name.into(),
        params: GenericParams::default(),
        args: args
            .iter()
            .map(|(arg, arg_ty)| FunctionArg {
                pattern: Pattern::ident(*arg, sp()),
                ty: ty(arg_ty),
            })
            .collect(),
        ret: ty(ret),
        code: body,
        span: sp(),
    }
}

pub fn struct_item(name: &str, params: &[&str], fields: &[(&str, &str)]) -> Item {
    Item::Struct(StructDef {
        name: name.into(),
        params: GenericParams::with_names(params.iter().copied()),
        fields: fields
            .iter()
            .map(|(field, field_ty)| StructField {
                name: (*field).into(),
                ty: ty(field_ty),
                span: sp(),
            })
            .collect(),
        span: sp(),
    })
}

pub fn static_item(name: &str, static_ty: &str) -> Item {
    Item::Static(StaticDef {
        name: name.into(),
        mutability: Mutability::Immutable,
        ty: ty(static_ty),
        value: int(0),
        span: sp(),
    })
}

pub fn type_alias(name: &str, target: &str) -> Item {
    Item::TypeAlias(TypeAliasDef {
        name: name.into(),
        params: GenericParams::default(),
        ty: ty(target),
        span: sp(),
    })
}

pub fn impl_item(self_ty: &str, trait_path: Option<&[&str]>, methods: Vec<Function>) -> Item {
    Item::Impl(ImplBlock {
        params: GenericParams::default(),
        trait_path: trait_path.map(|segments| Path::relative(segments.iter().copied())),
        self_ty: ty(self_ty),
        items: methods
            .into_iter()
            .map(|def| ImplItem {
                name: def.name.clone(),
                kind: ImplItemKind::Function(def),
            })
            .collect(),
        span: sp(),
    })
}

pub fn trait_item(name: &str, methods: Vec<Function>) -> Item {
    Item::Trait(TraitDef {
        name: name.into(),
        params: GenericParams::default(),
        methods,
        span: sp(),
    })
}

/// `enum Choice<T> { Empty, Some(T) }`
pub fn choice_enum() -> Item {
    Item::Enum(EnumDef {
        name: "Choice".into(),
        params: GenericParams::with_names(["T"]),
        variants: vec![
            EnumVariant {
                name: "Empty".into(),
                data: VariantData::Value(None),
                span: sp(),
            },
            EnumVariant {
                name: "Some".into(),
                data: VariantData::Tuple(vec![ty("T")]),
                span: sp(),
            },
        ],
        span: sp(),
    })
}

pub fn block(statements: Vec<ExprNode>, tail: Option<ExprNode>) -> ExprNode {
    ExprNode::new(ExprKind::Block(Block::new(statements, tail)), sp())
}

pub fn let_binding(name: &str, binding_ty: &str, value: ExprNode) -> ExprNode {
    ExprNode::new(
        ExprKind::LetBinding {
            pattern: Pattern::ident(name, sp()),
            ty: ty(binding_ty),
            value: Box::new(value),
        },
        sp(),
    )
}

pub fn int(value: u128) -> ExprNode {
    ExprNode::new(ExprKind::Literal(Literal::Integer { value, ty: None }), sp())
}

pub fn int_typed(value: u128, suffix: &str) -> ExprNode {
    ExprNode::new(
        ExprKind::Literal(Literal::Integer {
            value,
            ty: Some(ty(suffix)),
        }),
        sp(),
    )
}

pub fn boolean(value: bool) -> ExprNode {
    ExprNode::new(ExprKind::Literal(Literal::Bool(value)), sp())
}

pub fn var(name: &str) -> ExprNode {
    ExprNode::new(ExprKind::NamedValue(Path::local(name)), sp())
}

pub fn path_value(segments: &[&str]) -> ExprNode {
    ExprNode::new(
        ExprKind::NamedValue(Path::relative(segments.iter().copied())),
        sp(),
    )
}

pub fn field(object: ExprNode, name: &str) -> ExprNode {
    ExprNode::new(
        ExprKind::Field {
            object: Box::new(object),
            name: name.into(),
        },
        sp(),
    )
}

pub fn call_path(segments: &[&str], args: Vec<ExprNode>) -> ExprNode {
    ExprNode::new(
        ExprKind::CallPath {
            path: Path::relative(segments.iter().copied()),
            args,
        },
        sp(),
    )
}

pub fn call_method(receiver: ExprNode, name: &str, args: Vec<ExprNode>) -> ExprNode {
    ExprNode::new(
        ExprKind::CallMethod {
            value: Box::new(receiver),
            method: PathNode::new(name),
            args,
        },
        sp(),
    )
}

pub fn body_of<'k>(krate: &'k Crate, name: &str) -> &'k ExprNode {
    krate
        .root
        .items
        .iter()
        .find_map(|item| match item {
            Item::Function(def) if def.name == name => def.code.as_ref(),
            _ => None,
        })
        .expect("function body")
}

/// The tail expression of a function whose body is a block.
pub fn tail_of<'k>(krate: &'k Crate, name: &str) -> &'k ExprNode {
    match &body_of(krate, name).kind {
        ExprKind::Block(Block {
            tail: Some(tail), ..
        }) => tail,
        other => panic!("expected block with tail, got {other:?}"),
    }
}

/// Number of explicit dereference nodes stacked on top of `node`.
pub fn deref_depth(node: &ExprNode) -> usize {
    match &node.kind {
        ExprKind::Deref(inner) => 1 + deref_depth(inner),
        _ => 0,
    }
}
