//! Inserts `&mut *e` wherever a `&mut` held in a place would otherwise be
//! moved out by an assignment or a call argument.

use super::*;
use crate::language::errors::{SemaError, SemaResult};
use tracing::debug;

#[tracing::instrument(level = "debug", skip_all)]
pub fn expand_reborrows(krate: &mut Crate) -> SemaResult<()> {
    let mut visitor = OuterVisitor::default();
    visitor.visit_crate(krate)?;
    debug!(inserted = visitor.inserted, "reborrow expansion finished");
    Ok(())
}

/// Rewrites `node` into `&mut *node` when it is a place of type `&mut T`.
/// Returns whether the node was replaced.
fn do_reborrow(node: &mut ExprNode) -> bool {
    let TypeRef::Borrow {
        kind: BorrowKind::Unique,
        inner,
    } = &node.res_type
    else {
        return false;
    };
    if !node.is_lvalue() {
        return false;
    }
    let inner_ty = (**inner).clone();
    let outer_ty = node.res_type.clone();
    let span = node.span;
    let usage = node.usage;
    debug!(start = span.start, end = span.end, ty = %outer_ty, "insert reborrow");

    let original = std::mem::replace(node, ExprNode::new(ExprKind::Tuple(Vec::new()), TypeRef::Unit, span));
    let deref = ExprNode::boxed(ExprKind::Deref(Box::new(original)), inner_ty, span);
    *node = ExprNode::new(
        ExprKind::Borrow {
            kind: BorrowKind::Unique,
            value: deref,
        },
        outer_ty,
        span,
    )
    .with_usage(usage);
    true
}

/// Post-order walk over one expression tree.
#[derive(Default)]
struct ExprMutator {
    inserted: usize,
}

impl ExprMutator {
    fn reborrow(&mut self, node: &mut ExprNode) {
        if do_reborrow(node) {
            self.inserted += 1;
        }
    }

    fn visit_type(&mut self, ty: &mut TypeRef) {
        match ty {
            TypeRef::Array { inner, size } => {
                self.visit_type(inner);
                if let Some(size) = size {
                    self.visit_node(size);
                }
            }
            TypeRef::Borrow { inner, .. } => self.visit_type(inner),
            TypeRef::Tuple(items) => items.iter_mut().for_each(|item| self.visit_type(item)),
            TypeRef::Path(path) => path.args.iter_mut().for_each(|arg| self.visit_type(arg)),
            TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        }
    }

    fn visit_node(&mut self, node: &mut ExprNode) {
        match &mut node.kind {
            ExprKind::Block { statements, tail } => {
                statements.iter_mut().for_each(|stmt| self.visit_node(stmt));
                if let Some(tail) = tail {
                    self.visit_node(tail);
                }
            }
            ExprKind::Let { ty, value, .. } => {
                self.visit_type(ty);
                if let Some(value) = value {
                    self.visit_node(value);
                }
            }
            ExprKind::Assign { slot, value } => {
                self.visit_node(slot);
                self.visit_node(value);
                self.reborrow(value);
            }
            ExprKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_node(value);
                }
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_node(condition);
                self.visit_node(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_node(else_branch);
                }
            }
            ExprKind::Match { value, arms } => {
                self.visit_node(value);
                for arm in arms {
                    if let Some(guard) = &mut arm.guard {
                        self.visit_node(guard);
                    }
                    self.visit_node(&mut arm.code);
                }
            }
            ExprKind::Borrow { value, .. } | ExprKind::Deref(value) => self.visit_node(value),
            ExprKind::Index { value, index } => {
                self.visit_node(value);
                self.visit_node(index);
            }
            ExprKind::Field { value, .. } => self.visit_node(value),
            ExprKind::Variable { .. } | ExprKind::PathValue(_) | ExprKind::Literal(_) => {}
            ExprKind::Cast { value, ty } => {
                self.visit_node(value);
                self.visit_type(ty);
            }
            ExprKind::Tuple(items) => items.iter_mut().for_each(|item| self.visit_node(item)),
            ExprKind::CallPath { args, .. } => {
                for arg in args {
                    self.visit_node(arg);
                    self.reborrow(arg);
                }
            }
            ExprKind::CallValue { value, args } | ExprKind::CallMethod { value, args, .. } => {
                self.visit_node(value);
                for arg in args {
                    self.visit_node(arg);
                    self.reborrow(arg);
                }
            }
            ExprKind::BinOp { left, right, .. } => {
                self.visit_node(left);
                self.visit_node(right);
            }
        }
    }
}

/// Walks items, handing every expression-bearing position to an
/// [`ExprMutator`].
#[derive(Default)]
struct OuterVisitor {
    inserted: usize,
}

impl OuterVisitor {
    fn mutate(&mut self, root: &mut ExprNode) {
        let mut mutator = ExprMutator::default();
        mutator.visit_node(root);
        self.inserted += mutator.inserted;
    }

    /// Every expression position must be handled by one of the item
    /// visitors; arriving here means one was missed.
    fn visit_expr(&mut self, expr: &ExprNode) -> SemaResult<()> {
        Err(SemaError::invariant(
            "free-standing expression reached the reborrow pass",
            expr.span,
        ))
    }

    fn visit_type(&mut self, ty: &mut TypeRef) {
        match ty {
            TypeRef::Array { inner, size } => {
                self.visit_type(inner);
                if let Some(size) = size {
                    debug!(ty = %inner, "array size");
                    self.mutate(size);
                }
            }
            TypeRef::Borrow { inner, .. } => self.visit_type(inner),
            TypeRef::Tuple(items) => items.iter_mut().for_each(|item| self.visit_type(item)),
            TypeRef::Path(path) => path.args.iter_mut().for_each(|arg| self.visit_type(arg)),
            TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        }
    }

    fn visit_crate(&mut self, krate: &mut Crate) -> SemaResult<()> {
        self.visit_module("", &mut krate.root)?;
        for imp in &mut krate.impls {
            self.visit_impl(imp)?;
        }
        Ok(())
    }

    fn visit_module(&mut self, path: &str, module: &mut Module) -> SemaResult<()> {
        for (name, item) in &mut module.items {
            let item_path = format!("{path}::{name}");
            match item {
                Item::Function(def) => self.visit_function(&item_path, def),
                Item::Static(def) => {
                    self.visit_type(&mut def.ty);
                    if let Some(value) = &mut def.value {
                        self.mutate(value);
                    }
                }
                Item::Constant(def) => self.visit_constant(def),
                Item::Struct(def) => {
                    for (_, ty) in &mut def.fields {
                        self.visit_type(ty);
                    }
                }
                Item::Enum(def) => self.visit_enum(&item_path, def),
                Item::TypeAlias(def) => self.visit_type(&mut def.ty),
                Item::Trait(def) => self.visit_trait(&item_path, def)?,
                Item::Module(sub) => self.visit_module(&item_path, sub)?,
            }
        }
        Ok(())
    }

    fn visit_function(&mut self, path: &str, def: &mut Function) {
        for (_, ty) in &mut def.args {
            self.visit_type(ty);
        }
        self.visit_type(&mut def.ret);
        match &mut def.code {
            Some(code) => {
                debug!(function = path, "function code");
                self.mutate(code);
            }
            None => debug!(function = path, "function code (none)"),
        }
    }

    fn visit_constant(&mut self, def: &mut Constant) {
        self.visit_type(&mut def.ty);
        if let Some(value) = &mut def.value {
            self.mutate(value);
        }
    }

    fn visit_enum(&mut self, path: &str, def: &mut Enum) {
        for (name, variant) in &mut def.variants {
            match variant {
                EnumVariant::Unit => {}
                EnumVariant::Value(value) => {
                    debug!(enum_path = path, variant = %name, "enum value");
                    self.mutate(value);
                }
                EnumVariant::Tuple(types) => types.iter_mut().for_each(|ty| self.visit_type(ty)),
                EnumVariant::Struct(fields) => {
                    fields.iter_mut().for_each(|(_, ty)| self.visit_type(ty))
                }
            }
        }
    }

    fn visit_trait(&mut self, path: &str, def: &mut Trait) -> SemaResult<()> {
        for (name, item) in &mut def.items {
            match item {
                TraitItem::Method(method) => self.visit_function(&format!("{path}::{name}"), method),
                TraitItem::Constant { ty, default } => {
                    self.visit_type(ty);
                    if let Some(default) = default {
                        self.visit_expr(default)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_impl(&mut self, imp: &mut Impl) -> SemaResult<()> {
        self.visit_type(&mut imp.self_ty);
        let owner = imp.self_ty.to_string();
        for (name, method) in &mut imp.methods {
            self.visit_function(&format!("<{owner}>::{name}"), method);
        }
        for (_, constant) in &mut imp.constants {
            self.visit_constant(constant);
        }
        Ok(())
    }
}
