//! Path binding run before the expression checker: attaches a
//! [`PathBinding`] to every item path in the module tree, rewrites relative
//! item paths to absolute ones and turns generic parameter names into
//! [`TypeRef::Generic`].

use crate::language::{
    ast::*,
    errors::{NameKind, SemaError, SemaResult},
    span::Span,
    types::TypeRef,
};
use std::collections::HashMap;
use tracing::debug;

pub fn item_key(segments: &[String]) -> ItemKey {
    format!("::{}", segments.join("::"))
}

pub fn bind_crate(root: &mut Module) -> SemaResult<()> {
    let mut index = ItemIndex::default();
    index.collect_module(root, &[]);
    let mut binder = Binder {
        index: &index,
        module_path: Vec::new(),
        imports: Vec::new(),
        generics: Vec::new(),
        self_ty: None,
    };
    binder.bind_module(root)
}

#[derive(Clone, Debug)]
enum ItemKind {
    Module,
    Struct,
    Enum(Vec<String>),
    Trait,
    Function,
    Static,
    TypeAlias,
}

#[derive(Default)]
struct ItemIndex {
    items: HashMap<ItemKey, ItemKind>,
}

impl ItemIndex {
    fn collect_module(&mut self, module: &Module, prefix: &[String]) {
        for item in &module.items {
            let (name, kind) = match item {
                Item::Function(def) => (&def.name, ItemKind::Function),
                Item::Struct(def) => (&def.name, ItemKind::Struct),
                Item::Enum(def) => (
                    &def.name,
                    ItemKind::Enum(def.variants.iter().map(|var| var.name.clone()).collect()),
                ),
                Item::Trait(def) => (&def.name, ItemKind::Trait),
                Item::Static(def) => (&def.name, ItemKind::Static),
                Item::TypeAlias(def) => (&def.name, ItemKind::TypeAlias),
                Item::Module(sub) => {
                    let mut segments = prefix.to_vec();
                    segments.push(sub.name.clone());
                    self.items.insert(item_key(&segments), ItemKind::Module);
                    self.collect_module(sub, &segments);
                    continue;
                }
                Item::Impl(_) => continue,
            };
            let mut segments = prefix.to_vec();
            segments.push(name.clone());
            self.items.insert(item_key(&segments), kind);
        }
    }

    fn binding_for(&self, segments: &[String]) -> Option<PathBinding> {
        let key = item_key(segments);
        if let Some(kind) = self.items.get(&key) {
            return match kind {
                ItemKind::Module => None,
                ItemKind::Struct => Some(PathBinding::Struct(key)),
                ItemKind::Enum(_) => Some(PathBinding::Enum(key)),
                ItemKind::Trait => Some(PathBinding::Trait(key)),
                ItemKind::Function => Some(PathBinding::Function(key)),
                ItemKind::Static => Some(PathBinding::Static(key)),
                ItemKind::TypeAlias => Some(PathBinding::TypeAlias(key)),
            };
        }
        let (last, parent) = segments.split_last()?;
        let enum_key = item_key(parent);
        match self.items.get(&enum_key) {
            Some(ItemKind::Enum(variants)) => {
                let index = variants.iter().position(|name| name == last)?;
                Some(PathBinding::EnumVariant { enum_key, index })
            }
            _ => None,
        }
    }
}

struct Binder<'a> {
    index: &'a ItemIndex,
    module_path: Vec<String>,
    imports: Vec<HashMap<String, Vec<String>>>,
    generics: Vec<Vec<String>>,
    self_ty: Option<TypeRef>,
}

impl Binder<'_> {
    fn is_generic(&self, name: &str) -> bool {
        self.generics
            .iter()
            .rev()
            .any(|names| names.iter().any(|param| param == name))
    }

    /// Finds the item a path names. Returns the segments to prepend to make
    /// the path absolute, along with its binding.
    fn lookup(&self, path: &Path) -> Option<(Vec<String>, PathBinding)> {
        let names: Vec<String> = path.nodes.iter().map(|node| node.name.clone()).collect();
        if path.absolute {
            return self.index.binding_for(&names).map(|binding| (Vec::new(), binding));
        }
        let (first, rest) = names.split_first()?;
        if let Some(target) = self.imports.last().and_then(|imports| imports.get(first)) {
            let mut full = target.clone();
            full.extend(rest.iter().cloned());
            if let Some(binding) = self.index.binding_for(&full) {
                let prefix = target[..target.len() - 1].to_vec();
                return Some((prefix, binding));
            }
        }
        for prefix in [self.module_path.clone(), Vec::new()] {
            let mut full = prefix.clone();
            full.extend(names.iter().cloned());
            if let Some(binding) = self.index.binding_for(&full) {
                return Some((prefix, binding));
            }
        }
        None
    }

    fn absolutize(path: &mut Path, prefix: Vec<String>, binding: PathBinding) {
        let mut nodes: Vec<PathNode> = prefix.into_iter().map(PathNode::new).collect();
        nodes.append(&mut path.nodes);
        path.nodes = nodes;
        path.absolute = true;
        path.binding = binding;
    }

    fn bind_path_args(&mut self, path: &mut Path, span: Span) -> SemaResult<()> {
        for node in &mut path.nodes {
            for arg in &mut node.args {
                self.bind_type(arg, span)?;
            }
        }
        Ok(())
    }

    fn bind_path(&mut self, path: &mut Path, span: Span) -> SemaResult<()> {
        self.bind_path_args(path, span)?;
        match self.lookup(path) {
            Some((prefix, binding)) => {
                Self::absolutize(path, prefix, binding);
                Ok(())
            }
            None => Err(SemaError::unresolved(NameKind::Item, path.key(), span)),
        }
    }

    fn bind_type(&mut self, ty: &mut TypeRef, span: Span) -> SemaResult<()> {
        match ty {
            TypeRef::Path(path) => {
                self.bind_path_args(path, span)?;
                let single = !path.absolute && path.nodes.len() == 1 && path.nodes[0].args.is_empty();
                if single {
                    let name = path.nodes[0].name.clone();
                    if self.is_generic(&name) {
                        *ty = TypeRef::Generic(name);
                        return Ok(());
                    }
                    if name == "Self" {
                        if let Some(self_ty) = &self.self_ty {
                            *ty = self_ty.clone();
                            return Ok(());
                        }
                    }
                }
                match self.lookup(path) {
                    Some((prefix, binding)) => Self::absolutize(path, prefix, binding),
                    // Left for the checker's local type alias lookup.
                    None if single => {}
                    None => return Err(SemaError::unresolved(NameKind::Item, path.key(), span)),
                }
            }
            TypeRef::Borrow { inner, .. } | TypeRef::Array { inner, .. } => {
                self.bind_type(inner, span)?;
            }
            TypeRef::Tuple(items) => {
                for item in items {
                    self.bind_type(item, span)?;
                }
            }
            TypeRef::Wildcard | TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        }
        Ok(())
    }

    fn bind_params(&mut self, params: &mut GenericParams) -> SemaResult<()> {
        self.generics
            .push(params.ty_params.iter().map(|param| param.name.clone()).collect());
        for bound in &mut params.bounds {
            match bound {
                GenericBound::IsTrait {
                    ty,
                    trait_path,
                    span,
                } => {
                    self.bind_type(ty, *span)?;
                    self.bind_path(trait_path, *span)?;
                }
                GenericBound::Lifetime { ty, .. } => self.bind_type(ty, Span::default())?,
            }
        }
        Ok(())
    }

    fn bind_pattern(&mut self, pattern: &mut Pattern) -> SemaResult<()> {
        match pattern {
            Pattern::Wildcard(_) | Pattern::Identifier { .. } | Pattern::Literal(..) => Ok(()),
            Pattern::Tuple(items, _) => items.iter_mut().try_for_each(|item| self.bind_pattern(item)),
            Pattern::Reference { pattern, .. } => self.bind_pattern(pattern),
            Pattern::EnumVariant {
                path,
                bindings,
                span,
            } => {
                self.bind_path(path, *span)?;
                bindings.iter_mut().try_for_each(|sub| self.bind_pattern(sub))
            }
            Pattern::Struct { path, fields, span } => {
                self.bind_path(path, *span)?;
                fields
                    .iter_mut()
                    .try_for_each(|field| self.bind_pattern(&mut field.pattern))
            }
        }
    }

    fn bind_expr(&mut self, node: &mut ExprNode) -> SemaResult<()> {
        let span = node.span;
        match &mut node.kind {
            ExprKind::Block(block) => {
                for trait_path in &mut block.traits {
                    self.bind_path(trait_path, span)?;
                }
                for (_, ty) in &mut block.aliases {
                    self.bind_type(ty, span)?;
                }
                for stmt in &mut block.statements {
                    self.bind_expr(stmt)?;
                }
                if let Some(tail) = &mut block.tail {
                    self.bind_expr(tail)?;
                }
            }
            ExprKind::LetBinding { pattern, ty, value } => {
                self.bind_type(ty, span)?;
                self.bind_pattern(pattern)?;
                self.bind_expr(value)?;
            }
            ExprKind::Assign { slot, value } => {
                self.bind_expr(slot)?;
                self.bind_expr(value)?;
            }
            ExprKind::Return(value) => {
                if let Some(value) = value {
                    self.bind_expr(value)?;
                }
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.bind_expr(condition)?;
                self.bind_expr(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.bind_expr(else_branch)?;
                }
            }
            ExprKind::Match { value, arms } => {
                self.bind_expr(value)?;
                for arm in arms {
                    for pattern in &mut arm.patterns {
                        self.bind_pattern(pattern)?;
                    }
                    if let Some(guard) = &mut arm.guard {
                        self.bind_expr(guard)?;
                    }
                    self.bind_expr(&mut arm.code)?;
                }
            }
            ExprKind::CallPath { path, args } => {
                self.bind_path(path, span)?;
                for arg in args {
                    self.bind_expr(arg)?;
                }
            }
            ExprKind::CallMethod {
                value,
                method,
                args,
            } => {
                for arg in &mut method.args {
                    self.bind_type(arg, span)?;
                }
                self.bind_expr(value)?;
                for arg in args {
                    self.bind_expr(arg)?;
                }
            }
            ExprKind::CallValue { value, args } => {
                self.bind_expr(value)?;
                for arg in args {
                    self.bind_expr(arg)?;
                }
            }
            ExprKind::NamedValue(path) => {
                // A bare single name is a local variable.
                if path.absolute || path.nodes.len() > 1 {
                    self.bind_path(path, span)?;
                }
            }
            ExprKind::Field { object, .. } => self.bind_expr(object)?,
            ExprKind::Index { value, index } => {
                self.bind_expr(value)?;
                self.bind_expr(index)?;
            }
            ExprKind::Deref(value) | ExprKind::Borrow { value, .. } => self.bind_expr(value)?,
            ExprKind::Cast { value, ty } => {
                self.bind_type(ty, span)?;
                self.bind_expr(value)?;
            }
            ExprKind::Tuple(items) => {
                for item in items {
                    self.bind_expr(item)?;
                }
            }
            ExprKind::Literal(_) => {}
            ExprKind::BinOp { left, right, .. } => {
                self.bind_expr(left)?;
                self.bind_expr(right)?;
            }
        }
        Ok(())
    }

    fn bind_function(&mut self, def: &mut Function) -> SemaResult<()> {
        self.bind_params(&mut def.params)?;
        let result = self.bind_function_signature_and_body(def);
        self.generics.pop();
        result
    }

    fn bind_function_signature_and_body(&mut self, def: &mut Function) -> SemaResult<()> {
        for arg in &mut def.args {
            self.bind_type(&mut arg.ty, def.span)?;
            self.bind_pattern(&mut arg.pattern)?;
        }
        self.bind_type(&mut def.ret, def.span)?;
        if let Some(code) = &mut def.code {
            self.bind_expr(code)?;
        }
        Ok(())
    }

    fn bind_fields(&mut self, fields: &mut [StructField]) -> SemaResult<()> {
        fields
            .iter_mut()
            .try_for_each(|field| self.bind_type(&mut field.ty, field.span))
    }

    fn bind_item(&mut self, item: &mut Item) -> SemaResult<()> {
        match item {
            Item::Function(def) => self.bind_function(def),
            Item::Struct(def) => {
                self.bind_params(&mut def.params)?;
                let result = self.bind_fields(&mut def.fields);
                self.generics.pop();
                result
            }
            Item::Enum(def) => {
                self.bind_params(&mut def.params)?;
                let result = def.variants.iter_mut().try_for_each(|variant| match &mut variant.data {
                    VariantData::Value(Some(value)) => self.bind_expr(value),
                    VariantData::Value(None) => Ok(()),
                    VariantData::Tuple(types) => types
                        .iter_mut()
                        .try_for_each(|ty| self.bind_type(ty, variant.span)),
                    VariantData::Struct(fields) => self.bind_fields(fields),
                });
                self.generics.pop();
                result
            }
            Item::Trait(def) => {
                self.bind_params(&mut def.params)?;
                let result = def
                    .methods
                    .iter_mut()
                    .try_for_each(|method| self.bind_function(method));
                self.generics.pop();
                result
            }
            Item::Impl(block) => {
                self.bind_params(&mut block.params)?;
                let result = self.bind_impl(block);
                self.generics.pop();
                result
            }
            Item::Static(def) => {
                self.bind_type(&mut def.ty, def.span)?;
                self.bind_expr(&mut def.value)
            }
            Item::TypeAlias(def) => {
                self.bind_params(&mut def.params)?;
                let result = self.bind_type(&mut def.ty, def.span);
                self.generics.pop();
                result
            }
            Item::Module(module) => {
                self.module_path.push(module.name.clone());
                let result = self.bind_module(module);
                self.module_path.pop();
                result
            }
        }
    }

    fn bind_impl(&mut self, block: &mut ImplBlock) -> SemaResult<()> {
        self.bind_type(&mut block.self_ty, block.span)?;
        if let Some(trait_path) = &mut block.trait_path {
            self.bind_path(trait_path, block.span)?;
        }
        let outer_self = self.self_ty.replace(block.self_ty.clone());
        let result = block.items.iter_mut().try_for_each(|item| match &mut item.kind {
            ImplItemKind::Function(def) => self.bind_function(def),
            ImplItemKind::Const { ty, value } => {
                self.bind_type(ty, value.span)?;
                self.bind_expr(value)
            }
            ImplItemKind::Type(ty) => self.bind_type(ty, block.span),
        });
        self.self_ty = outer_self;
        result
    }

    fn bind_module(&mut self, module: &mut Module) -> SemaResult<()> {
        debug!(module = %item_key(&self.module_path), "binding paths");
        self.imports.push(HashMap::new());
        let result = self.bind_module_contents(module);
        self.imports.pop();
        result
    }

    fn bind_module_contents(&mut self, module: &mut Module) -> SemaResult<()> {
        for use_path in &mut module.uses {
            self.bind_path(use_path, Span::default())?;
            let segments: Vec<String> = use_path.nodes.iter().map(|node| node.name.clone()).collect();
            if let (Some(imports), Some(last)) = (self.imports.last_mut(), segments.last()) {
                imports.insert(last.clone(), segments.clone());
            }
        }
        module
            .items
            .iter_mut()
            .try_for_each(|item| self.bind_item(item))
    }
}
