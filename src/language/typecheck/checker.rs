use super::*;

/// Per-function expression type checker. Walks a bound module tree, gives
/// every expression node a result type and materializes implicit
/// dereferences as explicit [`ExprKind::Deref`] nodes.
pub struct ExprTypeChecker<'a> {
    pub(super) symbols: &'a SymbolTable,
    pub(super) options: &'a TypecheckOptions,
    scopes: Vec<Scope>,
}

impl<'a> ExprTypeChecker<'a> {
    pub fn new(symbols: &'a SymbolTable, options: &'a TypecheckOptions) -> Self {
        Self {
            symbols,
            options,
            scopes: Vec::new(),
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    fn start_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Runs `body` inside a fresh scope. The scope is closed whether or not
    /// `body` fails.
    pub(super) fn scoped<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> SemaResult<T>,
    ) -> SemaResult<T> {
        self.start_scope();
        let result = body(self);
        self.end_scope();
        result
    }

    fn current_scope(&mut self, span: Span) -> SemaResult<&mut Scope> {
        self.scopes
            .last_mut()
            .ok_or_else(|| SemaError::invariant("declaration outside of any scope", span))
    }

    pub(super) fn local_variable(
        &mut self,
        mutability: Mutability,
        name: &str,
        ty: TypeRef,
        span: Span,
    ) -> SemaResult<()> {
        debug!(name, ty = %ty, "declare local");
        self.current_scope(span)?.vars.push(LocalVar {
            mutability,
            name: name.to_string(),
            ty,
        });
        Ok(())
    }

    fn get_local_var(&mut self, name: &str, span: Span) -> SemaResult<&mut LocalVar> {
        self.scopes
            .iter_mut()
            .rev()
            .flat_map(|scope| scope.vars.iter_mut().rev())
            .find(|var| var.name == name)
            .ok_or_else(|| SemaError::unresolved(NameKind::Variable, name, span))
    }

    fn get_local_type(&self, name: &str, span: Span) -> SemaResult<TypeRef> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.types.iter().rev())
            .find(|(alias, _)| alias == name)
            .map(|(_, ty)| ty.clone())
            .ok_or_else(|| SemaError::unresolved(NameKind::LocalType, name, span))
    }

    pub(super) fn get_type_param(&self, name: &str, span: Span) -> SemaResult<TypeRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.type_params.get(name))
            .cloned()
            .ok_or_else(|| SemaError::unresolved(NameKind::TypeParameter, name, span))
    }

    /// Traits visible from the current position, innermost scope first.
    pub(super) fn traits_in_scope(&self) -> impl Iterator<Item = &Path> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.traits.iter().rev())
    }

    /// Seeds each type parameter with an unconstrained type. Bounds are only
    /// checked for naming a known parameter.
    fn handle_params(&mut self, params: &GenericParams, span: Span) -> SemaResult<()> {
        let scope = self.current_scope(span)?;
        for param in &params.ty_params {
            scope.type_params.insert(param.name.clone(), TypeRef::Wildcard);
        }
        for bound in &params.bounds {
            let GenericBound::IsTrait { ty, span, .. } = bound else {
                continue;
            };
            match ty {
                TypeRef::Generic(name) => {
                    self.get_type_param(name, *span)?;
                }
                // A bare name the binder could not place can only be a
                // parameter that was never declared.
                TypeRef::Path(path)
                    if matches!(path.binding, PathBinding::Unbound)
                        && !path.is_absolute()
                        && path.len() == 1 =>
                {
                    self.get_type_param(&path.nodes[0].name, *span)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Expands type aliases and resolves bare names against local type
    /// aliases.
    pub(super) fn resolve_type(&self, ty: &mut TypeRef, span: Span) -> SemaResult<()> {
        match ty {
            TypeRef::Path(path) => {
                for node in &mut path.nodes {
                    for arg in &mut node.args {
                        self.resolve_type(arg, span)?;
                    }
                }
                match path.binding.clone() {
                    PathBinding::TypeAlias(_) => self.symbols.expand_aliases(ty, span)?,
                    PathBinding::Unbound if !path.is_absolute() && path.len() == 1 => {
                        let name = path.nodes[0].name.clone();
                        *ty = self.get_local_type(&name, span)?;
                    }
                    _ => {}
                }
            }
            TypeRef::Borrow { inner, .. } | TypeRef::Array { inner, .. } => {
                self.resolve_type(inner, span)?;
            }
            TypeRef::Tuple(items) => {
                for item in items {
                    self.resolve_type(item, span)?;
                }
            }
            TypeRef::Wildcard | TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        }
        Ok(())
    }

    pub fn check_module(&mut self, module: &mut Module, prefix: &[String]) -> SemaResult<()> {
        let mut traits: Vec<Path> = module
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Trait(def) => {
                    let mut segments = prefix.to_vec();
                    segments.push(def.name.clone());
                    let mut path = Path::absolute(segments);
                    path.binding = PathBinding::Trait(path.key());
                    Some(path)
                }
                _ => None,
            })
            .collect();
        traits.extend(
            module
                .uses
                .iter()
                .filter(|path| matches!(path.binding, PathBinding::Trait(_)))
                .cloned(),
        );

        // Enclosing modules contribute nothing to a nested module's scope.
        let outer = std::mem::take(&mut self.scopes);
        let result = self.scoped(|this| {
            this.current_scope(Span::default())?.traits = traits;
            this.check_items(module, prefix)
        });
        self.scopes = outer;
        result
    }

    fn check_items(&mut self, module: &mut Module, prefix: &[String]) -> SemaResult<()> {
        for item in &mut module.items {
            match item {
                Item::Function(def) => {
                    let mut segments = prefix.to_vec();
                    segments.push(def.name.clone());
                    self.handle_function(&segments.join("::"), def)?;
                }
                Item::Impl(block) if self.options.check_impl_methods => {
                    self.handle_impl(block)?;
                }
                Item::Module(sub) => {
                    let mut segments = prefix.to_vec();
                    segments.push(sub.name.clone());
                    self.check_module(sub, &segments)?;
                }
                // Checked by a later pass.
                Item::Impl(_)
                | Item::Struct(_)
                | Item::Enum(_)
                | Item::Trait(_)
                | Item::Static(_)
                | Item::TypeAlias(_) => {}
            }
        }
        Ok(())
    }

    fn handle_impl(&mut self, block: &mut ImplBlock) -> SemaResult<()> {
        self.scoped(|this| {
            this.handle_params(&block.params, block.span)?;
            for item in &mut block.items {
                if let ImplItemKind::Function(def) = &mut item.kind {
                    let name = format!("<{}>::{}", block.self_ty, item.name);
                    this.handle_function(&name, def)?;
                }
            }
            Ok(())
        })
    }

    #[tracing::instrument(level = "debug", skip(self, def))]
    pub fn handle_function(&mut self, path: &str, def: &mut Function) -> SemaResult<()> {
        self.scoped(|this| {
            this.handle_params(&def.params, def.span)?;
            let mut ret = def.ret.clone();
            this.resolve_type(&mut ret, def.span)?;
            for arg in &mut def.args {
                this.resolve_type(&mut arg.ty, def.span)?;
                this.handle_pattern(&arg.pattern, &arg.ty)?;
            }
            let Some(code) = &mut def.code else {
                debug!("no body");
                return Ok(());
            };
            code.res_type = ret;
            this.visit_node(code)
        })
    }

    pub fn visit_node(&mut self, node: &mut ExprNode) -> SemaResult<()> {
        let ExprNode {
            kind,
            res_type,
            span,
        } = node;
        let span = *span;
        match kind {
            ExprKind::Block(block) => self.visit_block(block, res_type, span)?,
            ExprKind::LetBinding { pattern, ty, value } => {
                self.resolve_type(ty, span)?;
                self.visit_node(value)?;
                if ty.is_concrete() && value.res_type.is_concrete() && *ty != value.res_type {
                    return Err(SemaError::mismatch(&*ty, &value.res_type, value.span));
                }
                merge(ty, &value.res_type, span)?;
                value.res_type = ty.clone();
                self.handle_pattern(pattern, ty)?;
                merge(res_type, &TypeRef::Unit, span)?;
            }
            ExprKind::Assign { slot, value } => {
                self.visit_node(slot)?;
                self.visit_node(value)?;
                merge(res_type, &TypeRef::Unit, span)?;
            }
            ExprKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_node(value)?;
                }
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.visit_node(condition)?;
                self.visit_node(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        self.visit_node(else_branch)?;
                        merge(res_type, &then_branch.res_type, span)?;
                        merge(res_type, &else_branch.res_type, span)?;
                    }
                    None => merge(res_type, &TypeRef::Unit, span)?,
                }
            }
            ExprKind::Match { value, arms } => {
                self.visit_node(value)?;
                let scrutinee = value.res_type.clone();
                for arm in arms {
                    self.scoped(|this| {
                        for pattern in &arm.patterns {
                            this.handle_pattern(pattern, &scrutinee)?;
                        }
                        if let Some(guard) = &mut arm.guard {
                            this.visit_node(guard)?;
                        }
                        merge(&mut arm.code.res_type, res_type, span)?;
                        this.visit_node(&mut arm.code)?;
                        merge(res_type, &arm.code.res_type, arm.code.span)
                    })?;
                }
            }
            ExprKind::CallPath { path, args } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    self.visit_node(arg)?;
                    arg_types.push(arg.res_type.clone());
                }
                let ret = self.call_path_type(path, &arg_types, span)?;
                merge(res_type, &ret, span)?;
            }
            ExprKind::CallMethod {
                value,
                method,
                args,
            } => self.visit_method_call(value, method, args, res_type, span)?,
            ExprKind::CallValue { value, args } => {
                self.visit_node(value)?;
                for arg in args {
                    self.visit_node(arg)?;
                }
            }
            ExprKind::NamedValue(path) => {
                if !path.is_absolute() && path.len() == 1 {
                    let name = path.nodes[0].name.clone();
                    let var = self.get_local_var(&name, span)?;
                    merge(res_type, &var.ty, span)?;
                    var.ty = res_type.clone();
                    debug!(name = %name, ty = %var.ty, mutable = var.mutability.is_mutable(), "local use");
                } else {
                    let ty = self.named_value_type(path, span)?;
                    merge(res_type, &ty, span)?;
                }
            }
            ExprKind::Field { object, name } => {
                self.visit_node(object)?;
                if !object.res_type.is_concrete() {
                    debug!(field = %name, "object type unknown, deferring field access");
                    return Ok(());
                }
                let (base, _) = strip_references(&object.res_type);
                let mut derefs = 0;
                let mut current = object.res_type.clone();
                while current.deref() {
                    derefs += 1;
                }
                let key = match &base {
                    TypeRef::Path(path) => match &path.binding {
                        PathBinding::Struct(key) => Some((key.clone(), path)),
                        _ => None,
                    },
                    _ => None,
                };
                let Some((key, path)) = key else {
                    return Err(SemaError::no_member(
                        format!("no field `{name}` on type `{base}`"),
                        span,
                    ));
                };
                let args = path.last().map(|node| node.args.clone()).unwrap_or_default();
                let field_ty = self.symbols.field_type(&key, &args, name, span)?;
                merge(res_type, &field_ty, span)?;
                debug!(field = %name, derefs, "resolved field");
                wrap_in_derefs(object, derefs);
            }
            ExprKind::Index { value, index } => {
                self.visit_node(value)?;
                self.visit_node(index)?;
                if let (TypeRef::Array { inner, .. }, _) = strip_references(&value.res_type) {
                    merge(res_type, &inner, span)?;
                }
            }
            ExprKind::Deref(value) => {
                self.visit_node(value)?;
                let mut inner = value.res_type.clone();
                if inner.deref() {
                    merge(res_type, &inner, span)?;
                } else if !inner.is_wildcard() {
                    return Err(SemaError::mismatch("a reference", inner, value.span));
                }
            }
            ExprKind::Borrow { kind, value } => {
                if let TypeRef::Borrow { inner, .. } = &*res_type {
                    merge(&mut value.res_type, inner, span)?;
                }
                self.visit_node(value)?;
                merge(res_type, &TypeRef::borrow(*kind, value.res_type.clone()), span)?;
            }
            ExprKind::Cast { value, ty } => {
                self.resolve_type(ty, span)?;
                self.visit_node(value)?;
                merge(res_type, ty, span)?;
            }
            ExprKind::Tuple(items) => {
                for item in items.iter_mut() {
                    self.visit_node(item)?;
                }
                let ty = if items.is_empty() {
                    TypeRef::Unit
                } else {
                    TypeRef::Tuple(items.iter().map(|item| item.res_type.clone()).collect())
                };
                merge(res_type, &ty, span)?;
            }
            ExprKind::Literal(literal) => merge(res_type, &literal_type(literal), span)?,
            ExprKind::BinOp { op, left, right } => {
                self.visit_node(left)?;
                self.visit_node(right)?;
                let mut operand = left.res_type.clone();
                merge(&mut operand, &right.res_type, span)?;
                if op.yields_bool() {
                    merge(res_type, &TypeRef::Primitive(CoreType::Bool), span)?;
                } else {
                    merge(res_type, &operand, span)?;
                }
            }
        }
        Ok(())
    }

    fn visit_block(&mut self, block: &mut Block, res_type: &mut TypeRef, span: Span) -> SemaResult<()> {
        self.scoped(|this| {
            for (name, ty) in &block.aliases {
                let mut ty = ty.clone();
                this.resolve_type(&mut ty, span)?;
                this.current_scope(span)?.types.push((name.clone(), ty));
            }
            this.current_scope(span)?.traits.extend(block.traits.iter().cloned());
            for stmt in &mut block.statements {
                this.visit_node(stmt)?;
            }
            match &mut block.tail {
                Some(tail) => {
                    merge(&mut tail.res_type, res_type, tail.span)?;
                    this.visit_node(tail)?;
                    merge(res_type, &tail.res_type, tail.span)
                }
                None => {
                    if res_type.is_wildcard() {
                        *res_type = TypeRef::Unit;
                    }
                    Ok(())
                }
            }
        })
    }

    fn named_value_type(&self, path: &Path, span: Span) -> SemaResult<TypeRef> {
        match &path.binding {
            PathBinding::Static(key) => self.symbols.static_type(key, span).cloned(),
            PathBinding::EnumVariant { enum_key, index } => {
                let def = self.symbols.enum_def(enum_key, span)?;
                let variant = def.variants.get(*index).ok_or_else(|| {
                    SemaError::invariant(format!("variant #{index} missing from `{enum_key}`"), span)
                })?;
                if !matches!(variant.data, VariantData::Value(_)) {
                    return Err(SemaError::arity(
                        format!("enum variant `{path}` has fields and cannot be used as a value"),
                        span,
                    ));
                }
                let args = self.enum_args(path, def, span)?;
                Ok(enum_path_type(path, enum_key, args))
            }
            PathBinding::Struct(key) => {
                let def = self.symbols.struct_def(key, span)?;
                if !def.fields.is_empty() {
                    return Err(SemaError::arity(
                        format!("struct `{path}` has fields and cannot be used as a value"),
                        span,
                    ));
                }
                let mut ty = path.clone();
                if let Some(last) = ty.nodes.last_mut() {
                    last.args.resize(def.params.len(), TypeRef::Wildcard);
                }
                Ok(TypeRef::Path(ty))
            }
            PathBinding::Function(_) => Err(SemaError::unsupported("function item used as a value", span)),
            other => Err(SemaError::invariant(
                format!("path `{path}` bound to {other} used as a value"),
                span,
            )),
        }
    }

    fn call_path_type(&self, path: &Path, arg_types: &[TypeRef], span: Span) -> SemaResult<TypeRef> {
        match &path.binding {
            PathBinding::Function(key) => {
                let sig = self.symbols.function(key, span)?;
                let explicit = path.last().map_or(false, |node| !node.args.is_empty());
                if !sig.params.is_empty() || explicit {
                    return Err(SemaError::unsupported(format!("call to generic function `{path}`"), span));
                }
                if sig.args.len() != arg_types.len() {
                    return Err(SemaError::arity(
                        format!(
                            "function `{path}` takes {} arguments but {} were supplied",
                            sig.args.len(),
                            arg_types.len()
                        ),
                        span,
                    ));
                }
                Ok(sig.ret.clone())
            }
            PathBinding::EnumVariant { enum_key, index } => {
                self.check_enum_variant(path, enum_key, *index, arg_types, span)
            }
            PathBinding::Struct(_) => Err(SemaError::unsupported("tuple struct constructor", span)),
            other => Err(SemaError::invariant(
                format!("path `{path}` bound to {other} used as a callee"),
                span,
            )),
        }
    }

    /// Generic arguments written on an enum variant path, padded with
    /// wildcards to the enum's parameter count.
    fn enum_args(&self, path: &Path, def: &EnumDef, span: Span) -> SemaResult<Vec<TypeRef>> {
        let variant_args = path.last().map(|node| node.args.clone()).unwrap_or_default();
        let mut args = if variant_args.is_empty() {
            path.nodes
                .len()
                .checked_sub(2)
                .and_then(|idx| path.nodes.get(idx))
                .map(|node| node.args.clone())
                .unwrap_or_default()
        } else {
            variant_args
        };
        if args.len() > def.params.len() {
            return Err(SemaError::arity(
                format!(
                    "enum `{}` takes {} type arguments but {} were supplied",
                    def.name,
                    def.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        args.resize(def.params.len(), TypeRef::Wildcard);
        Ok(args)
    }

    /// Reconciles the argument types of an enum variant call with the
    /// variant's field templates, producing the instantiated enum type.
    pub(super) fn check_enum_variant(
        &self,
        path: &Path,
        enum_key: &str,
        index: usize,
        arg_types: &[TypeRef],
        span: Span,
    ) -> SemaResult<TypeRef> {
        let def = self.symbols.enum_def(enum_key, span)?;
        let variant = def.variants.get(index).ok_or_else(|| {
            SemaError::invariant(format!("variant #{index} missing from `{enum_key}`"), span)
        })?;
        let templates: &[TypeRef] = match &variant.data {
            VariantData::Tuple(types) => types,
            VariantData::Value(_) => &[],
            VariantData::Struct(_) => {
                return Err(SemaError::unsupported(
                    format!("struct-like variant `{path}` called as a function"),
                    span,
                ))
            }
        };
        if templates.len() != arg_types.len() {
            return Err(SemaError::arity(
                format!(
                    "variant `{path}` has {} fields but {} arguments were supplied",
                    templates.len(),
                    arg_types.len()
                ),
                span,
            ));
        }

        let mut args = self.enum_args(path, def, span)?;
        for (template, found) in templates.iter().zip(arg_types) {
            let mut bindings = Vec::new();
            template
                .match_template(found, &mut bindings)
                .map_err(|conflict| conflict.into_error(span))?;
            for (name, ty) in bindings {
                let idx = def
                    .params
                    .find_name(&name)
                    .ok_or_else(|| SemaError::unresolved(NameKind::TypeParameter, &name, span))?;
                merge(&mut args[idx], &ty, span)?;
            }
        }
        debug!(variant = %path, "reconciled enum variant arguments");
        Ok(enum_path_type(path, enum_key, args))
    }
}

/// The enum's own path type for a variant path, carrying `args`.
fn enum_path_type(variant: &Path, enum_key: &str, args: Vec<TypeRef>) -> TypeRef {
    let mut path = variant.parent();
    if let Some(last) = path.nodes.last_mut() {
        last.args = args;
    }
    path.binding = PathBinding::Enum(enum_key.to_string());
    TypeRef::Path(path)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn later_declaration_shadows_earlier_one() {
        let body = block(
            vec![
                let_binding("x", "i32", int(1)),
                let_binding("x", "bool", boolean(true)),
            ],
            Some(var("x")),
        );
        let krate = check(module(vec![function("shadow", &[], "_", body)])).expect("check");
        let tail = tail_of(&krate, "shadow");
        assert_eq!(tail.res_type, ty("bool"), "tail was {:?}", tail);
    }

    #[test]
    fn scopes_are_balanced_after_success_and_failure() {
        let good = function(
            "good",
            &[("a", "u8")],
            "u8",
            block(vec![let_binding("b", "u8", var("a"))], Some(var("b"))),
        );
        let bad = function("bad", &[], "_", block(Vec::new(), Some(var("missing"))));
        let Crate { mut root, symbols } =
            Crate::new(module(vec![good, bad])).expect("crate");
        let options = TypecheckOptions::default();
        let mut checker = ExprTypeChecker::new(&symbols, &options);
        let err = checker.check_module(&mut root, &[]).expect_err("missing variable");
        assert_eq!(checker.scope_depth(), 0);
        assert!(
            matches!(err, SemaError::UnresolvedName { kind: NameKind::Variable, ref name, .. } if name == "missing"),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn bindings_do_not_outlive_their_block() {
        let inner = block(vec![let_binding("y", "u8", int(1))], None);
        let body = block(vec![inner], Some(var("y")));
        let err = check(module(vec![function("leak", &[], "_", body)])).expect_err("out of scope");
        assert!(
            matches!(err, SemaError::UnresolvedName { kind: NameKind::Variable, .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn let_with_conflicting_concrete_types_fails() {
        let body = block(vec![let_binding("x", "i32", boolean(true))], None);
        let err = check(module(vec![function("bad", &[], "()", body)])).expect_err("mismatch");
        let SemaError::TypeMismatch { expected, found, .. } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(expected, "i32");
        assert_eq!(found, "bool");
    }

    #[test]
    fn let_without_annotation_takes_initializer_type() {
        let body = block(
            vec![let_binding("x", "_", int_typed(7, "u64"))],
            Some(var("x")),
        );
        let krate = check(module(vec![function("infer", &[], "_", body)])).expect("check");
        assert_eq!(tail_of(&krate, "infer").res_type, ty("u64"));
    }

    #[test]
    fn field_access_through_two_references_inserts_two_derefs() {
        let body = block(Vec::new(), Some(field(var("s"), "value")));
        let krate = check(module(vec![
            struct_item("Holder", &[], &[("value", "u16")]),
            function("read", &[("s", "&&Holder")], "_", body),
        ]))
        .expect("check");
        let tail = tail_of(&krate, "read");
        assert_eq!(tail.res_type, ty("u16"));
        let ExprKind::Field { object, .. } = &tail.kind else {
            panic!("expected field access, got {:?}", tail.kind);
        };
        assert_eq!(deref_depth(object), 2);
        assert_eq!(object.res_type, ty("::Holder"));
    }

    #[test]
    fn field_access_on_unknown_type_is_deferred() {
        let body = block(Vec::new(), Some(field(var("s"), "value")));
        let krate = check(module(vec![
            struct_item("Holder", &[], &[("value", "u16")]),
            function("later", &[("s", "_")], "_", body),
        ]))
        .expect("deferred field access is not an error");
        let tail = tail_of(&krate, "later");
        assert!(tail.res_type.is_wildcard(), "tail type {:?}", tail.res_type);
        let ExprKind::Field { object, .. } = &tail.kind else {
            panic!("expected field access");
        };
        assert_eq!(deref_depth(object), 0);
    }

    #[test]
    fn generic_struct_field_is_instantiated() {
        let body = block(Vec::new(), Some(field(var("w"), "inner")));
        let krate = check(module(vec![
            struct_item("Wrapper", &["T"], &[("inner", "T")]),
            function("unwrap", &[("w", "Wrapper<char>")], "_", body),
        ]))
        .expect("check");
        assert_eq!(tail_of(&krate, "unwrap").res_type, ty("char"));
    }

    #[test]
    fn missing_field_is_reported() {
        let body = block(Vec::new(), Some(field(var("s"), "nope")));
        let err = check(module(vec![
            struct_item("Holder", &[], &[("value", "u16")]),
            function("read", &[("s", "Holder")], "_", body),
        ]))
        .expect_err("missing field");
        assert!(
            matches!(err, SemaError::UnresolvedMethodOrField { .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn unit_variant_value_yields_enum_type_with_wildcards() {
        let body = block(Vec::new(), Some(path_value(&["Choice", "Empty"])));
        let krate = check(module(vec![
            choice_enum(),
            function("empty", &[], "_", body),
        ]))
        .expect("check");
        assert_eq!(tail_of(&krate, "empty").res_type, ty("::Choice<_>"));
    }

    #[test]
    fn data_variant_used_as_value_is_arity_error() {
        let body = block(Vec::new(), Some(path_value(&["Choice", "Some"])));
        let err = check(module(vec![choice_enum(), function("bad", &[], "_", body)]))
            .expect_err("variant has fields");
        assert!(matches!(err, SemaError::ArityMismatch { .. }), "unexpected error {err:?}");
    }

    #[test]
    fn variant_call_reconciles_generic_arguments() {
        let body = block(
            Vec::new(),
            Some(call_path(&["Choice", "Some"], vec![boolean(false)])),
        );
        let krate = check(module(vec![choice_enum(), function("some", &[], "_", body)]))
            .expect("check");
        assert_eq!(tail_of(&krate, "some").res_type, ty("::Choice<bool>"));
    }

    #[test]
    fn too_many_enum_arguments_are_rejected() {
        let mut path = Path::relative(["Choice", "Empty"]);
        path.nodes[0].args = vec![ty("u8"), ty("u8")];
        let body = block(
            Vec::new(),
            Some(ExprNode::new(ExprKind::NamedValue(path), Span::default())),
        );
        let err = check(module(vec![choice_enum(), function("bad", &[], "_", body)]))
            .expect_err("too many arguments");
        assert!(matches!(err, SemaError::ArityMismatch { .. }), "unexpected error {err:?}");
    }

    #[test]
    fn function_call_returns_declared_type() {
        let helper = function("helper", &[("x", "u8")], "i64", block(Vec::new(), Some(int(0))));
        let body = block(Vec::new(), Some(call_path(&["helper"], vec![int(1)])));
        let krate = check(module(vec![helper, function("caller", &[], "_", body)]))
            .expect("check");
        assert_eq!(tail_of(&krate, "caller").res_type, ty("i64"));
    }

    #[test]
    fn generic_function_call_is_unsupported() {
        let mut helper = function("pick", &[("x", "T")], "T", block(Vec::new(), Some(var("x"))));
        if let Item::Function(def) = &mut helper {
            def.params = GenericParams::with_names(["T"]);
        }
        let body = block(Vec::new(), Some(call_path(&["pick"], vec![int(1)])));
        let err = check(module(vec![helper, function("caller", &[], "_", body)]))
            .expect_err("generic call");
        assert!(
            matches!(err, SemaError::UnsupportedConstruct { .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn static_value_has_declared_type() {
        // A bare `LIMIT` would be a local; statics are reached by path.
        let body = block(Vec::new(), Some(path_value(&["self_test", "LIMIT"])));
        let mut inner = Module::new("self_test");
        inner.items.push(static_item("LIMIT", "u32"));
        let mut root = module(vec![function("limit", &[], "_", body)]);
        root.items.push(Item::Module(inner));
        let krate = check(root).expect("check");
        assert_eq!(tail_of(&krate, "limit").res_type, ty("u32"));
    }

    #[test]
    fn cast_target_wins() {
        let cast = ExprNode::new(
            ExprKind::Cast {
                value: Box::new(int_typed(3, "u8")),
                ty: ty("i64"),
            },
            Span::default(),
        );
        let krate = check(module(vec![function(
            "widen",
            &[],
            "_",
            block(Vec::new(), Some(cast)),
        )]))
        .expect("check");
        assert_eq!(tail_of(&krate, "widen").res_type, ty("i64"));
    }

    #[test]
    fn block_type_alias_is_local_to_block() {
        let mut inner = Block::new(vec![let_binding("n", "Num", int(4))], Some(var("n")));
        inner.aliases.push(("Num".into(), ty("u16")));
        let body = ExprNode::new(ExprKind::Block(inner), Span::default());
        let krate = check(module(vec![function("alias", &[], "_", body)])).expect("check");
        assert_eq!(tail_of(&krate, "alias").res_type, ty("u16"));

        let body = block(vec![let_binding("n", "Num", int(4))], None);
        let err = check(module(vec![function("no_alias", &[], "()", body)]))
            .expect_err("alias not in scope");
        assert!(
            matches!(err, SemaError::UnresolvedName { kind: NameKind::LocalType, .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn unknown_bound_parameter_is_reported() {
        let mut item = function("bounded", &[], "()", block(Vec::new(), None));
        if let Item::Function(def) = &mut item {
            def.params = GenericParams::with_names(["T"]);
            def.params.bounds.push(GenericBound::IsTrait {
                ty: ty("U"),
                trait_path: Path::absolute(["Speak"]),
                span: Span::default(),
            });
        }
        let mut root = module(vec![item]);
        root.items.push(Item::Trait(TraitDef {
            name: "Speak".into(),
            params: GenericParams::default(),
            methods: Vec::new(),
            span: Span::default(),
        }));
        let err = check(root).expect_err("unknown parameter");
        assert!(
            matches!(err, SemaError::UnresolvedName { kind: NameKind::TypeParameter, .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn bound_on_declared_parameter_is_accepted() {
        let mut item = function("bounded", &[], "()", block(Vec::new(), None));
        if let Item::Function(def) = &mut item {
            def.params = GenericParams::with_names(["T"]);
            def.params.bounds.push(GenericBound::IsTrait {
                ty: ty("T"),
                trait_path: Path::relative(["Speak"]),
                span: Span::default(),
            });
        }
        check(module(vec![item, trait_item("Speak", Vec::new())])).expect("declared parameter");
    }

    #[test]
    fn alias_return_type_matches_its_target() {
        let caller = block(
            vec![let_binding("x", "u32", call_path(&["make"], Vec::new()))],
            None,
        );
        check(module(vec![
            type_alias("Id", "u32"),
            Item::Function(method_def("make", &[], "Id", None)),
            function("caller", &[], "()", caller),
        ]))
        .expect("alias return type");
    }

    #[test]
    fn alias_field_type_matches_its_target() {
        let reader = block(vec![let_binding("x", "u32", field(var("s"), "id"))], None);
        check(module(vec![
            type_alias("Id", "u32"),
            struct_item("Record", &[], &[("id", "Id")]),
            function("reader", &[("s", "Record")], "()", reader),
        ]))
        .expect("alias field type");
    }

    #[test]
    fn alias_static_type_matches_its_target() {
        let reader = block(
            vec![let_binding("x", "u32", path_value(&["limits", "LIMIT"]))],
            None,
        );
        let mut inner = Module::new("limits");
        inner.items.push(static_item("LIMIT", "Id"));
        let mut root = module(vec![type_alias("Id", "u32"), function("reader", &[], "()", reader)]);
        root.items.push(Item::Module(inner));
        check(root).expect("alias static type");
    }

    #[test]
    fn cast_conflicting_with_expected_type_fails() {
        let cast = ExprNode::new(
            ExprKind::Cast {
                value: Box::new(int_typed(3, "u8")),
                ty: ty("u32"),
            },
            Span::default(),
        );
        let err = check(module(vec![function(
            "narrow",
            &[],
            "u8",
            block(Vec::new(), Some(cast)),
        )]))
        .expect_err("cast result conflicts with return type");
        let SemaError::TypeMismatch { expected, found, .. } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(expected, "u8");
        assert_eq!(found, "u32");
    }

    #[test]
    fn declaration_without_scope_is_an_invariant_violation() {
        let Crate { symbols, .. } = Crate::new(module(Vec::new())).expect("crate");
        let options = TypecheckOptions::default();
        let mut checker = ExprTypeChecker::new(&symbols, &options);
        let mut node = let_binding("x", "u8", int(1));
        let err = checker.visit_node(&mut node).expect_err("no scope");
        assert!(
            matches!(err, SemaError::InvariantViolation { .. }),
            "unexpected error {err:?}"
        );
        assert_eq!(checker.scope_depth(), 0);
    }
}
