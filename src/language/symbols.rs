use crate::language::{
    ast::*,
    errors::{NameKind, SemaError, SemaResult},
    resolve::item_key,
    span::Span,
    types::TypeRef,
};
use std::collections::HashMap;

/// Nesting limit for alias-to-alias expansion; deeper chains are cyclic.
const ALIAS_EXPANSION_LIMIT: usize = 64;

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionSig {
    pub params: GenericParams,
    pub args: Vec<TypeRef>,
    pub ret: TypeRef,
}

impl From<&Function> for FunctionSig {
    fn from(def: &Function) -> Self {
        Self {
            params: def.params.clone(),
            args: def.args.iter().map(|arg| arg.ty.clone()).collect(),
            ret: def.ret.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImplSig {
    pub params: GenericParams,
    pub trait_path: Option<Path>,
    pub self_ty: TypeRef,
    pub methods: Vec<(String, FunctionSig)>,
    pub span: Span,
}

impl ImplSig {
    pub fn find_method(&self, name: &str) -> Option<&FunctionSig> {
        self.methods
            .iter()
            .find(|(method, _)| method == name)
            .map(|(_, sig)| sig)
    }

    /// Matches `ty` against the impl's self type, returning the impl's
    /// parameter assignment on success.
    pub fn bind_self(&self, ty: &TypeRef) -> Option<HashMap<String, TypeRef>> {
        let mut bindings = Vec::new();
        self.self_ty.match_template(ty, &mut bindings).ok()?;
        let mut assignment: HashMap<String, TypeRef> = HashMap::new();
        for (name, found) in bindings {
            match assignment.get_mut(&name) {
                Some(existing) => existing.merge_with(&found).ok()?,
                None => {
                    assignment.insert(name, found);
                }
            }
        }
        Some(assignment)
    }
}

/// Crate-wide item information keyed by absolute item path. Every type
/// handed out has its type aliases expanded.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
    structs: HashMap<ItemKey, StructDef>,
    enums: HashMap<ItemKey, EnumDef>,
    statics: HashMap<ItemKey, TypeRef>,
    functions: HashMap<ItemKey, FunctionSig>,
    type_aliases: HashMap<ItemKey, TypeAliasDef>,
    impls: Vec<ImplSig>,
}

impl SymbolTable {
    pub fn collect(root: &Module) -> SemaResult<Self> {
        let mut table = Self::default();
        table.collect_module(root, &[]);
        table.expand_signatures()?;
        Ok(table)
    }

    fn collect_module(&mut self, module: &Module, prefix: &[String]) {
        let key_for = |name: &str| {
            let mut segments = prefix.to_vec();
            segments.push(name.to_string());
            item_key(&segments)
        };
        for item in &module.items {
            match item {
                Item::Function(def) => {
                    self.functions.insert(key_for(&def.name), FunctionSig::from(def));
                }
                Item::Struct(def) => {
                    self.structs.insert(key_for(&def.name), def.clone());
                }
                Item::Enum(def) => {
                    self.enums.insert(key_for(&def.name), def.clone());
                }
                Item::Impl(block) => {
                    let methods = block
                        .items
                        .iter()
                        .filter_map(|item| match &item.kind {
                            ImplItemKind::Function(def) => {
                                Some((item.name.clone(), FunctionSig::from(def)))
                            }
                            ImplItemKind::Const { .. } | ImplItemKind::Type(_) => None,
                        })
                        .collect();
                    self.impls.push(ImplSig {
                        params: block.params.clone(),
                        trait_path: block.trait_path.clone(),
                        self_ty: block.self_ty.clone(),
                        methods,
                        span: block.span,
                    });
                }
                Item::Static(def) => {
                    self.statics.insert(key_for(&def.name), def.ty.clone());
                }
                Item::TypeAlias(def) => {
                    self.type_aliases.insert(key_for(&def.name), def.clone());
                }
                Item::Module(sub) => {
                    let mut segments = prefix.to_vec();
                    segments.push(sub.name.clone());
                    self.collect_module(sub, &segments);
                }
                // Trait declarations are found through paths, not the table.
                Item::Trait(_) => {}
            }
        }
    }

    /// Rewrites every stored signature so no alias path survives.
    fn expand_signatures(&mut self) -> SemaResult<()> {
        let mut structs = std::mem::take(&mut self.structs);
        for def in structs.values_mut() {
            for field in &mut def.fields {
                self.expand_aliases(&mut field.ty, field.span)?;
            }
        }
        self.structs = structs;

        let mut enums = std::mem::take(&mut self.enums);
        for def in enums.values_mut() {
            for variant in &mut def.variants {
                match &mut variant.data {
                    VariantData::Value(_) => {}
                    VariantData::Tuple(types) => {
                        for ty in types {
                            self.expand_aliases(ty, variant.span)?;
                        }
                    }
                    VariantData::Struct(fields) => {
                        for field in fields {
                            self.expand_aliases(&mut field.ty, field.span)?;
                        }
                    }
                }
            }
        }
        self.enums = enums;

        let mut statics = std::mem::take(&mut self.statics);
        for ty in statics.values_mut() {
            self.expand_aliases(ty, Span::default())?;
        }
        self.statics = statics;

        let mut functions = std::mem::take(&mut self.functions);
        for sig in functions.values_mut() {
            self.expand_function(sig, Span::default())?;
        }
        self.functions = functions;

        let mut impls = std::mem::take(&mut self.impls);
        for imp in &mut impls {
            self.expand_aliases(&mut imp.self_ty, imp.span)?;
            for (_, sig) in &mut imp.methods {
                self.expand_function(sig, imp.span)?;
            }
        }
        self.impls = impls;
        Ok(())
    }

    fn expand_function(&self, sig: &mut FunctionSig, span: Span) -> SemaResult<()> {
        for arg in &mut sig.args {
            self.expand_aliases(arg, span)?;
        }
        self.expand_aliases(&mut sig.ret, span)
    }

    /// Replaces every path bound to a type alias inside `ty` with the
    /// alias target, instantiated with the path's generic arguments.
    pub fn expand_aliases(&self, ty: &mut TypeRef, span: Span) -> SemaResult<()> {
        self.expand_aliases_at(ty, span, 0)
    }

    fn expand_aliases_at(&self, ty: &mut TypeRef, span: Span, depth: usize) -> SemaResult<()> {
        match ty {
            TypeRef::Path(path) => {
                for node in &mut path.nodes {
                    for arg in &mut node.args {
                        self.expand_aliases_at(arg, span, depth)?;
                    }
                }
                if let PathBinding::TypeAlias(key) = path.binding.clone() {
                    if depth >= ALIAS_EXPANSION_LIMIT {
                        return Err(SemaError::unsupported(
                            format!("recursive type alias `{key}`"),
                            span,
                        ));
                    }
                    let alias = self.type_alias(&key, span)?;
                    let args = path.last().map(|node| node.args.clone()).unwrap_or_default();
                    *ty = alias.ty.substitute(&param_map(&alias.params, &args));
                    self.expand_aliases_at(ty, span, depth + 1)?;
                }
            }
            TypeRef::Borrow { inner, .. } | TypeRef::Array { inner, .. } => {
                self.expand_aliases_at(inner, span, depth)?;
            }
            TypeRef::Tuple(items) => {
                for item in items {
                    self.expand_aliases_at(item, span, depth)?;
                }
            }
            TypeRef::Wildcard | TypeRef::Unit | TypeRef::Primitive(_) | TypeRef::Generic(_) => {}
        }
        Ok(())
    }

    pub fn struct_def(&self, key: &str, span: Span) -> SemaResult<&StructDef> {
        self.structs
            .get(key)
            .ok_or_else(|| SemaError::unresolved(NameKind::Item, key, span))
    }

    pub fn enum_def(&self, key: &str, span: Span) -> SemaResult<&EnumDef> {
        self.enums
            .get(key)
            .ok_or_else(|| SemaError::unresolved(NameKind::Item, key, span))
    }

    pub fn static_type(&self, key: &str, span: Span) -> SemaResult<&TypeRef> {
        self.statics
            .get(key)
            .ok_or_else(|| SemaError::unresolved(NameKind::Item, key, span))
    }

    pub fn function(&self, key: &str, span: Span) -> SemaResult<&FunctionSig> {
        self.functions
            .get(key)
            .ok_or_else(|| SemaError::unresolved(NameKind::Item, key, span))
    }

    pub fn type_alias(&self, key: &str, span: Span) -> SemaResult<&TypeAliasDef> {
        self.type_aliases
            .get(key)
            .ok_or_else(|| SemaError::unresolved(NameKind::Item, key, span))
    }

    /// Finds the impl of `trait_path` (or the inherent impl when `None`)
    /// whose self type matches `ty`.
    pub fn get_impl(&self, trait_path: Option<&Path>, ty: &TypeRef) -> Option<&ImplSig> {
        self.impls.iter().find(|imp| {
            let same_trait = match (trait_path, &imp.trait_path) {
                (None, None) => true,
                (Some(wanted), Some(have)) => wanted.key() == have.key(),
                _ => false,
            };
            same_trait && imp.bind_self(ty).is_some()
        })
    }

    /// Type of field `name` of struct `key` instantiated with `args`.
    /// Missing arguments are filled with wildcards.
    pub fn field_type(
        &self,
        key: &str,
        args: &[TypeRef],
        name: &str,
        span: Span,
    ) -> SemaResult<TypeRef> {
        let def = self.struct_def(key, span)?;
        let field = def
            .fields
            .iter()
            .find(|field| field.name == name)
            .ok_or_else(|| SemaError::no_member(format!("no field `{name}` on `{key}`"), span))?;
        Ok(field.ty.substitute(&param_map(&def.params, args)))
    }
}

/// Pairs each generic parameter with its argument, padding with wildcards.
pub fn param_map(params: &GenericParams, args: &[TypeRef]) -> HashMap<String, TypeRef> {
    params
        .ty_params
        .iter()
        .enumerate()
        .map(|(idx, param)| {
            (
                param.name.clone(),
                args.get(idx).cloned().unwrap_or(TypeRef::Wildcard),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{type_syntax::parse_type, types::Mutability};

    fn ty(source: &str) -> TypeRef {
        parse_type(source).expect("type")
    }

    fn sample_crate() -> Crate {
        let mut root = Module::new("");
        root.items.push(Item::Struct(StructDef {
            name: "Wrapper".into(),
            params: GenericParams::with_names(["T"]),
            fields: vec![StructField {
                name: "inner".into(),
                ty: ty("T"),
                span: Span::default(),
            }],
            span: Span::default(),
        }));
        root.items.push(Item::Impl(ImplBlock {
            params: GenericParams::with_names(["T"]),
            trait_path: None,
            self_ty: ty("Wrapper<T>"),
            items: vec![ImplItem {
                name: "get".into(),
                kind: ImplItemKind::Function(Function {
                    name: "get".into(),
                    params: GenericParams::default(),
                    args: vec![FunctionArg {
                        pattern: Pattern::ident("self", Span::default()),
                        ty: ty("&Self"),
                    }],
                    ret: ty("&T"),
                    code: None,
                    span: Span::default(),
                }),
            }],
            span: Span::default(),
        }));
        Crate::new(root).expect("crate")
    }

    #[test]
    fn field_types_are_instantiated() {
        let krate = sample_crate();
        let field = krate
            .symbols
            .field_type("::Wrapper", &[ty("u16")], "inner", Span::default())
            .expect("field");
        assert_eq!(field, ty("u16"));

        let padded = krate
            .symbols
            .field_type("::Wrapper", &[], "inner", Span::default())
            .expect("field");
        assert_eq!(padded, TypeRef::Wildcard);
    }

    #[test]
    fn missing_field_is_reported() {
        let krate = sample_crate();
        let err = krate
            .symbols
            .field_type("::Wrapper", &[], "outer", Span::default())
            .expect_err("missing");
        assert!(
            matches!(err, SemaError::UnresolvedMethodOrField { .. }),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn inherent_impl_matches_instantiated_type() {
        let krate = sample_crate();
        let imp = krate
            .symbols
            .get_impl(None, &ty("::Wrapper<bool>"))
            .expect("impl");
        assert!(imp.find_method("get").is_some());
        let assignment = imp.bind_self(&ty("::Wrapper<bool>")).expect("bind");
        assert_eq!(assignment.get("T"), Some(&ty("bool")));
        assert!(krate.symbols.get_impl(None, &ty("u8")).is_none());
    }

    fn alias(name: &str, target: &str) -> Item {
        Item::TypeAlias(TypeAliasDef {
            name: name.into(),
            params: GenericParams::default(),
            ty: ty(target),
            span: Span::default(),
        })
    }

    #[test]
    fn stored_signatures_have_aliases_expanded() {
        let mut root = Module::new("");
        root.items.push(alias("Id", "u32"));
        root.items.push(alias("IdRef", "&Id"));
        root.items.push(Item::Struct(StructDef {
            name: "Record".into(),
            params: GenericParams::default(),
            fields: vec![StructField {
                name: "id".into(),
                ty: ty("IdRef"),
                span: Span::default(),
            }],
            span: Span::default(),
        }));
        root.items.push(Item::Function(Function {
            name: "make".into(),
            params: GenericParams::default(),
            args: Vec::new(),
            ret: ty("(Id, bool)"),
            code: None,
            span: Span::default(),
        }));
        let krate = Crate::new(root).expect("crate");
        let field = krate
            .symbols
            .field_type("::Record", &[], "id", Span::default())
            .expect("field");
        assert_eq!(field, ty("&u32"));
        let sig = krate.symbols.function("::make", Span::default()).expect("fn");
        assert_eq!(sig.ret, ty("(u32, bool)"));
    }

    #[test]
    fn cyclic_alias_is_rejected() {
        let mut root = Module::new("");
        root.items.push(alias("Ping", "Pong"));
        root.items.push(alias("Pong", "Ping"));
        root.items.push(Item::Static(StaticDef {
            name: "LOOP".into(),
            mutability: Mutability::Immutable,
            ty: ty("Ping"),
            value: ExprNode::new(
                ExprKind::Literal(Literal::Integer { value: 0, ty: None }),
                Span::default(),
            ),
            span: Span::default(),
        }));
        let err = Crate::new(root).expect_err("cycle");
        assert!(
            matches!(err, SemaError::UnsupportedConstruct { .. }),
            "unexpected error {err:?}"
        );
    }
}

