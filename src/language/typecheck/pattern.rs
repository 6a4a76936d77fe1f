use super::*;

impl<'a> ExprTypeChecker<'a> {
    /// Declares every binding in `pattern`, typed from the matched value's
    /// type `ty`.
    pub(super) fn handle_pattern(&mut self, pattern: &Pattern, ty: &TypeRef) -> SemaResult<()> {
        match pattern {
            Pattern::Wildcard(_) => Ok(()),
            Pattern::Identifier {
                name,
                mutability,
                span,
            } => self.local_variable(*mutability, name, ty.clone(), *span),
            Pattern::Literal(literal, span) => {
                let mut expected = ty.clone();
                merge(&mut expected, &literal_type(literal), *span)
            }
            Pattern::Tuple(items, span) => match ty {
                TypeRef::Wildcard => items
                    .iter()
                    .try_for_each(|item| self.handle_pattern(item, &TypeRef::Wildcard)),
                TypeRef::Unit if items.is_empty() => Ok(()),
                TypeRef::Tuple(types) if types.len() == items.len() => items
                    .iter()
                    .zip(types)
                    .try_for_each(|(item, item_ty)| self.handle_pattern(item, item_ty)),
                TypeRef::Tuple(types) => Err(SemaError::arity(
                    format!(
                        "tuple pattern has {} elements but the value has {}",
                        items.len(),
                        types.len()
                    ),
                    *span,
                )),
                other => Err(SemaError::mismatch(
                    format!("a tuple of {} elements", items.len()),
                    other,
                    *span,
                )),
            },
            Pattern::Reference { pattern, span } => match ty {
                TypeRef::Wildcard => self.handle_pattern(pattern, &TypeRef::Wildcard),
                TypeRef::Borrow { inner, .. } => self.handle_pattern(pattern, inner),
                other => Err(SemaError::mismatch("a reference", other, *span)),
            },
            Pattern::EnumVariant {
                path,
                bindings,
                span,
            } => self.handle_pattern_enum(path, bindings, ty, *span),
            Pattern::Struct { path, fields, span } => {
                self.handle_pattern_struct(path, fields, ty, *span)
            }
        }
    }

    /// `Enum::Variant(a, b)`: the variant's field templates are
    /// instantiated with the scrutinee's generic arguments.
    fn handle_pattern_enum(
        &mut self,
        path: &Path,
        bindings: &[Pattern],
        ty: &TypeRef,
        span: Span,
    ) -> SemaResult<()> {
        let PathBinding::EnumVariant { enum_key, index } = &path.binding else {
            return Err(SemaError::mismatch("an enum variant", &path.binding, span));
        };
        let def = self.symbols.enum_def(enum_key, span)?;
        let variant = def.variants.get(*index).ok_or_else(|| {
            SemaError::invariant(format!("variant #{index} missing from `{enum_key}`"), span)
        })?;
        let templates: &[TypeRef] = match &variant.data {
            VariantData::Value(_) => &[],
            VariantData::Tuple(types) => types,
            VariantData::Struct(_) => {
                return Err(SemaError::unsupported(
                    format!("tuple pattern for struct-like variant `{path}`"),
                    span,
                ))
            }
        };
        if templates.len() != bindings.len() {
            return Err(SemaError::arity(
                format!(
                    "pattern has {} fields but variant `{path}` has {}",
                    bindings.len(),
                    templates.len()
                ),
                span,
            ));
        }
        let (args, borrow) = self.scrutinee_args(enum_key, ty, span)?;
        let assignment = param_map(&def.params, &args);
        for (binding, template) in bindings.iter().zip(templates) {
            let field_ty = rewrap(borrow, template.substitute(&assignment));
            self.handle_pattern(binding, &field_ty)?;
        }
        Ok(())
    }

    /// `Struct { a, b: pat }` or `Enum::Variant { a, .. }`.
    fn handle_pattern_struct(
        &mut self,
        path: &Path,
        fields: &[StructPatternField],
        ty: &TypeRef,
        span: Span,
    ) -> SemaResult<()> {
        let symbols = self.symbols;
        let (owner, params, declared) = match &path.binding {
            PathBinding::Struct(key) => {
                let def = symbols.struct_def(key, span)?;
                (key, &def.params, def.fields.as_slice())
            }
            PathBinding::EnumVariant { enum_key, index } => {
                let def = symbols.enum_def(enum_key, span)?;
                match def.variants.get(*index).map(|variant| &variant.data) {
                    Some(VariantData::Struct(fields)) => (enum_key, &def.params, fields.as_slice()),
                    _ => {
                        return Err(SemaError::mismatch(
                            "a struct-like variant",
                            path,
                            span,
                        ))
                    }
                }
            }
            other => return Err(SemaError::mismatch("a struct", other, span)),
        };
        let (args, borrow) = self.scrutinee_args(owner, ty, span)?;
        let assignment = param_map(params, &args);
        for field in fields {
            let decl = declared
                .iter()
                .find(|decl| decl.name == field.name)
                .ok_or_else(|| {
                    SemaError::no_member(format!("no field `{}` on `{path}`", field.name), span)
                })?;
            let field_ty = rewrap(borrow, decl.ty.substitute(&assignment));
            self.handle_pattern(&field.pattern, &field_ty)?;
        }
        Ok(())
    }

    /// Generic arguments of the scrutinee's type, which must name `owner`
    /// once references are stripped.
    fn scrutinee_args(
        &self,
        owner: &str,
        ty: &TypeRef,
        span: Span,
    ) -> SemaResult<(Vec<TypeRef>, Option<BorrowKind>)> {
        let (base, borrow) = strip_references(ty);
        match &base {
            TypeRef::Wildcard => Ok((Vec::new(), borrow)),
            TypeRef::Path(path) if path.key() == owner => Ok((
                path.last().map(|node| node.args.clone()).unwrap_or_default(),
                borrow,
            )),
            other => Err(SemaError::mismatch(owner, other, span)),
        }
    }
}

/// Bindings under a matched reference are themselves references.
fn rewrap(borrow: Option<BorrowKind>, ty: TypeRef) -> TypeRef {
    match borrow {
        Some(kind) if !ty.is_wildcard() => TypeRef::borrow(kind, ty),
        _ => ty,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn arm(pattern: Pattern, code: ExprNode) -> MatchArm {
        MatchArm {
            patterns: vec![pattern],
            guard: None,
            code: Box::new(code),
        }
    }

    fn match_expr(value: ExprNode, arms: Vec<MatchArm>) -> ExprNode {
        ExprNode::new(
            ExprKind::Match {
                value: Box::new(value),
                arms,
            },
            Span::default(),
        )
    }

    fn variant_pattern(segments: &[&str], bindings: Vec<Pattern>) -> Pattern {
        Pattern::EnumVariant {
            path: Path::relative(segments.iter().copied()),
            bindings,
            span: Span::default(),
        }
    }

    #[test]
    fn enum_pattern_binds_instantiated_field() {
        let body = block(
            Vec::new(),
            Some(match_expr(
                var("c"),
                vec![
                    arm(
                        variant_pattern(&["Choice", "Some"], vec![Pattern::ident("v", Span::default())]),
                        var("v"),
                    ),
                    arm(variant_pattern(&["Choice", "Empty"], Vec::new()), int(0)),
                ],
            )),
        );
        let krate = check(module(vec![
            choice_enum(),
            function("get", &[("c", "Choice<u8>")], "_", body),
        ]))
        .expect("check");
        assert_eq!(tail_of(&krate, "get").res_type, ty("u8"));
    }

    #[test]
    fn match_on_reference_binds_references() {
        let body = block(
            Vec::new(),
            Some(match_expr(
                var("c"),
                vec![
                    arm(
                        variant_pattern(&["Choice", "Some"], vec![Pattern::ident("v", Span::default())]),
                        var("v"),
                    ),
                    arm(Pattern::Wildcard(Span::default()), var("fallback")),
                ],
            )),
        );
        let krate = check(module(vec![
            choice_enum(),
            function(
                "get",
                &[("c", "&Choice<u8>"), ("fallback", "&u8")],
                "_",
                body,
            ),
        ]))
        .expect("check");
        assert_eq!(tail_of(&krate, "get").res_type, ty("&u8"));
    }

    #[test]
    fn arm_bindings_are_scoped_to_their_arm() {
        let body = block(
            Vec::new(),
            Some(match_expr(
                var("c"),
                vec![
                    arm(
                        variant_pattern(&["Choice", "Some"], vec![Pattern::ident("v", Span::default())]),
                        var("v"),
                    ),
                    arm(variant_pattern(&["Choice", "Empty"], Vec::new()), var("v")),
                ],
            )),
        );
        let err = check(module(vec![
            choice_enum(),
            function("get", &[("c", "Choice<u8>")], "_", body),
        ]))
        .expect_err("v is not bound in the second arm");
        assert!(
            matches!(err, SemaError::UnresolvedName { kind: NameKind::Variable, ref name, .. } if name == "v"),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn enum_pattern_field_count_is_checked() {
        let body = block(
            Vec::new(),
            Some(match_expr(
                var("c"),
                vec![arm(
                    variant_pattern(
                        &["Choice", "Some"],
                        vec![Pattern::Wildcard(Span::default()), Pattern::Wildcard(Span::default())],
                    ),
                    int(0),
                )],
            )),
        );
        let err = check(module(vec![
            choice_enum(),
            function("get", &[("c", "Choice<u8>")], "()", body),
        ]))
        .expect_err("arity");
        assert!(matches!(err, SemaError::ArityMismatch { .. }), "unexpected error {err:?}");
    }

    #[test]
    fn struct_and_tuple_patterns_destructure() {
        let struct_pattern = Pattern::Struct {
            path: Path::local("Point"),
            fields: vec![StructPatternField {
                name: "y".into(),
                pattern: Pattern::ident("py", Span::default()),
            }],
            span: Span::default(),
        };
        let tuple_pattern = Pattern::Tuple(
            vec![struct_pattern, Pattern::ident("flag", Span::default())],
            Span::default(),
        );
        let body = block(
            vec![ExprNode::new(
                ExprKind::LetBinding {
                    pattern: tuple_pattern,
                    ty: ty("_"),
                    value: Box::new(var("pair")),
                },
                Span::default(),
            )],
            Some(ExprNode::new(
                ExprKind::Tuple(vec![var("py"), var("flag")]),
                Span::default(),
            )),
        );
        let krate = check(module(vec![
            struct_item("Point", &[], &[("x", "i32"), ("y", "f64")]),
            function("split", &[("pair", "(Point, bool)")], "_", body),
        ]))
        .expect("check");
        assert_eq!(tail_of(&krate, "split").res_type, ty("(f64, bool)"));
    }

    #[test]
    fn tuple_pattern_arity_is_checked() {
        let pattern = Pattern::Tuple(
            vec![Pattern::ident("a", Span::default())],
            Span::default(),
        );
        let body = block(
            vec![ExprNode::new(
                ExprKind::LetBinding {
                    pattern,
                    ty: ty("_"),
                    value: Box::new(var("pair")),
                },
                Span::default(),
            )],
            None,
        );
        let err = check(module(vec![function(
            "split",
            &[("pair", "(u8, u8)")],
            "()",
            body,
        )]))
        .expect_err("arity");
        assert!(matches!(err, SemaError::ArityMismatch { .. }), "unexpected error {err:?}");
    }
}
