use super::*;
use crate::language::symbols::{FunctionSig, ImplSig};

/// A method found during the auto-deref search.
struct MethodCandidate<'s> {
    imp: &'s ImplSig,
    sig: &'s FunctionSig,
    /// Receiver type the impl matched, after `derefs` dereferences.
    receiver: TypeRef,
    derefs: usize,
}

impl<'a> ExprTypeChecker<'a> {
    pub(super) fn visit_method_call(
        &mut self,
        value: &mut Box<ExprNode>,
        method: &PathNode,
        args: &mut [ExprNode],
        res_type: &mut TypeRef,
        span: Span,
    ) -> SemaResult<()> {
        self.visit_node(value)?;
        for arg in args.iter_mut() {
            self.visit_node(arg)?;
        }

        let mut lookup = value.res_type.clone();
        lookup.resolve_args(&mut |name: &str| self.get_type_param(name, span))?;
        let found = self.resolve_method(lookup, &method.name, span)?;

        if found.sig.params.len() != method.args.len() {
            return Err(SemaError::arity(
                format!(
                    "method `{}` takes {} type parameters but {} were supplied",
                    method.name,
                    found.sig.params.len(),
                    method.args.len()
                ),
                span,
            ));
        }
        if !method.args.is_empty() {
            return Err(SemaError::unsupported(
                format!("explicit type arguments on method `{}`", method.name),
                span,
            ));
        }
        // The receiver is the first declared argument.
        if found.sig.args.len() != args.len() + 1 {
            return Err(SemaError::arity(
                format!(
                    "method `{}` takes {} arguments but {} were supplied",
                    method.name,
                    found.sig.args.len().saturating_sub(1),
                    args.len()
                ),
                span,
            ));
        }

        wrap_in_derefs(value, found.derefs);
        let assignment = found.imp.bind_self(&found.receiver).unwrap_or_default();
        let ret = found.sig.ret.substitute(&assignment);
        merge(res_type, &ret, span)
    }

    /// Searches the inherent impl and then every trait in scope for `name`,
    /// dereferencing the receiver type after each miss.
    fn resolve_method(&self, mut ty: TypeRef, name: &str, span: Span) -> SemaResult<MethodCandidate<'a>> {
        let symbols = self.symbols;
        let original = ty.clone();
        for derefs in 0..=self.options.autoderef_limit {
            if ty.is_wildcard() {
                return Err(SemaError::unsupported(
                    format!("method `{name}` called on a value of unknown type"),
                    span,
                ));
            }
            let inherent = symbols
                .get_impl(None, &ty)
                .and_then(|imp| imp.find_method(name).map(|sig| (imp, sig)));
            let found = inherent.or_else(|| {
                self.traits_in_scope().find_map(|trait_path| {
                    let imp = symbols.get_impl(Some(trait_path), &ty)?;
                    debug!(method = name, candidate = %trait_path, "trying trait");
                    imp.find_method(name).map(|sig| (imp, sig))
                })
            });
            if let Some((imp, sig)) = found {
                debug!(method = name, receiver = %ty, derefs, "resolved method");
                return Ok(MethodCandidate {
                    imp,
                    sig,
                    receiver: ty,
                    derefs,
                });
            }
            if !ty.deref() {
                break;
            }
        }
        Err(SemaError::no_member(
            format!("no method named `{name}` found for `{original}`"),
            span,
        ))
    }
}
