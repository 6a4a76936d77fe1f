use crate::language::span::Span;
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct SyntaxError {
    pub message: String,
    pub label: String,
    pub span: Span,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        let message = message.into();
        Self {
            label: message.clone(),
            message,
            span,
            help: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        self.span.to_source_span()
    }
}

/// Which lookup table an unresolved name was searched in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Variable,
    LocalType,
    TypeParameter,
    Item,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NameKind::Variable => "local variable",
            NameKind::LocalType => "type",
            NameKind::TypeParameter => "type parameter",
            NameKind::Item => "item",
        };
        f.write_str(text)
    }
}

pub type SemaResult<T> = Result<T, SemaError>;

/// Fatal errors raised by the expression checker and the reborrow pass.
/// The first one aborts the running pass.
#[derive(Clone, Debug, Error, Diagnostic)]
pub enum SemaError {
    #[error("cannot find {kind} `{name}` in this scope")]
    #[diagnostic(code(prime::sema::unresolved_name))]
    UnresolvedName {
        kind: NameKind,
        name: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("mismatched types: expected `{expected}`, found `{found}`")]
    #[diagnostic(code(prime::sema::type_mismatch))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("expected `{expected}`")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(prime::sema::arity_mismatch))]
    ArityMismatch {
        message: String,
        #[label("wrong number of parameters")]
        span: SourceSpan,
    },

    #[error("{message}")]
    #[diagnostic(code(prime::sema::unresolved_member))]
    UnresolvedMethodOrField {
        message: String,
        #[label("not found")]
        span: SourceSpan,
    },

    #[error("{construct} is not supported yet")]
    #[diagnostic(code(prime::sema::unsupported))]
    UnsupportedConstruct {
        construct: String,
        #[label("unsupported here")]
        span: SourceSpan,
    },

    #[error("internal compiler error: {message}")]
    #[diagnostic(
        code(prime::sema::invariant),
        help("this is a compiler bug: an expression context was not handled")
    )]
    InvariantViolation {
        message: String,
        #[label("reached here")]
        span: SourceSpan,
    },
}

impl SemaError {
    pub fn unresolved(kind: NameKind, name: impl Into<String>, span: Span) -> Self {
        SemaError::UnresolvedName {
            kind,
            name: name.into(),
            span: span.to_source_span(),
        }
    }

    pub fn mismatch(expected: impl fmt::Display, found: impl fmt::Display, span: Span) -> Self {
        SemaError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
            span: span.to_source_span(),
        }
    }

    pub fn arity(message: impl Into<String>, span: Span) -> Self {
        SemaError::ArityMismatch {
            message: message.into(),
            span: span.to_source_span(),
        }
    }

    pub fn no_member(message: impl Into<String>, span: Span) -> Self {
        SemaError::UnresolvedMethodOrField {
            message: message.into(),
            span: span.to_source_span(),
        }
    }

    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        SemaError::UnsupportedConstruct {
            construct: construct.into(),
            span: span.to_source_span(),
        }
    }

    pub fn invariant(message: impl Into<String>, span: Span) -> Self {
        SemaError::InvariantViolation {
            message: message.into(),
            span: span.to_source_span(),
        }
    }
}
