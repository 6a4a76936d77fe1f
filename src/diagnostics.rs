use crate::language::errors::{SemaError, SyntaxError};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.label.clone(),
        }
    }
}

pub fn render_syntax_error(name: &str, source: &str, err: &SyntaxError) -> String {
    let src = NamedSource::new(name, source.to_string());
    format!("{:?}", Report::new(SyntaxDiagnostic::from_error(src, err)))
}

/// Renders a checker or reborrow failure against the source it points into.
pub fn render_sema_error(name: &str, source: &str, err: &SemaError) -> String {
    let report = Report::new(err.clone()).with_source_code(NamedSource::new(name, source.to_string()));
    format!("{report:?}")
}

pub fn emit_syntax_errors(name: &str, source: &str, errors: &[SyntaxError]) {
    for err in errors {
        eprintln!("{}", render_syntax_error(name, source, err));
    }
}

pub fn emit_sema_error(name: &str, source: &str, err: &SemaError) {
    eprintln!("{}", render_sema_error(name, source, err));
}
