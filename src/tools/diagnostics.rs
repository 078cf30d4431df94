use crate::language::errors::{SyntaxError, SyntaxErrors};
use crate::runtime::error::RuntimeError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

/// File mode keeps the terse, line-oriented formats scripts and tooling
/// depend on; the REPL renders rich reports with source labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportMode {
    File,
    Repl,
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: err.label().to_string(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct RuntimeDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    message: String,
    label: String,
}

impl RuntimeDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &RuntimeError) -> Self {
        let span = err.token().span;
        Self {
            src,
            span: (span.start, span.len()).into(),
            message: err.to_string(),
            label: err.kind_name().to_string(),
        }
    }
}

pub fn emit_syntax_errors(mode: ReportMode, name: &str, source: &str, errors: &SyntaxErrors) {
    match mode {
        ReportMode::File => {
            for err in &errors.errors {
                match &err.at {
                    Some(at) => eprintln!("[line {}] Error at {}: {}", err.line, at, err.message),
                    None => eprintln!("[line {}] Error: {}", err.line, err.message),
                }
            }
        }
        ReportMode::Repl => {
            let src = NamedSource::new(name, source.to_string());
            for err in &errors.errors {
                let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err);
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
    }
}

pub fn emit_runtime_error(mode: ReportMode, name: &str, source: &str, error: &RuntimeError) {
    match mode {
        ReportMode::File => eprintln!("{error}\n[line {}]", error.line()),
        ReportMode::Repl => {
            let src = NamedSource::new(name, source.to_string());
            let diagnostic = RuntimeDiagnostic::from_error(src, error);
            eprintln!("{:?}", Report::new(diagnostic));
        }
    }
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}
